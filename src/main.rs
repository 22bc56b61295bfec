//! Main application logic and persistent user settings.

use dirs_next as dirs;
use eframe::{App, Frame, NativeOptions, egui};
use egui_plot::{Plot, PlotBounds, PlotPoint, Points, Text};
use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use log::info;

mod workout;
use workout::{ALL_WORKOUT_TYPES, Coords, IdGenerator, Workout, WorkoutId, WorkoutType};
mod storage;
use storage::{FileStore, MemoryStore, WorkoutRepository};
mod form;
use form::{FormController, FormState, SubmitError};
mod presenter;
use presenter::{DEFAULT_ZOOM, ListEntry, MapView, Marker, WorkoutList, resolve_click, view_bounds};
mod geolocation;
use geolocation::GeolocationError;
mod modal;
use modal::{CloseTrigger, INVALID_INPUT_MESSAGE, Modal, ModalKind};
mod export;

const POSITION_ERROR_MESSAGE: &str = "Could not get your position";

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_reset_prompt_delay() -> u64 {
    10
}

/// Persistent configuration for user preferences.
///
/// The values are serialized to a JSON file so choices survive across
/// application restarts. Every field falls back to its default when absent
/// from an older configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Settings {
    #[serde(default = "default_zoom")]
    map_zoom_level: u8,
    /// Seconds after start-up before offering to delete stored workouts.
    #[serde(default = "default_reset_prompt_delay")]
    reset_prompt_delay_secs: u64,
    #[serde(default)]
    geolocation_url: Option<String>,
    #[serde(default)]
    last_kind: WorkoutType,
    /// Overrides the platform data directory for stored workouts.
    #[serde(default)]
    storage_dir: Option<PathBuf>,
}

impl Settings {
    const FILE: &'static str = "workout_map_settings.json";

    fn path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load settings from the JSON configuration file, falling back to the
    /// defaults when it is missing or unreadable.
    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                if let Ok(cfg) = serde_json::from_str(&data) {
                    return cfg;
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(data) = serde_json::to_string_pretty(self) {
                let _ = std::fs::write(path, data);
            }
        }
    }

    fn repository(&self) -> WorkoutRepository {
        let store = match &self.storage_dir {
            Some(dir) => Some(FileStore::new(dir)),
            None => FileStore::default_location(),
        };
        match store {
            Some(store) => {
                info!("Storing workouts in {}", store.dir().display());
                WorkoutRepository::boxed(store)
            }
            None => {
                log::warn!("No data directory available; workouts will not be kept");
                WorkoutRepository::boxed(MemoryStore::default())
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            map_zoom_level: DEFAULT_ZOOM,
            reset_prompt_delay_secs: default_reset_prompt_delay(),
            geolocation_url: None,
            last_kind: WorkoutType::Running,
            storage_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionState {
    Waiting,
    Located,
    Failed,
}

struct WorkoutApp {
    workouts: Vec<Workout>,
    ids: IdGenerator,
    repo: WorkoutRepository,
    form: FormController,
    list: WorkoutList,
    map: MapView,
    modal: Modal,
    position_rx: Option<Receiver<Result<Coords, GeolocationError>>>,
    position: PositionState,
    settings: Settings,
    settings_dirty: bool,
    show_about: bool,
    toast: Option<(String, Instant)>,
}

impl WorkoutApp {
    fn new(settings: Settings, repo: WorkoutRepository, now: Instant) -> Self {
        let mut app = Self {
            workouts: Vec::new(),
            ids: IdGenerator::default(),
            repo,
            form: FormController::new(settings.last_kind),
            list: WorkoutList::default(),
            map: MapView::default(),
            modal: Modal::default(),
            position_rx: None,
            position: PositionState::Waiting,
            settings,
            settings_dirty: false,
            show_about: false,
            toast: None,
        };
        app.reload();
        if app.repo.has_data() {
            app.modal.schedule(
                ModalKind::ResetPrompt,
                now,
                Duration::from_secs(app.settings.reset_prompt_delay_secs),
            );
        }
        app
    }

    /// Rebuild all in-memory state from storage. Markers are queued until
    /// the map is ready.
    fn reload(&mut self) {
        self.workouts = self.repo.load();
        self.ids = IdGenerator::after(&self.workouts);
        self.list.clear();
        self.map.clear();
        for w in &self.workouts {
            self.list.render(w);
            self.map.render(Marker::for_workout(w));
        }
        info!("Loaded {} workouts", self.workouts.len());
    }

    fn start_position_request(&mut self, ctx: &egui::Context) {
        let url = geolocation::resolve_url(self.settings.geolocation_url.as_deref());
        let ctx = ctx.clone();
        self.position_rx = Some(geolocation::request_position(url, move || {
            ctx.request_repaint()
        }));
        self.position = PositionState::Waiting;
    }

    fn poll_position(&mut self) {
        let Some(rx) = &self.position_rx else {
            return;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                Err(GeolocationError::Other("position request aborted".into()))
            }
        };
        self.position_rx = None;
        self.position_resolved(result);
    }

    fn position_resolved(&mut self, result: Result<Coords, GeolocationError>) {
        match result {
            Ok(coords) => {
                info!("Map ready at {}, {}", coords.lat, coords.lng);
                self.position = PositionState::Located;
                self.map.ready(coords, self.settings.map_zoom_level);
            }
            Err(err) => {
                log::error!("Could not determine position: {err}");
                self.position = PositionState::Failed;
                self.modal.alert(POSITION_ERROR_MESSAGE);
            }
        }
    }

    fn map_clicked(&mut self, coords: Coords) {
        self.form.show(coords);
    }

    fn submit_form(&mut self, now: DateTime<Local>) {
        match self.form.submit(&mut self.ids, now) {
            Ok(workout) => self.add_workout(workout),
            Err(SubmitError::Invalid(err)) => {
                info!("Rejected workout input in {} field: {err}", err.field());
                self.modal.alert(INVALID_INPUT_MESSAGE);
            }
            Err(SubmitError::NoLocation) => {
                log::warn!("Workout submitted without a map location");
            }
        }
    }

    fn add_workout(&mut self, workout: Workout) {
        info!("Added workout {} ({})", workout.id(), workout.description());
        self.map.render(Marker::for_workout(&workout));
        self.list.render(&workout);
        self.workouts.push(workout);
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(err) = self.repo.save(&self.workouts) {
            log::error!("Failed to save workouts: {err}");
        }
    }

    /// Center the map on the workout behind a clicked list entry.
    fn focus_workout(&mut self, id: &WorkoutId) {
        if !self.map.is_ready() {
            return;
        }
        if let Some(w) = resolve_click(&self.workouts, id) {
            self.map.set_view(w.coords(), self.settings.map_zoom_level);
        }
    }

    fn reset_data(&mut self) {
        if let Err(err) = self.repo.clear() {
            log::error!("Failed to clear stored workouts: {err}");
        }
        self.form.cancel();
        self.modal.cancel_scheduled();
        self.reload();
        info!("All workouts deleted");
    }

    fn export_to(&mut self, path: &std::path::Path) {
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let message = match export::save_workouts(path, &self.workouts) {
            Ok(()) => {
                info!("Exported {} workouts to {}", self.workouts.len(), name);
                format!("Exported {} workouts to {}", self.workouts.len(), name)
            }
            Err(err) => {
                log::error!("Failed to export workouts: {err}");
                format!("Export failed: {err}")
            }
        };
        self.toast = Some((message, Instant::now()));
    }

    fn set_kind(&mut self, kind: WorkoutType) {
        if self.form.input.kind != kind {
            self.form.toggle_kind();
            self.settings.last_kind = kind;
            self.settings_dirty = true;
        }
    }

    fn form_ui(&mut self, ui: &mut egui::Ui) {
        let mut submit = false;
        let mut cancel = false;
        ui.group(|ui| {
            egui::Grid::new("workout_form").num_columns(2).show(ui, |ui| {
                ui.label("Type");
                let mut selected = self.form.input.kind;
                egui::ComboBox::from_id_source("workout_type")
                    .selected_text(selected.label())
                    .show_ui(ui, |ui| {
                        for t in ALL_WORKOUT_TYPES {
                            ui.selectable_value(&mut selected, t, t.label());
                        }
                    });
                self.set_kind(selected);
                ui.end_row();

                ui.label("Distance");
                ui.add(egui::TextEdit::singleline(&mut self.form.input.distance).hint_text("km"));
                ui.end_row();

                ui.label("Duration");
                ui.add(egui::TextEdit::singleline(&mut self.form.input.duration).hint_text("min"));
                ui.end_row();

                if self.form.shows_cadence() {
                    ui.label("Cadence");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.form.input.cadence)
                            .hint_text("step/min"),
                    );
                } else {
                    ui.label("Elev Gain");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.form.input.elevation)
                            .hint_text("meters"),
                    );
                }
                ui.end_row();
            });
            ui.horizontal(|ui| {
                submit = ui.button("OK").clicked();
                cancel = ui.button("Cancel").clicked();
            });
        });
        if !self.modal.is_open() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            submit = true;
        }
        if submit {
            self.submit_form(Local::now());
        } else if cancel {
            self.form.cancel();
        }
    }

    fn list_ui(&mut self, ui: &mut egui::Ui) {
        let mut clicked: Option<WorkoutId> = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for entry in self.list.entries() {
                let response = ui
                    .group(|ui| entry_ui(ui, entry))
                    .response
                    .interact(egui::Sense::click());
                if response.clicked() {
                    clicked = Some(entry.id.clone());
                }
            }
        });
        if let Some(id) = clicked {
            self.focus_workout(&id);
        }
    }

    fn map_ui(&mut self, ui: &mut egui::Ui) {
        match self.position {
            PositionState::Waiting => {
                ui.centered_and_justified(|ui| ui.label("Locating you\u{2026}"));
                return;
            }
            PositionState::Failed => {
                ui.centered_and_justified(|ui| ui.label("Map unavailable"));
                return;
            }
            PositionState::Located => {}
        }
        let recenter = self.map.take_recenter();
        let pending = match self.form.state() {
            FormState::Shown { pending } => Some(pending),
            FormState::Hidden => None,
        };
        let markers = self.map.markers();
        let resp = Plot::new("workout_map")
            .data_aspect(1.0)
            .allow_double_click_reset(false)
            .x_axis_label("Longitude")
            .y_axis_label("Latitude")
            .show(ui, |plot_ui| {
                if let Some((center, zoom)) = recenter {
                    let (min, max) = view_bounds(center, zoom);
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
                }
                for m in markers {
                    let color = kind_color(m.kind);
                    plot_ui.points(
                        Points::new(vec![[m.coords.lng, m.coords.lat]])
                            .radius(6.0)
                            .color(color)
                            .name(m.popup_class()),
                    );
                    plot_ui.text(
                        Text::new(
                            PlotPoint::new(m.coords.lng, m.coords.lat),
                            m.popup.clone(),
                        )
                        .anchor(egui::Align2::CENTER_BOTTOM)
                        .color(color),
                    );
                }
                if let Some(p) = pending {
                    plot_ui.points(
                        Points::new(vec![[p.lng, p.lat]])
                            .radius(6.0)
                            .filled(false)
                            .color(egui::Color32::GRAY)
                            .name("New workout"),
                    );
                }
            });
        if resp.response.clicked() {
            if let Some(pos) = resp.response.interact_pointer_pos() {
                let p = resp.transform.value_from_position(pos);
                self.map_clicked(Coords::new(p.y, p.x));
            }
        }
    }

    fn modal_ui(&mut self, ctx: &egui::Context) {
        let Some(kind) = self.modal.current().cloned() else {
            return;
        };
        let screen = ctx.screen_rect();
        let overlay = egui::Area::new(egui::Id::new("modal_overlay"))
            .fixed_pos(screen.min)
            .show(ctx, |ui| {
                let (rect, response) =
                    ui.allocate_exact_size(screen.size(), egui::Sense::click());
                ui.painter()
                    .rect_filled(rect, 0.0, egui::Color32::from_black_alpha(120));
                response
            });

        let mut frame = egui::Frame::window(&ctx.style());
        if !kind.shows_delete() {
            frame = frame.stroke(egui::Stroke::new(2.0, egui::Color32::RED));
        }
        let mut delete = false;
        let mut close = false;
        egui::Window::new("modal")
            .title_bar(false)
            .collapsible(false)
            .resizable(false)
            .frame(frame)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.heading(kind.header());
                ui.horizontal(|ui| {
                    if kind.shows_delete() && ui.button("Delete data").clicked() {
                        delete = true;
                    }
                    close = ui.button("Close").clicked();
                });
            });

        if delete {
            self.modal.close(CloseTrigger::Button);
            self.reset_data();
        } else if close {
            self.modal.close(CloseTrigger::Button);
        } else if overlay.inner.clicked() {
            self.modal.close(CloseTrigger::Overlay);
        } else if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.modal.close(CloseTrigger::Escape);
        }
    }

    fn ui(&mut self, ctx: &egui::Context) {
        self.poll_position();
        if let Some(left) = self.modal.tick(Instant::now()) {
            ctx.request_repaint_after(left);
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Export Workouts").clicked() {
                        if let Some(path) = FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .add_filter("CSV", &["csv"])
                            .save_file()
                        {
                            self.export_to(&path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Delete All Workouts").clicked() {
                        self.modal.open(ModalKind::ResetPrompt);
                        ui.close_menu();
                    }
                });
                ui.menu_button("Help", |ui| {
                    if ui.button("Usage Tips").clicked() {
                        self.show_about = true;
                        ui.close_menu();
                    }
                });
            });
        });

        egui::SidePanel::left("workouts")
            .default_width(320.0)
            .show(ctx, |ui| {
                if self.form.is_shown() {
                    self.form_ui(ui);
                    ui.separator();
                }
                self.list_ui(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| self.map_ui(ui));

        if self.show_about {
            egui::Window::new("Usage Tips")
                .open(&mut self.show_about)
                .resizable(true)
                .show(ctx, |ui| {
                    ui.heading("Workout Map");
                    ui.separator();
                    ui.label("\u{2022} Click the map where your workout took place.");
                    ui.label("\u{2022} Fill in the form and press Enter to log it.");
                    ui.label("\u{2022} Click a workout in the list to move the map to it.");
                });
        }

        self.modal_ui(ctx);

        if let Some((msg, start)) = &self.toast {
            if start.elapsed() < Duration::from_secs(3) {
                egui::Area::new(egui::Id::new("export_toast"))
                    .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
                    .show(ctx, |ui| {
                        ui.label(msg);
                    });
            } else {
                self.toast = None;
            }
        }

        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }
}

fn kind_color(kind: WorkoutType) -> egui::Color32 {
    match kind {
        WorkoutType::Running => egui::Color32::from_rgb(0x00, 0xc4, 0x6a),
        WorkoutType::Cycling => egui::Color32::from_rgb(0xff, 0xb5, 0x45),
    }
}

fn entry_ui(ui: &mut egui::Ui, entry: &ListEntry) {
    ui.label(egui::RichText::new(&entry.title).strong().color(kind_color(entry.kind)));
    ui.horizontal_wrapped(|ui| {
        for d in &entry.details {
            ui.label(format!("{} {} {}", d.icon, d.value, d.unit));
        }
    });
}

impl App for WorkoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.ui(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let settings = Settings::load();
    let repo = settings.repository();
    let options = NativeOptions::default();
    eframe::run_native(
        "Workout Map",
        options,
        Box::new(move |cc| {
            let mut app = WorkoutApp::new(settings, repo, Instant::now());
            app.start_position_request(&cc.egui_ctx);
            Box::new(app)
        }),
    )
}
