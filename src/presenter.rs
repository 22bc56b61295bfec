//! Map markers and list entries derived from workouts.
//!
//! Both projections are rebuilt from the stored fields of a [`Workout`];
//! neither one is consulted as a source of truth.

use crate::workout::{Coords, Workout, WorkoutId, WorkoutKind, WorkoutType};

/// Zoom level used when the map first opens and when recentering.
pub const DEFAULT_ZOOM: u8 = 13;

/// Format a value the way a plain number is printed in the list.
///
/// Very large and very small magnitudes switch to exponent form
/// (`1e+21`, `1e-7`), and negative zero prints as `0`.
pub fn format_value(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let magnitude = v.abs();
    if magnitude.is_finite() && (magnitude >= 1e21 || magnitude < 1e-6) {
        let formatted = format!("{v:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }
    format!("{v}")
}

/// A marker with an always-open popup.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub coords: Coords,
    pub kind: WorkoutType,
    pub popup: String,
}

impl Marker {
    pub fn for_workout(w: &Workout) -> Self {
        Self {
            coords: w.coords(),
            kind: w.workout_type(),
            popup: format!("{} {}", w.workout_type().icon(), w.description()),
        }
    }

    /// Style class of the popup, e.g. `running-popup`.
    pub fn popup_class(&self) -> String {
        format!("{}-popup", self.kind.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub icon: &'static str,
    pub value: String,
    pub unit: &'static str,
}

impl Detail {
    fn new(icon: &'static str, value: String, unit: &'static str) -> Self {
        Self { icon, value, unit }
    }
}

/// One entry of the workout list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub id: WorkoutId,
    pub kind: WorkoutType,
    pub title: String,
    pub details: Vec<Detail>,
}

impl ListEntry {
    pub fn for_workout(w: &Workout) -> Self {
        let mut details = vec![
            Detail::new(
                w.workout_type().icon(),
                format_value(w.distance()),
                "km",
            ),
            Detail::new("\u{23F1}", format_value(w.duration()), "min"),
        ];
        match w.kind() {
            WorkoutKind::Running { cadence, pace } => {
                details.push(Detail::new("\u{26A1}\u{FE0F}", format!("{pace:.1}"), "min/km"));
                details.push(Detail::new(
                    "\u{1F9B6}\u{1F3FC}",
                    format_value(*cadence),
                    "spm",
                ));
            }
            WorkoutKind::Cycling {
                elevation_gain,
                speed,
            } => {
                details.push(Detail::new("\u{26A1}\u{FE0F}", format!("{speed:.1}"), "km/h"));
                details.push(Detail::new("\u{26F0}", format_value(*elevation_gain), "m"));
            }
        }
        Self {
            id: w.id().clone(),
            kind: w.workout_type(),
            title: w.description().to_string(),
            details,
        }
    }
}

/// Rendered list, newest entry first.
#[derive(Debug, Default)]
pub struct WorkoutList {
    entries: Vec<ListEntry>,
}

impl WorkoutList {
    pub fn render(&mut self, w: &Workout) {
        self.entries.insert(0, ListEntry::for_workout(w));
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Map state. Markers rendered before the map is ready are queued and
/// drawn once it becomes ready.
#[derive(Debug, Clone, PartialEq)]
pub enum MapView {
    Pending {
        queued: Vec<Marker>,
    },
    Ready {
        center: Coords,
        zoom: u8,
        markers: Vec<Marker>,
        /// Set when the view should move on the next frame.
        recenter: bool,
    },
}

impl Default for MapView {
    fn default() -> Self {
        MapView::Pending { queued: Vec::new() }
    }
}

impl MapView {
    pub fn is_ready(&self) -> bool {
        matches!(self, MapView::Ready { .. })
    }

    pub fn render(&mut self, marker: Marker) {
        match self {
            MapView::Pending { queued } => queued.push(marker),
            MapView::Ready { markers, .. } => markers.push(marker),
        }
    }

    /// Open the map at `center`, flushing queued markers. Calling this on a
    /// map that is already ready only recenters it.
    pub fn ready(&mut self, center: Coords, zoom: u8) {
        match self {
            MapView::Pending { queued } => {
                let markers = std::mem::take(queued);
                *self = MapView::Ready {
                    center,
                    zoom,
                    markers,
                    recenter: true,
                };
            }
            MapView::Ready { .. } => self.set_view(center, zoom),
        }
    }

    /// Move the view. Ignored until the map is ready.
    pub fn set_view(&mut self, to: Coords, to_zoom: u8) {
        if let MapView::Ready {
            center,
            zoom,
            recenter,
            ..
        } = self
        {
            *center = to;
            *zoom = to_zoom;
            *recenter = true;
        }
    }

    /// Returns the pending view change, if any, and marks it applied.
    pub fn take_recenter(&mut self) -> Option<(Coords, u8)> {
        match self {
            MapView::Ready {
                center,
                zoom,
                recenter,
                ..
            } if *recenter => {
                *recenter = false;
                Some((*center, *zoom))
            }
            _ => None,
        }
    }

    pub fn markers(&self) -> &[Marker] {
        match self {
            MapView::Pending { queued } => queued,
            MapView::Ready { markers, .. } => markers,
        }
    }

    /// Drop every marker, keeping the ready state.
    pub fn clear(&mut self) {
        match self {
            MapView::Pending { queued } => queued.clear(),
            MapView::Ready { markers, .. } => markers.clear(),
        }
    }
}

/// Find the workout a clicked list entry belongs to.
pub fn resolve_click<'a>(workouts: &'a [Workout], id: &WorkoutId) -> Option<&'a Workout> {
    workouts.iter().find(|w| w.id() == id)
}

/// Visible `(min, max)` corners as `[lng, lat]` for a view centered on
/// `center` at web-map `zoom`.
pub fn view_bounds(center: Coords, zoom: u8) -> ([f64; 2], [f64; 2]) {
    let width = 360.0 / 2f64.powi(zoom as i32);
    let height = width / 2.0;
    (
        [center.lng - width / 2.0, center.lat - height / 2.0],
        [center.lng + width / 2.0, center.lat + height / 2.0],
    )
}
