use crate::workout::{Workout, WorkoutKind};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flat CSV row; columns that do not apply to a workout kind stay empty.
#[derive(Debug, Serialize)]
struct Row<'a> {
    id: &'a str,
    date: String,
    #[serde(rename = "type")]
    kind: &'static str,
    lat: f64,
    lng: f64,
    distance: f64,
    duration: f64,
    pace: Option<f64>,
    speed: Option<f64>,
    cadence: Option<f64>,
    elevation_gain: Option<f64>,
    description: &'a str,
}

impl<'a> From<&'a Workout> for Row<'a> {
    fn from(w: &'a Workout) -> Self {
        let (cadence, elevation_gain) = match w.kind() {
            WorkoutKind::Running { cadence, .. } => (Some(*cadence), None),
            WorkoutKind::Cycling { elevation_gain, .. } => (None, Some(*elevation_gain)),
        };
        Row {
            id: w.id().as_str(),
            date: w.date().to_rfc3339(),
            kind: w.workout_type().as_str(),
            lat: w.coords().lat,
            lng: w.coords().lng,
            distance: w.distance(),
            duration: w.duration(),
            pace: w.kind().pace(),
            speed: w.kind().speed(),
            cadence,
            elevation_gain,
            description: w.description(),
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(writer: impl Write, value: &T) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

pub fn write_csv(writer: impl Write, workouts: &[Workout]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for w in workouts {
        wtr.serialize(Row::from(w))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_workouts_json<P: AsRef<Path>>(path: P, workouts: &[Workout]) -> Result<(), ExportError> {
    write_json(std::fs::File::create(path)?, workouts)
}

pub fn save_workouts_csv<P: AsRef<Path>>(path: P, workouts: &[Workout]) -> Result<(), ExportError> {
    write_csv(std::fs::File::create(path)?, workouts)
}

/// Pick the format from the file extension; anything but `.csv` is JSON.
pub fn save_workouts<P: AsRef<Path>>(path: P, workouts: &[Workout]) -> Result<(), ExportError> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        save_workouts_csv(path, workouts)
    } else {
        save_workouts_json(path, workouts)
    }
}
