// Workout records and their derived metrics
use chrono::{DateTime, Datelike, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Kind of workout selectable in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    #[default]
    Running,
    Cycling,
}

pub const ALL_WORKOUT_TYPES: [WorkoutType; 2] = [WorkoutType::Running, WorkoutType::Cycling];

impl WorkoutType {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkoutType::Running => "running",
            WorkoutType::Cycling => "cycling",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkoutType::Running => "Running",
            WorkoutType::Cycling => "Cycling",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            WorkoutType::Running => "\u{1F3C3}\u{200D}\u{2642}\u{FE0F}",
            WorkoutType::Cycling => "\u{1F6B4}\u{200D}\u{2640}\u{FE0F}",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            WorkoutType::Running => WorkoutType::Cycling,
            WorkoutType::Cycling => WorkoutType::Running,
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown workout type: {0}")]
pub struct ParseWorkoutTypeError(String);

impl FromStr for WorkoutType {
    type Err = ParseWorkoutTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(WorkoutType::Running),
            "cycling" => Ok(WorkoutType::Cycling),
            other => Err(ParseWorkoutTypeError(other.to_string())),
        }
    }
}

/// Geographic position stored as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Coords {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(c: Coords) -> Self {
        [c.lat, c.lng]
    }
}

/// Identifier made of the last ten digits of the creation time in
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    pub fn from_millis(ms: i64) -> Self {
        let digits = ms.to_string();
        let start = digits.len().saturating_sub(10);
        Self(digits[start..].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkoutId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out creation timestamps whose ids never repeat within a session.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_ms: Option<i64>,
}

impl IdGenerator {
    /// Start after the newest of the given records so restored ids are not
    /// reissued.
    pub fn after(workouts: &[Workout]) -> Self {
        Self {
            last_ms: workouts.iter().map(|w| w.date.timestamp_millis()).max(),
        }
    }

    pub fn next(&mut self, now: DateTime<Local>) -> (WorkoutId, DateTime<Local>) {
        let mut ms = now.timestamp_millis();
        if let Some(last) = self.last_ms {
            if ms <= last {
                ms = last + 1;
            }
        }
        self.last_ms = Some(ms);
        let date = Local.timestamp_millis_opt(ms).single().unwrap_or(now);
        (WorkoutId::from_millis(ms), date)
    }
}

/// Variant specific payload. Serialized inline with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkoutKind {
    Running {
        /// steps per minute
        cadence: f64,
        /// min/km
        pace: f64,
    },
    Cycling {
        #[serde(rename = "elevationGain")]
        elevation_gain: f64,
        /// km/h
        speed: f64,
    },
}

impl WorkoutKind {
    pub fn workout_type(&self) -> WorkoutType {
        match self {
            WorkoutKind::Running { .. } => WorkoutType::Running,
            WorkoutKind::Cycling { .. } => WorkoutType::Cycling,
        }
    }

    pub fn pace(&self) -> Option<f64> {
        match self {
            WorkoutKind::Running { pace, .. } => Some(*pace),
            WorkoutKind::Cycling { .. } => None,
        }
    }

    pub fn speed(&self) -> Option<f64> {
        match self {
            WorkoutKind::Cycling { speed, .. } => Some(*speed),
            WorkoutKind::Running { .. } => None,
        }
    }
}

/// A single logged workout.
///
/// Derived values (pace or speed and the description) are computed once in
/// the constructors and stored alongside the raw inputs, so records loaded
/// from storage carry everything needed for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    coords: Coords,
    /// km
    distance: f64,
    /// min
    duration: f64,
    date: DateTime<Local>,
    id: WorkoutId,
    #[serde(flatten)]
    kind: WorkoutKind,
    description: String,
}

impl Workout {
    pub fn running(
        id: WorkoutId,
        date: DateTime<Local>,
        coords: Coords,
        distance: f64,
        duration: f64,
        cadence: f64,
    ) -> Self {
        let pace = pace(distance, duration);
        Self {
            description: describe(WorkoutType::Running, &date),
            coords,
            distance,
            duration,
            date,
            id,
            kind: WorkoutKind::Running { cadence, pace },
        }
    }

    pub fn cycling(
        id: WorkoutId,
        date: DateTime<Local>,
        coords: Coords,
        distance: f64,
        duration: f64,
        elevation_gain: f64,
    ) -> Self {
        let speed = speed(distance, duration);
        Self {
            description: describe(WorkoutType::Cycling, &date),
            coords,
            distance,
            duration,
            date,
            id,
            kind: WorkoutKind::Cycling {
                elevation_gain,
                speed,
            },
        }
    }

    pub fn id(&self) -> &WorkoutId {
        &self.id
    }

    pub fn date(&self) -> DateTime<Local> {
        self.date
    }

    pub fn coords(&self) -> Coords {
        self.coords
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &WorkoutKind {
        &self.kind
    }

    pub fn workout_type(&self) -> WorkoutType {
        self.kind.workout_type()
    }
}

/// Running pace in min/km.
pub fn pace(distance: f64, duration: f64) -> f64 {
    duration / distance
}

/// Cycling speed in km/h.
pub fn speed(distance: f64, duration: f64) -> f64 {
    distance / (duration / 60.0)
}

/// Build the `"<Kind> on <Month> <day>"` label for a workout.
pub fn describe(kind: WorkoutType, date: &DateTime<Local>) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("{} on {} {}", kind.label(), month, date.day())
}
