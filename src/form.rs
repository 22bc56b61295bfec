// Workout form: input coercion, validation and visibility state
use crate::workout::{self, Coords, IdGenerator, Workout, WorkoutType};
use chrono::{DateTime, Local};

/// Form field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Distance,
    Duration,
    Cadence,
    Elevation,
    Pace,
    Speed,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Distance => "distance",
            Field::Duration => "duration",
            Field::Cadence => "cadence",
            Field::Elevation => "elevation",
            Field::Pace => "pace",
            Field::Speed => "speed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must be a number")]
    NotFinite(Field),
    #[error("{0} must be a positive number")]
    NotPositive(Field),
}

impl ValidationError {
    pub fn field(&self) -> Field {
        match self {
            ValidationError::NotFinite(f) | ValidationError::NotPositive(f) => *f,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("no map location selected")]
    NoLocation,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Coerce raw text the way a numeric cast of form input behaves: blank input
/// is zero and anything unparsable is NaN.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn finite(field: Field, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite(field))
    }
}

fn positive(field: Field, value: f64) -> Result<f64, ValidationError> {
    let value = finite(field, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive(field))
    }
}

/// Validated numeric input, ready to become a [`Workout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidInput {
    Running {
        distance: f64,
        duration: f64,
        cadence: f64,
    },
    Cycling {
        distance: f64,
        duration: f64,
        elevation: f64,
    },
}

impl ValidInput {
    pub fn build(self, ids: &mut IdGenerator, now: DateTime<Local>, coords: Coords) -> Workout {
        let (id, date) = ids.next(now);
        match self {
            ValidInput::Running {
                distance,
                duration,
                cadence,
            } => Workout::running(id, date, coords, distance, duration, cadence),
            ValidInput::Cycling {
                distance,
                duration,
                elevation,
            } => Workout::cycling(id, date, coords, distance, duration, elevation),
        }
    }
}

/// Raw text as typed into the form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormInput {
    pub kind: WorkoutType,
    pub distance: String,
    pub duration: String,
    pub cadence: String,
    pub elevation: String,
}

impl FormInput {
    /// Check the input for the selected kind.
    ///
    /// Elevation gain is only required to be finite; negative values are
    /// accepted. The derived pace or speed must be finite as well, since
    /// stored records cannot hold infinities.
    pub fn validate(&self) -> Result<ValidInput, ValidationError> {
        let distance = positive(Field::Distance, coerce_number(&self.distance))?;
        let duration = positive(Field::Duration, coerce_number(&self.duration))?;
        match self.kind {
            WorkoutType::Running => {
                let cadence = positive(Field::Cadence, coerce_number(&self.cadence))?;
                finite(Field::Pace, workout::pace(distance, duration))?;
                Ok(ValidInput::Running {
                    distance,
                    duration,
                    cadence,
                })
            }
            WorkoutType::Cycling => {
                let elevation = finite(Field::Elevation, coerce_number(&self.elevation))?;
                finite(Field::Speed, workout::speed(distance, duration))?;
                Ok(ValidInput::Cycling {
                    distance,
                    duration,
                    elevation,
                })
            }
        }
    }

    /// Empty the numeric fields, keeping the selected kind.
    pub fn clear(&mut self) {
        self.distance.clear();
        self.duration.clear();
        self.cadence.clear();
        self.elevation.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FormState {
    #[default]
    Hidden,
    Shown {
        pending: Coords,
    },
}

/// Owns the form input and its visibility.
#[derive(Debug, Default)]
pub struct FormController {
    pub input: FormInput,
    state: FormState,
}

impl FormController {
    pub fn new(kind: WorkoutType) -> Self {
        Self {
            input: FormInput {
                kind,
                ..FormInput::default()
            },
            state: FormState::Hidden,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn is_shown(&self) -> bool {
        matches!(self.state, FormState::Shown { .. })
    }

    /// Map click: remember where the workout happened and show the form.
    pub fn show(&mut self, pending: Coords) {
        self.state = FormState::Shown { pending };
    }

    pub fn cancel(&mut self) {
        self.input.clear();
        self.state = FormState::Hidden;
    }

    /// Swap between the cadence and elevation inputs.
    pub fn toggle_kind(&mut self) {
        self.input.kind = self.input.kind.toggle();
    }

    pub fn shows_cadence(&self) -> bool {
        self.input.kind == WorkoutType::Running
    }

    /// Validate the input and build a workout at the pending location.
    ///
    /// On success the inputs are cleared and the form hidden. On failure the
    /// form stays as it is so the user can correct the values.
    pub fn submit(
        &mut self,
        ids: &mut IdGenerator,
        now: DateTime<Local>,
    ) -> Result<Workout, SubmitError> {
        let FormState::Shown { pending } = self.state else {
            return Err(SubmitError::NoLocation);
        };
        let valid = self.input.validate()?;
        let workout = valid.build(ids, now, pending);
        self.cancel();
        Ok(workout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(kind: WorkoutType, distance: &str, duration: &str, extra: &str) -> FormInput {
        let mut i = FormInput {
            kind,
            distance: distance.into(),
            duration: duration.into(),
            ..FormInput::default()
        };
        match kind {
            WorkoutType::Running => i.cadence = extra.into(),
            WorkoutType::Cycling => i.elevation = extra.into(),
        }
        i
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn coerce_matches_numeric_cast() {
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("  "), 0.0);
        assert_eq!(coerce_number(" 12.5 "), 12.5);
        assert_eq!(coerce_number("1e3"), 1000.0);
        assert!(coerce_number("abc").is_nan());
    }

    #[test]
    fn rejects_bad_running_input() {
        let cases = [
            ("0", "25", "180", ValidationError::NotPositive(Field::Distance)),
            ("-1", "25", "180", ValidationError::NotPositive(Field::Distance)),
            ("5", "abc", "180", ValidationError::NotFinite(Field::Duration)),
            ("5", "25", "inf", ValidationError::NotFinite(Field::Cadence)),
            ("5", "25", "", ValidationError::NotPositive(Field::Cadence)),
        ];
        for (distance, duration, cadence, expected) in cases {
            let err = input(WorkoutType::Running, distance, duration, cadence)
                .validate()
                .unwrap_err();
            assert_eq!(err, expected, "{distance} {duration} {cadence}");
        }
    }

    #[test]
    fn cycling_elevation_only_needs_to_be_finite() {
        let ok = input(WorkoutType::Cycling, "20", "60", "-150")
            .validate()
            .unwrap();
        assert_eq!(
            ok,
            ValidInput::Cycling {
                distance: 20.0,
                duration: 60.0,
                elevation: -150.0
            }
        );
        let err = input(WorkoutType::Cycling, "20", "60", "NaN")
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), Field::Elevation);
        let err = input(WorkoutType::Cycling, "0", "60", "10")
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::NotPositive(Field::Distance));
    }

    #[test]
    fn rejects_input_with_infinite_metric() {
        let err = input(WorkoutType::Running, "1e-300", "1e300", "180")
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::NotFinite(Field::Pace));

        let err = input(WorkoutType::Cycling, "1e300", "1e-300", "0")
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::NotFinite(Field::Speed));

        assert!(
            input(WorkoutType::Running, "1e300", "1e-300", "180")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn submit_builds_running_workout_and_hides_form() {
        let mut form = FormController::new(WorkoutType::Running);
        form.show(Coords::new(51.5, -0.1));
        form.input = input(WorkoutType::Running, "5", "25", "180");
        let mut ids = IdGenerator::default();

        let w = form.submit(&mut ids, now()).unwrap();
        assert_eq!(w.coords(), Coords::new(51.5, -0.1));
        assert_eq!(w.kind().pace(), Some(5.0));
        assert_eq!(w.description(), "Running on March 10");
        assert_eq!(form.state(), FormState::Hidden);
        assert!(form.input.distance.is_empty());
        assert!(form.input.cadence.is_empty());
    }

    #[test]
    fn failed_submit_keeps_form_open() {
        let mut form = FormController::new(WorkoutType::Running);
        form.show(Coords::new(51.5, -0.1));
        form.input = input(WorkoutType::Running, "-1", "25", "180");
        let mut ids = IdGenerator::default();

        let err = form.submit(&mut ids, now()).unwrap_err();
        assert_eq!(
            err,
            SubmitError::Invalid(ValidationError::NotPositive(Field::Distance))
        );
        assert!(form.is_shown());
        assert_eq!(form.input.distance, "-1");
    }

    #[test]
    fn submit_without_location_fails() {
        let mut form = FormController::new(WorkoutType::Cycling);
        form.input = input(WorkoutType::Cycling, "20", "60", "150");
        let err = form.submit(&mut IdGenerator::default(), now()).unwrap_err();
        assert_eq!(err, SubmitError::NoLocation);
    }

    #[test]
    fn toggle_swaps_visible_field() {
        let mut form = FormController::new(WorkoutType::Running);
        assert!(form.shows_cadence());
        form.toggle_kind();
        assert!(!form.shows_cadence());
        assert_eq!(form.input.kind, WorkoutType::Cycling);
    }

    #[test]
    fn cancel_clears_and_hides() {
        let mut form = FormController::new(WorkoutType::Running);
        form.show(Coords::new(1.0, 2.0));
        form.input.distance = "3".into();
        form.cancel();
        assert_eq!(form.state(), FormState::Hidden);
        assert!(form.input.distance.is_empty());
        assert_eq!(form.input.kind, WorkoutType::Running);
    }
}
