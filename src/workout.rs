//! Workout record model.
//!
//! A workout is a single tagged structure: the shared fields (id, timestamp,
//! coords, distance, duration) plus a [`WorkoutDetails`] variant carrying the
//! kind-specific attribute. The derived metric and description are computed
//! once at construction; editing a workout builds a new record.

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InvalidField, Result, WorkoutError};
use crate::identity::{workout_id_with_digits, Clock, DEFAULT_ID_DIGITS};
use crate::GpsPoint;

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

/// Workout discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutKind {
    Running,
    Cycling,
}

impl WorkoutKind {
    pub fn icon(&self) -> &'static str {
        match self {
            WorkoutKind::Running => "🏃‍♂️",
            WorkoutKind::Cycling => "🚴‍♀️",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkoutKind::Running => "Running",
            WorkoutKind::Cycling => "Cycling",
        }
    }

    /// Unit of the derived metric (pace or speed).
    pub fn metric_unit(&self) -> &'static str {
        match self {
            WorkoutKind::Running => "min/km",
            WorkoutKind::Cycling => "km/h",
        }
    }

    /// Unit of the kind-specific attribute (cadence or elevation gain).
    pub fn attribute_unit(&self) -> &'static str {
        match self {
            WorkoutKind::Running => "spm",
            WorkoutKind::Cycling => "m",
        }
    }
}

/// Kind-specific attribute of a workout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkoutDetails {
    /// Steps per minute
    Running { cadence: f64 },
    /// Meters climbed; may be negative
    Cycling { elevation_gain: f64 },
}

impl WorkoutDetails {
    pub fn kind(&self) -> WorkoutKind {
        match self {
            WorkoutDetails::Running { .. } => WorkoutKind::Running,
            WorkoutDetails::Cycling { .. } => WorkoutKind::Cycling,
        }
    }

    /// Cadence or elevation gain.
    pub fn attribute(&self) -> f64 {
        match *self {
            WorkoutDetails::Running { cadence } => cadence,
            WorkoutDetails::Cycling { elevation_gain } => elevation_gain,
        }
    }

    /// Pace in min/km for running, speed in km/h for cycling.
    pub fn metric(&self, distance: f64, duration: f64) -> f64 {
        match self {
            WorkoutDetails::Running { .. } => duration / distance,
            WorkoutDetails::Cycling { .. } => distance / (duration / 60.0),
        }
    }
}

/// Raw numeric input as submitted by the form, before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkoutInput {
    pub kind: WorkoutKind,
    /// Kilometers
    pub distance: f64,
    /// Minutes
    pub duration: f64,
    /// Cadence for running, elevation gain for cycling
    pub attribute: f64,
}

impl WorkoutInput {
    pub fn running(distance: f64, duration: f64, cadence: f64) -> Self {
        Self {
            kind: WorkoutKind::Running,
            distance,
            duration,
            attribute: cadence,
        }
    }

    pub fn cycling(distance: f64, duration: f64, elevation_gain: f64) -> Self {
        Self {
            kind: WorkoutKind::Cycling,
            distance,
            duration,
            attribute: elevation_gain,
        }
    }

    /// Build input from the form's text fields. Unparseable text becomes NaN and
    /// empty text becomes zero, so both are rejected by [`WorkoutInput::validate`].
    pub fn from_form(kind: WorkoutKind, distance: &str, duration: &str, attribute: &str) -> Self {
        Self {
            kind,
            distance: parse_number(distance),
            duration: parse_number(duration),
            attribute: parse_number(attribute),
        }
    }

    /// Check the numbers and produce the kind-specific details.
    ///
    /// Every value must be finite and non-zero. Distance and duration must be
    /// positive, as must cadence; elevation gain may be negative.
    pub fn validate(&self) -> Result<WorkoutDetails> {
        let mut fields = Vec::new();
        if !is_positive(self.distance) {
            fields.push(InvalidField::Distance);
        }
        if !is_positive(self.duration) {
            fields.push(InvalidField::Duration);
        }

        let details = match self.kind {
            WorkoutKind::Running => {
                if !is_positive(self.attribute) {
                    fields.push(InvalidField::Cadence);
                }
                WorkoutDetails::Running {
                    cadence: self.attribute,
                }
            }
            WorkoutKind::Cycling => {
                if !is_nonzero(self.attribute) {
                    fields.push(InvalidField::ElevationGain);
                }
                WorkoutDetails::Cycling {
                    elevation_gain: self.attribute,
                }
            }
        };

        if fields.is_empty() {
            Ok(details)
        } else {
            Err(WorkoutError::Validation { fields })
        }
    }
}

fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

fn is_nonzero(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

fn is_positive(value: f64) -> bool {
    is_nonzero(value) && value > 0.0
}

/// Values shown by a workout's list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSummary {
    pub kind: WorkoutKind,
    pub icon: &'static str,
    /// Description without the icon, e.g. "Running on April 14"
    pub title: String,
    pub distance: f64,
    pub duration: f64,
    /// Metric rounded to one decimal
    pub metric: String,
    pub metric_unit: &'static str,
    pub attribute: f64,
    pub attribute_unit: &'static str,
}

/// A recorded workout.
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    id: String,
    created_at: DateTime<Utc>,
    coords: GpsPoint,
    distance: f64,
    duration: f64,
    details: WorkoutDetails,
    metric: f64,
    clicks: u32,
    description: String,
}

impl Workout {
    /// Create a running workout stamped with the clock's current time.
    pub fn create_running(
        clock: &dyn Clock,
        coords: GpsPoint,
        distance: f64,
        duration: f64,
        cadence: f64,
    ) -> Self {
        Self::create(
            clock,
            DEFAULT_ID_DIGITS,
            coords,
            distance,
            duration,
            WorkoutDetails::Running { cadence },
        )
    }

    /// Create a cycling workout stamped with the clock's current time.
    pub fn create_cycling(
        clock: &dyn Clock,
        coords: GpsPoint,
        distance: f64,
        duration: f64,
        elevation_gain: f64,
    ) -> Self {
        Self::create(
            clock,
            DEFAULT_ID_DIGITS,
            coords,
            distance,
            duration,
            WorkoutDetails::Cycling { elevation_gain },
        )
    }

    pub(crate) fn create(
        clock: &dyn Clock,
        id_digits: usize,
        coords: GpsPoint,
        distance: f64,
        duration: f64,
        details: WorkoutDetails,
    ) -> Self {
        let created_at = clock.now();
        let id = workout_id_with_digits(created_at, id_digits);
        Self::build(id, created_at, coords, distance, duration, details)
    }

    /// Assemble a workout with an explicit id and timestamp, deriving the
    /// metric and description.
    pub fn build(
        id: String,
        created_at: DateTime<Utc>,
        coords: GpsPoint,
        distance: f64,
        duration: f64,
        details: WorkoutDetails,
    ) -> Self {
        let metric = details.metric(distance, duration);
        let description = describe(details.kind(), created_at);
        Self {
            id,
            created_at,
            coords,
            distance,
            duration,
            details,
            metric,
            clicks: 0,
            description,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn kind(&self) -> WorkoutKind {
        self.details.kind()
    }

    pub fn coords(&self) -> GpsPoint {
        self.coords
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn details(&self) -> WorkoutDetails {
        self.details
    }

    /// Pace (running) or speed (cycling), fixed at construction.
    pub fn metric(&self) -> f64 {
        self.metric
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn summary(&self) -> WorkoutSummary {
        let kind = self.kind();
        let title = self
            .description
            .strip_prefix(kind.icon())
            .map(str::trim_start)
            .unwrap_or(&self.description)
            .to_string();
        WorkoutSummary {
            kind,
            icon: kind.icon(),
            title,
            distance: self.distance,
            duration: self.duration,
            metric: format!("{:.1}", self.metric),
            metric_unit: kind.metric_unit(),
            attribute: self.details.attribute(),
            attribute_unit: kind.attribute_unit(),
        }
    }

    /// Flatten into the persisted field set.
    pub fn to_fields(&self) -> WorkoutFields {
        let (cadence, pace, elevation_gain, speed) = match self.details {
            WorkoutDetails::Running { cadence } => (Some(cadence), Some(self.metric), None, None),
            WorkoutDetails::Cycling { elevation_gain } => {
                (None, None, Some(elevation_gain), Some(self.metric))
            }
        };
        WorkoutFields {
            id: self.id.clone(),
            date: Some(self.created_at),
            kind: self.kind(),
            coords: self.coords.to_pair(),
            distance: self.distance,
            duration: self.duration,
            cadence,
            pace,
            elevation_gain,
            speed,
            clicks: self.clicks,
            description: self.description.clone(),
        }
    }

    /// Rebuild a workout from a persisted field set.
    ///
    /// The stored metric and description are kept as written; they are only
    /// derived again when missing. Returns `None` when the variant attribute for
    /// the stored kind is absent.
    pub fn from_fields(fields: &WorkoutFields) -> Option<Self> {
        let details = match fields.kind {
            WorkoutKind::Running => WorkoutDetails::Running {
                cadence: fields.cadence?,
            },
            WorkoutKind::Cycling => WorkoutDetails::Cycling {
                elevation_gain: fields.elevation_gain?,
            },
        };
        let created_at = fields.date.unwrap_or_default();
        let stored_metric = match details {
            WorkoutDetails::Running { .. } => fields.pace,
            WorkoutDetails::Cycling { .. } => fields.speed,
        };
        let metric =
            stored_metric.unwrap_or_else(|| details.metric(fields.distance, fields.duration));
        let description = if fields.description.is_empty() {
            describe(details.kind(), created_at)
        } else {
            fields.description.clone()
        };

        Some(Self {
            id: fields.id.clone(),
            created_at,
            coords: GpsPoint::from_pair(fields.coords),
            distance: fields.distance,
            duration: fields.duration,
            details,
            metric,
            clicks: fields.clicks,
            description,
        })
    }
}

/// Description such as "🏃‍♂️ Running on April 14", using the local calendar date.
fn describe(kind: WorkoutKind, created_at: DateTime<Utc>) -> String {
    let local = created_at.with_timezone(&Local);
    format!(
        "{} {} on {} {}",
        kind.icon(),
        kind.label(),
        MONTHS[local.month0() as usize],
        local.day()
    )
}

/// Flattened workout as stored in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutFields {
    pub id: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: WorkoutKind,
    /// `[lat, lng]`
    pub coords: [f64; 2],
    pub distance: f64,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default)]
    pub clicks: u32,
    #[serde(default)]
    pub description: String,
}
