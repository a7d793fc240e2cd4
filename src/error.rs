//! Unified error handling for the workout-map library.
//!
//! Every fallible engine operation reports one of these variants. Validation and
//! not-found errors are recovered locally by the caller; persistence errors
//! bubble up from the snapshot store.

use std::fmt;

/// Input field named by a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidField {
    Distance,
    Duration,
    Cadence,
    ElevationGain,
    /// Submitted kind differs from the record being edited
    Kind,
    /// Map position outside latitude/longitude range
    Coords,
}

impl fmt::Display for InvalidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvalidField::Distance => "distance",
            InvalidField::Duration => "duration",
            InvalidField::Cadence => "cadence",
            InvalidField::ElevationGain => "elevationGain",
            InvalidField::Kind => "kind",
            InvalidField::Coords => "coords",
        };
        f.write_str(name)
    }
}

/// Unified error type for workout-map operations.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkoutError {
    /// Malformed, zero, or non-positive numeric input
    Validation { fields: Vec<InvalidField> },
    /// Operation referenced an id that is no longer in the live collection
    NotFound { id: String },
    /// Drawn route has too few vertices
    InsufficientPoints {
        point_count: usize,
        minimum_required: usize,
    },
    /// Map-dependent operation attempted before the map was initialised
    MapNotReady,
    /// Position collaborator could not produce a location
    PositionUnavailable { message: String },
    /// Persistence/storage error
    Persistence { message: String },
    /// Configuration error
    Config { message: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for WorkoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkoutError::Validation { fields } => {
                let names: Vec<String> = fields.iter().map(|field| field.to_string()).collect();
                write!(f, "Invalid input for: {}", names.join(", "))
            }
            WorkoutError::NotFound { id } => write!(f, "Workout '{}' not found", id),
            WorkoutError::InsufficientPoints {
                point_count,
                minimum_required,
            } => {
                write!(
                    f,
                    "Route has {} points, minimum {} required",
                    point_count, minimum_required
                )
            }
            WorkoutError::MapNotReady => write!(f, "Map has not been initialised"),
            WorkoutError::PositionUnavailable { message } => {
                write!(f, "Could not get your position: {}", message)
            }
            WorkoutError::Persistence { message } => write!(f, "Persistence error: {}", message),
            WorkoutError::Config { message } => write!(f, "Configuration error: {}", message),
            WorkoutError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for WorkoutError {}

impl From<serde_json::Error> for WorkoutError {
    fn from(err: serde_json::Error) -> Self {
        WorkoutError::Persistence {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for WorkoutError {
    fn from(err: rusqlite::Error) -> Self {
        WorkoutError::Persistence {
            message: err.to_string(),
        }
    }
}

/// Result type alias for workout-map operations.
pub type Result<T> = std::result::Result<T, WorkoutError>;

/// Extension trait for converting Option to WorkoutError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a not-found error for `id`.
    fn ok_or_not_found(self, id: &str) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, id: &str) -> Result<T> {
        self.ok_or_else(|| WorkoutError::NotFound { id: id.to_string() })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| WorkoutError::Internal {
            message: message.to_string(),
        })
    }
}
