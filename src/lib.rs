//! # Workout Map
//!
//! Geotagged workout journal that keeps three representations consistent:
//! the logical record collection, the map annotations derived from it
//! (markers and drawn route polylines), and a persisted snapshot.
//!
//! This library provides:
//! - Running/cycling workout records with derived pace/speed
//! - An annotation index tying records to markers and drawn routes
//! - A lifecycle engine (create, edit, delete, delete-all, sort) with an
//!   editing state machine
//! - A snapshot codec over a flat key-value store
//!
//! ## Features
//!
//! - **`persistence`** - Enable the SQLite-backed snapshot store
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use workout_map::{
//!     FixedPosition, GpsPoint, MemoryStore, RecordedView, WorkoutEngine, WorkoutInput,
//! };
//!
//! let mut engine = WorkoutEngine::new(
//!     RecordedView::default(),
//!     MemoryStore::default(),
//!     Box::new(FixedPosition::at(GpsPoint::new(46.948, 7.447))),
//! );
//! engine.start().unwrap();
//!
//! let id = engine
//!     .create(GpsPoint::new(46.95, 7.45), &WorkoutInput::running(5.0, 30.0, 178.0))
//!     .unwrap();
//! assert_eq!(engine.workout(&id).unwrap().metric(), 6.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{InvalidField, OptionExt, Result, WorkoutError};

// Geographic utilities (distance, length, center calculations)
pub mod geo_utils;

// Time source and id generation
pub mod identity;
pub use identity::{workout_id, Clock, ManualClock, SystemClock};

// Workout record model
pub mod workout;
pub use workout::{
    Workout, WorkoutDetails, WorkoutFields, WorkoutInput, WorkoutKind, WorkoutSummary,
};

// Markers and drawn routes
pub mod annotations;
pub use annotations::{AnnotationIndex, Layer, Marker, MarkerId, RouteAnnotation, RouteId};

// Deferred highlight/message tasks
pub mod tasks;
pub use tasks::{DeferredTask, TaskQueue};

// External collaborators (map/list view, position source)
pub mod view;
pub use view::{FixedPosition, PositionSource, RecordedView, WorkoutView};

// Snapshot codec and key-value stores
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteStore;
pub use persistence::{MemoryStore, Snapshot, SnapshotCodec, SnapshotStore};

// Lifecycle engine (records + annotations + snapshot)
pub mod engine;
pub use engine::{EditingSession, EngineStats, RouteSummary, SortKey, WorkoutEngine};

// ============================================================================
// Core Types
// ============================================================================

/// A map coordinate in degrees.
///
/// # Example
/// ```
/// use workout_map::GpsPoint;
/// let bern = GpsPoint::new(46.948, 7.447);
/// assert!(bern.is_valid());
/// assert_eq!(bern.to_pair(), [46.948, 7.447]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude within ±90 and longitude within ±180. NaN is never in range.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// `[lat, lng]` pair as stored in snapshots.
    pub fn to_pair(self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }

    pub fn from_pair([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

/// Map area the view fits to, as south-west and north-east edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// Configuration for the workout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Zoom level used when the map loads and when panning to a workout.
    /// Default: 17
    pub map_zoom: u8,

    /// Delay before a highlighted list entry returns to normal.
    /// Default: 5000 ms
    pub highlight_reset_ms: u64,

    /// Delay before the validation message hides itself.
    /// Default: 3000 ms
    pub error_message_ms: u64,

    /// Trailing digits of the millisecond timestamp kept in workout ids.
    /// Default: 10
    pub id_digits: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            map_zoom: 17,
            highlight_reset_ms: 5_000,
            error_message_ms: 3_000,
            id_digits: identity::DEFAULT_ID_DIGITS,
        }
    }
}

impl TrackerConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WorkoutError::Config {
            message: e.to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
