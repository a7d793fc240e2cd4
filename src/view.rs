//! External collaborators: the map/list view and the position source.
//!
//! The engine never renders anything itself. It tells a [`WorkoutView`] what
//! changed and the host turns that into tiles, popups, list items and forms.
//! [`RecordedView`] is an in-memory view that simply keeps the resulting state,
//! useful for headless hosts and for tests.

use crate::annotations::{Marker, RouteAnnotation};
use crate::error::{Result, WorkoutError};
use crate::workout::{Workout, WorkoutInput, WorkoutSummary};
use crate::{Bounds, GpsPoint};

/// Rendering side of the engine. Every method defaults to doing nothing.
pub trait WorkoutView {
    /// Show the map centered on the user's position.
    fn init_map(&mut self, _center: GpsPoint, _zoom: u8) {}

    /// Blocking notice that the position could not be read.
    fn notify_position_unavailable(&mut self, _message: &str) {}

    fn render_marker(&mut self, _marker: &Marker) {}

    fn remove_marker(&mut self, _marker: &Marker) {}

    fn add_route(&mut self, _route: &RouteAnnotation) {}

    fn remove_route(&mut self, _route: &RouteAnnotation) {}

    /// Drop every marker and route from the map.
    fn clear_map(&mut self) {}

    fn pan_to(&mut self, _coords: GpsPoint, _zoom: u8) {}

    fn fit_bounds(&mut self, _bounds: Bounds) {}

    /// Add one list entry after the existing ones.
    fn append_entry(&mut self, _workout: &Workout) {}

    /// Swap the entry with the same id for this workout, keeping its position.
    fn replace_entry(&mut self, _workout: &Workout) {}

    fn remove_entry(&mut self, _workout_id: &str) {}

    /// Replace the whole list with these workouts, in order.
    fn render_list(&mut self, _workouts: &[Workout]) {}

    /// Highlight one entry (clearing any other), or none.
    fn highlight(&mut self, _workout_id: Option<&str>) {}

    /// Pre-fill the form with a workout's values for editing.
    fn prefill_form(&mut self, _input: &WorkoutInput) {}

    /// Distance in km computed from a freshly drawn route.
    fn suggest_distance(&mut self, _km: f64) {}

    /// Clear and hide the form.
    fn close_form(&mut self) {}

    fn show_validation_error(&mut self, _error: &WorkoutError) {}

    fn hide_validation_error(&mut self) {}
}

/// One-shot source of the user's current position.
pub trait PositionSource {
    fn current_position(&mut self) -> Result<GpsPoint>;
}

/// Position source returning a preset answer.
#[derive(Debug, Clone)]
pub struct FixedPosition {
    result: std::result::Result<GpsPoint, String>,
}

impl FixedPosition {
    pub fn at(position: GpsPoint) -> Self {
        Self {
            result: Ok(position),
        }
    }

    pub fn unavailable(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

impl PositionSource for FixedPosition {
    fn current_position(&mut self) -> Result<GpsPoint> {
        self.result
            .clone()
            .map_err(|message| WorkoutError::PositionUnavailable { message })
    }
}

/// List entry kept by [`RecordedView`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub workout_id: String,
    pub summary: WorkoutSummary,
}

impl ListEntry {
    fn of(workout: &Workout) -> Self {
        Self {
            workout_id: workout.id().to_string(),
            summary: workout.summary(),
        }
    }
}

/// In-memory view that records the state a real view would display.
#[derive(Debug, Default)]
pub struct RecordedView {
    pub map: Option<(GpsPoint, u8)>,
    pub notices: Vec<String>,
    pub markers: Vec<Marker>,
    pub routes: Vec<RouteAnnotation>,
    pub entries: Vec<ListEntry>,
    pub highlighted: Option<String>,
    pub last_pan: Option<(GpsPoint, u8)>,
    pub fitted: Option<Bounds>,
    pub form: Option<WorkoutInput>,
    pub suggested_distance: Option<f64>,
    pub validation_error: Option<String>,
}

impl RecordedView {
    pub fn entry_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.workout_id.as_str()).collect()
    }
}

impl WorkoutView for RecordedView {
    fn init_map(&mut self, center: GpsPoint, zoom: u8) {
        self.map = Some((center, zoom));
    }

    fn notify_position_unavailable(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }

    fn render_marker(&mut self, marker: &Marker) {
        self.markers.push(marker.clone());
    }

    fn remove_marker(&mut self, marker: &Marker) {
        self.markers.retain(|m| m.id != marker.id);
    }

    fn add_route(&mut self, route: &RouteAnnotation) {
        self.routes.push(route.clone());
    }

    fn remove_route(&mut self, route: &RouteAnnotation) {
        self.routes.retain(|r| r.id != route.id);
    }

    fn clear_map(&mut self) {
        self.markers.clear();
        self.routes.clear();
    }

    fn pan_to(&mut self, coords: GpsPoint, zoom: u8) {
        self.last_pan = Some((coords, zoom));
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.fitted = Some(bounds);
    }

    fn append_entry(&mut self, workout: &Workout) {
        self.entries.push(ListEntry::of(workout));
    }

    fn replace_entry(&mut self, workout: &Workout) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.workout_id == workout.id())
        {
            *entry = ListEntry::of(workout);
        }
    }

    fn remove_entry(&mut self, workout_id: &str) {
        self.entries.retain(|e| e.workout_id != workout_id);
    }

    fn render_list(&mut self, workouts: &[Workout]) {
        self.entries = workouts.iter().map(ListEntry::of).collect();
    }

    fn highlight(&mut self, workout_id: Option<&str>) {
        self.highlighted = workout_id.map(str::to_string);
    }

    fn prefill_form(&mut self, input: &WorkoutInput) {
        self.form = Some(*input);
    }

    fn suggest_distance(&mut self, km: f64) {
        self.suggested_distance = Some(km);
    }

    fn close_form(&mut self) {
        self.form = None;
        self.suggested_distance = None;
    }

    fn show_validation_error(&mut self, error: &WorkoutError) {
        self.validation_error = Some(error.to_string());
    }

    fn hide_validation_error(&mut self) {
        self.validation_error = None;
    }
}
