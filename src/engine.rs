//! # Workout Engine
//!
//! Stateful lifecycle manager. It is the only writer of:
//! - the workout collection (insertion order unless re-sorted)
//! - the annotation index (markers and drawn routes)
//! - the editing session
//!
//! Every mutating operation runs to completion, updates the view, and then
//! writes a fresh snapshot. Collaborators (view, snapshot store, position
//! source, clock) are injected at construction.
//!
//! ## Startup
//!
//! 1. [`WorkoutEngine::restore`] reads the snapshot, rebuilds the workouts,
//!    their markers and the saved routes, and renders the list.
//! 2. [`WorkoutEngine::start`] asks the position source once. On success the
//!    map is initialised and every marker and route is pushed to the view; on
//!    failure the user is notified and map features stay unavailable.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::annotations::{AnnotationIndex, Layer, RouteId};
use crate::error::{InvalidField, OptionExt, Result, WorkoutError};
use crate::geo_utils::compute_bounds;
use crate::identity::{Clock, SystemClock};
use crate::persistence::{SnapshotCodec, SnapshotStore};
use crate::tasks::{DeferredTask, TaskQueue};
use crate::view::{PositionSource, WorkoutView};
use crate::workout::{Workout, WorkoutDetails, WorkoutInput};
use crate::{Bounds, GpsPoint, TrackerConfig};

// ============================================================================
// Core Types
// ============================================================================

/// Which workout, if any, the user is working with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditingSession {
    #[default]
    Idle,
    /// Workout clicked in the list
    Selected(String),
    /// Form open and pre-filled; the next submit replaces this workout
    EditingForm(String),
}

impl EditingSession {
    /// Workout id the session points at.
    pub fn target(&self) -> Option<&str> {
        match self {
            EditingSession::Idle => None,
            EditingSession::Selected(id) | EditingSession::EditingForm(id) => Some(id),
        }
    }

    pub fn references(&self, id: &str) -> bool {
        self.target() == Some(id)
    }
}

/// Sort order for the workout list. All orders are ascending and stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Distance,
    Duration,
    /// Creation order, via the numeric value of the id
    Date,
}

impl SortKey {
    /// Parse the sort selector value ("distance", "duration" or "date").
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "distance" => Some(SortKey::Distance),
            "duration" => Some(SortKey::Duration),
            "date" => Some(SortKey::Date),
            _ => None,
        }
    }
}

/// Result of drawing a route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub route_id: RouteId,
    /// Where the next created workout will be placed
    pub center: GpsPoint,
    pub length_meters: f64,
    /// Route length in km rounded to two decimals, for the distance field
    pub suggested_distance_km: f64,
}

/// Engine statistics for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub workout_count: u32,
    pub marker_count: u32,
    pub route_count: u32,
    pub pending_tasks: u32,
    pub map_ready: bool,
}

// ============================================================================
// Workout Engine
// ============================================================================

pub struct WorkoutEngine<V: WorkoutView, S: SnapshotStore> {
    // Core state
    workouts: Vec<Workout>,
    annotations: AnnotationIndex,
    session: EditingSession,

    // Collaborators
    view: V,
    store: S,
    position: Option<Box<dyn PositionSource>>,
    clock: Box<dyn Clock>,

    // Deferred work and transient UI state
    tasks: TaskQueue,
    highlighted: Option<String>,
    validation_generation: u64,
    validation_visible: bool,
    map_ready: bool,

    config: TrackerConfig,
}

impl<V: WorkoutView, S: SnapshotStore> WorkoutEngine<V, S> {
    /// Create an engine with default configuration and the system clock.
    pub fn new(view: V, store: S, position: Box<dyn PositionSource>) -> Self {
        Self {
            workouts: Vec::new(),
            annotations: AnnotationIndex::new(),
            session: EditingSession::Idle,
            view,
            store,
            position: Some(position),
            clock: Box::new(SystemClock),
            tasks: TaskQueue::new(),
            highlighted: None,
            validation_generation: 0,
            validation_visible: false,
            map_ready: false,
            config: TrackerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Load the snapshot and rebuild workouts, markers and routes.
    ///
    /// Replaces any in-memory state. Markers and routes reach the view now if
    /// the map is ready, otherwise when it becomes ready. Returns the number of
    /// workouts restored.
    pub fn restore(&mut self) -> Result<usize> {
        let snapshot = SnapshotCodec::load(&self.store)?;

        self.workouts.clear();
        self.annotations.clear();
        self.session = EditingSession::Idle;
        if self.map_ready {
            self.view.clear_map();
        }

        for fields in &snapshot.workouts {
            match Workout::from_fields(fields) {
                Some(workout) => self.insert_workout(workout, Layer::Free),
                None => warn!(
                    "[WorkoutEngine] Skipping workout {} without its {:?} attribute",
                    fields.id, fields.kind
                ),
            }
        }

        for vertices in snapshot.routes {
            match self.annotations.restore_route(vertices) {
                Ok(route) if self.map_ready => self.view.add_route(route),
                Ok(_) => {}
                Err(e) => warn!("[WorkoutEngine] Skipping saved route: {}", e),
            }
        }

        self.view.render_list(&self.workouts);
        info!(
            "[WorkoutEngine] Restored {} workouts, {} routes",
            self.workouts.len(),
            self.annotations.route_count()
        );
        Ok(self.workouts.len())
    }

    /// Request the user's position once and initialise the map with it.
    pub fn start(&mut self) -> Result<()> {
        let mut source = self
            .position
            .take()
            .ok_or_internal("position already requested")?;
        let result = source.current_position();
        self.on_position(result)
    }

    /// Handle the one-shot position answer.
    pub fn on_position(&mut self, result: Result<GpsPoint>) -> Result<()> {
        match result {
            Ok(center) => {
                self.map_ready = true;
                self.view.init_map(center, self.config.map_zoom);
                for marker in self.annotations.markers() {
                    self.view.render_marker(marker);
                }
                for route in self.annotations.routes() {
                    self.view.add_route(route);
                }
                info!(
                    "[WorkoutEngine] Map ready at {:.5}, {:.5}",
                    center.latitude, center.longitude
                );
                Ok(())
            }
            Err(e) => {
                warn!("[WorkoutEngine] Position unavailable: {}", e);
                self.view.notify_position_unavailable(&e.to_string());
                Err(e)
            }
        }
    }

    // ========================================================================
    // Workout Management
    // ========================================================================

    /// Handle a form submit for a workout at `coords`.
    ///
    /// While a workout is being edited this replaces it instead. Otherwise the
    /// workout is placed at the pending route center when one exists (and its
    /// marker goes into the routed layer), or at `coords` in the free layer.
    pub fn create(&mut self, coords: GpsPoint, input: &WorkoutInput) -> Result<String> {
        if !self.map_ready {
            return Err(WorkoutError::MapNotReady);
        }
        let details = self.validated(input)?;

        if let EditingSession::EditingForm(id) = &self.session {
            let id = id.clone();
            return self.replace(&id, input);
        }

        let (coords, layer) = match self.annotations.take_pending_center() {
            Some(center) => (center, Layer::Routed),
            None => {
                self.check_coords(&[coords])?;
                (coords, Layer::Free)
            }
        };
        let workout = Workout::create(
            self.clock.as_ref(),
            self.config.id_digits,
            coords,
            input.distance,
            input.duration,
            details,
        );
        let id = workout.id().to_string();

        self.insert_workout(workout, layer);
        self.view.close_form();

        info!(
            "[WorkoutEngine] Created {:?} workout {} ({} total)",
            input.kind,
            id,
            self.workouts.len()
        );
        self.persist()?;
        Ok(id)
    }

    /// Replace a workout with a new one built from `input`, keeping its id,
    /// coords and list position. Drawn routes are left where they are.
    pub fn replace(&mut self, id: &str, input: &WorkoutInput) -> Result<String> {
        let index = self.position_of(id).ok_or_not_found(id).map_err(|e| {
            warn!("[WorkoutEngine] Edit aborted: {}", e);
            e
        })?;
        let details = self.validated(input)?;

        let previous = &self.workouts[index];
        if details.kind() != previous.kind() {
            let err = WorkoutError::Validation {
                fields: vec![InvalidField::Kind],
            };
            self.report_validation(&err);
            return Err(err);
        }

        let replacement = Workout::build(
            previous.id().to_string(),
            self.clock.now(),
            previous.coords(),
            input.distance,
            input.duration,
            details,
        );
        self.workouts[index] = replacement;
        self.session = EditingSession::Idle;

        self.view.replace_entry(&self.workouts[index]);
        self.highlight(id);
        self.view.close_form();

        debug!("[WorkoutEngine] Replaced workout {}", id);
        self.persist()?;
        Ok(id.to_string())
    }

    /// Delete a workout, its marker, and the route centered on it.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let index = self.position_of(id).ok_or_not_found(id).map_err(|e| {
            warn!("[WorkoutEngine] Delete aborted: {}", e);
            e
        })?;
        let removed = self.workouts.remove(index);
        let coords = removed.coords();
        self.view.remove_entry(id);

        if let Some(marker) = self.annotations.remove_marker_at(coords) {
            self.view.remove_marker(&marker);
        }
        if let Some(route) = self.annotations.remove_route_at(coords) {
            self.view.remove_route(&route);
        }

        if self.session.references(id) {
            self.session = EditingSession::Idle;
        }
        if self.highlighted.as_deref() == Some(id) {
            self.highlighted = None;
        }

        info!(
            "[WorkoutEngine] Deleted workout {} ({} left)",
            id,
            self.workouts.len()
        );
        self.persist()
    }

    /// Remove every workout, marker and route.
    pub fn delete_all(&mut self) -> Result<()> {
        let count = self.workouts.len();
        self.workouts.clear();
        self.annotations.clear();
        self.session = EditingSession::Idle;
        self.highlighted = None;

        self.view.clear_map();
        self.view.render_list(&self.workouts);

        info!("[WorkoutEngine] Deleted all {} workouts", count);
        self.persist()
    }

    /// Stable ascending sort of the live collection. The new order is saved.
    pub fn sort(&mut self, key: SortKey) -> Result<()> {
        match key {
            SortKey::Distance => self
                .workouts
                .sort_by(|a, b| a.distance().total_cmp(&b.distance())),
            SortKey::Duration => self
                .workouts
                .sort_by(|a, b| a.duration().total_cmp(&b.duration())),
            SortKey::Date => self.workouts.sort_by(|a, b| compare_ids(a.id(), b.id())),
        }
        self.view.render_list(&self.workouts);
        debug!("[WorkoutEngine] Sorted {} workouts by {:?}", self.workouts.len(), key);
        self.persist()
    }

    // ========================================================================
    // Editing Session
    // ========================================================================

    /// Select a workout from the list: highlight it and pan the map to it.
    pub fn select(&mut self, id: &str) -> Result<()> {
        let coords = self.workout(id).ok_or_not_found(id)?.coords();
        self.session = EditingSession::Selected(id.to_string());
        self.highlight(id);
        self.view.pan_to(coords, self.config.map_zoom);
        debug!("[WorkoutEngine] Selected workout {}", id);
        Ok(())
    }

    /// Open the form for the selected workout, pre-filled with its values.
    ///
    /// Ignored (returns `None`) unless the session already points at `id`.
    pub fn begin_edit(&mut self, id: &str) -> Option<WorkoutInput> {
        if !self.session.references(id) {
            debug!("[WorkoutEngine] Ignoring edit of unselected workout {}", id);
            return None;
        }
        let workout = self.workout(id)?;
        let prefill = WorkoutInput {
            kind: workout.kind(),
            distance: workout.distance(),
            duration: workout.duration(),
            attribute: workout.details().attribute(),
        };
        self.session = EditingSession::EditingForm(id.to_string());
        self.view.prefill_form(&prefill);
        Some(prefill)
    }

    // ========================================================================
    // Routes & Map
    // ========================================================================

    /// Store a freshly drawn route. The next created workout is placed at its center.
    pub fn add_route(&mut self, vertices: Vec<GpsPoint>) -> Result<RouteSummary> {
        if !self.map_ready {
            return Err(WorkoutError::MapNotReady);
        }
        self.check_coords(&vertices)?;
        let route = self.annotations.add_route(vertices)?.clone();
        self.view.add_route(&route);

        let suggested_distance_km = (route.length_meters / 1000.0 * 100.0).round() / 100.0;
        self.view.suggest_distance(suggested_distance_km);

        debug!(
            "[WorkoutEngine] Route {:?} drawn, {:.0}m",
            route.id, route.length_meters
        );
        self.persist()?;
        Ok(RouteSummary {
            route_id: route.id,
            center: route.center,
            length_meters: route.length_meters,
            suggested_distance_km,
        })
    }

    /// Fit the map to every workout. `None` when there are no workouts.
    pub fn show_all(&mut self) -> Option<Bounds> {
        let coords: Vec<GpsPoint> = self.workouts.iter().map(Workout::coords).collect();
        let bounds = compute_bounds(&coords)?;
        self.view.fit_bounds(bounds);
        Some(bounds)
    }

    // ========================================================================
    // Deferred Tasks
    // ========================================================================

    /// Run every deferred task that is due. Returns how many took effect.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        let mut applied = 0;
        for task in self.tasks.take_due(now) {
            match task {
                DeferredTask::ResetHighlight { workout_id } => {
                    let still_current = self.highlighted.as_deref() == Some(workout_id.as_str())
                        && self.position_of(&workout_id).is_some();
                    if still_current {
                        self.highlighted = None;
                        self.view.highlight(None);
                        applied += 1;
                    } else {
                        debug!("[WorkoutEngine] Stale highlight reset for {}", workout_id);
                    }
                }
                DeferredTask::HideValidationMessage { generation } => {
                    if self.validation_visible && generation == self.validation_generation {
                        self.validation_visible = false;
                        self.view.hide_validation_error();
                        applied += 1;
                    }
                }
            }
        }
        applied
    }

    fn highlight(&mut self, id: &str) {
        self.highlighted = Some(id.to_string());
        self.view.highlight(Some(id));
        let due = self.due_after(self.config.highlight_reset_ms);
        self.tasks.schedule(
            due,
            DeferredTask::ResetHighlight {
                workout_id: id.to_string(),
            },
        );
    }

    /// Now plus `delay_ms`, saturating at the latest representable time.
    fn due_after(&self, delay_ms: u64) -> DateTime<Utc> {
        let delay = i64::try_from(delay_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .unwrap_or(Duration::MAX);
        self.clock
            .now()
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn check_coords(&mut self, points: &[GpsPoint]) -> Result<()> {
        if points.iter().all(GpsPoint::is_valid) {
            return Ok(());
        }
        let err = WorkoutError::Validation {
            fields: vec![InvalidField::Coords],
        };
        self.report_validation(&err);
        Err(err)
    }

    fn validated(&mut self, input: &WorkoutInput) -> Result<WorkoutDetails> {
        input.validate().map_err(|e| {
            self.report_validation(&e);
            e
        })
    }

    fn report_validation(&mut self, error: &WorkoutError) {
        debug!("[WorkoutEngine] Rejected input: {}", error);
        self.validation_generation += 1;
        self.validation_visible = true;
        self.view.show_validation_error(error);
        let due = self.due_after(self.config.error_message_ms);
        self.tasks.schedule(
            due,
            DeferredTask::HideValidationMessage {
                generation: self.validation_generation,
            },
        );
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Append a workout with its marker, or overwrite the live workout
    /// holding the same id (dropping that workout's marker).
    fn insert_workout(&mut self, workout: Workout, layer: Layer) {
        let stale_marker = self.annotations.marker_for(workout.id()).map(|m| m.id);
        let marker = self
            .annotations
            .render_marker(workout.id(), workout.coords(), workout.description(), layer)
            .clone();

        match self.position_of(workout.id()) {
            Some(index) => {
                warn!(
                    "[WorkoutEngine] Id collision on {}, newer workout overwrites",
                    workout.id()
                );
                if let Some(stale) = stale_marker.and_then(|id| self.annotations.remove_marker(id)) {
                    if self.map_ready {
                        self.view.remove_marker(&stale);
                    }
                }
                self.workouts[index] = workout;
                self.view.replace_entry(&self.workouts[index]);
            }
            None => {
                self.view.append_entry(&workout);
                self.workouts.push(workout);
            }
        }

        if self.map_ready {
            self.view.render_marker(&marker);
        }
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.workouts.iter().position(|w| w.id() == id)
    }

    fn persist(&mut self) -> Result<()> {
        SnapshotCodec::save(&mut self.store, &self.workouts, self.annotations.routes())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn workouts(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn workout(&self, id: &str) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id() == id)
    }

    pub fn workout_count(&self) -> usize {
        self.workouts.len()
    }

    pub fn annotations(&self) -> &AnnotationIndex {
        &self.annotations
    }

    pub fn session(&self) -> &EditingSession {
        &self.session
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    pub fn is_map_ready(&self) -> bool {
        self.map_ready
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the engine, handing back the snapshot store.
    pub fn into_store(self) -> S {
        self.store
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            workout_count: self.workouts.len() as u32,
            marker_count: self.annotations.marker_count() as u32,
            route_count: self.annotations.route_count() as u32,
            pending_tasks: self.tasks.len() as u32,
            map_ready: self.map_ready,
        }
    }
}

/// Numeric comparison of ids, falling back to text order for non-numeric ids.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

// ============================================================================
// Tests
// ============================================================================
