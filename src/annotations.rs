//! # Annotation Index
//!
//! Owns the map-side state derived from workouts:
//! - one marker per live workout, held in either the free layer or the routed layer
//! - the drawn route polylines
//! - the pending route center that positions the next created workout
//!
//! Markers and routes are matched against a workout by exact coordinate
//! equality, not by id. A route has no stored link to its workout; it is found
//! again because the workout was created at the route's center.

use std::collections::HashMap;

use log::debug;

use crate::error::{Result, WorkoutError};
use crate::geo_utils::{compute_center, polyline_length};
use crate::GpsPoint;

/// Minimum number of vertices in a drawn route.
pub const MIN_ROUTE_VERTICES: usize = 2;

/// Map layer holding a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Markers placed by clicking the map
    Free,
    /// Markers placed at the center of a drawn route
    Routed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub u64);

/// A marker shown on the map for a workout.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    /// Workout the marker was rendered for
    pub workout_id: String,
    pub position: GpsPoint,
    /// Popup text
    pub label: String,
    pub layer: Layer,
}

/// A drawn route polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteAnnotation {
    pub id: RouteId,
    pub vertices: Vec<GpsPoint>,
    /// Centroid of the vertices
    pub center: GpsPoint,
    /// Sum of great-circle distances between consecutive vertices
    pub length_meters: f64,
}

impl RouteAnnotation {
    fn from_vertices(id: RouteId, vertices: Vec<GpsPoint>) -> Result<Self> {
        if vertices.len() < MIN_ROUTE_VERTICES {
            return Err(WorkoutError::InsufficientPoints {
                point_count: vertices.len(),
                minimum_required: MIN_ROUTE_VERTICES,
            });
        }
        let center = compute_center(&vertices).ok_or(WorkoutError::InsufficientPoints {
            point_count: 0,
            minimum_required: MIN_ROUTE_VERTICES,
        })?;
        let length_meters = polyline_length(&vertices);
        Ok(Self {
            id,
            vertices,
            center,
            length_meters,
        })
    }
}

/// Index of the markers and routes currently on the map.
#[derive(Debug, Default)]
pub struct AnnotationIndex {
    /// Every live marker in creation order
    markers: Vec<Marker>,
    /// Workout id -> marker; a later marker for the same id replaces the entry
    markers_by_id: HashMap<String, MarkerId>,
    routes: Vec<RouteAnnotation>,
    /// Center of the most recently drawn route, consumed by the next marker
    pending_center: Option<GpsPoint>,
    next_marker: u64,
    next_route: u64,
}

impl AnnotationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a marker for a workout and add it to `layer`.
    pub fn render_marker(
        &mut self,
        workout_id: &str,
        coords: GpsPoint,
        description: &str,
        layer: Layer,
    ) -> &Marker {
        self.next_marker += 1;
        let id = MarkerId(self.next_marker);
        self.markers.push(Marker {
            id,
            workout_id: workout_id.to_string(),
            position: coords,
            label: description.to_string(),
            layer,
        });
        self.markers_by_id.insert(workout_id.to_string(), id);
        debug!(
            "[Annotations] Marker {:?} for {} in {:?} layer",
            id, workout_id, layer
        );
        &self.markers[self.markers.len() - 1]
    }

    /// Remove the first marker positioned exactly at `coords`.
    pub fn remove_marker_at(&mut self, coords: GpsPoint) -> Option<Marker> {
        let index = self.markers.iter().position(|m| m.position == coords)?;
        let marker = self.markers.remove(index);
        if self.markers_by_id.get(&marker.workout_id) == Some(&marker.id) {
            self.markers_by_id.remove(&marker.workout_id);
        }
        Some(marker)
    }

    /// Remove a marker by id.
    pub fn remove_marker(&mut self, id: MarkerId) -> Option<Marker> {
        let index = self.markers.iter().position(|m| m.id == id)?;
        let marker = self.markers.remove(index);
        if self.markers_by_id.get(&marker.workout_id) == Some(&id) {
            self.markers_by_id.remove(&marker.workout_id);
        }
        Some(marker)
    }

    /// Store a drawn route and remember its center for the next workout.
    pub fn add_route(&mut self, vertices: Vec<GpsPoint>) -> Result<&RouteAnnotation> {
        let center = self.insert_route(vertices)?.center;
        self.pending_center = Some(center);
        Ok(&self.routes[self.routes.len() - 1])
    }

    /// Store a route restored from a snapshot. Does not set the pending center.
    pub fn restore_route(&mut self, vertices: Vec<GpsPoint>) -> Result<&RouteAnnotation> {
        self.insert_route(vertices)
    }

    fn insert_route(&mut self, vertices: Vec<GpsPoint>) -> Result<&RouteAnnotation> {
        let id = RouteId(self.next_route + 1);
        let route = RouteAnnotation::from_vertices(id, vertices)?;
        self.next_route += 1;
        self.routes.push(route);
        Ok(&self.routes[self.routes.len() - 1])
    }

    /// Remove the first route whose center equals `coords`.
    pub fn remove_route_at(&mut self, coords: GpsPoint) -> Option<RouteAnnotation> {
        let index = self.routes.iter().position(|r| r.center == coords)?;
        Some(self.routes.remove(index))
    }

    /// Take the pending route center, leaving none.
    pub fn take_pending_center(&mut self) -> Option<GpsPoint> {
        self.pending_center.take()
    }

    pub fn pending_center(&self) -> Option<GpsPoint> {
        self.pending_center
    }

    /// Empty markers, routes and the pending center.
    pub fn clear(&mut self) {
        self.markers.clear();
        self.markers_by_id.clear();
        self.routes.clear();
        self.pending_center = None;
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn routes(&self) -> &[RouteAnnotation] {
        &self.routes
    }

    /// Marker currently registered for a workout id.
    pub fn marker_for(&self, workout_id: &str) -> Option<&Marker> {
        let id = self.markers_by_id.get(workout_id)?;
        self.markers.iter().find(|m| m.id == *id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Markers held by one layer.
    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(move |m| m.layer == layer)
    }
}
