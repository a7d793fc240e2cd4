//! Geographic utilities: great-circle distances, path lengths, vertex centroids.

use geo::{BoundingRect, Centroid, Distance, Haversine, MultiPoint, Point};

use crate::{Bounds, GpsPoint};

fn to_point(p: &GpsPoint) -> Point<f64> {
    Point::new(p.longitude, p.latitude)
}

/// Great-circle distance between two points in meters.
///
/// # Example
/// ```
/// use workout_map::GpsPoint;
/// use workout_map::geo_utils::haversine_distance;
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
/// let km = haversine_distance(&london, &paris) / 1000.0;
/// assert!((km - 343.5).abs() < 2.0);
/// ```
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    Haversine::distance(to_point(p1), to_point(p2))
}

/// Sum of great-circle distances between consecutive vertices, in meters.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(&pair[0], &pair[1]))
        .sum()
}

fn to_multi_point(points: &[GpsPoint]) -> MultiPoint<f64> {
    points.iter().map(to_point).collect::<Vec<_>>().into()
}

/// Arithmetic centroid of the vertices. `None` for an empty slice.
pub fn compute_center(points: &[GpsPoint]) -> Option<GpsPoint> {
    to_multi_point(points)
        .centroid()
        .map(|c| GpsPoint::new(c.y(), c.x()))
}

/// Smallest box holding every point. `None` for an empty slice.
pub fn compute_bounds(points: &[GpsPoint]) -> Option<Bounds> {
    let rect = to_multi_point(points).bounding_rect()?;
    Some(Bounds {
        south: rect.min().y,
        west: rect.min().x,
        north: rect.max().y,
        east: rect.max().x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = GpsPoint::new(46.948, 7.447);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_polyline_length_one_degree_latitude() {
        let points = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(1.0, 0.0)];
        let length = polyline_length(&points);
        // One degree of latitude is ~111.2km on the mean-radius sphere
        assert!((length - 111_195.0).abs() < 100.0, "got {}", length);
    }

    #[test]
    fn test_polyline_length_needs_two_points() {
        assert_eq!(polyline_length(&[GpsPoint::new(1.0, 1.0)]), 0.0);
        assert_eq!(polyline_length(&[]), 0.0);
    }

    #[test]
    fn test_compute_center_is_vertex_mean() {
        let points = vec![
            GpsPoint::new(10.0, 20.0),
            GpsPoint::new(12.0, 20.0),
            GpsPoint::new(14.0, 26.0),
        ];
        let center = compute_center(&points).unwrap();
        assert!((center.latitude - 12.0).abs() < 1e-9);
        assert!((center.longitude - 22.0).abs() < 1e-9);
        assert!(compute_center(&[]).is_none());
    }

    #[test]
    fn test_compute_bounds_edges() {
        let points = vec![
            GpsPoint::new(10.0, 20.0),
            GpsPoint::new(12.0, 18.0),
            GpsPoint::new(11.0, 25.0),
        ];
        let bounds = compute_bounds(&points).unwrap();
        assert_eq!(bounds.south, 10.0);
        assert_eq!(bounds.north, 12.0);
        assert_eq!(bounds.west, 18.0);
        assert_eq!(bounds.east, 25.0);
        assert!(compute_bounds(&[]).is_none());
    }
}
