//! Point-in-region containment.
//!
//! Uses planar lat/lon geometry with the even-odd ray casting rule. A point is
//! inside a region if any one of its polygons contains it.

use crate::model::{Coordinate, Region, Vertex};

/// True if `point` lies inside any polygon of `region`.
///
/// Regions with no polygons never contain anything. Polygons with fewer than
/// three vertices are skipped.
pub fn contains(point: &Coordinate, region: &Region) -> bool {
    region
        .polygons
        .iter()
        .filter(|p| p.len() >= 3)
        .any(|p| polygon_contains(p, point.lon(), point.lat()))
}

/// Even-odd ray casting with `x` as longitude and `y` as latitude.
fn polygon_contains(polygon: &[Vertex], x: f64, y: f64) -> bool {
    let mut inside = false;
    let n = polygon.len();

    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i].lon, polygon[i].lat);
        let (xj, yj) = (polygon[j].lon, polygon[j].lat);

        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Polygon;

    fn square(min_lat: f64, min_lon: f64, size: f64) -> Polygon {
        vec![
            Vertex::new(min_lat, min_lon),
            Vertex::new(min_lat, min_lon + size),
            Vertex::new(min_lat + size, min_lon + size),
            Vertex::new(min_lat + size, min_lon),
        ]
    }

    fn point(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_inside_and_outside_single_ring() {
        let region = Region::new("box", vec![square(40.0, -80.0, 5.0)]);
        assert!(contains(&point(42.5, -77.5), &region));
        assert!(!contains(&point(46.0, -77.5), &region));
        assert!(!contains(&point(42.5, -81.0), &region));
    }

    #[test]
    fn test_any_polygon_of_multipolygon() {
        let region = Region::new(
            "islands",
            vec![square(0.0, 0.0, 1.0), square(10.0, 10.0, 1.0)],
        );
        assert!(contains(&point(0.5, 0.5), &region));
        assert!(contains(&point(10.5, 10.5), &region));
        assert!(!contains(&point(5.0, 5.0), &region));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening north: the notch between the arms is outside
        let u = vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(0.0, 3.0),
            Vertex::new(3.0, 3.0),
            Vertex::new(3.0, 2.0),
            Vertex::new(1.0, 2.0),
            Vertex::new(1.0, 1.0),
            Vertex::new(3.0, 1.0),
            Vertex::new(3.0, 0.0),
        ];
        let region = Region::new("u", vec![u]);
        assert!(contains(&point(2.0, 0.5), &region));
        assert!(contains(&point(0.5, 1.5), &region));
        assert!(!contains(&point(2.0, 1.5), &region));
    }

    #[test]
    fn test_unknown_boundary_contains_nothing() {
        assert!(!contains(&point(0.0, 0.0), &Region::unknown("void")));
    }

    #[test]
    fn test_degenerate_polygon_skipped() {
        let region = Region::new(
            "mixed",
            vec![
                vec![Vertex::new(0.0, 0.0), Vertex::new(1.0, 1.0)],
                square(20.0, 20.0, 2.0),
            ],
        );
        assert!(!contains(&point(0.5, 0.5), &region));
        assert!(contains(&point(21.0, 21.0), &region));
    }
}
