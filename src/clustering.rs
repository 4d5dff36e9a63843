//! Proximity clustering of hotspots into fires.
//!
//! Hotspots are sorted by latitude then longitude and walked in order. A
//! hotspot joins the current bundle when both its latitude and longitude are
//! within [`CLUSTER_THRESHOLD`] of the *previous* hotspot in sort order. This
//! is chain adjacency: a long run of close neighbours ends up in one bundle
//! even when its ends are far apart.

use tracing::debug;

use crate::error::{Result, validation};
use crate::model::{Coordinate, Fire};

/// Maximum per-axis separation (degrees) between neighbouring hotspots of a bundle.
pub const CLUSTER_THRESHOLD: f64 = 0.001;

/// Scale applied to the half-diameter in degrees to obtain the fire radius.
pub const RADIUS_SCALE: f64 = 10.0;

/// Radius given to bundles with no spatial extent (a single hotspot, or
/// several detections at the identical position).
///
/// Half of the adjacency threshold, scaled like any other radius.
pub const MIN_FIRE_RADIUS: f64 = CLUSTER_THRESHOLD / 2.0 * RADIUS_SCALE;

/// Cluster raw hotspots into fires.
///
/// Empty input yields no fires.
pub fn cluster(points: &[Coordinate]) -> Result<Vec<Fire>> {
    let bundles = bundle(points);
    debug!(
        hotspots = points.len(),
        bundles = bundles.len(),
        "Clustered hotspots"
    );
    make_fire_list(bundles)
}

/// Group hotspots into proximity bundles using the chained-adjacency rule.
pub fn bundle(points: &[Coordinate]) -> Vec<Vec<Coordinate>> {
    let mut sorted: Vec<Coordinate> = points.to_vec();
    sorted.sort_by(|a, b| {
        a.lat()
            .total_cmp(&b.lat())
            .then_with(|| a.lon().total_cmp(&b.lon()))
    });

    let mut bundles: Vec<Vec<Coordinate>> = Vec::new();
    let mut current: Vec<Coordinate> = Vec::new();

    for point in sorted {
        let extends = current.last().is_some_and(|prev| is_adjacent(prev, &point));
        if !extends && !current.is_empty() {
            bundles.push(std::mem::take(&mut current));
        }
        current.push(point);
    }

    if !current.is_empty() {
        bundles.push(current);
    }

    bundles
}

fn is_adjacent(prev: &Coordinate, next: &Coordinate) -> bool {
    (next.lat() - prev.lat()).abs() < CLUSTER_THRESHOLD
        && (next.lon() - prev.lon()).abs() < CLUSTER_THRESHOLD
}

/// Turn every bundle into a fire, preserving order.
pub fn make_fire_list(bundles: Vec<Vec<Coordinate>>) -> Result<Vec<Fire>> {
    bundles.into_iter().map(make_fire).collect()
}

/// Derive a fire from a non-empty bundle of hotspots.
///
/// The center is the mean position with mean brightness channels and mean
/// FRP; its capture metadata stays unset because it is a synthetic point.
pub fn make_fire(members: Vec<Coordinate>) -> Result<Fire> {
    if members.is_empty() {
        return Err(validation("cannot derive a fire from an empty bundle"));
    }

    let n = members.len() as f64;
    let mean = |f: fn(&Coordinate) -> f64| members.iter().map(f).sum::<f64>() / n;

    let center = Coordinate::new(mean(Coordinate::lat), mean(Coordinate::lon))?
        .with_brightness(
            mean(Coordinate::brightness),
            mean(Coordinate::brightness_secondary),
        )
        .with_frp(mean(Coordinate::frp));

    let radius = fire_radius(&members);
    Fire::new(center, radius, members)
}

/// Radius of a bundle from its latitude and longitude spread.
///
/// Only the longitude spread is halved before averaging. This asymmetry is
/// kept as-is; see the `radius_halves_only_longitude_spread` test.
fn fire_radius(members: &[Coordinate]) -> f64 {
    let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
    for c in members {
        min_lat = min_lat.min(c.lat());
        max_lat = max_lat.max(c.lat());
        min_lon = min_lon.min(c.lon());
        max_lon = max_lon.max(c.lon());
    }

    let lat_spread = max_lat - min_lat;
    let lon_spread = max_lon - min_lon;
    let avg_diameter = lat_spread + lon_spread / 2.0;
    let radius = (avg_diameter / 2.0) * RADIUS_SCALE;

    // also catches spreads too small to survive the halving
    if radius > 0.0 { radius } else { MIN_FIRE_RADIUS }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn hotspot(lat: f64, lon: f64, frp: f64) -> Coordinate {
        point(lat, lon).with_frp(frp).with_brightness(320.0, 290.0)
    }

    #[test]
    fn test_empty_input_yields_no_bundles() {
        assert!(bundle(&[]).is_empty());
        assert!(cluster(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_point_is_one_bundle() {
        let p = point(12.0, 34.0);
        let bundles = bundle(std::slice::from_ref(&p));
        assert_eq!(bundles, vec![vec![p]]);
    }

    #[test]
    fn test_single_point_fire_uses_minimum_radius() {
        let fires = cluster(&[hotspot(12.0, 34.0, 2.0)]).unwrap();
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].radius(), MIN_FIRE_RADIUS);
        assert_eq!(fires[0].hotspot_count(), 1);
    }

    #[test]
    fn test_coincident_points_use_minimum_radius() {
        let fires = cluster(&[hotspot(1.0, 1.0, 1.0), hotspot(1.0, 1.0, 3.0)]).unwrap();
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].radius(), MIN_FIRE_RADIUS);
        assert!((fires[0].center().frp() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_vanishing_spread_uses_minimum_radius() {
        // the smallest subnormal longitude gap halves to zero
        let fires = cluster(&[
            hotspot(10.0, 0.0, 1.0),
            hotspot(10.0, 5e-324, 1.0),
        ])
        .unwrap();
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].hotspot_count(), 2);
        assert_eq!(fires[0].radius(), MIN_FIRE_RADIUS);
    }

    #[test]
    fn test_chain_adjacency_spans_beyond_threshold() {
        // each neighbour is 0.0005 apart, ends are 0.002 apart
        let points: Vec<Coordinate> = (0..5)
            .map(|i| point(10.0 + f64::from(i) * 0.0005, 20.0))
            .collect();

        let bundles = bundle(&points);
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].len(), 5);
        let first = bundles[0].first().unwrap();
        let last = bundles[0].last().unwrap();
        assert!(last.lat() - first.lat() > CLUSTER_THRESHOLD);
    }

    #[test]
    fn test_chain_is_ordered_by_sort_not_input() {
        let points = vec![
            point(10.0010, 20.0),
            point(10.0000, 20.0),
            point(10.0005, 20.0),
        ];
        let bundles = bundle(&points);
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0][0].lat(), 10.0);
        assert_eq!(bundles[0][2].lat(), 10.0010);
    }

    #[test]
    fn test_distant_points_split() {
        let points = vec![point(10.0, 20.0), point(10.0, 20.5), point(45.0, -70.0)];
        assert_eq!(bundle(&points).len(), 3);
    }

    #[test]
    fn test_longitude_gap_breaks_bundle() {
        // latitudes are adjacent but longitude differs by more than the threshold
        let points = vec![point(10.0, 20.0), point(10.0002, 20.002)];
        assert_eq!(bundle(&points).len(), 2);
    }

    #[test]
    fn test_fire_list_matches_bundle_count() {
        let points = vec![
            point(10.0, 20.0),
            point(10.0003, 20.0003),
            point(30.0, 40.0),
            point(50.0, 60.0),
        ];
        let bundles = bundle(&points);
        let expected = bundles.len();
        assert_eq!(make_fire_list(bundles).unwrap().len(), expected);
    }

    #[test]
    fn test_make_fire_rejects_empty_bundle() {
        assert!(make_fire(Vec::new()).is_err());
    }

    #[test]
    fn test_two_point_fire_center_and_radius() {
        let fires = cluster(&[
            hotspot(43.7000, -79.4000, 5.0),
            hotspot(43.7001, -79.4001, 5.0),
        ])
        .unwrap();

        assert_eq!(fires.len(), 1);
        let fire = &fires[0];
        assert!((fire.center().lat() - 43.70005).abs() < 1e-9);
        assert!((fire.center().lon() - (-79.40005)).abs() < 1e-9);
        assert!((fire.center().frp() - 5.0).abs() < 1e-12);
        assert!((fire.center().brightness() - 320.0).abs() < 1e-9);
        assert!(fire.center().capture_date().is_none());
        assert!(fire.center().day_night().is_none());
        assert!(fire.center().confidence().is_none());
        // (0.0001 + 0.0001 / 2) / 2 * 10
        assert!((fire.radius() - 0.00075).abs() < 1e-9);
    }

    #[test]
    fn radius_halves_only_longitude_spread() {
        // Known quirk: the longitude spread is halved but the latitude spread is not,
        // so an east-west bundle gets half the radius of the same bundle rotated north-south.
        let east_west = cluster(&[point(5.0, 5.0), point(5.0, 5.0008)]).unwrap();
        let north_south = cluster(&[point(5.0, 5.0), point(5.0008, 5.0)]).unwrap();

        assert!((east_west[0].radius() - 0.002).abs() < 1e-9);
        assert!((north_south[0].radius() - 0.004).abs() < 1e-9);
    }
}
