//! Spherical geometry for waypoint sequences.

use crate::models::{BoundingBox, Waypoint};

/// Mean Earth radius used by every distance in the crate.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance between two points in kilometers (haversine).
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

pub fn waypoint_distance_km(a: &Waypoint, b: &Waypoint) -> f64 {
    distance_km(a.lat, a.lng, b.lat, b.lng)
}

/// Initial compass bearing from point 1 to point 2, in degrees `[0, 360)`.
pub fn bearing_deg(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    let deg = x.atan2(y).to_degrees().rem_euclid(360.0);
    // rem_euclid can round a tiny negative angle up to exactly 360.0
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

pub fn waypoint_bearing_deg(from: &Waypoint, to: &Waypoint) -> f64 {
    bearing_deg(from.lat, from.lng, to.lat, to.lng)
}

/// Signed change from `incoming` to `outgoing` bearing, wrapped to `(-180, 180]`.
///
/// Positive values turn clockwise (right), negative counter-clockwise (left).
pub fn turn_delta_deg(incoming: f64, outgoing: f64) -> f64 {
    let delta = (outgoing - incoming).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Unsigned turn angle in `[0, 180]`, i.e. `min(|Δ|, 360 - |Δ|)`.
pub fn turn_angle_deg(incoming: f64, outgoing: f64) -> f64 {
    let raw = (outgoing - incoming).abs();
    raw.min(360.0 - raw).abs()
}

/// Total path length in kilometers; 0 for sequences shorter than two points.
pub fn cumulative_distance_km(points: &[Waypoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| waypoint_distance_km(&pair[0], &pair[1]))
        .sum()
}

/// Distance along the path from the first point to each point.
pub fn distances_from_start_km(points: &[Waypoint]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (idx, point) in points.iter().enumerate() {
        if idx > 0 {
            total += waypoint_distance_km(&points[idx - 1], point);
        }
        out.push(total);
    }
    out
}

pub fn bounding_box(points: &[Waypoint]) -> Option<BoundingBox> {
    let first = points.first()?;
    let mut bounds = BoundingBox {
        north: first.lat,
        south: first.lat,
        east: first.lng,
        west: first.lng,
    };
    for point in &points[1..] {
        bounds.north = bounds.north.max(point.lat);
        bounds.south = bounds.south.min(point.lat);
        bounds.east = bounds.east.max(point.lng);
        bounds.west = bounds.west.min(point.lng);
    }
    Some(bounds)
}

/// Grow a bounding box by `padding_km` on every side.
pub fn expand_bounds_km(bounds: &BoundingBox, padding_km: f64) -> BoundingBox {
    let padding_m = padding_km.max(0.0) * 1000.0;
    let ref_lat = bounds.center().lat;
    let pad_lat = padding_m / meters_per_deg_lat(ref_lat);
    let pad_lng = padding_m / meters_per_deg_lon(ref_lat).max(1.0);
    BoundingBox {
        north: (bounds.north + pad_lat).min(90.0),
        south: (bounds.south - pad_lat).max(-90.0),
        east: (bounds.east + pad_lng).min(180.0),
        west: (bounds.west - pad_lng).max(-180.0),
    }
}

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lng` - Starting position in degrees
/// * `distance_km` - Distance in kilometers
/// * `bearing` - Bearing in degrees (0 = north, 90 = east)
///
/// # Returns
/// (new_lat, new_lng) in degrees
pub fn offset_by_bearing(lat: f64, lng: f64, distance_km: f64, bearing: f64) -> (f64, f64) {
    if distance_km.abs() <= f64::EPSILON {
        return (lat, lng);
    }

    let lat1 = lat.to_radians();
    let lng1 = lng.to_radians();
    let bearing_rad = bearing.to_radians();
    let angular_distance = distance_km / EARTH_RADIUS_KM;

    let sin_lat2 = lat1.sin() * angular_distance.cos()
        + lat1.cos() * angular_distance.sin() * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * angular_distance.sin() * lat1.cos();
    let x = angular_distance.cos() - lat1.sin() * sin_lat2;
    let mut lng2 = lng1 + y.atan2(x);
    lng2 =
        (lng2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lng2.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let dist = distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111.19).abs() / 111.19 < 0.005, "got {dist}");

        let points = vec![Waypoint::new(45.0, 7.0), Waypoint::new(46.0, 7.0)];
        let total = cumulative_distance_km(&points);
        assert!((total - 111.19).abs() / 111.19 < 0.005, "got {total}");
        assert!((total - waypoint_distance_km(&points[0], &points[1])).abs() < 1e-12);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let pairs = [
            ((33.6846, -117.8265), (34.0522, -118.2437)),
            ((-33.86, 151.21), (51.5, -0.12)),
            ((89.9, 10.0), (-89.9, -170.0)),
        ];
        for ((lat1, lng1), (lat2, lng2)) in pairs {
            let ab = distance_km(lat1, lng1, lat2, lng2);
            let ba = distance_km(lat2, lng2, lat1, lng1);
            assert!((ab - ba).abs() < 1e-9);
            assert!(distance_km(lat1, lng1, lat1, lng1).abs() < 1e-12);
        }
    }

    #[test]
    fn bearing_stays_in_range() {
        let samples = [-89.0, -45.5, -1.0, 0.0, 0.5, 30.0, 60.0, 89.0];
        for &lat1 in &samples {
            for &lat2 in &samples {
                for lng2 in [-179.5, -90.0, -0.001, 0.0, 0.001, 90.0, 179.5] {
                    let b = bearing_deg(lat1, 0.0, lat2, lng2);
                    assert!((0.0..360.0).contains(&b), "bearing {b} out of range");
                }
            }
        }
    }

    #[test]
    fn cardinal_bearings() {
        assert!(bearing_deg(10.0, 10.0, 11.0, 10.0).abs() < 1e-9);
        assert!((bearing_deg(0.0, 10.0, 0.0, 11.0) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(11.0, 10.0, 10.0, 10.0) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(0.0, 11.0, 0.0, 10.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn turn_delta_wraps_across_north() {
        assert!((turn_delta_deg(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((turn_delta_deg(10.0, 350.0) + 20.0).abs() < 1e-9);
        assert!((turn_delta_deg(0.0, 180.0) - 180.0).abs() < 1e-9);
        assert!((turn_angle_deg(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((turn_angle_deg(90.0, 0.0) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn short_sequences_have_zero_length() {
        assert_eq!(cumulative_distance_km(&[]), 0.0);
        assert_eq!(cumulative_distance_km(&[Waypoint::new(1.0, 1.0)]), 0.0);
        assert!(bounding_box(&[]).is_none());
        assert_eq!(distances_from_start_km(&[Waypoint::new(1.0, 1.0)]), vec![0.0]);
    }

    #[test]
    fn offset_by_bearing_matches_distance() {
        let (lat, lng) = offset_by_bearing(12.97, 77.59, 2.5, 45.0);
        let dist = distance_km(12.97, 77.59, lat, lng);
        assert!((dist - 2.5).abs() < 1e-6);
        let bearing = bearing_deg(12.97, 77.59, lat, lng);
        assert!((bearing - 45.0).abs() < 1e-3);
    }

    #[test]
    fn expand_bounds_pads_every_side() {
        let bounds = BoundingBox {
            north: 13.0,
            south: 12.0,
            east: 78.0,
            west: 77.0,
        };
        let padded = expand_bounds_km(&bounds, 1.0);
        assert!(padded.north > bounds.north && padded.south < bounds.south);
        assert!(padded.east > bounds.east && padded.west < bounds.west);
        let pad_km = distance_km(bounds.north, 77.5, padded.north, 77.5);
        assert!((pad_km - 1.0).abs() < 0.01);
    }
}
