//! Geo math
//!
//! Pure functions for great-circle distance, initial bearing and true wind
//! angle. Inputs are decimal degrees; outputs are metres or degrees.

use crate::types::Position;

/// Mean Earth radius (m)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two positions in metres (haversine)
pub fn distance(p1: Position, p2: Position) -> f64 {
    let dlat = (p2.lat - p1.lat).to_radians();
    let dlon = (p2.lon - p1.lon).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + p1.lat.to_radians().cos() * p2.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` marginally past 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `origin` towards `destination`, in [0, 360)
pub fn bearing(origin: Position, destination: Position) -> f64 {
    let lat1 = origin.lat.to_radians();
    let lat2 = destination.lat.to_radians();
    let diff_lon = (destination.lon - origin.lon).to_radians();

    let x = diff_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * diff_lon.cos();
    let initial = x.atan2(y).to_degrees();

    let bearing = (initial + 360.0) % 360.0;
    // (-tiny + 360) % 360 rounds to exactly 360.0
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Signed angle of the wind relative to the heading, in (-180, 180]
pub fn true_wind_angle(heading: f64, wind_direction: f64) -> f64 {
    let twa = (360.0 + (wind_direction - heading)).rem_euclid(360.0);
    if twa > 180.0 {
        twa - 360.0
    } else {
        twa
    }
}

/// Element-wise median of a set of positions
pub fn median_position<I>(positions: I) -> Option<Position>
where
    I: IntoIterator<Item = Position>,
{
    let (lats, lons): (Vec<f64>, Vec<f64>) =
        positions.into_iter().map(|p| (p.lat, p.lon)).unzip();
    Some(Position::new(median(lats)?, median(lons)?))
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(lat: f64, lon: f64) -> Position {
        Position::new(lat, lon)
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        for p in [pos(0.0, 0.0), pos(52.37, 4.89), pos(-89.9, 179.9), pos(90.0, -180.0)] {
            assert_eq!(distance(p, p), 0.0);
        }
    }

    #[test]
    fn test_distance_known_values() {
        // One degree of latitude along a meridian
        let d = distance(pos(0.0, 0.0), pos(1.0, 0.0));
        assert!((d - 111_194.9).abs() < 1.0);

        // Antipodal points are half the circumference apart
        let d = distance(pos(0.0, 0.0), pos(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1e-3);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = pos(52.0, 5.0);
        assert!(bearing(origin, pos(53.0, 5.0)).abs() < 1e-9);
        assert!((bearing(origin, pos(51.0, 5.0)) - 180.0).abs() < 1e-9);
        assert!((bearing(pos(0.0, 0.0), pos(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing(pos(0.0, 0.0), pos(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_is_initial_not_final() {
        // Eastward at high latitude: initial bearing is north of east
        let b = bearing(pos(60.0, 0.0), pos(60.0, 10.0));
        assert!(b < 90.0 && b > 80.0);
    }

    #[test]
    fn test_bearing_range() {
        let points = [pos(10.0, 10.0), pos(-10.0, 10.0), pos(10.0, -10.0), pos(-10.0, -10.0)];
        for a in points {
            for b in points {
                if a != b {
                    let value = bearing(a, b);
                    assert!((0.0..360.0).contains(&value), "bearing {} out of range", value);
                }
            }
        }
    }

    #[test]
    fn test_true_wind_angle() {
        assert_eq!(true_wind_angle(0.0, 0.0), 0.0);
        assert_eq!(true_wind_angle(0.0, 90.0), 90.0);
        assert_eq!(true_wind_angle(0.0, 180.0), 180.0);
        assert_eq!(true_wind_angle(0.0, 270.0), -90.0);
        assert_eq!(true_wind_angle(350.0, 10.0), 20.0);
        assert_eq!(true_wind_angle(10.0, 350.0), -20.0);
    }

    #[test]
    fn test_true_wind_angle_antisymmetry() {
        // Swapping heading and wind direction mirrors the angle, except at 180
        for heading in (0..360).step_by(15) {
            for wind in (0..360).step_by(25) {
                let (h, w) = (heading as f64, wind as f64);
                let forward = true_wind_angle(h, w);
                let swapped = true_wind_angle(w, h);
                assert!(forward > -180.0 && forward <= 180.0);
                if forward.abs() != 180.0 {
                    assert_eq!(forward, -swapped);
                } else {
                    assert_eq!(swapped, 180.0);
                }
            }
        }
    }

    #[test]
    fn test_median_position() {
        let median = median_position(vec![pos(1.0, 10.0), pos(3.0, 30.0), pos(2.0, 50.0)]).unwrap();
        assert_eq!(median, pos(2.0, 30.0));

        let median = median_position(vec![pos(1.0, 10.0), pos(3.0, 30.0)]).unwrap();
        assert_eq!(median, pos(2.0, 20.0));

        assert!(median_position(Vec::new()).is_none());
    }
}
