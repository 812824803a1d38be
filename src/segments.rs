//! Segment building
//!
//! Each pair of consecutive records becomes one segment carrying length,
//! duration, heading and whichever recorded fields both ends support. When a
//! weather table is supplied the segment is enriched with the observations at
//! its start time and with wind angles relative to its heading.

use std::collections::BTreeMap;

use crate::geo;
use crate::types::{Record, Segment};
use crate::weather::{WeatherTable, WeatherValue};

/// Builder for turning records into segments
pub struct SegmentBuilder;

impl SegmentBuilder {
    /// Build one segment per adjacent record pair
    pub fn build(records: &[Record], weather: Option<&WeatherTable>) -> Vec<Segment> {
        records
            .windows(2)
            .enumerate()
            .map(|(id, pair)| Self::build_segment(id, &pair[0], &pair[1], weather))
            .collect()
    }

    /// Build the segment between `start` and `end`
    pub fn build_segment(
        id: usize,
        start: &Record,
        end: &Record,
        weather: Option<&WeatherTable>,
    ) -> Segment {
        let pos_start = start.position();
        let pos_end = end.position();
        let length_calculated = geo::distance(pos_start, pos_end);

        let (distance_recorded_start, distance_recorded_end, length_recorded) =
            match (start.distance, end.distance) {
                (Some(d0), Some(d1)) => (Some(d0), Some(d1), Some(d1 - d0)),
                _ => (None, None, None),
            };

        let ascent = match (start.altitude, end.altitude) {
            (Some(a0), Some(a1)) => Some(a1 - a0),
            _ => None,
        };
        let gradient = ascent
            .filter(|_| length_calculated > 0.0)
            .map(|a| 100.0 * a / length_calculated);

        let mut segment = Segment {
            id,
            lat_start: start.lat,
            lon_start: start.lon,
            lat_end: end.lat,
            lon_end: end.lon,
            timestamp_start: start.timestamp,
            timestamp_end: end.timestamp,
            duration: (end.timestamp - start.timestamp).num_seconds(),
            length_calculated,
            heading: geo::bearing(pos_start, pos_end),
            distance_recorded_start,
            distance_recorded_end,
            length_recorded,
            temp_recorded_start: start.temperature,
            speed_recorded_start: start.speed,
            speed_recorded_end: end.speed,
            cadence_start: start.cadence,
            altitude_start: start.altitude,
            altitude_end: end.altitude,
            ascent,
            gradient,
            weather: BTreeMap::new(),
            twa: None,
            twa_rounded_abs: None,
            headwind: None,
        };

        if let Some(table) = weather {
            add_weather(&mut segment, table);
        }
        segment
    }
}

/// Join the weather at the segment start and derive wind angles
fn add_weather(segment: &mut Segment, table: &WeatherTable) {
    let Some(observations) = table.sample(segment.timestamp_start) else {
        return;
    };
    segment.weather = observations;

    let Some(wind_direction) = segment.weather.get("wind_direction").and_then(WeatherValue::as_f64)
    else {
        return;
    };
    let twa = geo::true_wind_angle(segment.heading, wind_direction);
    segment.twa = Some(twa);
    segment.twa_rounded_abs = Some((10.0 * (twa / 10.0).round_ties_even()).abs());

    if let Some(wind_speed) = segment.weather.get("wind_speed").and_then(WeatherValue::as_f64) {
        segment.headwind = Some(wind_speed * twa.to_radians().cos());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherRow;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
    }

    fn record(lat: f64, lon: f64, offset_ms: i64) -> Record {
        Record::new(lat, lon, t0() + Duration::milliseconds(offset_ms))
    }

    #[test]
    fn test_segment_count_and_ids() {
        let records: Vec<Record> = (0..6)
            .map(|i| record(52.0 + i as f64 * 0.001, 5.0, i * 1000))
            .collect();
        let segments = SegmentBuilder::build(&records, None);

        assert_eq!(segments.len(), records.len() - 1);
        let ids: Vec<usize> = segments.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_single_or_no_record_gives_no_segments() {
        assert!(SegmentBuilder::build(&[], None).is_empty());
        assert!(SegmentBuilder::build(&[record(52.0, 5.0, 0)], None).is_empty());
    }

    #[test]
    fn test_duration_truncates_fractional_seconds() {
        let records = vec![record(52.0, 5.0, 0), record(52.001, 5.0, 2_900)];
        let segments = SegmentBuilder::build(&records, None);
        assert_eq!(segments[0].duration, 2);
    }

    #[test]
    fn test_length_and_heading() {
        let records = vec![record(52.0, 5.0, 0), record(52.001, 5.0, 5_000)];
        let segment = &SegmentBuilder::build(&records, None)[0];
        assert!((segment.length_calculated - 111.19).abs() < 0.01);
        assert!(segment.heading.abs() < 1e-9);
    }

    #[test]
    fn test_recorded_field_passthrough() {
        let mut start = record(52.0, 5.0, 0);
        start.distance = Some(100.0);
        start.speed = Some(5.0);
        start.temperature = Some(17.0);
        start.altitude = Some(10.0);
        start.cadence = Some(88.0);
        let mut end = record(52.001, 5.0, 20_000);
        end.distance = Some(210.0);
        end.altitude = Some(12.0);

        let segment = SegmentBuilder::build_segment(0, &start, &end, None);
        assert_eq!(segment.distance_recorded_start, Some(100.0));
        assert_eq!(segment.distance_recorded_end, Some(210.0));
        assert_eq!(segment.length_recorded, Some(110.0));
        assert_eq!(segment.speed_recorded_start, Some(5.0));
        assert_eq!(segment.speed_recorded_end, None);
        assert_eq!(segment.cadence_start, Some(88.0));
        assert_eq!(segment.field("cadence_start"), Some(crate::types::Scalar::Number(88.0)));
        assert_eq!(segment.temp_recorded_start, Some(17.0));
        assert_eq!(segment.ascent, Some(2.0));
        let gradient = segment.gradient.unwrap();
        assert!((gradient - 200.0 / segment.length_calculated).abs() < 1e-12);
    }

    #[test]
    fn test_distance_requires_both_ends() {
        let mut start = record(52.0, 5.0, 0);
        start.distance = Some(100.0);
        let end = record(52.001, 5.0, 20_000);

        let segment = SegmentBuilder::build_segment(0, &start, &end, None);
        assert_eq!(segment.length_recorded, None);
        assert_eq!(segment.distance_recorded_start, None);
    }

    #[test]
    fn test_gradient_omitted_for_zero_length() {
        let mut start = record(52.0, 5.0, 0);
        start.altitude = Some(10.0);
        let mut end = record(52.0, 5.0, 10_000);
        end.altitude = Some(15.0);

        let segment = SegmentBuilder::build_segment(0, &start, &end, None);
        assert_eq!(segment.length_calculated, 0.0);
        assert_eq!(segment.ascent, Some(5.0));
        assert_eq!(segment.gradient, None);
    }

    #[test]
    fn test_negative_gradient_follows_ascent() {
        let mut start = record(52.0, 5.0, 0);
        start.altitude = Some(15.0);
        let mut end = record(52.001, 5.0, 10_000);
        end.altitude = Some(10.0);

        let segment = SegmentBuilder::build_segment(0, &start, &end, None);
        assert!(segment.gradient.unwrap() < 0.0);
    }

    fn hourly_weather() -> WeatherTable {
        WeatherTable::new(vec![
            WeatherRow::new(20240501, Some(10), None)
                .with("temperature", WeatherValue::Number(10.0))
                .with("wind_direction", WeatherValue::Number(180.0))
                .with("wind_speed", WeatherValue::Number(4.0)),
            WeatherRow::new(20240501, Some(11), None)
                .with("temperature", WeatherValue::Number(12.0))
                .with("wind_direction", WeatherValue::Number(180.0))
                .with("wind_speed", WeatherValue::Number(6.0)),
        ])
    }

    #[test]
    fn test_weather_interpolated_at_segment_start() {
        // Starts at 10:30 heading due north, wind from the south
        let records = vec![record(52.0, 5.0, 0), record(52.001, 5.0, 20_000)];
        let weather = hourly_weather();
        let segment = &SegmentBuilder::build(&records, Some(&weather))[0];

        assert_eq!(segment.weather["temperature"], WeatherValue::Number(11.0));
        assert_eq!(segment.weather["wind_speed"], WeatherValue::Number(5.0));
        assert!((segment.twa.unwrap() - 180.0).abs() < 1e-9);
        assert_eq!(segment.twa_rounded_abs, Some(180.0));
        assert!((segment.headwind.unwrap() + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_wind_angles_relative_to_heading() {
        // Heading due east, wind from the north
        let table = WeatherTable::new(vec![WeatherRow::new(20240501, None, None)
            .with("wind_direction", WeatherValue::Number(0.0))
            .with("wind_speed", WeatherValue::Number(3.0))]);
        let records = vec![record(0.0, 0.0, 0), record(0.0, 0.001, 10_000)];
        let segment = &SegmentBuilder::build(&records, Some(&table))[0];

        assert!((segment.twa.unwrap() + 90.0).abs() < 1e-6);
        assert_eq!(segment.twa_rounded_abs, Some(90.0));
        assert!(segment.headwind.unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_no_matching_weather_leaves_segment_unenriched() {
        let records = vec![record(52.0, 5.0, 0), record(52.001, 5.0, 20_000)];
        let weather = WeatherTable::new(vec![WeatherRow::new(20240601, Some(10), None)
            .with("wind_direction", WeatherValue::Number(90.0))]);
        let segment = &SegmentBuilder::build(&records, Some(&weather))[0];

        assert!(segment.weather.is_empty());
        assert_eq!(segment.twa, None);
        assert_eq!(segment.headwind, None);
    }

    #[test]
    fn test_wind_speed_without_direction() {
        let table = WeatherTable::new(vec![WeatherRow::new(20240501, None, None)
            .with("wind_speed", WeatherValue::Number(3.0))]);
        let records = vec![record(52.0, 5.0, 0), record(52.001, 5.0, 20_000)];
        let segment = &SegmentBuilder::build(&records, Some(&table))[0];

        assert_eq!(segment.weather["wind_speed"], WeatherValue::Number(3.0));
        assert_eq!(segment.twa, None);
        assert_eq!(segment.headwind, None);
    }
}
