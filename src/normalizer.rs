//! Record normalization
//!
//! This module converts raw per-point field mappings into canonical records.
//! - FIT positions converted from semicircles to degrees
//! - GPX timestamps parsed from ISO-8601 text
//! - Points without a usable position or timestamp dropped
//! - Points stamped earlier than the previous kept point dropped

use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;

use crate::types::{Position, RawPoint, RawTrack, RawValue, Record, TrackFormat};

/// Degrees per semicircle (180 / 2^31)
pub const DEGREES_PER_SEMICIRCLE: f64 = 180.0 / 2_147_483_648.0;

/// Convert a FIT semicircle value to decimal degrees
pub fn semicircles_to_degrees(semicircles: f64) -> f64 {
    semicircles * DEGREES_PER_SEMICIRCLE
}

/// Normalizer for converting raw track points to records
pub struct Normalizer;

impl Normalizer {
    /// Normalize every point of a track, dropping unusable ones
    pub fn normalize(track: &RawTrack) -> Vec<Record> {
        let mut records: Vec<Record> = Vec::with_capacity(track.points.len());
        let mut out_of_order = 0;

        for point in &track.points {
            let Some(record) = Self::normalize_point(track.format, point) else {
                continue;
            };
            // Timestamps must not go backwards within a track
            if records.last().is_some_and(|last| record.timestamp < last.timestamp) {
                out_of_order += 1;
                continue;
            }
            records.push(record);
        }

        let dropped = track.points.len() - records.len();
        if dropped > 0 {
            debug!(
                "dropped {} of {} track points ({} out of time order)",
                dropped,
                track.points.len(),
                out_of_order
            );
        }
        records
    }

    /// Normalize a single point; `None` if it lacks position or time
    pub fn normalize_point(format: TrackFormat, point: &RawPoint) -> Option<Record> {
        let record = match format {
            TrackFormat::Fit => normalize_fit_point(point)?,
            TrackFormat::Gpx => normalize_gpx_point(point)?,
        };
        if Position::new(record.lat, record.lon).is_valid() {
            Some(record)
        } else {
            None
        }
    }
}

fn normalize_fit_point(point: &RawPoint) -> Option<Record> {
    let lat = number(point, "position_lat").map(semicircles_to_degrees)?;
    let lon = number(point, "position_long").map(semicircles_to_degrees)?;
    let timestamp = point.get("timestamp").and_then(timestamp_value)?;

    let mut record = Record::new(lat, lon, timestamp);
    record.altitude = number(point, "altitude").or_else(|| number(point, "enhanced_altitude"));
    record.speed = number(point, "speed").or_else(|| number(point, "enhanced_speed"));
    record.distance = number(point, "distance");
    record.temperature = number(point, "temperature");
    record.cadence = number(point, "cadence");
    Some(record)
}

fn normalize_gpx_point(point: &RawPoint) -> Option<Record> {
    let lat = number(point, "lat")?;
    let lon = number(point, "lon")?;
    let timestamp = point.get("time").and_then(timestamp_value)?;

    let mut record = Record::new(lat, lon, timestamp);
    record.altitude = number(point, "ele");
    record.temperature = number(point, "atemp");
    record.cadence = number(point, "cad");
    Some(record)
}

fn number(point: &RawPoint, name: &str) -> Option<f64> {
    point
        .get(name)
        .and_then(RawValue::as_f64)
        .filter(|v| v.is_finite())
}

fn timestamp_value(value: &RawValue) -> Option<DateTime<Utc>> {
    match value {
        RawValue::Timestamp(ts) => Some(*ts),
        RawValue::Text(text) => parse_timestamp(text),
        _ => None,
    }
}

/// Parse an ISO-8601 timestamp; values without an offset are taken as UTC
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
