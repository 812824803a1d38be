//! FIT track reader
//!
//! Extracts `record` messages from Garmin FIT files. Positions are left in
//! semicircles.

use chrono::Utc;
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value as FitValue};

use super::TrackReader;
use crate::error::RideError;
use crate::types::{RawPoint, RawTrack, RawValue, TrackFormat};

/// FIT file reader
pub struct FitReader;

impl TrackReader for FitReader {
    fn read(&self, bytes: &[u8]) -> Result<RawTrack, RideError> {
        let messages =
            fitparser::from_bytes(bytes).map_err(|e| RideError::MalformedTrack(e.to_string()))?;

        Ok(collect_track(&messages))
    }
}

/// Sport from the first session message and one point per positioned record
fn collect_track(messages: &[FitDataRecord]) -> RawTrack {
    let mut sport = None;
    let mut points = Vec::new();

    for message in messages {
        match message.kind() {
            MesgNum::Session if sport.is_none() => {
                sport = message
                    .fields()
                    .iter()
                    .find(|field| field.name() == "sport")
                    .and_then(|field| fit_value_to_text(field.value()));
            }
            MesgNum::Record => {
                let mut point = RawPoint::new();
                for field in message.fields() {
                    if let Some(value) = fit_value_to_raw(field.value()) {
                        point.insert(field.name(), value);
                    }
                }
                // Records without a GPS fix carry no position fields
                if point.contains("position_lat") {
                    points.push(point);
                }
            }
            _ => {}
        }
    }

    RawTrack {
        format: TrackFormat::Fit,
        sport,
        points,
    }
}

fn fit_value_to_raw(value: &FitValue) -> Option<RawValue> {
    match value {
        FitValue::Timestamp(ts) => Some(RawValue::Timestamp(ts.with_timezone(&Utc))),
        FitValue::Float32(v) => Some(RawValue::Float(*v as f64)),
        FitValue::Float64(v) => Some(RawValue::Float(*v)),
        FitValue::SInt8(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::UInt8(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::UInt8z(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::Byte(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::SInt16(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::UInt16(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::UInt16z(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::SInt32(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::UInt32(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::UInt32z(v) => Some(RawValue::Integer(*v as i64)),
        FitValue::SInt64(v) => Some(RawValue::Integer(*v)),
        FitValue::UInt64(v) => i64::try_from(*v).ok().map(RawValue::Integer),
        FitValue::UInt64z(v) => i64::try_from(*v).ok().map(RawValue::Integer),
        FitValue::String(s) => Some(RawValue::Text(s.clone())),
        FitValue::Array(values) => values.iter().find_map(fit_value_to_raw),
        _ => None,
    }
}

fn fit_value_to_text(value: &FitValue) -> Option<String> {
    match value {
        FitValue::String(s) => Some(s.clone()),
        FitValue::Enum(v) => Some(v.to_string()),
        _ => None,
    }
}
