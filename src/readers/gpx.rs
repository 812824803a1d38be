//! GPX track reader

use std::io::Cursor;

use super::TrackReader;
use crate::error::RideError;
use crate::types::{RawPoint, RawTrack, RawValue, TrackFormat};

/// GPX file reader
///
/// Emits `lat`/`lon` in decimal degrees, `time` as an ISO-8601 string and
/// `ele` when the point carries an elevation. Points without a timestamp are
/// skipped.
pub struct GpxReader;

impl TrackReader for GpxReader {
    fn read(&self, bytes: &[u8]) -> Result<RawTrack, RideError> {
        let document =
            gpx::read(Cursor::new(bytes)).map_err(|e| RideError::MalformedTrack(e.to_string()))?;

        let mut points = Vec::new();
        for track in &document.tracks {
            for segment in &track.segments {
                for waypoint in &segment.points {
                    let Some(time) = &waypoint.time else {
                        continue;
                    };
                    let iso = time
                        .format()
                        .map_err(|e| RideError::MalformedTrack(e.to_string()))?;
                    let location = waypoint.point();

                    let mut point = RawPoint::new()
                        .with("lat", RawValue::Float(location.y()))
                        .with("lon", RawValue::Float(location.x()))
                        .with("time", RawValue::Text(iso));
                    if let Some(ele) = waypoint.elevation {
                        point.insert("ele", RawValue::Float(ele));
                    }
                    points.push(point);
                }
            }
        }

        Ok(RawTrack {
            format: TrackFormat::Gpx,
            sport: None,
            points,
        })
    }
}
