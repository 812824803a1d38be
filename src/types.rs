//! Core types for the bikeride pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw track points, canonical records, segments and summary values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use crate::error::RideError;
use crate::weather::WeatherValue;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether the coordinates fall inside the valid WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<(f64, f64)> for Position {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Source file format of a GPS track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackFormat {
    Fit,
    Gpx,
}

impl TrackFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackFormat::Fit => "fit",
            TrackFormat::Gpx => "gpx",
        }
    }

    /// Resolve a format from an explicit hint such as `"fit"` or `".GPX"`
    pub fn from_hint(hint: &str) -> Result<Self, RideError> {
        let normalized = hint.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "fit" => Ok(TrackFormat::Fit),
            "gpx" => Ok(TrackFormat::Gpx),
            _ => Err(RideError::UnsupportedFormat(normalized)),
        }
    }

    /// Resolve a format from the extension of `path`
    pub fn from_path(path: &Path) -> Result<Self, RideError> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_hint(&extension)
    }
}

/// A single field value as produced by a track reader
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl RawValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(v) => Some(*v as f64),
            RawValue::Float(v) => Some(*v),
            RawValue::Text(s) => s.trim().parse().ok(),
            RawValue::Timestamp(_) => None,
        }
    }
}

/// Raw per-point field mapping, keyed by semantic field name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPoint {
    pub fields: HashMap<String, RawValue>,
}

impl RawPoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: RawValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: RawValue) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

/// Everything a track reader extracts from one source file
#[derive(Debug, Clone)]
pub struct RawTrack {
    pub format: TrackFormat,
    /// Sport declared in the file, if any
    pub sport: Option<String>,
    pub points: Vec<RawPoint>,
}

/// One normalized GPS sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
    /// Altitude (m)
    pub altitude: Option<f64>,
    /// Recorded speed (m/s)
    pub speed: Option<f64>,
    /// Recorded cumulative distance (m)
    pub distance: Option<f64>,
    /// Recorded temperature (°C)
    pub temperature: Option<f64>,
    /// Cadence (rpm)
    pub cadence: Option<f64>,
}

impl Record {
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            timestamp,
            altitude: None,
            speed: None,
            distance: None,
            temperature: None,
            cadence: None,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.lat, self.lon)
    }
}

/// Derived unit between two consecutive records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the segment sequence (0-based)
    pub id: usize,
    pub lat_start: f64,
    pub lon_start: f64,
    pub lat_end: f64,
    pub lon_end: f64,
    pub timestamp_start: DateTime<Utc>,
    pub timestamp_end: DateTime<Utc>,
    /// Whole seconds between start and end
    pub duration: i64,
    /// Great-circle length (m)
    pub length_calculated: f64,
    /// Initial bearing (degrees, 0-360)
    pub heading: f64,
    pub distance_recorded_start: Option<f64>,
    pub distance_recorded_end: Option<f64>,
    pub length_recorded: Option<f64>,
    pub temp_recorded_start: Option<f64>,
    pub speed_recorded_start: Option<f64>,
    pub speed_recorded_end: Option<f64>,
    /// Cadence at the start record (rpm)
    pub cadence_start: Option<f64>,
    pub altitude_start: Option<f64>,
    pub altitude_end: Option<f64>,
    pub ascent: Option<f64>,
    /// Percent grade, signed like `ascent`
    pub gradient: Option<f64>,
    /// Weather columns joined from the weather table
    pub weather: BTreeMap<String, WeatherValue>,
    /// True wind angle (degrees, -180..=180)
    pub twa: Option<f64>,
    pub twa_rounded_abs: Option<f64>,
    /// Headwind component (positive when wind is against the rider)
    pub headwind: Option<f64>,
}

impl Segment {
    /// Names of the fixed segment fields, in output order
    pub const FIELD_NAMES: &'static [&'static str] = &[
        "id",
        "lat_start",
        "lon_start",
        "lat_end",
        "lon_end",
        "duration",
        "length_calculated",
        "heading",
        "timestamp_start",
        "timestamp_end",
        "distance_recorded_start",
        "distance_recorded_end",
        "length_recorded",
        "temp_recorded_start",
        "speed_recorded_start",
        "speed_recorded_end",
        "cadence_start",
        "altitude_start",
        "altitude_end",
        "ascent",
        "gradient",
        "twa",
        "twa_rounded_abs",
        "headwind",
    ];

    pub fn position_start(&self) -> Position {
        Position::new(self.lat_start, self.lon_start)
    }

    pub fn position_end(&self) -> Position {
        Position::new(self.lat_end, self.lon_end)
    }

    /// Look up any segment field by name, including joined weather columns
    pub fn field(&self, name: &str) -> Option<Scalar> {
        let number = |v: f64| Some(Scalar::Number(v));
        match name {
            "id" => Some(Scalar::Integer(self.id as i64)),
            "lat_start" => number(self.lat_start),
            "lon_start" => number(self.lon_start),
            "lat_end" => number(self.lat_end),
            "lon_end" => number(self.lon_end),
            "timestamp_start" => Some(Scalar::Timestamp(self.timestamp_start)),
            "timestamp_end" => Some(Scalar::Timestamp(self.timestamp_end)),
            "duration" => Some(Scalar::Integer(self.duration)),
            "length_calculated" => number(self.length_calculated),
            "heading" => number(self.heading),
            "distance_recorded_start" => self.distance_recorded_start.map(Scalar::Number),
            "distance_recorded_end" => self.distance_recorded_end.map(Scalar::Number),
            "length_recorded" => self.length_recorded.map(Scalar::Number),
            "temp_recorded_start" => self.temp_recorded_start.map(Scalar::Number),
            "speed_recorded_start" => self.speed_recorded_start.map(Scalar::Number),
            "speed_recorded_end" => self.speed_recorded_end.map(Scalar::Number),
            "cadence_start" => self.cadence_start.map(Scalar::Number),
            "altitude_start" => self.altitude_start.map(Scalar::Number),
            "altitude_end" => self.altitude_end.map(Scalar::Number),
            "ascent" => self.ascent.map(Scalar::Number),
            "gradient" => self.gradient.map(Scalar::Number),
            "twa" => self.twa.map(Scalar::Number),
            "twa_rounded_abs" => self.twa_rounded_abs.map(Scalar::Number),
            "headwind" => self.headwind.map(Scalar::Number),
            other => self.weather.get(other).cloned().map(Scalar::from),
        }
    }

    /// Numeric value of a field, if present and numeric
    pub fn number(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(|v| v.as_f64())
    }
}

/// Scalar value in a summary or segment field lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(v) => Some(*v as f64),
            Scalar::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<WeatherValue> for Scalar {
    fn from(value: WeatherValue) -> Self {
        match value {
            WeatherValue::Number(v) => Scalar::Number(v),
            WeatherValue::Text(s) => Scalar::Text(s),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Integer(v) => write!(f, "{}", v),
            Scalar::Number(v) => write!(f, "{}", v),
            Scalar::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}
