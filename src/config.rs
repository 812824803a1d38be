//! Ride processing options
//!
//! Options can be built in code or loaded from a JSON file:
//!
//! ```json
//! {
//!   "format": "fit",
//!   "limits": { "start": {"lat": 52.09, "lon": 5.12}, "end": {"lat": 52.16, "lon": 4.49}, "threshold_m": 100.0 },
//!   "weather": { "source": "knmi", "path": "uurgeg_260.txt" },
//!   "additional_vars": ["cloud_cover"]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RideError;
use crate::types::{Position, TrackFormat};
use crate::weather::{CsvWeatherFile, KnmiHourly, OikolabPayload, WeatherSource};

/// Start/end locations used to cut a ride out of a longer track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteLimits {
    pub start: Position,
    pub end: Position,
    /// Maximum distance (m) between a limit and its nearest track point
    pub threshold_m: f64,
}

impl RouteLimits {
    pub fn new(start: Position, end: Position, threshold_m: f64) -> Self {
        Self {
            start,
            end,
            threshold_m,
        }
    }
}

/// Where weather observations for a ride come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum WeatherConfig {
    /// CSV table with `date`, optional `hour`/`minute` and value columns
    Csv { path: PathBuf },
    /// Saved KNMI hourly climatology response
    Knmi { path: PathBuf },
    /// Saved oikolab JSON response
    Oikolab { path: PathBuf },
}

impl WeatherConfig {
    /// Build the weather source this configuration selects
    pub fn source(&self) -> Box<dyn WeatherSource> {
        match self {
            WeatherConfig::Csv { path } => Box::new(CsvWeatherFile::new(path)),
            WeatherConfig::Knmi { path } => Box::new(KnmiHourly::from_path(path)),
            WeatherConfig::Oikolab { path } => Box::new(OikolabPayload::from_path(path)),
        }
    }
}

/// Options controlling how a ride is processed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RideOptions {
    /// Explicit track format, overriding the file extension
    pub format: Option<TrackFormat>,
    /// Restrict the ride to the part between two locations
    pub limits: Option<RouteLimits>,
    /// Weather data to join onto segments
    pub weather: Option<WeatherConfig>,
    /// Extra segment fields to aggregate in the summary
    pub additional_vars: Vec<String>,
}

impl RideOptions {
    /// Load options from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, RideError> {
        let text = fs::read_to_string(path)?;
        let options: RideOptions = serde_json::from_str(&text)?;
        options.validate()?;
        Ok(options)
    }

    /// Check option values that serde cannot
    pub fn validate(&self) -> Result<(), RideError> {
        if let Some(limits) = &self.limits {
            if !limits.threshold_m.is_finite() || limits.threshold_m <= 0.0 {
                return Err(RideError::InvalidConfig(format!(
                    "threshold must be a positive distance, got {}",
                    limits.threshold_m
                )));
            }
            for (label, position) in [("start", limits.start), ("end", limits.end)] {
                if !position.is_valid() {
                    return Err(RideError::InvalidConfig(format!(
                        "{} location {},{} is not a valid coordinate",
                        label, position.lat, position.lon
                    )));
                }
            }
        }
        Ok(())
    }
}
