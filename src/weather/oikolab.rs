//! Oikolab weather API responses

use chrono::{DateTime, Timelike};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};

use super::{date_key, WeatherRow, WeatherSource, WeatherTable, WeatherValue};
use crate::error::RideError;
use crate::types::Position;

/// Endpoint for weather requests
pub const WEATHER_URL: &str = "https://api.oikolab.com/weather";

/// Parameters requested when the caller does not choose any
pub const DEFAULT_VARS: &[&str] = &[
    "temperature",
    "wind_speed",
    "10m_wind_gust",
    "wind_direction",
    "total_precipitation",
    "surface_pressure",
];

const RENAME_COLUMNS: &[(&str, &str)] = &[
    ("temperature (degC)", "temperature"),
    ("wind_direction (deg)", "wind_direction"),
    ("wind_speed (m/s)", "wind_speed"),
];

/// Query parameters for a request to [`WEATHER_URL`]
///
/// Dates may be given as `YYYYMMDD` or `YYYY-MM-DD`; `freq` is `"H"` for
/// hourly or `"D"` for daily data.
pub fn request_params(
    position: Position,
    start: &str,
    end: &str,
    api_key: &str,
    variables: &[&str],
    freq: &str,
) -> Vec<(String, String)> {
    let variables = if variables.is_empty() {
        DEFAULT_VARS
    } else {
        variables
    };
    let mut params: Vec<(String, String)> = variables
        .iter()
        .map(|v| ("param".to_string(), v.to_string()))
        .collect();
    params.push(("start".to_string(), format_date(start)));
    params.push(("end".to_string(), format_date(end)));
    params.push(("lat".to_string(), position.lat.to_string()));
    params.push(("lon".to_string(), position.lon.to_string()));
    params.push(("api-key".to_string(), api_key.to_string()));
    params.push(("freq".to_string(), freq.to_string()));
    params
}

fn format_date(date: &str) -> String {
    if date.len() == 8 && date.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &date[..4], &date[4..6], &date[6..])
    } else {
        date.to_string()
    }
}

/// Saved JSON response from the oikolab weather API
pub struct OikolabPayload {
    path: PathBuf,
}

impl OikolabPayload {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Parse a response body into a weather table
    pub fn parse(raw_json: &str) -> Result<WeatherTable, RideError> {
        let envelope: Envelope = serde_json::from_str(raw_json)?;
        // `data` is itself JSON, usually encoded as a string
        let frame: Frame = match envelope.data {
            JsonValue::String(inner) => serde_json::from_str(&inner)?,
            other => serde_json::from_value(other)?,
        };

        if frame.index.len() != frame.data.len() {
            return Err(RideError::WeatherParse(format!(
                "index has {} entries but data has {} rows",
                frame.index.len(),
                frame.data.len()
            )));
        }

        let columns: Vec<String> = frame.columns.iter().map(|c| rename(c)).collect();
        let mut rows = Vec::with_capacity(frame.data.len());
        for (seconds, cells) in frame.index.iter().zip(&frame.data) {
            let timestamp = DateTime::from_timestamp(*seconds, 0).ok_or_else(|| {
                RideError::WeatherParse(format!("invalid timestamp {}", seconds))
            })?;
            let mut row = WeatherRow::new(date_key(timestamp), Some(timestamp.hour()), None);
            for (name, cell) in columns.iter().zip(cells) {
                if let Some(value) = json_to_weather(cell) {
                    row.values.insert(name.clone(), value);
                }
            }
            rows.push(row);
        }

        Ok(WeatherTable::new(rows))
    }
}

impl WeatherSource for OikolabPayload {
    fn name(&self) -> &'static str {
        "oikolab"
    }

    fn load(&self) -> Result<WeatherTable, RideError> {
        let text = fs::read_to_string(&self.path)?;
        Self::parse(&text)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: JsonValue,
}

#[derive(Debug, Deserialize)]
struct Frame {
    columns: Vec<String>,
    index: Vec<i64>,
    data: Vec<Vec<JsonValue>>,
}

fn rename(column: &str) -> String {
    RENAME_COLUMNS
        .iter()
        .find(|(raw, _)| *raw == column)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| column.to_string())
}

fn json_to_weather(value: &JsonValue) -> Option<WeatherValue> {
    match value {
        JsonValue::Number(n) => n.as_f64().map(WeatherValue::Number),
        JsonValue::String(s) => WeatherValue::parse(s),
        _ => None,
    }
}
