//! Error types for bikeride

use thiserror::Error;

/// Errors that can occur while loading or analysing a ride
#[derive(Debug, Error)]
pub enum RideError {
    #[error("Filetype {0} not implemented")]
    UnsupportedFormat(String),

    #[error("Failed to parse track: {0}")]
    MalformedTrack(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse weather data: {0}")]
    WeatherParse(String),

    #[error("Pass either a mask or a list of ids, not both")]
    ConflictingSelection,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
