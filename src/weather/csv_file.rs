//! CSV weather tables

use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{Granularity, WeatherRow, WeatherSource, WeatherTable, WeatherValue};
use crate::error::RideError;

/// Weather table stored as CSV with a `date` column and optional `hour` and
/// `minute` columns; every other column is a measurement.
pub struct CsvWeatherFile {
    path: PathBuf,
}

impl CsvWeatherFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Parse CSV from any reader
    pub fn parse<R: Read>(reader: R) -> Result<WeatherTable, RideError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h == name);
        let date_idx = position("date")
            .ok_or_else(|| RideError::WeatherParse("missing 'date' column".to_string()))?;
        let hour_idx = position("hour");
        let minute_idx = position("minute");

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let date = integer_cell(record.get(date_idx)).ok_or_else(|| {
                RideError::WeatherParse(format!("row {}: invalid date", line + 1))
            })?;
            let mut row = WeatherRow::new(
                date,
                hour_idx.and_then(|i| integer_cell(record.get(i))),
                minute_idx.and_then(|i| integer_cell(record.get(i))),
            );

            for (i, header) in headers.iter().enumerate() {
                if Some(i) == hour_idx || Some(i) == minute_idx || i == date_idx {
                    continue;
                }
                // Index columns written by dataframe libraries
                if header.is_empty() || header.starts_with("Unnamed") {
                    continue;
                }
                if let Some(value) = record.get(i).and_then(WeatherValue::parse) {
                    row.values.insert(header.to_string(), value);
                }
            }
            rows.push(row);
        }

        // Granularity follows the columns present, not individual cells
        let granularity = match (hour_idx, minute_idx) {
            (_, Some(_)) => Granularity::Minute,
            (Some(_), None) => Granularity::Hourly,
            (None, None) => Granularity::Daily,
        };
        Ok(WeatherTable::with_granularity(rows, granularity))
    }
}

impl WeatherSource for CsvWeatherFile {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn load(&self) -> Result<WeatherTable, RideError> {
        let file = File::open(&self.path)?;
        Self::parse(file)
    }
}

/// Integer cell, tolerating values written as floats (`"10.0"`)
fn integer_cell(cell: Option<&str>) -> Option<u32> {
    let value: f64 = cell?.trim().parse().ok()?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}
