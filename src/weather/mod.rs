//! Weather observations
//!
//! A [`WeatherTable`] holds time-indexed observations at minute, hourly or
//! daily granularity. [`WeatherSource`] implementations turn provider data
//! into a table; downloading that data is left to the caller.

mod csv_file;
pub mod knmi;
pub mod oikolab;

pub use self::csv_file::CsvWeatherFile;
pub use self::knmi::KnmiHourly;
pub use self::oikolab::OikolabPayload;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RideError;

/// Trait for weather providers
pub trait WeatherSource {
    /// Short provider name for logging
    fn name(&self) -> &'static str;

    /// Load the observations as a sorted table
    fn load(&self) -> Result<WeatherTable, RideError>;
}

/// A single weather measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeatherValue {
    Number(f64),
    Text(String),
}

impl WeatherValue {
    /// Parse a cell: numbers become `Number`, blank cells `None`
    pub fn parse(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        match cell.parse::<f64>() {
            Ok(v) => Some(WeatherValue::Number(v)),
            Err(_) => Some(WeatherValue::Text(cell.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WeatherValue::Number(v) => Some(*v),
            WeatherValue::Text(_) => None,
        }
    }
}

/// Observations for one sampling instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRow {
    /// Date as YYYYMMDD
    pub date: u32,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub values: BTreeMap<String, WeatherValue>,
}

impl WeatherRow {
    pub fn new(date: u32, hour: Option<u32>, minute: Option<u32>) -> Self {
        Self {
            date,
            hour,
            minute,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: WeatherValue) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    fn sort_key(&self) -> (u32, u32, u32) {
        (self.date, self.hour.unwrap_or(0), self.minute.unwrap_or(0))
    }
}

/// Sampling granularity of a weather table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minute,
    Hourly,
    Daily,
}

/// Time-indexed weather observations, sorted by date, hour, minute
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherTable {
    granularity: Granularity,
    columns: Vec<String>,
    rows: Vec<WeatherRow>,
}

impl WeatherTable {
    /// Build a table from unsorted rows
    ///
    /// The granularity is minute if every row has an hour and a minute,
    /// hourly if every row has an hour, and daily otherwise.
    pub fn new(rows: Vec<WeatherRow>) -> Self {
        let granularity = if !rows.is_empty()
            && rows.iter().all(|r| r.hour.is_some() && r.minute.is_some())
        {
            Granularity::Minute
        } else if !rows.is_empty() && rows.iter().all(|r| r.hour.is_some()) {
            Granularity::Hourly
        } else {
            Granularity::Daily
        };
        Self::with_granularity(rows, granularity)
    }

    /// Build a table whose granularity is known from the source columns
    ///
    /// Rows missing the hour or minute the granularity needs never match a
    /// sample.
    pub fn with_granularity(mut rows: Vec<WeatherRow>, granularity: Granularity) -> Self {
        rows.sort_by_key(WeatherRow::sort_key);

        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for name in row.values.keys() {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }

        Self {
            granularity,
            columns,
            rows,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Names of the measurement columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[WeatherRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Weather at `timestamp`, or `None` if the table has no matching rows
    ///
    /// - minute tables: exact match on date, hour and minute
    /// - hourly tables: linear interpolation between this hour and the next
    /// - daily tables: the first row of the day
    pub fn sample(&self, timestamp: DateTime<Utc>) -> Option<BTreeMap<String, WeatherValue>> {
        let date = date_key(timestamp);
        let hour = timestamp.hour();
        let minute = timestamp.minute();

        match self.granularity {
            Granularity::Minute => self
                .rows_on(date)
                .iter()
                .find(|r| r.hour == Some(hour) && r.minute == Some(minute))
                .map(|r| r.values.clone()),
            Granularity::Hourly => {
                let next = timestamp + Duration::hours(1);
                let (next_date, next_hour) = (date_key(next), next.hour());

                let mut subset: Vec<&WeatherRow> = self
                    .rows_on(date)
                    .iter()
                    .filter(|r| r.hour == Some(hour))
                    .collect();
                subset.extend(
                    self.rows_on(next_date)
                        .iter()
                        .filter(|r| r.hour == Some(next_hour)),
                );

                let first = *subset.first()?;
                let last = *subset.last()?;
                Some(interpolate(first, last, minute))
            }
            Granularity::Daily => self.rows_on(date).first().map(|r| r.values.clone()),
        }
    }

    fn rows_on(&self, date: u32) -> &[WeatherRow] {
        let lower = self.rows.partition_point(|r| r.date < date);
        let upper = self.rows.partition_point(|r| r.date <= date);
        &self.rows[lower..upper]
    }
}

/// Minute-weighted blend of two hourly rows; non-numeric values come from `v0`
fn interpolate(v0: &WeatherRow, v1: &WeatherRow, minute: u32) -> BTreeMap<String, WeatherValue> {
    let minute = minute as f64;
    v0.values
        .iter()
        .map(|(name, value)| {
            let blended = match (value, v1.values.get(name)) {
                (WeatherValue::Number(a), Some(WeatherValue::Number(b))) => {
                    WeatherValue::Number(((60.0 - minute) * a + minute * b) / 60.0)
                }
                _ => value.clone(),
            };
            (name.clone(), blended)
        })
        .collect()
}

/// YYYYMMDD integer for a timestamp
pub fn date_key(timestamp: DateTime<Utc>) -> u32 {
    timestamp.year() as u32 * 10_000 + timestamp.month() * 100 + timestamp.day()
}
