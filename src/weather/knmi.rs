//! KNMI hourly climatology data
//!
//! Parses the comma-separated text returned by the KNMI `uurgegevens`
//! service and locates the nearest Dutch weather station for a position.

use log::info;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{WeatherRow, WeatherSource, WeatherTable, WeatherValue};
use crate::error::RideError;
use crate::types::Position;

/// Endpoint for hourly station data
pub const HOURLY_URL: &str = "https://www.daggegevens.knmi.nl/klimatologie/uurgegevens";

/// KNMI column codes and the names used in weather tables
const RENAME_COLUMNS: &[(&str, &str)] = &[
    ("STN", "station"),
    ("YYYYMMDD", "date"),
    ("H", "hour"),
    ("HH", "hour"),
    ("DD", "wind_direction"),
    ("FH", "wind_speed_hr"),
    ("FF", "wind_speed"),
    ("FX", "maximum_wind_gust"),
    ("T", "temperature"),
    ("SQ", "sunshine_duration"),
    ("DR", "precipitation_duration"),
    ("RH", "hourly_precipitation_amount"),
    ("P", "air_pressure"),
    ("N", "cloud_cover"),
    ("U", "relative_atmospheric_humidity"),
    ("M", "fog"),
    ("R", "rainfall"),
    ("S", "snow"),
    ("O", "thunder"),
    ("Y", "ice_formation"),
];

/// Columns reported in tenths of their unit
const TENTHS: &[&str] = &[
    "wind_speed",
    "wind_speed_hr",
    "maximum_wind_gust",
    "temperature",
    "sunshine_duration",
    "precipitation_duration",
    "hourly_precipitation_amount",
];

/// A KNMI automatic weather station
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub id: u32,
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

const fn station(id: u32, lon: f64, lat: f64, name: &'static str) -> Station {
    Station { id, name, lat, lon }
}

pub const STATIONS: &[Station] = &[
    station(209, 4.518, 52.465, "IJmond"),
    station(210, 4.430, 52.171, "Valkenburg Zh"),
    station(215, 4.437, 52.141, "Voorschoten"),
    station(225, 4.555, 52.463, "IJmuiden"),
    station(235, 4.781, 52.928, "De Kooy"),
    station(240, 4.790, 52.318, "Schiphol"),
    station(242, 4.921, 53.241, "Vlieland"),
    station(248, 5.174, 52.634, "Wijdenes"),
    station(249, 4.979, 52.644, "Berkhout"),
    station(251, 5.346, 53.392, "Hoorn Terschelling"),
    station(257, 4.603, 52.506, "Wijk aan Zee"),
    station(258, 5.401, 52.649, "Houtribdijk"),
    station(260, 5.180, 52.100, "De Bilt"),
    station(265, 5.274, 52.130, "Soesterberg"),
    station(267, 5.384, 52.898, "Stavoren"),
    station(269, 5.520, 52.458, "Lelystad"),
    station(270, 5.752, 53.224, "Leeuwarden"),
    station(273, 5.888, 52.703, "Marknesse"),
    station(275, 5.873, 52.056, "Deelen"),
    station(277, 6.200, 53.413, "Lauwersoog"),
    station(278, 6.259, 52.435, "Heino"),
    station(279, 6.574, 52.750, "Hoogeveen"),
    station(280, 6.585, 53.125, "Eelde"),
    station(283, 6.657, 52.069, "Hupsel"),
    station(285, 6.399, 53.575, "Huibertgat"),
    station(286, 7.150, 53.196, "Nieuw Beerta"),
    station(290, 6.891, 52.274, "Twenthe"),
    station(308, 3.379, 51.381, "Cadzand"),
    station(310, 3.596, 51.442, "Vlissingen"),
    station(311, 3.672, 51.379, "Hoofdplaat"),
    station(312, 3.622, 51.768, "Oosterschelde"),
    station(313, 3.242, 51.505, "Vlakte van De Raan"),
    station(315, 3.998, 51.447, "Hansweert"),
    station(316, 3.694, 51.657, "Schaar"),
    station(319, 3.861, 51.226, "Westdorpe"),
    station(323, 3.884, 51.527, "Wilhelminadorp"),
    station(324, 4.006, 51.596, "Stavenisse"),
    station(330, 4.122, 51.992, "Hoek van Holland"),
    station(331, 4.193, 51.480, "Tholen"),
    station(340, 4.342, 51.449, "Woensdrecht"),
    station(343, 4.313, 51.893, "Rotterdam Geulhaven"),
    station(344, 4.447, 51.962, "Rotterdam"),
    station(348, 4.926, 51.970, "Cabauw Mast"),
    station(350, 4.936, 51.566, "Gilze-Rijen"),
    station(356, 5.146, 51.859, "Herwijnen"),
    station(370, 5.377, 51.451, "Eindhoven"),
    station(375, 5.707, 51.659, "Volkel"),
    station(377, 5.763, 51.198, "Ell"),
    station(380, 5.762, 50.906, "Maastricht"),
    station(391, 6.197, 51.498, "Arcen"),
];

/// Station closest to `position`, by planar distance in degrees
pub fn nearest_station(position: Position) -> Station {
    let planar = |s: &Station| (s.lon - position.lon).hypot(s.lat - position.lat);
    let mut nearest = STATIONS[0];
    for candidate in &STATIONS[1..] {
        if planar(candidate) < planar(&nearest) {
            nearest = *candidate;
        }
    }
    nearest
}

/// Request body for hourly data from `station` between two YYYYMMDD dates
pub fn hourly_request_body(station: &Station, start: &str, end: &str) -> String {
    format!("start={}01&end={}24&stns={}", start, end, station.id)
}

/// Saved response from the KNMI hourly service
pub struct KnmiHourly {
    path: PathBuf,
}

impl KnmiHourly {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Parse response text into a weather table
    pub fn parse(text: &str) -> Result<WeatherTable, RideError> {
        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();

        for line in text.lines() {
            if line.starts_with("# STN,YYYYMMDD") {
                columns = line
                    .trim_start_matches('#')
                    .split(',')
                    .map(|c| rename(c.trim()))
                    .collect();
                continue;
            }
            if columns.is_empty() || line.starts_with('#') {
                continue;
            }
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            if cells.len() != columns.len() {
                continue;
            }
            rows.push(parse_row(&columns, &cells)?);
        }

        if columns.is_empty() {
            return Err(RideError::WeatherParse(
                "no KNMI column header found".to_string(),
            ));
        }
        Ok(WeatherTable::new(rows))
    }
}

impl WeatherSource for KnmiHourly {
    fn name(&self) -> &'static str {
        "knmi"
    }

    fn load(&self) -> Result<WeatherTable, RideError> {
        let text = fs::read_to_string(&self.path)?;
        let table = Self::parse(&text)?;
        info!("loaded {} KNMI observations from {}", table.len(), self.path.display());
        Ok(table)
    }
}

fn rename(code: &str) -> String {
    RENAME_COLUMNS
        .iter()
        .find(|(knmi, _)| *knmi == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

fn parse_row(columns: &[String], cells: &[&str]) -> Result<WeatherRow, RideError> {
    let mut date = None;
    let mut hour = None;
    let mut values = BTreeMap::new();

    for (name, cell) in columns.iter().zip(cells) {
        match name.as_str() {
            "date" => date = cell.parse::<u32>().ok(),
            "hour" => hour = cell.parse::<u32>().ok(),
            _ => {
                let Some(value) = WeatherValue::parse(cell) else {
                    continue;
                };
                let value = match value {
                    WeatherValue::Number(v) if TENTHS.contains(&name.as_str()) => {
                        WeatherValue::Number(v / 10.0)
                    }
                    WeatherValue::Number(v) if name == "air_pressure" => {
                        WeatherValue::Number(v * 100.0)
                    }
                    other => other,
                };
                values.insert(name.clone(), value);
            }
        }
    }

    let date = date.ok_or_else(|| RideError::WeatherParse(format!("invalid KNMI row: {}", cells.join(","))))?;
    Ok(WeatherRow {
        date,
        hour,
        minute: None,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::Granularity;
    use pretty_assertions::assert_eq;

    const RESPONSE: &str = "\
# BRON: KONINKLIJK NEDERLANDS METEOROLOGISCH INSTITUUT (KNMI)
# STN         LON(east)   LAT(north)     ALT(m)  NAME
# 260:         5.180       52.100       1.90  De Bilt
# STN,YYYYMMDD,   HH,   DD,   FH,   FF,   FX,    T,    P,    N
#
  260,20240501,   10,  230,   40,   50,   80,  125,10132,    6
  260,20240501,   11,  240,   50,   60,   90,  131,10130,
  260,20240501
";

    #[test]
    fn test_parse_knmi_response() {
        let table = KnmiHourly::parse(RESPONSE).unwrap();
        assert_eq!(table.granularity(), Granularity::Hourly);
        assert_eq!(table.len(), 2);

        let row = &table.rows()[0];
        assert_eq!(row.date, 20240501);
        assert_eq!(row.hour, Some(10));
        assert_eq!(row.values["station"], WeatherValue::Number(260.0));
        assert_eq!(row.values["wind_direction"], WeatherValue::Number(230.0));
        assert_eq!(row.values["wind_speed"], WeatherValue::Number(5.0));
        assert_eq!(row.values["temperature"], WeatherValue::Number(12.5));
        assert_eq!(row.values["air_pressure"], WeatherValue::Number(1_013_200.0));
        assert_eq!(row.values["cloud_cover"], WeatherValue::Number(6.0));

        // Blank cells are left out
        assert!(!table.rows()[1].values.contains_key("cloud_cover"));
    }

    #[test]
    fn test_response_without_header() {
        let result = KnmiHourly::parse("NOT A KNMI RESPONSE");
        assert!(matches!(result, Err(RideError::WeatherParse(_))));
    }

    #[test]
    fn test_nearest_station() {
        let utrecht = Position::new(52.09, 5.12);
        let station = nearest_station(utrecht);
        assert_eq!(station.id, 260);
        assert_eq!(station.name, "De Bilt");

        let maastricht = Position::new(50.85, 5.69);
        assert_eq!(nearest_station(maastricht).id, 380);
    }

    #[test]
    fn test_hourly_request_body() {
        let station = nearest_station(Position::new(52.09, 5.12));
        assert_eq!(
            hourly_request_body(&station, "20240501", "20240502"),
            "start=2024050101&end=2024050224&stns=260"
        );
    }
}
