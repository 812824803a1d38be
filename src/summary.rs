//! Ride summaries
//!
//! Aggregates a set of segments into flat ride statistics. Optional
//! aggregates follow a declarative rule table: a rule is applied only when
//! its field is present and numeric on every segment, otherwise its output
//! key is left out of the summary.

use log::warn;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::geo;
use crate::types::{Position, Scalar, Segment};

/// How a per-segment field is folded into one value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Sum of value × duration, divided by total duration
    TimeWeighted,
    /// Sum of the positive values
    SumPositive,
    /// Sum of the negative values
    SumNegative,
}

/// A single optional aggregate
#[derive(Debug, Clone, Copy)]
pub struct AggregateRule {
    pub output: &'static str,
    pub field: &'static str,
    pub reduction: Reduction,
}

/// Optional aggregates computed for every summary
pub const AGGREGATES: &[AggregateRule] = &[
    AggregateRule {
        output: "temperature",
        field: "temperature",
        reduction: Reduction::TimeWeighted,
    },
    AggregateRule {
        output: "wind_speed",
        field: "wind_speed",
        reduction: Reduction::TimeWeighted,
    },
    AggregateRule {
        output: "wind_direction",
        field: "wind_direction",
        reduction: Reduction::TimeWeighted,
    },
    AggregateRule {
        output: "total_ascent",
        field: "ascent",
        reduction: Reduction::SumPositive,
    },
    AggregateRule {
        output: "total_descent",
        field: "ascent",
        reduction: Reduction::SumNegative,
    },
];

/// Ride metadata that does not come from the segments themselves
#[derive(Debug, Clone, Default)]
pub struct SummaryContext {
    pub filename: Option<String>,
    pub sport: Option<String>,
    /// Median position of the ride's records
    pub median_position: Option<Position>,
    /// Travel direction between route limits, when they were found
    pub forward: Option<bool>,
    /// Extra segment fields to aggregate
    pub additional_vars: Vec<String>,
}

/// Flat mapping of statistic name to value
///
/// A missing key means the underlying data was not available.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    fields: BTreeMap<String, Scalar>,
}

impl Summary {
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.get(name)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Scalar::as_f64)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, name: &str, value: Scalar) {
        self.fields.insert(name.to_string(), value);
    }
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Result of summarizing a ride
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryReport {
    Stats(Summary),
    /// The selection contained no segments
    NoSegments,
}

impl SummaryReport {
    pub fn stats(&self) -> Option<&Summary> {
        match self {
            SummaryReport::Stats(summary) => Some(summary),
            SummaryReport::NoSegments => None,
        }
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryReport::Stats(summary) => {
                for (name, value) in summary.iter() {
                    writeln!(f, "{}: {}", name, value)?;
                }
                Ok(())
            }
            SummaryReport::NoSegments => f.write_str("No segments found"),
        }
    }
}

impl Serialize for SummaryReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SummaryReport::Stats(summary) => summary.serialize(serializer),
            SummaryReport::NoSegments => serializer.serialize_str("No segments found"),
        }
    }
}

/// Summarizer for turning segments into ride statistics
pub struct Summarizer;

impl Summarizer {
    /// Summarize the given segments
    pub fn summarize(segments: &[&Segment], context: &SummaryContext) -> SummaryReport {
        let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
            return SummaryReport::NoSegments;
        };
        let label = context.filename.as_deref().unwrap_or("ride");

        let mut summary = Summary::default();
        let length_calculated: f64 = segments.iter().map(|s| s.length_calculated).sum();
        let duration: i64 = segments.iter().map(|s| s.duration).sum();

        if let Some(filename) = &context.filename {
            summary.insert("filename", Scalar::Text(filename.clone()));
        }
        if let Some(sport) = &context.sport {
            summary.insert("sport", Scalar::Text(sport.clone()));
        }
        summary.insert("timestamp_start", Scalar::Timestamp(first.timestamp_start));
        summary.insert("timestamp_end", Scalar::Timestamp(last.timestamp_end));
        summary.insert("lat_start", Scalar::Number(first.lat_start));
        summary.insert("lon_start", Scalar::Number(first.lon_start));
        if let Some(median) = context.median_position {
            let direction = geo::bearing(first.position_start(), median);
            summary.insert("direction", Scalar::Number(direction));
        }
        summary.insert("length_calculated", Scalar::Number(length_calculated));
        summary.insert("duration", Scalar::Integer(duration));

        if duration > 0 {
            summary.insert(
                "speed_from_length_calculated",
                Scalar::Number(length_calculated / duration as f64),
            );
        } else {
            warn!("Duration is zero for {}", label);
        }

        if let Some(lengths) = all_numbers(segments, "length_recorded") {
            let length_recorded: f64 = lengths.iter().sum();
            summary.insert("length_recorded", Scalar::Number(length_recorded));
            if duration > 0 {
                summary.insert(
                    "speed_from_length_recorded",
                    Scalar::Number(length_recorded / duration as f64),
                );
            }
        }

        if let Some(forward) = context.forward {
            summary.insert("forward", Scalar::Bool(forward));
        }

        for rule in AGGREGATES {
            if let Some(value) = apply_rule(segments, rule, duration) {
                summary.insert(rule.output, Scalar::Number(value));
            }
        }

        for var in &context.additional_vars {
            let Some(first_value) = first.field(var) else {
                continue;
            };
            let weighted = match all_numbers(segments, var) {
                Some(values) if duration > 0 => Some(time_weighted(segments, &values, duration)),
                _ => None,
            };
            match weighted {
                Some(value) => summary.insert(var, Scalar::Number(value)),
                None => summary.insert(var, first_value),
            }
        }

        SummaryReport::Stats(summary)
    }
}

/// Values of `field` for every segment, or `None` if any segment lacks it
fn all_numbers(segments: &[&Segment], field: &str) -> Option<Vec<f64>> {
    segments.iter().map(|s| s.number(field)).collect()
}

fn time_weighted(segments: &[&Segment], values: &[f64], duration: i64) -> f64 {
    let weighted: f64 = segments
        .iter()
        .zip(values)
        .map(|(s, v)| v * s.duration as f64)
        .sum();
    weighted / duration as f64
}

fn apply_rule(segments: &[&Segment], rule: &AggregateRule, duration: i64) -> Option<f64> {
    let values = all_numbers(segments, rule.field)?;
    match rule.reduction {
        Reduction::TimeWeighted if duration > 0 => Some(time_weighted(segments, &values, duration)),
        Reduction::TimeWeighted => None,
        Reduction::SumPositive => Some(values.iter().filter(|v| **v > 0.0).sum()),
        Reduction::SumNegative => Some(values.iter().filter(|v| **v < 0.0).sum()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherValue;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn segment(id: usize, length: f64, duration: i64) -> Segment {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + Duration::seconds(id as i64 * 60);
        Segment {
            id,
            lat_start: 52.0 + id as f64 * 0.001,
            lon_start: 5.0,
            lat_end: 52.001 + id as f64 * 0.001,
            lon_end: 5.0,
            timestamp_start: t0,
            timestamp_end: t0 + Duration::seconds(duration),
            duration,
            length_calculated: length,
            heading: 0.0,
            distance_recorded_start: None,
            distance_recorded_end: None,
            length_recorded: None,
            temp_recorded_start: None,
            speed_recorded_start: None,
            speed_recorded_end: None,
            cadence_start: None,
            altitude_start: None,
            altitude_end: None,
            ascent: None,
            gradient: None,
            weather: BTreeMap::new(),
            twa: None,
            twa_rounded_abs: None,
            headwind: None,
        }
    }

    fn with_weather(mut s: Segment, name: &str, value: WeatherValue) -> Segment {
        s.weather.insert(name.to_string(), value);
        s
    }

    fn summarize(segments: &[Segment], context: &SummaryContext) -> Summary {
        let refs: Vec<&Segment> = segments.iter().collect();
        match Summarizer::summarize(&refs, context) {
            SummaryReport::Stats(summary) => summary,
            SummaryReport::NoSegments => panic!("expected statistics"),
        }
    }

    #[test]
    fn test_average_speed() {
        let segments = vec![segment(0, 100.0, 10), segment(1, 50.0, 5)];
        let summary = summarize(&segments, &SummaryContext::default());

        assert_eq!(summary.get_f64("length_calculated"), Some(150.0));
        assert_eq!(summary.get("duration"), Some(&Scalar::Integer(15)));
        assert_eq!(summary.get_f64("speed_from_length_calculated"), Some(10.0));
        assert_eq!(
            summary.get("timestamp_start"),
            Some(&Scalar::Timestamp(segments[0].timestamp_start))
        );
        assert_eq!(
            summary.get("timestamp_end"),
            Some(&Scalar::Timestamp(segments[1].timestamp_end))
        );
        assert_eq!(summary.get_f64("lat_start"), Some(52.0));
    }

    #[test]
    fn test_empty_segments() {
        let report = Summarizer::summarize(&[], &SummaryContext::default());
        assert_eq!(report, SummaryReport::NoSegments);
        assert_eq!(report.to_string(), "No segments found");
        assert_eq!(serde_json::to_string(&report).unwrap(), "\"No segments found\"");
    }

    #[test]
    fn test_zero_duration_omits_speed() {
        let segments = vec![segment(0, 10.0, 0)];
        let summary = summarize(&segments, &SummaryContext::default());
        assert_eq!(summary.get("duration"), Some(&Scalar::Integer(0)));
        assert!(!summary.contains("speed_from_length_calculated"));
    }

    #[test]
    fn test_time_weighted_weather() {
        let segments = vec![
            with_weather(segment(0, 100.0, 30), "temperature", WeatherValue::Number(10.0)),
            with_weather(segment(1, 100.0, 10), "temperature", WeatherValue::Number(14.0)),
        ];
        let summary = summarize(&segments, &SummaryContext::default());
        assert_eq!(summary.get_f64("temperature"), Some(11.0));
        assert!(!summary.contains("wind_speed"));
        assert!(!summary.contains("wind_direction"));
    }

    #[test]
    fn test_partial_weather_is_skipped() {
        let segments = vec![
            with_weather(segment(0, 100.0, 30), "wind_speed", WeatherValue::Number(3.0)),
            segment(1, 100.0, 10),
        ];
        let summary = summarize(&segments, &SummaryContext::default());
        assert!(!summary.contains("wind_speed"));
    }

    #[test]
    fn test_ascent_and_descent() {
        let mut segments = vec![segment(0, 100.0, 10), segment(1, 100.0, 10), segment(2, 100.0, 10)];
        segments[0].ascent = Some(3.0);
        segments[1].ascent = Some(-1.5);
        segments[2].ascent = Some(2.0);

        let summary = summarize(&segments, &SummaryContext::default());
        assert_eq!(summary.get_f64("total_ascent"), Some(5.0));
        assert_eq!(summary.get_f64("total_descent"), Some(-1.5));
    }

    #[test]
    fn test_recorded_length() {
        let mut segments = vec![segment(0, 100.0, 10), segment(1, 100.0, 10)];
        segments[0].length_recorded = Some(90.0);
        segments[1].length_recorded = Some(110.0);

        let summary = summarize(&segments, &SummaryContext::default());
        assert_eq!(summary.get_f64("length_recorded"), Some(200.0));
        assert_eq!(summary.get_f64("speed_from_length_recorded"), Some(10.0));

        segments[1].length_recorded = None;
        let summary = summarize(&segments, &SummaryContext::default());
        assert!(!summary.contains("length_recorded"));
        assert!(!summary.contains("speed_from_length_recorded"));
    }

    #[test]
    fn test_context_metadata() {
        let segments = vec![segment(0, 100.0, 10)];
        let context = SummaryContext {
            filename: Some("ride.fit".to_string()),
            sport: Some("cycling".to_string()),
            median_position: Some(Position::new(53.0, 5.0)),
            forward: Some(false),
            additional_vars: Vec::new(),
        };
        let summary = summarize(&segments, &context);

        assert_eq!(summary.get("filename"), Some(&Scalar::Text("ride.fit".into())));
        assert_eq!(summary.get("sport"), Some(&Scalar::Text("cycling".into())));
        assert_eq!(summary.get("forward"), Some(&Scalar::Bool(false)));
        assert!(summary.get_f64("direction").unwrap().abs() < 1e-9);

        let summary = summarize(&segments, &SummaryContext::default());
        assert!(!summary.contains("sport"));
        assert!(!summary.contains("forward"));
        assert!(!summary.contains("direction"));
    }

    #[test]
    fn test_additional_vars() {
        let segments = vec![
            with_weather(
                with_weather(segment(0, 100.0, 30), "cloud_cover", WeatherValue::Number(2.0)),
                "weather_type",
                WeatherValue::Text("sunny".into()),
            ),
            with_weather(
                with_weather(segment(1, 100.0, 10), "cloud_cover", WeatherValue::Number(6.0)),
                "weather_type",
                WeatherValue::Text("cloudy".into()),
            ),
        ];
        let context = SummaryContext {
            additional_vars: vec![
                "cloud_cover".to_string(),
                "weather_type".to_string(),
                "humidity".to_string(),
            ],
            ..Default::default()
        };
        let summary = summarize(&segments, &context);

        assert_eq!(summary.get_f64("cloud_cover"), Some(3.0));
        assert_eq!(summary.get("weather_type"), Some(&Scalar::Text("sunny".into())));
        assert!(!summary.contains("humidity"));
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let segments = vec![segment(0, 100.0, 10)];
        let report = SummaryReport::Stats(summarize(&segments, &SummaryContext::default()));
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();

        assert_eq!(json["length_calculated"], 100.0);
        assert_eq!(json["duration"], 10);
        assert_eq!(json["timestamp_start"], "2024-05-01T10:00:00Z");
    }
}
