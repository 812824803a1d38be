//! Pipeline orchestration
//!
//! This module provides the public API for bikeride. It runs a track file
//! through the full pipeline: reader → normalizer → truncator → segment
//! builder (with optional weather) → summarizer.

use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::config::RideOptions;
use crate::error::RideError;
use crate::geo;
use crate::normalizer::Normalizer;
use crate::readers::reader_for;
use crate::segments::SegmentBuilder;
use crate::summary::{Summarizer, SummaryContext, SummaryReport};
use crate::truncate::truncate;
use crate::types::{Position, RawTrack, Record, Segment, TrackFormat};

/// Summarize a single track file in one call.
///
/// # Example
/// ```ignore
/// let report = summarize_file(Path::new("morning.fit"), &RideOptions::default())?;
/// println!("{}", report);
/// ```
pub fn summarize_file(path: &Path, options: &RideOptions) -> Result<SummaryReport, RideError> {
    let ride = Ride::from_path(path, options)?;
    Ok(ride.summary(None))
}

/// A processed ride
#[derive(Debug, Clone)]
pub struct Ride {
    /// File name the ride was loaded from
    pub source_name: String,
    /// Sport declared in the track file
    pub sport: Option<String>,
    /// Records of the ride, after truncation
    pub records: Vec<Record>,
    pub segments: Vec<Segment>,
    /// Travel direction between the route limits; `None` unless they were found
    pub forward: Option<bool>,
    /// Whether route limits were found; `None` when none were configured
    pub limits_found: Option<bool>,
    /// Element-wise median of the ride's record coordinates, after truncation
    pub median_position: Option<Position>,
    additional_vars: Vec<String>,
}

impl Ride {
    /// Load and process a track file
    pub fn from_path(path: &Path, options: &RideOptions) -> Result<Self, RideError> {
        // Resolve the format before touching the file
        let format = resolve_format(&path.to_string_lossy(), options)?;
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::process(name, format, &bytes, options)
    }

    /// Process track bytes; `name` supplies the extension unless a format is configured
    pub fn from_bytes(name: &str, bytes: &[u8], options: &RideOptions) -> Result<Self, RideError> {
        let format = resolve_format(name, options)?;
        Self::process(name.to_string(), format, bytes, options)
    }

    fn process(
        name: String,
        format: TrackFormat,
        bytes: &[u8],
        options: &RideOptions,
    ) -> Result<Self, RideError> {
        options.validate()?;

        // Stage 1: Read the raw track
        let raw = match reader_for(format).read(bytes) {
            Ok(raw) => raw,
            Err(RideError::MalformedTrack(reason)) => {
                warn!("Could not parse {}: {}", name, reason);
                RawTrack {
                    format,
                    sport: None,
                    points: Vec::new(),
                }
            }
            Err(e) => return Err(e),
        };

        // Stage 2: Normalize into records
        let all_records = Normalizer::normalize(&raw);

        // Stage 3: Optional truncation
        let (records, forward, limits_found) = match &options.limits {
            Some(limits) => {
                let truncation = truncate(&all_records, limits);
                if !truncation.found {
                    warn!("Start or end point not found for {}", name);
                }
                (
                    truncation.records.to_vec(),
                    truncation.forward,
                    Some(truncation.found),
                )
            }
            None => (all_records, None, None),
        };
        let median_position = geo::median_position(records.iter().map(Record::position));

        // Stage 4: Optional weather
        let weather = match &options.weather {
            Some(config) => {
                let source = config.source();
                let table = source.load()?;
                info!("loaded {} weather rows from {}", table.len(), source.name());
                Some(table)
            }
            None => None,
        };

        // Stage 5: Build segments
        let segments = SegmentBuilder::build(&records, weather.as_ref());
        info!(
            "{}: {} records, {} segments",
            name,
            records.len(),
            segments.len()
        );

        Ok(Self {
            source_name: name,
            sport: raw.sport,
            records,
            segments,
            forward,
            limits_found,
            median_position,
            additional_vars: options.additional_vars.clone(),
        })
    }

    /// Select segments by boolean mask or by id list
    ///
    /// Mask entries past the end of the list count as unselected. Passing
    /// neither selects every segment.
    pub fn select_segments(
        &self,
        mask: Option<&[bool]>,
        ids: Option<&[usize]>,
    ) -> Result<Vec<&Segment>, RideError> {
        match (mask, ids) {
            (Some(_), Some(_)) => Err(RideError::ConflictingSelection),
            (_, Some(ids)) => Ok(self
                .segments
                .iter()
                .filter(|s| ids.contains(&s.id))
                .collect()),
            (mask, None) => Ok(self.masked(mask)),
        }
    }

    /// Summary of the segments selected by `mask`, or of all segments
    ///
    /// Additional variables are summarized only when the ride's first
    /// segment carries them, whatever the mask selects.
    pub fn summary(&self, mask: Option<&[bool]>) -> SummaryReport {
        let selected = self.masked(mask);
        let additional_vars = match self.segments.first() {
            Some(first) => self
                .additional_vars
                .iter()
                .filter(|var| first.field(var).is_some())
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        let context = SummaryContext {
            filename: Some(self.source_name.clone()),
            sport: self.sport.clone(),
            median_position: self.median_position,
            forward: self.forward,
            additional_vars,
        };
        Summarizer::summarize(&selected, &context)
    }

    fn masked(&self, mask: Option<&[bool]>) -> Vec<&Segment> {
        match mask {
            Some(mask) => self
                .segments
                .iter()
                .enumerate()
                .filter(|(i, _)| mask.get(*i).copied().unwrap_or(false))
                .map(|(_, s)| s)
                .collect(),
            None => self.segments.iter().collect(),
        }
    }
}

fn resolve_format(name: &str, options: &RideOptions) -> Result<TrackFormat, RideError> {
    match options.format {
        Some(format) => Ok(format),
        None => TrackFormat::from_path(Path::new(name)),
    }
}
