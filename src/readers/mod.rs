//! Track readers
//!
//! Readers turn the bytes of a recorded track into an ordered list of raw
//! per-point field mappings. They do not interpret units; that is the job of
//! the [`crate::normalizer`].

mod fit;
mod gpx;

pub use self::fit::FitReader;
pub use self::gpx::GpxReader;

use crate::error::RideError;
use crate::types::{RawTrack, TrackFormat};

/// Trait for track file readers
pub trait TrackReader {
    /// Parse a complete track file
    fn read(&self, bytes: &[u8]) -> Result<RawTrack, RideError>;
}

/// Reader for the given track format
pub fn reader_for(format: TrackFormat) -> Box<dyn TrackReader> {
    match format {
        TrackFormat::Fit => Box::new(FitReader),
        TrackFormat::Gpx => Box::new(GpxReader),
    }
}
