//! Bikeride - GPS ride analysis
//!
//! Bikeride turns a recorded FIT or GPX track into ride statistics through a
//! deterministic pipeline: track reading → record normalization → optional
//! route truncation → segment building (with optional weather) → summary.
//!
//! ## Modules
//!
//! - **Tracks**: [`readers`] parse source files, [`normalizer`] turns raw
//!   points into [`Record`]s
//! - **Segments**: [`truncate`] cuts a route out of a track, [`segments`]
//!   derives per-pair attributes and joins [`weather`] observations
//! - **Summaries**: [`summary`] aggregates segments, [`pipeline`] ties it all
//!   together as a [`Ride`]

pub mod config;
pub mod error;
pub mod geo;
pub mod normalizer;
pub mod pipeline;
pub mod readers;
pub mod segments;
pub mod summary;
pub mod truncate;
pub mod types;
pub mod weather;

pub use config::{RideOptions, RouteLimits, WeatherConfig};
pub use error::RideError;
pub use pipeline::{summarize_file, Ride};
pub use summary::{Summary, SummaryReport};
pub use types::{Position, Record, Scalar, Segment, TrackFormat};
pub use weather::{WeatherSource, WeatherTable};

/// Bikeride version
pub const BIKERIDE_VERSION: &str = env!("CARGO_PKG_VERSION");
