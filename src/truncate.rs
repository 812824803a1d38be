//! Route truncation
//!
//! Finds the part of a track between a start and an end location. The track
//! point nearest to each location is searched independently, so the two
//! indices may come out in either order; `forward` records which.

use crate::config::RouteLimits;
use crate::geo;
use crate::types::Record;

/// Outcome of a truncation attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Truncation<'a> {
    /// Selected records, in original chronological order
    pub records: &'a [Record],
    /// Whether both limits were within the threshold of the track
    pub found: bool,
    /// `Some(true)` if the end limit was passed after the start limit;
    /// `None` when the limits were not found
    pub forward: Option<bool>,
}

/// Restrict `records` to the range between the points nearest to the limits
///
/// When either limit is not within `threshold_m` of any record the full
/// input is returned with `found == false`.
pub fn truncate<'a>(records: &'a [Record], limits: &RouteLimits) -> Truncation<'a> {
    let mut min_dist_start = f64::INFINITY;
    let mut min_dist_end = f64::INFINITY;
    let mut start_idx = 0;
    let mut end_idx = 0;

    for (i, record) in records.iter().enumerate() {
        let current = record.position();

        let dist_start = geo::distance(current, limits.start);
        if dist_start < min_dist_start {
            start_idx = i;
            min_dist_start = dist_start;
        }

        let dist_end = geo::distance(current, limits.end);
        if dist_end < min_dist_end {
            end_idx = i;
            min_dist_end = dist_end;
        }
    }

    let found = min_dist_start < limits.threshold_m && min_dist_end < limits.threshold_m;
    if !found {
        return Truncation {
            records,
            found: false,
            forward: None,
        };
    }

    let forward = end_idx > start_idx;
    let (lower, upper) = if forward {
        (start_idx, end_idx)
    } else {
        (end_idx, start_idx)
    };

    Truncation {
        records: &records[lower..upper],
        found: true,
        forward: Some(forward),
    }
}
