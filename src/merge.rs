//! Interval merging
//!
//! Raw health-store samples routinely overlap: several sources write the same
//! night, and a single source may split one stage into back-to-back records.
//! This module groups samples by stage label and collapses each group into a
//! sorted set of disjoint intervals.

use crate::error::ComputeError;
use crate::types::{ProcessedSleepData, RawSleepSample, SleepInterval, StageLabel};
use std::collections::BTreeMap;

/// Merge overlapping or touching intervals.
///
/// The output is sorted by start, and for every adjacent pair
/// `out[i].end() < out[i + 1].start()`.
pub fn merge(intervals: &[SleepInterval]) -> Vec<SleepInterval> {
    let mut sorted = intervals.to_vec();
    // Stable, so equal starts keep their input order
    sorted.sort_by_key(|interval| interval.start());

    let mut merged: Vec<SleepInterval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(current) if interval.start() <= current.end() => {
                *current = current.extended_to(interval.end());
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Group labelled intervals by stage and merge each group independently.
pub fn merge_by_stage<I>(labelled: I) -> ProcessedSleepData
where
    I: IntoIterator<Item = (StageLabel, SleepInterval)>,
{
    let mut grouped: BTreeMap<StageLabel, Vec<SleepInterval>> = BTreeMap::new();
    for (label, interval) in labelled {
        grouped.entry(label).or_default().push(interval);
    }

    let stages = grouped
        .into_iter()
        .map(|(label, intervals)| {
            let merged = merge(&intervals);
            (label, merged)
        })
        .collect();

    ProcessedSleepData::from_merged(stages)
}

/// Validate raw samples and build the merged per-stage data.
///
/// Any malformed timestamp or interval that ends before it starts rejects the
/// whole batch; the error names the offending sample.
pub fn process_sleep_samples(
    samples: &[RawSleepSample],
) -> Result<ProcessedSleepData, ComputeError> {
    let labelled = samples
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            sample
                .interval()
                .map(|interval| (sample.value.clone(), interval))
                .map_err(|e| {
                    log::warn!("rejecting sleep sample {index} ({}): {e}", sample.value);
                    ComputeError::InvalidSample {
                        index,
                        label: sample.value.to_string(),
                        reason: e.to_string(),
                    }
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(merge_by_stage(labelled))
}
