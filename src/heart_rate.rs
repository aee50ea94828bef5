//! Heart-rate samples recorded during sleep

use crate::error::ComputeError;
use crate::types::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heart-rate sample as delivered by the health store bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHeartRateSample {
    /// Beats per minute
    pub value: f64,
    pub start_date: String,
    pub end_date: String,
}

impl RawHeartRateSample {
    pub fn new(value: f64, start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            value,
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}

/// One heart-rate reading, timestamped at its sample start
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeartRateSample {
    pub timestamp: DateTime<Utc>,
    pub bpm: f64,
}

/// Heart-rate readings sorted by timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProcessedHeartRateData {
    samples: Vec<HeartRateSample>,
}

impl ProcessedHeartRateData {
    /// Validate and sort raw samples; non-finite or negative readings are rejected
    pub fn from_raw(raw: &[RawHeartRateSample]) -> Result<Self, ComputeError> {
        let mut samples = raw
            .iter()
            .enumerate()
            .map(|(index, sample)| {
                let invalid = |reason: String| {
                    log::warn!("rejecting heart-rate sample {index}: {reason}");
                    ComputeError::InvalidSample {
                        index,
                        label: "HEART_RATE".to_string(),
                        reason,
                    }
                };
                if !sample.value.is_finite() || sample.value < 0.0 {
                    return Err(invalid(format!("bpm {} out of range", sample.value)));
                }
                let timestamp =
                    parse_timestamp(&sample.start_date).map_err(|e| invalid(e.to_string()))?;
                Ok(HeartRateSample {
                    timestamp,
                    bpm: sample.value,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        samples.sort_by_key(|sample| sample.timestamp);
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[HeartRateSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples with `start <= timestamp <= end`
    pub fn in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[HeartRateSample] {
        if end < start {
            return &[];
        }
        let from = self.samples.partition_point(|s| s.timestamp < start);
        let to = self.samples.partition_point(|s| s.timestamp <= end);
        &self.samples[from..to]
    }
}

/// Heart-rate statistics over a set of readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeartRateSummary {
    pub min: f64,
    pub max: f64,
    /// Mean rounded to the nearest beat
    pub average: f64,
    pub count: usize,
}

impl HeartRateSummary {
    pub fn from_samples(samples: &[HeartRateSample]) -> Option<Self> {
        let first = samples.first()?;
        let (min, max, sum) = samples.iter().fold(
            (first.bpm, first.bpm, 0.0),
            |(min, max, sum), sample| (min.min(sample.bpm), max.max(sample.bpm), sum + sample.bpm),
        );
        Some(Self {
            min,
            max,
            average: (sum / samples.len() as f64).round(),
            count: samples.len(),
        })
    }
}
