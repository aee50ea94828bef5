//! Error types for sleepscore

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during ingestion or computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse sample payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Interval ends before it starts: {start} > {end}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Sample {index} ({label}) rejected: {reason}")]
    InvalidSample {
        index: usize,
        label: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
