//! Sample sources
//!
//! A source hands the engine raw sleep-stage and heart-rate samples exactly as
//! the health store reported them. Parsing and validation of timestamps happen
//! later, when the samples are merged.

mod health_export;
mod memory;

pub use health_export::HealthExportAdapter;
pub use memory::InMemorySource;

use crate::error::ComputeError;
use crate::heart_rate::RawHeartRateSample;
use crate::types::RawSleepSample;

/// Provider of raw health-store samples
pub trait SampleSource {
    /// Raw sleep-stage samples
    fn sleep_samples(&self) -> Result<Vec<RawSleepSample>, ComputeError>;

    /// Raw heart-rate samples; sources without heart-rate data return none
    fn heart_rate_samples(&self) -> Result<Vec<RawHeartRateSample>, ComputeError> {
        Ok(Vec::new())
    }
}
