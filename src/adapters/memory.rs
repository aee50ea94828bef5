//! Injected samples

use crate::error::ComputeError;
use crate::heart_rate::RawHeartRateSample;
use crate::types::RawSleepSample;

use super::SampleSource;

/// Samples already held by the host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemorySource {
    sleep: Vec<RawSleepSample>,
    heart_rate: Vec<RawHeartRateSample>,
}

impl InMemorySource {
    pub fn new(sleep: Vec<RawSleepSample>) -> Self {
        Self {
            sleep,
            heart_rate: Vec::new(),
        }
    }

    pub fn with_heart_rate(mut self, heart_rate: Vec<RawHeartRateSample>) -> Self {
        self.heart_rate = heart_rate;
        self
    }
}

impl SampleSource for InMemorySource {
    fn sleep_samples(&self) -> Result<Vec<RawSleepSample>, ComputeError> {
        Ok(self.sleep.clone())
    }

    fn heart_rate_samples(&self) -> Result<Vec<RawHeartRateSample>, ComputeError> {
        Ok(self.heart_rate.clone())
    }
}
