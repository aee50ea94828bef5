//! Per-stage time accumulation
//!
//! Sums merged intervals per stage for one sleep day and derives the ratios
//! the score and the stage summary are built on.

use crate::error::ComputeError;
use crate::types::{DateObject, ProcessedSleepData, SleepInterval, StageLabel};
use crate::window::SleepDayWindow;
use chrono::TimeDelta;
use serde::Serialize;

/// Total time covered by `intervals`
///
/// Zero for an empty slice. `SleepInterval` cannot hold `end < start`, so the
/// sum is never negative.
pub fn total_duration(intervals: &[SleepInterval]) -> TimeDelta {
    intervals
        .iter()
        .fold(TimeDelta::zero(), |total, interval| total + interval.duration())
}

/// The five scored stages of one sleep day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayStages {
    pub deep: Vec<SleepInterval>,
    pub rem: Vec<SleepInterval>,
    pub core: Vec<SleepInterval>,
    pub in_bed: Vec<SleepInterval>,
    pub awake: Vec<SleepInterval>,
}

impl DayStages {
    pub fn durations(&self) -> StageDurations {
        StageDurations {
            deep: total_duration(&self.deep),
            rem: total_duration(&self.rem),
            core: total_duration(&self.core),
            in_bed: total_duration(&self.in_bed),
            awake: total_duration(&self.awake),
        }
    }
}

/// Apply the day window to every scored stage
pub fn all_stages_for_day(
    window: &SleepDayWindow,
    day: &DateObject,
    data: &ProcessedSleepData,
) -> Result<DayStages, ComputeError> {
    Ok(DayStages {
        deep: window.filter_for_day(&StageLabel::Deep, day, data)?,
        rem: window.filter_for_day(&StageLabel::Rem, day, data)?,
        core: window.filter_for_day(&StageLabel::Core, day, data)?,
        in_bed: window.filter_for_day(&StageLabel::InBed, day, data)?,
        awake: window.filter_for_day(&StageLabel::Awake, day, data)?,
    })
}

/// Per-stage totals for one sleep day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDurations {
    pub deep: TimeDelta,
    pub rem: TimeDelta,
    pub core: TimeDelta,
    pub in_bed: TimeDelta,
    pub awake: TimeDelta,
}

impl Default for StageDurations {
    fn default() -> Self {
        Self {
            deep: TimeDelta::zero(),
            rem: TimeDelta::zero(),
            core: TimeDelta::zero(),
            in_bed: TimeDelta::zero(),
            awake: TimeDelta::zero(),
        }
    }
}

impl StageDurations {
    /// Deep + REM + core
    pub fn total_sleep(&self) -> TimeDelta {
        self.deep + self.rem + self.core
    }

    /// Total sleep over in-bed plus awake time; 0 without in-bed data
    pub fn efficiency(&self) -> f64 {
        if self.in_bed <= TimeDelta::zero() {
            return 0.0;
        }
        let denominator = (self.in_bed + self.awake).num_milliseconds() as f64;
        self.total_sleep().num_milliseconds() as f64 / denominator
    }

    pub fn breakdown(&self) -> StageBreakdown {
        let total = (self.deep + self.rem + self.core + self.awake).num_milliseconds() as f64;
        let pct = |part: TimeDelta| {
            if total <= 0.0 {
                0.0
            } else {
                part.num_milliseconds() as f64 / total * 100.0
            }
        };
        StageBreakdown {
            deep_pct: pct(self.deep),
            rem_pct: pct(self.rem),
            core_pct: pct(self.core),
            awake_pct: pct(self.awake),
        }
    }

    pub fn to_minutes(&self) -> StageMinutes {
        StageMinutes {
            deep: minutes(self.deep),
            rem: minutes(self.rem),
            core: minutes(self.core),
            in_bed: minutes(self.in_bed),
            awake: minutes(self.awake),
            total_sleep: minutes(self.total_sleep()),
        }
    }
}

/// Share of deep, REM, core and awake time in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageBreakdown {
    pub deep_pct: f64,
    pub rem_pct: f64,
    pub core_pct: f64,
    pub awake_pct: f64,
}

/// Stage totals in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageMinutes {
    pub deep: f64,
    pub rem: f64,
    pub core: f64,
    pub in_bed: f64,
    pub awake: f64,
    pub total_sleep: f64,
}

fn minutes(duration: TimeDelta) -> f64 {
    duration.num_milliseconds() as f64 / 60_000.0
}

/// Format a duration as `7h 05m`
pub fn format_duration(duration: TimeDelta) -> String {
    let total_minutes = duration.num_minutes().max(0);
    format!("{}h {:02}m", total_minutes / 60, total_minutes % 60)
}
