//! Sleep quality scoring
//!
//! The score is a weighted sum of five sub-scores, each a piecewise linear
//! ramp clamped to 0-1:
//!
//! | Sub-score   | Input                         | 0 at      | 1 at     |
//! |-------------|-------------------------------|-----------|----------|
//! | Efficiency  | sleep / (in bed + awake)      | <= 0.5    | >= 1.0   |
//! | Sleep time  | deep + REM + core             | <= 4h     | >= 8h    |
//! | Deep sleep  | deep                          | < 0.25h   | >= 1.25h |
//! | REM sleep   | REM                           | < 0.75h   | >= 1.75h |
//! | Consistency | bedtime drift vs prior nights | >= 1h     | 0        |
//!
//! A day without any deep, REM or core time scores 0.

use crate::aggregate::{all_stages_for_day, StageDurations};
use crate::config::{EngineConfig, ScoreWeights};
use crate::error::ComputeError;
use crate::types::{DateObject, ProcessedSleepData, StageLabel};
use crate::window::SleepDayWindow;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: i64 = 86_400_000;

/// Scale used when presenting scores as integers
pub const DISPLAY_SCALE: f64 = 1000.0;

/// Raw sub-scores and weighted total for one sleep day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Sleep efficiency ratio the efficiency sub-score was computed from
    pub efficiency: f64,
    pub efficiency_score: f64,
    pub sleep_time_score: f64,
    pub deep_sleep_score: f64,
    pub rem_sleep_score: f64,
    pub consistency_score: f64,
    /// Weighted total in 0-1
    pub total: f64,
    /// `total` on the 0-1000 display scale
    pub display: u32,
}

impl ScoreBreakdown {
    fn empty() -> Self {
        Self {
            efficiency: 0.0,
            efficiency_score: 0.0,
            sleep_time_score: 0.0,
            deep_sleep_score: 0.0,
            rem_sleep_score: 0.0,
            consistency_score: 0.0,
            total: 0.0,
            display: 0,
        }
    }
}

/// Computes quality scores over merged sleep data
#[derive(Debug, Clone)]
pub struct ScoreEngine {
    window: SleepDayWindow,
    weights: ScoreWeights,
    consistency_window_days: u32,
    consistency_tolerance: TimeDelta,
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self {
            window: SleepDayWindow::default(),
            weights: ScoreWeights::default(),
            consistency_window_days: crate::config::DEFAULT_CONSISTENCY_WINDOW_DAYS,
            consistency_tolerance: TimeDelta::minutes(i64::from(
                crate::config::DEFAULT_CONSISTENCY_TOLERANCE_MINUTES,
            )),
        }
    }
}

impl ScoreEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            window: SleepDayWindow::from_config(config)?,
            weights: config.weights,
            consistency_window_days: config.consistency_window_days,
            consistency_tolerance: TimeDelta::minutes(i64::from(
                config.consistency_tolerance_minutes,
            )),
        })
    }

    pub fn window(&self) -> &SleepDayWindow {
        &self.window
    }

    /// Quality score for `day` in 0-1
    pub fn score(&self, data: &ProcessedSleepData, day: &DateObject) -> Result<f64, ComputeError> {
        Ok(self.breakdown(data, day)?.total)
    }

    /// Every sub-score for `day` along with the weighted total
    pub fn breakdown(
        &self,
        data: &ProcessedSleepData,
        day: &DateObject,
    ) -> Result<ScoreBreakdown, ComputeError> {
        log::debug!("scoring sleep day {day}");
        let durations = all_stages_for_day(&self.window, day, data)?.durations();
        if durations.total_sleep() <= TimeDelta::zero() {
            return Ok(ScoreBreakdown::empty());
        }
        let consistency_score = self.bedtime_consistency(data, day)?;
        Ok(self.combine(&durations, consistency_score))
    }

    fn combine(&self, durations: &StageDurations, consistency_score: f64) -> ScoreBreakdown {
        let efficiency = durations.efficiency();
        let efficiency_score = efficiency_score(efficiency);
        let sleep_time_score = sleep_time_score(durations.total_sleep());
        let deep_sleep_score = deep_sleep_score(durations.deep);
        let rem_sleep_score = rem_sleep_score(durations.rem);

        let weighted = efficiency_score * self.weights.efficiency
            + sleep_time_score * self.weights.sleep_time
            + deep_sleep_score * self.weights.deep_sleep
            + rem_sleep_score * self.weights.rem_sleep
            + consistency_score * self.weights.consistency;
        let total = weighted.clamp(0.0, 1.0);

        ScoreBreakdown {
            efficiency,
            efficiency_score,
            sleep_time_score,
            deep_sleep_score,
            rem_sleep_score,
            consistency_score,
            total,
            display: display_score(total),
        }
    }

    /// Similarity of the day's first core-sleep onset to the trailing average.
    ///
    /// Each of the preceding days contributes the time of day of its first
    /// core interval; a day without core sleep contributes midnight UTC
    /// (instant 0). Returns 0 when `day` itself has no core sleep.
    pub fn bedtime_consistency(
        &self,
        data: &ProcessedSleepData,
        day: &DateObject,
    ) -> Result<f64, ComputeError> {
        let current = match self.first_core_start(data, day)? {
            Some(start) => start,
            None => return Ok(0.0),
        };

        let mut previous_sum = 0.0;
        for offset in 1..=self.consistency_window_days {
            let bedtime = self
                .first_core_start(data, &day.days_before(offset))?
                .map(|start| start.timestamp_millis())
                .unwrap_or(0);
            previous_sum += time_of_day_ms(bedtime) as f64;
        }
        let average = previous_sum / f64::from(self.consistency_window_days);

        let difference = (time_of_day_ms(current.timestamp_millis()) as f64 - average).abs();
        Ok(consistency_score(
            difference,
            self.consistency_tolerance.num_milliseconds() as f64,
        ))
    }

    fn first_core_start(
        &self,
        data: &ProcessedSleepData,
        day: &DateObject,
    ) -> Result<Option<DateTime<Utc>>, ComputeError> {
        Ok(self
            .window
            .filter_for_day(&StageLabel::Core, day, data)?
            .first()
            .map(|interval| interval.start()))
    }
}

fn hours(duration: TimeDelta) -> f64 {
    duration.num_milliseconds() as f64 / MS_PER_HOUR
}

fn time_of_day_ms(epoch_ms: i64) -> i64 {
    epoch_ms.rem_euclid(MS_PER_DAY)
}

/// 0 at or below 50% efficiency, 1 at 100% or more
pub fn efficiency_score(efficiency: f64) -> f64 {
    if !efficiency.is_finite() || efficiency <= 0.5 {
        0.0
    } else if efficiency >= 1.0 {
        1.0
    } else {
        (efficiency - 0.5) / 0.5
    }
}

/// 0 at or below 4h of sleep, 1 at 8h or more
pub fn sleep_time_score(total_sleep: TimeDelta) -> f64 {
    let h = hours(total_sleep);
    if h <= 4.0 {
        0.0
    } else if h >= 8.0 {
        1.0
    } else {
        (h - 4.0) / 4.0
    }
}

/// 0 below 15 minutes of deep sleep, 1 at 75 minutes or more.
///
/// In between the ramp is anchored at 30 minutes, so 15-30 minutes floors at 0
/// and the score jumps from 0.75 to 1 at the upper threshold.
pub fn deep_sleep_score(deep: TimeDelta) -> f64 {
    let h = hours(deep);
    if h < 0.25 {
        0.0
    } else if h >= 1.25 {
        1.0
    } else {
        (h - 0.5).max(0.0)
    }
}

/// 0 below 45 minutes of REM sleep, 1 at 105 minutes or more
pub fn rem_sleep_score(rem: TimeDelta) -> f64 {
    let h = hours(rem);
    if h < 0.75 {
        0.0
    } else if h >= 1.75 {
        1.0
    } else {
        h - 0.75
    }
}

/// `1 - min(difference / tolerance, 1)`
pub fn consistency_score(difference_ms: f64, tolerance_ms: f64) -> f64 {
    if tolerance_ms <= 0.0 || !difference_ms.is_finite() {
        return 0.0;
    }
    1.0 - (difference_ms.abs() / tolerance_ms).min(1.0)
}

/// Score on the 0-1000 display scale
pub fn display_score(score: f64) -> u32 {
    if !score.is_finite() {
        return 0;
    }
    (score.clamp(0.0, 1.0) * DISPLAY_SCALE).round() as u32
}
