//! Daily report encoding
//!
//! Gathers everything computed for one sleep day into a single analysis and
//! encodes it as a self-describing JSON report.

use crate::aggregate::{
    all_stages_for_day, format_duration, StageBreakdown, StageDurations, StageMinutes,
};
use crate::error::ComputeError;
use crate::heart_rate::{HeartRateSummary, ProcessedHeartRateData};
use crate::hypnogram::{sleep_range_for_day, SleepRange};
use crate::score::{ScoreBreakdown, ScoreEngine};
use crate::types::{DateObject, ProcessedSleepData};
use crate::window::DayWindow;
use crate::{PRODUCER_NAME, SLEEPSCORE_VERSION};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Everything computed for one sleep day
#[derive(Debug, Clone, PartialEq)]
pub struct DayAnalysis {
    pub day: DateObject,
    pub window: DayWindow,
    pub sleep_range: Option<SleepRange>,
    pub durations: StageDurations,
    pub score: ScoreBreakdown,
    pub heart_rate: Option<HeartRateSummary>,
}

impl DayAnalysis {
    pub fn compute(
        engine: &ScoreEngine,
        day: &DateObject,
        sleep: &ProcessedSleepData,
        heart_rate: &ProcessedHeartRateData,
    ) -> Result<Self, ComputeError> {
        let window = engine.window();
        let sleep_range = sleep_range_for_day(window, day, sleep)?;
        let heart_rate = sleep_range.and_then(|range| {
            HeartRateSummary::from_samples(heart_rate.in_range(range.start, range.end))
        });

        Ok(Self {
            day: *day,
            window: window.window(day)?,
            sleep_range,
            durations: all_stages_for_day(window, day, sleep)?.durations(),
            score: engine.breakdown(sleep, day)?,
            heart_rate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Encoded report for one sleep day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySleepReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    /// Calendar date the sleep day starts on, `YYYY-MM-DD`
    pub date: String,
    pub weekday: String,
    pub timezone: String,
    pub window: DayWindow,
    pub sleep_range: Option<SleepRange>,
    pub stages_minutes: StageMinutes,
    pub stage_breakdown: StageBreakdown,
    pub total_sleep: String,
    pub score: ScoreBreakdown,
    pub heart_rate: Option<HeartRateSummary>,
}

/// Encodes day analyses into reports stamped with this encoder's instance id
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode(&self, analysis: &DayAnalysis, timezone: &str) -> DailySleepReport {
        DailySleepReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: SLEEPSCORE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            date: analysis.day.date().format("%Y-%m-%d").to_string(),
            weekday: analysis.day.day().to_string(),
            timezone: timezone.to_string(),
            window: analysis.window,
            sleep_range: analysis.sleep_range,
            stages_minutes: analysis.durations.to_minutes(),
            stage_breakdown: analysis.durations.breakdown(),
            total_sleep: format_duration(analysis.durations.total_sleep()),
            score: analysis.score,
            heart_rate: analysis.heart_rate,
        }
    }

    pub fn encode_to_json(
        &self,
        analysis: &DayAnalysis,
        timezone: &str,
    ) -> Result<String, ComputeError> {
        let report = self.encode(analysis, timezone);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}
