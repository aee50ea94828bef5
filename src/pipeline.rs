//! Pipeline orchestration
//!
//! This module provides the public API for sleepscore. It runs raw samples
//! through merging, windowing, aggregation and scoring, and encodes the
//! results as daily JSON reports.

use crate::adapters::{HealthExportAdapter, SampleSource};
use crate::config::EngineConfig;
use crate::dates::{
    calculate_score_for_time_range, generate_current_week_days, generate_date_range,
    week_total_display_score,
};
use crate::error::ComputeError;
use crate::heart_rate::ProcessedHeartRateData;
use crate::hypnogram::Hypnogram;
use crate::merge::process_sleep_samples;
use crate::report::{DayAnalysis, ReportEncoder};
use crate::score::{display_score, ScoreBreakdown, ScoreEngine};
use crate::types::{DateObject, ProcessedSleepData, StageLabel};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Stages whose intervals place a sleep day in the history
const RECORDED_STAGES: [StageLabel; 5] = [
    StageLabel::InBed,
    StageLabel::Core,
    StageLabel::Rem,
    StageLabel::Deep,
    StageLabel::Awake,
];

/// Convert a raw health store export to daily sleep reports.
///
/// # Arguments
/// * `raw_json` - Export object, JSON array or NDJSON of samples
/// * `dates` - Sleep days to report as `YYYY-MM-DD`; empty means every day with data
/// * `timezone` - User's IANA timezone (e.g., "America/New_York")
///
/// # Returns
/// Vector of report JSON strings, one per requested day
///
/// # Example
/// ```ignore
/// let reports = samples_to_daily_reports(
///     export_json,
///     vec!["2024-06-12".to_string()],
///     "Europe/Berlin".to_string(),
/// )?;
/// ```
pub fn samples_to_daily_reports(
    raw_json: String,
    dates: Vec<String>,
    timezone: String,
) -> Result<Vec<String>, ComputeError> {
    let mut processor = SleepProcessor::with_config(EngineConfig::with_timezone(timezone))?;
    let source = HealthExportAdapter::from_json(&raw_json)?;
    processor.load_from_source(&source)?;

    let days = if dates.is_empty() {
        processor.sleep_days()
    } else {
        dates
            .iter()
            .map(|date| DateObject::parse(date))
            .collect::<Result<Vec<_>, _>>()?
    };
    processor.reports(&days)
}

/// Score of one sleep day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayScore {
    pub day: DateObject,
    pub score: f64,
    pub display: u32,
}

/// Stateful processor holding the merged samples of one user.
///
/// Use this when several days are scored or reported from the same samples.
/// Loading new samples replaces the previous ones.
pub struct SleepProcessor {
    config: EngineConfig,
    engine: ScoreEngine,
    encoder: ReportEncoder,
    sleep: ProcessedSleepData,
    heart_rate: ProcessedHeartRateData,
}

impl Default for SleepProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SleepProcessor {
    /// Processor with the default configuration (UTC)
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            engine: ScoreEngine::default(),
            encoder: ReportEncoder::new(),
            sleep: ProcessedSleepData::default(),
            heart_rate: ProcessedHeartRateData::default(),
        }
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        let engine = ScoreEngine::new(&config)?;
        Ok(Self {
            config,
            engine,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn engine(&self) -> &ScoreEngine {
        &self.engine
    }

    pub fn sleep_data(&self) -> &ProcessedSleepData {
        &self.sleep
    }

    pub fn heart_rate_data(&self) -> &ProcessedHeartRateData {
        &self.heart_rate
    }

    /// Replace both sleep and heart-rate samples with those of `source`
    pub fn load_from_source(&mut self, source: &dyn SampleSource) -> Result<(), ComputeError> {
        let sleep = process_sleep_samples(&source.sleep_samples()?)?;
        let heart_rate = ProcessedHeartRateData::from_raw(&source.heart_rate_samples()?)?;
        log::info!(
            "loaded {} merged sleep intervals and {} heart-rate samples",
            sleep.interval_count(),
            heart_rate.len()
        );
        self.sleep = sleep;
        self.heart_rate = heart_rate;
        Ok(())
    }

    /// Replace the sleep samples; heart-rate samples are kept
    pub fn load_sleep_json(&mut self, raw_json: &str) -> Result<(), ComputeError> {
        let source = HealthExportAdapter::from_json(raw_json)?;
        self.sleep = process_sleep_samples(&source.sleep_samples()?)?;
        log::info!("loaded {} merged sleep intervals", self.sleep.interval_count());
        Ok(())
    }

    /// Replace the heart-rate samples; sleep samples are kept
    pub fn load_heart_rate_json(&mut self, raw_json: &str) -> Result<(), ComputeError> {
        let source = HealthExportAdapter::from_json(raw_json)?;
        self.heart_rate = ProcessedHeartRateData::from_raw(&source.heart_rate_samples()?)?;
        log::info!("loaded {} heart-rate samples", self.heart_rate.len());
        Ok(())
    }

    /// Sleep days with at least one recorded interval, oldest first
    pub fn sleep_days(&self) -> Vec<DateObject> {
        let window = self.engine.window();
        let days: BTreeSet<DateObject> = RECORDED_STAGES
            .iter()
            .flat_map(|label| self.sleep.stage(label))
            .map(|interval| window.day_of(interval.start()))
            .collect();
        days.into_iter().collect()
    }

    pub fn score_day(&self, day: &DateObject) -> Result<f64, ComputeError> {
        self.engine.score(&self.sleep, day)
    }

    pub fn breakdown_day(&self, day: &DateObject) -> Result<ScoreBreakdown, ComputeError> {
        self.engine.breakdown(&self.sleep, day)
    }

    pub fn analyze_day(&self, day: &DateObject) -> Result<DayAnalysis, ComputeError> {
        DayAnalysis::compute(&self.engine, day, &self.sleep, &self.heart_rate)
    }

    pub fn hypnogram_day(&self, day: &DateObject) -> Result<Hypnogram, ComputeError> {
        Hypnogram::for_day(self.engine.window(), day, &self.sleep)
    }

    /// JSON report for one sleep day
    pub fn report_day(&self, day: &DateObject) -> Result<String, ComputeError> {
        let analysis = self.analyze_day(day)?;
        self.encoder.encode_to_json(&analysis, &self.config.timezone)
    }

    pub fn reports(&self, days: &[DateObject]) -> Result<Vec<String>, ComputeError> {
        days.iter().map(|day| self.report_day(day)).collect()
    }

    /// Scores for Monday through Sunday of the week containing `date`
    pub fn week_scores(&self, date: NaiveDate) -> Result<Vec<DayScore>, ComputeError> {
        self.scores_for(&generate_current_week_days(date))
    }

    /// Leaderboard total for the week containing `date`
    pub fn week_total(&self, date: NaiveDate) -> Result<u32, ComputeError> {
        let scores: Vec<f64> = self.week_scores(date)?.iter().map(|s| s.score).collect();
        Ok(week_total_display_score(&scores))
    }

    /// Scores for the `days` sleep days before `start`, oldest first
    pub fn range_scores(&self, days: u32, start: NaiveDate) -> Result<Vec<DayScore>, ComputeError> {
        self.scores_for(&generate_date_range(days, start))
    }

    fn scores_for(&self, days: &[DateObject]) -> Result<Vec<DayScore>, ComputeError> {
        let scores = calculate_score_for_time_range(&self.engine, days, &self.sleep)?;
        Ok(days
            .iter()
            .zip(scores)
            .map(|(day, score)| DayScore {
                day: *day,
                score,
                display: display_score(score),
            })
            .collect())
    }
}
