//! Date range helpers for history and weekly views

use crate::error::ComputeError;
use crate::score::{display_score, ScoreEngine};
use crate::types::{DateObject, ProcessedSleepData};
use chrono::{Datelike, NaiveDate};

/// `days` consecutive sleep days ending the day before `start`, oldest first
pub fn generate_date_range(days: u32, start: NaiveDate) -> Vec<DateObject> {
    let start = DateObject::new(start);
    (1..=days).rev().map(|offset| start.days_before(offset)).collect()
}

/// Monday through Sunday of the ISO week containing `date`
pub fn generate_current_week_days(date: NaiveDate) -> Vec<DateObject> {
    let monday = DateObject::new(date).days_before(days_completed_in_week(date));
    (0..7).map(|offset| monday.days_after(offset)).collect()
}

/// Days of the current week before `date`; 0 on Monday, 6 on Sunday
pub fn days_completed_in_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

/// Score each day of `range`, preserving order
pub fn calculate_score_for_time_range(
    engine: &ScoreEngine,
    range: &[DateObject],
    data: &ProcessedSleepData,
) -> Result<Vec<f64>, ComputeError> {
    range.iter().map(|day| engine.score(data, day)).collect()
}

/// Leaderboard total: each score on the display scale, summed
pub fn week_total_display_score(scores: &[f64]) -> u32 {
    scores.iter().map(|score| display_score(*score)).sum()
}
