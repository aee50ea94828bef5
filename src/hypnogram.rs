//! Hypnogram data for the sleep graph: the in-bed range of a night, a stage
//! level every five minutes and the hour labels under the chart.

use crate::aggregate::all_stages_for_day;
use crate::error::ComputeError;
use crate::types::{DateObject, ProcessedSleepData, SleepInterval, StageLabel};
use crate::window::SleepDayWindow;
use chrono::{DateTime, TimeDelta, Timelike, Utc};
use serde::Serialize;

/// Spacing between hypnogram points
pub const STEP_MINUTES: i64 = 5;

/// Time plotted after the last in-bed interval ends
pub const TRAILING_HOURS: i64 = 1;

/// From the first in-bed start to the last in-bed end of a sleep day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SleepRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Plotted level of one hypnogram step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HypnogramLevel {
    Deep,
    Rem,
    Core,
    Awake,
    InBed,
}

impl HypnogramLevel {
    /// Chart value; awake and in-bed share the top row
    pub fn value(self) -> u8 {
        match self {
            Self::Deep => 0,
            Self::Rem => 1,
            Self::Core => 2,
            Self::Awake | Self::InBed => 3,
        }
    }
}

/// Everything the sleep graph plots for one night
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hypnogram {
    pub range: Option<SleepRange>,
    pub labels: Vec<String>,
    pub levels: Vec<u8>,
}

impl Hypnogram {
    pub fn for_day(
        window: &SleepDayWindow,
        day: &DateObject,
        data: &ProcessedSleepData,
    ) -> Result<Self, ComputeError> {
        Ok(Self {
            range: sleep_range_for_day(window, day, data)?,
            labels: hour_labels(window, day, data)?,
            levels: sleep_state_series(window, day, data)?
                .into_iter()
                .map(HypnogramLevel::value)
                .collect(),
        })
    }
}

pub fn sleep_range_for_day(
    window: &SleepDayWindow,
    day: &DateObject,
    data: &ProcessedSleepData,
) -> Result<Option<SleepRange>, ComputeError> {
    let in_bed = window.filter_for_day(&StageLabel::InBed, day, data)?;
    Ok(range_of(&in_bed))
}

fn range_of(in_bed: &[SleepInterval]) -> Option<SleepRange> {
    match (in_bed.first(), in_bed.last()) {
        (Some(first), Some(last)) => Some(SleepRange {
            start: first.start(),
            end: last.end(),
        }),
        _ => None,
    }
}

/// One level per five minutes from the first in-bed start through one hour
/// after the last in-bed end. Empty without in-bed data.
pub fn sleep_state_series(
    window: &SleepDayWindow,
    day: &DateObject,
    data: &ProcessedSleepData,
) -> Result<Vec<HypnogramLevel>, ComputeError> {
    let stages = all_stages_for_day(window, day, data)?;
    let range = match range_of(&stages.in_bed) {
        Some(range) => range,
        None => return Ok(Vec::new()),
    };

    // Overlapping stages resolve in this order
    let priority = [
        (&stages.core, HypnogramLevel::Core),
        (&stages.rem, HypnogramLevel::Rem),
        (&stages.awake, HypnogramLevel::Awake),
        (&stages.deep, HypnogramLevel::Deep),
    ];

    let step = TimeDelta::minutes(STEP_MINUTES);
    let last = range.end + TimeDelta::hours(TRAILING_HOURS);
    let mut series = Vec::new();
    let mut instant = range.start;
    while instant <= last {
        let level = priority
            .iter()
            .find(|(intervals, _)| intervals.iter().any(|i| i.covers(instant)))
            .map(|(_, level)| *level)
            .unwrap_or(HypnogramLevel::InBed);
        series.push(level);
        instant += step;
    }
    Ok(series)
}

/// 12-hour clock labels for each local hour the night spans, wrapping past
/// midnight.
pub fn hour_labels(
    window: &SleepDayWindow,
    day: &DateObject,
    data: &ProcessedSleepData,
) -> Result<Vec<String>, ComputeError> {
    let range = match sleep_range_for_day(window, day, data)? {
        Some(range) => range,
        None => return Ok(Vec::new()),
    };

    let tz = window.tz();
    let start_hour = range.start.with_timezone(&tz).hour();
    let end_hour = range.end.with_timezone(&tz).hour() + 1;

    let hours: Vec<u32> = if start_hour < end_hour {
        (start_hour..end_hour).collect()
    } else {
        (start_hour..24).chain(0..end_hour).collect()
    };
    Ok(hours.into_iter().map(twelve_hour).collect())
}

fn twelve_hour(hour: u32) -> String {
    match hour % 12 {
        0 => "12".to_string(),
        h => h.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_by_stage;
    use crate::types::parse_timestamp;
    use chrono_tz::Tz;
    use pretty_assertions::assert_eq;

    fn interval(start: &str, end: &str) -> SleepInterval {
        SleepInterval::new(parse_timestamp(start).unwrap(), parse_timestamp(end).unwrap()).unwrap()
    }

    fn night() -> ProcessedSleepData {
        merge_by_stage(vec![
            (
                StageLabel::InBed,
                interval("2024-01-01T22:00:00Z", "2024-01-01T23:00:00Z"),
            ),
            (
                StageLabel::InBed,
                interval("2024-01-01T23:30:00Z", "2024-01-02T01:00:00Z"),
            ),
            (
                StageLabel::Core,
                interval("2024-01-01T22:00:00Z", "2024-01-01T22:10:00Z"),
            ),
            (
                StageLabel::Deep,
                interval("2024-01-01T22:05:00Z", "2024-01-01T22:20:00Z"),
            ),
            (
                StageLabel::Awake,
                interval("2024-01-01T22:20:00Z", "2024-01-01T22:25:00Z"),
            ),
        ])
    }

    fn day() -> DateObject {
        DateObject::from_ymd(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_sleep_range_spans_in_bed_intervals() {
        let range = sleep_range_for_day(&SleepDayWindow::default(), &day(), &night())
            .unwrap()
            .unwrap();
        assert_eq!(range.start, parse_timestamp("2024-01-01T22:00:00Z").unwrap());
        assert_eq!(range.end, parse_timestamp("2024-01-02T01:00:00Z").unwrap());
    }

    #[test]
    fn test_no_in_bed_data_means_empty_outputs() {
        let window = SleepDayWindow::default();
        let data = merge_by_stage(vec![(
            StageLabel::Core,
            interval("2024-01-01T22:00:00Z", "2024-01-01T23:00:00Z"),
        )]);
        assert_eq!(sleep_range_for_day(&window, &day(), &data).unwrap(), None);
        assert!(sleep_state_series(&window, &day(), &data).unwrap().is_empty());
        assert!(hour_labels(&window, &day(), &data).unwrap().is_empty());
    }

    #[test]
    fn test_series_length_and_priority() {
        let series = sleep_state_series(&SleepDayWindow::default(), &day(), &night()).unwrap();

        // 22:00 through 02:00 inclusive in five-minute steps
        assert_eq!(series.len(), 4 * 12 + 1);
        assert_eq!(
            &series[..6],
            &[
                HypnogramLevel::Core,
                HypnogramLevel::Core,
                HypnogramLevel::Deep,
                HypnogramLevel::Deep,
                HypnogramLevel::Awake,
                HypnogramLevel::InBed,
            ]
        );
        assert_eq!(series.last(), Some(&HypnogramLevel::InBed));
    }

    #[test]
    fn test_hypnogram_for_day() {
        let hypnogram = Hypnogram::for_day(&SleepDayWindow::default(), &day(), &night()).unwrap();
        assert_eq!(hypnogram.labels.len(), 4);
        assert_eq!(hypnogram.levels.len(), 49);
        assert_eq!(&hypnogram.levels[..3], &[2, 2, 0]);
        assert!(hypnogram.range.is_some());
    }

    #[test]
    fn test_level_values() {
        assert_eq!(HypnogramLevel::Deep.value(), 0);
        assert_eq!(HypnogramLevel::Rem.value(), 1);
        assert_eq!(HypnogramLevel::Core.value(), 2);
        assert_eq!(HypnogramLevel::Awake.value(), 3);
        assert_eq!(HypnogramLevel::InBed.value(), 3);
    }

    #[test]
    fn test_hour_labels_wrap_past_midnight() {
        let labels = hour_labels(&SleepDayWindow::default(), &day(), &night()).unwrap();
        assert_eq!(labels, vec!["10", "11", "12", "1"]);
    }

    #[test]
    fn test_hour_labels_use_local_time() {
        let window = SleepDayWindow::new(Tz::Europe__Berlin, 17).unwrap();
        let labels = hour_labels(&window, &day(), &night()).unwrap();
        // 23:00 to 02:00 CET
        assert_eq!(labels, vec!["11", "12", "1", "2"]);
    }
}
