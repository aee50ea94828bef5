//! Sleep-day windowing
//!
//! A sleep day runs from the boundary hour (17:00 by default) on its calendar
//! date to one millisecond before the boundary hour on the next date, in the
//! user's local timezone. A night that starts before midnight is attributed to
//! the evening's date instead of being split across two days.

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::types::{DateObject, ProcessedSleepData, SleepInterval, StageLabel};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Inclusive time range of one sleep day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Start OR end inside the window; partial overlap counts
    pub fn touches(&self, interval: &SleepInterval) -> bool {
        self.contains(interval.start()) || self.contains(interval.end())
    }
}

/// Computes sleep-day windows in a fixed timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepDayWindow {
    tz: Tz,
    boundary_hour: u32,
}

impl Default for SleepDayWindow {
    fn default() -> Self {
        Self {
            tz: Tz::UTC,
            boundary_hour: crate::config::DEFAULT_DAY_BOUNDARY_HOUR,
        }
    }
}

impl SleepDayWindow {
    pub fn new(tz: Tz, boundary_hour: u32) -> Result<Self, ComputeError> {
        if boundary_hour > 23 {
            return Err(ComputeError::InvalidConfig(format!(
                "day boundary hour must be 0-23, got {boundary_hour}"
            )));
        }
        Ok(Self { tz, boundary_hour })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ComputeError> {
        Self::new(config.tz()?, config.day_boundary_hour)
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Window for `day`: boundary on its date to boundary minus 1ms on the next date
    pub fn window(&self, day: &DateObject) -> Result<DayWindow, ComputeError> {
        let start = self.boundary_on(day.date())?;
        let next = day
            .date()
            .succ_opt()
            .ok_or_else(|| ComputeError::DateParseError(format!("no date after {}", day.date())))?;
        let end = self.boundary_on(next)? - TimeDelta::milliseconds(1);
        Ok(DayWindow { start, end })
    }

    /// Intervals of `stage` whose start or end lies within the day's window
    pub fn filter_for_day(
        &self,
        stage: &StageLabel,
        day: &DateObject,
        data: &ProcessedSleepData,
    ) -> Result<Vec<SleepInterval>, ComputeError> {
        let window = self.window(day)?;
        Ok(data
            .stage(stage)
            .iter()
            .filter(|interval| window.touches(interval))
            .copied()
            .collect())
    }

    /// Sleep day an instant belongs to
    pub fn day_of(&self, instant: DateTime<Utc>) -> DateObject {
        let local = instant.with_timezone(&self.tz).naive_local();
        DateObject::new((local - TimeDelta::hours(i64::from(self.boundary_hour))).date())
    }

    fn boundary_on(&self, date: NaiveDate) -> Result<DateTime<Utc>, ComputeError> {
        let time = NaiveTime::from_hms_opt(self.boundary_hour, 0, 0).ok_or_else(|| {
            ComputeError::InvalidConfig(format!("invalid boundary hour {}", self.boundary_hour))
        })?;
        self.resolve_local(date.and_time(time))
    }

    /// Local wall-clock time to UTC; earliest instant when ambiguous, first
    /// valid instant after a DST gap.
    fn resolve_local(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, ComputeError> {
        if let Some(resolved) = self.tz.from_local_datetime(&local).earliest() {
            return Ok(resolved.with_timezone(&Utc));
        }
        (1..=4)
            .map(|step| local + TimeDelta::minutes(30 * step))
            .find_map(|shifted| self.tz.from_local_datetime(&shifted).earliest())
            .map(|resolved| resolved.with_timezone(&Utc))
            .ok_or_else(|| {
                ComputeError::InvalidTimezone(format!("{local} does not exist in {}", self.tz))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_by_stage;
    use pretty_assertions::assert_eq;

    fn utc(raw: &str) -> DateTime<Utc> {
        crate::types::parse_timestamp(raw).unwrap()
    }

    fn interval(start: &str, end: &str) -> SleepInterval {
        SleepInterval::new(utc(start), utc(end)).unwrap()
    }

    #[test]
    fn test_window_bounds_utc() {
        let window = SleepDayWindow::new(Tz::UTC, 17).unwrap();
        let day = DateObject::from_ymd(2024, 1, 1).unwrap();

        assert_eq!(
            window.window(&day).unwrap(),
            DayWindow {
                start: utc("2024-01-01T17:00:00Z"),
                end: utc("2024-01-02T16:59:59.999Z"),
            }
        );
    }

    #[test]
    fn test_window_follows_local_timezone() {
        let window = SleepDayWindow::new(chrono_tz::America::New_York, 17).unwrap();
        let day = DateObject::from_ymd(2024, 1, 1).unwrap();
        let bounds = window.window(&day).unwrap();

        assert_eq!(bounds.start, utc("2024-01-01T22:00:00Z"));
        assert_eq!(bounds.end, utc("2024-01-02T21:59:59.999Z"));
    }

    #[test]
    fn test_window_across_dst_change_is_23_hours() {
        // US DST starts 2024-03-10 at 02:00 local
        let window = SleepDayWindow::new(chrono_tz::America::New_York, 17).unwrap();
        let day = DateObject::from_ymd(2024, 3, 9).unwrap();
        let bounds = window.window(&day).unwrap();

        assert_eq!(
            bounds.end - bounds.start,
            TimeDelta::hours(23) - TimeDelta::milliseconds(1)
        );
    }

    #[test]
    fn test_boundary_in_dst_gap_moves_past_gap() {
        let window = SleepDayWindow::new(chrono_tz::America::New_York, 2).unwrap();
        let day = DateObject::from_ymd(2024, 3, 10).unwrap();
        let bounds = window.window(&day).unwrap();

        // 02:00 does not exist that night; 03:00 EDT is 07:00 UTC
        assert_eq!(bounds.start, utc("2024-03-10T07:00:00Z"));
    }

    #[test]
    fn test_boundary_crossing_interval_is_included() {
        let data = merge_by_stage(vec![(
            StageLabel::Core,
            interval("2024-01-01T16:30:00Z", "2024-01-01T17:30:00Z"),
        )]);
        let window = SleepDayWindow::new(Tz::UTC, 17).unwrap();

        let jan_1 = DateObject::from_ymd(2024, 1, 1).unwrap();
        let dec_31 = DateObject::from_ymd(2023, 12, 31).unwrap();

        assert_eq!(
            window.filter_for_day(&StageLabel::Core, &jan_1, &data).unwrap().len(),
            1
        );
        // Its start also falls in the previous sleep day
        assert_eq!(
            window.filter_for_day(&StageLabel::Core, &dec_31, &data).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_filter_excludes_intervals_outside_window() {
        let data = merge_by_stage(vec![
            (
                StageLabel::Deep,
                interval("2024-01-01T23:00:00Z", "2024-01-02T00:00:00Z"),
            ),
            (
                StageLabel::Deep,
                interval("2024-01-02T23:00:00Z", "2024-01-03T00:00:00Z"),
            ),
        ]);
        let window = SleepDayWindow::new(Tz::UTC, 17).unwrap();
        let day = DateObject::from_ymd(2024, 1, 1).unwrap();

        let filtered = window.filter_for_day(&StageLabel::Deep, &day, &data).unwrap();
        assert_eq!(
            filtered,
            vec![interval("2024-01-01T23:00:00Z", "2024-01-02T00:00:00Z")]
        );
    }

    #[test]
    fn test_filter_absent_stage_is_empty() {
        let window = SleepDayWindow::new(Tz::UTC, 17).unwrap();
        let day = DateObject::from_ymd(2024, 1, 1).unwrap();
        let filtered = window
            .filter_for_day(&StageLabel::Rem, &day, &ProcessedSleepData::default())
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_day_of_instant() {
        let window = SleepDayWindow::new(chrono_tz::America::New_York, 17).unwrap();

        // 16:59 EST on Jan 1 is still the Dec 31 sleep day
        assert_eq!(
            window.day_of(utc("2024-01-01T21:59:00Z")),
            DateObject::from_ymd(2023, 12, 31).unwrap()
        );
        assert_eq!(
            window.day_of(utc("2024-01-01T22:00:00Z")),
            DateObject::from_ymd(2024, 1, 1).unwrap()
        );
        assert_eq!(
            window.day_of(utc("2024-01-02T09:00:00Z")),
            DateObject::from_ymd(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        let window = SleepDayWindow::new(Tz::UTC, 17).unwrap();
        let day = DateObject::from_ymd(2024, 1, 1).unwrap();
        let bounds = window.window(&day).unwrap();

        assert!(bounds.contains(bounds.start));
        assert!(bounds.contains(bounds.end));
        assert!(!bounds.contains(bounds.end + TimeDelta::milliseconds(1)));
    }
}
