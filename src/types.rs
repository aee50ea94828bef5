//! Core types for the sleepscore engine
//!
//! This module defines the data that flows through the engine: raw health-store
//! samples, validated sleep intervals, merged per-stage data and the day
//! selector used by presentation collaborators.

use crate::error::ComputeError;
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sleep stage label as reported by the health store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageLabel {
    InBed,
    Core,
    Rem,
    Deep,
    Awake,
    Asleep,
    /// Labels added by other sources are kept verbatim
    #[serde(untagged)]
    Other(String),
}

impl StageLabel {
    pub fn as_str(&self) -> &str {
        match self {
            StageLabel::InBed => "INBED",
            StageLabel::Core => "CORE",
            StageLabel::Rem => "REM",
            StageLabel::Deep => "DEEP",
            StageLabel::Awake => "AWAKE",
            StageLabel::Asleep => "ASLEEP",
            StageLabel::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for StageLabel {
    fn from(value: &str) -> Self {
        match value {
            "INBED" => StageLabel::InBed,
            "CORE" => StageLabel::Core,
            "REM" => StageLabel::Rem,
            "DEEP" => StageLabel::Deep,
            "AWAKE" => StageLabel::Awake,
            "ASLEEP" => StageLabel::Asleep,
            other => StageLabel::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed time interval with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IntervalBounds")]
pub struct SleepInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct IntervalBounds {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<IntervalBounds> for SleepInterval {
    type Error = ComputeError;

    fn try_from(bounds: IntervalBounds) -> Result<Self, Self::Error> {
        SleepInterval::new(bounds.start, bounds.end)
    }
}

impl SleepInterval {
    /// Create an interval, rejecting `end < start`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ComputeError> {
        if end < start {
            return Err(ComputeError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Half-open membership test, `[start, end)`
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Same start, end pushed out to `end` when later
    pub(crate) fn extended_to(&self, end: DateTime<Utc>) -> Self {
        Self {
            start: self.start,
            end: self.end.max(end),
        }
    }
}

/// Merged sleep intervals keyed by stage
///
/// Every stage sequence is sorted by start and contains no overlapping or
/// touching intervals. Built through [`crate::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProcessedSleepData {
    stages: BTreeMap<StageLabel, Vec<SleepInterval>>,
}

impl ProcessedSleepData {
    pub(crate) fn from_merged(stages: BTreeMap<StageLabel, Vec<SleepInterval>>) -> Self {
        Self { stages }
    }

    /// Intervals for a stage; an absent stage yields an empty slice
    pub fn stage(&self, label: &StageLabel) -> &[SleepInterval] {
        self.stages.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.stages.values().all(Vec::is_empty)
    }

    pub fn interval_count(&self) -> usize {
        self.stages.values().map(Vec::len).sum()
    }
}

/// Identifies one sleep day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateObject {
    day: Weekday,
    date: NaiveDate,
}

impl DateObject {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            day: date.weekday(),
            date,
        }
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::new)
    }

    /// Parse a `YYYY-MM-DD` date
    pub fn parse(raw: &str) -> Result<Self, ComputeError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Self::new)
            .map_err(|e| ComputeError::DateParseError(format!("{raw:?}: {e}")))
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Sleep day `days` calendar days earlier
    pub fn days_before(&self, days: u32) -> Self {
        Self::new(self.date - TimeDelta::days(i64::from(days)))
    }

    pub fn days_after(&self, days: u32) -> Self {
        Self::new(self.date + TimeDelta::days(i64::from(days)))
    }
}

// The weekday is derived from the date, so ordering by date alone is total.
impl Ord for DateObject {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.date.cmp(&other.date)
    }
}

impl PartialOrd for DateObject {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<NaiveDate> for DateObject {
    fn from(date: NaiveDate) -> Self {
        Self::new(date)
    }
}

impl fmt::Display for DateObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.date.format("%Y-%m-%d"))
    }
}

/// Raw sleep stage sample as delivered by the health store bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSleepSample {
    /// Stage label
    pub value: StageLabel,
    /// ISO-8601 start timestamp
    pub start_date: String,
    /// ISO-8601 end timestamp
    pub end_date: String,
}

impl RawSleepSample {
    pub fn new(
        value: StageLabel,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            value,
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    /// Parse both timestamps and validate the interval
    pub fn interval(&self) -> Result<SleepInterval, ComputeError> {
        let start = parse_timestamp(&self.start_date)?;
        let end = parse_timestamp(&self.end_date)?;
        SleepInterval::new(start, end)
    }
}

/// Parse an ISO-8601 timestamp with an offset (`Z`, `+hh:mm` or `+hhmm`)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ComputeError> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ComputeError::DateParseError(format!("{raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_interval_rejects_end_before_start() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap();

        let err = SleepInterval::new(start, end).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidInterval { .. }));
    }

    #[test]
    fn test_interval_deserialize_enforces_order() {
        let ok: SleepInterval = serde_json::from_str(
            r#"{"start": "2024-01-01T22:00:00Z", "end": "2024-01-02T06:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ok.duration(), TimeDelta::hours(8));

        let bad = serde_json::from_str::<SleepInterval>(
            r#"{"start": "2024-01-02T06:00:00Z", "end": "2024-01-01T22:00:00Z"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_stage_label_serde() {
        let labels: Vec<StageLabel> =
            serde_json::from_str(r#"["INBED", "CORE", "REM", "DEEP", "AWAKE", "NAP"]"#).unwrap();
        assert_eq!(
            labels,
            vec![
                StageLabel::InBed,
                StageLabel::Core,
                StageLabel::Rem,
                StageLabel::Deep,
                StageLabel::Awake,
                StageLabel::Other("NAP".to_string()),
            ]
        );
        assert_eq!(StageLabel::from("INBED"), StageLabel::InBed);
        assert_eq!(StageLabel::InBed.to_string(), "INBED");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T03:30:00Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-01-01T22:30:00.000-05:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_timestamp("2024-01-01T22:30:00.000-0500").unwrap(),
            expected
        );
        assert!(matches!(
            parse_timestamp("yesterday evening"),
            Err(ComputeError::DateParseError(_))
        ));
    }

    #[test]
    fn test_date_object_weekday() {
        let day = DateObject::from_ymd(2024, 6, 12).unwrap();
        assert_eq!(day.day(), Weekday::Wed);
        assert_eq!(day.days_before(2).day(), Weekday::Mon);
        assert_eq!(DateObject::parse("2024-06-12").unwrap(), day);
        assert!(DateObject::parse("12/06/2024").is_err());
    }

    #[test]
    fn test_date_objects_order_by_date() {
        let sunday = DateObject::from_ymd(2024, 6, 9).unwrap();
        let monday = DateObject::from_ymd(2024, 6, 10).unwrap();
        assert!(sunday < monday);
        assert_eq!(sunday.days_after(1), monday);
    }
}
