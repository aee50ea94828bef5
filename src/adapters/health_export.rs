//! Health store export adapter
//!
//! Accepts three layouts of the same camelCase sample records:
//!
//! - an export object `{"sleep": [...], "heartRate": [...]}`
//! - a JSON array of samples
//! - newline-delimited JSON, one sample per line
//!
//! In arrays and NDJSON a record with a string `value` is a sleep-stage sample
//! and one with a numeric `value` is a heart-rate sample.

use crate::error::ComputeError;
use crate::heart_rate::RawHeartRateSample;
use crate::types::RawSleepSample;
use serde::Deserialize;
use serde_json::Value;

use super::SampleSource;

#[derive(Debug, Default, Deserialize)]
struct ExportObject {
    #[serde(default)]
    sleep: Vec<RawSleepSample>,
    #[serde(default, rename = "heartRate")]
    heart_rate: Vec<RawHeartRateSample>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportRecord {
    Sleep(RawSleepSample),
    HeartRate(RawHeartRateSample),
}

/// Samples parsed from a health store export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthExportAdapter {
    sleep: Vec<RawSleepSample>,
    heart_rate: Vec<RawHeartRateSample>,
}

impl HealthExportAdapter {
    /// Parse an export in any supported layout
    pub fn from_json(raw: &str) -> Result<Self, ComputeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::from_value(value),
            Err(_) if trimmed.lines().filter(|l| !l.trim().is_empty()).count() > 1 => {
                Self::from_ndjson(trimmed)
            }
            Err(e) => Err(ComputeError::JsonError(e)),
        }
    }

    fn from_value(value: Value) -> Result<Self, ComputeError> {
        let is_export = matches!(
            &value,
            Value::Object(map) if map.contains_key("sleep") || map.contains_key("heartRate")
        );
        if is_export {
            let export: ExportObject = serde_json::from_value(value)?;
            return Ok(Self {
                sleep: export.sleep,
                heart_rate: export.heart_rate,
            });
        }

        match value {
            Value::Array(items) => {
                let mut adapter = Self::default();
                for (index, item) in items.into_iter().enumerate() {
                    let record = serde_json::from_value(item).map_err(|e| {
                        ComputeError::ParseError(format!("record {index}: {e}"))
                    })?;
                    adapter.push(record);
                }
                Ok(adapter)
            }
            Value::Object(_) => {
                let mut adapter = Self::default();
                adapter.push(serde_json::from_value(value)?);
                Ok(adapter)
            }
            other => Err(ComputeError::ParseError(format!(
                "expected an export object, array or NDJSON, got {}",
                kind(&other)
            ))),
        }
    }

    fn from_ndjson(raw: &str) -> Result<Self, ComputeError> {
        let mut adapter = Self::default();
        for (number, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|e| {
                ComputeError::ParseError(format!("line {}: {e}", number + 1))
            })?;
            adapter.push(record);
        }
        log::debug!(
            "parsed NDJSON export: {} sleep, {} heart-rate samples",
            adapter.sleep.len(),
            adapter.heart_rate.len()
        );
        Ok(adapter)
    }

    fn push(&mut self, record: ExportRecord) {
        match record {
            ExportRecord::Sleep(sample) => self.sleep.push(sample),
            ExportRecord::HeartRate(sample) => self.heart_rate.push(sample),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl SampleSource for HealthExportAdapter {
    fn sleep_samples(&self) -> Result<Vec<RawSleepSample>, ComputeError> {
        Ok(self.sleep.clone())
    }

    fn heart_rate_samples(&self) -> Result<Vec<RawHeartRateSample>, ComputeError> {
        Ok(self.heart_rate.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StageLabel;
    use pretty_assertions::assert_eq;

    fn core_sample() -> RawSleepSample {
        RawSleepSample::new(StageLabel::Core, "2024-01-01T22:00:00Z", "2024-01-01T23:00:00Z")
    }

    #[test]
    fn test_export_object() {
        let json = r#"{
            "sleep": [
                {"value": "CORE", "startDate": "2024-01-01T22:00:00Z", "endDate": "2024-01-01T23:00:00Z"}
            ],
            "heartRate": [
                {"value": 58, "startDate": "2024-01-01T22:30:00Z", "endDate": "2024-01-01T22:30:00Z"}
            ]
        }"#;
        let adapter = HealthExportAdapter::from_json(json).unwrap();

        assert_eq!(adapter.sleep_samples().unwrap(), vec![core_sample()]);
        assert_eq!(adapter.heart_rate_samples().unwrap().len(), 1);
        assert_eq!(adapter.heart_rate_samples().unwrap()[0].value, 58.0);
    }

    #[test]
    fn test_export_object_without_heart_rate() {
        let json = r#"{"sleep": []}"#;
        let adapter = HealthExportAdapter::from_json(json).unwrap();
        assert!(adapter.sleep_samples().unwrap().is_empty());
        assert!(adapter.heart_rate_samples().unwrap().is_empty());
    }

    #[test]
    fn test_mixed_array() {
        let json = r#"[
            {"value": "CORE", "startDate": "2024-01-01T22:00:00Z", "endDate": "2024-01-01T23:00:00Z"},
            {"value": 61.5, "startDate": "2024-01-01T22:10:00Z", "endDate": "2024-01-01T22:10:00Z"},
            {"value": "NAP", "startDate": "2024-01-02T13:00:00Z", "endDate": "2024-01-02T13:20:00Z"}
        ]"#;
        let adapter = HealthExportAdapter::from_json(json).unwrap();
        let sleep = adapter.sleep_samples().unwrap();

        assert_eq!(sleep.len(), 2);
        assert_eq!(sleep[1].value, StageLabel::Other("NAP".to_string()));
        assert_eq!(adapter.heart_rate_samples().unwrap().len(), 1);
    }

    #[test]
    fn test_ndjson() {
        let raw = concat!(
            r#"{"value": "CORE", "startDate": "2024-01-01T22:00:00Z", "endDate": "2024-01-01T23:00:00Z"}"#,
            "\n\n",
            r#"{"value": 60, "startDate": "2024-01-01T22:10:00Z", "endDate": "2024-01-01T22:10:00Z"}"#,
            "\n"
        );
        let adapter = HealthExportAdapter::from_json(raw).unwrap();
        assert_eq!(adapter.sleep_samples().unwrap(), vec![core_sample()]);
        assert_eq!(adapter.heart_rate_samples().unwrap().len(), 1);
    }

    #[test]
    fn test_ndjson_error_names_line() {
        let raw = concat!(
            r#"{"value": "CORE", "startDate": "2024-01-01T22:00:00Z", "endDate": "2024-01-01T23:00:00Z"}"#,
            "\n",
            r#"{"value": "CORE", "startDate": "#,
            "\n"
        );
        match HealthExportAdapter::from_json(raw) {
            Err(ComputeError::ParseError(message)) => assert!(message.starts_with("line 2")),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_has_no_samples() {
        let adapter = HealthExportAdapter::from_json("  \n").unwrap();
        assert_eq!(adapter, HealthExportAdapter::default());
    }

    #[test]
    fn test_rejects_scalar() {
        assert!(matches!(
            HealthExportAdapter::from_json("42"),
            Err(ComputeError::ParseError(_))
        ));
    }
}
