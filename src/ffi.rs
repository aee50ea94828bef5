//! FFI bindings for sleepscore
//!
//! This module provides C-compatible functions for calling sleepscore from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `sleepscore_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde::Serialize;

use crate::adapters::HealthExportAdapter;
use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::pipeline::{samples_to_daily_reports, SleepProcessor};
use crate::types::DateObject;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Required string argument; records an error naming `what` when missing
unsafe fn required_arg(ptr: *const c_char, what: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {what} string pointer"));
    }
    value
}

/// Caller must free the result with `sleepscore_free_string`
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Join already-serialized JSON documents into one array
fn vec_to_json_array(vec: Vec<String>) -> String {
    format!("[{}]", vec.join(","))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ComputeError> {
    serde_json::to_string(value).map_err(ComputeError::JsonError)
}

fn result_to_cstr(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Convert a health store export into a JSON array of daily reports.
///
/// `dates_json` is a JSON array of `YYYY-MM-DD` strings, or NULL to report
/// every sleep day present in the export.
///
/// # Safety
/// - `json` and `timezone` must be valid null-terminated C strings.
/// - `dates_json` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `sleepscore_free_string`.
/// - Returns NULL on error; call `sleepscore_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_samples_to_daily_reports(
    json: *const c_char,
    dates_json: *const c_char,
    timezone: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = required_arg(json, "JSON") else {
        return ptr::null_mut();
    };
    let Some(tz_str) = required_arg(timezone, "timezone") else {
        return ptr::null_mut();
    };
    let dates = match cstr_to_string(dates_json) {
        None => Vec::new(),
        Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(dates) => dates,
            Err(e) => {
                set_last_error(&format!("Invalid dates array: {e}"));
                return ptr::null_mut();
            }
        },
    };

    result_to_cstr(samples_to_daily_reports(json_str, dates, tz_str).map(vec_to_json_array))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a SleepProcessor
pub struct SleepProcessorHandle {
    processor: SleepProcessor,
}

/// Create a new SleepProcessor.
///
/// `config_json` is an `EngineConfig` JSON object, or NULL for defaults.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer to a newly allocated processor that must be freed with
///   `sleepscore_processor_free`.
/// - Returns NULL on error; call `sleepscore_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_processor_new(
    config_json: *const c_char,
) -> *mut SleepProcessorHandle {
    clear_last_error();

    let config = match cstr_to_string(config_json) {
        None => Ok(EngineConfig::default()),
        Some(raw) => EngineConfig::from_json(&raw),
    };

    match config.and_then(SleepProcessor::with_config) {
        Ok(processor) => Box::into_raw(Box::new(SleepProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a SleepProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `sleepscore_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_processor_free(processor: *mut SleepProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Replace the processor's samples with those of a health store export.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `sleepscore_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `sleepscore_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_processor_load(
    processor: *mut SleepProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }
    let handle = &mut *processor;

    let Some(json_str) = required_arg(json, "JSON") else {
        return -1;
    };

    let loaded = HealthExportAdapter::from_json(&json_str)
        .and_then(|source| handle.processor.load_from_source(&source));
    match loaded {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Run `f` against the processor for the sleep day named by `date`
unsafe fn with_day<F>(
    processor: *mut SleepProcessorHandle,
    date: *const c_char,
    f: F,
) -> *mut c_char
where
    F: FnOnce(&SleepProcessor, &DateObject) -> Result<String, ComputeError>,
{
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some(date_str) = required_arg(date, "date") else {
        return ptr::null_mut();
    };

    result_to_cstr(DateObject::parse(&date_str).and_then(|day| f(&handle.processor, &day)))
}

/// Score breakdown for one sleep day as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `sleepscore_processor_new`.
/// - `date` must be a valid null-terminated `YYYY-MM-DD` C string.
/// - Returns a newly allocated string that must be freed with `sleepscore_free_string`.
/// - Returns NULL on error; call `sleepscore_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_processor_score_day(
    processor: *mut SleepProcessorHandle,
    date: *const c_char,
) -> *mut c_char {
    with_day(processor, date, |p, day| to_json(&p.breakdown_day(day)?))
}

/// Daily report for one sleep day as JSON.
///
/// # Safety
/// Same contract as `sleepscore_processor_score_day`.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_processor_report_day(
    processor: *mut SleepProcessorHandle,
    date: *const c_char,
) -> *mut c_char {
    with_day(processor, date, |p, day| p.report_day(day))
}

/// Scores for Monday through Sunday of the week containing `date`, as a JSON array.
///
/// # Safety
/// Same contract as `sleepscore_processor_score_day`.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_processor_week_scores(
    processor: *mut SleepProcessorHandle,
    date: *const c_char,
) -> *mut c_char {
    with_day(processor, date, |p, day| to_json(&p.week_scores(day.date())?))
}

/// Hypnogram levels and hour labels for one sleep day as JSON.
///
/// # Safety
/// Same contract as `sleepscore_processor_score_day`.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_processor_hypnogram(
    processor: *mut SleepProcessorHandle,
    date: *const c_char,
) -> *mut c_char {
    with_day(processor, date, |p, day| to_json(&p.hypnogram_day(day)?))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by sleepscore functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a sleepscore function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next sleepscore call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the sleepscore library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn sleepscore_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_export_json() -> CString {
        CString::new(
            r#"{
            "sleep": [
                {"value": "INBED", "startDate": "2024-01-15T22:00:00Z", "endDate": "2024-01-16T06:00:00Z"},
                {"value": "CORE", "startDate": "2024-01-15T22:15:00Z", "endDate": "2024-01-16T02:15:00Z"},
                {"value": "DEEP", "startDate": "2024-01-16T02:15:00Z", "endDate": "2024-01-16T03:15:00Z"},
                {"value": "REM", "startDate": "2024-01-16T03:15:00Z", "endDate": "2024-01-16T05:00:00Z"}
            ],
            "heartRate": [
                {"value": 57, "startDate": "2024-01-16T01:00:00Z", "endDate": "2024-01-16T01:00:00Z"}
            ]
        }"#,
        )
        .unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let value = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        sleepscore_free_string(ptr);
        value
    }

    #[test]
    fn test_ffi_samples_to_daily_reports() {
        let json = sample_export_json();
        let tz = CString::new("UTC").unwrap();
        let dates = CString::new(r#"["2024-01-15", "2024-01-16"]"#).unwrap();

        unsafe {
            let result = sleepscore_samples_to_daily_reports(
                json.as_ptr(),
                dates.as_ptr(),
                tz.as_ptr(),
            );
            let reports: serde_json::Value = serde_json::from_str(&take_string(result)).unwrap();

            assert_eq!(reports.as_array().unwrap().len(), 2);
            assert_eq!(reports[0]["date"], "2024-01-15");
            assert_eq!(reports[1]["score"]["total"], 0.0);
        }
    }

    #[test]
    fn test_ffi_null_dates_reports_every_day() {
        let json = sample_export_json();
        let tz = CString::new("UTC").unwrap();

        unsafe {
            let result = sleepscore_samples_to_daily_reports(json.as_ptr(), ptr::null(), tz.as_ptr());
            let reports: serde_json::Value = serde_json::from_str(&take_string(result)).unwrap();
            assert_eq!(reports.as_array().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let processor = sleepscore_processor_new(ptr::null());
            assert!(!processor.is_null());

            let json = sample_export_json();
            assert_eq!(sleepscore_processor_load(processor, json.as_ptr()), 0);

            let date = CString::new("2024-01-15").unwrap();

            let score = take_string(sleepscore_processor_score_day(processor, date.as_ptr()));
            let score: serde_json::Value = serde_json::from_str(&score).unwrap();
            assert!(score["total"].as_f64().unwrap() > 0.0);

            let report = take_string(sleepscore_processor_report_day(processor, date.as_ptr()));
            assert!(report.contains("\"heart_rate\""));

            let week = take_string(sleepscore_processor_week_scores(processor, date.as_ptr()));
            let week: serde_json::Value = serde_json::from_str(&week).unwrap();
            assert_eq!(week.as_array().unwrap().len(), 7);

            let hypnogram = take_string(sleepscore_processor_hypnogram(processor, date.as_ptr()));
            let hypnogram: serde_json::Value = serde_json::from_str(&hypnogram).unwrap();
            assert!(!hypnogram["levels"].as_array().unwrap().is_empty());

            sleepscore_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_processor_with_config() {
        let config = CString::new(r#"{"timezone": "America/New_York"}"#).unwrap();
        let bad_config = CString::new(r#"{"timezone": "Atlantis/Capital"}"#).unwrap();

        unsafe {
            let processor = sleepscore_processor_new(config.as_ptr());
            assert!(!processor.is_null());
            sleepscore_processor_free(processor);

            let processor = sleepscore_processor_new(bad_config.as_ptr());
            assert!(processor.is_null());
            assert!(!sleepscore_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let tz = CString::new("UTC").unwrap();

            let result =
                sleepscore_samples_to_daily_reports(invalid_json.as_ptr(), ptr::null(), tz.as_ptr());
            assert!(result.is_null());

            let error = sleepscore_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let processor = sleepscore_processor_new(ptr::null());
            let bad_date = CString::new("15/01/2024").unwrap();
            assert!(sleepscore_processor_score_day(processor, bad_date.as_ptr()).is_null());
            assert!(sleepscore_processor_score_day(ptr::null_mut(), bad_date.as_ptr()).is_null());
            sleepscore_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = sleepscore_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
