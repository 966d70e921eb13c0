//! FFI bindings for sleep-summary
//!
//! This module provides C-compatible functions for calling the engine from a
//! host app. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `sleep_summary_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregator::Aggregator;
use crate::config::SummaryConfig;
use crate::display::DisplayEncoder;
use crate::error::SummaryError;
use crate::format::format_duration;
use crate::history::SleepHistory;
use crate::pipeline::SleepSummaryProcessor;
use crate::schema::SampleRecordAdapter;
use crate::types::{DailySummary, PolicyKind};

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

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Report a result through the C boundary: the string on success, NULL and
/// `last_error` on failure
fn finish(result: Result<String, SummaryError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// `now` from a nullable RFC 3339 string; NULL means the current time
unsafe fn parse_now(now: *const c_char) -> Result<DateTime<Utc>, SummaryError> {
    if now.is_null() {
        return Ok(Utc::now());
    }
    let raw = cstr_to_string(now)
        .ok_or_else(|| SummaryError::ParseError("Invalid now string pointer".to_string()))?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SummaryError::ParseError(format!("Invalid timestamp {raw:?}: {e}")))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Output of `sleep_summary_aggregate`
#[derive(Serialize)]
struct AggregateOutput {
    summary: DailySummary,
    /// Records set aside because their stage could not be decoded
    rejected_records: usize,
}

/// Aggregate one window's samples and return
/// `{"summary": ..., "rejected_records": N}` as JSON.
///
/// `samples_json` is a JSON array or NDJSON of sample records already
/// restricted to one window. `policy` is `"direct"` or `"derived"`. Records
/// with an unknown stage are left out of the summary and counted in
/// `rejected_records`.
///
/// # Safety
/// - `samples_json` and `policy` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `sleep_summary_free_string`.
/// - Returns NULL on error; call `sleep_summary_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_aggregate(
    samples_json: *const c_char,
    policy: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid samples string pointer");
            return ptr::null_mut();
        }
    };

    let policy_str = match cstr_to_string(policy) {
        Some(s) => s,
        None => {
            set_last_error("Invalid policy string pointer");
            return ptr::null_mut();
        }
    };

    finish((|| -> Result<String, SummaryError> {
        let kind: PolicyKind = policy_str.parse()?;
        let records = SampleRecordAdapter::parse(&json_str)?;
        let batch = SampleRecordAdapter::decode(&records);
        let output = AggregateOutput {
            summary: Aggregator::aggregate(kind.policy(), &batch.samples),
            rejected_records: batch.rejected.len(),
        };
        Ok(serde_json::to_string(&output)?)
    })())
}

/// Summarize an export over the configured lookback windows and return
/// display rows as JSON.
///
/// # Safety
/// - `records_json` and `config_json` must be valid null-terminated C strings.
///   `config_json` may be an empty object (`{}`) for defaults.
/// - `now` may be NULL (current time) or an RFC 3339 C string.
/// - Returns a newly allocated string that must be freed with `sleep_summary_free_string`.
/// - Returns NULL on error; call `sleep_summary_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_rows(
    records_json: *const c_char,
    config_json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(records_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid records string pointer");
            return ptr::null_mut();
        }
    };

    let config_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        }
    };

    finish((|| -> Result<String, SummaryError> {
        let now = parse_now(now)?;
        let config = SummaryConfig::from_json(&config_str)?;
        let report = SleepSummaryProcessor::with_config(config)?.summarize_json(&json_str, now)?;
        DisplayEncoder::encode_to_json(&DisplayEncoder::report_rows(&report))
    })())
}

/// Format a duration in seconds as `HH:MM`.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `sleep_summary_free_string`.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_format_duration(seconds: f64) -> *mut c_char {
    clear_last_error();
    string_to_cstr(&format_duration(seconds))
}

// ============================================================================
// Stateful History API
// ============================================================================

/// Opaque handle to a processor plus the history it feeds
pub struct SleepHistoryHandle {
    processor: SleepSummaryProcessor,
    history: SleepHistory,
}

/// Create a history handle.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `sleep_summary_history_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_history_new(
    config_json: *const c_char,
) -> *mut SleepHistoryHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        Ok(SummaryConfig::default())
    } else {
        match cstr_to_string(config_json) {
            Some(s) => SummaryConfig::from_json(&s),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match config.and_then(SleepSummaryProcessor::with_config) {
        Ok(processor) => Box::into_raw(Box::new(SleepHistoryHandle {
            processor,
            history: SleepHistory::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a history handle.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `sleep_summary_history_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_history_free(handle: *mut SleepHistoryHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Summarize an export and merge it into the handle's history.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `sleep_summary_history_new`.
/// - `records_json` must be a valid null-terminated C string.
/// - `now` may be NULL (current time) or an RFC 3339 C string.
/// - Returns the number of dates merged, or -1 on error.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_history_merge(
    handle: *mut SleepHistoryHandle,
    records_json: *const c_char,
    now: *const c_char,
) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null history pointer");
        return -1;
    }

    let handle = &mut *handle;

    let json_str = match cstr_to_string(records_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid records string pointer");
            return -1;
        }
    };

    let report = parse_now(now).and_then(|now| handle.processor.summarize_json(&json_str, now));

    match report {
        Ok(report) => handle.history.merge(&report) as i32,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Display rows for the most recent dates in the history, as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `sleep_summary_history_new`.
/// - Returns a newly allocated string that must be freed with `sleep_summary_free_string`.
/// - Returns NULL on error; call `sleep_summary_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_history_rows(
    handle: *const SleepHistoryHandle,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null history pointer");
        return ptr::null_mut();
    }

    let handle = &*handle;
    let limit = handle.processor.config().lookback_days as usize;

    finish(DisplayEncoder::encode_to_json(&DisplayEncoder::history_rows(
        &handle.history,
        limit,
    )))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by sleep-summary functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a sleep-summary function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next sleep-summary call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn sleep_summary_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
