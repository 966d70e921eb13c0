//! Duration formatting
//!
//! Durations are rendered as two zero-padded fields, `HH:MM`. Hours are not
//! wrapped at 24, so multi-day totals stay readable.

use chrono::TimeDelta;

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Render a duration in seconds as `HH:MM`.
///
/// Negative and non-finite input is outside the contract and renders as
/// `00:00`.
pub fn format_duration(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let hours = (seconds / SECONDS_PER_HOUR).floor() as u64;
    let minutes = ((seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE).floor() as u64;
    format!("{hours:02}:{minutes:02}")
}

pub trait FormatHM {
    fn format_hm(&self) -> String;
}

impl FormatHM for f64 {
    fn format_hm(&self) -> String {
        format_duration(*self)
    }
}

impl FormatHM for TimeDelta {
    fn format_hm(&self) -> String {
        format_duration(self.num_milliseconds() as f64 / 1000.0)
    }
}
