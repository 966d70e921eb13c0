//! Error types for sleep-summary

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while collecting or summarizing sleep data
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Failed to parse sample records: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown sleep stage: {0}")]
    UnknownStage(String),

    #[error("Unknown aggregation policy: {0}")]
    UnknownPolicy(String),

    #[error("Read authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Health data is not available on this device")]
    HealthDataUnavailable,

    #[error("Sample query failed for {date}: {message}")]
    QueryFailed { date: NaiveDate, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid timezone offset: {0}")]
    InvalidTimezone(String),

    #[error("Invalid aggregation window: {0}")]
    InvalidWindow(String),
}
