//! sleep.sample_record.v1 definition
//!
//! A record carries the interval and the raw stage value exactly as the health
//! store reported it. The stage may be the store's integer category code or a
//! snake_case name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{SleepSample, SleepStage};

/// Current record schema version
pub const SCHEMA_VERSION: &str = "sleep.sample_record.v1";

/// Raw stage value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageValue {
    /// Health store category code
    Code(i64),
    /// Stage name, e.g. `"deep"` or `"asleep_rem"`
    Name(String),
}

impl StageValue {
    pub fn decode(&self) -> Option<SleepStage> {
        match self {
            StageValue::Code(code) => SleepStage::from_code(*code),
            StageValue::Name(name) => SleepStage::from_name(name),
        }
    }
}

impl fmt::Display for StageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageValue::Code(code) => write!(f, "{code}"),
            StageValue::Name(name) => write!(f, "{name:?}"),
        }
    }
}

impl From<SleepStage> for StageValue {
    fn from(stage: SleepStage) -> Self {
        StageValue::Code(stage.code())
    }
}

/// One serialized sleep sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Store-assigned sample identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Raw stage value
    pub value: StageValue,
    /// Recording app or device, as reported by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl SampleRecord {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, value: impl Into<StageValue>) -> Self {
        Self {
            sample_id: None,
            start,
            end,
            value: value.into(),
            source_name: None,
        }
    }

    /// Decode into a typed sample.
    ///
    /// Only an unknown stage rejects a record; inverted intervals decode and
    /// contribute zero during aggregation.
    pub fn to_sample(&self) -> Result<SleepSample, ValidationError> {
        let stage = self
            .value
            .decode()
            .ok_or_else(|| ValidationError::UnknownStage(self.value.to_string()))?;
        Ok(SleepSample::new(self.start, self.end, stage))
    }

    /// Strict validation: unknown stages and inverted intervals are both errors
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.to_sample()?;
        if self.end < self.start {
            return Err(ValidationError::EndBeforeStart {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

impl From<&SleepSample> for SampleRecord {
    fn from(sample: &SleepSample) -> Self {
        SampleRecord::new(sample.start, sample.end, sample.stage)
    }
}

/// Validation errors for sample records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown stage value: {0}")]
    UnknownStage(String),

    #[error("End {end} is before start {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}
