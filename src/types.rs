//! Core types for the sleep-summary engine
//!
//! This module defines the data that flows through each stage: typed sleep
//! samples, the half-open windows they are selected by, and the per-day
//! summaries the aggregation engine produces.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SummaryError;

/// Sleep stage classification, mirroring the health store's sleep analysis values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    InBed,
    AsleepUnspecified,
    Awake,
    Core,
    Deep,
    Rem,
}

impl SleepStage {
    /// All stages, in health store code order
    pub const ALL: [SleepStage; 6] = [
        SleepStage::InBed,
        SleepStage::AsleepUnspecified,
        SleepStage::Awake,
        SleepStage::Core,
        SleepStage::Deep,
        SleepStage::Rem,
    ];

    /// Decode a raw health store category code.
    ///
    /// Codes follow `HKCategoryValueSleepAnalysis`: 0 in bed, 1 asleep
    /// (unspecified), 2 awake, 3 core, 4 deep, 5 REM.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SleepStage::InBed),
            1 => Some(SleepStage::AsleepUnspecified),
            2 => Some(SleepStage::Awake),
            3 => Some(SleepStage::Core),
            4 => Some(SleepStage::Deep),
            5 => Some(SleepStage::Rem),
            _ => None,
        }
    }

    /// Raw health store category code for this stage
    pub fn code(&self) -> i64 {
        match self {
            SleepStage::InBed => 0,
            SleepStage::AsleepUnspecified => 1,
            SleepStage::Awake => 2,
            SleepStage::Core => 3,
            SleepStage::Deep => 4,
            SleepStage::Rem => 5,
        }
    }

    /// Decode a stage name, accepting the common aliases used by exports
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "in_bed" | "inbed" => Some(SleepStage::InBed),
            "asleep_unspecified" | "asleep" => Some(SleepStage::AsleepUnspecified),
            "awake" => Some(SleepStage::Awake),
            "core" | "asleep_core" | "light" => Some(SleepStage::Core),
            "deep" | "asleep_deep" => Some(SleepStage::Deep),
            "rem" | "asleep_rem" => Some(SleepStage::Rem),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepStage::InBed => "in_bed",
            SleepStage::AsleepUnspecified => "asleep_unspecified",
            SleepStage::Awake => "awake",
            SleepStage::Core => "core",
            SleepStage::Deep => "deep",
            SleepStage::Rem => "rem",
        }
    }
}

/// One categorical sleep interval as supplied by the sample source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepSample {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub stage: SleepStage,
}

impl SleepSample {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, stage: SleepStage) -> Self {
        Self { start, end, stage }
    }

    /// Interval length, clamped at zero when `end` precedes `start`
    pub fn duration(&self) -> TimeDelta {
        (self.end - self.start).max(TimeDelta::zero())
    }

    /// Whether the interval is inverted (`end < start`)
    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }
}

/// Stable accumulator names of a daily summary.
///
/// Display strings depend on the policy and live in [`crate::policies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Awake,
    Rem,
    Core,
    Deep,
    Asleep,
    InBed,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Awake => "awake",
            Bucket::Rem => "rem",
            Bucket::Core => "core",
            Bucket::Deep => "deep",
            Bucket::Asleep => "asleep",
            Bucket::InBed => "in_bed",
        }
    }
}

/// Which routing strategy produced a summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Every stage accumulates into its own bucket
    #[default]
    #[serde(alias = "direct")]
    DirectMapping,
    /// In-bed/asleep/awake are measured, deep and REM are estimated from asleep time
    #[serde(alias = "derived")]
    DerivedRatio,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::DirectMapping => "direct_mapping",
            PolicyKind::DerivedRatio => "derived_ratio",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "direct_mapping" | "direct-mapping" | "a" => Ok(PolicyKind::DirectMapping),
            "derived" | "derived_ratio" | "derived-ratio" | "b" => Ok(PolicyKind::DerivedRatio),
            other => Err(SummaryError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Bookkeeping for one fold over a window's samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleStats {
    /// Samples routed into a bucket
    pub folded: usize,
    /// Samples with `end < start`, contributing zero
    pub negative_duration: usize,
    /// Samples whose stage the policy does not route anywhere
    pub unmapped_stage: usize,
}

/// Accumulated durations (seconds) for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub(crate) policy: PolicyKind,
    pub(crate) buckets: BTreeMap<Bucket, f64>,
    pub(crate) stats: SampleStats,
}

impl DailySummary {
    pub fn policy(&self) -> PolicyKind {
        self.policy
    }

    /// Accumulated seconds for a bucket; zero when the policy does not track it
    pub fn seconds(&self, bucket: Bucket) -> f64 {
        self.buckets.get(&bucket).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, bucket: Bucket) -> bool {
        self.buckets.contains_key(&bucket)
    }

    /// Buckets and their seconds, in bucket order
    pub fn iter(&self) -> impl Iterator<Item = (Bucket, f64)> + '_ {
        self.buckets.iter().map(|(bucket, seconds)| (*bucket, *seconds))
    }

    pub fn stats(&self) -> SampleStats {
        self.stats
    }
}

/// Half-open `[start, end)` interval selecting one day's samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationWindow {
    /// Calendar date identifying the window
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AggregationWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Strict-start selection: a sample belongs to the window its start falls in
    pub fn selects(&self, sample: &SleepSample) -> bool {
        self.contains(sample.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_stage_codes_round_trip() {
        for stage in SleepStage::ALL {
            assert_eq!(SleepStage::from_code(stage.code()), Some(stage));
            assert_eq!(SleepStage::from_name(stage.as_str()), Some(stage));
        }
        assert_eq!(SleepStage::from_code(6), None);
        assert_eq!(SleepStage::from_code(-1), None);
    }

    #[test]
    fn test_stage_name_aliases() {
        assert_eq!(SleepStage::from_name("Asleep"), Some(SleepStage::AsleepUnspecified));
        assert_eq!(SleepStage::from_name("light"), Some(SleepStage::Core));
        assert_eq!(SleepStage::from_name(" asleep_rem "), Some(SleepStage::Rem));
        assert_eq!(SleepStage::from_name("napping"), None);
    }

    #[test]
    fn test_inverted_sample_has_zero_duration() {
        let sample = SleepSample::new(at(9, 0), at(8, 0), SleepStage::Awake);
        assert!(sample.is_inverted());
        assert_eq!(sample.duration(), TimeDelta::zero());

        let sample = SleepSample::new(at(8, 0), at(8, 30), SleepStage::Awake);
        assert_eq!(sample.duration(), TimeDelta::minutes(30));
    }

    #[test]
    fn test_window_is_half_open() {
        let window = AggregationWindow {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            start: at(0, 0),
            end: at(0, 0) + TimeDelta::days(1),
        };

        assert!(window.contains(at(0, 0)));
        assert!(window.contains(at(23, 59)));
        assert!(!window.contains(window.end));
        assert!(!window.contains(at(0, 0) - TimeDelta::seconds(1)));
    }

    #[test]
    fn test_policy_kind_parsing() {
        assert_eq!("direct".parse::<PolicyKind>().unwrap(), PolicyKind::DirectMapping);
        assert_eq!("Derived-Ratio".parse::<PolicyKind>().unwrap(), PolicyKind::DerivedRatio);
        assert!(matches!(
            "weighted".parse::<PolicyKind>(),
            Err(SummaryError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_policy_kind_serde_aliases() {
        let kind: PolicyKind = serde_json::from_str("\"derived\"").unwrap();
        assert_eq!(kind, PolicyKind::DerivedRatio);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"derived_ratio\"");
    }
}
