//! Pipeline orchestration
//!
//! This module provides the public entry points. It authorizes against a
//! sample source, queries every lookback window at once, joins the results and
//! then aggregates each window synchronously. The output is an immutable
//! [`SummaryReport`]; callers merge it into their own state.

use chrono::{DateTime, NaiveDate, Utc};
use futures::executor::block_on;
use futures::future::join_all;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregator::Aggregator;
use crate::config::SummaryConfig;
use crate::error::SummaryError;
use crate::policies::AggregationPolicy;
use crate::schema::{SampleRecord, SampleRecordAdapter};
use crate::source::{MemorySampleSource, SampleSource};
use crate::types::{AggregationWindow, DailySummary, PolicyKind};

/// Result of one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub window: AggregationWindow,
    pub outcome: WindowOutcome,
}

impl WindowResult {
    pub fn date(&self) -> NaiveDate {
        self.window.date
    }

    pub fn summary(&self) -> Option<&DailySummary> {
        match &self.outcome {
            WindowOutcome::Summarized { summary, .. } => Some(summary),
            WindowOutcome::Failed { .. } => None,
        }
    }
}

/// What happened to a window's query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WindowOutcome {
    Summarized {
        summary: DailySummary,
        /// Records set aside because their stage could not be decoded
        rejected_records: usize,
    },
    Failed {
        error: String,
    },
}

/// Immutable output of one collection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub policy: PolicyKind,
    /// Window results, newest date first
    pub windows: Vec<WindowResult>,
}

impl SummaryReport {
    pub fn summaries(&self) -> impl Iterator<Item = (NaiveDate, &DailySummary)> {
        self.windows
            .iter()
            .filter_map(|result| result.summary().map(|summary| (result.date(), summary)))
    }

    pub fn failed_dates(&self) -> Vec<NaiveDate> {
        self.windows
            .iter()
            .filter(|result| matches!(result.outcome, WindowOutcome::Failed { .. }))
            .map(WindowResult::date)
            .collect()
    }

    pub fn rejected_records(&self) -> usize {
        self.windows
            .iter()
            .map(|result| match result.outcome {
                WindowOutcome::Summarized {
                    rejected_records, ..
                } => rejected_records,
                WindowOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn to_json(&self) -> Result<String, SummaryError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Collect per-day summaries from a sample source.
///
/// Stages:
/// 1. Validate configuration
/// 2. Authorize (a refusal is returned as an error)
/// 3. Generate the lookback windows
/// 4. Query every window and join the results
/// 5. Decode and aggregate each window; failures stay with their window
pub async fn collect_summaries<S>(
    source: &S,
    config: &SummaryConfig,
    now: DateTime<Utc>,
) -> Result<SummaryReport, SummaryError>
where
    S: SampleSource + ?Sized,
{
    config.validate()?;

    if let Err(error) = source.authorize().await {
        warn!("sleep sample authorization failed: {error}");
        return Err(error);
    }

    let windows = config.window().windows(now)?;
    let results = join_all(windows.iter().map(|window| source.query(window))).await;

    let policy = config.policy.policy();
    let mut outcomes: Vec<WindowResult> = windows
        .into_iter()
        .zip(results)
        .map(|(window, result)| match result {
            Ok(records) => summarize_window(policy, window, &records),
            Err(error) => {
                warn!("skipping window {}: {error}", window.date);
                WindowResult {
                    window,
                    outcome: WindowOutcome::Failed {
                        error: error.to_string(),
                    },
                }
            }
        })
        .collect();

    outcomes.sort_by(|a, b| b.date().cmp(&a.date()));

    Ok(SummaryReport {
        report_id: Uuid::new_v4(),
        generated_at: now,
        policy: config.policy,
        windows: outcomes,
    })
}

/// Decode one window's records and aggregate them
pub fn summarize_window(
    policy: &dyn AggregationPolicy,
    window: AggregationWindow,
    records: &[SampleRecord],
) -> WindowResult {
    let batch = SampleRecordAdapter::decode(records);
    let summary = Aggregator::aggregate(policy, &batch.samples);

    debug!(
        "window {}: {} records, {} folded, {} rejected",
        window.date,
        records.len(),
        summary.stats().folded,
        batch.rejected.len()
    );

    WindowResult {
        window,
        outcome: WindowOutcome::Summarized {
            summary,
            rejected_records: batch.rejected.len(),
        },
    }
}

/// Blocking front-end over an in-memory record set.
///
/// Use this from synchronous callers (CLI, FFI) that already hold the
/// exported records.
pub struct SleepSummaryProcessor {
    config: SummaryConfig,
}

impl Default for SleepSummaryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SleepSummaryProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self {
            config: SummaryConfig::default(),
        }
    }

    pub fn with_config(config: SummaryConfig) -> Result<Self, SummaryError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Summarize records over the lookback windows ending at `now`
    pub fn summarize_records(
        &self,
        records: Vec<SampleRecord>,
        now: DateTime<Utc>,
    ) -> Result<SummaryReport, SummaryError> {
        let source = MemorySampleSource::new(records);
        block_on(collect_summaries(&source, &self.config, now))
    }

    /// Parse a JSON array or NDJSON export and summarize it
    pub fn summarize_json(
        &self,
        input: &str,
        now: DateTime<Utc>,
    ) -> Result<SummaryReport, SummaryError> {
        let records = SampleRecordAdapter::parse(input)?;
        self.summarize_records(records, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bucket, SleepStage};
    use crate::window::WindowStartRule;
    use chrono::{TimeDelta, TimeZone};
    use futures::future::{self, BoxFuture, FutureExt};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn record(d: u32, h: u32, minutes: i64, stage: SleepStage) -> SampleRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap();
        SampleRecord::new(start, start + TimeDelta::minutes(minutes), stage)
    }

    fn export() -> Vec<SampleRecord> {
        vec![
            record(15, 1, 30, SleepStage::Awake),
            record(15, 2, 360, SleepStage::Core),
            record(15, 8, 30, SleepStage::Deep),
            record(14, 0, 420, SleepStage::AsleepUnspecified),
            record(14, 7, 60, SleepStage::InBed),
            record(12, 3, 90, SleepStage::Rem),
        ]
    }

    /// Source that fails the query for one date
    struct FlakySource {
        inner: MemorySampleSource,
        failing: NaiveDate,
    }

    impl SampleSource for FlakySource {
        fn authorize(&self) -> BoxFuture<'_, Result<(), SummaryError>> {
            self.inner.authorize()
        }

        fn query<'a>(
            &'a self,
            window: &'a AggregationWindow,
        ) -> BoxFuture<'a, Result<Vec<SampleRecord>, SummaryError>> {
            if window.date == self.failing {
                future::ready(Err(SummaryError::QueryFailed {
                    date: window.date,
                    message: "store busy".to_string(),
                }))
                .boxed()
            } else {
                self.inner.query(window)
            }
        }
    }

    #[test]
    fn test_collects_one_result_per_window_newest_first() {
        let report = SleepSummaryProcessor::new()
            .summarize_records(export(), now())
            .unwrap();

        let dates: Vec<NaiveDate> = report.windows.iter().map(WindowResult::date).collect();
        assert_eq!(dates, vec![day(15), day(14), day(13), day(12), day(11)]);
        assert_eq!(report.policy, PolicyKind::DirectMapping);

        let today = report.windows[0].summary().unwrap();
        assert_eq!(today.seconds(Bucket::Awake), 1800.0);
        assert_eq!(today.seconds(Bucket::Core), 21_600.0);
        assert_eq!(today.seconds(Bucket::Deep), 1800.0);

        let yesterday = report.windows[1].summary().unwrap();
        assert_eq!(yesterday.seconds(Bucket::Asleep), 25_200.0);
        assert_eq!(yesterday.stats().unmapped_stage, 1);

        let empty = report.windows[2].summary().unwrap();
        assert!(empty.iter().all(|(_, seconds)| seconds == 0.0));
    }

    #[test]
    fn test_derived_policy_run() {
        let config = SummaryConfig {
            policy: PolicyKind::DerivedRatio,
            lookback_days: 7,
            ..Default::default()
        };
        let report = SleepSummaryProcessor::with_config(config)
            .unwrap()
            .summarize_records(export(), now())
            .unwrap();

        assert_eq!(report.windows.len(), 7);
        let today = report.windows[0].summary().unwrap();
        let asleep = today.seconds(Bucket::Asleep);
        assert_eq!(asleep, (360.0 + 30.0) * 60.0);
        assert_eq!(today.seconds(Bucket::Deep), asleep * 0.15);
        assert_eq!(today.seconds(Bucket::Rem), asleep * 0.20);
    }

    #[test]
    fn test_denied_authorization_is_an_error() {
        let source = MemorySampleSource::denied("not permitted");
        let result = block_on(collect_summaries(&source, &SummaryConfig::default(), now()));

        assert!(matches!(result, Err(SummaryError::AuthorizationDenied(_))));
    }

    #[test]
    fn test_failed_window_is_isolated() {
        let source = FlakySource {
            inner: MemorySampleSource::new(export()),
            failing: day(14),
        };
        let report =
            block_on(collect_summaries(&source, &SummaryConfig::default(), now())).unwrap();

        assert_eq!(report.failed_dates(), vec![day(14)]);
        assert_eq!(report.summaries().count(), 4);
        assert!(report.windows[0].summary().is_some());
        match &report.windows[1].outcome {
            WindowOutcome::Failed { error } => assert!(error.contains("store busy")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_stages_are_counted() {
        let mut records = export();
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        records.push(SampleRecord::new(
            start,
            start + TimeDelta::minutes(10),
            crate::schema::StageValue::Name("nap".to_string()),
        ));

        let report = SleepSummaryProcessor::new()
            .summarize_records(records, now())
            .unwrap();

        assert_eq!(report.rejected_records(), 1);
        match &report.windows[0].outcome {
            WindowOutcome::Summarized {
                rejected_records, ..
            } => assert_eq!(*rejected_records, 1),
            other => panic!("expected summary, got {other:?}"),
        }
    }

    #[test]
    fn test_rolling_windows_select_by_sample_start() {
        let config = SummaryConfig {
            lookback_days: 2,
            window_start: WindowStartRule::Rolling,
            ..Default::default()
        };
        let report = SleepSummaryProcessor::with_config(config)
            .unwrap()
            .summarize_records(export(), now())
            .unwrap();

        // [Jan 14 12:00, Jan 15 12:00) holds everything on the 15th
        let older = report.windows[1].summary().unwrap();
        assert_eq!(older.seconds(Bucket::Core), 21_600.0);
        assert_eq!(older.seconds(Bucket::Asleep), 0.0);
    }

    #[test]
    fn test_report_serializes_outcome_tags() {
        let report = SleepSummaryProcessor::new()
            .summarize_json("", now())
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["policy"], "direct_mapping");
        assert_eq!(json["windows"][0]["outcome"]["status"], "summarized");
        assert_eq!(
            json["windows"][0]["outcome"]["summary"]["buckets"]["awake"],
            0.0
        );
    }
}
