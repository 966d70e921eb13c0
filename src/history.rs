//! Caller-owned summary history
//!
//! Reports are immutable; a [`SleepHistory`] is where a host keeps the latest
//! summary per date across runs. Failed windows never overwrite what is
//! already there.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pipeline::SummaryReport;
use crate::types::DailySummary;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepHistory {
    days: BTreeMap<NaiveDate, DailySummary>,
}

impl SleepHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a report, returning how many dates were inserted or replaced
    pub fn merge(&mut self, report: &SummaryReport) -> usize {
        let mut merged = 0;
        for (date, summary) in report.summaries() {
            self.insert(date, summary.clone());
            merged += 1;
        }
        merged
    }

    pub fn insert(&mut self, date: NaiveDate, summary: DailySummary) -> Option<DailySummary> {
        self.days.insert(date, summary)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailySummary> {
        self.days.get(&date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// The `limit` most recent dates, newest first
    pub fn latest(&self, limit: usize) -> impl Iterator<Item = (NaiveDate, &DailySummary)> {
        self.days
            .iter()
            .rev()
            .take(limit)
            .map(|(date, summary)| (*date, summary))
    }

    /// Load a history saved with [`SleepHistory::to_json`]; bucket totals
    /// come back bit-identical
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{collect_summaries, SleepSummaryProcessor};
    use crate::schema::SampleRecord;
    use crate::source::{MemorySampleSource, SampleSource};
    use crate::config::SummaryConfig;
    use crate::error::SummaryError;
    use crate::aggregator::aggregate;
    use crate::types::{AggregationWindow, Bucket, PolicyKind, SleepSample, SleepStage};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use futures::executor::block_on;
    use futures::future::{self, BoxFuture, FutureExt};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    struct FailingSource;

    impl SampleSource for FailingSource {
        fn authorize(&self) -> BoxFuture<'_, Result<(), SummaryError>> {
            future::ready(Ok(())).boxed()
        }

        fn query<'a>(
            &'a self,
            window: &'a AggregationWindow,
        ) -> BoxFuture<'a, Result<Vec<SampleRecord>, SummaryError>> {
            future::ready(Err(SummaryError::QueryFailed {
                date: window.date,
                message: "offline".to_string(),
            }))
            .boxed()
        }
    }

    #[test]
    fn test_merge_replaces_summarized_dates() {
        let processor = SleepSummaryProcessor::new();
        let records = vec![SampleRecord::new(at(15, 1), at(15, 2), SleepStage::Rem)];

        let mut history = SleepHistory::new();
        let first = processor.summarize_records(Vec::new(), at(15, 12)).unwrap();
        assert_eq!(history.merge(&first), 5);
        assert_eq!(history.get(day(15)).unwrap().seconds(Bucket::Rem), 0.0);

        let second = processor.summarize_records(records, at(15, 12)).unwrap();
        history.merge(&second);
        assert_eq!(history.len(), 5);
        assert_eq!(history.get(day(15)).unwrap().seconds(Bucket::Rem), 3600.0);
    }

    #[test]
    fn test_failed_windows_keep_prior_values() {
        let processor = SleepSummaryProcessor::new();
        let records = vec![SampleRecord::new(at(15, 1), at(15, 2), SleepStage::Deep)];
        let mut history = SleepHistory::new();
        history.merge(&processor.summarize_records(records, at(15, 12)).unwrap());

        let failed = block_on(collect_summaries(
            &FailingSource,
            &SummaryConfig::default(),
            at(15, 12),
        ))
        .unwrap();

        assert_eq!(history.merge(&failed), 0);
        assert_eq!(history.get(day(15)).unwrap().seconds(Bucket::Deep), 3600.0);
    }

    #[test]
    fn test_latest_is_newest_first() {
        let processor = SleepSummaryProcessor::new();
        let mut history = SleepHistory::new();
        history.merge(&processor.summarize_records(Vec::new(), at(15, 12)).unwrap());
        history.merge(&processor.summarize_records(Vec::new(), at(20, 12)).unwrap());

        let dates: Vec<NaiveDate> = history.latest(3).map(|(date, _)| date).collect();
        assert_eq!(dates, vec![day(20), day(19), day(18)]);
        assert_eq!(history.len(), 10);
    }

    #[test]
    fn test_json_round_trip() {
        let source = MemorySampleSource::new(vec![SampleRecord::new(
            at(15, 1),
            at(15, 1) + TimeDelta::minutes(45),
            SleepStage::Awake,
        )]);
        let report = block_on(collect_summaries(&source, &SummaryConfig::default(), at(15, 12)))
            .unwrap();
        let mut history = SleepHistory::new();
        history.merge(&report);

        let restored = SleepHistory::from_json(&history.to_json().unwrap()).unwrap();
        assert_eq!(restored, history);
    }

    #[test]
    fn test_json_round_trip_keeps_fractional_estimates() {
        let mut history = SleepHistory::new();
        for d in 1..=31 {
            let start = at(d, 1);
            let samples = vec![
                SleepSample::new(
                    start,
                    start + TimeDelta::milliseconds(7_932 + i64::from(d) * 1_237),
                    SleepStage::Rem,
                ),
                SleepSample::new(
                    start,
                    start + TimeDelta::milliseconds(3_600_001 + i64::from(d) * 333),
                    SleepStage::Core,
                ),
            ];
            history.insert(day(d), aggregate(PolicyKind::DerivedRatio, &samples));
        }

        let restored = SleepHistory::from_json(&history.to_json().unwrap()).unwrap();

        for d in 1..=31 {
            let before = history.get(day(d)).unwrap();
            let after = restored.get(day(d)).unwrap();
            for (bucket, seconds) in before.iter() {
                assert_eq!(seconds.to_bits(), after.seconds(bucket).to_bits(), "{d}: {bucket:?}");
            }
        }
        assert_eq!(restored, history);
    }
}
