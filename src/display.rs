//! Display encoding
//!
//! Turns summaries into rows ready for a list view: one row per date, newest
//! first, each metric already labelled and formatted as `HH:MM`. Estimated
//! metrics carry a flag so a view can mark them as such.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::error::SummaryError;
use crate::format::FormatHM;
use crate::history::SleepHistory;
use crate::pipeline::SummaryReport;
use crate::types::DailySummary;

/// One labelled, formatted metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetric {
    pub label: String,
    /// `HH:MM`
    pub value: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub estimated: bool,
}

/// All metrics for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub date: NaiveDate,
    pub metrics: Vec<DisplayMetric>,
}

/// Display row encoder
pub struct DisplayEncoder;

impl DisplayEncoder {
    /// Labelled metrics of one summary, sorted by label
    pub fn metrics(summary: &DailySummary) -> Vec<DisplayMetric> {
        let policy = summary.policy().policy();
        let mut metrics: Vec<DisplayMetric> = summary
            .iter()
            .filter_map(|(bucket, seconds)| {
                policy.label(bucket).map(|label| DisplayMetric {
                    label: label.to_string(),
                    value: seconds.format_hm(),
                    estimated: policy.is_estimated(bucket),
                })
            })
            .collect();
        metrics.sort_by(|a, b| a.label.cmp(&b.label));
        metrics
    }

    /// Rows for any set of dated summaries, newest first, at most `limit`
    pub fn rows<'a, I>(summaries: I, limit: usize) -> Vec<DisplayRow>
    where
        I: IntoIterator<Item = (NaiveDate, &'a DailySummary)>,
    {
        let mut rows: Vec<DisplayRow> = summaries
            .into_iter()
            .map(|(date, summary)| DisplayRow {
                date,
                metrics: Self::metrics(summary),
            })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows.truncate(limit);
        rows
    }

    pub fn report_rows(report: &SummaryReport) -> Vec<DisplayRow> {
        Self::rows(report.summaries(), report.windows.len())
    }

    pub fn history_rows(history: &SleepHistory, limit: usize) -> Vec<DisplayRow> {
        Self::rows(history.latest(limit), limit)
    }

    /// Plain-text rendering, one block per date
    pub fn render_text(rows: &[DisplayRow]) -> String {
        let mut out = String::new();
        for row in rows {
            let _ = writeln!(out, "{}", row.date.format("%Y-%m-%d"));
            let width = row.metrics.iter().map(|m| m.label.len()).max().unwrap_or(0);
            for metric in &row.metrics {
                let marker = if metric.estimated { " (est.)" } else { "" };
                let _ = writeln!(
                    out,
                    "  {:<width$}  {}{}",
                    metric.label,
                    metric.value,
                    marker,
                    width = width
                );
            }
            out.push('\n');
        }
        out
    }

    pub fn encode_to_json(rows: &[DisplayRow]) -> Result<String, SummaryError> {
        Ok(serde_json::to_string(rows)?)
    }

    pub fn encode_to_json_pretty(rows: &[DisplayRow]) -> Result<String, SummaryError> {
        Ok(serde_json::to_string_pretty(rows)?)
    }
}
