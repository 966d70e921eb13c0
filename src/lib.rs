//! Sleep Summary - per-day sleep-stage aggregation engine
//!
//! Turns sleep-analysis samples exported from a health store into per-day
//! summaries through a deterministic pipeline: record decoding → window
//! selection → policy-driven aggregation → display encoding.
//!
//! ## Policies
//!
//! - **Direct mapping**: every asleep stage accumulates into its own bucket
//! - **Derived ratio**: measured in-bed, asleep and awake totals, with deep and
//!   REM estimated as fixed fractions of asleep time

pub mod aggregator;
pub mod config;
pub mod display;
pub mod error;
pub mod format;
pub mod history;
pub mod pipeline;
pub mod policies;
pub mod schema;
pub mod source;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::{aggregate, Aggregator};
pub use config::SummaryConfig;
pub use display::{DisplayEncoder, DisplayRow};
pub use error::SummaryError;
pub use format::format_duration;
pub use history::SleepHistory;
pub use pipeline::{collect_summaries, SleepSummaryProcessor, SummaryReport};
pub use policies::AggregationPolicy;
pub use source::{MemorySampleSource, SampleSource};
pub use types::{AggregationWindow, Bucket, DailySummary, PolicyKind, SleepSample, SleepStage};
pub use window::{WindowConfig, WindowStartRule};

// Schema exports
pub use schema::{SampleRecord, SampleRecordAdapter, SCHEMA_VERSION};

/// Library version reported by the CLI and FFI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
