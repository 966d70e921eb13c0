//! Sample sources
//!
//! A source stands in for the platform health store: it grants (or denies)
//! read access and answers one query per aggregation window. Queries return
//! boxed futures so the pipeline can issue them together and join the results.

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::SummaryError;
use crate::schema::SampleRecord;
use crate::types::AggregationWindow;

/// Trait for health-store sample sources
pub trait SampleSource: Send + Sync {
    /// Request read access to sleep samples
    fn authorize(&self) -> BoxFuture<'_, Result<(), SummaryError>>;

    /// Records whose start falls inside `window`, in any order
    fn query<'a>(
        &'a self,
        window: &'a AggregationWindow,
    ) -> BoxFuture<'a, Result<Vec<SampleRecord>, SummaryError>>;
}

/// Access state of an in-memory source
#[derive(Debug, Clone, PartialEq, Eq)]
enum Access {
    Granted,
    Denied(String),
    Unavailable,
}

/// Source backed by a fixed set of records, e.g. a health-store export
#[derive(Debug, Clone)]
pub struct MemorySampleSource {
    records: Vec<SampleRecord>,
    access: Access,
}

impl MemorySampleSource {
    pub fn new(records: Vec<SampleRecord>) -> Self {
        Self {
            records,
            access: Access::Granted,
        }
    }

    /// A source whose authorization request is refused
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            access: Access::Denied(reason.into()),
        }
    }

    /// A source on a device without health data
    pub fn unavailable() -> Self {
        Self {
            records: Vec::new(),
            access: Access::Unavailable,
        }
    }
}

impl SampleSource for MemorySampleSource {
    fn authorize(&self) -> BoxFuture<'_, Result<(), SummaryError>> {
        let result = match &self.access {
            Access::Granted => Ok(()),
            Access::Denied(reason) => Err(SummaryError::AuthorizationDenied(reason.clone())),
            Access::Unavailable => Err(SummaryError::HealthDataUnavailable),
        };
        future::ready(result).boxed()
    }

    fn query<'a>(
        &'a self,
        window: &'a AggregationWindow,
    ) -> BoxFuture<'a, Result<Vec<SampleRecord>, SummaryError>> {
        async move {
            Ok(self
                .records
                .iter()
                .filter(|record| window.contains(record.start))
                .cloned()
                .collect())
        }
        .boxed()
    }
}
