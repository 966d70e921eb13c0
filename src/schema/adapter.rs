//! Adapter for decoding sample records into typed samples
//!
//! Parsing is all-or-nothing (a malformed line fails the whole input), while
//! decoding is per record: records with an unknown stage are set aside and
//! reported instead of silently dropped.

use log::warn;

use crate::error::SummaryError;
use crate::schema::record::{SampleRecord, ValidationError};
use crate::types::SleepSample;

/// Adapter for turning serialized records into samples
pub struct SampleRecordAdapter;

impl SampleRecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<SampleRecord>, SummaryError> {
        let records: Vec<SampleRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SampleRecord>, SummaryError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SampleRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(SummaryError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either format, picking JSON array when the input starts with `[`
    pub fn parse(input: &str) -> Result<Vec<SampleRecord>, SummaryError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Decode records, collecting the ones that cannot be decoded
    pub fn decode(records: &[SampleRecord]) -> DecodedBatch {
        let mut batch = DecodedBatch::default();
        for (index, record) in records.iter().enumerate() {
            match record.to_sample() {
                Ok(sample) => batch.samples.push(sample),
                Err(error) => {
                    warn!(
                        "rejecting record {} ({}): {}",
                        index,
                        record.sample_id.as_deref().unwrap_or("no id"),
                        error
                    );
                    batch.rejected.push(RecordIssue {
                        index,
                        sample_id: record.sample_id.clone(),
                        error,
                    });
                }
            }
        }
        batch
    }

    /// Strictly validate a batch, returning only the failing records
    pub fn validate_records(records: &[SampleRecord]) -> Vec<RecordIssue> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| RecordIssue {
                    index,
                    sample_id: record.sample_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// Outcome of decoding a batch of records
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub samples: Vec<SleepSample>,
    pub rejected: Vec<RecordIssue>,
}

/// A record that failed decoding or validation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordIssue {
    pub index: usize,
    pub sample_id: Option<String>,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SleepStage;

    const NDJSON: &str = r#"
{"start": "2024-01-15T01:00:00Z", "end": "2024-01-15T01:30:00Z", "value": 3}

{"sample_id": "x", "start": "2024-01-15T01:30:00Z", "end": "2024-01-15T02:00:00Z", "value": 42}
{"start": "2024-01-15T03:00:00Z", "end": "2024-01-15T02:00:00Z", "value": "awake"}
"#;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = SampleRecordAdapter::parse_ndjson(NDJSON).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let input = "{\"start\": \"2024-01-15T01:00:00Z\", \"end\": \"2024-01-15T01:30:00Z\", \"value\": 3}\nnot json";
        let err = SampleRecordAdapter::parse_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_detects_format() {
        let array = r#"[{"start": "2024-01-15T01:00:00Z", "end": "2024-01-15T01:30:00Z", "value": 1}]"#;
        assert_eq!(SampleRecordAdapter::parse(array).unwrap().len(), 1);
        assert_eq!(SampleRecordAdapter::parse(NDJSON).unwrap().len(), 3);
    }

    #[test]
    fn test_decode_sets_aside_unknown_stages() {
        let records = SampleRecordAdapter::parse_ndjson(NDJSON).unwrap();
        let batch = SampleRecordAdapter::decode(&records);

        assert_eq!(batch.samples.len(), 2);
        assert_eq!(batch.samples[0].stage, SleepStage::Core);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].index, 1);
        assert_eq!(batch.rejected[0].sample_id.as_deref(), Some("x"));
    }

    #[test]
    fn test_validate_records_is_strict() {
        let records = SampleRecordAdapter::parse_ndjson(NDJSON).unwrap();
        let issues = SampleRecordAdapter::validate_records(&records);

        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0].error, ValidationError::UnknownStage(_)));
        assert!(matches!(issues[1].error, ValidationError::EndBeforeStart { .. }));
    }
}
