//! sleep-summary CLI
//!
//! Commands:
//! - summarize: Aggregate exported sleep samples into per-day summaries
//! - validate: Check sample records for unknown stages and inverted intervals
//! - format: Render a duration in seconds as HH:MM
//! - labels: Print the bucket labels of a policy

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sleep_summary::display::DisplayEncoder;
use sleep_summary::format::format_duration;
use sleep_summary::pipeline::{SleepSummaryProcessor, SummaryReport};
use sleep_summary::schema::{SampleRecord, SampleRecordAdapter, SCHEMA_VERSION};
use sleep_summary::window::WindowStartRule;
use sleep_summary::{PolicyKind, SummaryConfig, SummaryError, VERSION};

/// Per-day sleep summaries from health-store sleep samples
#[derive(Parser)]
#[command(name = "sleep-summary")]
#[command(version = VERSION)]
#[command(about = "Aggregate sleep-stage samples into daily summaries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate exported sleep samples into per-day summaries
    Summarize {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,

        /// JSON configuration file; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Aggregation policy
        #[arg(long)]
        policy: Option<PolicyArg>,

        /// Number of days to look back, today included
        #[arg(long)]
        lookback_days: Option<u32>,

        /// Window start rule
        #[arg(long)]
        window_start: Option<WindowStartArg>,

        /// Local offset from UTC in minutes
        #[arg(long, allow_hyphen_values = true)]
        utc_offset_minutes: Option<i32>,

        /// Reference time (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,
    },

    /// Check sample records for unknown stages and inverted intervals
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a duration in seconds as HH:MM
    Format {
        /// Duration in seconds
        seconds: f64,
    },

    /// Print the bucket labels of a policy
    Labels {
        #[arg(long, default_value = "direct")]
        policy: PolicyArg,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Aligned text blocks, one per date
    Text,
    /// JSON array of display rows
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Full report with per-window outcomes
    Report,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Each stage in its own bucket
    Direct,
    /// Measured in-bed/asleep/awake, estimated deep and REM
    Derived,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Direct => PolicyKind::DirectMapping,
            PolicyArg::Derived => PolicyKind::DerivedRatio,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum WindowStartArg {
    /// Local midnight of each day
    StartOfDay,
    /// Now minus whole days
    Rolling,
}

impl From<WindowStartArg> for WindowStartRule {
    fn from(arg: WindowStartArg) -> Self {
        match arg {
            WindowStartArg::StartOfDay => WindowStartRule::StartOfDay,
            WindowStartArg::Rolling => WindowStartRule::Rolling,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SummaryCliError> {
    match cli.command {
        Commands::Summarize {
            input,
            input_format,
            output,
            output_format,
            config,
            policy,
            lookback_days,
            window_start,
            utc_offset_minutes,
            now,
        } => {
            let mut settings = match config {
                Some(path) => SummaryConfig::from_json(&fs::read_to_string(path)?)?,
                None => SummaryConfig::default(),
            };
            if let Some(policy) = policy {
                settings.policy = policy.into();
            }
            if let Some(days) = lookback_days {
                settings.lookback_days = days;
            }
            if let Some(rule) = window_start {
                settings.window_start = rule.into();
            }
            if let Some(minutes) = utc_offset_minutes {
                settings.utc_offset_minutes = minutes;
            }

            cmd_summarize(
                &input,
                input_format,
                &output,
                output_format,
                settings,
                now.as_deref(),
            )
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Format { seconds } => {
            println!("{}", format_duration(seconds));
            Ok(())
        }

        Commands::Labels { policy } => {
            let kind = PolicyKind::from(policy);
            let policy = kind.policy();
            for bucket in policy.buckets() {
                if let Some(label) = policy.label(*bucket) {
                    let marker = if policy.is_estimated(*bucket) {
                        " (estimated)"
                    } else {
                        ""
                    };
                    println!("{}\t{}{}", bucket.as_str(), label, marker);
                }
            }
            Ok(())
        }
    }
}

fn cmd_summarize(
    input: &Path,
    input_format: InputFormat,
    output: &Path,
    output_format: OutputFormat,
    settings: SummaryConfig,
    now: Option<&str>,
) -> Result<(), SummaryCliError> {
    let records = read_records(input, &input_format)?;
    if records.is_empty() {
        log::warn!("no sample records in input; every day will read 00:00");
    }

    let now = match now {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|e| SummaryCliError::InvalidNow(format!("{raw}: {e}")))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let processor = SleepSummaryProcessor::with_config(settings)?;
    let report = processor.summarize_records(records, now)?;

    for date in report.failed_dates() {
        log::warn!("no summary for {date}");
    }
    if report.rejected_records() > 0 {
        log::warn!(
            "{} records had an unknown stage; run 'sleep-summary validate' for details",
            report.rejected_records()
        );
    }

    let output_data = render_report(&report, &output_format)?;
    write_output(output, &output_data)
}

fn render_report(
    report: &SummaryReport,
    output_format: &OutputFormat,
) -> Result<String, SummaryCliError> {
    let rows = DisplayEncoder::report_rows(report);
    Ok(match output_format {
        OutputFormat::Text => DisplayEncoder::render_text(&rows),
        OutputFormat::Json => DisplayEncoder::encode_to_json(&rows)? + "\n",
        OutputFormat::JsonPretty => DisplayEncoder::encode_to_json_pretty(&rows)? + "\n",
        OutputFormat::Report => serde_json::to_string_pretty(report)? + "\n",
    })
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), SummaryCliError> {
    let records = read_records(input, &input_format)?;
    let issues = SampleRecordAdapter::validate_records(&records);

    let report = ValidationReport {
        schema_version: SCHEMA_VERSION,
        total_records: records.len(),
        valid_records: records.len() - issues.len(),
        invalid_records: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                sample_id: issue.sample_id.clone(),
                error: issue.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report ({})", report.schema_version);
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (index {}): {}",
                    err.sample_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(SummaryCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

// Helper functions

fn read_records(
    input: &Path,
    input_format: &InputFormat,
) -> Result<Vec<SampleRecord>, SummaryCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records = match input_format {
        InputFormat::Ndjson => SampleRecordAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => SampleRecordAdapter::parse_array(&input_data)?,
    };
    Ok(records)
}

fn write_output(output: &Path, data: &str) -> Result<(), SummaryCliError> {
    if output.to_string_lossy() == "-" {
        print!("{data}");
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum SummaryCliError {
    Io(io::Error),
    Summary(SummaryError),
    Json(serde_json::Error),
    InvalidNow(String),
    ValidationFailed(usize),
}

impl From<io::Error> for SummaryCliError {
    fn from(e: io::Error) -> Self {
        SummaryCliError::Io(e)
    }
}

impl From<SummaryError> for SummaryCliError {
    fn from(e: SummaryError) -> Self {
        SummaryCliError::Summary(e)
    }
}

impl From<serde_json::Error> for SummaryCliError {
    fn from(e: serde_json::Error) -> Self {
        SummaryCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SummaryCliError> for CliError {
    fn from(e: SummaryCliError) -> Self {
        match e {
            SummaryCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SummaryCliError::Summary(e) => {
                let (code, hint) = match &e {
                    SummaryError::ParseError(_) | SummaryError::JsonError(_) => (
                        "PARSE_ERROR",
                        "Ensure input matches the sleep.sample_record.v1 schema",
                    ),
                    SummaryError::InvalidConfig(_)
                    | SummaryError::InvalidTimezone(_)
                    | SummaryError::UnknownPolicy(_) => {
                        ("CONFIG_ERROR", "Check the configuration file and flags")
                    }
                    SummaryError::AuthorizationDenied(_) | SummaryError::HealthDataUnavailable => {
                        ("ACCESS_ERROR", "Grant read access to sleep analysis data")
                    }
                    _ => ("SUMMARY_ERROR", "Re-run with RUST_LOG=debug for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            SummaryCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SummaryCliError::InvalidNow(msg) => CliError {
                code: "INVALID_NOW".to_string(),
                message: msg,
                hint: Some("Use an RFC 3339 timestamp, e.g. 2024-01-15T12:00:00Z".to_string()),
            },
            SummaryCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: &'static str,
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    sample_id: Option<String>,
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_export_renders_zero_rows() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let report = SleepSummaryProcessor::new()
            .summarize_records(Vec::new(), now)
            .unwrap();

        let text = render_report(&report, &OutputFormat::Text).unwrap();
        for date in ["2024-01-15", "2024-01-14", "2024-01-13", "2024-01-12", "2024-01-11"] {
            assert!(text.contains(date), "{date}");
        }
        assert!(text.contains("Acordado        00:00"));

        let json = render_report(&report, &OutputFormat::Json).unwrap();
        let rows: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 5);
    }
}
