//! Batch quality reporting
//!
//! [`BatchMetrics`] accumulates one [`ProcessingResult`] per file during a
//! run. Once finalized it can be rendered as plain text or as a spreadsheet
//! (feature `excel`). Report generation never fails a batch: a spreadsheet
//! that cannot be written falls back to the text form.

mod excel;
mod text;

pub use excel::generate_excel_report;
pub use text::generate_text_report;

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use log::{info, warn};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

/// Timestamp layout used throughout the reports
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of processing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStatus {
    /// Converted with no remarks
    Success,
    /// Converted, but with a warning attached
    Warning,
    /// Not converted
    Failure,
    /// Not attempted
    Skipped,
}

impl ProcessingStatus {
    /// Upper-case label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingStatus::Success => "SUCCESS",
            ProcessingStatus::Warning => "WARNING",
            ProcessingStatus::Failure => "FAILURE",
            ProcessingStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_lowercase())
    }
}

/// Result of processing a single XML file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    /// File name without directory
    pub filename: String,
    /// Outcome
    pub status: ProcessingStatus,
    /// When processing started
    pub timestamp: NaiveDateTime,
    /// Failure or skip reason
    pub error_message: Option<String>,
    /// Warning attached to a successful conversion
    pub warning_message: Option<String>,
    /// Number of records produced
    pub records_processed: usize,
}

impl ProcessingResult {
    /// Create a result with no messages and no records
    pub fn new(filename: impl Into<String>, status: ProcessingStatus, timestamp: NaiveDateTime) -> Self {
        Self {
            filename: filename.into(),
            status,
            timestamp,
            error_message: None,
            warning_message: None,
            records_processed: 0,
        }
    }

    /// Set the error message
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Set the warning message
    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warning_message = Some(message.into());
        self
    }

    /// Set the record count
    pub fn with_records(mut self, records: usize) -> Self {
        self.records_processed = records;
        self
    }

    /// The message shown for this file, error first
    pub fn message(&self) -> &str {
        self.error_message
            .as_deref()
            .or(self.warning_message.as_deref())
            .unwrap_or("")
    }
}

/// Accumulated metrics for a batch processing run
#[derive(Debug, Clone)]
pub struct BatchMetrics {
    /// When the batch started
    pub start_time: NaiveDateTime,
    /// When the batch was finalized
    pub end_time: Option<NaiveDateTime>,
    /// Per-file results in processing order
    pub results: Vec<ProcessingResult>,
}

impl Default for BatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchMetrics {
    /// Start a batch now
    pub fn new() -> Self {
        Self::starting_at(Local::now().naive_local())
    }

    /// Start a batch at the given time
    pub fn starting_at(start_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            end_time: None,
            results: Vec::new(),
        }
    }

    /// Add a processing result to the batch
    pub fn add_result(&mut self, result: ProcessingResult) {
        self.results.push(result);
    }

    /// Mark the batch as complete now
    pub fn finalize(&mut self) {
        self.finalize_at(Local::now().naive_local());
    }

    /// Mark the batch as complete at the given time
    pub fn finalize_at(&mut self, end_time: NaiveDateTime) {
        self.end_time = Some(end_time);
    }

    fn count(&self, status: ProcessingStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Count of successfully processed files
    pub fn total_processed(&self) -> usize {
        self.count(ProcessingStatus::Success)
    }

    /// Count of skipped files
    pub fn total_skipped(&self) -> usize {
        self.count(ProcessingStatus::Skipped)
    }

    /// Count of files with warnings
    pub fn total_warnings(&self) -> usize {
        self.count(ProcessingStatus::Warning)
    }

    /// Count of failed files
    pub fn total_failures(&self) -> usize {
        self.count(ProcessingStatus::Failure)
    }

    /// Total number of files encountered
    pub fn total_files(&self) -> usize {
        self.results.len()
    }

    /// Total number of records processed across all files
    pub fn total_records(&self) -> usize {
        self.results.iter().map(|r| r.records_processed).sum()
    }

    /// Percentage of files with status success, 0 for an empty batch
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.total_processed() as f64 / self.total_files() as f64 * 100.0
        }
    }

    /// Seconds between start and finalization
    pub fn duration_seconds(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 1000.0)
    }

    /// The most frequent error and warning messages.
    ///
    /// Sorted by count, most frequent first; equal counts keep the order in
    /// which the messages first appeared.
    pub fn frequent_issues(&self, top_n: usize) -> Vec<(String, usize)> {
        let mut counter: IndexMap<&str, usize> = IndexMap::new();
        for result in &self.results {
            for message in [&result.error_message, &result.warning_message]
                .into_iter()
                .flatten()
            {
                *counter.entry(message.as_str()).or_default() += 1;
            }
        }

        let mut issues: Vec<(String, usize)> = counter
            .into_iter()
            .map(|(message, count)| (message.to_string(), count))
            .collect();
        issues.sort_by(|a, b| b.1.cmp(&a.1));
        issues.truncate(top_n);
        issues
    }
}

/// Requested report output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Spreadsheet, falling back to text when it cannot be written
    #[default]
    Excel,
    /// Plain text
    Text,
    /// Spreadsheet and text
    Both,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "excel" => Ok(ReportFormat::Excel),
            "text" => Ok(ReportFormat::Text),
            "both" => Ok(ReportFormat::Both),
            _ => Err(Error::Config(format!(
                "Unknown report format: {}. Use: excel, text, both",
                s
            ))),
        }
    }
}

/// Write the quality report(s) for a batch into `output_dir`.
///
/// Files are named `quality_report_<start>.xlsx` / `.txt` after the batch
/// start time. Returns the paths actually written; failures are logged and
/// never propagated.
pub fn generate_quality_report(
    metrics: &BatchMetrics,
    output_dir: &Path,
    format: ReportFormat,
) -> Vec<PathBuf> {
    let stamp = metrics.start_time.format("%Y%m%d_%H%M%S");
    let mut written = Vec::new();
    let mut want_text = matches!(format, ReportFormat::Text | ReportFormat::Both);

    if matches!(format, ReportFormat::Excel | ReportFormat::Both) {
        let path = output_dir.join(format!("quality_report_{}.xlsx", stamp));
        match generate_excel_report(metrics, &path) {
            Ok(()) => {
                info!("quality report (Excel): {}", path.display());
                written.push(path);
            }
            Err(err) => {
                warn!("failed to generate Excel report: {}", err);
                want_text = true;
            }
        }
    }

    if want_text {
        let path = output_dir.join(format!("quality_report_{}.txt", stamp));
        match fs::write(&path, generate_text_report(metrics)) {
            Ok(()) => {
                info!("quality report (Text): {}", path.display());
                written.push(path);
            }
            Err(err) => warn!("failed to write text report {}: {}", path.display(), err),
        }
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    pub(super) fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    pub(super) fn sample_metrics() -> BatchMetrics {
        let mut metrics = BatchMetrics::starting_at(at(10, 0, 0));
        metrics.add_result(
            ProcessingResult::new("a.xml", ProcessingStatus::Success, at(10, 0, 1)).with_records(3),
        );
        metrics.add_result(
            ProcessingResult::new("b.xml", ProcessingStatus::Warning, at(10, 0, 2))
                .with_warning("No products found in XML file"),
        );
        metrics.add_result(
            ProcessingResult::new("c.xml", ProcessingStatus::Failure, at(10, 0, 3))
                .with_error("XML parse error: mismatched tag"),
        );
        metrics.add_result(
            ProcessingResult::new("d.xml", ProcessingStatus::Warning, at(10, 0, 4))
                .with_warning("No products found in XML file"),
        );
        metrics.add_result(
            ProcessingResult::new("e.xml", ProcessingStatus::Skipped, at(10, 0, 5))
                .with_error("File does not exist"),
        );
        metrics.finalize_at(at(10, 0, 12));
        metrics
    }

    #[test]
    fn test_totals() {
        let metrics = sample_metrics();
        assert_eq!(metrics.total_files(), 5);
        assert_eq!(metrics.total_processed(), 1);
        assert_eq!(metrics.total_warnings(), 2);
        assert_eq!(metrics.total_failures(), 1);
        assert_eq!(metrics.total_skipped(), 1);
        assert_eq!(metrics.total_records(), 3);
        assert_eq!(metrics.success_rate(), 20.0);
        assert_eq!(metrics.duration_seconds(), Some(12.0));
    }

    #[test]
    fn test_empty_batch() {
        let metrics = BatchMetrics::new();
        assert_eq!(metrics.success_rate(), 0.0);
        assert_eq!(metrics.duration_seconds(), None);
        assert!(metrics.frequent_issues(10).is_empty());
    }

    #[test]
    fn test_frequent_issues_order() {
        let issues = sample_metrics().frequent_issues(10);
        assert_eq!(
            issues,
            vec![
                ("No products found in XML file".to_string(), 2),
                ("XML parse error: mismatched tag".to_string(), 1),
                ("File does not exist".to_string(), 1),
            ]
        );
        assert_eq!(sample_metrics().frequent_issues(1).len(), 1);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ProcessingStatus::Warning.label(), "WARNING");
        assert_eq!(ProcessingStatus::Skipped.to_string(), "skipped");
    }

    #[test]
    fn test_result_message_prefers_error() {
        let result = ProcessingResult::new("x.xml", ProcessingStatus::Failure, at(1, 0, 0))
            .with_warning("w")
            .with_error("e");
        assert_eq!(result.message(), "e");
        let result = ProcessingResult::new("x.xml", ProcessingStatus::Success, at(1, 0, 0));
        assert_eq!(result.message(), "");
    }

    #[test]
    fn test_report_format_parse() {
        assert_eq!("TEXT".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert_eq!("both".parse::<ReportFormat>().unwrap(), ReportFormat::Both);
        assert!("pdf".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::default(), ReportFormat::Excel);
    }

    #[test]
    fn test_text_report_written() {
        let dir = tempfile::tempdir().unwrap();
        let written = generate_quality_report(&sample_metrics(), dir.path(), ReportFormat::Text);
        assert_eq!(written, vec![dir.path().join("quality_report_20240301_100000.txt")]);
        let text = fs::read_to_string(&written[0]).unwrap();
        assert!(text.contains("Total Files: 5"));
    }

    #[test]
    fn test_excel_format_always_produces_a_report() {
        let dir = tempfile::tempdir().unwrap();
        let written = generate_quality_report(&sample_metrics(), dir.path(), ReportFormat::Excel);
        assert_eq!(written.len(), 1);
        assert!(written[0].exists());
    }

    #[test]
    fn test_unwritable_directory_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let written = generate_quality_report(&sample_metrics(), &missing, ReportFormat::Both);
        assert!(written.is_empty());
    }
}
