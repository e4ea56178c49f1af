//! Batch conversion of a directory of XML files
//!
//! A [`Batch`] converts files one at a time, records a
//! [`ProcessingResult`] for each and, once finished, writes the quality
//! report. Per-file problems never abort the batch.

use chrono::Local;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::conversion::{convert_xml_to_json, ConversionResult};
use crate::converters::{Converter, ConverterConfig, EntityContainer, OutputMode};
use crate::error::{Error, Result};
use crate::integrity::write_checksums_csv;
use crate::limits::Limits;
use crate::report::{
    generate_quality_report, BatchMetrics, ProcessingResult, ProcessingStatus, ReportFormat,
};

/// Default directory scanned for XML files
pub const DEFAULT_INPUT_DIR: &str = "data/input";

/// Default directory receiving JSON files and reports
pub const DEFAULT_OUTPUT_DIR: &str = "data/output";

/// Skip reason for files that vanish before they are processed
pub const MISSING_FILE_MESSAGE: &str = "File does not exist";

/// Settings for a batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory scanned for XML files
    pub input_dir: PathBuf,
    /// Directory receiving JSON files and reports
    pub output_dir: PathBuf,
    /// Explicit files to convert, relative to `input_dir` unless absolute.
    /// Empty means every `*.xml` file in `input_dir`.
    pub files: Vec<PathBuf>,
    /// Conversion settings
    pub converter: ConverterConfig,
    /// Whether to write a quality report
    pub report: bool,
    /// Report format
    pub report_format: ReportFormat,
    /// CSV ledger receiving file digests
    pub checksum_ledger: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            files: Vec::new(),
            converter: ConverterConfig::default(),
            report: true,
            report_format: ReportFormat::default(),
            checksum_ledger: None,
        }
    }
}

impl BatchConfig {
    /// Create a configuration with the default directories
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the `[batch]` table of a config file
    pub fn from_config(config: &Config) -> Self {
        let section = &config.batch;
        let mut batch = Self::default();

        if let Some(dir) = &section.input_dir {
            batch.input_dir = dir.clone();
        }
        if let Some(dir) = &section.output_dir {
            batch.output_dir = dir.clone();
        }
        if let Some(flatten) = section.flatten {
            batch.converter = batch.converter.with_mode(OutputMode::from_flatten(flatten));
        }
        if let Some(checksums) = section.checksums {
            batch.converter = batch.converter.with_checksums(checksums);
        }
        if section.container.is_some() || section.item.is_some() {
            let defaults = EntityContainer::default();
            let container = section.container.as_deref().unwrap_or(&defaults.container);
            let item = section.item.as_deref().unwrap_or(&defaults.item);
            batch.converter = batch
                .converter
                .with_entities(EntityContainer::new(container, item));
        }
        let defaults = Limits::default();
        batch.converter = batch.converter.with_limits(Limits {
            max_xml_depth: section.max_xml_depth.unwrap_or(defaults.max_xml_depth),
            max_xml_size: section.max_xml_size.unwrap_or(defaults.max_xml_size),
            max_attributes: section.max_attributes.unwrap_or(defaults.max_attributes),
        });
        if let Some(no_report) = section.no_report {
            batch.report = !no_report;
        }
        if let Some(format) = section.report_format {
            batch.report_format = format;
        }
        batch.checksum_ledger = section.checksum_ledger.clone();

        batch
    }

    /// JSON path written for an input file: `<output_dir>/<stem>.json`
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.output_dir.join(format!("{}.json", stem))
    }

    /// Create the input and output directories if missing
    pub fn prepare_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.input_dir)?;
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Files to convert.
    ///
    /// Explicit files that are missing or lack an `.xml` extension are
    /// logged and left out. Without explicit files, every `*.xml` file in
    /// the input directory is returned, sorted by path.
    pub fn resolve_targets(&self) -> Result<Vec<PathBuf>> {
        if !self.files.is_empty() {
            let mut targets = Vec::new();
            for file in &self.files {
                let path = self.input_dir.join(file);
                if path.is_file() && is_xml_file(&path) {
                    targets.push(path);
                } else {
                    warn!("skipping non-existent or non-XML file: {}", path.display());
                }
            }
            return Ok(targets);
        }

        let dir = self.input_dir.to_str().ok_or_else(|| {
            Error::Other(format!(
                "input directory is not valid UTF-8: {}",
                self.input_dir.display()
            ))
        })?;
        let pattern = format!("{}/*.xml", glob::Pattern::escape(dir));
        let entries = glob::glob(&pattern)
            .map_err(|e| Error::Other(format!("invalid glob pattern {}: {}", pattern, e)))?;

        let mut targets = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => targets.push(path),
                Err(err) => warn!("cannot read {}: {}", err.path().display(), err.error()),
            }
        }
        targets.sort();
        Ok(targets)
    }
}

/// Whether a path has an `.xml` extension, in any case
pub fn is_xml_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

/// Outcome of a finished batch
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Finalized metrics
    pub metrics: BatchMetrics,
    /// Report files written
    pub reports: Vec<PathBuf>,
}

impl BatchOutcome {
    /// True when no file failed
    pub fn is_success(&self) -> bool {
        self.metrics.total_failures() == 0
    }
}

/// A batch run in progress
#[derive(Debug)]
pub struct Batch {
    config: BatchConfig,
    converter: Converter,
    metrics: BatchMetrics,
}

impl Batch {
    /// Start a batch now
    pub fn new(config: BatchConfig) -> Self {
        let converter = Converter::with_config(config.converter.clone());
        Self {
            config,
            converter,
            metrics: BatchMetrics::new(),
        }
    }

    /// Get the batch configuration
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Metrics gathered so far
    pub fn metrics(&self) -> &BatchMetrics {
        &self.metrics
    }

    /// Convert one file and record the result
    pub fn process_file(&mut self, input: &Path) -> &ProcessingResult {
        let timestamp = Local::now().naive_local();
        let filename = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());

        let result = if !input.exists() {
            warn!("{}: {}", input.display(), MISSING_FILE_MESSAGE);
            ProcessingResult::new(filename, ProcessingStatus::Skipped, timestamp)
                .with_error(MISSING_FILE_MESSAGE)
        } else {
            let output = self.config.output_path(input);
            info!("converting {} -> {}", input.display(), output.display());
            let conversion = convert_xml_to_json(input, &output, &self.converter);
            self.record_checksums(&conversion);
            processing_result(filename, timestamp, conversion)
        };

        self.metrics.add_result(result);
        &self.metrics.results[self.metrics.results.len() - 1]
    }

    fn record_checksums(&self, conversion: &ConversionResult) {
        let Some(ledger) = &self.config.checksum_ledger else {
            return;
        };
        let checksums = conversion.checksums();
        if !conversion.success || checksums.is_empty() {
            return;
        }
        match write_checksums_csv(&checksums, ledger, true) {
            Ok(()) => debug!("{} checksum(s) appended to {}", checksums.len(), ledger.display()),
            Err(err) => warn!("failed to update checksum ledger {}: {}", ledger.display(), err),
        }
    }

    /// Finalize the metrics and write the report if enabled
    pub fn finish(mut self) -> BatchOutcome {
        self.metrics.finalize();
        let reports = if self.config.report {
            generate_quality_report(&self.metrics, &self.config.output_dir, self.config.report_format)
        } else {
            Vec::new()
        };
        BatchOutcome {
            metrics: self.metrics,
            reports,
        }
    }
}

fn processing_result(
    filename: String,
    timestamp: chrono::NaiveDateTime,
    conversion: ConversionResult,
) -> ProcessingResult {
    if !conversion.success {
        let message = conversion.error_message.unwrap_or_default();
        warn!("{}: {}", filename, message);
        return ProcessingResult::new(filename, ProcessingStatus::Failure, timestamp)
            .with_error(message);
    }

    let result = ProcessingResult::new(filename, ProcessingStatus::Success, timestamp)
        .with_records(conversion.records_processed);
    match conversion.warning_message {
        Some(warning) => {
            warn!("{}: {}", result.filename, warning);
            ProcessingResult {
                status: ProcessingStatus::Warning,
                ..result
            }
            .with_warning(warning)
        }
        None => result,
    }
}

/// Convert every target of a configuration and write the report
pub fn run_batch(config: BatchConfig) -> Result<BatchOutcome> {
    config.prepare_directories()?;
    let targets = config.resolve_targets()?;

    let mut batch = Batch::new(config);
    for target in &targets {
        batch.process_file(target);
    }
    Ok(batch.finish())
}
