//! Command-line interface for hpra-json

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use hpra_json::batch::{Batch, BatchConfig};
#[cfg(feature = "cli")]
use hpra_json::config::Config;
#[cfg(feature = "cli")]
use hpra_json::converters::OutputMode;
#[cfg(feature = "cli")]
use hpra_json::report::ReportFormat;

/// Config file picked up from the working directory when `--config` is absent
#[cfg(feature = "cli")]
const DEFAULT_CONFIG_FILE: &str = "hpra-json.toml";

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "hpra-json")]
#[command(author, version, about = "Convert XML product exports to JSON", long_about = None)]
struct Cli {
    /// Emit one flat record per product instead of nested JSON
    #[arg(long)]
    flatten: bool,

    /// Directory containing XML files (default: data/input)
    #[arg(long, value_name = "DIR")]
    input: Option<PathBuf>,

    /// Directory for JSON files and reports (default: data/output)
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Skip the quality report
    #[arg(long)]
    no_report: bool,

    /// Quality report format
    #[arg(long, value_enum)]
    report_format: Option<ReportFormat>,

    /// Append input/output SHA-256 digests to this CSV ledger
    #[arg(long, value_name = "FILE")]
    checksum_ledger: Option<PathBuf>,

    /// TOML file with batch defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Specific XML files to convert, relative to the input directory
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,
}

#[cfg(feature = "cli")]
fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "cli")]
fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Config::from_file(path)?),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            log::info!("using configuration from {}", DEFAULT_CONFIG_FILE);
            Ok(Config::from_file(DEFAULT_CONFIG_FILE)?)
        }
        None => Ok(Config::default()),
    }
}

/// Command-line flags take precedence over the config file
#[cfg(feature = "cli")]
fn batch_config(cli: Cli, config: &Config) -> BatchConfig {
    let mut batch = BatchConfig::from_config(config);

    if let Some(input) = cli.input {
        batch.input_dir = input;
    }
    if let Some(output) = cli.output {
        batch.output_dir = output;
    }
    if cli.flatten {
        batch.converter = batch.converter.with_mode(OutputMode::Flattened);
    }
    if cli.no_report {
        batch.report = false;
    }
    if let Some(format) = cli.report_format {
        batch.report_format = format;
    }
    if cli.checksum_ledger.is_some() {
        batch.checksum_ledger = cli.checksum_ledger;
    }
    batch.files = cli.files;

    batch
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;
    let batch_config = batch_config(cli, &config);

    batch_config.prepare_directories()?;
    let targets = batch_config.resolve_targets()?;
    if targets.is_empty() {
        println!("No XML files found to process. Ensure files are placed in the input directory.");
        return Ok(1);
    }

    let flatten = batch_config.converter.mode() == OutputMode::Flattened;
    let output_dir = batch_config.output_dir.clone();
    let mut batch = Batch::new(batch_config);

    for target in &targets {
        let output = batch.config().output_path(target);
        println!(
            "Processing {} -> {} (flatten={})",
            file_name(target),
            file_name(&output),
            flatten
        );
        batch.process_file(target);
    }

    let outcome = batch.finish();
    let metrics = &outcome.metrics;

    println!();
    println!(
        "Completed conversion for {} of {} file(s). Warnings: {}, Failures: {}",
        metrics.total_processed(),
        metrics.total_files(),
        metrics.total_warnings(),
        metrics.total_failures()
    );
    println!("Output directory: {}", output_dir.display());

    for report in &outcome.reports {
        let kind = match report.extension().and_then(|e| e.to_str()) {
            Some("xlsx") => "Excel",
            _ => "Text",
        };
        println!("Quality report ({}): {}", kind, report.display());
    }

    Ok(if outcome.is_success() { 0 } else { 1 })
}

#[cfg(feature = "cli")]
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
