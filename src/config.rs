//! TOML configuration file support
//!
//! Defaults for a batch run can live in a file instead of on the command
//! line; flags given on the command line win.
//!
//! ```toml
//! # hpra-json.toml
//! [batch]
//! input_dir = "data/input"
//! output_dir = "data/output"
//! flatten = true
//! report_format = "both"
//! checksum_ledger = "data/output/checksums.csv"
//! max_xml_size = 67108864
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::report::ReportFormat;

/// Root configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Batch settings
    #[serde(default)]
    pub batch: BatchSection,
}

/// The `[batch]` table. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSection {
    /// Directory scanned for XML files
    pub input_dir: Option<PathBuf>,
    /// Directory receiving JSON files and reports
    pub output_dir: Option<PathBuf>,
    /// Emit flat records instead of nested objects
    pub flatten: Option<bool>,
    /// Skip the quality report
    pub no_report: Option<bool>,
    /// Report format
    pub report_format: Option<ReportFormat>,
    /// CSV ledger receiving file digests
    pub checksum_ledger: Option<PathBuf>,
    /// Compute file digests
    pub checksums: Option<bool>,
    /// Container key used to split records
    pub container: Option<String>,
    /// Item key below the container
    pub item: Option<String>,
    /// Largest accepted XML file, in bytes
    pub max_xml_size: Option<usize>,
    /// Deepest accepted element nesting
    pub max_xml_depth: Option<usize>,
    /// Most attributes accepted on one element
    pub max_attributes: Option<usize>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [batch]
            input_dir = "in"
            output_dir = "out"
            flatten = true
            report_format = "both"
            checksum_ledger = "out/ledger.csv"
            container = "Devices"
            item = "Device"
            max_xml_size = 1048576
            max_xml_depth = 64
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.batch.input_dir, Some(PathBuf::from("in")));
        assert_eq!(config.batch.output_dir, Some(PathBuf::from("out")));
        assert_eq!(config.batch.flatten, Some(true));
        assert_eq!(config.batch.report_format, Some(ReportFormat::Both));
        assert_eq!(config.batch.checksum_ledger, Some(PathBuf::from("out/ledger.csv")));
        assert_eq!(config.batch.container.as_deref(), Some("Devices"));
        assert_eq!(config.batch.no_report, None);
        assert_eq!(config.batch.max_xml_size, Some(1048576));
        assert_eq!(config.batch.max_xml_depth, Some(64));
        assert_eq!(config.batch.max_attributes, None);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::parse("").unwrap();
        assert!(config.batch.input_dir.is_none());
        assert!(config.batch.flatten.is_none());
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let result = Config::parse("[batch]\nflaten = true\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_report_format() {
        assert!(Config::parse("[batch]\nreport_format = \"pdf\"\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hpra-json.toml");
        fs::write(&path, "[batch]\nno_report = true\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().batch.no_report, Some(true));

        let missing = Config::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
