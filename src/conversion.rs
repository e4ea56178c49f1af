//! Single-file conversion
//!
//! Reads one XML file, writes its JSON counterpart and reports what
//! happened. Errors never escape: they are folded into the returned
//! [`ConversionResult`] so a batch can carry on with the next file.

use log::debug;
use std::fs;
use std::path::Path;

use crate::converters::Converter;
use crate::documents::Document;
use crate::error::{Error, Result};
use crate::integrity::{create_checksum_record, FileChecksum, FileType};

/// Warning attached to conversions that found no entities
pub const NO_RECORDS_WARNING: &str = "No products found in XML file";

/// Result of converting an XML file to JSON
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    /// Whether the JSON file was written
    pub success: bool,
    /// Number of records in the output
    pub records_processed: usize,
    /// Set when the conversion succeeded but looks suspicious
    pub warning_message: Option<String>,
    /// Set when the conversion failed
    pub error_message: Option<String>,
    /// Digest record of the source file
    pub input_checksum: Option<FileChecksum>,
    /// Digest record of the written file
    pub output_checksum: Option<FileChecksum>,
}

impl ConversionResult {
    /// Build a failed result from an error.
    ///
    /// Malformed XML is reported as a parse error; anything else is
    /// reported as unexpected.
    pub fn failed(err: &Error) -> Self {
        let message = if err.is_parse_error() {
            format!("XML parse error: {}", err)
        } else {
            format!("Unexpected error: {}", err)
        };
        Self {
            success: false,
            error_message: Some(message),
            ..Default::default()
        }
    }

    /// SHA-256 of the source file, if computed
    pub fn input_sha256(&self) -> Option<&str> {
        self.input_checksum.as_ref().map(|c| c.sha256_hash.as_str())
    }

    /// SHA-256 of the written file, if computed
    pub fn output_sha256(&self) -> Option<&str> {
        self.output_checksum.as_ref().map(|c| c.sha256_hash.as_str())
    }

    /// Both digest records, when checksums were computed
    pub fn checksums(&self) -> Vec<FileChecksum> {
        self.input_checksum
            .iter()
            .chain(self.output_checksum.iter())
            .cloned()
            .collect()
    }
}

/// Convert an XML file to JSON using the converter's configuration
pub fn convert_xml_to_json(input: &Path, output: &Path, converter: &Converter) -> ConversionResult {
    match try_convert(input, output, converter) {
        Ok(result) => result,
        Err(err) => {
            debug!("conversion of {} failed: {}", input.display(), err);
            ConversionResult::failed(&err)
        }
    }
}

fn try_convert(input: &Path, output: &Path, converter: &Converter) -> Result<ConversionResult> {
    let config = converter.config();

    let input_checksum = if config.checksums() {
        Some(create_checksum_record(input, FileType::Input, None)?)
    } else {
        None
    };

    let document = Document::from_file(input, config.limits())?;
    let converted = converter.convert(&document);
    let records_processed = converter.record_count(&converted);
    debug!(
        "{}: {} record(s) in {:?} mode",
        input.display(),
        records_processed,
        config.mode()
    );

    fs::write(output, converted.to_json_string(config.indent())?)?;

    let output_checksum = if config.checksums() {
        Some(create_checksum_record(output, FileType::Output, None)?)
    } else {
        None
    };

    let warning_message = (records_processed == 0).then(|| NO_RECORDS_WARNING.to_string());

    Ok(ConversionResult {
        success: true,
        records_processed,
        warning_message,
        error_message: None,
        input_checksum,
        output_checksum,
    })
}
