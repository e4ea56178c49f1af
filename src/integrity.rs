//! File integrity checksums for audit trails
//!
//! SHA-256 digests of input and output files, plus a CSV ledger that can be
//! appended to across runs and re-read for verification.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader};
use std::path::Path;

use crate::error::{Error, Result};

/// Timestamp layout used in the ledger
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which side of a conversion a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Source XML
    Input,
    /// Written JSON
    Output,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Input => write!(f, "input"),
            FileType::Output => write!(f, "output"),
        }
    }
}

/// Checksum information for a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChecksum {
    /// File name without directory
    pub filename: String,
    /// Input or output
    pub file_type: FileType,
    /// Lowercase hex SHA-256 digest
    pub sha256_hash: String,
    /// Size in bytes
    pub file_size: u64,
    /// When the digest was taken
    pub timestamp: NaiveDateTime,
    /// Path relative to the base directory, if one was given
    pub relative_path: Option<String>,
}

/// One ledger line, in column order
#[derive(Debug, Serialize, Deserialize)]
struct LedgerRow {
    timestamp: String,
    filename: String,
    file_type: FileType,
    sha256_hash: String,
    file_size_bytes: u64,
    #[serde(default)]
    relative_path: Option<String>,
}

impl From<&FileChecksum> for LedgerRow {
    fn from(checksum: &FileChecksum) -> Self {
        Self {
            timestamp: checksum.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            filename: checksum.filename.clone(),
            file_type: checksum.file_type,
            sha256_hash: checksum.sha256_hash.clone(),
            file_size_bytes: checksum.file_size,
            relative_path: Some(
                checksum
                    .relative_path
                    .clone()
                    .unwrap_or_else(|| checksum.filename.clone()),
            ),
        }
    }
}

impl TryFrom<LedgerRow> for FileChecksum {
    type Error = Error;

    fn try_from(row: LedgerRow) -> Result<Self> {
        let timestamp = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| Error::Integrity(format!("bad timestamp '{}': {}", row.timestamp, e)))?;

        Ok(Self {
            filename: row.filename,
            file_type: row.file_type,
            sha256_hash: row.sha256_hash,
            file_size: row.file_size_bytes,
            timestamp,
            relative_path: row.relative_path.filter(|p| !p.is_empty()),
        })
    }
}

/// Calculate the SHA-256 digest of a file as lowercase hex
pub fn calculate_sha256(path: impl AsRef<Path>) -> Result<String> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate the SHA-256 digest of a byte slice as lowercase hex
pub fn sha256_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Create a checksum record for a file.
///
/// With a base directory, the record's relative path is the file's path
/// below it, or just the file name when the file lies elsewhere.
pub fn create_checksum_record(
    path: impl AsRef<Path>,
    file_type: FileType,
    base_dir: Option<&Path>,
) -> Result<FileChecksum> {
    let path = path.as_ref();
    let sha256_hash = calculate_sha256(path)?;
    let file_size = path.metadata()?.len();
    let filename = file_name(path);

    let relative_path = base_dir.map(|base| match path.strip_prefix(base) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => filename.clone(),
    });

    Ok(FileChecksum {
        filename,
        file_type,
        sha256_hash,
        file_size,
        timestamp: Local::now().naive_local(),
        relative_path,
    })
}

/// Write checksum records to a CSV ledger.
///
/// When appending to an existing ledger the header is not repeated.
pub fn write_checksums_csv(
    checksums: &[FileChecksum],
    ledger: impl AsRef<Path>,
    append: bool,
) -> Result<()> {
    let ledger = ledger.as_ref();
    let write_header = !(append && ledger.exists());

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(ledger)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);

    for checksum in checksums {
        writer.serialize(LedgerRow::from(checksum))?;
    }
    writer.flush()?;

    Ok(())
}

/// Load checksum records from a CSV ledger
pub fn load_checksums_csv(ledger: impl AsRef<Path>) -> Result<Vec<FileChecksum>> {
    let mut reader = csv::Reader::from_path(ledger.as_ref())?;
    reader
        .deserialize::<LedgerRow>()
        .map(|row| FileChecksum::try_from(row?))
        .collect()
}

/// Check a file against an expected digest (hex, case-insensitive)
pub fn verify_file_integrity(path: impl AsRef<Path>, expected_hash: &str) -> Result<bool> {
    let actual = calculate_sha256(path)?;
    Ok(actual.eq_ignore_ascii_case(expected_hash))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
