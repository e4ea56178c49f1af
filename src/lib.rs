//! # hpra-json
//!
//! Converts XML regulatory product exports to JSON.
//!
//! Each document becomes either a nested object that mirrors the XML tree,
//! or a list of flat records (one per repeated entity) with dot-joined
//! keys, ready for spreadsheets and BI tools.
//!
//! ## Features
//!
//! - Order-preserving XML to JSON normalization
//! - Namespace-agnostic keys (local names only)
//! - Flattening of repeated entities into flat records
//! - Batch conversion of a directory with a quality report (text or
//!   spreadsheet)
//! - SHA-256 digests of inputs and outputs with an appendable CSV ledger
//!
//! ## Example
//!
//! ```rust
//! use hpra_json::converters::{Converter, ConverterConfig, OutputMode};
//! use hpra_json::documents::Document;
//!
//! let doc = Document::from_string(
//!     r#"<Products date="2024"><Product><Name>A</Name></Product></Products>"#,
//! )?;
//!
//! let converter = Converter::with_config(
//!     ConverterConfig::new().with_mode(OutputMode::Flattened),
//! );
//! let json = converter.convert(&doc).to_json_string(2)?;
//! assert!(json.contains("\"Products.attributes.date\": \"2024\""));
//! # Ok::<(), hpra_json::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;
pub mod names;

// Document loading
pub mod documents;

// Conversion
pub mod converters;
pub mod conversion;
pub mod integrity;

// Batch processing
pub mod batch;
pub mod config;
pub mod report;

// Re-exports for convenience
pub use batch::{run_batch, Batch, BatchConfig, BatchOutcome};
pub use conversion::{convert_xml_to_json, ConversionResult};
pub use converters::{Converter, ConverterConfig, NormalizedValue, OutputMode};
pub use documents::{Document, Element};
pub use error::{Error, Result};

/// Version of the hpra-json library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
