//! Converter configuration and the document-level converter
//!
//! This module ties the normalizer and flattener together: a parsed
//! [`Document`] goes in, a [`Converted`] value ready for JSON output comes
//! out.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::flatten::{flatten_document, EntityContainer, Flattened};
use super::normalize::normalize;
use super::value::NormalizedValue;
use crate::documents::Document;
use crate::error::{Error, Result};
use crate::limits::Limits;

/// Shape of the JSON output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Nested object mirroring the normalized tree
    #[default]
    Nested,
    /// Flat records suitable for spreadsheets and BI tools
    Flattened,
}

impl OutputMode {
    /// Pick the mode from a `--flatten` style switch
    pub fn from_flatten(flatten: bool) -> Self {
        if flatten {
            OutputMode::Flattened
        } else {
            OutputMode::Nested
        }
    }
}

/// Configuration for converters
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Output shape
    mode: OutputMode,
    /// Container/item pair used for record splitting and counting
    entities: EntityContainer,
    /// Whether to compute input/output digests
    checksums: bool,
    /// Spaces per indentation level in JSON output
    indent: usize,
    /// Limits applied when loading documents
    limits: Limits,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            entities: EntityContainer::default(),
            checksums: true,
            indent: 2,
            limits: Limits::default(),
        }
    }
}

impl ConverterConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the output mode
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Get the entity container pair
    pub fn entities(&self) -> &EntityContainer {
        &self.entities
    }

    /// Check if checksums should be computed
    pub fn checksums(&self) -> bool {
        self.checksums
    }

    /// Get indentation width
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Get the document loading limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Set output mode
    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the entity container pair
    pub fn with_entities(mut self, entities: EntityContainer) -> Self {
        self.entities = entities;
        self
    }

    /// Enable or disable checksums
    pub fn with_checksums(mut self, checksums: bool) -> Self {
        self.checksums = checksums;
        self
    }

    /// Set indentation
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set document loading limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// Output of a document conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converted {
    /// Nested document map, keyed by the root element's local name
    Nested(NormalizedValue),
    /// Flattened records or record
    Flat(Flattened),
}

impl Converted {
    /// Serialize as pretty-printed JSON with the given indentation
    pub fn to_json_string(&self, indent: usize) -> Result<String> {
        let indent = " ".repeat(indent);
        let mut out = Vec::new();
        let mut serializer =
            Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
        self.serialize(&mut serializer)?;
        String::from_utf8(out).map_err(|e| Error::Other(e.to_string()))
    }
}

impl Serialize for Converted {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Converted::Nested(value) => value.serialize(serializer),
            Converted::Flat(flat) => flat.serialize(serializer),
        }
    }
}

/// Normalize a whole document as `{ <root local name>: <normalized root> }`
pub fn parse_document(document: &Document) -> NormalizedValue {
    let root = document.root();
    NormalizedValue::from_iter([(root.local_name(), normalize(root))])
}

/// Document converter
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    /// Create a new converter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with configuration
    pub fn with_config(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert a parsed document according to the configured mode
    pub fn convert(&self, document: &Document) -> Converted {
        let data = parse_document(document);
        match self.config.mode {
            OutputMode::Nested => Converted::Nested(data),
            OutputMode::Flattened => {
                Converted::Flat(flatten_document(&data, &self.config.entities))
            }
        }
    }

    /// Number of records represented by a conversion.
    ///
    /// Flat output counts its records (a single record counts as one).
    /// Nested output counts the items of the entity collection.
    pub fn record_count(&self, converted: &Converted) -> usize {
        match converted {
            Converted::Nested(data) => self.config.entities.count(data),
            Converted::Flat(flat) => flat.record_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PRODUCTS: &str = r#"<Products id="42"><Product><Name>Aspirin</Name><Name>Bayer</Name></Product></Products>"#;

    #[test]
    fn test_converter_config_defaults() {
        let config = ConverterConfig::default();
        assert_eq!(config.mode(), OutputMode::Nested);
        assert_eq!(config.indent(), 2);
        assert!(config.checksums());
        assert_eq!(config.entities(), &EntityContainer::new("Products", "Product"));
    }

    #[test]
    fn test_output_mode_from_flag() {
        assert_eq!(OutputMode::from_flatten(true), OutputMode::Flattened);
        assert_eq!(OutputMode::from_flatten(false), OutputMode::Nested);
    }

    #[test]
    fn test_nested_json_is_keyed_by_root() {
        let doc = Document::from_string(PRODUCTS).unwrap();
        let converter = Converter::new();
        let converted = converter.convert(&doc);
        let json = converted.to_json_string(2).unwrap();
        let expected = r#"{
  "Products": {
    "attributes": {
      "id": "42"
    },
    "Product": {
      "Name": [
        "Aspirin",
        "Bayer"
      ]
    }
  }
}"#;
        assert_eq!(json, expected);
        assert_eq!(converter.record_count(&converted), 1);
    }

    #[test]
    fn test_flattened_json() {
        let doc = Document::from_string(PRODUCTS).unwrap();
        let converter =
            Converter::with_config(ConverterConfig::new().with_mode(OutputMode::Flattened));
        let converted = converter.convert(&doc);
        let value: serde_json::Value =
            serde_json::from_str(&converted.to_json_string(2).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "Name": ["Aspirin", "Bayer"], "Products.attributes.id": "42" }])
        );
        assert_eq!(converter.record_count(&converted), 1);
    }

    #[test]
    fn test_nested_round_trip() {
        let doc = Document::from_string(PRODUCTS).unwrap();
        let converted = Converter::new().convert(&doc);
        let json = converted.to_json_string(2).unwrap();
        let back: NormalizedValue = serde_json::from_str(&json).unwrap();
        assert_eq!(Converted::Nested(back), converted);
    }

    #[test]
    fn test_empty_root() {
        let doc = Document::from_string("<Products/>").unwrap();
        let converter = Converter::new();
        let converted = converter.convert(&doc);
        assert_eq!(converted.to_json_string(2).unwrap(), "{\n  \"Products\": null\n}");
        assert_eq!(converter.record_count(&converted), 0);
    }
}
