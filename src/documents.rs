//! XML document loading
//!
//! This module parses XML bytes into a plain element tree. Names are kept
//! exactly as written (prefixes included) and attribute order follows the
//! source; the converters decide what to do with both.

use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::names::is_xmlns_declaration;
use encoding_rs::{UTF_16BE, UTF_16LE};
use quick_xml::encoding::detect_encoding;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;

/// XML Element in the document tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Element name as written, possibly prefixed
    pub name: String,
    /// Attributes in document order, namespace declarations excluded
    pub attributes: Vec<(String, String)>,
    /// Character data appearing before the first child element
    pub text: String,
    /// Child elements in document order
    pub children: Vec<Element>,
}

impl Element {
    /// Create a new element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get the element name as written
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the element name without its namespace prefix
    pub fn local_name(&self) -> &str {
        crate::names::local_name(&self.name)
    }

    /// Get the leading text content
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Get the attributes
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Get the child elements
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append character data, unless a child element has already been seen
    fn push_text(&mut self, text: &str) {
        if self.children.is_empty() {
            self.text.push_str(text);
        }
    }
}

/// XML Document representation
#[derive(Debug)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
}

impl Document {
    /// Get the root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Load and parse an XML document from a file
    pub fn from_file(path: impl AsRef<Path>, limits: &Limits) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::parse_with_limits(&bytes, limits)
    }

    /// Parse an XML document from a string.
    ///
    /// The text is already decoded, so any `encoding` in the XML
    /// declaration is ignored.
    pub fn from_string(xml: &str) -> Result<Self> {
        let limits = Limits::default();
        limits.check_xml_size(xml.len())?;
        Self::read_tree(Reader::from_str(xml), &limits)
    }

    /// Parse an XML document from bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from bytes, enforcing the given limits.
    ///
    /// The encoding comes from the byte order mark or the XML declaration,
    /// defaulting to UTF-8. UTF-16 input is transcoded before parsing;
    /// other ASCII-compatible encodings are decoded as they are read.
    pub fn parse_with_limits(xml: &[u8], limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        match detect_encoding(xml) {
            Some((encoding, bom_len)) if encoding == UTF_16LE || encoding == UTF_16BE => {
                let text = encoding
                    .decode_without_bom_handling_and_without_replacement(&xml[bom_len..])
                    .ok_or_else(|| ParseError::new(format!("malformed {} input", encoding.name())))?;
                Self::read_tree(Reader::from_str(&text), limits)
            }
            _ => Self::read_tree(Reader::from_reader(xml), limits),
        }
    }

    fn read_tree(mut reader: Reader<&[u8]>, limits: &Limits) -> Result<Self> {
        reader.check_end_names(true);

        let mut root: Option<Element> = None;
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let position = reader.buffer_position();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    Self::ensure_single_root(&root, &element_stack, position)?;
                    limits.check_xml_depth(element_stack.len() + 1)?;
                    let element = Self::parse_element(&e, &reader, limits, position)?;
                    element_stack.push(element);
                }
                Ok(Event::End(_)) => {
                    let current = element_stack.pop().ok_or_else(|| {
                        ParseError::new("closing tag without matching opening tag")
                            .with_position(position)
                    })?;
                    match element_stack.last_mut() {
                        Some(parent) => parent.add_child(current),
                        None => root = Some(current),
                    }
                }
                Ok(Event::Empty(e)) => {
                    Self::ensure_single_root(&root, &element_stack, position)?;
                    limits.check_xml_depth(element_stack.len() + 1)?;
                    let element = Self::parse_element(&e, &reader, limits, position)?;
                    match element_stack.last_mut() {
                        Some(parent) => parent.add_child(element),
                        None => root = Some(element),
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| {
                        ParseError::new(format!("invalid character data: {}", err))
                            .with_position(position)
                    })?;
                    match element_stack.last_mut() {
                        Some(current) => current.push_text(&text),
                        None if !text.trim().is_empty() => {
                            return Err(ParseError::new("text outside of the root element")
                                .with_position(position)
                                .into())
                        }
                        None => {}
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = reader.decoder().decode(&e).map_err(|err| {
                        ParseError::new(format!("invalid CDATA section: {}", err))
                            .with_position(position)
                    })?;
                    match element_stack.last_mut() {
                        Some(current) => current.push_text(&text),
                        None => {
                            return Err(ParseError::new("CDATA outside of the root element")
                                .with_position(position)
                                .into())
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ParseError::new(e.to_string())
                        .with_position(reader.buffer_position())
                        .into())
                }
                _ => {} // Ignore comments, processing instructions, declarations
            }
            buf.clear();
        }

        if let Some(open) = element_stack.last() {
            return Err(ParseError::new(format!("unclosed element '{}'", open.name))
                .with_position(reader.buffer_position())
                .into());
        }

        let root = root.ok_or_else(|| ParseError::new("no element found"))?;
        Ok(Document { root })
    }

    fn ensure_single_root(
        root: &Option<Element>,
        element_stack: &[Element],
        position: usize,
    ) -> Result<()> {
        if root.is_some() && element_stack.is_empty() {
            return Err(ParseError::new("junk after document element")
                .with_position(position)
                .into());
        }
        Ok(())
    }

    /// Parse element from BytesStart event
    fn parse_element(
        start: &BytesStart,
        reader: &Reader<&[u8]>,
        limits: &Limits,
        position: usize,
    ) -> Result<Element> {
        let decoder = reader.decoder();
        let name = decoder
            .decode(start.name().as_ref())
            .map_err(|e| ParseError::new(format!("invalid element name: {}", e)).with_position(position))?
            .into_owned();

        let mut element = Element::new(name);

        for attr_result in start.attributes() {
            let attr = attr_result.map_err(|e| {
                ParseError::new(format!("failed to parse attribute: {}", e)).with_position(position)
            })?;

            let attr_name = decoder.decode(attr.key.as_ref()).map_err(|e| {
                ParseError::new(format!("invalid attribute name: {}", e)).with_position(position)
            })?;

            if is_xmlns_declaration(&attr_name) {
                continue;
            }

            let attr_value = attr
                .decode_and_unescape_value(reader)
                .map_err(|e| {
                    ParseError::new(format!("failed to unescape attribute value: {}", e))
                        .with_position(position)
                })?
                .to_string();

            element.attributes.push((attr_name.into_owned(), attr_value));
        }

        limits.check_attributes(element.attributes.len())?;

        Ok(element)
    }
}

impl From<Element> for Document {
    fn from(root: Element) -> Self {
        Document { root }
    }
}

impl std::str::FromStr for Document {
    type Err = Error;

    fn from_str(xml: &str) -> Result<Self> {
        Self::from_string(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].local_name(), "child");
        assert_eq!(root.children[0].text(), "text");
    }

    #[test]
    fn test_parse_with_attributes_in_order() {
        let xml = r#"<root b="2" a="1"><child/></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root();
        assert_eq!(
            root.attributes(),
            &[("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn test_namespace_declarations_are_not_attributes() {
        let xml = r#"<p:root xmlns:p="urn:p" xmlns="urn:d" p:id="7"/>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root();
        assert_eq!(root.name(), "p:root");
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.attributes(), &[("p:id".to_string(), "7".to_string())]);
    }

    #[test]
    fn test_text_before_first_child_only() {
        let xml = r#"<root> lead <a/> tail </root>"#;
        let doc = Document::from_string(xml).unwrap();
        assert_eq!(doc.root().text(), " lead ");
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = r#"<root>A &amp; <![CDATA[<B>]]></root>"#;
        let doc = Document::from_string(xml).unwrap();
        assert_eq!(doc.root().text(), "A & <B>");
    }

    #[test]
    fn test_comments_are_skipped() {
        let xml = r#"<?xml version="1.0"?><!-- header --><root>a<!-- c -->b</root>"#;
        let doc = Document::from_string(xml).unwrap();
        assert_eq!(doc.root().text(), "ab");
    }

    #[test]
    fn test_bom_is_ignored() {
        let doc = Document::parse(b"\xEF\xBB\xBF<root/>").unwrap();
        assert_eq!(doc.root().name(), "root");
    }

    #[test]
    fn test_declared_latin1_encoding() {
        let xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\
            <Products><Product form=\"cr\xE8me\"><Name>Caf\xE9</Name></Product></Products>";
        let doc = Document::parse(xml).unwrap();

        let product = &doc.root().children()[0];
        assert_eq!(product.attributes(), &[("form".to_string(), "cr\u{e8}me".to_string())]);
        assert_eq!(product.children()[0].text(), "Caf\u{e9}");
    }

    #[test]
    fn test_windows_1252_element_names() {
        let xml = b"<?xml version=\"1.0\" encoding=\"windows-1252\"?><R\xE9sum\xE9>\x80</R\xE9sum\xE9>";
        let doc = Document::parse(xml).unwrap();
        assert_eq!(doc.root().name(), "R\u{e9}sum\u{e9}");
        assert_eq!(doc.root().text(), "\u{20ac}");
    }

    #[test]
    fn test_utf16_with_bom() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-16\"?><root a=\"\u{e9}\">\u{e9}t\u{e9}</root>";

        let mut le = vec![0xFF, 0xFE];
        le.extend(xml.encode_utf16().flat_map(u16::to_le_bytes));
        let doc = Document::parse(&le).unwrap();
        assert_eq!(doc.root().text(), "\u{e9}t\u{e9}");
        assert_eq!(doc.root().attributes(), &[("a".to_string(), "\u{e9}".to_string())]);

        let mut be = vec![0xFE, 0xFF];
        be.extend(xml.encode_utf16().flat_map(u16::to_be_bytes));
        let doc = Document::parse(&be).unwrap();
        assert_eq!(doc.root().text(), "\u{e9}t\u{e9}");
    }

    #[test]
    fn test_truncated_utf16_fails() {
        let err = Document::parse(&[0xFF, 0xFE, b'<', 0, b'a']).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_string_input_ignores_declared_encoding() {
        let xml = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><root>Caf\u{e9}</root>";
        let doc = Document::from_string(xml).unwrap();
        assert_eq!(doc.root().text(), "Caf\u{e9}");
    }

    #[test]
    fn test_invalid_utf8_without_declaration_fails() {
        let err = Document::parse(b"<root>Caf\xE9</root>").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let err = Document::from_string("<root><a></b></root>").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_unclosed_element_fails() {
        let err = Document::from_string("<root><a>").unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn test_empty_document_fails() {
        let err = Document::from_string("   ").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_second_root_fails() {
        let err = Document::from_string("<a/><b/>").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_xml_depth: 2,
            ..Limits::default()
        };
        let err = Document::parse_with_limits(b"<a><b><c/></b></a>", &limits).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[test]
    fn test_element_builder() {
        let elem = Element::new("Product")
            .with_attribute("id", "1")
            .with_child(Element::new("Name").with_text("Aspirin"));

        assert_eq!(elem.local_name(), "Product");
        assert_eq!(elem.attributes(), &[("id".to_string(), "1".to_string())]);
        assert_eq!(elem.children()[0].text(), "Aspirin");
    }
}
