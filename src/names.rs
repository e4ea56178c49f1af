//! XML name utilities
//!
//! Tag and attribute names reach the converters exactly as written in the
//! source document, so `ns:Product` and `Product` are different strings.
//! The helpers here reduce them to their local part.

/// Return the local part of an XML name.
///
/// Two forms are recognised:
/// - Clark notation `{uri}local`, split at the first `}`
/// - prefixed names `prefix:local`, split at the first `:`
///
/// A name with no delimiter, or a `{` with no closing `}`, is returned
/// unchanged.
pub fn local_name(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix('{') {
        return match rest.split_once('}') {
            Some((_, local)) => local,
            None => name,
        };
    }

    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

/// Check whether an attribute name is a namespace declaration
pub fn is_xmlns_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_plain() {
        assert_eq!(local_name("Product"), "Product");
        assert_eq!(local_name(""), "");
    }

    #[test]
    fn test_local_name_prefixed() {
        assert_eq!(local_name("hpra:Product"), "Product");
        assert_eq!(local_name("xsi:noNamespaceSchemaLocation"), "noNamespaceSchemaLocation");
    }

    #[test]
    fn test_local_name_first_delimiter_only() {
        assert_eq!(local_name("a:b:c"), "b:c");
        assert_eq!(local_name("{urn:x}{y}z"), "{y}z");
    }

    #[test]
    fn test_local_name_clark() {
        assert_eq!(local_name("{http://example.com/ns}Product"), "Product");
        assert_eq!(local_name("{}Product"), "Product");
    }

    #[test]
    fn test_local_name_malformed_clark_unchanged() {
        assert_eq!(local_name("{http://example.com/ns"), "{http://example.com/ns");
    }

    #[test]
    fn test_xmlns_declaration() {
        assert!(is_xmlns_declaration("xmlns"));
        assert!(is_xmlns_declaration("xmlns:xsi"));
        assert!(!is_xmlns_declaration("xmlnsfoo"));
        assert!(!is_xmlns_declaration("id"));
    }
}
