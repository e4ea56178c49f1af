//! Tree normalizer
//!
//! Turns an element tree into a [`NormalizedValue`], bottom-up:
//! - a bare text leaf becomes a scalar, an empty leaf becomes absent
//! - attributes go under `attributes`, keyed by local name
//! - children are grouped by local name; a name seen once maps to its value,
//!   a repeated name maps to a list of all surviving values
//! - text next to attributes or children goes under `value`
//! - a map whose only entry repeats the element's own name is unwrapped

use indexmap::IndexMap;
use log::trace;

use super::value::{NormalizedValue, ValueMap, ATTRIBUTES_KEY, VALUE_KEY};
use crate::documents::Element;
use crate::names::local_name;

/// Normalize an element and its subtree.
pub fn normalize(element: &Element) -> NormalizedValue {
    let tag = element.local_name();
    let text = element.text().trim();

    if element.children().is_empty() && element.attributes().is_empty() {
        return scalar_or_absent(text);
    }

    let mut result = ValueMap::new();

    if !element.attributes().is_empty() {
        let attributes: ValueMap = element
            .attributes()
            .iter()
            .map(|(name, value)| (local_name(name).to_string(), NormalizedValue::scalar(value.as_str())))
            .collect();
        result.insert(ATTRIBUTES_KEY.to_string(), NormalizedValue::Map(attributes));
    }

    let mut grouped: IndexMap<&str, Vec<NormalizedValue>> = IndexMap::new();
    for child in element.children() {
        let value = normalize(child);
        if value.is_absent() {
            trace!("dropping empty <{}> under <{}>", child.name(), element.name());
            continue;
        }
        grouped.entry(child.local_name()).or_default().push(value);
    }

    for (name, mut values) in grouped {
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            NormalizedValue::List(values)
        };
        result.insert(name.to_string(), value);
    }

    if !text.is_empty() {
        if result.is_empty() {
            return NormalizedValue::scalar(text);
        }
        result.insert(VALUE_KEY.to_string(), NormalizedValue::scalar(text));
    }

    if result.is_empty() {
        return NormalizedValue::Absent;
    }

    collapse_self_named(tag, result)
}

fn scalar_or_absent(text: &str) -> NormalizedValue {
    if text.is_empty() {
        NormalizedValue::Absent
    } else {
        NormalizedValue::scalar(text)
    }
}

/// Unwrap `{tag: inner}` to `inner` when `tag` is the element's own name.
///
/// Only applies to a map with exactly one entry and neither reserved key.
fn collapse_self_named(tag: &str, mut map: ValueMap) -> NormalizedValue {
    if map.len() == 1 && !map.contains_key(ATTRIBUTES_KEY) && !map.contains_key(VALUE_KEY) {
        if let Some(inner) = map.shift_remove(tag) {
            return inner;
        }
    }
    NormalizedValue::Map(map)
}
