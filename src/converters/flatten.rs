//! Flattener
//!
//! Collapses a [`NormalizedValue`] tree into single-level records keyed by
//! dotted paths. Lists of scalars stay whole; lists holding structure are
//! indexed as `key[i]`. Attribute values are always terminal.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::value::{NormalizedValue, ValueMap, ATTRIBUTES_KEY};

/// Path separator between nested keys
pub const SEPARATOR: char = '.';

/// Value stored under one flattened key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatValue {
    /// An absent leaf
    Null,
    /// A single scalar
    Scalar(String),
    /// An array of scalars kept as one cell
    List(Vec<String>),
}

impl FlatValue {
    /// Get the scalar text, if this is a scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlatValue::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FlatValue {
    fn from(text: &str) -> Self {
        FlatValue::Scalar(text.to_string())
    }
}

impl From<FlatValue> for NormalizedValue {
    fn from(value: FlatValue) -> Self {
        match value {
            FlatValue::Null => NormalizedValue::Absent,
            FlatValue::Scalar(s) => NormalizedValue::Scalar(s),
            FlatValue::List(items) => {
                NormalizedValue::List(items.into_iter().map(NormalizedValue::Scalar).collect())
            }
        }
    }
}

impl Serialize for FlatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FlatValue::Null => serializer.serialize_none(),
            FlatValue::Scalar(s) => serializer.serialize_str(s),
            FlatValue::List(items) => {
                let mut state = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    state.serialize_element(item)?;
                }
                state.end()
            }
        }
    }
}

/// A single-level record of path keys to flat values, in insertion order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlatRecord {
    entries: IndexMap<String, FlatValue>,
}

impl FlatRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under the same key
    pub fn insert(&mut self, key: impl Into<String>, value: FlatValue) {
        self.entries.insert(key.into(), value);
    }

    /// Get the value stored under a key
    pub fn get(&self, key: &str) -> Option<&FlatValue> {
        self.entries.get(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the record has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, FlatValue)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (K, FlatValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<FlatRecord> for NormalizedValue {
    /// Rebuild a one-level map whose keys are the flattened paths
    fn from(record: FlatRecord) -> Self {
        NormalizedValue::Map(
            record
                .entries
                .into_iter()
                .map(|(k, v)| (k, NormalizedValue::from(v)))
                .collect(),
        )
    }
}

impl Serialize for FlatRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            state.serialize_entry(key, value)?;
        }
        state.end()
    }
}

/// The container/item key pair that marks a repeated-entity collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityContainer {
    /// Key of the collection element, looked up in the document map
    pub container: String,
    /// Key of each entity inside the collection
    pub item: String,
}

impl Default for EntityContainer {
    fn default() -> Self {
        Self::new("Products", "Product")
    }
}

impl EntityContainer {
    /// Create a container/item pair
    pub fn new(container: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            item: item.into(),
        }
    }

    /// Find the collection in a document map and return its items.
    ///
    /// Returns `None` when the document does not have the container/item
    /// shape. A single item is returned as a one-element slice.
    pub fn items<'a>(&self, document: &'a NormalizedValue) -> Option<&'a [NormalizedValue]> {
        let section = document.get(&self.container)?;
        match section.get(&self.item)? {
            NormalizedValue::List(items) => Some(items),
            NormalizedValue::Absent => Some(&[]),
            single => Some(std::slice::from_ref(single)),
        }
    }

    /// Number of entities in the document, zero when the shape is missing
    pub fn count(&self, document: &NormalizedValue) -> usize {
        self.items(document).map_or(0, <[NormalizedValue]>::len)
    }
}

/// Result of flattening a whole document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flattened {
    /// One record per entity of a repeated-entity collection
    Records(Vec<FlatRecord>),
    /// The whole document as one record
    Single(FlatRecord),
}

impl Flattened {
    /// Number of records produced
    pub fn record_count(&self) -> usize {
        match self {
            Flattened::Records(records) => records.len(),
            Flattened::Single(_) => 1,
        }
    }
}

impl Serialize for Flattened {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Flattened::Records(records) => records.serialize(serializer),
            Flattened::Single(record) => record.serialize(serializer),
        }
    }
}

/// Flatten a document map (root local name -> normalized root).
///
/// When the document holds `container` wrapping `item`, each item becomes
/// its own record and the container's attributes are copied into every
/// record as `<container>.attributes.<name>`. Any other shape is flattened
/// as a single record.
pub fn flatten_document(document: &NormalizedValue, entities: &EntityContainer) -> Flattened {
    let Some(items) = entities.items(document) else {
        return Flattened::Single(flatten_value(document, ""));
    };

    let container_attributes = document
        .get(&entities.container)
        .and_then(NormalizedValue::attributes);
    let attribute_prefix = format!("{}{}{}", entities.container, SEPARATOR, ATTRIBUTES_KEY);

    let records = items
        .iter()
        .map(|item| {
            let mut record = flatten_value(item, "");
            if let Some(attributes) = container_attributes {
                flatten_attributes(attributes, &attribute_prefix, &mut record);
            }
            record
        })
        .collect();

    Flattened::Records(records)
}

/// Flatten one value under a path prefix; an empty prefix means the root.
pub fn flatten_value(value: &NormalizedValue, prefix: &str) -> FlatRecord {
    let mut record = FlatRecord::new();
    flatten_into(value, prefix, &mut record);
    record
}

fn flatten_into(value: &NormalizedValue, prefix: &str, record: &mut FlatRecord) {
    match value {
        NormalizedValue::Map(map) => {
            for (key, child) in map {
                match child {
                    NormalizedValue::Map(attributes) if key == ATTRIBUTES_KEY => {
                        flatten_attributes(attributes, &join(prefix, ATTRIBUTES_KEY), record);
                    }
                    _ => flatten_into(child, &join(prefix, key), record),
                }
            }
        }
        NormalizedValue::List(items) if prefix.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(item, &format!("[{}]", index), record);
            }
        }
        NormalizedValue::List(items) => match scalar_items(items) {
            Some(scalars) => record.insert(prefix, FlatValue::List(scalars)),
            None => {
                for (index, item) in items.iter().enumerate() {
                    flatten_into(item, &format!("{}[{}]", prefix, index), record);
                }
            }
        },
        NormalizedValue::Scalar(s) if !prefix.is_empty() => {
            record.insert(prefix, FlatValue::Scalar(s.clone()));
        }
        NormalizedValue::Absent if !prefix.is_empty() => {
            record.insert(prefix, FlatValue::Null);
        }
        NormalizedValue::Scalar(_) | NormalizedValue::Absent => {}
    }
}

/// Copy attributes under `prefix.<name>` without expanding them further
fn flatten_attributes(attributes: &ValueMap, prefix: &str, record: &mut FlatRecord) {
    for (name, value) in attributes {
        let key = join(prefix, name);
        match value {
            NormalizedValue::Scalar(s) => record.insert(key, FlatValue::Scalar(s.clone())),
            NormalizedValue::Absent => record.insert(key, FlatValue::Null),
            // Only reachable for hand-built trees
            nested => flatten_into(nested, &key, record),
        }
    }
}

fn scalar_items(items: &[NormalizedValue]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}{}{}", prefix, SEPARATOR, key)
    }
}
