//! Normalized value model
//!
//! The canonical in-memory form of an XML subtree. Every consumer (the JSON
//! writer, the flattener) matches over the same four variants.

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

/// Reserved map key holding an element's attributes
pub const ATTRIBUTES_KEY: &str = "attributes";

/// Reserved map key holding the text of an element that also has structure
pub const VALUE_KEY: &str = "value";

/// Ordered map of normalized values, keyed by local name
pub type ValueMap = IndexMap<String, NormalizedValue>;

/// Normalized representation of an XML subtree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NormalizedValue {
    /// No information; serialized as `null`
    #[default]
    Absent,
    /// Trimmed text content or an attribute value
    Scalar(String),
    /// Children grouped by local name, plus the reserved keys
    Map(ValueMap),
    /// All instances of a repeated sibling name, in document order
    List(Vec<NormalizedValue>),
}

impl NormalizedValue {
    /// Create a scalar value
    pub fn scalar(text: impl Into<String>) -> Self {
        NormalizedValue::Scalar(text.into())
    }

    /// Check if this value carries no information
    pub fn is_absent(&self) -> bool {
        matches!(self, NormalizedValue::Absent)
    }

    /// Check if this value is a scalar
    pub fn is_scalar(&self) -> bool {
        matches!(self, NormalizedValue::Scalar(_))
    }

    /// Get the scalar text, if this is a scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NormalizedValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Get the map, if this is a map
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            NormalizedValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get the list items, if this is a list
    pub fn as_list(&self) -> Option<&[NormalizedValue]> {
        match self {
            NormalizedValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key, if this is a map
    pub fn get(&self, key: &str) -> Option<&NormalizedValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Get the attribute map of this value, if present
    pub fn attributes(&self) -> Option<&ValueMap> {
        self.get(ATTRIBUTES_KEY).and_then(NormalizedValue::as_map)
    }
}

impl From<&str> for NormalizedValue {
    fn from(text: &str) -> Self {
        NormalizedValue::Scalar(text.to_string())
    }
}

impl From<String> for NormalizedValue {
    fn from(text: String) -> Self {
        NormalizedValue::Scalar(text)
    }
}

impl From<ValueMap> for NormalizedValue {
    fn from(map: ValueMap) -> Self {
        NormalizedValue::Map(map)
    }
}

impl From<Vec<NormalizedValue>> for NormalizedValue {
    fn from(items: Vec<NormalizedValue>) -> Self {
        NormalizedValue::List(items)
    }
}

impl<K: Into<String>> FromIterator<(K, NormalizedValue)> for NormalizedValue {
    fn from_iter<I: IntoIterator<Item = (K, NormalizedValue)>>(iter: I) -> Self {
        NormalizedValue::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for NormalizedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NormalizedValue::Absent => serializer.serialize_none(),
            NormalizedValue::Scalar(s) => serializer.serialize_str(s),
            NormalizedValue::Map(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    state.serialize_entry(key, value)?;
                }
                state.end()
            }
            NormalizedValue::List(items) => {
                let mut state = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    state.serialize_element(item)?;
                }
                state.end()
            }
        }
    }
}

struct NormalizedValueVisitor;

impl<'de> Visitor<'de> for NormalizedValueVisitor {
    type Value = NormalizedValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, null, array or object")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(NormalizedValue::Absent)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(NormalizedValue::Absent)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        NormalizedValue::deserialize(deserializer)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(NormalizedValue::Scalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(NormalizedValue::Scalar(v))
    }

    // Scalars from hand-edited JSON are accepted as their text form
    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(NormalizedValue::Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(NormalizedValue::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(NormalizedValue::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(NormalizedValue::Scalar(v.to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(NormalizedValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = ValueMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, NormalizedValue>()? {
            map.insert(key, value);
        }
        Ok(NormalizedValue::Map(map))
    }
}

impl<'de> Deserialize<'de> for NormalizedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NormalizedValueVisitor)
    }
}
