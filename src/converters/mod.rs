//! XML to JSON converters
//!
//! Conversion happens in two stages:
//! - [`normalize`] turns an element tree into a [`NormalizedValue`]
//!   (scalars, maps grouped by local name, lists for repeated names)
//! - [`flatten_document`] / [`flatten_value`] collapse that tree into
//!   [`FlatRecord`]s keyed by dotted paths
//!
//! [`Converter`] runs both stages according to a [`ConverterConfig`].

mod base;
mod flatten;
mod normalize;
mod value;

pub use base::{parse_document, Converted, Converter, ConverterConfig, OutputMode};
pub use flatten::{
    flatten_document, flatten_value, EntityContainer, FlatRecord, FlatValue, Flattened, SEPARATOR,
};
pub use normalize::normalize;
pub use value::{NormalizedValue, ValueMap, ATTRIBUTES_KEY, VALUE_KEY};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;
    use proptest::prelude::*;
    use std::collections::HashSet;

    /// Arbitrary normalized trees with keys drawn from a small alphabet,
    /// so that sibling names repeat often
    fn arb_value() -> impl Strategy<Value = NormalizedValue> {
        let leaf = prop_oneof![
            "[a-z]{0,3}".prop_map(NormalizedValue::Scalar),
            Just(NormalizedValue::Absent),
        ];
        leaf.prop_recursive(4, 48, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(NormalizedValue::List),
                prop::collection::vec(("[a-c]", inner), 1..4)
                    .prop_map(|entries| entries.into_iter().collect::<NormalizedValue>()),
            ]
        })
    }

    /// Every leaf reached by a distinct path, rendered the way the flattener
    /// would key it
    fn leaf_paths(value: &NormalizedValue, prefix: &str, out: &mut Vec<String>) {
        match value {
            NormalizedValue::Map(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    leaf_paths(child, &path, out);
                }
            }
            NormalizedValue::List(items)
                if !prefix.is_empty() && items.iter().all(NormalizedValue::is_scalar) =>
            {
                out.push(prefix.to_string());
            }
            NormalizedValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    leaf_paths(item, &format!("{}[{}]", prefix, i), out);
                }
            }
            _ if !prefix.is_empty() => out.push(prefix.to_string()),
            _ => {}
        }
    }

    /// XML for a small sibling-heavy tree of the given depth
    fn synthetic_xml(depth: usize, fanout: usize) -> String {
        fn build(depth: usize, fanout: usize, out: &mut String) {
            for i in 0..fanout {
                let name = if i % 2 == 0 { "Even" } else { "Odd" };
                out.push_str(&format!("<{} n=\"{}\">", name, i));
                if depth == 0 {
                    out.push_str(&format!("v{}", i));
                } else {
                    build(depth - 1, fanout, out);
                }
                out.push_str(&format!("</{}>", name));
            }
        }
        let mut out = String::from("<Root>");
        build(depth, fanout, &mut out);
        out.push_str("</Root>");
        out
    }

    proptest! {
        #[test]
        fn flatten_paths_never_collide(value in arb_value()) {
            let mut paths = Vec::new();
            leaf_paths(&value, "", &mut paths);
            let unique: HashSet<_> = paths.iter().collect();
            // Distinct traversal paths only collide through keys that
            // themselves contain separators, which the generator never emits
            prop_assert_eq!(unique.len(), paths.len());

            let flat = flatten_value(&value, "");
            prop_assert_eq!(flat.len(), paths.len());
        }

        #[test]
        fn reflattening_is_identity(value in arb_value()) {
            let once = flatten_value(&value, "");
            let twice = flatten_value(&NormalizedValue::from(once.clone()), "");
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn json_round_trip(value in arb_value()) {
            let json = serde_json::to_string(&value).unwrap();
            let back: NormalizedValue = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, value);
        }

        #[test]
        fn each_product_gets_container_attributes(n in 1usize..20, attrs in 0usize..4) {
            let attr_text: String = (0..attrs).map(|i| format!(" a{}=\"{}\"", i, i)).collect();
            let products: String = (0..n).map(|i| format!("<Product><Code>{}</Code></Product>", i)).collect();
            let xml = format!("<Products{}>{}</Products>", attr_text, products);
            let doc = Document::from_string(&xml).unwrap();
            let flat = flatten_document(&parse_document(&doc), &EntityContainer::default());
            let Flattened::Records(records) = flat else {
                return Err(TestCaseError::fail("expected records"));
            };
            prop_assert_eq!(records.len(), n);
            for (i, record) in records.iter().enumerate() {
                prop_assert_eq!(record.get("Code"), Some(&FlatValue::Scalar(i.to_string())));
                for a in 0..attrs {
                    let key = format!("Products.attributes.a{}", a);
                    prop_assert_eq!(record.get(&key), Some(&FlatValue::Scalar(a.to_string())));
                }
            }
        }
    }

    #[test]
    fn synthetic_trees_flatten_without_collisions() {
        for (depth, fanout) in [(1, 5), (3, 3), (4, 4)] {
            let doc = Document::from_string(&synthetic_xml(depth, fanout)).unwrap();
            let data = parse_document(&doc);
            let mut paths = Vec::new();
            leaf_paths(&data, "", &mut paths);
            let flat = flatten_value(&data, "");
            let keys: HashSet<_> = flat.keys().collect();
            assert_eq!(keys.len(), flat.len());
            assert_eq!(flat.len(), paths.len());
        }
    }
}
