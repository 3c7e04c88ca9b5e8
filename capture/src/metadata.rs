//! Client metadata tree and its flattening into compound keys.
//!
//! The user-agent parser produces a nested tree (browser, engine, os, ...).
//! Before being merged into an event record it is flattened so that
//! `{"browser": {"name": "Chrome"}}` becomes `{"browser_name": "Chrome"}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Joins the path segments of a leaf into its flat key.
pub const KEY_SEPARATOR: char = '_';

/// Flat mapping from compound key to leaf value.
pub type FlatMetadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Kept as a single leaf, never recursed into.
    List(Vec<Value>),
    /// Children iterate in sorted key order.
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, MetadataValue)>,
    {
        MetadataValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn empty() -> Self {
        MetadataValue::Map(BTreeMap::new())
    }

    pub fn to_json(&self) -> Value {
        match self {
            MetadataValue::Null => Value::Null,
            MetadataValue::Bool(b) => Value::Bool(*b),
            MetadataValue::Number(n) => Value::Number(n.clone()),
            MetadataValue::String(s) => Value::String(s.clone()),
            MetadataValue::List(items) => Value::Array(items.clone()),
            MetadataValue::Map(children) => Value::Object(
                children
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl<T: Into<MetadataValue>> From<Option<T>> for MetadataValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(MetadataValue::Null, Into::into)
    }
}

/// Flattens a metadata tree into a single-level mapping.
///
/// Every leaf is keyed by its path from the root, joined with [`KEY_SEPARATOR`].
/// A root that is not a map holds no named leaves and flattens to an empty
/// mapping.
///
/// Children are visited in sorted key order (maps are [`BTreeMap`]s), so when
/// two paths join to the same key the leaf whose path sorts last wins, e.g.
/// `{"a_b": 1, "a": {"b": 2}}` flattens to `{"a_b": 1}`. The outcome does not
/// depend on the order in which the tree was built.
pub fn flatten(tree: &MetadataValue) -> FlatMetadata {
    let mut flat = FlatMetadata::new();
    if let MetadataValue::Map(children) = tree {
        flatten_into(children, "", &mut flat);
    }
    flat
}

fn flatten_into(children: &BTreeMap<String, MetadataValue>, prefix: &str, out: &mut FlatMetadata) {
    for (name, value) in children {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}{KEY_SEPARATOR}{name}")
        };

        match value {
            MetadataValue::Map(nested) => flatten_into(nested, &key, out),
            leaf => {
                out.insert(key, leaf.to_json());
            }
        }
    }
}
