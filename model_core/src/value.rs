//! # Value Tree
//!
//! The self-describing input representation handed over by a document reader.
//! A [`ValueNode`] is a tagged union comparable to a JSON/BSON value; a
//! [`Document`] is an ordered list of named entries.
//!
//! ## Reserved entries
//!
//! Names starting with `_` are reserved. The ones with a meaning here:
//!
//! - `_t` ([`TYPE_TAG`]) names the intended target type
//! - `_version` ([`VERSION_KEY`]) carries the schema version the document was written with
//! - `_v` ([`PAIRS_KEY`]) holds the `{k, v}` pair array of a keyed container
//!
//! ## Example
//!
//! ```rust
//! use model_core::value::{Document, ValueNode};
//!
//! let point = Document::tagged("Point")
//!     .with("X", 1.0)
//!     .with("Y", 2.0)
//!     .with("Z", 3.0);
//!
//! assert_eq!(point.type_tag_name().as_deref(), Some("Point"));
//! assert_eq!(point.fields().count(), 3);
//! let node = ValueNode::Map(point);
//! assert_eq!(node.kind_name(), "Map");
//! ```

use rust_decimal::Decimal;
use serde_json::Value as Json;

/// Reserved entry naming the target type
pub const TYPE_TAG: &str = "_t";

/// Reserved entry carrying the schema version
pub const VERSION_KEY: &str = "_version";

/// Reserved entry holding the pair array of a keyed container
pub const PAIRS_KEY: &str = "_v";

/// Whether a document entry name is reserved (never mapped onto a member)
pub fn is_reserved(name: &str) -> bool {
    name.starts_with('_')
}

/// A node of the value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Array(Vec<ValueNode>),
    Map(Document),
}

impl ValueNode {
    /// Name of the node kind, as used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            ValueNode::Null => "Null",
            ValueNode::Bool(_) => "Bool",
            ValueNode::Int32(_) => "Int32",
            ValueNode::Int64(_) => "Int64",
            ValueNode::Double(_) => "Double",
            ValueNode::Decimal(_) => "Decimal",
            ValueNode::String(_) => "String",
            ValueNode::Array(_) => "Array",
            ValueNode::Map(_) => "Map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ValueNode::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            ValueNode::Map(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ValueNode]> {
        match self {
            ValueNode::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for ValueNode {
    fn from(v: bool) -> Self {
        ValueNode::Bool(v)
    }
}

impl From<i32> for ValueNode {
    fn from(v: i32) -> Self {
        ValueNode::Int32(v)
    }
}

impl From<i64> for ValueNode {
    fn from(v: i64) -> Self {
        ValueNode::Int64(v)
    }
}

impl From<f64> for ValueNode {
    fn from(v: f64) -> Self {
        ValueNode::Double(v)
    }
}

impl From<Decimal> for ValueNode {
    fn from(v: Decimal) -> Self {
        ValueNode::Decimal(v)
    }
}

impl From<&str> for ValueNode {
    fn from(v: &str) -> Self {
        ValueNode::String(v.to_string())
    }
}

impl From<String> for ValueNode {
    fn from(v: String) -> Self {
        ValueNode::String(v)
    }
}

impl From<Document> for ValueNode {
    fn from(v: Document) -> Self {
        ValueNode::Map(v)
    }
}

impl<T: Into<ValueNode>> From<Vec<T>> for ValueNode {
    fn from(v: Vec<T>) -> Self {
        ValueNode::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<Json> for ValueNode {
    /// Converts parsed JSON. Integers that fit in 32 bits become `Int32`,
    /// other integers `Int64`, everything else numeric `Double`.
    fn from(json: Json) -> Self {
        match json {
            Json::Null => ValueNode::Null,
            Json::Bool(b) => ValueNode::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => ValueNode::Int32(small),
                        Err(_) => ValueNode::Int64(i),
                    }
                } else {
                    ValueNode::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => ValueNode::String(s),
            Json::Array(items) => ValueNode::Array(items.into_iter().map(ValueNode::from).collect()),
            Json::Object(map) => ValueNode::Map(Document {
                entries: map.into_iter().map(|(k, v)| (k, ValueNode::from(v))).collect(),
            }),
        }
    }
}

/// An ordered map of named value nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    entries: Vec<(String, ValueNode)>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    /// Create a document whose `_t` entry names `type_name`
    pub fn tagged(type_name: impl Into<String>) -> Self {
        Document::new().with(TYPE_TAG, ValueNode::String(type_name.into()))
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ValueNode>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace an entry, keeping the original position on replace
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ValueNode>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Remove an entry, returning its value
    pub fn remove(&mut self, name: &str) -> Option<ValueNode> {
        let index = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, name: &str) -> Option<&ValueNode> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ValueNode> {
        self.entries.iter_mut().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, reserved ones included
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ValueNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Non-reserved entries only
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ValueNode)> {
        self.entries().filter(|(k, _)| !is_reserved(k))
    }

    /// The raw `_t` entry
    pub fn type_tag(&self) -> Option<&ValueNode> {
        self.get(TYPE_TAG).filter(|v| !v.is_null())
    }

    /// The name carried by the `_t` entry, whether written as a plain string
    /// or as a type document with a `Name` entry
    pub fn type_tag_name(&self) -> Option<String> {
        match self.type_tag()? {
            ValueNode::String(s) => Some(s.clone()),
            ValueNode::Map(doc) => doc.get("Name").and_then(ValueNode::as_str).map(str::to_string),
            _ => None,
        }
    }

    /// The `_version` entry
    pub fn version(&self) -> Option<&str> {
        self.get(VERSION_KEY).and_then(ValueNode::as_str)
    }

    /// Copy of this document stamped with a schema version
    pub fn with_version(&self, version: &str) -> Self {
        self.clone().with(VERSION_KEY, version)
    }
}

impl FromIterator<(String, ValueNode)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, ValueNode)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_insert_replaces_in_place() {
        let mut doc = Document::new().with("A", 1).with("B", 2);
        doc.insert("A", 3);
        let names: Vec<_> = doc.entries().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(doc.get("A"), Some(&ValueNode::Int32(3)));
    }

    #[test]
    fn test_fields_skip_reserved() {
        let doc = Document::tagged("Point").with("X", 1.0).with("_version", "0.1.0");
        let names: Vec<_> = doc.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["X"]);
        assert_eq!(doc.version(), Some("0.1.0"));
    }

    #[test]
    fn test_type_tag_from_type_document() {
        let tag = Document::new().with("Name", "List").with("GenericArguments", vec!["Point"]);
        let doc = Document::new().with(TYPE_TAG, tag);
        assert_eq!(doc.type_tag_name().as_deref(), Some("List"));
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "_t": "Point",
            "X": 1.5,
            "Count": 3,
            "Big": 5_000_000_000i64,
            "Tags": ["a", null]
        });
        let node = ValueNode::from(json);
        let doc = node.as_document().unwrap();
        assert_eq!(doc.get("X"), Some(&ValueNode::Double(1.5)));
        assert_eq!(doc.get("Count"), Some(&ValueNode::Int32(3)));
        assert_eq!(doc.get("Big"), Some(&ValueNode::Int64(5_000_000_000)));
        assert_eq!(
            doc.get("Tags"),
            Some(&ValueNode::Array(vec![ValueNode::from("a"), ValueNode::Null]))
        );
    }

    #[test]
    fn test_content_equality() {
        let a = Document::tagged("Point").with("X", 1.0);
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, b.with("Y", 2.0));
    }
}
