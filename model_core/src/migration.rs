//! # Schema Migration
//!
//! A [`Migrator`] upgrades a document written against an older schema into
//! the shape the current type definitions expect. The deserializer calls it
//! at most once per escalation chain; see the migration gate in
//! [`deserialize`](crate::deserialize).
//!
//! Returning `None` (or a document equal to the input) means "no rule
//! applies", and the deserializer falls back to a capture object.
//!
//! [`RenameMigrator`] covers the common cases: a type that moved or was
//! renamed, and a field that was renamed on a given type.
//!
//! ## Example
//!
//! ```rust
//! use model_core::migration::{Migrator, RenameMigrator};
//! use model_core::value::Document;
//!
//! let rules = RenameMigrator::new()
//!     .rename_type("oM.Geometry.Pt", "oM.Geometry.Point")
//!     .rename_field("oM.Geometry.Point", "Px", "X");
//!
//! let old = Document::tagged("oM.Geometry.Pt").with("Px", 1.0);
//! let upgraded = rules.upgrade(&old, "0.1.0").unwrap();
//! assert_eq!(upgraded.type_tag_name().as_deref(), Some("oM.Geometry.Point"));
//! assert!(upgraded.contains("X"));
//! ```

use std::cmp::Ordering;

use tracing::debug;

use crate::config::compare_versions;
use crate::types::name::short_name;
use crate::types::TYPE_VALUE_TAG;
use crate::value::{Document, ValueNode, TYPE_TAG};

/// Schema-version-aware document upgrade.
pub trait Migrator: Send + Sync {
    /// Upgrade `document`, written with schema `version`. `None` when no rule applies.
    fn upgrade(&self, document: &Document, version: &str) -> Option<Document>;
}

impl<F> Migrator for F
where
    F: Fn(&Document, &str) -> Option<Document> + Send + Sync,
{
    fn upgrade(&self, document: &Document, version: &str) -> Option<Document> {
        self(document, version)
    }
}

/// Migrator with no rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMigration;

impl Migrator for NoMigration {
    fn upgrade(&self, _document: &Document, _version: &str) -> Option<Document> {
        None
    }
}

#[derive(Debug, Clone)]
struct TypeRename {
    from: String,
    to: String,
    before: Option<String>,
}

#[derive(Debug, Clone)]
struct FieldRename {
    type_name: String,
    from: String,
    to: String,
    before: Option<String>,
}

/// Rule-based type and field renames.
///
/// A rule bounded with `*_before(.., version)` only applies to documents
/// whose schema version is older than `version`.
#[derive(Debug, Clone, Default)]
pub struct RenameMigrator {
    types: Vec<TypeRename>,
    fields: Vec<FieldRename>,
}

impl RenameMigrator {
    pub fn new() -> Self {
        RenameMigrator::default()
    }

    pub fn rename_type(mut self, from: &str, to: &str) -> Self {
        self.types.push(TypeRename {
            from: from.to_string(),
            to: to.to_string(),
            before: None,
        });
        self
    }

    pub fn rename_type_before(mut self, from: &str, to: &str, version: &str) -> Self {
        self.types.push(TypeRename {
            from: from.to_string(),
            to: to.to_string(),
            before: Some(version.to_string()),
        });
        self
    }

    pub fn rename_field(mut self, type_name: &str, from: &str, to: &str) -> Self {
        self.fields.push(FieldRename {
            type_name: type_name.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            before: None,
        });
        self
    }

    pub fn rename_field_before(mut self, type_name: &str, from: &str, to: &str, version: &str) -> Self {
        self.fields.push(FieldRename {
            type_name: type_name.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            before: Some(version.to_string()),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.fields.is_empty()
    }

    fn applies(before: &Option<String>, version: &str) -> bool {
        match before {
            Some(bound) => compare_versions(version, bound) == Ordering::Less,
            None => true,
        }
    }

    fn renamed_type(&self, name: &str, version: &str) -> Option<&str> {
        self.types
            .iter()
            .find(|r| (r.from == name || short_name(&r.from) == name) && Self::applies(&r.before, version))
            .map(|r| r.to.as_str())
    }

    fn matches_type(rule_type: &str, name: &str) -> bool {
        rule_type == name || short_name(rule_type) == short_name(name)
    }
}

impl Migrator for RenameMigrator {
    fn upgrade(&self, document: &Document, version: &str) -> Option<Document> {
        let tag = document.type_tag_name()?;
        let mut upgraded = document.clone();
        let mut changed = false;

        // Type-value probe: `{ _t: "Type", Name: "..." }`
        if tag == TYPE_VALUE_TAG {
            let name = document.get("Name").and_then(ValueNode::as_str)?;
            let renamed = self.renamed_type(name, version)?;
            upgraded.insert("Name", renamed);
            debug!(from = name, to = renamed, "migrated type reference");
            return Some(upgraded);
        }

        let mut current = tag.clone();
        if let Some(renamed) = self.renamed_type(&tag, version) {
            upgraded.insert(TYPE_TAG, renamed);
            current = renamed.to_string();
            changed = true;
            debug!(from = %tag, to = renamed, "migrated type tag");
        }

        for rule in &self.fields {
            let for_this_type = Self::matches_type(&rule.type_name, &tag) || Self::matches_type(&rule.type_name, &current);
            if !for_this_type || !Self::applies(&rule.before, version) {
                continue;
            }
            if let Some(value) = upgraded.remove(&rule.from) {
                upgraded.insert(rule.to.clone(), value);
                changed = true;
                debug!(type_name = %current, from = %rule.from, to = %rule.to, "migrated field");
            }
        }

        changed.then_some(upgraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_migration_returns_none() {
        let doc = Document::tagged("Point");
        assert!(NoMigration.upgrade(&doc, "0.1.0").is_none());
    }

    #[test]
    fn test_closure_migrator() {
        let bump = |doc: &Document, _: &str| Some(doc.clone().with("Migrated", true));
        let upgraded = bump.upgrade(&Document::tagged("Point"), "0.1.0").unwrap();
        assert_eq!(upgraded.get("Migrated"), Some(&ValueNode::Bool(true)));
    }

    #[test]
    fn test_type_rename_by_short_name() {
        let rules = RenameMigrator::new().rename_type("Legacy.Pt", "oM.Geometry.Point");
        let upgraded = rules.upgrade(&Document::tagged("Pt"), "0.1.0").unwrap();
        assert_eq!(upgraded.type_tag_name().as_deref(), Some("oM.Geometry.Point"));
    }

    #[test]
    fn test_version_bound_rules() {
        let rules = RenameMigrator::new().rename_field_before("Pipe", "Dia", "Diameter", "0.2");
        let doc = Document::tagged("oM.MEP.Pipe").with("Dia", 0.1);
        assert!(rules.upgrade(&doc, "0.1.4").is_some());
        assert!(rules.upgrade(&doc, "0.2.0").is_none());
    }

    #[test]
    fn test_type_value_probe() {
        let rules = RenameMigrator::new().rename_type("OldProfile", "oM.Structure.RectangleProfile");
        let probe = Document::tagged(TYPE_VALUE_TAG).with("Name", "OldProfile");
        let upgraded = rules.upgrade(&probe, "0.1.0").unwrap();
        assert_eq!(
            upgraded.get("Name").and_then(ValueNode::as_str),
            Some("oM.Structure.RectangleProfile")
        );
    }

    #[test]
    fn test_untouched_document_is_not_returned() {
        let rules = RenameMigrator::new().rename_field("Duct", "Flow", "FlowRate");
        assert!(rules.upgrade(&Document::tagged("Duct").with("FlowRate", 1.0), "0.1.0").is_none());
    }
}
