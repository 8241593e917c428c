//! # Deserializer Settings
//!
//! Tunables for a [`Deserializer`](crate::deserialize::Deserializer). Every
//! field has a default, so a settings file only needs the keys it changes:
//!
//! ```json
//! { "max_depth": 64, "ambiguity_policy": "Reject" }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use model_core::config::{DeserializerSettings, AmbiguityPolicy, SCHEMA_VERSION};
//!
//! let settings: DeserializerSettings = serde_json::from_str(r#"{ "max_depth": 64 }"#).unwrap();
//! assert_eq!(settings.max_depth, 64);
//! assert_eq!(settings.current_version, SCHEMA_VERSION);
//! assert_eq!(settings.ambiguity_policy, AmbiguityPolicy::FirstAssembly);
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Current schema version written into new documents
pub const SCHEMA_VERSION: &str = "0.1.0";

/// What to do when a bare type name matches types in several assemblies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AmbiguityPolicy {
    /// Take the match whose assembly name sorts first and record a Warning
    #[default]
    FirstAssembly,
    /// Leave the name unresolved
    Reject,
}

/// Settings for a deserializer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeserializerSettings {
    /// Version assumed for documents that carry no `_version` entry
    pub current_version: String,

    /// Maximum document nesting depth
    pub max_depth: usize,

    /// Namespace segment of the value-object type family
    pub model_namespace: String,

    /// Namespace segment of the engine/compute type family
    pub engine_namespace: String,

    /// Tie-break for type names declared by several assemblies
    pub ambiguity_policy: AmbiguityPolicy,

    /// Keep resolved type names in the resolver cache
    pub cache_types: bool,
}

impl Default for DeserializerSettings {
    fn default() -> Self {
        DeserializerSettings {
            current_version: SCHEMA_VERSION.to_string(),
            max_depth: 256,
            model_namespace: "oM".to_string(),
            engine_namespace: "Engine".to_string(),
            ambiguity_policy: AmbiguityPolicy::FirstAssembly,
            cache_types: true,
        }
    }
}

/// Numeric parts of a dotted version; non-numeric parts are skipped
fn version_parts(version: &str) -> Vec<u32> {
    version
        .split('.')
        .filter_map(|p| p.trim().parse().ok())
        .collect()
}

/// Compare dotted versions part by part; missing parts count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = version_parts(a);
    let b_parts = version_parts(b);
    let len = a_parts.len().max(b_parts.len());
    for i in 0..len {
        let left = a_parts.get(i).copied().unwrap_or(0);
        let right = b_parts.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = DeserializerSettings::default();
        assert_eq!(settings.current_version, SCHEMA_VERSION);
        assert_eq!(settings.max_depth, 256);
        assert!(settings.cache_types);
    }

    #[test]
    fn test_settings_partial_json() {
        let settings: DeserializerSettings =
            serde_json::from_str(r#"{ "ambiguity_policy": "Reject", "model_namespace": "Model" }"#).unwrap();
        assert_eq!(settings.ambiguity_policy, AmbiguityPolicy::Reject);
        assert_eq!(settings.model_namespace, "Model");
        assert_eq!(settings.engine_namespace, "Engine");
    }

    #[test]
    fn test_version_comparison() {
        assert_eq!(compare_versions("0.1.0", "0.1"), Ordering::Equal);
        assert_eq!(compare_versions("0.1.5", "0.2.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "0.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("3.1", "3.10"), Ordering::Less);
    }
}
