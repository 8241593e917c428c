//! # Document Loading
//!
//! Reads JSON documents into [`ValueNode`] trees and settings files into
//! [`DeserializerSettings`]. Failures here are infrastructure errors and
//! surface as [`ModelError`](crate::errors::ModelError), unlike malformed
//! document content, which the deserializer reports as diagnostics.
//!
//! ## Example
//!
//! ```rust
//! use model_core::io::parse_document;
//!
//! let node = parse_document(r#"{ "_t": "Point", "X": 1.0, "Y": 2.0, "Z": 3 }"#).unwrap();
//! assert_eq!(node.as_document().unwrap().type_tag_name().as_deref(), Some("Point"));
//! ```

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::DeserializerSettings;
use crate::errors::{ModelError, ModelResult};
use crate::value::ValueNode;

/// Read and parse a JSON document from disk
pub fn read_document(path: &Path) -> ModelResult<ValueNode> {
    let contents = read_text(path)?;
    let node = parse_document(&contents).map_err(|e| match e {
        ModelError::SerializationError { reason } => {
            ModelError::file_error("parse", path.display().to_string(), reason)
        }
        other => other,
    })?;
    debug!(path = %path.display(), kind = node.kind_name(), "loaded document");
    Ok(node)
}

/// Parse a JSON document held in memory
pub fn parse_document(json: &str) -> ModelResult<ValueNode> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(ValueNode::from(value))
}

/// Load deserializer settings; keys missing from the file keep their defaults
pub fn load_settings(path: &Path) -> ModelResult<DeserializerSettings> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| ModelError::file_error("parse settings", path.display().to_string(), e.to_string()))
}

fn read_text(path: &Path) -> ModelResult<String> {
    fs::read_to_string(path).map_err(|e| ModelError::file_error("read", path.display().to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmbiguityPolicy;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("model_core_io_{}_{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_document() {
        let node = parse_document(r#"{ "_t": "oM.Geometry.Line", "Start": null, "Tags": [1, 2] }"#).unwrap();
        let doc = node.as_document().unwrap();
        assert_eq!(doc.get("Start"), Some(&ValueNode::Null));
        assert_eq!(doc.get("Tags"), Some(&ValueNode::Array(vec![ValueNode::Int32(1), ValueNode::Int32(2)])));
    }

    #[test]
    fn test_parse_document_keeps_field_order() {
        let node = parse_document(r#"{ "_t": "Point", "Z": 3.0, "A": 1.0, "M": { "y": 1, "b": 2 } }"#).unwrap();
        let doc = node.as_document().unwrap();
        let names: Vec<&str> = doc.entries().map(|(name, _)| name).collect();
        assert_eq!(names, ["_t", "Z", "A", "M"]);

        let inner = doc.get("M").and_then(ValueNode::as_document).unwrap();
        let names: Vec<&str> = inner.entries().map(|(name, _)| name).collect();
        assert_eq!(names, ["y", "b"]);
    }

    #[test]
    fn test_parse_document_rejects_invalid_json() {
        let err = parse_document("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_read_document_missing_file() {
        let err = read_document(Path::new("/nonexistent/model.json")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_read_document_reports_path_on_bad_json() {
        let path = temp_file("bad.json", "[1, 2");
        let err = read_document(&path).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_settings() {
        let path = temp_file("settings.json", r#"{ "max_depth": 32, "ambiguity_policy": "Reject" }"#);
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.max_depth, 32);
        assert_eq!(settings.ambiguity_policy, AmbiguityPolicy::Reject);
        fs::remove_file(&path).ok();
    }
}
