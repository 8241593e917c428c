//! # model_core - Versioned Object-Graph Deserializer
//!
//! `model_core` rebuilds typed building-design models (geometry, sections,
//! ducts, pipes) from a generic value tree written by older or newer
//! versions of the schema.
//!
//! ## Design Philosophy
//!
//! - **Never abort a batch**: a malformed document still yields *some*
//!   value; what went wrong is reported through a diagnostics sink
//! - **One migration per chain**: a failing document gets a single schema
//!   upgrade before it is captured generically
//! - **Nothing is lost**: documents that cannot be reconstructed keep every
//!   field in a capture object
//! - **Closed dispatch**: every target type belongs to one shape category,
//!   matched exhaustively
//!
//! ## Quick Start
//!
//! ```rust
//! use model_core::diagnostics::DiagnosticLog;
//! use model_core::io::parse_document;
//! use model_core::models::{default_catalog, geometry::Line};
//! use model_core::Deserializer;
//!
//! let node = parse_document(r#"{
//!     "_t": "oM.Geometry.Line",
//!     "Start": { "_t": "Point", "X": 0, "Y": 0, "Z": 0 },
//!     "End":   { "_t": "Point", "X": 3, "Y": 4, "Z": 0 }
//! }"#).unwrap();
//!
//! let deserializer = Deserializer::new(default_catalog());
//! let log = DiagnosticLog::new();
//! let line: Line = deserializer.read(&node, &log).unwrap();
//! assert_eq!(line.length(), 5.0);
//! assert!(!log.has_errors());
//! ```
//!
//! ## Modules
//!
//! - [`value`] - the input value tree
//! - [`types`] - type names, descriptors, catalog and resolver
//! - [`instance`] - the materialized object graph
//! - [`deserialize`] - the deserializer and its codecs
//! - [`migration`] - schema upgrade rules
//! - [`diagnostics`] - error/warning/note records
//! - [`models`] - domain models registered in the default catalog
//! - [`config`] - deserializer settings
//! - [`io`] - loading documents and settings from disk
//! - [`errors`] - structured error types

pub mod config;
pub mod deserialize;
pub mod diagnostics;
pub mod errors;
pub mod instance;
pub mod io;
pub mod migration;
pub mod models;
pub mod types;
pub mod value;

// Re-export commonly used types at crate root for convenience
pub use config::{DeserializerSettings, SCHEMA_VERSION};
pub use deserialize::Deserializer;
pub use diagnostics::{Diagnostic, DiagnosticLog, DiagnosticSink, Severity};
pub use errors::{FailureKind, ModelError, ModelResult};
pub use instance::{CaptureObject, FromInstance, Instance};
pub use migration::{Migrator, RenameMigrator};
pub use value::{Document, ValueNode};
