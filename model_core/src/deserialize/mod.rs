//! # Versioned Object-Graph Deserializer
//!
//! Rebuilds a typed object graph from a [`ValueNode`] tree.
//!
//! ## Control flow
//!
//! ```text
//! materialize(node, target, existing, version, already_migrated)
//!   ├── Null                       -> zero/empty value of target, no diagnostics
//!   ├── Primitive / Enum / Type / Method / Sequence / Map / Tuple
//!   │                              -> codec; failure = one Error + existing/default
//!   ├── Plain / Immutable / DynamicProperty / Interface object
//!   │     -> object reconstructor
//!   │          └── failure -> migration gate (at most one upgrade per chain)
//!   │                           └── still failing -> capture object + one Error
//!   └── Dynamic (any)              -> by node shape and `_t` tag
//! ```
//!
//! Nothing in here returns an error for malformed input. The caller always
//! gets *some* [`Instance`] and the [`DiagnosticSink`] says what went wrong.
//!
//! ## Example
//!
//! ```rust
//! use model_core::diagnostics::DiagnosticLog;
//! use model_core::models::{default_catalog, geometry::Point};
//! use model_core::value::{Document, ValueNode};
//! use model_core::Deserializer;
//!
//! let deserializer = Deserializer::new(default_catalog());
//! let node = ValueNode::Map(Document::tagged("Point").with("X", 1.0).with("Y", 2.0).with("Z", 3.0));
//!
//! let log = DiagnosticLog::new();
//! let point: Point = deserializer.read(&node, &log).unwrap();
//! assert_eq!(point, Point::new(1.0, 2.0, 3.0));
//! assert!(log.is_empty());
//! ```

mod collections;
mod enums;
mod gate;
mod objects;
mod reflection;
mod scalars;

use std::sync::Arc;

use tracing::trace;

use crate::config::DeserializerSettings;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::errors::{Failure, FailureKind, ModelError, ModelResult};
use crate::instance::{Instance, KeyedMap};
use crate::migration::{Migrator, NoMigration};
use crate::models::Persistent;
use crate::types::{ShapeCategory, TypeCatalog, TypeDescriptor, TypeName, TypeResolver};
use crate::value::{Document, ValueNode, PAIRS_KEY};

/// Per-call state threaded through every codec.
#[derive(Clone)]
pub(crate) struct Context<'s> {
    /// Schema version in effect for the current node
    pub version: String,
    /// Set once the migration gate has upgraded a document in this chain
    pub already_migrated: bool,
    pub depth: usize,
    pub sink: &'s dyn DiagnosticSink,
}

impl<'s> Context<'s> {
    fn root(version: &str, already_migrated: bool, sink: &'s dyn DiagnosticSink) -> Self {
        Context {
            version: version.to_string(),
            already_migrated,
            depth: 0,
            sink,
        }
    }

    /// Context for a child node: one level deeper, version re-derived from
    /// the node's own `_version` entry when it has one
    fn enter(&self, node: &ValueNode) -> Context<'s> {
        let version = node
            .as_document()
            .and_then(Document::version)
            .map(str::to_string)
            .unwrap_or_else(|| self.version.clone());
        Context {
            version,
            already_migrated: self.already_migrated,
            depth: self.depth + 1,
            sink: self.sink,
        }
    }

    fn migrated(&self) -> Context<'s> {
        Context {
            already_migrated: true,
            ..self.clone()
        }
    }

    fn with_sink<'t>(&self, sink: &'t dyn DiagnosticSink) -> Context<'t> {
        Context {
            version: self.version.clone(),
            already_migrated: self.already_migrated,
            depth: self.depth,
            sink,
        }
    }
}

/// Materializes value trees into [`Instance`] graphs.
///
/// A deserializer is `Send + Sync`; independent documents may be read
/// concurrently through one instance.
pub struct Deserializer {
    catalog: Arc<dyn TypeCatalog>,
    resolver: TypeResolver,
    migrator: Arc<dyn Migrator>,
    settings: DeserializerSettings,
}

impl Deserializer {
    /// Deserializer with default settings and no migration rules
    pub fn new(catalog: Arc<dyn TypeCatalog>) -> Self {
        let settings = DeserializerSettings::default();
        Deserializer {
            resolver: Self::build_resolver(&catalog, &settings),
            catalog,
            migrator: Arc::new(NoMigration),
            settings,
        }
    }

    pub fn with_migrator(mut self, migrator: impl Migrator + 'static) -> Self {
        self.migrator = Arc::new(migrator);
        self
    }

    pub fn with_shared_migrator(mut self, migrator: Arc<dyn Migrator>) -> Self {
        self.migrator = migrator;
        self
    }

    pub fn with_settings(mut self, settings: DeserializerSettings) -> Self {
        self.resolver = Self::build_resolver(&self.catalog, &settings);
        self.settings = settings;
        self
    }

    fn build_resolver(catalog: &Arc<dyn TypeCatalog>, settings: &DeserializerSettings) -> TypeResolver {
        TypeResolver::new(catalog.clone())
            .with_policy(settings.ambiguity_policy)
            .with_cache(settings.cache_types)
    }

    pub fn settings(&self) -> &DeserializerSettings {
        &self.settings
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    pub fn catalog(&self) -> &Arc<dyn TypeCatalog> {
        &self.catalog
    }

    /// Materialize `node` against `target`.
    ///
    /// `existing` is returned unchanged when the node's shape does not fit
    /// the target; `already_migrated` disables the migration gate for this
    /// chain.
    pub fn materialize(
        &self,
        node: &ValueNode,
        target: &TypeDescriptor,
        existing: Option<Instance>,
        version: &str,
        already_migrated: bool,
        sink: &dyn DiagnosticSink,
    ) -> Instance {
        let ctx = Context::root(version, already_migrated, sink);
        self.materialize_in(node, target, existing, &ctx)
    }

    /// Materialize a whole document whose type comes from its own `_t` tag
    pub fn materialize_document(&self, node: &ValueNode, sink: &dyn DiagnosticSink) -> Instance {
        self.materialize(
            node,
            &TypeDescriptor::dynamic(),
            None,
            &self.settings.current_version,
            false,
            sink,
        )
    }

    /// Materialize against a type given by name
    pub fn materialize_as(&self, node: &ValueNode, type_name: &str, sink: &dyn DiagnosticSink) -> ModelResult<Instance> {
        let target = self.resolve(type_name, sink)?;
        Ok(self.materialize(node, &target, None, &self.settings.current_version, false, sink))
    }

    /// Materialize against `T`'s descriptor and extract a `T`.
    ///
    /// Fails with [`ModelError::Captured`] when the document could only be
    /// captured generically.
    pub fn read<T: Persistent>(&self, node: &ValueNode, sink: &dyn DiagnosticSink) -> ModelResult<T> {
        let instance = self.materialize(
            node,
            &T::descriptor(),
            None,
            &self.settings.current_version,
            false,
            sink,
        );
        T::from_instance(&instance)
    }

    /// Resolve a type expression, failing when it names nothing known
    pub fn resolve(&self, type_name: &str, sink: &dyn DiagnosticSink) -> ModelResult<TypeDescriptor> {
        let parsed = TypeName::parse(type_name)?;
        self.resolver
            .resolve(&parsed, sink)
            .ok_or_else(|| ModelError::type_not_found(type_name))
    }

    // ========================================================================
    // Dispatcher
    // ========================================================================

    pub(crate) fn materialize_in(
        &self,
        node: &ValueNode,
        target: &TypeDescriptor,
        existing: Option<Instance>,
        parent: &Context<'_>,
    ) -> Instance {
        let ctx = parent.enter(node);
        if ctx.depth > self.settings.max_depth {
            ctx.sink.record(Diagnostic::error(
                Some(FailureKind::DepthLimitExceeded),
                format!(
                    "document nesting exceeds the maximum depth of {} while reading `{}`",
                    self.settings.max_depth,
                    target.full_name()
                ),
            ));
            return existing.unwrap_or_else(|| target.default_instance());
        }

        if node.is_null() {
            return target.default_instance();
        }

        trace!(target_type = %target, node = node.kind_name(), depth = ctx.depth, "materialize");

        let result = match target.category() {
            ShapeCategory::Primitive(kind) => scalars::read_primitive(node, *kind),
            ShapeCategory::Enum(shape) => self.read_enum(node, target, shape, &ctx),
            ShapeCategory::TypeValue => self.read_type_value(node, &ctx),
            ShapeCategory::MethodReference => self.read_method(node, &ctx),
            ShapeCategory::Sequence => self.read_sequence(node, target, &ctx),
            ShapeCategory::Map => self.read_keyed(node, target, &ctx),
            ShapeCategory::Tuple(arity) => self.read_tuple(node, target, *arity, &ctx),
            ShapeCategory::PlainObject(_)
            | ShapeCategory::ImmutableObject(_)
            | ShapeCategory::DynamicPropertyObject(_)
            | ShapeCategory::Interface => return self.read_object(node, target, existing, &ctx),
            ShapeCategory::Dynamic => return self.read_any(node, existing, &ctx),
        };

        match result {
            Ok(value) => value,
            Err(failure) => {
                ctx.sink.record_failure(&failure);
                existing.unwrap_or_else(|| target.default_instance())
            }
        }
    }

    /// Materialize with no target type: by node shape, and by `_t` for maps
    fn read_any(&self, node: &ValueNode, existing: Option<Instance>, ctx: &Context<'_>) -> Instance {
        let doc = match node {
            ValueNode::Null => return Instance::Null,
            ValueNode::Bool(b) => return Instance::Bool(*b),
            ValueNode::Int32(i) => return Instance::Int32(*i),
            ValueNode::Int64(i) => return Instance::Int64(*i),
            ValueNode::Double(d) => return Instance::Double(*d),
            ValueNode::Decimal(d) => return Instance::Decimal(*d),
            ValueNode::String(s) => return Instance::String(s.clone()),
            ValueNode::Array(items) => {
                let any = TypeDescriptor::dynamic();
                return Instance::Sequence(items.iter().map(|item| self.materialize_in(item, &any, None, ctx)).collect());
            }
            ValueNode::Map(doc) => doc,
        };

        let Some(tag) = doc.type_tag() else {
            return self.read_untagged(doc, ctx);
        };
        match self.resolve_tag(tag, ctx) {
            Some(concrete) => match concrete.category() {
                ShapeCategory::Dynamic => self.read_untagged(doc, ctx),
                category if category.is_object() => self.read_object(node, &concrete, existing, ctx),
                _ => self.materialize_in(node, &concrete, existing, ctx),
            },
            None => {
                let name = doc.type_tag_name().unwrap_or_else(|| "unknown".to_string());
                let failure = Failure::new(
                    FailureKind::TypeResolutionFailure,
                    format!("Type `{}` failed to deserialise.", name),
                );
                self.escalate(doc, &TypeDescriptor::dynamic(), existing, failure, ctx)
            }
        }
    }

    /// A map with no type tag: string-keyed container of generic values,
    /// or a pair array under `_v` when the keys were not strings
    fn read_untagged(&self, doc: &Document, ctx: &Context<'_>) -> Instance {
        if let Some(ValueNode::Array(pairs)) = doc.get(PAIRS_KEY) {
            let open = TypeDescriptor::new("Dictionary", ShapeCategory::Map);
            return Instance::Map(self.read_pairs(pairs, &open, ctx));
        }
        let any = TypeDescriptor::dynamic();
        let mut map = KeyedMap::new();
        for (name, value) in doc.fields() {
            map.insert(Instance::String(name.to_string()), self.materialize_in(value, &any, None, ctx));
        }
        Instance::Map(map)
    }

    /// Resolve a `_t` entry without migration
    fn resolve_tag(&self, tag: &ValueNode, ctx: &Context<'_>) -> Option<TypeDescriptor> {
        let name = TypeName::from_node(tag)?;
        self.resolver.resolve(&name, ctx.sink)
    }

    /// Resolve a declared member/parameter type
    fn resolve_declared(&self, name: &TypeName, ctx: &Context<'_>) -> Result<TypeDescriptor, Failure> {
        self.resolver.resolve(name, ctx.sink).ok_or_else(|| {
            Failure::new(
                FailureKind::TypeResolutionFailure,
                format!("Type `{}` failed to deserialise.", name),
            )
        })
    }
}

/// The "expected to deserialise a ..." failure shared by every codec
pub(crate) fn shape_mismatch(target: &TypeDescriptor, node: &ValueNode) -> Failure {
    shape_mismatch_label(target.expected_label(), node)
}

pub(crate) fn shape_mismatch_label(expected: &str, node: &ValueNode) -> Failure {
    Failure::new(
        FailureKind::ShapeMismatch,
        format!(
            "expected to deserialise a `{}` and received `{}` instead",
            expected,
            node.kind_name()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticLog;
    use crate::models::default_catalog;
    use crate::types::PrimitiveKind;

    fn deserializer() -> Deserializer {
        Deserializer::new(default_catalog())
    }

    #[test]
    fn test_null_yields_default_without_diagnostics() {
        let de = deserializer();
        let log = DiagnosticLog::new();
        let double = TypeDescriptor::primitive(PrimitiveKind::Double);
        let value = de.materialize(&ValueNode::Null, &double, None, "0.1.0", false, &log);
        assert_eq!(value, Instance::Double(0.0));

        let list = de.resolve("List<Double>", &log).unwrap();
        let value = de.materialize(&ValueNode::Null, &list, None, "0.1.0", false, &log);
        assert_eq!(value, Instance::Null);
        assert!(log.is_empty());
    }

    #[test]
    fn test_shape_mismatch_returns_existing() {
        let de = deserializer();
        let log = DiagnosticLog::new();
        let list = de.resolve("List<Double>", &log).unwrap();
        let existing = Instance::Sequence(vec![Instance::Double(9.0)]);
        let node = ValueNode::Map(Document::new().with("A", 1));

        let value = de.materialize(&node, &list, Some(existing.clone()), "0.1.0", false, &log);
        assert_eq!(value, existing);
        let errors = log.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "expected to deserialise a `Sequence` and received `Map` instead"
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut settings = DeserializerSettings::default();
        settings.max_depth = 3;
        let de = deserializer().with_settings(settings);
        let log = DiagnosticLog::new();

        let nested = ValueNode::from(vec![ValueNode::from(vec![ValueNode::from(vec![ValueNode::from(vec![1])])])]);
        de.materialize_document(&nested, &log);
        assert_eq!(log.errors().len(), 1);
        assert_eq!(log.errors()[0].kind, Some(FailureKind::DepthLimitExceeded));
    }

    #[test]
    fn test_untagged_map_reads_generically() {
        let de = deserializer();
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::new().with("Label", "B-1").with("Count", 2));
        let value = de.materialize_document(&node, &log);
        let Instance::Map(map) = value else {
            panic!("expected a map");
        };
        assert_eq!(map.get_str("Label"), Some(&Instance::String("B-1".into())));
        assert_eq!(map.get_str("Count"), Some(&Instance::Int32(2)));
    }

    #[test]
    fn test_version_is_taken_from_document() {
        let de = deserializer();
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("NoSuchType").with("_version", "0.0.7").with("A", 1));
        let value = de.materialize_document(&node, &log);
        assert_eq!(value.as_capture().unwrap().schema_version, "0.0.7");
    }
}
