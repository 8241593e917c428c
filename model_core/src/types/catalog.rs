//! # Type Catalog
//!
//! The lookup tables behind type resolution. [`TypeCatalog`] is the contract
//! the deserializer consumes; [`InMemoryCatalog`] is a thread-safe
//! implementation filled by explicit registration.
//!
//! Entries are registered per *assembly* (the unit that declared them). Two
//! assemblies may declare types with the same short name; which one a bare
//! short name resolves to is decided by the resolver, not the catalog.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::descriptor::{Arity, PrimitiveKind, ShapeCategory, TypeDescriptor};
use super::name::short_name;

/// Assembly holding the builtin descriptors
pub const CORE_ASSEMBLY: &str = "core";

/// Tag of a type-value document (`{ _t: "Type", Name, GenericArguments }`)
pub const TYPE_VALUE_TAG: &str = "Type";

/// Tag of a method-reference document
pub const METHOD_TAG: &str = "Method";

/// A descriptor together with the assembly that declared it.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub assembly: String,
    pub descriptor: TypeDescriptor,
}

/// A method or constructor reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Full name of the owning type
    pub owner: String,
    /// Method name; constructors use [`MethodDescriptor::CONSTRUCTOR`]
    pub name: String,
    /// Full names of the parameter types, in order
    pub parameters: Vec<String>,
}

impl MethodDescriptor {
    pub const CONSTRUCTOR: &'static str = ".ctor";

    pub fn new(owner: impl Into<String>, name: impl Into<String>, parameters: &[&str]) -> Self {
        MethodDescriptor {
            owner: owner.into(),
            name: name.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.name == Self::CONSTRUCTOR
    }
}

impl std::fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}({})", self.owner, self.name, self.parameters.join(", "))
    }
}

/// Lookup contract consumed by the type resolver.
///
/// Implementations must be safe for concurrent lookups.
pub trait TypeCatalog: Send + Sync {
    /// Lookup within the value-object namespace family
    fn resolve_by_name(&self, name: &str) -> Option<TypeDescriptor>;

    /// Lookup within the engine/compute namespace family
    fn resolve_engine_by_name(&self, name: &str) -> Option<TypeDescriptor>;

    /// Process-wide table lookup by exact full name
    fn resolve_exact(&self, name: &str) -> Option<TypeDescriptor>;

    /// Every entry whose full or short name matches, across all assemblies
    fn search_all_by_name(&self, name: &str) -> Vec<CatalogEntry>;

    /// Find a method on `owner` by name and parameter types
    fn resolve_method(&self, owner: &TypeDescriptor, name: &str, parameters: &[TypeDescriptor]) -> Option<MethodDescriptor>;

    /// Every registered entry, for listing
    fn entries(&self) -> Vec<CatalogEntry>;
}

#[derive(Default)]
struct CatalogTables {
    /// Registration order, duplicates across assemblies included
    entries: Vec<CatalogEntry>,
    /// Full name to index of the first registration
    by_name: HashMap<String, usize>,
    methods: Vec<MethodDescriptor>,
}

/// Thread-safe catalog populated by registration.
///
/// ## Example
///
/// ```rust
/// use model_core::types::{InMemoryCatalog, TypeCatalog, TypeDescriptor};
///
/// let catalog = InMemoryCatalog::with_builtins();
/// catalog.register("model.structure", TypeDescriptor::enumeration("oM.Structure.MaterialType", &["Steel", "Timber"]));
///
/// assert!(catalog.resolve_exact("oM.Structure.MaterialType").is_some());
/// assert_eq!(catalog.search_all_by_name("MaterialType").len(), 1);
/// ```
pub struct InMemoryCatalog {
    model_namespace: String,
    engine_namespace: String,
    tables: RwLock<CatalogTables>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        InMemoryCatalog::new()
    }
}

impl InMemoryCatalog {
    /// Empty catalog using the `oM` and `Engine` namespace families
    pub fn new() -> Self {
        InMemoryCatalog {
            model_namespace: "oM".to_string(),
            engine_namespace: "Engine".to_string(),
            tables: RwLock::new(CatalogTables::default()),
        }
    }

    /// Catalog preloaded with primitives and the builtin generic containers
    pub fn with_builtins() -> Self {
        let catalog = InMemoryCatalog::new();
        catalog.register_builtins();
        catalog
    }

    pub fn with_namespaces(mut self, model: impl Into<String>, engine: impl Into<String>) -> Self {
        self.model_namespace = model.into();
        self.engine_namespace = engine.into();
        self
    }

    fn register_builtins(&self) {
        for kind in PrimitiveKind::ALL {
            self.register(CORE_ASSEMBLY, TypeDescriptor::primitive(kind));
        }
        self.register(CORE_ASSEMBLY, TypeDescriptor::dynamic());
        self.register(CORE_ASSEMBLY, TypeDescriptor::new(TYPE_VALUE_TAG, ShapeCategory::TypeValue));
        self.register(CORE_ASSEMBLY, TypeDescriptor::new(METHOD_TAG, ShapeCategory::MethodReference));
        self.register(
            CORE_ASSEMBLY,
            TypeDescriptor::new("List", ShapeCategory::Sequence).with_arity(Arity::Fixed(1)),
        );
        self.register(
            CORE_ASSEMBLY,
            TypeDescriptor::new("Dictionary", ShapeCategory::Map).with_arity(Arity::Fixed(2)),
        );
        self.register(
            CORE_ASSEMBLY,
            TypeDescriptor::new("Tuple", ShapeCategory::Tuple(0)).with_arity(Arity::Variadic),
        );
    }

    /// Register a descriptor declared by `assembly`
    pub fn register(&self, assembly: &str, descriptor: TypeDescriptor) {
        let mut tables = self.tables.write();
        let index = tables.entries.len();
        tables
            .by_name
            .entry(descriptor.name().to_string())
            .or_insert(index);
        tables.entries.push(CatalogEntry {
            assembly: assembly.to_string(),
            descriptor,
        });
    }

    pub fn register_method(&self, method: MethodDescriptor) {
        self.tables.write().methods.push(method);
    }

    pub fn len(&self) -> usize {
        self.tables.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn in_namespace(name: &str, namespace: &str) -> bool {
        name.split('.').any(|segment| segment == namespace)
    }
}

impl TypeCatalog for InMemoryCatalog {
    fn resolve_by_name(&self, name: &str) -> Option<TypeDescriptor> {
        if !Self::in_namespace(name, &self.model_namespace) {
            return None;
        }
        self.resolve_exact(name)
    }

    fn resolve_engine_by_name(&self, name: &str) -> Option<TypeDescriptor> {
        if !Self::in_namespace(name, &self.engine_namespace) {
            return None;
        }
        self.resolve_exact(name)
    }

    fn resolve_exact(&self, name: &str) -> Option<TypeDescriptor> {
        let tables = self.tables.read();
        tables
            .by_name
            .get(name)
            .map(|&index| tables.entries[index].descriptor.clone())
    }

    fn search_all_by_name(&self, name: &str) -> Vec<CatalogEntry> {
        self.tables
            .read()
            .entries
            .iter()
            .filter(|e| e.descriptor.name() == name || short_name(e.descriptor.name()) == name)
            .cloned()
            .collect()
    }

    fn resolve_method(&self, owner: &TypeDescriptor, name: &str, parameters: &[TypeDescriptor]) -> Option<MethodDescriptor> {
        let wanted: Vec<String> = parameters.iter().map(TypeDescriptor::full_name).collect();
        self.tables
            .read()
            .methods
            .iter()
            .find(|m| m.owner == owner.name() && m.name == name && m.parameters == wanted)
            .cloned()
    }

    fn entries(&self) -> Vec<CatalogEntry> {
        self.tables.read().entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectShape;

    #[test]
    fn test_builtins_registered() {
        let catalog = InMemoryCatalog::with_builtins();
        assert!(catalog.resolve_exact("Double").is_some());
        assert!(catalog.resolve_exact("List").is_some());
        assert!(catalog.resolve_exact("Object").is_some());
        assert_eq!(catalog.resolve_exact("Tuple").unwrap().arity(), Arity::Variadic);
    }

    #[test]
    fn test_namespace_families() {
        let catalog = InMemoryCatalog::new();
        catalog.register("geo", TypeDescriptor::plain_object("oM.Geometry.Line", ObjectShape::new()));
        catalog.register("eng", TypeDescriptor::plain_object("Engine.Geometry.Compute", ObjectShape::new()));

        assert!(catalog.resolve_by_name("oM.Geometry.Line").is_some());
        assert!(catalog.resolve_by_name("Engine.Geometry.Compute").is_none());
        assert!(catalog.resolve_engine_by_name("Engine.Geometry.Compute").is_some());
        assert!(catalog.resolve_engine_by_name("oM.Geometry.Line").is_none());
    }

    #[test]
    fn test_search_by_short_name_spans_assemblies() {
        let catalog = InMemoryCatalog::new();
        catalog.register("b.assembly", TypeDescriptor::interface("Legacy.Point"));
        catalog.register("a.assembly", TypeDescriptor::interface("oM.Geometry.Point"));
        let found = catalog.search_all_by_name("Point");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_first_registration_owns_exact_name() {
        let catalog = InMemoryCatalog::new();
        catalog.register("first", TypeDescriptor::interface("Shared"));
        catalog.register("second", TypeDescriptor::enumeration("Shared", &["A"]));
        let found = catalog.resolve_exact("Shared").unwrap();
        assert_eq!(found.category().label(), "Interface");
        assert_eq!(catalog.search_all_by_name("Shared").len(), 2);
    }

    #[test]
    fn test_method_lookup_matches_parameter_types() {
        let catalog = InMemoryCatalog::with_builtins();
        let owner = TypeDescriptor::plain_object("Engine.Geometry.Compute", ObjectShape::new());
        catalog.register_method(MethodDescriptor::new("Engine.Geometry.Compute", "Length", &["oM.Geometry.Line"]));

        let line = TypeDescriptor::plain_object("oM.Geometry.Line", ObjectShape::new());
        assert!(catalog.resolve_method(&owner, "Length", &[line]).is_some());
        assert!(catalog.resolve_method(&owner, "Length", &[]).is_none());
    }
}
