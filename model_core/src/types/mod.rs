//! # Type Model
//!
//! Everything needed to answer "what is the target type of this node?":
//!
//! - [`name`] - parsed type expressions (`List<oM.Geometry.Point>`)
//! - [`descriptor`] - resolved type identities and their shape categories
//! - [`catalog`] - the registry of known types and methods
//! - [`resolver`] - name to descriptor resolution with caching

pub mod catalog;
pub mod descriptor;
pub mod name;
pub mod resolver;

pub use catalog::{
    CatalogEntry,
    InMemoryCatalog,
    MethodDescriptor,
    TypeCatalog,
    CORE_ASSEMBLY,
    METHOD_TAG,
    TYPE_VALUE_TAG,
};
pub use descriptor::{
    ArgumentCheck,
    Arity,
    Constructor,
    EnumCase,
    EnumShape,
    Member,
    ObjectShape,
    Parameter,
    PrimitiveKind,
    ShapeCategory,
    TypeDescriptor,
};
pub use name::TypeName;
pub use resolver::TypeResolver;
