//! # Type Descriptors
//!
//! A [`TypeDescriptor`] is the resolved identity of a target type: its name,
//! its generic arguments and a closed [`ShapeCategory`] that the deserializer
//! matches on exhaustively.
//!
//! Object categories carry an [`ObjectShape`] describing members,
//! constructors and the optional extension-data slot. Member and parameter
//! types are kept as [`TypeName`]s and resolved lazily, so self-referencing
//! shapes (a node holding a list of nodes) need no special handling.
//!
//! ## Example
//!
//! ```rust
//! use model_core::types::{Constructor, ObjectShape, TypeDescriptor};
//!
//! let point = TypeDescriptor::immutable_object(
//!     "oM.Geometry.Point",
//!     ObjectShape::new()
//!         .read_only("X", "Double")
//!         .read_only("Y", "Double")
//!         .constructor(Constructor::new(&[("X", "Double"), ("Y", "Double")])),
//! );
//! assert_eq!(point.short_name(), "Point");
//! assert_eq!(point.category().label(), "ImmutableObject");
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::name::{short_name, TypeName};
use crate::instance::Instance;

static DYNAMIC: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::new("Object", ShapeCategory::Dynamic));

// ============================================================================
// Primitive kinds
// ============================================================================

/// Scalar kinds understood by the scalar codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Bool,
    Int32,
    Int64,
    Double,
    Decimal,
    String,
    /// Duration stored as ticks of 100 ns
    TimeSpan,
    /// RFC 3339 timestamp with offset
    DateTimeOffset,
    Guid,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::Double,
        PrimitiveKind::Decimal,
        PrimitiveKind::String,
        PrimitiveKind::TimeSpan,
        PrimitiveKind::DateTimeOffset,
        PrimitiveKind::Guid,
    ];

    /// Catalog name of the primitive
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "Bool",
            PrimitiveKind::Int32 => "Int32",
            PrimitiveKind::Int64 => "Int64",
            PrimitiveKind::Double => "Double",
            PrimitiveKind::Decimal => "Decimal",
            PrimitiveKind::String => "String",
            PrimitiveKind::TimeSpan => "TimeSpan",
            PrimitiveKind::DateTimeOffset => "DateTimeOffset",
            PrimitiveKind::Guid => "Guid",
        }
    }

    /// Strings are references; every other primitive has a zero value.
    pub fn is_value_type(&self) -> bool {
        !matches!(self, PrimitiveKind::String)
    }

    pub fn default_instance(&self) -> Instance {
        match self {
            PrimitiveKind::Bool => Instance::Bool(false),
            PrimitiveKind::Int32 => Instance::Int32(0),
            PrimitiveKind::Int64 => Instance::Int64(0),
            PrimitiveKind::Double => Instance::Double(0.0),
            PrimitiveKind::Decimal => Instance::Decimal(Decimal::ZERO),
            PrimitiveKind::String => Instance::Null,
            PrimitiveKind::TimeSpan => Instance::TimeSpan(chrono::Duration::zero()),
            PrimitiveKind::DateTimeOffset => Instance::DateTimeOffset(DateTime::<Utc>::default().fixed_offset()),
            PrimitiveKind::Guid => Instance::Guid(uuid::Uuid::nil()),
        }
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// One declared case of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumCase {
    pub name: String,
    pub ordinal: i32,
}

/// Declared cases of an enumeration type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumShape {
    cases: Vec<EnumCase>,
}

impl EnumShape {
    /// Cases numbered from zero in declaration order
    pub fn new(names: &[&str]) -> Self {
        EnumShape {
            cases: names
                .iter()
                .enumerate()
                .map(|(i, name)| EnumCase {
                    name: name.to_string(),
                    ordinal: i as i32,
                })
                .collect(),
        }
    }

    pub fn with_case(mut self, name: impl Into<String>, ordinal: i32) -> Self {
        self.cases.push(EnumCase {
            name: name.into(),
            ordinal,
        });
        self
    }

    pub fn cases(&self) -> &[EnumCase] {
        &self.cases
    }

    /// Case-sensitive lookup by declared name
    pub fn by_name(&self, name: &str) -> Option<&EnumCase> {
        self.cases.iter().find(|c| c.name == name)
    }

    pub fn by_ordinal(&self, ordinal: i32) -> Option<&EnumCase> {
        self.cases.iter().find(|c| c.ordinal == ordinal)
    }
}

// ============================================================================
// Object shapes
// ============================================================================

/// A named member of an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    name: String,
    type_name: TypeName,
    writable: bool,
    dynamic_container: bool,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Keyed container whose enum keys may also appear as top-level document fields
    pub fn is_dynamic_container(&self) -> bool {
        self.dynamic_container
    }
}

/// A constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    type_name: TypeName,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }
}

/// Validation run on materialized constructor arguments before the object
/// is built. An `Err` is a construction failure.
pub type ArgumentCheck = fn(&[Instance]) -> Result<(), String>;

/// A constructor of an immutable object type.
#[derive(Clone)]
pub struct Constructor {
    parameters: Vec<Parameter>,
    check: Option<ArgumentCheck>,
}

impl Constructor {
    pub fn new(parameters: &[(&str, &str)]) -> Self {
        Constructor {
            parameters: parameters
                .iter()
                .map(|(name, ty)| Parameter {
                    name: name.to_string(),
                    type_name: TypeName::from(*ty),
                })
                .collect(),
            check: None,
        }
    }

    pub fn with_check(mut self, check: ArgumentCheck) -> Self {
        self.check = Some(check);
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn check(&self) -> Option<ArgumentCheck> {
        self.check
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .field("checked", &self.check.is_some())
            .finish()
    }
}

/// Members, constructors and capabilities of an object type.
#[derive(Debug, Clone)]
pub struct ObjectShape {
    members: Vec<Member>,
    constructors: Vec<Constructor>,
    extension: Option<String>,
    interfaces: Vec<String>,
    instantiable: bool,
}

impl Default for ObjectShape {
    fn default() -> Self {
        ObjectShape {
            members: Vec::new(),
            constructors: Vec::new(),
            extension: None,
            interfaces: Vec::new(),
            instantiable: true,
        }
    }
}

impl ObjectShape {
    pub fn new() -> Self {
        ObjectShape::default()
    }

    /// Add a writable member
    pub fn member(self, name: &str, type_name: &str) -> Self {
        self.push_member(name, type_name, true, false)
    }

    /// Add a member without a setter
    pub fn read_only(self, name: &str, type_name: &str) -> Self {
        self.push_member(name, type_name, false, false)
    }

    /// Add a writable enum-keyed container whose keys may be written as
    /// top-level document fields
    pub fn dynamic_container(self, name: &str, type_name: &str) -> Self {
        self.push_member(name, type_name, true, true)
    }

    fn push_member(mut self, name: &str, type_name: &str, writable: bool, dynamic_container: bool) -> Self {
        self.members.push(Member {
            name: name.to_string(),
            type_name: TypeName::from(type_name),
            writable,
            dynamic_container,
        });
        self
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Name the member that absorbs fields with no matching member
    pub fn extension(mut self, name: &str) -> Self {
        self.extension = Some(name.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn not_instantiable(mut self) -> Self {
        self.instantiable = false;
        self
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Exact-name member lookup
    pub fn find_member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_member_ignore_case(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// The constructor with the most parameters; the first declared wins ties.
    pub fn greediest_constructor(&self) -> Option<&Constructor> {
        self.constructors.iter().fold(None, |best: Option<&Constructor>, c| match best {
            Some(b) if b.parameters.len() >= c.parameters.len() => Some(b),
            _ => Some(c),
        })
    }

    pub fn extension_member(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn is_instantiable(&self) -> bool {
        self.instantiable
    }

    /// Pick the object category this shape reads as: enum-keyed dynamic
    /// containers make it a dynamic-property object, a parameterized
    /// constructor with no writable members an immutable one.
    pub fn infer_category(self) -> ShapeCategory {
        let shape = Arc::new(self);
        if shape.members.iter().any(|m| m.dynamic_container) {
            ShapeCategory::DynamicPropertyObject(shape)
        } else if shape.constructors.iter().any(|c| !c.parameters.is_empty())
            && shape.members.iter().all(|m| !m.writable)
        {
            ShapeCategory::ImmutableObject(shape)
        } else {
            ShapeCategory::PlainObject(shape)
        }
    }
}

// ============================================================================
// Shape categories
// ============================================================================

/// The structural kind a target type belongs to for dispatch purposes.
#[derive(Debug, Clone)]
pub enum ShapeCategory {
    Primitive(PrimitiveKind),
    Enum(Arc<EnumShape>),
    /// The value is itself a type reference
    TypeValue,
    /// The value is a method or constructor reference
    MethodReference,
    /// Element type is the first generic argument
    Sequence,
    /// Key and value types are the first two generic arguments
    Map,
    Tuple(usize),
    PlainObject(Arc<ObjectShape>),
    ImmutableObject(Arc<ObjectShape>),
    DynamicPropertyObject(Arc<ObjectShape>),
    /// Abstract type; documents must name a concrete implementation
    Interface,
    /// Any value; materialized by the node's own shape and type tag
    Dynamic,
}

impl ShapeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeCategory::Primitive(_) => "Primitive",
            ShapeCategory::Enum(_) => "Enum",
            ShapeCategory::TypeValue => "TypeValue",
            ShapeCategory::MethodReference => "MethodReference",
            ShapeCategory::Sequence => "Sequence",
            ShapeCategory::Map => "Map",
            ShapeCategory::Tuple(_) => "Tuple",
            ShapeCategory::PlainObject(_) => "PlainObject",
            ShapeCategory::ImmutableObject(_) => "ImmutableObject",
            ShapeCategory::DynamicPropertyObject(_) => "DynamicPropertyObject",
            ShapeCategory::Interface => "Interface",
            ShapeCategory::Dynamic => "Dynamic",
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(
            self,
            ShapeCategory::PlainObject(_)
                | ShapeCategory::ImmutableObject(_)
                | ShapeCategory::DynamicPropertyObject(_)
                | ShapeCategory::Interface
        )
    }
}

/// Number of generic arguments a type definition accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

impl Arity {
    fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => *n > 0 && *n == count,
            Arity::Variadic => count > 0,
        }
    }
}

// ============================================================================
// Type descriptor
// ============================================================================

/// Resolved identity of a target type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: String,
    generic_args: Vec<TypeDescriptor>,
    arity: Arity,
    category: ShapeCategory,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, category: ShapeCategory) -> Self {
        TypeDescriptor {
            name: name.into(),
            generic_args: Vec::new(),
            arity: Arity::Fixed(0),
            category,
        }
    }

    /// Mark this descriptor as a generic definition
    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        TypeDescriptor::new(kind.name(), ShapeCategory::Primitive(kind))
    }

    pub fn enumeration(name: impl Into<String>, cases: &[&str]) -> Self {
        TypeDescriptor::new(name, ShapeCategory::Enum(Arc::new(EnumShape::new(cases))))
    }

    pub fn plain_object(name: impl Into<String>, shape: ObjectShape) -> Self {
        TypeDescriptor::new(name, ShapeCategory::PlainObject(Arc::new(shape)))
    }

    pub fn immutable_object(name: impl Into<String>, shape: ObjectShape) -> Self {
        TypeDescriptor::new(name, ShapeCategory::ImmutableObject(Arc::new(shape)))
    }

    pub fn dynamic_object(name: impl Into<String>, shape: ObjectShape) -> Self {
        TypeDescriptor::new(name, ShapeCategory::DynamicPropertyObject(Arc::new(shape)))
    }

    /// Object type whose category is inferred from its shape
    pub fn object(name: impl Into<String>, shape: ObjectShape) -> Self {
        TypeDescriptor::new(name, shape.infer_category())
    }

    pub fn interface(name: impl Into<String>) -> Self {
        TypeDescriptor::new(name, ShapeCategory::Interface)
    }

    /// The "any value" descriptor
    pub fn dynamic() -> TypeDescriptor {
        DYNAMIC.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }

    /// Name including generic arguments, e.g. `List<oM.Geometry.Point>`
    pub fn full_name(&self) -> String {
        if self.generic_args.is_empty() {
            return self.name.clone();
        }
        let args: Vec<String> = self.generic_args.iter().map(TypeDescriptor::full_name).collect();
        format!("{}<{}>", self.name, args.join(", "))
    }

    pub fn generic_args(&self) -> &[TypeDescriptor] {
        &self.generic_args
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn category(&self) -> &ShapeCategory {
        &self.category
    }

    /// Whether this generic definition can be closed over `count` arguments
    pub fn accepts_generic_args(&self, count: usize) -> bool {
        self.generic_args.is_empty() && self.arity.accepts(count)
    }

    /// Close a generic definition over resolved arguments
    pub fn close_over(&self, args: Vec<TypeDescriptor>) -> TypeDescriptor {
        let category = match self.category {
            ShapeCategory::Tuple(_) => ShapeCategory::Tuple(args.len()),
            ref other => other.clone(),
        };
        TypeDescriptor {
            name: self.name.clone(),
            generic_args: args,
            arity: self.arity,
            category,
        }
    }

    /// Element type of a sequence; `Object` when unparameterized
    pub fn element_type(&self) -> TypeDescriptor {
        self.generic_args.first().cloned().unwrap_or_else(TypeDescriptor::dynamic)
    }

    /// Key and value types of a keyed container; `Object` when unparameterized
    pub fn key_value_types(&self) -> (TypeDescriptor, TypeDescriptor) {
        let key = self.generic_args.first().cloned().unwrap_or_else(TypeDescriptor::dynamic);
        let value = self.generic_args.get(1).cloned().unwrap_or_else(TypeDescriptor::dynamic);
        (key, value)
    }

    pub fn object_shape(&self) -> Option<&ObjectShape> {
        match &self.category {
            ShapeCategory::PlainObject(shape)
            | ShapeCategory::ImmutableObject(shape)
            | ShapeCategory::DynamicPropertyObject(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn enum_shape(&self) -> Option<&EnumShape> {
        match &self.category {
            ShapeCategory::Enum(shape) => Some(shape),
            _ => None,
        }
    }

    /// Same type, or an object type declaring `interface` among its interfaces
    pub fn is_assignable_to(&self, target: &TypeDescriptor) -> bool {
        if self.name == target.name {
            return true;
        }
        self.object_shape()
            .map(|shape| shape.interfaces.iter().any(|i| i == &target.name))
            .unwrap_or(false)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.category, ShapeCategory::Primitive(PrimitiveKind::String))
    }

    /// Types whose empty value is a zero rather than null
    pub fn is_value_type(&self) -> bool {
        match &self.category {
            ShapeCategory::Primitive(kind) => kind.is_value_type(),
            _ => false,
        }
    }

    /// The zero/empty value for this type
    pub fn default_instance(&self) -> Instance {
        match &self.category {
            ShapeCategory::Primitive(kind) => kind.default_instance(),
            _ => Instance::Null,
        }
    }

    /// Label used in "expected to deserialise a `...`" messages
    pub fn expected_label(&self) -> &str {
        match &self.category {
            ShapeCategory::Primitive(kind) => kind.name(),
            other => other.label(),
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.generic_args == other.generic_args
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
