//! # Materialized Instances
//!
//! The object graph produced by the deserializer. An [`Instance`] is a closed
//! tagged union; object values keep their resolved [`TypeDescriptor`] so the
//! reconstructor can check assignability against declared member types.
//!
//! When a document cannot be reconstructed faithfully it becomes a
//! [`CaptureObject`], which keeps the original type tag, the schema version
//! in effect and every field.
//!
//! Typed domain values are extracted with [`FromInstance`]:
//!
//! ```rust
//! use model_core::instance::{FromInstance, Instance};
//!
//! let values = Instance::Sequence(vec![Instance::Double(1.0), Instance::Int32(2)]);
//! let extracted: Vec<f64> = Vec::from_instance(&values).unwrap();
//! assert_eq!(extracted, vec![1.0, 2.0]);
//! ```

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value as Json};
use uuid::Uuid;

use crate::errors::{ModelError, ModelResult};
use crate::types::{MethodDescriptor, ShapeCategory, TypeDescriptor};

/// A materialized value.
#[derive(Debug, Clone, PartialEq)]
pub enum Instance {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal(Decimal),
    String(String),
    TimeSpan(chrono::Duration),
    DateTimeOffset(DateTime<FixedOffset>),
    Guid(Uuid),
    Enum(EnumValue),
    Type(TypeDescriptor),
    Method(MethodDescriptor),
    Sequence(Vec<Instance>),
    Map(KeyedMap),
    Tuple(Vec<Instance>),
    Object(ObjectInstance),
    Capture(CaptureObject),
}

impl Instance {
    /// Kind label used in diagnostics
    pub fn kind_name(&self) -> String {
        match self {
            Instance::Null => "Null".to_string(),
            Instance::Bool(_) => "Bool".to_string(),
            Instance::Int32(_) => "Int32".to_string(),
            Instance::Int64(_) => "Int64".to_string(),
            Instance::Double(_) => "Double".to_string(),
            Instance::Decimal(_) => "Decimal".to_string(),
            Instance::String(_) => "String".to_string(),
            Instance::TimeSpan(_) => "TimeSpan".to_string(),
            Instance::DateTimeOffset(_) => "DateTimeOffset".to_string(),
            Instance::Guid(_) => "Guid".to_string(),
            Instance::Enum(e) => e.type_name.clone(),
            Instance::Type(_) => "Type".to_string(),
            Instance::Method(_) => "Method".to_string(),
            Instance::Sequence(_) => "Sequence".to_string(),
            Instance::Map(_) => "Map".to_string(),
            Instance::Tuple(items) => format!("Tuple({})", items.len()),
            Instance::Object(o) => o.type_name().to_string(),
            Instance::Capture(c) => format!("Capture({})", c.type_tag),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Instance::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectInstance> {
        match self {
            Instance::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_capture(&self) -> Option<&CaptureObject> {
        match self {
            Instance::Capture(c) => Some(c),
            _ => None,
        }
    }

    /// Whether this value may be stored in a member or parameter of type `target`.
    ///
    /// Captured objects only fit untyped (`Object`) slots, which is how a
    /// failed nested reconstruction surfaces as a type mismatch in its parent.
    pub fn conforms_to(&self, target: &TypeDescriptor) -> bool {
        use crate::types::PrimitiveKind as P;

        match (self, target.category()) {
            (_, ShapeCategory::Dynamic) => true,
            (Instance::Null, _) => !target.is_value_type(),
            (Instance::Bool(_), ShapeCategory::Primitive(P::Bool)) => true,
            (Instance::Int32(_), ShapeCategory::Primitive(P::Int32)) => true,
            (Instance::Int64(_), ShapeCategory::Primitive(P::Int64)) => true,
            (Instance::Double(_), ShapeCategory::Primitive(P::Double)) => true,
            (Instance::Decimal(_), ShapeCategory::Primitive(P::Decimal)) => true,
            (Instance::String(_), ShapeCategory::Primitive(P::String)) => true,
            (Instance::TimeSpan(_), ShapeCategory::Primitive(P::TimeSpan)) => true,
            (Instance::DateTimeOffset(_), ShapeCategory::Primitive(P::DateTimeOffset)) => true,
            (Instance::Guid(_), ShapeCategory::Primitive(P::Guid)) => true,
            (Instance::Enum(e), ShapeCategory::Enum(_)) => e.type_name == target.name(),
            (Instance::Type(_), ShapeCategory::TypeValue) => true,
            (Instance::Method(_), ShapeCategory::MethodReference) => true,
            (Instance::Sequence(_), ShapeCategory::Sequence) => true,
            (Instance::Map(_), ShapeCategory::Map) => true,
            (Instance::Tuple(items), ShapeCategory::Tuple(n)) => items.len() == *n,
            (Instance::Object(o), category) if category.is_object() => o.descriptor().is_assignable_to(target),
            _ => false,
        }
    }

    /// Debug view of the instance as JSON
    pub fn to_json(&self) -> Json {
        match self {
            Instance::Null => Json::Null,
            Instance::Bool(b) => json!(b),
            Instance::Int32(i) => json!(i),
            Instance::Int64(i) => json!(i),
            Instance::Double(d) => json!(d),
            Instance::Decimal(d) => json!(d.to_string()),
            Instance::String(s) => json!(s),
            Instance::TimeSpan(d) => json!(d.to_string()),
            Instance::DateTimeOffset(t) => json!(t.to_rfc3339()),
            Instance::Guid(g) => json!(g.to_string()),
            Instance::Enum(e) => json!(format!("{}.{}", e.type_name, e.case)),
            Instance::Type(t) => json!({ "Type": t.full_name() }),
            Instance::Method(m) => json!({ "Method": m.to_string() }),
            Instance::Sequence(items) | Instance::Tuple(items) => {
                Json::Array(items.iter().map(Instance::to_json).collect())
            }
            Instance::Map(map) => Json::Array(
                map.iter()
                    .map(|(k, v)| json!({ "k": k.to_json(), "v": v.to_json() }))
                    .collect(),
            ),
            Instance::Object(o) => {
                let mut out = serde_json::Map::new();
                out.insert("_t".to_string(), json!(o.type_name()));
                for (name, value) in o.fields() {
                    out.insert(name.clone(), value.to_json());
                }
                if !o.extension().is_empty() {
                    let ext: serde_json::Map<String, Json> =
                        o.extension().iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                    out.insert("_extension".to_string(), Json::Object(ext));
                }
                Json::Object(out)
            }
            Instance::Capture(c) => {
                let fields: serde_json::Map<String, Json> =
                    c.fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                json!({
                    "_capture": c.type_tag,
                    "_version": c.schema_version,
                    "fields": fields,
                })
            }
        }
    }
}

/// A resolved enumeration case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: String,
    pub case: String,
    pub ordinal: i32,
}

/// Keyed container contents. Keys keep insertion order; inserting an equal
/// key replaces the previous value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyedMap {
    entries: Vec<(Instance, Instance)>,
}

impl KeyedMap {
    pub fn new() -> Self {
        KeyedMap::default()
    }

    pub fn insert(&mut self, key: Instance, value: Instance) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &Instance) -> Option<&Instance> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Lookup by string key
    pub fn get_str(&self, key: &str) -> Option<&Instance> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, Instance::String(s) if s == key))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Instance, &Instance)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

/// A reconstructed object: its resolved type, the members that were set and
/// any fields absorbed by the extension-data slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInstance {
    descriptor: TypeDescriptor,
    fields: IndexMap<String, Instance>,
    extension: IndexMap<String, Instance>,
}

impl ObjectInstance {
    pub fn new(descriptor: TypeDescriptor) -> Self {
        ObjectInstance {
            descriptor,
            fields: IndexMap::new(),
            extension: IndexMap::new(),
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Instance) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &IndexMap<String, Instance> {
        &self.fields
    }

    pub fn extension(&self) -> &IndexMap<String, Instance> {
        &self.extension
    }

    pub fn extension_mut(&mut self) -> &mut IndexMap<String, Instance> {
        &mut self.extension
    }

    /// Typed member value; missing members are an error
    pub fn field<T: FromInstance>(&self, name: &str) -> ModelResult<T> {
        let value = self
            .fields
            .get(name)
            .ok_or_else(|| ModelError::missing_field(format!("{}.{}", self.short_name(), name)))?;
        T::from_instance(value).map_err(|e| match e {
            ModelError::UnexpectedInstance { expected, found, .. } => {
                ModelError::unexpected(format!("{}.{}", self.short_name(), name), expected, found)
            }
            other => other,
        })
    }

    /// Typed member value, or the type's default when the member was never set
    pub fn field_or_default<T: FromInstance + Default>(&self, name: &str) -> ModelResult<T> {
        match self.fields.get(name) {
            None | Some(Instance::Null) => Ok(T::default()),
            Some(_) => self.field(name),
        }
    }

    fn short_name(&self) -> &str {
        self.descriptor.short_name()
    }
}

/// Generic capture of a document that could not be reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureObject {
    /// Original `_t` of the document, or `unknown`
    pub type_tag: String,
    /// Schema version in effect when the document was read
    pub schema_version: String,
    /// Every non-reserved field, materialized without a target type
    pub fields: IndexMap<String, Instance>,
}

// ============================================================================
// Typed extraction
// ============================================================================

/// Conversion from a materialized instance into a Rust value.
pub trait FromInstance: Sized {
    fn from_instance(instance: &Instance) -> ModelResult<Self>;
}

/// Shared guard: captured objects are reported as such, anything else as a
/// plain shape mismatch.
pub fn unexpected(expected: &str, found: &Instance) -> ModelError {
    match found {
        Instance::Capture(c) => ModelError::Captured {
            type_tag: c.type_tag.clone(),
            field_count: c.fields.len(),
        },
        other => ModelError::unexpected("value", expected, other.kind_name()),
    }
}

impl FromInstance for Instance {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        Ok(instance.clone())
    }
}

impl FromInstance for bool {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Bool(b) => Ok(*b),
            other => Err(unexpected("Bool", other)),
        }
    }
}

impl FromInstance for i32 {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Int32(i) => Ok(*i),
            other => Err(unexpected("Int32", other)),
        }
    }
}

impl FromInstance for i64 {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Int64(i) => Ok(*i),
            Instance::Int32(i) => Ok(i64::from(*i)),
            other => Err(unexpected("Int64", other)),
        }
    }
}

impl FromInstance for f64 {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Double(d) => Ok(*d),
            Instance::Int32(i) => Ok(f64::from(*i)),
            Instance::Int64(i) => Ok(*i as f64),
            Instance::Decimal(d) => d.to_f64().ok_or_else(|| unexpected("Double", instance)),
            other => Err(unexpected("Double", other)),
        }
    }
}

impl FromInstance for Decimal {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Decimal(d) => Ok(*d),
            other => Err(unexpected("Decimal", other)),
        }
    }
}

impl FromInstance for String {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::String(s) => Ok(s.clone()),
            other => Err(unexpected("String", other)),
        }
    }
}

impl FromInstance for Uuid {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Guid(g) => Ok(*g),
            other => Err(unexpected("Guid", other)),
        }
    }
}

impl FromInstance for DateTime<FixedOffset> {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::DateTimeOffset(t) => Ok(*t),
            other => Err(unexpected("DateTimeOffset", other)),
        }
    }
}

impl<T: FromInstance> FromInstance for Option<T> {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Null => Ok(None),
            other => T::from_instance(other).map(Some),
        }
    }
}

impl<T: FromInstance> FromInstance for Vec<T> {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Sequence(items) => items.iter().map(T::from_instance).collect(),
            Instance::Null => Ok(Vec::new()),
            other => Err(unexpected("Sequence", other)),
        }
    }
}

impl<K, V> FromInstance for IndexMap<K, V>
where
    K: FromInstance + std::hash::Hash + Eq,
    V: FromInstance,
{
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Map(map) => map
                .iter()
                .map(|(k, v)| Ok((K::from_instance(k)?, V::from_instance(v)?)))
                .collect(),
            Instance::Null => Ok(IndexMap::new()),
            other => Err(unexpected("Map", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObjectShape, PrimitiveKind};

    fn line_type() -> TypeDescriptor {
        TypeDescriptor::plain_object("oM.Geometry.Line", ObjectShape::new().implements("ICurve"))
    }

    #[test]
    fn test_conformance_of_primitives() {
        let double = TypeDescriptor::primitive(PrimitiveKind::Double);
        assert!(Instance::Double(1.0).conforms_to(&double));
        assert!(!Instance::String("1".into()).conforms_to(&double));
        assert!(!Instance::Null.conforms_to(&double));
        assert!(Instance::Null.conforms_to(&TypeDescriptor::primitive(PrimitiveKind::String)));
    }

    #[test]
    fn test_capture_only_fits_dynamic() {
        let capture = Instance::Capture(CaptureObject {
            type_tag: "oM.Geometry.Line".into(),
            schema_version: "0.1.0".into(),
            fields: IndexMap::new(),
        });
        assert!(!capture.conforms_to(&line_type()));
        assert!(capture.conforms_to(&TypeDescriptor::dynamic()));
    }

    #[test]
    fn test_object_conforms_to_interface() {
        let line = Instance::Object(ObjectInstance::new(line_type()));
        assert!(line.conforms_to(&TypeDescriptor::interface("ICurve")));
        assert!(!line.conforms_to(&TypeDescriptor::interface("IProfile")));
    }

    #[test]
    fn test_keyed_map_replaces_equal_keys() {
        let mut map = KeyedMap::new();
        map.insert(Instance::String("a".into()), Instance::Int32(1));
        map.insert(Instance::String("a".into()), Instance::Int32(2));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_str("a"), Some(&Instance::Int32(2)));
    }

    #[test]
    fn test_field_extraction_errors_name_the_member() {
        let object = ObjectInstance::new(line_type());
        let err = object.field::<f64>("Length").unwrap_err();
        assert_eq!(err, ModelError::missing_field("Line.Length"));
        assert_eq!(object.field_or_default::<f64>("Length").unwrap(), 0.0);
    }

    #[test]
    fn test_captured_extraction_reports_capture() {
        let capture = Instance::Capture(CaptureObject {
            type_tag: "Point".into(),
            schema_version: "0.1.0".into(),
            fields: IndexMap::new(),
        });
        let err = f64::from_instance(&capture).unwrap_err();
        assert_eq!(err.error_code(), "CAPTURED");
    }
}
