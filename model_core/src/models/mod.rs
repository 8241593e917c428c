//! # Domain Models
//!
//! Building-design value objects known to the default catalog, grouped by
//! assembly:
//!
//! - [`geometry`] - points, vectors, lines and polylines (`model.geometry`)
//! - [`structure`] - section profiles, materials and steel sections (`model.structure`)
//! - [`mep`] - ducts and pipes with enum-keyed property bags (`model.mep`)
//!
//! Every model implements [`Persistent`], which ties the Rust type to its
//! catalog descriptor so it can be read with
//! [`Deserializer::read`](crate::Deserializer::read).

pub mod geometry;
pub mod mep;
pub mod structure;

use std::sync::Arc;

use crate::config::DeserializerSettings;
use crate::errors::{ModelError, ModelResult};
use crate::instance::{unexpected, FromInstance, Instance, ObjectInstance};
use crate::types::{InMemoryCatalog, TypeCatalog, TypeDescriptor};

/// A Rust type with a catalog descriptor.
pub trait Persistent: FromInstance {
    /// Full catalog name
    const TYPE_NAME: &'static str;

    fn descriptor() -> TypeDescriptor;
}

/// Register every domain type and engine method
pub fn register_all(catalog: &InMemoryCatalog) {
    geometry::register(catalog);
    structure::register(catalog);
    mep::register(catalog);
}

/// Builtins plus every domain model, using the namespace families of `settings`
pub fn catalog_for(settings: &DeserializerSettings) -> Arc<dyn TypeCatalog> {
    let catalog = InMemoryCatalog::with_builtins()
        .with_namespaces(settings.model_namespace.clone(), settings.engine_namespace.clone());
    register_all(&catalog);
    Arc::new(catalog)
}

pub fn default_catalog() -> Arc<dyn TypeCatalog> {
    catalog_for(&DeserializerSettings::default())
}

/// The object behind `instance`, provided it is of type `type_name`
pub(crate) fn expect_object<'a>(instance: &'a Instance, type_name: &str) -> ModelResult<&'a ObjectInstance> {
    match instance {
        Instance::Object(object) if object.type_name() == type_name => Ok(object),
        other => Err(unexpected(type_name, other)),
    }
}

/// The case name behind `instance`, provided it is a case of `type_name`
pub(crate) fn expect_case<'a>(instance: &'a Instance, type_name: &str) -> ModelResult<&'a str> {
    match instance {
        Instance::Enum(value) if value.type_name == type_name => Ok(&value.case),
        other => Err(unexpected(type_name, other)),
    }
}

pub(crate) fn unknown_case(type_name: &str, case: &str) -> ModelError {
    ModelError::unexpected(type_name, "declared case", case)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_has_models_and_builtins() {
        let catalog = default_catalog();
        assert!(catalog.resolve_exact("oM.Geometry.Point").is_some());
        assert!(catalog.resolve_exact("oM.MEP.Duct").is_some());
        assert!(catalog.resolve_exact("List").is_some());
        assert!(catalog.resolve_engine_by_name("Engine.Geometry.Compute").is_some());
    }

    #[test]
    fn test_catalog_follows_namespace_settings() {
        let mut settings = DeserializerSettings::default();
        settings.model_namespace = "Model".to_string();
        let catalog = catalog_for(&settings);
        assert!(catalog.resolve_by_name("oM.Geometry.Point").is_none());
        assert!(catalog.resolve_exact("oM.Geometry.Point").is_some());
    }
}
