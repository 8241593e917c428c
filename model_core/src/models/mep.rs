//! # Mechanical, Electrical & Plumbing
//!
//! Ducts and pipes keep their less common attributes in enum-keyed property
//! bags. Documents may write those attributes either inside the bag or as
//! top-level fields named after the enum case:
//!
//! ```json
//! { "_t": "oM.MEP.Duct", "FlowRate": 0.4, "Roughness": 0.00009 }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::geometry::Line;
use super::structure::{MaterialType, Profile};
use super::{expect_case, expect_object, unknown_case, Persistent};
use crate::errors::ModelResult;
use crate::instance::{FromInstance, Instance};
use crate::types::{InMemoryCatalog, ObjectShape, TypeDescriptor};

/// Assembly declaring the MEP types
pub const ASSEMBLY: &str = "model.mep";

/// Optional duct attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DuctProperty {
    /// Absolute surface roughness (m)
    Roughness,
    /// Insulation thickness (m)
    InsulationThickness,
    /// Design air velocity (m/s)
    AirVelocity,
    /// Pressure drop per unit length (Pa/m)
    PressureDrop,
}

impl DuctProperty {
    pub const ALL: [DuctProperty; 4] = [
        DuctProperty::Roughness,
        DuctProperty::InsulationThickness,
        DuctProperty::AirVelocity,
        DuctProperty::PressureDrop,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DuctProperty::Roughness => "Roughness",
            DuctProperty::InsulationThickness => "InsulationThickness",
            DuctProperty::AirVelocity => "AirVelocity",
            DuctProperty::PressureDrop => "PressureDrop",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Optional pipe attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipeProperty {
    Roughness,
    /// Operating pressure (bar)
    Pressure,
    /// Fluid temperature (°C)
    Temperature,
    InsulationThickness,
}

impl PipeProperty {
    pub const ALL: [PipeProperty; 4] = [
        PipeProperty::Roughness,
        PipeProperty::Pressure,
        PipeProperty::Temperature,
        PipeProperty::InsulationThickness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipeProperty::Roughness => "Roughness",
            PipeProperty::Pressure => "Pressure",
            PipeProperty::Temperature => "Temperature",
            PipeProperty::InsulationThickness => "InsulationThickness",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// An air duct run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Duct {
    pub centreline: Option<Line>,
    pub profile: Option<Profile>,
    /// Volumetric flow rate (m³/s)
    pub flow_rate: f64,
    pub properties: IndexMap<DuctProperty, f64>,
}

/// A pipe run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pipe {
    pub centreline: Option<Line>,
    /// Outside diameter (m)
    pub diameter: f64,
    /// Wall thickness (m)
    pub thickness: f64,
    pub material: Option<MaterialType>,
    pub properties: IndexMap<PipeProperty, f64>,
}

impl Persistent for DuctProperty {
    const TYPE_NAME: &'static str = "oM.MEP.DuctProperty";

    fn descriptor() -> TypeDescriptor {
        let names: Vec<&str> = Self::ALL.iter().map(DuctProperty::name).collect();
        TypeDescriptor::enumeration(Self::TYPE_NAME, &names)
    }
}

impl Persistent for PipeProperty {
    const TYPE_NAME: &'static str = "oM.MEP.PipeProperty";

    fn descriptor() -> TypeDescriptor {
        let names: Vec<&str> = Self::ALL.iter().map(PipeProperty::name).collect();
        TypeDescriptor::enumeration(Self::TYPE_NAME, &names)
    }
}

impl Persistent for Duct {
    const TYPE_NAME: &'static str = "oM.MEP.Duct";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::dynamic_object(
            Self::TYPE_NAME,
            ObjectShape::new()
                .member("Centreline", Line::TYPE_NAME)
                .member("Profile", Profile::TYPE_NAME)
                .member("FlowRate", "Double")
                .dynamic_container("Properties", "Dictionary<oM.MEP.DuctProperty, Double>"),
        )
    }
}

impl Persistent for Pipe {
    const TYPE_NAME: &'static str = "oM.MEP.Pipe";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::dynamic_object(
            Self::TYPE_NAME,
            ObjectShape::new()
                .member("Centreline", Line::TYPE_NAME)
                .member("Diameter", "Double")
                .member("Thickness", "Double")
                .member("Material", MaterialType::TYPE_NAME)
                .dynamic_container("Properties", "Dictionary<oM.MEP.PipeProperty, Double>"),
        )
    }
}

impl FromInstance for DuctProperty {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let case = expect_case(instance, Self::TYPE_NAME)?;
        Self::from_name(case).ok_or_else(|| unknown_case(Self::TYPE_NAME, case))
    }
}

impl FromInstance for PipeProperty {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let case = expect_case(instance, Self::TYPE_NAME)?;
        Self::from_name(case).ok_or_else(|| unknown_case(Self::TYPE_NAME, case))
    }
}

impl FromInstance for Duct {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let object = expect_object(instance, Self::TYPE_NAME)?;
        Ok(Duct {
            centreline: object.field_or_default("Centreline")?,
            profile: object.field_or_default("Profile")?,
            flow_rate: object.field_or_default("FlowRate")?,
            properties: object.field_or_default("Properties")?,
        })
    }
}

impl FromInstance for Pipe {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let object = expect_object(instance, Self::TYPE_NAME)?;
        Ok(Pipe {
            centreline: object.field_or_default("Centreline")?,
            diameter: object.field_or_default("Diameter")?,
            thickness: object.field_or_default("Thickness")?,
            material: object.field_or_default("Material")?,
            properties: object.field_or_default("Properties")?,
        })
    }
}

pub(crate) fn register(catalog: &InMemoryCatalog) {
    catalog.register(ASSEMBLY, DuctProperty::descriptor());
    catalog.register(ASSEMBLY, PipeProperty::descriptor());
    catalog.register(ASSEMBLY, Duct::descriptor());
    catalog.register(ASSEMBLY, Pipe::descriptor());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticLog;
    use crate::models::default_catalog;
    use crate::value::{Document, ValueNode};
    use crate::Deserializer;

    #[test]
    fn test_read_duct_with_top_level_properties() {
        let de = Deserializer::new(default_catalog());
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("oM.MEP.Duct")
                .with("FlowRate", 0.4)
                .with(
                    "Profile",
                    Document::tagged("RectangleProfile")
                        .with("Height", 0.3)
                        .with("Width", 0.5)
                        .with("CornerRadius", 0.0),
                )
                .with("Roughness", 0.00009)
                .with("AirVelocity", 4.5),
        );
        let duct: Duct = de.read(&node, &log).unwrap();
        assert_eq!(duct.flow_rate, 0.4);
        assert_eq!(duct.properties.get(&DuctProperty::Roughness), Some(&0.00009));
        assert_eq!(duct.properties.get(&DuctProperty::AirVelocity), Some(&4.5));
        assert!(matches!(duct.profile, Some(Profile::Rectangle(_))));
    }

    #[test]
    fn test_read_pipe_with_wrapped_pairs() {
        let de = Deserializer::new(default_catalog());
        let log = DiagnosticLog::new();
        let pairs = ValueNode::Array(vec![ValueNode::Map(Document::new().with("k", "Pressure").with("v", 6.0))]);
        let node = ValueNode::Map(
            Document::tagged("Pipe")
                .with("Diameter", 0.054)
                .with("Thickness", 0.0012)
                .with("Material", 1)
                .with("Properties", Document::new().with("_v", pairs))
                .with("Temperature", 60.0),
        );
        let pipe: Pipe = de.read(&node, &log).unwrap();
        assert_eq!(pipe.material, Some(MaterialType::Concrete));
        assert_eq!(pipe.properties.len(), 2);
        assert_eq!(pipe.properties.get(&PipeProperty::Temperature), Some(&60.0));
        assert!(log.is_empty());
    }

    #[test]
    fn test_not_instantiable_duct_is_captured() {
        let catalog = crate::types::InMemoryCatalog::with_builtins();
        crate::models::register_all(&catalog);
        catalog.register(
            "legacy.mep",
            TypeDescriptor::dynamic_object(
                "oM.MEP.LegacyDuct",
                ObjectShape::new()
                    .dynamic_container("Properties", "Dictionary<oM.MEP.DuctProperty, Double>")
                    .not_instantiable(),
            ),
        );
        let de = Deserializer::new(std::sync::Arc::new(catalog));
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("oM.MEP.LegacyDuct").with("Roughness", 0.1));
        let value = de.materialize_document(&node, &log);
        assert!(value.as_capture().is_some());
        assert!(log.errors()[0].message.contains("cannot construct"));
    }
}
