//! # Structural Sections
//!
//! Cross-section profiles implement the `IProfile` interface, so a member
//! typed as a profile accepts any of them as long as the document tags the
//! concrete type. Profile constructors validate their dimensions.
//!
//! `SteelSection` carries a `CustomData` extension slot: fields written by
//! newer or third-party tools land there instead of failing the read.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::{expect_case, expect_object, unknown_case, Persistent};
use crate::errors::ModelResult;
use crate::instance::{unexpected, FromInstance, Instance};
use crate::types::{Constructor, InMemoryCatalog, ObjectShape, TypeDescriptor};

/// Assembly declaring the structural types
pub const ASSEMBLY: &str = "model.structure";

/// Structural material family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialType {
    Steel,
    Concrete,
    Timber,
    Aluminium,
}

impl MaterialType {
    pub const ALL: [MaterialType; 4] = [
        MaterialType::Steel,
        MaterialType::Concrete,
        MaterialType::Timber,
        MaterialType::Aluminium,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MaterialType::Steel => "Steel",
            MaterialType::Concrete => "Concrete",
            MaterialType::Timber => "Timber",
            MaterialType::Aluminium => "Aluminium",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl std::fmt::Display for MaterialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Solid or hollow rectangle, optionally with rounded corners (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RectangleProfile {
    pub height: f64,
    pub width: f64,
    pub corner_radius: f64,
}

impl RectangleProfile {
    pub fn area(&self) -> f64 {
        let r = self.corner_radius;
        self.height * self.width - (4.0 - std::f64::consts::PI) * r * r
    }
}

/// Solid circle (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CircleProfile {
    pub diameter: f64,
}

impl CircleProfile {
    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.diameter * self.diameter / 4.0
    }
}

/// Any profile implementing `oM.Structure.IProfile`.
///
/// ## JSON Serialization
///
/// ```json
/// { "type": "Circle", "Diameter": 0.1 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Profile {
    Rectangle(RectangleProfile),
    Circle(CircleProfile),
}

impl Profile {
    pub fn area(&self) -> f64 {
        match self {
            Profile::Rectangle(p) => p.area(),
            Profile::Circle(p) => p.area(),
        }
    }
}

/// A steel member section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SteelSection {
    pub name: Option<String>,
    pub profile: Option<Profile>,
    /// Cross-section area (m²)
    pub area: f64,
    pub material: Option<MaterialType>,
    /// Fields with no matching member, as written in the document
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub custom_data: IndexMap<String, Json>,
}

fn positive(value: &Instance) -> bool {
    f64::from_instance(value).map(|v| v > 0.0).unwrap_or(false)
}

fn check_rectangle(arguments: &[Instance]) -> Result<(), String> {
    match arguments {
        [height, width, radius] => {
            if !positive(height) || !positive(width) {
                return Err("height and width must be positive".to_string());
            }
            let h = f64::from_instance(height).unwrap_or(0.0);
            let w = f64::from_instance(width).unwrap_or(0.0);
            let r = f64::from_instance(radius).unwrap_or(0.0);
            if r < 0.0 || r > h.min(w) / 2.0 {
                return Err(format!("corner radius {} does not fit a {} x {} rectangle", r, h, w));
            }
            Ok(())
        }
        _ => Err(format!("expected 3 arguments, received {}", arguments.len())),
    }
}

fn check_circle(arguments: &[Instance]) -> Result<(), String> {
    match arguments {
        [diameter] if positive(diameter) => Ok(()),
        [_] => Err("diameter must be positive".to_string()),
        _ => Err(format!("expected 1 argument, received {}", arguments.len())),
    }
}

impl Persistent for MaterialType {
    const TYPE_NAME: &'static str = "oM.Structure.MaterialType";

    fn descriptor() -> TypeDescriptor {
        let names: Vec<&str> = Self::ALL.iter().map(MaterialType::name).collect();
        TypeDescriptor::enumeration(Self::TYPE_NAME, &names)
    }
}

impl Persistent for RectangleProfile {
    const TYPE_NAME: &'static str = "oM.Structure.RectangleProfile";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::immutable_object(
            Self::TYPE_NAME,
            ObjectShape::new()
                .read_only("Height", "Double")
                .read_only("Width", "Double")
                .read_only("CornerRadius", "Double")
                .constructor(
                    Constructor::new(&[("Height", "Double"), ("Width", "Double"), ("CornerRadius", "Double")])
                        .with_check(check_rectangle),
                )
                .implements(Profile::TYPE_NAME),
        )
    }
}

impl Persistent for CircleProfile {
    const TYPE_NAME: &'static str = "oM.Structure.CircleProfile";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::immutable_object(
            Self::TYPE_NAME,
            ObjectShape::new()
                .read_only("Diameter", "Double")
                .constructor(Constructor::new(&[("Diameter", "Double")]).with_check(check_circle))
                .implements(Profile::TYPE_NAME),
        )
    }
}

impl Persistent for Profile {
    const TYPE_NAME: &'static str = "oM.Structure.IProfile";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::interface(Self::TYPE_NAME)
    }
}

impl Persistent for SteelSection {
    const TYPE_NAME: &'static str = "oM.Structure.SteelSection";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::plain_object(
            Self::TYPE_NAME,
            ObjectShape::new()
                .member("Name", "String")
                .member("Profile", Profile::TYPE_NAME)
                .member("Area", "Double")
                .member("Material", MaterialType::TYPE_NAME)
                .extension("CustomData"),
        )
    }
}

impl FromInstance for MaterialType {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let case = expect_case(instance, Self::TYPE_NAME)?;
        Self::from_name(case).ok_or_else(|| unknown_case(Self::TYPE_NAME, case))
    }
}

impl FromInstance for RectangleProfile {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let object = expect_object(instance, Self::TYPE_NAME)?;
        Ok(RectangleProfile {
            height: object.field("Height")?,
            width: object.field("Width")?,
            corner_radius: object.field_or_default("CornerRadius")?,
        })
    }
}

impl FromInstance for CircleProfile {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let object = expect_object(instance, Self::TYPE_NAME)?;
        Ok(CircleProfile {
            diameter: object.field("Diameter")?,
        })
    }
}

impl FromInstance for Profile {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        match instance {
            Instance::Object(o) if o.type_name() == RectangleProfile::TYPE_NAME => {
                RectangleProfile::from_instance(instance).map(Profile::Rectangle)
            }
            Instance::Object(o) if o.type_name() == CircleProfile::TYPE_NAME => {
                CircleProfile::from_instance(instance).map(Profile::Circle)
            }
            other => Err(unexpected(Self::TYPE_NAME, other)),
        }
    }
}

impl FromInstance for SteelSection {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let object = expect_object(instance, Self::TYPE_NAME)?;
        Ok(SteelSection {
            name: object.field_or_default("Name")?,
            profile: object.field_or_default("Profile")?,
            area: object.field_or_default("Area")?,
            material: object.field_or_default("Material")?,
            custom_data: object
                .extension()
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        })
    }
}

pub(crate) fn register(catalog: &InMemoryCatalog) {
    catalog.register(ASSEMBLY, Profile::descriptor());
    catalog.register(ASSEMBLY, RectangleProfile::descriptor());
    catalog.register(ASSEMBLY, CircleProfile::descriptor());
    catalog.register(ASSEMBLY, MaterialType::descriptor());
    catalog.register(ASSEMBLY, SteelSection::descriptor());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticLog;
    use crate::models::default_catalog;
    use crate::value::{Document, ValueNode};
    use crate::Deserializer;

    #[test]
    fn test_read_section_with_profile_and_material() {
        let de = Deserializer::new(default_catalog());
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("oM.Structure.SteelSection")
                .with("Name", "CHS 100")
                .with("Profile", Document::tagged("CircleProfile").with("Diameter", 0.1))
                .with("Area", 0.0012)
                .with("Material", "Steel"),
        );
        let section: SteelSection = de.read(&node, &log).unwrap();
        assert_eq!(section.name.as_deref(), Some("CHS 100"));
        assert_eq!(section.profile, Some(Profile::Circle(CircleProfile { diameter: 0.1 })));
        assert_eq!(section.material, Some(MaterialType::Steel));
        assert!(section.custom_data.is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_custom_data_keeps_unknown_fields() {
        let de = Deserializer::new(default_catalog());
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("SteelSection").with("Fabricator", "ACME").with("Area", 1));
        let section: SteelSection = de.read(&node, &log).unwrap();
        assert_eq!(section.custom_data.get("Fabricator"), Some(&Json::from("ACME")));
        assert_eq!(section.area, 1.0);
        assert_eq!(log.warnings().len(), 1);
    }

    #[test]
    fn test_rectangle_checks() {
        assert!(check_rectangle(&[Instance::Double(0.3), Instance::Double(0.2), Instance::Double(0.01)]).is_ok());
        assert!(check_rectangle(&[Instance::Double(0.3), Instance::Double(0.2), Instance::Double(0.2)]).is_err());
        assert!(check_circle(&[Instance::Double(0.0)]).is_err());
    }

    #[test]
    fn test_unknown_material_case() {
        let value = Instance::Enum(crate::instance::EnumValue {
            type_name: MaterialType::TYPE_NAME.into(),
            case: "Glass".into(),
            ordinal: 9,
        });
        assert!(MaterialType::from_instance(&value).is_err());
    }

    #[test]
    fn test_profile_area() {
        let circle = Profile::Circle(CircleProfile { diameter: 2.0 });
        assert!((circle.area() - std::f64::consts::PI).abs() < 1e-12);
    }
}
