//! # Geometry
//!
//! Points and vectors are immutable and built through their `(X, Y, Z)`
//! constructor; lines and polylines are plain objects whose members are
//! set one by one.
//!
//! The `Engine.Geometry.Compute` owner carries the method references that
//! documents may point at (e.g. a stored "length of this curve" callback).

use serde::{Deserialize, Serialize};

use super::{expect_object, Persistent};
use crate::errors::ModelResult;
use crate::instance::{FromInstance, Instance};
use crate::types::{Constructor, InMemoryCatalog, MethodDescriptor, ObjectShape, TypeDescriptor};

/// Assembly declaring the geometry types
pub const ASSEMBLY: &str = "model.geometry";

/// Interface shared by every curve type
pub const CURVE_INTERFACE: &str = "oM.Geometry.ICurve";

/// Owner of the geometry compute methods
pub const COMPUTE_OWNER: &str = "Engine.Geometry.Compute";

/// A location in model space (m).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point { x, y, z }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2) + (other.z - self.z).powi(2)).sqrt()
    }
}

/// A direction and magnitude in model space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vector { x, y, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A straight segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }
}

/// An open chain of straight segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Polyline {
    pub control_points: Vec<Point>,
}

impl Polyline {
    pub fn length(&self) -> f64 {
        self.control_points
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum()
    }
}

fn xyz_shape() -> ObjectShape {
    ObjectShape::new()
        .read_only("X", "Double")
        .read_only("Y", "Double")
        .read_only("Z", "Double")
        .constructor(Constructor::new(&[("X", "Double"), ("Y", "Double"), ("Z", "Double")]))
}

impl Persistent for Point {
    const TYPE_NAME: &'static str = "oM.Geometry.Point";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::immutable_object(Self::TYPE_NAME, xyz_shape())
    }
}

impl Persistent for Vector {
    const TYPE_NAME: &'static str = "oM.Geometry.Vector";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::immutable_object(Self::TYPE_NAME, xyz_shape())
    }
}

impl Persistent for Line {
    const TYPE_NAME: &'static str = "oM.Geometry.Line";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::plain_object(
            Self::TYPE_NAME,
            ObjectShape::new()
                .member("Start", Point::TYPE_NAME)
                .member("End", Point::TYPE_NAME)
                .implements(CURVE_INTERFACE),
        )
    }
}

impl Persistent for Polyline {
    const TYPE_NAME: &'static str = "oM.Geometry.Polyline";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::plain_object(
            Self::TYPE_NAME,
            ObjectShape::new()
                .member("ControlPoints", "List<oM.Geometry.Point>")
                .implements(CURVE_INTERFACE),
        )
    }
}

impl FromInstance for Point {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let object = expect_object(instance, Self::TYPE_NAME)?;
        Ok(Point::new(object.field("X")?, object.field("Y")?, object.field("Z")?))
    }
}

impl FromInstance for Vector {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let object = expect_object(instance, Self::TYPE_NAME)?;
        Ok(Vector::new(object.field("X")?, object.field("Y")?, object.field("Z")?))
    }
}

impl FromInstance for Line {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let object = expect_object(instance, Self::TYPE_NAME)?;
        Ok(Line {
            start: object.field_or_default("Start")?,
            end: object.field_or_default("End")?,
        })
    }
}

impl FromInstance for Polyline {
    fn from_instance(instance: &Instance) -> ModelResult<Self> {
        let object = expect_object(instance, Self::TYPE_NAME)?;
        Ok(Polyline {
            control_points: object.field_or_default("ControlPoints")?,
        })
    }
}

pub(crate) fn register(catalog: &InMemoryCatalog) {
    catalog.register(ASSEMBLY, TypeDescriptor::interface(CURVE_INTERFACE));
    catalog.register(ASSEMBLY, Point::descriptor());
    catalog.register(ASSEMBLY, Vector::descriptor());
    catalog.register(ASSEMBLY, Line::descriptor());
    catalog.register(ASSEMBLY, Polyline::descriptor());
    catalog.register(
        ASSEMBLY,
        TypeDescriptor::plain_object(COMPUTE_OWNER, ObjectShape::new().not_instantiable()),
    );

    catalog.register_method(MethodDescriptor::new(
        Point::TYPE_NAME,
        MethodDescriptor::CONSTRUCTOR,
        &["Double", "Double", "Double"],
    ));
    catalog.register_method(MethodDescriptor::new(COMPUTE_OWNER, "Length", &[Line::TYPE_NAME]));
    catalog.register_method(MethodDescriptor::new(COMPUTE_OWNER, "Length", &[Polyline::TYPE_NAME]));
    catalog.register_method(MethodDescriptor::new(
        COMPUTE_OWNER,
        "Distance",
        &[Point::TYPE_NAME, Point::TYPE_NAME],
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticLog;
    use crate::models::default_catalog;
    use crate::value::{Document, ValueNode};
    use crate::Deserializer;

    fn point(x: f64, y: f64, z: f64) -> ValueNode {
        ValueNode::Map(Document::tagged("Point").with("X", x).with("Y", y).with("Z", z))
    }

    #[test]
    fn test_read_polyline() {
        let de = Deserializer::new(default_catalog());
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("oM.Geometry.Polyline").with(
            "ControlPoints",
            vec![point(0.0, 0.0, 0.0), point(3.0, 0.0, 0.0), point(3.0, 4.0, 0.0)],
        ));
        let polyline: Polyline = de.read(&node, &log).unwrap();
        assert_eq!(polyline.control_points.len(), 3);
        assert!((polyline.length() - 7.0).abs() < 1e-12);
        assert!(log.is_empty());
    }

    #[test]
    fn test_line_with_missing_end_defaults_to_origin() {
        let de = Deserializer::new(default_catalog());
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("Line").with("Start", point(1.0, 1.0, 1.0)));
        let line: Line = de.read(&node, &log).unwrap();
        assert_eq!(line.end, Point::default());
    }

    #[test]
    fn test_integer_coordinates_widen() {
        let de = Deserializer::new(default_catalog());
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("Vector").with("X", 3).with("Y", 4).with("Z", 0));
        let vector: Vector = de.read(&node, &log).unwrap();
        assert_eq!(vector.length(), 5.0);
    }

    #[test]
    fn test_serde_uses_document_field_names() {
        let json = serde_json::to_value(Point::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(json, serde_json::json!({ "X": 1.0, "Y": 2.0, "Z": 3.0 }));
    }
}
