//! Enumeration codec.

use super::{shape_mismatch, Context, Deserializer};
use crate::errors::{Failure, FailureKind};
use crate::instance::{EnumValue, Instance};
use crate::types::{EnumCase, EnumShape, TypeDescriptor};
use crate::value::ValueNode;

impl Deserializer {
    /// A case name (case-sensitive), an ordinal, or a tagged document
    /// `{ _t: <enum>, Value: <name|ordinal> }`.
    ///
    /// An unmatched value is an error; it is never silently replaced by the
    /// first case.
    pub(super) fn read_enum(
        &self,
        node: &ValueNode,
        target: &TypeDescriptor,
        shape: &EnumShape,
        ctx: &Context<'_>,
    ) -> Result<Instance, Failure> {
        let raw = match node {
            ValueNode::String(_) | ValueNode::Int32(_) | ValueNode::Int64(_) => node,
            ValueNode::Map(doc) => {
                let tag = self.resolve_tag(doc.type_tag().unwrap_or(&ValueNode::Null), ctx);
                match tag {
                    Some(found) if found.name() == target.name() => doc.get("Value").unwrap_or(&ValueNode::Null),
                    _ => return Err(shape_mismatch(target, node)),
                }
            }
            _ => return Err(shape_mismatch(target, node)),
        };

        let case = match raw {
            ValueNode::String(name) => shape.by_name(name),
            ValueNode::Int32(ordinal) => shape.by_ordinal(*ordinal),
            ValueNode::Int64(ordinal) => i32::try_from(*ordinal).ok().and_then(|o| shape.by_ordinal(o)),
            _ => None,
        };

        case.map(|c| enum_value(target, c)).ok_or_else(|| {
            let shown = match raw {
                ValueNode::String(s) => s.clone(),
                ValueNode::Int32(i) => i.to_string(),
                ValueNode::Int64(i) => i.to_string(),
                other => other.kind_name().to_string(),
            };
            Failure::new(
                FailureKind::ShapeMismatch,
                format!("`{}` is not a case of enum `{}`", shown, target.name()),
            )
        })
    }
}

fn enum_value(target: &TypeDescriptor, case: &EnumCase) -> Instance {
    Instance::Enum(EnumValue {
        type_name: target.name().to_string(),
        case: case.name.clone(),
        ordinal: case.ordinal,
    })
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::DiagnosticLog;
    use crate::instance::{EnumValue, Instance};
    use crate::models::default_catalog;
    use crate::value::{Document, ValueNode};
    use crate::Deserializer;

    fn material(case: &str, ordinal: i32) -> Instance {
        Instance::Enum(EnumValue {
            type_name: "oM.Structure.MaterialType".into(),
            case: case.into(),
            ordinal,
        })
    }

    fn read(node: ValueNode, log: &DiagnosticLog) -> Instance {
        let de = Deserializer::new(default_catalog());
        let target = de.resolve("oM.Structure.MaterialType", log).unwrap();
        de.materialize(&node, &target, None, "0.1.0", false, log)
    }

    #[test]
    fn test_by_name_and_ordinal() {
        let log = DiagnosticLog::new();
        assert_eq!(read(ValueNode::from("Concrete"), &log), material("Concrete", 1));
        assert_eq!(read(ValueNode::Int32(2), &log), material("Timber", 2));
        assert!(log.is_empty());
    }

    #[test]
    fn test_tagged_document() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("oM.Structure.MaterialType").with("Value", "Steel"));
        assert_eq!(read(node, &log), material("Steel", 0));
        assert!(log.is_empty());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let log = DiagnosticLog::new();
        assert_eq!(read(ValueNode::from("steel"), &log), Instance::Null);
        let errors = log.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "`steel` is not a case of enum `oM.Structure.MaterialType`");
    }
}
