//! Object reconstruction.
//!
//! One attempt per document: immutable objects go through their greediest
//! constructor, plain objects get their members set one by one, and
//! dynamic-property objects have enum-named fields folded into their keyed
//! containers first. Diagnostics of an attempt are buffered; a failed
//! attempt drops them and escalates through the migration gate instead.

use tracing::trace;

use super::{shape_mismatch, shape_mismatch_label, Context, Deserializer};
use crate::diagnostics::{AttemptBuffer, Diagnostic};
use crate::errors::{Failure, FailureKind};
use crate::instance::{Instance, ObjectInstance};
use crate::types::{ObjectShape, ShapeCategory, TypeDescriptor};
use crate::value::{Document, ValueNode, PAIRS_KEY};

impl Deserializer {
    pub(super) fn read_object(
        &self,
        node: &ValueNode,
        target: &TypeDescriptor,
        existing: Option<Instance>,
        ctx: &Context<'_>,
    ) -> Instance {
        let Some(doc) = node.as_document() else {
            ctx.sink.record_failure(&shape_mismatch(target, node));
            return existing.unwrap_or_else(|| target.default_instance());
        };

        let concrete = match doc.type_tag() {
            None => target.clone(),
            Some(tag) => match self.resolve_tag(tag, ctx) {
                Some(found) => found,
                None => {
                    let name = doc.type_tag_name().unwrap_or_else(|| "unknown".to_string());
                    let failure = Failure::new(
                        FailureKind::TypeResolutionFailure,
                        format!("Type `{}` failed to deserialise.", name),
                    );
                    return self.escalate(doc, target, existing, failure, ctx);
                }
            },
        };

        match concrete.category() {
            ShapeCategory::Dynamic => return self.read_untagged(doc, ctx),
            category if !category.is_object() => return self.materialize_in(node, &concrete, existing, ctx),
            _ => {}
        }

        if target.category().is_object() && !concrete.is_assignable_to(target) {
            let failure = Failure::new(
                FailureKind::PropertyTypeMismatch,
                format!("`{}` is not assignable to `{}`", concrete.name(), target.name()),
            );
            return self.escalate(doc, target, existing, failure, ctx);
        }

        let buffer = AttemptBuffer::new();
        let attempt = ctx.with_sink(&buffer);
        let result = match concrete.category() {
            ShapeCategory::ImmutableObject(shape) => self.construct_immutable(doc, &concrete, shape, &attempt),
            ShapeCategory::PlainObject(shape) => self.populate_plain(doc, &concrete, shape, existing.as_ref(), &attempt),
            ShapeCategory::DynamicPropertyObject(shape) => {
                self.populate_dynamic(doc, &concrete, shape, existing.as_ref(), &attempt)
            }
            _ => Err(Failure::new(
                FailureKind::ConstructionFailure,
                format!(
                    "cannot construct `{}`: the document must name a concrete implementation",
                    concrete.name()
                ),
            )),
        };

        match result {
            Ok(instance) => {
                buffer.flush_into(ctx.sink);
                instance
            }
            Err(failure) => {
                let dropped = buffer.discard();
                trace!(type_name = concrete.name(), dropped, kind = %failure.kind, "object attempt failed");
                self.escalate(doc, target, existing, failure, ctx)
            }
        }
    }

    /// Greediest constructor, one field per parameter (case-insensitive),
    /// then the remaining fields as property sets.
    fn construct_immutable(
        &self,
        doc: &Document,
        concrete: &TypeDescriptor,
        shape: &ObjectShape,
        ctx: &Context<'_>,
    ) -> Result<Instance, Failure> {
        let constructor = shape.greediest_constructor().ok_or_else(|| {
            Failure::new(
                FailureKind::ConstructionFailure,
                format!("cannot construct `{}`: no constructor is declared", concrete.name()),
            )
        })?;

        let mut matched = Vec::with_capacity(constructor.parameters().len());
        let mut missing = Vec::new();
        for parameter in constructor.parameters() {
            let candidates: Vec<(&str, &ValueNode)> = doc
                .fields()
                .filter(|(name, _)| name.eq_ignore_ascii_case(parameter.name()))
                .collect();
            match candidates.as_slice() {
                [single] => matched.push((parameter, *single)),
                [] => missing.push(parameter.name()),
                several => {
                    return Err(Failure::new(
                        FailureKind::ConstructorMatchFailure,
                        format!(
                            "constructor parameter `{}` of `{}` matches {} fields",
                            parameter.name(),
                            concrete.name(),
                            several.len()
                        ),
                    ))
                }
            }
        }
        if !missing.is_empty() {
            return Err(Failure::new(
                FailureKind::ConstructorMatchFailure,
                format!(
                    "no field for constructor parameter(s) {} of `{}`",
                    missing.iter().map(|p| format!("`{}`", p)).collect::<Vec<_>>().join(", "),
                    concrete.name()
                ),
            ));
        }

        let mut arguments = Vec::with_capacity(matched.len());
        for (parameter, (_, value)) in &matched {
            let parameter_type = self.resolve_declared(parameter.type_name(), ctx)?;
            let argument = self.materialize_in(value, &parameter_type, None, ctx);
            if !argument.conforms_to(&parameter_type) {
                return Err(Failure::new(
                    FailureKind::PropertyTypeMismatch,
                    format!(
                        "argument `{}` of `{}` expected `{}` and received `{}`",
                        parameter.name(),
                        concrete.name(),
                        parameter_type.full_name(),
                        argument.kind_name()
                    ),
                ));
            }
            arguments.push(argument);
        }

        if let Some(check) = constructor.check() {
            check(&arguments).map_err(|reason| {
                Failure::new(
                    FailureKind::ConstructionFailure,
                    format!("constructor of `{}` rejected its arguments: {}", concrete.name(), reason),
                )
            })?;
        }

        let mut object = ObjectInstance::new(concrete.clone());
        for ((parameter, _), argument) in matched.iter().zip(arguments) {
            let member = shape
                .find_member_ignore_case(parameter.name())
                .map(|m| m.name())
                .unwrap_or(parameter.name());
            object.set(member, argument);
        }

        let consumed: Vec<&str> = matched.iter().map(|(_, (name, _))| *name).collect();
        let remaining = doc.fields().filter(|(name, _)| !consumed.contains(name));
        self.apply_fields(remaining, &mut object, shape, true, ctx)?;
        Ok(Instance::Object(object))
    }

    fn populate_plain(
        &self,
        doc: &Document,
        concrete: &TypeDescriptor,
        shape: &ObjectShape,
        existing: Option<&Instance>,
        ctx: &Context<'_>,
    ) -> Result<Instance, Failure> {
        if !shape.is_instantiable() {
            return Err(Failure::new(
                FailureKind::ConstructionFailure,
                format!("cannot construct `{}`: type is not instantiable", concrete.name()),
            ));
        }
        let mut object = match existing {
            Some(Instance::Object(current)) if current.descriptor() == concrete => current.clone(),
            _ => ObjectInstance::new(concrete.clone()),
        };
        self.apply_fields(doc.fields(), &mut object, shape, false, ctx)?;
        Ok(Instance::Object(object))
    }

    fn populate_dynamic(
        &self,
        doc: &Document,
        concrete: &TypeDescriptor,
        shape: &ObjectShape,
        existing: Option<&Instance>,
        ctx: &Context<'_>,
    ) -> Result<Instance, Failure> {
        if !shape.is_instantiable() {
            return Err(Failure::new(
                FailureKind::ConstructionFailure,
                format!("cannot construct `{}`: type is not instantiable", concrete.name()),
            ));
        }
        let rewritten = self.fold_dynamic_properties(doc, shape, ctx)?;
        self.populate_plain(&rewritten, concrete, shape, existing, ctx)
            .map_err(|f| Failure::new(f.kind, format!("cannot set property on `{}`: {}", concrete.name(), f.message)))
    }

    /// Move top-level fields named after an enum case into the pair array
    /// of each enum-keyed container member.
    fn fold_dynamic_properties(
        &self,
        doc: &Document,
        shape: &ObjectShape,
        ctx: &Context<'_>,
    ) -> Result<Document, Failure> {
        let mut rewritten = doc.clone();
        for member in shape.members().iter().filter(|m| m.is_dynamic_container()) {
            let container = self.resolve_declared(member.type_name(), ctx)?;
            let (key_type, _) = container.key_value_types();
            let Some(cases) = key_type.enum_shape() else {
                continue;
            };

            let mut pairs = Vec::new();
            for case in cases.cases() {
                if shape.find_member(&case.name).is_some() {
                    continue;
                }
                if let Some(value) = rewritten.remove(&case.name) {
                    pairs.push(ValueNode::Map(Document::new().with("k", case.name.as_str()).with("v", value)));
                }
            }
            if pairs.is_empty() {
                continue;
            }

            let merged = match rewritten.remove(member.name()) {
                None | Some(ValueNode::Null) => ValueNode::Array(pairs),
                Some(ValueNode::Array(mut current)) => {
                    current.extend(pairs);
                    ValueNode::Array(current)
                }
                Some(ValueNode::Map(mut current)) => {
                    if let Some(ValueNode::Array(items)) = current.get_mut(PAIRS_KEY) {
                        items.extend(pairs);
                    } else {
                        current.insert(PAIRS_KEY, ValueNode::Array(pairs));
                    }
                    ValueNode::Map(current)
                }
                Some(other) => return Err(shape_mismatch_label("Map", &other)),
            };
            trace!(container = member.name(), "folded dynamic properties");
            rewritten.insert(member.name(), merged);
        }
        Ok(rewritten)
    }

    /// Set each field on `object`: writable members are materialized against
    /// their declared type, unknown fields go to the extension slot.
    fn apply_fields<'d>(
        &self,
        fields: impl Iterator<Item = (&'d str, &'d ValueNode)>,
        object: &mut ObjectInstance,
        shape: &ObjectShape,
        immutable: bool,
        ctx: &Context<'_>,
    ) -> Result<(), Failure> {
        let type_name = object.type_name().to_string();
        let extension = shape.extension_member();
        let any = TypeDescriptor::dynamic();

        for (name, value) in fields {
            if extension == Some(name) {
                match self.materialize_in(value, &any, None, ctx) {
                    Instance::Map(map) => {
                        for (key, entry) in map.iter() {
                            if let Instance::String(key) = key {
                                object.extension_mut().insert(key.clone(), entry.clone());
                            }
                        }
                    }
                    Instance::Null => {}
                    other => {
                        object.extension_mut().insert(name.to_string(), other);
                    }
                }
                continue;
            }

            match shape.find_member(name) {
                Some(member) if member.is_writable() => {
                    let member_type = self.resolve_declared(member.type_name(), ctx)?;
                    let current = object.get(name).cloned();
                    let materialized = self.materialize_in(value, &member_type, current, ctx);
                    if !materialized.conforms_to(&member_type) {
                        return Err(Failure::new(
                            FailureKind::PropertyTypeMismatch,
                            format!(
                                "property `{}` of `{}` expected `{}` and received `{}`",
                                name,
                                type_name,
                                member_type.full_name(),
                                materialized.kind_name()
                            ),
                        ));
                    }
                    object.set(name, materialized);
                }
                Some(_) if immutable => {
                    ctx.sink
                        .record_note(format!("read-only property `{}` of `{}` was left unchanged", name, type_name));
                }
                Some(_) => {
                    ctx.sink.record(Diagnostic::error(
                        Some(FailureKind::ReadOnlyProperty),
                        format!("property `{}` of `{}` is read-only", name, type_name),
                    ));
                }
                None if extension.is_some() => {
                    let absorbed = self.materialize_in(value, &any, None, ctx);
                    object.extension_mut().insert(name.to_string(), absorbed);
                    ctx.sink.record(Diagnostic::warning(
                        Some(FailureKind::PropertyMissing),
                        format!("`{}` has no property `{}`; value stored in extension data", type_name, name),
                    ));
                }
                None => {
                    return Err(Failure::new(
                        FailureKind::PropertyMissing,
                        format!("`{}` has no property `{}`", type_name, name),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::diagnostics::{DiagnosticLog, Severity};
    use crate::errors::FailureKind;
    use crate::instance::Instance;
    use crate::models::default_catalog;
    use crate::types::{InMemoryCatalog, ObjectShape, TypeDescriptor};
    use crate::value::{Document, ValueNode};
    use crate::Deserializer;

    fn point(x: f64, y: f64, z: f64) -> ValueNode {
        ValueNode::Map(Document::tagged("oM.Geometry.Point").with("X", x).with("Y", y).with("Z", z))
    }

    fn read(type_name: &str, node: &ValueNode, log: &DiagnosticLog) -> Instance {
        let de = Deserializer::new(default_catalog());
        de.materialize_as(node, type_name, log).unwrap()
    }

    #[test]
    fn test_constructor_matches_fields_ignoring_case() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("Point").with("x", 1.0).with("Y", 2.0).with("z", 3.0));
        let value = read("oM.Geometry.Point", &node, &log);
        let object = value.as_object().unwrap();
        assert_eq!(object.get("X"), Some(&Instance::Double(1.0)));
        assert_eq!(object.get("Z"), Some(&Instance::Double(3.0)));
        assert!(log.is_empty());
    }

    #[test]
    fn test_duplicate_parameter_match_is_captured() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("Point")
                .with("X", 1.0)
                .with("x", 1.5)
                .with("Y", 2.0)
                .with("Z", 3.0),
        );
        let value = read("oM.Geometry.Point", &node, &log);
        assert!(value.as_capture().is_some());
        let errors = log.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, Some(FailureKind::ConstructorMatchFailure));
    }

    #[test]
    fn test_constructor_check_rejects_arguments() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("RectangleProfile")
                .with("Height", -0.3)
                .with("Width", 0.2)
                .with("CornerRadius", 0.0),
        );
        let value = read("oM.Structure.IProfile", &node, &log);
        assert!(value.as_capture().is_some());
        assert_eq!(log.errors()[0].kind, Some(FailureKind::ConstructionFailure));
    }

    #[test]
    fn test_nested_plain_object() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("oM.Geometry.Line")
                .with("Start", point(0.0, 0.0, 0.0))
                .with("End", point(1.0, 0.0, 0.0)),
        );
        let value = read("oM.Geometry.Line", &node, &log);
        let line = value.as_object().unwrap();
        assert_eq!(line.get("End").unwrap().as_object().unwrap().get("X"), Some(&Instance::Double(1.0)));
        assert!(log.is_empty());
    }

    #[test]
    fn test_failed_nested_object_yields_one_error() {
        let log = DiagnosticLog::new();
        let broken = ValueNode::Map(Document::tagged("oM.Geometry.Point").with("X", 1.0));
        let node = ValueNode::Map(
            Document::tagged("oM.Geometry.Line")
                .with("Start", broken)
                .with("End", point(1.0, 0.0, 0.0)),
        );
        let value = read("oM.Geometry.Line", &node, &log);
        let capture = value.as_capture().unwrap();
        assert_eq!(capture.type_tag, "oM.Geometry.Line");
        assert_eq!(log.errors().len(), 1);
        assert_eq!(log.errors()[0].kind, Some(FailureKind::PropertyTypeMismatch));
    }

    #[test]
    fn test_unknown_field_without_extension_is_captured() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("oM.Geometry.Line")
                .with("Start", point(0.0, 0.0, 0.0))
                .with("Colour", "red"),
        );
        let value = read("oM.Geometry.Line", &node, &log);
        assert!(value.as_capture().is_some());
        assert_eq!(log.errors()[0].kind, Some(FailureKind::PropertyMissing));
    }

    #[test]
    fn test_extension_slot_absorbs_unknown_fields() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("oM.Structure.SteelSection")
                .with("Name", "UB 305x165x40")
                .with("Area", 0.00513)
                .with("ExtraNote", "hi")
                .with("CustomData", Document::new().with("Grade", "S355")),
        );
        let value = read("oM.Structure.SteelSection", &node, &log);
        let section = value.as_object().unwrap();
        assert_eq!(section.extension().get("ExtraNote"), Some(&Instance::String("hi".into())));
        assert_eq!(section.extension().get("Grade"), Some(&Instance::String("S355".into())));
        let records = log.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Warning);
    }

    #[test]
    fn test_interface_target_needs_a_tag() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::new().with("Diameter", 0.1));
        let value = read("oM.Structure.IProfile", &node, &log);
        let capture = value.as_capture().unwrap();
        assert_eq!(capture.type_tag, "unknown");
        assert_eq!(log.errors()[0].kind, Some(FailureKind::ConstructionFailure));
    }

    #[test]
    fn test_wrong_concrete_type_is_not_assignable() {
        let log = DiagnosticLog::new();
        let value = read("oM.Geometry.Line", &point(1.0, 2.0, 3.0), &log);
        assert!(value.as_capture().is_some());
        assert_eq!(log.errors()[0].kind, Some(FailureKind::PropertyTypeMismatch));
    }

    #[test]
    fn test_dynamic_properties_fold_into_container() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("oM.MEP.Duct")
                .with("FlowRate", 0.25)
                .with("Roughness", 0.0001)
                .with("InsulationThickness", 0.025),
        );
        let value = read("oM.MEP.Duct", &node, &log);
        let duct = value.as_object().unwrap();
        let Some(Instance::Map(properties)) = duct.get("Properties") else {
            panic!("expected a properties map");
        };
        assert_eq!(properties.len(), 2);
        assert!(duct.extension().is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_dynamic_properties_merge_with_existing_pairs() {
        let log = DiagnosticLog::new();
        let pairs = ValueNode::Array(vec![ValueNode::Map(
            Document::new().with("k", "Roughness").with("v", 0.0001),
        )]);
        let node = ValueNode::Map(
            Document::tagged("oM.MEP.Pipe")
                .with("Diameter", 0.05)
                .with("Properties", pairs)
                .with("Pressure", 3.0),
        );
        let value = read("oM.MEP.Pipe", &node, &log);
        let Some(Instance::Map(properties)) = value.as_object().unwrap().get("Properties") else {
            panic!("expected a properties map");
        };
        assert_eq!(properties.len(), 2);
    }

    #[test]
    fn test_read_only_member_on_plain_object() {
        let catalog = InMemoryCatalog::with_builtins();
        crate::models::register_all(&catalog);
        catalog.register(
            "site.survey",
            TypeDescriptor::plain_object(
                "oM.Site.Marker",
                ObjectShape::new().member("Label", "String").read_only("Id", "Int32"),
            ),
        );
        let de = Deserializer::new(Arc::new(catalog));
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("oM.Site.Marker").with("Label", "M1").with("Id", 4));
        let value = de.materialize_document(&node, &log);

        let marker = value.as_object().unwrap();
        assert_eq!(marker.get("Label"), Some(&Instance::String("M1".into())));
        assert_eq!(marker.get("Id"), None);
        let records = log.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Error);
        assert_eq!(records[0].kind, Some(FailureKind::ReadOnlyProperty));
    }

    #[test]
    fn test_dynamic_object_property_failure_wording() {
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("oM.MEP.Duct")
                .with("FlowRate", 0.25)
                .with("Colour", "red"),
        );
        let value = read("oM.MEP.Duct", &node, &log);
        assert_eq!(value.as_capture().unwrap().type_tag, "oM.MEP.Duct");
        let errors = log.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, Some(FailureKind::PropertyMissing));
        assert!(errors[0].message.contains("cannot set property on `oM.MEP.Duct`"));
        assert!(!errors[0].message.contains("cannot construct"));
    }
}
