//! Type-value and method-reference codecs.
//!
//! Both look the referenced entity up in the catalog and, when the lookup
//! misses, give the migrator exactly one chance to rewrite the reference.

use tracing::debug;

use super::{shape_mismatch, Context, Deserializer};
use crate::diagnostics::NullSink;
use crate::errors::{Failure, FailureKind};
use crate::instance::Instance;
use crate::types::{MethodDescriptor, ShapeCategory, TypeDescriptor, TypeName, METHOD_TAG, TYPE_VALUE_TAG};
use crate::value::{Document, ValueNode, VERSION_KEY};

impl Deserializer {
    /// A type written as a name string or as a type document
    pub(super) fn read_type_value(&self, node: &ValueNode, ctx: &Context<'_>) -> Result<Instance, Failure> {
        let name = match node {
            ValueNode::String(_) | ValueNode::Map(_) => TypeName::from_node(node),
            _ => return Err(shape_mismatch(&TypeDescriptor::new(TYPE_VALUE_TAG, ShapeCategory::TypeValue), node)),
        };
        let Some(name) = name else {
            return Err(type_failure(&describe(node)));
        };

        let upgraded = if ctx.already_migrated {
            name.clone()
        } else {
            self.upgrade_type_name(&name, ctx)
        };
        if upgraded != name {
            debug!(from = %name, to = %upgraded, "type reference upgraded");
        }

        self.resolver
            .resolve(&upgraded, ctx.sink)
            .map(Instance::Type)
            .ok_or_else(|| type_failure(&name.to_string()))
    }

    /// Give every name in the expression that the catalog does not know,
    /// generic arguments included, one pass through the migrator.
    fn upgrade_type_name(&self, name: &TypeName, ctx: &Context<'_>) -> TypeName {
        let args: Vec<TypeName> = name.args().iter().map(|arg| self.upgrade_type_name(arg, ctx)).collect();
        let bare = TypeName::new(name.name());
        if self.resolver.resolve(&bare, &NullSink).is_some() {
            return TypeName::generic(name.name(), args);
        }

        let probe = Document::tagged(TYPE_VALUE_TAG)
            .with("Name", name.name())
            .with(VERSION_KEY, ctx.version.as_str());
        let renamed = self
            .migrator
            .upgrade(&probe, &ctx.version)
            .filter(|upgraded| *upgraded != probe)
            .and_then(|upgraded| TypeName::from_document(&upgraded));

        match renamed {
            Some(renamed) if renamed.args().is_empty() => TypeName::generic(renamed.name(), args),
            Some(renamed) => renamed,
            None => TypeName::generic(name.name(), args),
        }
    }

    /// A method document `{ TypeName, MethodName, Parameters }`
    pub(super) fn read_method(&self, node: &ValueNode, ctx: &Context<'_>) -> Result<Instance, Failure> {
        let Some(doc) = node.as_document() else {
            return Err(shape_mismatch(&TypeDescriptor::new(METHOD_TAG, ShapeCategory::MethodReference), node));
        };

        if let Some(found) = self.lookup_method(doc, ctx) {
            return Ok(Instance::Method(found));
        }

        if !ctx.already_migrated {
            if let Some(upgraded) = self.migrator.upgrade(doc, &ctx.version).filter(|u| u != doc) {
                if let Some(found) = self.lookup_method(&upgraded, ctx) {
                    debug!(method = %found, "method reference upgraded");
                    return Ok(Instance::Method(found));
                }
            }
        }

        Err(Failure::new(
            FailureKind::MethodResolutionFailure,
            format!("Method `{}` failed to deserialise.", describe_method(doc)),
        ))
    }

    fn lookup_method(&self, doc: &Document, ctx: &Context<'_>) -> Option<MethodDescriptor> {
        let owner_name = TypeName::from_node(doc.get("TypeName")?)?;
        let owner = self.resolver.resolve(&owner_name, ctx.sink)?;
        let method_name = doc.get("MethodName").and_then(ValueNode::as_str)?;

        let parameters = match doc.get("Parameters") {
            None | Some(ValueNode::Null) => Vec::new(),
            Some(ValueNode::Array(items)) => items
                .iter()
                .map(|p| TypeName::from_node(p).and_then(|n| self.resolver.resolve(&n, ctx.sink)))
                .collect::<Option<Vec<_>>>()?,
            Some(_) => return None,
        };

        self.catalog.resolve_method(&owner, method_name, &parameters)
    }
}

fn type_failure(name: &str) -> Failure {
    Failure::new(
        FailureKind::TypeResolutionFailure,
        format!("Type `{}` failed to deserialise.", name),
    )
}

fn describe(node: &ValueNode) -> String {
    match node {
        ValueNode::String(s) => s.clone(),
        ValueNode::Map(doc) => doc
            .get("Name")
            .and_then(ValueNode::as_str)
            .unwrap_or("unknown")
            .to_string(),
        other => other.kind_name().to_string(),
    }
}

fn describe_method(doc: &Document) -> String {
    let owner = doc.get("TypeName").map(describe).unwrap_or_else(|| "unknown".to_string());
    let name = doc.get("MethodName").and_then(ValueNode::as_str).unwrap_or("unknown");
    let parameters: Vec<String> = doc
        .get("Parameters")
        .and_then(ValueNode::as_array)
        .map(|items| items.iter().map(describe).collect())
        .unwrap_or_default();
    format!("{}.{}({})", owner, name, parameters.join(", "))
}
