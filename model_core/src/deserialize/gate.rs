//! Migration gate and capture fallback.
//!
//! A failed object attempt gets one schema upgrade per chain. When the
//! migrator has nothing to offer, or the upgraded document fails as well,
//! the document is kept as a [`CaptureObject`] and exactly one Error is
//! recorded.

use tracing::debug;

use super::{Context, Deserializer};
use crate::diagnostics::{AttemptBuffer, Diagnostic};
use crate::errors::{Failure, FailureKind};
use crate::instance::{CaptureObject, Instance};
use crate::types::TypeDescriptor;
use crate::value::{Document, ValueNode};

impl Deserializer {
    pub(super) fn escalate(
        &self,
        doc: &Document,
        target: &TypeDescriptor,
        existing: Option<Instance>,
        failure: Failure,
        ctx: &Context<'_>,
    ) -> Instance {
        if ctx.already_migrated {
            return self.capture(doc, &failure, FailureKind::MigrationLoopGuardTripped, ctx);
        }

        match self.migrator.upgrade(doc, &ctx.version) {
            Some(upgraded) if upgraded != *doc => {
                debug!(
                    type_tag = doc.type_tag_name().as_deref().unwrap_or("unknown"),
                    version = %ctx.version,
                    cause = %failure.kind,
                    "retrying with upgraded document"
                );
                self.materialize_in(&ValueNode::Map(upgraded), target, existing, &ctx.migrated())
            }
            _ => self.capture(doc, &failure, FailureKind::MigrationNoOp, ctx),
        }
    }

    fn capture(&self, doc: &Document, failure: &Failure, outcome: FailureKind, ctx: &Context<'_>) -> Instance {
        let type_tag = doc.type_tag_name().unwrap_or_else(|| "unknown".to_string());

        // Field diagnostics are folded into the single capture Error
        let buffer = AttemptBuffer::new();
        let fields_ctx = ctx.migrated().with_sink(&buffer);
        let any = TypeDescriptor::dynamic();
        let fields = doc
            .fields()
            .map(|(name, value)| (name.to_string(), self.materialize_in(value, &any, None, &fields_ctx)))
            .collect();
        let folded = buffer.discard();

        let outcome_text = match outcome {
            FailureKind::MigrationLoopGuardTripped => "the upgraded document failed as well",
            _ => "no migration applied",
        };
        debug!(type_tag = %type_tag, folded, "captured document generically");
        ctx.sink.record(Diagnostic::error(
            Some(failure.kind),
            format!(
                "`{}` could not be reconstructed and was captured generically: {} ({}: {})",
                type_tag,
                failure.message,
                outcome.code(),
                outcome_text
            ),
        ));

        Instance::Capture(CaptureObject {
            type_tag,
            schema_version: ctx.version.clone(),
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::diagnostics::DiagnosticLog;
    use crate::errors::FailureKind;
    use crate::instance::Instance;
    use crate::migration::RenameMigrator;
    use crate::models::default_catalog;
    use crate::value::{Document, ValueNode};
    use crate::Deserializer;

    #[test]
    fn test_rename_migration_recovers_document() {
        let de = Deserializer::new(default_catalog()).with_migrator(
            RenameMigrator::new()
                .rename_type("BH.oM.Geometry.Pt", "oM.Geometry.Point")
                .rename_field("oM.Geometry.Point", "Elevation", "Z"),
        );
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("BH.oM.Geometry.Pt")
                .with("X", 1.0)
                .with("Y", 2.0)
                .with("Elevation", 3.0),
        );
        let value = de.materialize_document(&node, &log);
        let point = value.as_object().unwrap();
        assert_eq!(point.type_name(), "oM.Geometry.Point");
        assert_eq!(point.get("Z"), Some(&Instance::Double(3.0)));
        assert!(log.is_empty());
    }

    #[test]
    fn test_unchanged_upgrade_is_a_no_op() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let de = Deserializer::new(default_catalog()).with_migrator(move |doc: &Document, _: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(doc.clone())
        });
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(Document::tagged("oM.Geometry.Point").with("X", 1.0));
        let value = de.materialize_document(&node, &log);

        assert!(value.as_capture().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let errors = log.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains(FailureKind::MigrationNoOp.code()));
    }

    #[test]
    fn test_capture_keeps_nested_documents_generically() {
        let de = Deserializer::new(default_catalog());
        let log = DiagnosticLog::new();
        let node = ValueNode::Map(
            Document::tagged("oM.Legacy.Beam")
                .with("_version", "0.0.9")
                .with("Label", "B1")
                .with("Start", Document::tagged("oM.Legacy.Node").with("Id", 4)),
        );
        let value = de.materialize_document(&node, &log);
        let capture = value.as_capture().unwrap();
        assert_eq!(capture.type_tag, "oM.Legacy.Beam");
        assert_eq!(capture.schema_version, "0.0.9");
        assert!(matches!(capture.fields.get("Start"), Some(Instance::Capture(_))));
        assert!(!capture.fields.contains_key("_version"));
        assert_eq!(log.errors().len(), 1);
    }

    #[test]
    fn test_capture_keeps_pair_array_containers() {
        let de = Deserializer::new(default_catalog());
        let log = DiagnosticLog::new();
        let pairs = ValueNode::Array(vec![ValueNode::Map(Document::new().with("k", 1).with("v", 2.0))]);
        let node = ValueNode::Map(Document::tagged("oM.Legacy.Thing").with("Props", Document::new().with("_v", pairs)));
        let value = de.materialize_document(&node, &log);

        let capture = value.as_capture().unwrap();
        let Some(Instance::Map(props)) = capture.fields.get("Props") else {
            panic!("expected a keyed container, got {:?}", capture.fields.get("Props"));
        };
        assert_eq!(props.len(), 1);
        assert_eq!(props.get(&Instance::Int32(1)), Some(&Instance::Double(2.0)));
        assert_eq!(log.errors().len(), 1);
    }
}
