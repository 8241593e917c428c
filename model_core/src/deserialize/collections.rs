//! Sequence, keyed-container and tuple codecs.

use super::{shape_mismatch, Context, Deserializer};
use crate::errors::{Failure, FailureKind};
use crate::instance::{Instance, KeyedMap};
use crate::types::TypeDescriptor;
use crate::value::{ValueNode, PAIRS_KEY};

impl Deserializer {
    pub(super) fn read_sequence(
        &self,
        node: &ValueNode,
        target: &TypeDescriptor,
        ctx: &Context<'_>,
    ) -> Result<Instance, Failure> {
        let items = node.as_array().ok_or_else(|| shape_mismatch(target, node))?;
        let element = target.element_type();
        Ok(Instance::Sequence(
            items.iter().map(|item| self.materialize_in(item, &element, None, ctx)).collect(),
        ))
    }

    /// String-keyed containers are written as a plain document. Any other
    /// key type is written as a pair array `[{k, v}, ...]`, either bare or
    /// under the `_v` entry of a document.
    pub(super) fn read_keyed(
        &self,
        node: &ValueNode,
        target: &TypeDescriptor,
        ctx: &Context<'_>,
    ) -> Result<Instance, Failure> {
        let (key_type, value_type) = target.key_value_types();

        if key_type.is_string() {
            if let ValueNode::Map(doc) = node {
                if !doc.contains(PAIRS_KEY) {
                    let mut map = KeyedMap::new();
                    for (name, value) in doc.fields() {
                        map.insert(
                            Instance::String(name.to_string()),
                            self.materialize_in(value, &value_type, None, ctx),
                        );
                    }
                    return Ok(Instance::Map(map));
                }
            }
        }

        let pairs = match node {
            ValueNode::Array(pairs) => pairs.as_slice(),
            ValueNode::Map(doc) => match doc.get(PAIRS_KEY) {
                Some(ValueNode::Array(pairs)) => pairs.as_slice(),
                _ => return Err(shape_mismatch(target, node)),
            },
            _ => return Err(shape_mismatch(target, node)),
        };

        Ok(Instance::Map(self.read_pairs(pairs, target, ctx)))
    }

    /// Read `{k, v}` pair documents against `target`'s key and value types.
    /// Null keys and malformed pairs are reported and skipped.
    pub(super) fn read_pairs(&self, pairs: &[ValueNode], target: &TypeDescriptor, ctx: &Context<'_>) -> KeyedMap {
        let (key_type, value_type) = target.key_value_types();
        let mut map = KeyedMap::new();
        for pair in pairs {
            let Some(entry) = pair.as_document() else {
                ctx.sink.record_failure(&shape_mismatch_pair(pair));
                continue;
            };
            let key_node = entry.get("k").unwrap_or(&ValueNode::Null);
            if key_node.is_null() {
                ctx.sink.record_failure(&Failure::new(
                    FailureKind::ShapeMismatch,
                    format!("null key in `{}`; entry skipped", target.full_name()),
                ));
                continue;
            }
            let key = self.materialize_in(key_node, &key_type, None, ctx);
            if key.is_null() {
                // Key codec already reported why
                continue;
            }
            let value = self.materialize_in(entry.get("v").unwrap_or(&ValueNode::Null), &value_type, None, ctx);
            map.insert(key, value);
        }
        map
    }

    pub(super) fn read_tuple(
        &self,
        node: &ValueNode,
        target: &TypeDescriptor,
        arity: usize,
        ctx: &Context<'_>,
    ) -> Result<Instance, Failure> {
        let items = node.as_array().ok_or_else(|| shape_mismatch(target, node))?;
        if items.len() != arity {
            return Err(Failure::new(
                FailureKind::ShapeMismatch,
                format!("expected array of size {}, received array of size {}", arity, items.len()),
            ));
        }
        let any = TypeDescriptor::dynamic();
        let elements = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let element = target.generic_args().get(i).unwrap_or(&any);
                self.materialize_in(item, element, None, ctx)
            })
            .collect();
        Ok(Instance::Tuple(elements))
    }
}

fn shape_mismatch_pair(pair: &ValueNode) -> Failure {
    super::shape_mismatch_label("KeyValuePair", pair)
}
