//! Primitive codecs.
//!
//! Each primitive accepts its own node kind, lossless integer widening and
//! a textual form. Anything else is a shape mismatch.

use chrono::DateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::shape_mismatch_label;
use crate::errors::{Failure, FailureKind};
use crate::instance::Instance;
use crate::types::PrimitiveKind;
use crate::value::ValueNode;

/// Nanoseconds per serialized time-span tick
const NANOS_PER_TICK: i64 = 100;

pub(super) fn read_primitive(node: &ValueNode, kind: PrimitiveKind) -> Result<Instance, Failure> {
    let mismatch = || shape_mismatch_label(kind.name(), node);

    match (kind, node) {
        (PrimitiveKind::Bool, ValueNode::Bool(b)) => Ok(Instance::Bool(*b)),
        (PrimitiveKind::Bool, ValueNode::String(s)) => s.parse().map(Instance::Bool).map_err(|_| mismatch()),

        (PrimitiveKind::Int32, ValueNode::Int32(i)) => Ok(Instance::Int32(*i)),
        (PrimitiveKind::Int32, ValueNode::Int64(i)) => i32::try_from(*i)
            .map(Instance::Int32)
            .map_err(|_| out_of_range(kind, &i.to_string())),
        (PrimitiveKind::Int32, ValueNode::String(s)) => s.trim().parse().map(Instance::Int32).map_err(|_| mismatch()),

        (PrimitiveKind::Int64, ValueNode::Int64(i)) => Ok(Instance::Int64(*i)),
        (PrimitiveKind::Int64, ValueNode::Int32(i)) => Ok(Instance::Int64(i64::from(*i))),
        (PrimitiveKind::Int64, ValueNode::String(s)) => s.trim().parse().map(Instance::Int64).map_err(|_| mismatch()),

        (PrimitiveKind::Double, ValueNode::Double(d)) => Ok(Instance::Double(*d)),
        (PrimitiveKind::Double, ValueNode::Int32(i)) => Ok(Instance::Double(f64::from(*i))),
        (PrimitiveKind::Double, ValueNode::Int64(i)) => Ok(Instance::Double(*i as f64)),
        (PrimitiveKind::Double, ValueNode::Decimal(d)) => {
            use rust_decimal::prelude::ToPrimitive;
            d.to_f64().map(Instance::Double).ok_or_else(mismatch)
        }
        (PrimitiveKind::Double, ValueNode::String(s)) => s.trim().parse().map(Instance::Double).map_err(|_| mismatch()),

        (PrimitiveKind::Decimal, ValueNode::Decimal(d)) => Ok(Instance::Decimal(*d)),
        (PrimitiveKind::Decimal, ValueNode::Int32(i)) => Ok(Instance::Decimal(Decimal::from(*i))),
        (PrimitiveKind::Decimal, ValueNode::Int64(i)) => Ok(Instance::Decimal(Decimal::from(*i))),
        (PrimitiveKind::Decimal, ValueNode::Double(d)) => Decimal::try_from(*d)
            .map(Instance::Decimal)
            .map_err(|_| out_of_range(kind, &d.to_string())),
        (PrimitiveKind::Decimal, ValueNode::String(s)) => s.trim().parse().map(Instance::Decimal).map_err(|_| mismatch()),

        (PrimitiveKind::String, ValueNode::String(s)) => Ok(Instance::String(s.clone())),

        (PrimitiveKind::TimeSpan, ValueNode::Int32(ticks)) => time_span(i64::from(*ticks)),
        (PrimitiveKind::TimeSpan, ValueNode::Int64(ticks)) => time_span(*ticks),

        (PrimitiveKind::DateTimeOffset, ValueNode::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(Instance::DateTimeOffset)
            .map_err(|e| {
                Failure::new(
                    FailureKind::ShapeMismatch,
                    format!("`{}` is not a valid DateTimeOffset: {}", s, e),
                )
            }),

        (PrimitiveKind::Guid, ValueNode::String(s)) => Uuid::parse_str(s.trim())
            .map(Instance::Guid)
            .map_err(|e| Failure::new(FailureKind::ShapeMismatch, format!("`{}` is not a valid Guid: {}", s, e))),

        _ => Err(mismatch()),
    }
}

fn time_span(ticks: i64) -> Result<Instance, Failure> {
    ticks
        .checked_mul(NANOS_PER_TICK)
        .map(|nanos| Instance::TimeSpan(chrono::Duration::nanoseconds(nanos)))
        .ok_or_else(|| out_of_range(PrimitiveKind::TimeSpan, &ticks.to_string()))
}

fn out_of_range(kind: PrimitiveKind, value: &str) -> Failure {
    Failure::new(
        FailureKind::ShapeMismatch,
        format!("value {} is out of range for `{}`", value, kind.name()),
    )
}
