//! Scalar kinds carried by actuators and sensors.
//!
//! Every device value is one of `bool`, `f32` or `u32`. The [`DeviceScalar`]
//! trait is the single seam between those Rust types and the JSON values that
//! travel on the wire, so the cell, actuator and sensor code is written once.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a device value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Float,
    UInt,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bool => "bool",
            Self::Float => "float",
            Self::UInt => "uint",
        };
        f.write_str(s)
    }
}

/// A scalar that can live in a device cell.
///
/// Equality is the type's natural `PartialEq`. For `f32` that means exact
/// comparison with no tolerance: any bit-level change counts as a change.
pub trait DeviceScalar: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Kind reported on the wire and in diagnostics.
    const KIND: ValueKind;

    /// Value a device holds before it has ever been set or updated.
    fn zero() -> Self;

    /// Encode for an outgoing snapshot.
    fn to_json(self) -> Value;

    /// Decode from an inbound snapshot, `None` when the JSON type does not match.
    fn from_json(value: &Value) -> Option<Self>;
}

impl DeviceScalar for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn zero() -> Self {
        false
    }

    fn to_json(self) -> Value {
        Value::Bool(self)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl DeviceScalar for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn zero() -> Self {
        0.0
    }

    fn to_json(self) -> Value {
        // Non-finite floats have no JSON form and encode as null.
        Value::from(f64::from(self))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl DeviceScalar for u32 {
    const KIND: ValueKind = ValueKind::UInt;

    fn zero() -> Self {
        0
    }

    fn to_json(self) -> Value {
        Value::from(self)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|v| u32::try_from(v).ok())
    }
}
