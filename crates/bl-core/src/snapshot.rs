//! Flat name -> value snapshots exchanged with the peer.
//!
//! A snapshot is a single JSON object whose keys are device names and whose
//! values are scalars. Insertion order is preserved so an outgoing snapshot
//! lists actuators in the order they were registered.

use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::value::DeviceScalar;

/// Key of the control message that asks the peer for a full sensor dump.
pub const SEND_SENSOR_DATA: &str = "Send Sensor Data";

/// Ordered flat key-value object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Map<String, Value>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The control message `{"Send Sensor Data": true}`.
    pub fn sensor_data_request() -> Self {
        let mut snapshot = Self::new();
        snapshot.insert(SEND_SENSOR_DATA, true);
        snapshot
    }

    /// Parse a wire payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Malformed`] for invalid JSON and
    /// [`CoreError::NotAnObject`] if the top level is not an object.
    pub fn parse(text: &str) -> CoreResult<Self> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(CoreError::NotAnObject {
                found: json_type_name(&other),
            }),
        }
    }

    /// Compact JSON text for the wire.
    pub fn to_json(&self) -> String {
        // A map of strings to plain values always serializes.
        Value::Object(self.entries.clone()).to_string()
    }

    /// Insert or replace a scalar entry.
    pub fn insert<T: DeviceScalar>(&mut self, name: &str, value: T) {
        self.entries.insert(name.to_owned(), value.to_json());
    }

    /// Typed lookup: `None` if the key is missing or holds the wrong JSON type.
    pub fn get_as<T: DeviceScalar>(&self, name: &str) -> Option<T> {
        self.entries.get(name).and_then(T::from_json)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
