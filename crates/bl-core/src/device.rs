//! Traits joining devices to the registry that owns them.
//!
//! Registries hold devices as trait objects so one collection can carry
//! actuators and sensors of every scalar kind. Registration happens once, at
//! device construction, and the back-reference is never stored on the device.

use std::sync::Arc;

use crate::snapshot::Snapshot;
use crate::value::ValueKind;

/// Outgoing side of an actuator, as seen by a registry.
pub trait PublishActuator: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ValueKind;

    /// Write `(name, value)` into `sink` if `only_if_dirty` is false or the
    /// value changed since the last publish, then clear the dirty flag.
    ///
    /// Returns true if an entry was written.
    fn publish(&self, sink: &mut Snapshot, only_if_dirty: bool) -> bool;
}

/// Inbound side of a sensor, as seen by a registry.
pub trait ApplySensor: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ValueKind;

    /// Adopt this sensor's entry from `snapshot` if present, of the declared
    /// kind, and different from the current value.
    ///
    /// Returns true only when the value changed. A missing key or a type
    /// mismatch is "not for me" and returns false with no side effects.
    fn try_apply(&self, snapshot: &Snapshot) -> bool;
}

/// Anything devices can register with: a factory or one of its stations.
pub trait DeviceRegistrar {
    fn register_actuator(&self, actuator: Arc<dyn PublishActuator>);

    fn register_sensor(&self, sensor: Arc<dyn ApplySensor>);
}

impl<T: DeviceRegistrar + ?Sized> DeviceRegistrar for Arc<T> {
    fn register_actuator(&self, actuator: Arc<dyn PublishActuator>) {
        (**self).register_actuator(actuator);
    }

    fn register_sensor(&self, sensor: Arc<dyn ApplySensor>) {
        (**self).register_sensor(sensor);
    }
}
