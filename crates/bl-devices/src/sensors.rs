//! Named sensor types for the devices found on a line.

use std::sync::Arc;

use bl_core::DeviceRegistrar;
use serde::{Deserialize, Serialize};

use crate::sensor::Sensor;

macro_rules! sensor_wrapper {
    (
        $(#[$meta:meta])*
        $name:ident($ty:ty) { get: $getter:ident }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            inner: Arc<Sensor<$ty>>,
        }

        impl $name {
            /// Create the sensor and register it.
            pub fn new<R>(registrar: &R, name: impl Into<String>) -> Self
            where
                R: DeviceRegistrar + ?Sized,
            {
                Self {
                    inner: Sensor::new(registrar, name),
                }
            }

            pub fn $getter(&self) -> $ty {
                self.inner.get()
            }

            /// Block until the peer reports a new value.
            pub fn wait_for_change(&self) -> $ty {
                self.inner.wait_for_change()
            }

            /// Block for at most `timeout`; `None` if nothing arrived.
            pub fn wait_for_change_timeout(&self, timeout: std::time::Duration) -> Option<$ty> {
                self.inner.wait_for_change_timeout(timeout)
            }

            pub fn name(&self) -> &str {
                self.inner.name()
            }

            /// The underlying generic sensor.
            pub fn sensor(&self) -> &Sensor<$ty> {
                &self.inner
            }
        }
    };
}

sensor_wrapper! {
    /// Presence detector shared by the capacitive, diffuse and inductive sensors.
    ItemDetectedSensor(bool) { get: item_detected }
}

sensor_wrapper! {
    /// Analog position feedback.
    PositionSensor(f32) { get: position }
}

sensor_wrapper! {
    /// End-of-travel switch.
    LimitSensor(bool) { get: at_limit }
}

sensor_wrapper! {
    /// Light curtain reporting interrupted beams as a bit mask.
    LightArraySensor(u32) { get: array_bit_mask }
}

sensor_wrapper! {
    /// Retroreflective beam. Reads true while the beam reaches its reflector,
    /// false while an item interrupts it.
    RetroreflectiveSensor(bool) { get: beam_detected }
}

sensor_wrapper! {
    /// Recognises raw materials, lids and bases by color.
    VisionSensor(u32) { get: raw_item }
}

sensor_wrapper! {
    /// Load measured by a conveyor scale.
    WeightSensor(f32) { get: weight }
}

/// Capacitive sensor: any solid or liquid within 0.2 m.
pub type CapacitiveSensor = ItemDetectedSensor;
/// Diffuse photoelectric sensor: any solid within 1.6 m.
pub type DiffuseSensor = ItemDetectedSensor;
/// Inductive proximity sensor: conductive materials within 0.1 m.
pub type InductiveSensor = ItemDetectedSensor;

impl LightArraySensor {
    /// True if the beam at `bit` is interrupted.
    pub fn bit_set(&self, bit: u32) -> bool {
        bit < u32::BITS && self.array_bit_mask() & (1 << bit) != 0
    }
}

/// Items a [`VisionSensor`] can recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisionItem {
    None,
    BlueRawMaterial,
    BlueBase,
    BlueLid,
    GreenRawMaterial,
    GreenBase,
    GreenLid,
    /// A code this crate does not know.
    Unknown(u32),
}

impl From<u32> for VisionItem {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::None,
            1 => Self::BlueRawMaterial,
            2 => Self::BlueBase,
            3 => Self::BlueLid,
            4 => Self::GreenRawMaterial,
            5 => Self::GreenBase,
            6 => Self::GreenLid,
            other => Self::Unknown(other),
        }
    }
}

impl VisionSensor {
    pub fn item(&self) -> VisionItem {
        VisionItem::from(self.raw_item())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_core::{ApplySensor, PublishActuator, Snapshot};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Arc<dyn ApplySensor>>>);

    impl DeviceRegistrar for Collect {
        fn register_actuator(&self, _actuator: Arc<dyn PublishActuator>) {}

        fn register_sensor(&self, sensor: Arc<dyn ApplySensor>) {
            self.0.lock().unwrap().push(sensor);
        }
    }

    impl Collect {
        fn deliver(&self, text: &str) -> usize {
            let snapshot = Snapshot::parse(text).unwrap();
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.try_apply(&snapshot))
                .count()
        }
    }

    #[test]
    fn light_array_bits() {
        let reg = Collect::default();
        let curtain = LightArraySensor::new(&reg, "Curtain");
        assert_eq!(reg.deliver(r#"{"Curtain":5}"#), 1);
        assert!(curtain.bit_set(0));
        assert!(!curtain.bit_set(1));
        assert!(curtain.bit_set(2));
        assert!(!curtain.bit_set(40));
    }

    #[test]
    fn vision_item_decoding() {
        let reg = Collect::default();
        let vision = VisionSensor::new(&reg, "Vision");
        assert_eq!(vision.item(), VisionItem::None);
        reg.deliver(r#"{"Vision":6}"#);
        assert_eq!(vision.item(), VisionItem::GreenLid);
        reg.deliver(r#"{"Vision":42}"#);
        assert_eq!(vision.item(), VisionItem::Unknown(42));
    }

    #[test]
    fn each_sensor_claims_only_its_key_and_kind() {
        let reg = Collect::default();
        let entry = RetroreflectiveSensor::new(&reg, "At Entry");
        let weight = WeightSensor::new(&reg, "Weight");
        let limit = LimitSensor::new(&reg, "Limit");

        let applied = reg.deliver(r#"{"At Entry":true,"Weight":12.5,"Limit":1}"#);
        assert_eq!(applied, 2);
        assert!(entry.beam_detected());
        assert_eq!(weight.weight(), 12.5);
        assert!(!limit.at_limit());
    }
}
