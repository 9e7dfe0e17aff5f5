//! Named actuator types for the devices found on a line.
//!
//! Each wrapper owns one registered [`Actuator`] and renames its accessors
//! after what the device does. Aliases map physical parts onto the wrapper
//! with the right semantics.

use std::sync::Arc;

use bl_core::DeviceRegistrar;

use crate::actuator::Actuator;

macro_rules! actuator_wrapper {
    (
        $(#[$meta:meta])*
        $name:ident($ty:ty) { get: $getter:ident, set: $setter:ident }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            inner: Arc<Actuator<$ty>>,
        }

        impl $name {
            /// Create the device at its zero value and register it.
            pub fn new<R>(registrar: &R, name: impl Into<String>) -> Self
            where
                R: DeviceRegistrar + ?Sized,
            {
                Self {
                    inner: Actuator::new(registrar, name, <$ty as bl_core::DeviceScalar>::zero()),
                }
            }

            pub fn $getter(&self) -> $ty {
                self.inner.get()
            }

            pub fn $setter(&self, value: $ty) {
                self.inner.set(value);
            }

            pub fn name(&self) -> &str {
                self.inner.name()
            }

            /// The underlying generic actuator.
            pub fn actuator(&self) -> &Actuator<$ty> {
                &self.inner
            }
        }
    };
}

actuator_wrapper! {
    /// Boolean device that is either running or stopped.
    OnOffActuator(bool) { get: on, set: set_on }
}

actuator_wrapper! {
    /// Boolean device that is either raised or lowered.
    RaiseLowerActuator(bool) { get: raised, set: set_raised }
}

actuator_wrapper! {
    /// Analog position set point.
    PositionActuator(f32) { get: position, set: set_position }
}

actuator_wrapper! {
    /// Analog conveyor speed.
    SpeedActuator(f32) { get: speed, set: set_speed }
}

actuator_wrapper! {
    /// Numeric display panel.
    DisplayNumberActuator(u32) { get: number, set: set_number }
}

pub type Emitter = OnOffActuator;
pub type Remover = OnOffActuator;
pub type DigitalRollerConveyor = OnOffActuator;
pub type LightIndicator = OnOffActuator;
pub type WarningLight = OnOffActuator;
pub type AlarmSiren = OnOffActuator;

pub type RollerStop = RaiseLowerActuator;
pub type StopBlade = RaiseLowerActuator;

/// Belt conveyors carry light loads, up to 3 m/s.
pub type BeltConveyor = SpeedActuator;
pub type RollerConveyor = SpeedActuator;
