//! Typed actuators and sensors for boxline.
//!
//! All devices share one generic value cell: a named scalar behind a mutex
//! with a dirty/changed flag. An [`Actuator`] is written locally and
//! published to the peer when dirty. A [`Sensor`] is written only by inbound
//! snapshots and lets one thread block until its value changes.
//!
//! Device wrappers ([`OnOffActuator`], [`RetroreflectiveSensor`], ...) are
//! thin named accessors over those generics, and [`parts`] groups several
//! devices into the physical machines found on a line.

pub mod actuator;
pub mod actuators;
pub mod cell;
pub mod parts;
pub mod sensor;
pub mod sensors;

pub use actuator::Actuator;
pub use actuators::{
    AlarmSiren, BeltConveyor, DigitalRollerConveyor, DisplayNumberActuator, Emitter,
    LightIndicator, OnOffActuator, PositionActuator, RaiseLowerActuator, Remover, RollerConveyor,
    RollerStop, SpeedActuator, StopBlade, WarningLight,
};
pub use cell::ValueCell;
pub use parts::{ConveyorScale, Direction, PickAndPlace, PivotArmSorter, PopUpWheelSorter, Rotation};
pub use sensor::Sensor;
pub use sensors::{
    CapacitiveSensor, DiffuseSensor, InductiveSensor, ItemDetectedSensor, LightArraySensor,
    LimitSensor, PositionSensor, RetroreflectiveSensor, VisionItem, VisionSensor, WeightSensor,
};
