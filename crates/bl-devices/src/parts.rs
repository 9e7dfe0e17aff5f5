//! Machines built from several devices.
//!
//! A part names its devices `"<part name> <role>"`, so two parts of the same
//! type on one line must be given different names.

use bl_core::DeviceRegistrar;
use serde::{Deserialize, Serialize};

use crate::actuators::{OnOffActuator, PositionActuator};
use crate::sensors::{ItemDetectedSensor, PositionSensor, WeightSensor};

/// Belt or roller rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Off,
    Forward,
    Backward,
}

/// Where a sorter sends the next item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Straight,
    Left,
    Right,
}

fn device_name(part: &str, role: &str) -> String {
    format!("{part} {role}")
}

/// Drives a forward/backward pair from a [`Rotation`].
fn apply_rotation(forward: &OnOffActuator, backward: &OnOffActuator, rotation: Rotation) {
    forward.set_on(rotation == Rotation::Forward);
    backward.set_on(rotation == Rotation::Backward);
}

/// 45 degree powered arm that diverts items with a belt.
#[derive(Debug, Clone)]
pub struct PivotArmSorter {
    forward: OnOffActuator,
    backward: OnOffActuator,
    turn: OnOffActuator,
}

impl PivotArmSorter {
    pub fn new<R: DeviceRegistrar + ?Sized>(registrar: &R, name: &str) -> Self {
        Self {
            forward: OnOffActuator::new(registrar, device_name(name, "Forward")),
            backward: OnOffActuator::new(registrar, device_name(name, "Backward")),
            turn: OnOffActuator::new(registrar, device_name(name, "Turn")),
        }
    }

    pub fn set_rotation(&self, rotation: Rotation) {
        apply_rotation(&self.forward, &self.backward, rotation);
    }

    pub fn turn(&self, on: bool) {
        self.turn.set_on(on);
    }
}

/// High speed scale conveyor used for weight control.
#[derive(Debug, Clone)]
pub struct ConveyorScale {
    forward: OnOffActuator,
    backward: OnOffActuator,
    weight: WeightSensor,
}

impl ConveyorScale {
    pub fn new<R: DeviceRegistrar + ?Sized>(registrar: &R, name: &str) -> Self {
        Self {
            forward: OnOffActuator::new(registrar, device_name(name, "Forward")),
            backward: OnOffActuator::new(registrar, device_name(name, "Backward")),
            weight: WeightSensor::new(registrar, device_name(name, "Weight")),
        }
    }

    pub fn set_rotation(&self, rotation: Rotation) {
        apply_rotation(&self.forward, &self.backward, rotation);
    }

    pub fn weight(&self) -> f32 {
        self.weight.weight()
    }

    pub fn weight_sensor(&self) -> &WeightSensor {
        &self.weight
    }
}

/// Double-sided pop-up wheel sorter with three exits.
#[derive(Debug, Clone)]
pub struct PopUpWheelSorter {
    rotate: OnOffActuator,
    left: OnOffActuator,
    right: OnOffActuator,
}

impl PopUpWheelSorter {
    pub fn new<R: DeviceRegistrar + ?Sized>(registrar: &R, name: &str) -> Self {
        Self {
            rotate: OnOffActuator::new(registrar, device_name(name, "Rotate")),
            left: OnOffActuator::new(registrar, device_name(name, "Left")),
            right: OnOffActuator::new(registrar, device_name(name, "Right")),
        }
    }

    pub fn rotate_wheels(&self, on: bool) {
        self.rotate.set_on(on);
    }

    pub fn set_direction(&self, direction: Direction) {
        self.left.set_on(direction == Direction::Left);
        self.right.set_on(direction == Direction::Right);
    }
}

/// Three-axis gantry with a gripper.
///
/// Set points are written through actuators; the gantry reports where it
/// actually is through position sensors, so callers wait on the feedback
/// rather than assuming a move completed.
#[derive(Debug, Clone)]
pub struct PickAndPlace {
    x: PositionActuator,
    y: PositionActuator,
    z: PositionActuator,
    grab: OnOffActuator,
    item_detected: ItemDetectedSensor,
    x_position: PositionSensor,
    y_position: PositionSensor,
    z_position: PositionSensor,
}

impl PickAndPlace {
    pub fn new<R: DeviceRegistrar + ?Sized>(registrar: &R, name: &str) -> Self {
        Self {
            x: PositionActuator::new(registrar, device_name(name, "X Set Point")),
            y: PositionActuator::new(registrar, device_name(name, "Y Set Point")),
            z: PositionActuator::new(registrar, device_name(name, "Z Set Point")),
            grab: OnOffActuator::new(registrar, device_name(name, "Grab")),
            item_detected: ItemDetectedSensor::new(registrar, device_name(name, "Item Detected")),
            x_position: PositionSensor::new(registrar, device_name(name, "X Position")),
            y_position: PositionSensor::new(registrar, device_name(name, "Y Position")),
            z_position: PositionSensor::new(registrar, device_name(name, "Z Position")),
        }
    }

    pub fn set_x(&self, x: f32) {
        self.x.set_position(x);
    }

    pub fn set_y(&self, y: f32) {
        self.y.set_position(y);
    }

    pub fn set_z(&self, z: f32) {
        self.z.set_position(z);
    }

    pub fn set_grab(&self, on: bool) {
        self.grab.set_on(on);
    }

    pub fn item_detected(&self) -> bool {
        self.item_detected.item_detected()
    }

    pub fn x(&self) -> f32 {
        self.x_position.position()
    }

    pub fn y(&self) -> f32 {
        self.y_position.position()
    }

    pub fn z(&self) -> f32 {
        self.z_position.position()
    }
}
