//! Generic actuator: a locally written value published to the peer.

use std::sync::Arc;

use bl_core::{DeviceRegistrar, DeviceScalar, PublishActuator, Snapshot, ValueKind};

use crate::cell::ValueCell;

/// A named output value the local process may set.
///
/// The actuator is dirty while its value differs from the last value it
/// published. A [`set`](Actuator::set) to the current value is a no-op, and
/// the publish that emits a value clears the flag, so each change is sent
/// once. A new actuator starts dirty so the peer learns its initial value on
/// the first publish.
#[derive(Debug)]
pub struct Actuator<T> {
    cell: ValueCell<T>,
}

impl<T: DeviceScalar> Actuator<T> {
    /// Create an actuator and register it with `registrar`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn new<R>(registrar: &R, name: impl Into<String>, initial: T) -> Arc<Self>
    where
        R: DeviceRegistrar + ?Sized,
    {
        let actuator = Arc::new(Self::unregistered(name, initial));
        registrar.register_actuator(actuator.clone());
        actuator
    }

    /// Create an actuator that no registry knows about.
    pub fn unregistered(name: impl Into<String>, initial: T) -> Self {
        Self {
            cell: ValueCell::new(name, initial, true),
        }
    }

    pub fn name(&self) -> &str {
        self.cell.name()
    }

    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Set a new value. Setting the current value is a no-op.
    ///
    /// Returns true if the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut state = self.cell.lock();
        if value == state.value {
            return false;
        }
        state.value = value;
        state.flag = state.published != Some(value);
        true
    }

    /// True if a change has not been published yet.
    pub fn is_dirty(&self) -> bool {
        self.cell.is_flagged()
    }
}

impl<T: DeviceScalar> PublishActuator for Actuator<T> {
    fn name(&self) -> &str {
        self.cell.name()
    }

    fn kind(&self) -> ValueKind {
        T::KIND
    }

    fn publish(&self, sink: &mut Snapshot, only_if_dirty: bool) -> bool {
        let mut state = self.cell.lock();
        if only_if_dirty && !state.flag {
            return false;
        }
        sink.insert(self.cell.name(), state.value);
        state.published = Some(state.value);
        state.flag = false;
        true
    }
}
