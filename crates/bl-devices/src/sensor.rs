//! Generic sensor: a value written only by inbound snapshots.

use std::sync::{Arc, Condvar, PoisonError};
use std::time::Duration;

use bl_core::{ApplySensor, DeviceRegistrar, DeviceScalar, Snapshot, ValueKind};

use crate::cell::ValueCell;

/// A named input value that only the peer may set.
///
/// Until the first inbound update the value is the type's zero (`false`,
/// `0.0`, `0`) and should be treated as unknown rather than a real reading.
///
/// Each sensor carries its own wait queue for [`wait_for_change`]. At most one
/// thread should wait on a given sensor at a time: a single change wakes a
/// single waiter.
///
/// [`wait_for_change`]: Sensor::wait_for_change
#[derive(Debug)]
pub struct Sensor<T> {
    cell: ValueCell<T>,
    changed: Condvar,
}

impl<T: DeviceScalar> Sensor<T> {
    /// Create a sensor holding the zero value and register it with `registrar`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn new<R>(registrar: &R, name: impl Into<String>) -> Arc<Self>
    where
        R: DeviceRegistrar + ?Sized,
    {
        let sensor = Arc::new(Self::unregistered(name));
        registrar.register_sensor(sensor.clone());
        sensor
    }

    /// Create a sensor that no registry knows about.
    pub fn unregistered(name: impl Into<String>) -> Self {
        Self {
            cell: ValueCell::new(name, T::zero(), false),
            changed: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.cell.name()
    }

    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// True if a change arrived that no [`wait_for_change`](Sensor::wait_for_change) has consumed.
    pub fn has_changed(&self) -> bool {
        self.cell.is_flagged()
    }

    /// Block until the value changes, then consume the change.
    ///
    /// Returns at once if a change is already pending. There is no timeout:
    /// if the link to the peer is gone this never returns.
    pub fn wait_for_change(&self) -> T {
        let mut state = self.cell.lock();
        while !state.flag {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.flag = false;
        state.value
    }

    /// Like [`wait_for_change`](Sensor::wait_for_change) but gives up after
    /// `timeout`, returning `None` with nothing consumed.
    pub fn wait_for_change_timeout(&self, timeout: Duration) -> Option<T> {
        let state = self.cell.lock();
        let (mut state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |s| !s.flag)
            .unwrap_or_else(PoisonError::into_inner);
        if !state.flag {
            return None;
        }
        state.flag = false;
        Some(state.value)
    }
}

impl<T: DeviceScalar> ApplySensor for Sensor<T> {
    fn name(&self) -> &str {
        self.cell.name()
    }

    fn kind(&self) -> ValueKind {
        T::KIND
    }

    fn try_apply(&self, snapshot: &Snapshot) -> bool {
        let Some(value) = snapshot.get_as::<T>(self.cell.name()) else {
            return false;
        };
        if !self.cell.set(value) {
            return false;
        }
        self.changed.notify_one();
        true
    }
}
