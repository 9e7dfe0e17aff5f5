//! The value cell shared by actuators and sensors.

use std::sync::{Mutex, MutexGuard, PoisonError};

use bl_core::DeviceScalar;

/// State guarded by the cell's lock.
#[derive(Debug)]
pub(crate) struct CellState<T> {
    pub(crate) value: T,
    /// Dirty for actuators, changed for sensors.
    pub(crate) flag: bool,
    /// Last value an actuator emitted. Unused by sensors.
    pub(crate) published: Option<T>,
}

/// A named, typed, mutex-protected value with a change flag.
///
/// Every operation takes the cell's own lock, so callers never need external
/// locking. The name is fixed at construction.
#[derive(Debug)]
pub struct ValueCell<T> {
    name: String,
    state: Mutex<CellState<T>>,
}

impl<T: DeviceScalar> ValueCell<T> {
    /// Create a cell holding `initial` with the flag set to `flagged`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn new(name: impl Into<String>, initial: T, flagged: bool) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "Device name must not be empty");
        Self {
            name,
            state: Mutex::new(CellState {
                value: initial,
                flag: flagged,
                published: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.lock().value
    }

    /// Replace the value and raise the flag, unless `value` equals the
    /// current value exactly.
    ///
    /// Returns true if the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut state = self.lock();
        if value != state.value {
            state.value = value;
            state.flag = true;
            true
        } else {
            false
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.lock().flag
    }

    // Guarded state is consistent after every statement, so a poisoned lock
    // is still safe to use.
    pub(crate) fn lock(&self) -> MutexGuard<'_, CellState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
