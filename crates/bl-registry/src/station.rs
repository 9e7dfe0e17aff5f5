//! Scoped sub-registry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bl_core::{ApplySensor, DeviceRegistrar, PublishActuator};
use tracing::trace;

use crate::error::RegistryResult;
use crate::factory::{Factory, warn_on_duplicate};

/// A group of devices on one factory whose actuators are flushed together.
///
/// Actuators registered with a station are published only by that station.
/// Sensors are handed straight to the factory: all stations share one
/// inbound stream and one "any change" signal.
pub struct Station {
    name: String,
    factory: Arc<Factory>,
    actuators: Mutex<Vec<Arc<dyn PublishActuator>>>,
}

impl Station {
    pub fn new(factory: &Arc<Factory>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factory: factory.clone(),
            actuators: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> &Arc<Factory> {
        &self.factory
    }

    pub fn actuator_count(&self) -> usize {
        self.lock().len()
    }

    /// Send this station's dirty actuators as one snapshot.
    pub fn publish_changes(&self) -> RegistryResult<()> {
        let actuators = self.lock();
        trace!(station = %self.name, "Publishing station changes");
        self.factory.publish_actuators(&actuators, true)
    }

    /// Send all of this station's actuators, dirty or not.
    pub fn publish_all(&self) -> RegistryResult<()> {
        let actuators = self.lock();
        self.factory.publish_actuators(&actuators, false)
    }

    /// Block until the next inbound batch that changes any sensor on the
    /// factory, not just this station's.
    pub fn wait_for_any_change(&self) {
        self.factory.wait_for_any_change();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn PublishActuator>>> {
        self.actuators.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceRegistrar for Station {
    fn register_actuator(&self, actuator: Arc<dyn PublishActuator>) {
        let mut actuators = self.lock();
        warn_on_duplicate(actuators.iter().map(|a| a.name()), actuator.name(), "actuator");
        trace!(station = %self.name, name = actuator.name(), "Registered actuator");
        actuators.push(actuator);
    }

    fn register_sensor(&self, sensor: Arc<dyn ApplySensor>) {
        self.factory.register_sensor(sensor);
    }
}
