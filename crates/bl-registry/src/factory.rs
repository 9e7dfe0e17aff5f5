//! Root registry and its link to the peer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Duration;

use bl_core::{ApplySensor, DeviceRegistrar, PublishActuator, Snapshot};
use bl_link::{Channel, LinkEvents, LinkSettings, TcpLink, Transport};
use tracing::{debug, info, trace, warn};

use crate::error::{RegistryError, RegistryResult};

/// Link state of a factory. `Connected` is terminal: a lost link is
/// reported through [`Factory::is_link_lost`] but never re-established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
}

#[derive(Default)]
struct RegistryState {
    actuators: Vec<Arc<dyn PublishActuator>>,
    sensors: Vec<Arc<dyn ApplySensor>>,
    /// Inbound batches that changed at least one sensor.
    changes: u64,
    /// Inbound batches that parsed, changed or not.
    batches: u64,
}

/// Aggregates actuators and sensors and keeps them in sync with the peer.
///
/// One mutex guards both device lists and the batch counters; one condition
/// variable signals "an inbound batch arrived". Devices lock themselves, so
/// the factory never holds two locks of its own at once.
pub struct Factory {
    state: Mutex<RegistryState>,
    inbound: Condvar,
    link: OnceLock<Channel>,
    /// Held from the "already connected?" check until the link is stored, so
    /// no second link is ever opened and then dropped.
    connecting: Mutex<()>,
    link_lost: AtomicBool,
}

impl Factory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RegistryState::default()),
            inbound: Condvar::new(),
            link: OnceLock::new(),
            connecting: Mutex::new(()),
            link_lost: AtomicBool::new(false),
        })
    }

    /// Open the TCP link to the peer. One attempt, no retry.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyConnected`] on a second call, or the link
    /// error if the connect attempt fails.
    pub fn connect(self: &Arc<Self>, settings: &LinkSettings) -> RegistryResult<()> {
        let _guard = self.connecting.lock().unwrap_or_else(PoisonError::into_inner);
        if self.link.get().is_some() {
            return Err(RegistryError::AlreadyConnected);
        }
        let events = Arc::new(FactoryEvents {
            factory: Arc::downgrade(self),
        });
        let link = TcpLink::connect(settings, events)?;
        self.install(Channel::new(link))
    }

    /// Use `transport` as the link. The caller is responsible for feeding
    /// inbound messages to [`handle_inbound`](Factory::handle_inbound).
    pub fn attach(&self, transport: impl Transport + 'static) -> RegistryResult<()> {
        let _guard = self.connecting.lock().unwrap_or_else(PoisonError::into_inner);
        self.install(Channel::new(transport))
    }

    /// Store the link. Callers hold `connecting`.
    fn install(&self, channel: Channel) -> RegistryResult<()> {
        self.link
            .set(channel)
            .map_err(|_| RegistryError::AlreadyConnected)?;
        info!("Factory connected");
        Ok(())
    }

    pub fn connection_state(&self) -> ConnectionState {
        if self.link.get().is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Unconnected
        }
    }

    /// True once the peer went away or a send failed. Nothing more will
    /// arrive and blocked waits will not return.
    pub fn is_link_lost(&self) -> bool {
        self.link_lost.load(Ordering::SeqCst)
    }

    pub fn actuator_count(&self) -> usize {
        self.lock().actuators.len()
    }

    pub fn sensor_count(&self) -> usize {
        self.lock().sensors.len()
    }

    /// Send every dirty actuator registered directly with the factory, in
    /// registration order. An empty object is still sent when nothing is
    /// dirty.
    pub fn publish_changes(&self) -> RegistryResult<()> {
        let state = self.lock();
        self.publish_actuators(&state.actuators, true)
    }

    /// Send every actuator registered directly with the factory, dirty or not.
    pub fn publish_all(&self) -> RegistryResult<()> {
        let state = self.lock();
        self.publish_actuators(&state.actuators, false)
    }

    /// Build one snapshot from `actuators` and send it.
    pub(crate) fn publish_actuators(
        &self,
        actuators: &[Arc<dyn PublishActuator>],
        only_if_dirty: bool,
    ) -> RegistryResult<()> {
        let channel = self.channel()?;
        let mut snapshot = Snapshot::new();
        for actuator in actuators {
            actuator.publish(&mut snapshot, only_if_dirty);
        }
        debug!(entries = snapshot.len(), only_if_dirty, "Publishing actuators");
        channel.send_snapshot(&snapshot).inspect_err(|_| {
            self.mark_link_lost();
        })?;
        Ok(())
    }

    /// Parse an inbound message and apply it to every sensor.
    ///
    /// A malformed message is rejected as a whole: no sensor changes and no
    /// waiter wakes. Returns the number of sensors that changed.
    pub fn handle_inbound(&self, message: &str) -> RegistryResult<usize> {
        let snapshot = Channel::decode(message)?;
        Ok(self.apply_snapshot(&snapshot))
    }

    /// Offer `snapshot` to every sensor in registration order and signal
    /// waiters once for the whole batch.
    pub fn apply_snapshot(&self, snapshot: &Snapshot) -> usize {
        let mut state = self.lock();
        let changed = state
            .sensors
            .iter()
            .filter(|sensor| sensor.try_apply(snapshot))
            .count();

        state.batches += 1;
        if changed > 0 {
            state.changes += 1;
        }
        trace!(entries = snapshot.len(), changed, "Applied inbound batch");
        drop(state);

        self.inbound.notify_all();
        changed
    }

    /// Number of inbound batches so far that changed at least one sensor.
    ///
    /// Read this before checking sensor values, then pass it to
    /// [`wait_for_change_after`](Factory::wait_for_change_after) so a change
    /// landing in between is not missed.
    pub fn change_count(&self) -> u64 {
        self.lock().changes
    }

    /// Block until the next inbound batch that changes a sensor.
    pub fn wait_for_any_change(&self) {
        let seen = self.change_count();
        self.wait_for_change_after(seen);
    }

    /// Block until the change count moves past `seen`, returning the new count.
    pub fn wait_for_change_after(&self, seen: u64) -> u64 {
        let state = self.lock();
        let state = self
            .inbound
            .wait_while(state, |s| s.changes == seen)
            .unwrap_or_else(PoisonError::into_inner);
        state.changes
    }

    /// Bounded form of [`wait_for_change_after`](Factory::wait_for_change_after).
    /// Returns the count when the wait ended, equal to `seen` on timeout.
    pub fn wait_for_change_after_timeout(&self, seen: u64, timeout: Duration) -> u64 {
        let state = self.lock();
        let (state, _) = self
            .inbound
            .wait_timeout_while(state, timeout, |s| s.changes == seen)
            .unwrap_or_else(PoisonError::into_inner);
        state.changes
    }

    /// Ask the peer for its full sensor state and block until the answer
    /// has been applied.
    ///
    /// Waits for the next inbound batch rather than the next change, so a
    /// reply that matches the initial zero values still releases the caller.
    pub fn request_full_snapshot(&self) -> RegistryResult<()> {
        let seen = self.lock().batches;
        self.channel()?.request_sensor_data().inspect_err(|_| {
            self.mark_link_lost();
        })?;

        info!("Waiting for initial sensor data");
        let state = self.lock();
        let _state = self
            .inbound
            .wait_while(state, |s| s.batches == seen)
            .unwrap_or_else(PoisonError::into_inner);
        info!("Initial sensor data received");
        Ok(())
    }

    fn channel(&self) -> RegistryResult<&Channel> {
        self.link.get().ok_or(RegistryError::NotConnected)
    }

    fn mark_link_lost(&self) {
        if !self.link_lost.swap(true, Ordering::SeqCst) {
            warn!("Link to peer lost; no further sensor updates will arrive");
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceRegistrar for Factory {
    fn register_actuator(&self, actuator: Arc<dyn PublishActuator>) {
        let mut state = self.lock();
        warn_on_duplicate(state.actuators.iter().map(|a| a.name()), actuator.name(), "actuator");
        trace!(name = actuator.name(), kind = %actuator.kind(), "Registered actuator");
        state.actuators.push(actuator);
    }

    fn register_sensor(&self, sensor: Arc<dyn ApplySensor>) {
        let mut state = self.lock();
        warn_on_duplicate(state.sensors.iter().map(|s| s.name()), sensor.name(), "sensor");
        trace!(name = sensor.name(), kind = %sensor.kind(), "Registered sensor");
        state.sensors.push(sensor);
    }
}

/// Duplicates are kept, matching registration order, but they make routing
/// ambiguous, so say so.
pub(crate) fn warn_on_duplicate<'a>(
    mut existing: impl Iterator<Item = &'a str>,
    name: &str,
    what: &'static str,
) {
    if existing.any(|n| n == name) {
        warn!(name, what, "Duplicate device name registered");
    }
}

/// Link callbacks routed back into a factory without keeping it alive.
struct FactoryEvents {
    factory: Weak<Factory>,
}

impl LinkEvents for FactoryEvents {
    fn connection_established(&self) {
        debug!("Link established");
    }

    fn connection_lost(&self) {
        if let Some(factory) = self.factory.upgrade() {
            factory.mark_link_lost();
        }
    }

    fn message_received(&self, message: &str) {
        let Some(factory) = self.factory.upgrade() else {
            return;
        };
        if let Err(err) = factory.handle_inbound(message) {
            warn!(%err, %message, "Discarding inbound message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unconnected() {
        let factory = Factory::new();
        assert_eq!(factory.connection_state(), ConnectionState::Unconnected);
        assert!(matches!(
            factory.publish_changes(),
            Err(RegistryError::NotConnected)
        ));
        assert!(matches!(
            factory.request_full_snapshot(),
            Err(RegistryError::NotConnected)
        ));
    }

    #[test]
    fn timed_wait_returns_seen_count_without_changes() {
        let factory = Factory::new();
        let seen = factory.change_count();
        assert_eq!(
            factory.wait_for_change_after_timeout(seen, Duration::from_millis(20)),
            seen
        );
    }

    #[test]
    fn duplicate_check_matches_exact_names() {
        let names = ["At Entry", "At Exit"];
        // Only logs; must not panic or filter.
        warn_on_duplicate(names.iter().copied(), "At Entry", "sensor");
        warn_on_duplicate(names.iter().copied(), "at entry", "sensor");
    }
}
