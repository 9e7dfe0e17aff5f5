//! Conveyor control: keep a bounded number of boxes between an emitter and
//! a remover.
//!
//! The entry handler counts boxes passing the entry beam and pauses the
//! emitter once the station is full. The exit handler counts boxes leaving
//! and resumes the emitter.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bl_devices::{DigitalRollerConveyor, Emitter, Remover, RetroreflectiveSensor};
use bl_registry::{Factory, Station};
use tracing::info;

use crate::config::ConveyorStationConfig;
use crate::error::{AppError, AppResult};
use crate::runner::{Demo, POLL, StopFlag, Workers};

/// Edge detector for a retroreflective beam.
///
/// A box has passed once the beam has been broken and then restored.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoxPassage {
    broken: bool,
}

impl BoxPassage {
    /// Feed the current beam reading; true on the broken-to-restored edge.
    pub fn observe(&mut self, beam_detected: bool) -> bool {
        if !beam_detected {
            self.broken = true;
            false
        } else if self.broken {
            self.broken = false;
            true
        } else {
            false
        }
    }
}

/// Boxes between the entry and exit sensors.
#[derive(Debug, Clone, Copy)]
pub struct BoxCounter {
    in_flight: u32,
    max: u32,
}

impl BoxCounter {
    pub fn new(max: u32) -> Self {
        Self { in_flight: 0, max }
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    /// Count a box in. True if the station is now full.
    pub fn entered(&mut self) -> bool {
        self.in_flight += 1;
        self.in_flight >= self.max
    }

    /// Count a box out. Extra exits, from boxes already on the line at
    /// start-up, are ignored.
    pub fn exited(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }
}

struct ConveyorDevices {
    station: Station,
    emitter: Emitter,
    remover: Remover,
    entry_conveyor: DigitalRollerConveyor,
    exit_conveyor: DigitalRollerConveyor,
    entry_sensor: RetroreflectiveSensor,
    exit_sensor: RetroreflectiveSensor,
    counter: Mutex<BoxCounter>,
    stop: StopFlag,
}

impl ConveyorDevices {
    fn counter(&self) -> MutexGuard<'_, BoxCounter> {
        self.counter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_entry(&self) -> AppResult<()> {
        info!(station = self.station.name(), "Box entry handler started");
        self.emitter.set_on(true);
        self.remover.set_on(true);
        self.entry_conveyor.set_on(true);
        self.exit_conveyor.set_on(true);
        self.station.publish_changes()?;

        let mut passage = BoxPassage::default();
        while !self.stop.is_stopped() {
            if passage.observe(self.entry_sensor.beam_detected()) {
                let mut counter = self.counter();
                if counter.entered() {
                    info!(
                        station = self.station.name(),
                        in_flight = counter.in_flight(),
                        "Station full, pausing emitter"
                    );
                    self.emitter.set_on(false);
                    self.station.publish_changes()?;
                }
            }
            self.entry_sensor.wait_for_change_timeout(POLL);
        }

        self.emitter.set_on(false);
        self.station.publish_changes()?;
        Ok(())
    }

    fn handle_exit(&self) -> AppResult<()> {
        info!(station = self.station.name(), "Box exit handler started");
        let mut passage = BoxPassage::default();
        while !self.stop.is_stopped() {
            if passage.observe(self.exit_sensor.beam_detected()) {
                let mut counter = self.counter();
                counter.exited();
                if !self.emitter.on() {
                    info!(
                        station = self.station.name(),
                        in_flight = counter.in_flight(),
                        "Box left, resuming emitter"
                    );
                    self.emitter.set_on(true);
                    self.station.publish_changes()?;
                }
            }
            self.exit_sensor.wait_for_change_timeout(POLL);
        }
        Ok(())
    }
}

/// One conveyor station run by an entry and an exit handler.
///
/// Devices are named by the configured prefix followed by `Emitter`,
/// `Remover`, `Entry Conveyor`, `Exit Conveyor`, `At Entry` and `At Exit`.
pub struct ConveyorControl {
    factory: Arc<Factory>,
    devices: Arc<ConveyorDevices>,
    workers: Workers,
}

impl ConveyorControl {
    /// Register the station's devices on `factory`.
    pub fn new(factory: &Arc<Factory>, config: &ConveyorStationConfig) -> Self {
        let prefix = config.prefix.as_str();
        let station = Station::new(factory, prefix.trim());
        let devices = ConveyorDevices {
            emitter: Emitter::new(&station, format!("{prefix}Emitter")),
            remover: Remover::new(&station, format!("{prefix}Remover")),
            entry_conveyor: DigitalRollerConveyor::new(&station, format!("{prefix}Entry Conveyor")),
            exit_conveyor: DigitalRollerConveyor::new(&station, format!("{prefix}Exit Conveyor")),
            entry_sensor: RetroreflectiveSensor::new(&station, format!("{prefix}At Entry")),
            exit_sensor: RetroreflectiveSensor::new(&station, format!("{prefix}At Exit")),
            counter: Mutex::new(BoxCounter::new(config.max_boxes)),
            stop: StopFlag::new(),
            station,
        };
        Self {
            factory: factory.clone(),
            devices: Arc::new(devices),
            workers: Workers::default(),
        }
    }

    /// Boxes currently counted between the two sensors.
    pub fn boxes_in_flight(&self) -> u32 {
        self.devices.counter().in_flight()
    }
}

impl Demo for ConveyorControl {
    fn start(&mut self) -> AppResult<()> {
        if !self.workers.is_empty() {
            return Err(AppError::AlreadyStarted);
        }
        self.factory.request_full_snapshot()?;

        let name = self.devices.station.name().to_string();
        let devices = self.devices.clone();
        self.workers
            .spawn(format!("{name} entry"), &self.devices.stop, move || {
                devices.handle_entry()
            })?;
        let devices = self.devices.clone();
        self.workers
            .spawn(format!("{name} exit"), &self.devices.stop, move || {
                devices.handle_exit()
            })?;
        Ok(())
    }

    fn stop(&self) {
        self.devices.stop.stop();
    }

    fn wait_until_done(&mut self) -> AppResult<()> {
        self.workers.join_all()
    }
}
