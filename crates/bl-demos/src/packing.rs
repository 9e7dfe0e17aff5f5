//! Packing line: boxes are stacked onto pallets by a pick-and-place gantry.
//!
//! Three stations share one factory. The pallet manager brings an empty
//! pallet to the packing location and sends it on once full; the box
//! manager brings one box at a time under the gantry; the packing manager
//! moves each box onto the next layer position and updates the count
//! display. The managers hand off through three flags.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use bl_devices::{
    DigitalRollerConveyor, DisplayNumberActuator, Emitter, PickAndPlace, Remover,
    RetroreflectiveSensor, RollerStop, StopBlade,
};
use bl_registry::{Factory, Station};
use tracing::{debug, info};

use crate::config::{PackingConfig, Point};
use crate::error::{AppError, AppResult};
use crate::runner::{Demo, POLL, StopFlag, Workers};

/// How long a box is given to clear the stop blade before it drops again.
const BLADE_SETTLE: Duration = Duration::from_secs(1);

struct PalletStation {
    station: Station,
    emitter: Emitter,
    remover: Remover,
    entry_conveyor: DigitalRollerConveyor,
    exit_conveyor: DigitalRollerConveyor,
    roller_stop: RollerStop,
    entry_sensor: RetroreflectiveSensor,
    at_packing_location: RetroreflectiveSensor,
}

struct BoxStation {
    station: Station,
    emitter: Emitter,
    conveyor: DigitalRollerConveyor,
    entry_sensor: RetroreflectiveSensor,
    at_packing_location: RetroreflectiveSensor,
    stop_blade: StopBlade,
}

struct PackingStation {
    station: Station,
    gantry: PickAndPlace,
    box_count: DisplayNumberActuator,
}

struct Line {
    factory: Arc<Factory>,
    config: PackingConfig,
    pallet: PalletStation,
    boxes: BoxStation,
    packing: PackingStation,
    box_ready: AtomicBool,
    pallet_ready: AtomicBool,
    pallet_full: AtomicBool,
    stop: StopFlag,
}

/// Wait until `sensor` reads `beam`, or the line stops.
fn wait_for_beam(stop: &StopFlag, sensor: &RetroreflectiveSensor, beam: bool) -> bool {
    stop.wait_until(
        || sensor.beam_detected() == beam,
        || {
            sensor.wait_for_change_timeout(POLL);
        },
    )
}

impl Line {
    fn wait_for_flag(&self, flag: &AtomicBool, value: bool) -> bool {
        self.stop
            .wait_until(|| flag.load(Ordering::SeqCst) == value, || thread::sleep(POLL))
    }

    fn settle(&self) -> bool {
        self.stop.sleep(Duration::from_millis(self.config.settle_ms))
    }

    fn pallet_manager(&self) -> AppResult<()> {
        let p = &self.pallet;
        info!("Pallet manager started");
        p.exit_conveyor.set_on(true);
        p.remover.set_on(true);

        loop {
            p.emitter.set_on(true);
            p.station.publish_changes()?;

            if !wait_for_beam(&self.stop, &p.entry_sensor, false) {
                break;
            }
            p.emitter.set_on(false);
            p.roller_stop.set_raised(true);
            p.entry_conveyor.set_on(true);
            p.station.publish_changes()?;

            if !wait_for_beam(&self.stop, &p.at_packing_location, false) {
                break;
            }
            p.entry_conveyor.set_on(false);
            p.station.publish_changes()?;
            self.pallet_ready.store(true, Ordering::SeqCst);
            info!("Pallet in packing position");

            if !self.wait_for_flag(&self.pallet_full, true) {
                break;
            }
            p.roller_stop.set_raised(false);
            p.entry_conveyor.set_on(true);
            p.station.publish_changes()?;

            if !wait_for_beam(&self.stop, &p.at_packing_location, true) {
                break;
            }
            self.pallet_full.store(false, Ordering::SeqCst);
            p.entry_conveyor.set_on(false);
            p.station.publish_changes()?;
            info!("Full pallet sent on");
        }

        p.emitter.set_on(false);
        p.station.publish_changes()?;
        Ok(())
    }

    fn box_manager(&self) -> AppResult<()> {
        let b = &self.boxes;
        info!("Box manager started");

        loop {
            b.emitter.set_on(true);
            b.station.publish_changes()?;

            if !wait_for_beam(&self.stop, &b.entry_sensor, false) {
                break;
            }
            b.emitter.set_on(false);
            b.conveyor.set_on(true);
            b.stop_blade.set_raised(true);
            b.station.publish_changes()?;

            if !wait_for_beam(&self.stop, &b.at_packing_location, false) {
                break;
            }
            b.conveyor.set_on(false);
            b.station.publish_changes()?;
            if !self.stop.sleep(BLADE_SETTLE) {
                break;
            }
            b.stop_blade.set_raised(false);
            b.station.publish_changes()?;

            self.box_ready.store(true, Ordering::SeqCst);
            debug!("Box ready for pick-up");
            if !self.wait_for_flag(&self.box_ready, false) {
                break;
            }
        }

        b.emitter.set_on(false);
        b.station.publish_changes()?;
        Ok(())
    }

    /// Wait until the gantry reports a Z position satisfying `arrived`.
    fn wait_for_z(&self, arrived: impl Fn(f32) -> bool) -> bool {
        let gantry = &self.packing.gantry;
        self.stop
            .wait_until(|| arrived(gantry.z()), || thread::sleep(POLL))
    }

    /// Wait for the gripper to report an item under it.
    fn wait_for_item(&self) -> bool {
        let gantry = &self.packing.gantry;
        self.stop.wait_until(
            || gantry.item_detected(),
            || {
                let seen = self.factory.change_count();
                self.factory.wait_for_change_after_timeout(seen, POLL);
            },
        )
    }

    /// Move one box from the pick-up point to `target`. False if stopped.
    fn place_box(&self, target: Point) -> AppResult<bool> {
        let PackingStation { station, gantry, .. } = &self.packing;
        let c = &self.config;
        let tolerance = c.tolerance;

        gantry.set_x(c.pick_up.x);
        gantry.set_y(c.pick_up.y);
        gantry.set_z(c.z_top);
        station.publish_changes()?;

        let ready = self.stop.wait_until(
            || self.box_ready.load(Ordering::SeqCst) && self.pallet_ready.load(Ordering::SeqCst),
            || thread::sleep(POLL),
        );
        if !ready {
            return Ok(false);
        }

        gantry.set_z(c.pick_up.z);
        station.publish_changes()?;
        if !self.wait_for_item() || !self.settle() {
            return Ok(false);
        }
        gantry.set_grab(true);
        station.publish_changes()?;
        if !self.settle() {
            return Ok(false);
        }

        gantry.set_z(c.z_top);
        station.publish_changes()?;
        if !self.wait_for_z(|z| z <= c.z_top + tolerance) {
            return Ok(false);
        }

        gantry.set_x(target.x);
        gantry.set_y(target.y);
        station.publish_changes()?;
        if !self.stop.sleep(Duration::from_millis(2 * c.settle_ms)) {
            return Ok(false);
        }

        gantry.set_z(target.z);
        station.publish_changes()?;
        if !self.wait_for_z(|z| z >= target.z - tolerance) || !self.settle() {
            return Ok(false);
        }
        gantry.set_grab(false);
        station.publish_changes()?;
        if !self.settle() {
            return Ok(false);
        }
        Ok(true)
    }

    fn packing_manager(&self) -> AppResult<()> {
        info!(layers = self.config.layers.len(), "Packing manager started");

        'pallets: loop {
            for (index, &target) in self.config.layers.iter().enumerate() {
                if !self.place_box(target)? {
                    break 'pallets;
                }
                let placed = u32::try_from(index + 1).unwrap_or(u32::MAX);
                self.packing.gantry.set_z(self.config.z_top);
                self.packing.box_count.set_number(placed);
                self.packing.station.publish_changes()?;
                self.box_ready.store(false, Ordering::SeqCst);
                debug!(placed, "Box placed");
            }
            info!("Pallet full");
            self.pallet_full.store(true, Ordering::SeqCst);
            self.pallet_ready.store(false, Ordering::SeqCst);
        }

        self.packing.gantry.set_grab(false);
        self.packing.gantry.set_z(self.config.z_top);
        self.packing.station.publish_changes()?;
        Ok(())
    }
}

/// The pallet, box and packing stations and their three managers.
///
/// Device names: `Pallet Emitter`, `Pallet Remover`, `Pallet Entry Conveyor`,
/// `Pallet Exit Conveyor`, `Pallet Roller Stop`, `Pallet At Entry`,
/// `Pallet At Packing Location`, `Box Emitter`, `Box Conveyor`,
/// `Box At Entry`, `Box At Packing Location`, `Box Stop Blade`, the
/// `Pick and Place` gantry and the `Box Count` display.
pub struct PackingLine {
    line: Arc<Line>,
    workers: Workers,
}

impl PackingLine {
    pub fn new(factory: &Arc<Factory>, config: &PackingConfig) -> Self {
        let pallet = Station::new(factory, "Pallet");
        let boxes = Station::new(factory, "Box");
        let packing = Station::new(factory, "Packing");

        let line = Line {
            factory: factory.clone(),
            config: config.clone(),
            pallet: PalletStation {
                emitter: Emitter::new(&pallet, "Pallet Emitter"),
                remover: Remover::new(&pallet, "Pallet Remover"),
                entry_conveyor: DigitalRollerConveyor::new(&pallet, "Pallet Entry Conveyor"),
                exit_conveyor: DigitalRollerConveyor::new(&pallet, "Pallet Exit Conveyor"),
                roller_stop: RollerStop::new(&pallet, "Pallet Roller Stop"),
                entry_sensor: RetroreflectiveSensor::new(&pallet, "Pallet At Entry"),
                at_packing_location: RetroreflectiveSensor::new(
                    &pallet,
                    "Pallet At Packing Location",
                ),
                station: pallet,
            },
            boxes: BoxStation {
                emitter: Emitter::new(&boxes, "Box Emitter"),
                conveyor: DigitalRollerConveyor::new(&boxes, "Box Conveyor"),
                entry_sensor: RetroreflectiveSensor::new(&boxes, "Box At Entry"),
                at_packing_location: RetroreflectiveSensor::new(&boxes, "Box At Packing Location"),
                stop_blade: StopBlade::new(&boxes, "Box Stop Blade"),
                station: boxes,
            },
            packing: PackingStation {
                gantry: PickAndPlace::new(&packing, "Pick and Place"),
                box_count: DisplayNumberActuator::new(&packing, "Box Count"),
                station: packing,
            },
            box_ready: AtomicBool::new(false),
            pallet_ready: AtomicBool::new(false),
            pallet_full: AtomicBool::new(false),
            stop: StopFlag::new(),
        };

        Self {
            line: Arc::new(line),
            workers: Workers::default(),
        }
    }
}

impl Demo for PackingLine {
    fn start(&mut self) -> AppResult<()> {
        if !self.workers.is_empty() {
            return Err(AppError::AlreadyStarted);
        }
        self.line.factory.request_full_snapshot()?;

        let stop = &self.line.stop;
        let line = self.line.clone();
        self.workers
            .spawn("pallet manager", stop, move || line.pallet_manager())?;
        let line = self.line.clone();
        self.workers
            .spawn("box manager", stop, move || line.box_manager())?;
        let line = self.line.clone();
        self.workers
            .spawn("packing manager", stop, move || line.packing_manager())?;
        Ok(())
    }

    fn stop(&self) {
        self.line.stop.stop();
    }

    fn wait_until_done(&mut self) -> AppResult<()> {
        self.workers.join_all()
    }
}
