//! Weight sorting: a conveyor scale weighs each box and a pop-up wheel
//! sorter sends it left, right or straight on.

use std::sync::Arc;
use std::time::Duration;

use bl_devices::{
    ConveyorScale, DiffuseSensor, Direction, DigitalRollerConveyor, Emitter, PopUpWheelSorter,
    Remover, RetroreflectiveSensor, Rotation,
};
use bl_registry::{Factory, Station};
use tracing::{debug, info};

use crate::config::SortingConfig;
use crate::error::{AppError, AppResult};
use crate::runner::{Demo, POLL, StopFlag, Workers};

struct SortingDevices {
    factory: Arc<Factory>,
    config: SortingConfig,
    station: Station,
    emitter: Emitter,
    left_remover: Remover,
    right_remover: Remover,
    back_remover: Remover,
    entry_conveyor: DigitalRollerConveyor,
    back_conveyor: DigitalRollerConveyor,
    left_conveyor: DigitalRollerConveyor,
    right_conveyor: DigitalRollerConveyor,
    scale: ConveyorScale,
    sorter: PopUpWheelSorter,
    entry_sensor: RetroreflectiveSensor,
    scale_sensor: DiffuseSensor,
    stop: StopFlag,
}

impl SortingDevices {
    fn wait_for_scale(&self, occupied: bool) -> bool {
        self.stop.wait_until(
            || self.scale_sensor.item_detected() == occupied,
            || {
                self.scale_sensor.wait_for_change_timeout(POLL);
            },
        )
    }

    fn sorting_manager(&self) -> AppResult<()> {
        info!("Sorting manager started");
        for device in [
            &self.back_conveyor,
            &self.left_conveyor,
            &self.right_conveyor,
            &self.entry_conveyor,
        ] {
            device.set_on(true);
        }
        for device in [&self.left_remover, &self.right_remover, &self.back_remover] {
            device.set_on(true);
        }
        self.emitter.set_on(true);
        self.scale.set_rotation(Rotation::Forward);
        self.sorter.rotate_wheels(true);
        self.sorter.set_direction(Direction::Straight);
        self.station.publish_changes()?;

        let mut sorted = 0u64;
        loop {
            if !self.wait_for_scale(true) {
                break;
            }
            if !self.stop.sleep(Duration::from_millis(self.config.settle_ms)) {
                break;
            }
            let weight = self.scale.weight();
            let direction = self.config.direction_for(weight);
            self.sorter.set_direction(direction);
            self.station.publish_changes()?;
            sorted += 1;
            info!(weight, ?direction, sorted, "Sorting box");

            if !self.wait_for_scale(false) {
                break;
            }
            self.sorter.set_direction(Direction::Straight);
            self.station.publish_changes()?;
            debug!(entry_beam = self.entry_sensor.beam_detected(), "Scale clear");
        }

        self.emitter.set_on(false);
        self.scale.set_rotation(Rotation::Off);
        self.station.publish_changes()?;
        Ok(())
    }
}

/// The weight sorting line: `Emitter`, `Entry Conveyor`, the
/// `Conveyor Scale`, the `Wheel Sorter`, `Left`/`Right`/`Back` conveyors and
/// removers, plus the `Entry Sensor` and `Scale Sensor`.
pub struct WeightSorting {
    devices: Arc<SortingDevices>,
    workers: Workers,
}

impl WeightSorting {
    pub fn new(factory: &Arc<Factory>, config: &SortingConfig) -> Self {
        let station = Station::new(factory, "Sorting");
        let devices = SortingDevices {
            factory: factory.clone(),
            config: *config,
            emitter: Emitter::new(&station, "Emitter"),
            left_remover: Remover::new(&station, "Left Remover"),
            right_remover: Remover::new(&station, "Right Remover"),
            back_remover: Remover::new(&station, "Back Remover"),
            entry_conveyor: DigitalRollerConveyor::new(&station, "Entry Conveyor"),
            back_conveyor: DigitalRollerConveyor::new(&station, "Back Conveyor"),
            left_conveyor: DigitalRollerConveyor::new(&station, "Left Conveyor"),
            right_conveyor: DigitalRollerConveyor::new(&station, "Right Conveyor"),
            scale: ConveyorScale::new(&station, "Conveyor Scale"),
            sorter: PopUpWheelSorter::new(&station, "Wheel Sorter"),
            entry_sensor: RetroreflectiveSensor::new(&station, "Entry Sensor"),
            scale_sensor: DiffuseSensor::new(&station, "Scale Sensor"),
            stop: StopFlag::new(),
            station,
        };
        Self {
            devices: Arc::new(devices),
            workers: Workers::default(),
        }
    }
}

impl Demo for WeightSorting {
    fn start(&mut self) -> AppResult<()> {
        if !self.workers.is_empty() {
            return Err(AppError::AlreadyStarted);
        }
        self.devices.factory.request_full_snapshot()?;

        let devices = self.devices.clone();
        self.workers
            .spawn("sorting manager", &self.devices.stop, move || {
                devices.sorting_manager()
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
