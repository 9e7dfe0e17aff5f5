//! Demo configuration, loaded from YAML.
//!
//! Every field has a default matching the stock simulated lines, so an
//! empty file (or no file at all) is a valid configuration.

use std::path::Path;

use bl_devices::Direction;
use bl_link::LinkSettings;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Top-level configuration for the command line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub link: LinkSettings,
    pub conveyor: ConveyorConfig,
    pub packing: PackingConfig,
    pub sorting: SortingConfig,
}

/// Conveyor control: one control loop per station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConveyorConfig {
    pub stations: Vec<ConveyorStationConfig>,
}

impl Default for ConveyorConfig {
    fn default() -> Self {
        Self {
            stations: vec![
                ConveyorStationConfig {
                    prefix: "Station 1 ".to_string(),
                    max_boxes: 2,
                },
                ConveyorStationConfig {
                    prefix: "Station 2 ".to_string(),
                    max_boxes: 4,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyorStationConfig {
    /// Prepended verbatim to every device name, trailing space included.
    pub prefix: String,
    /// Boxes allowed between the entry and exit sensors before the emitter
    /// pauses.
    pub max_boxes: u32,
}

/// A gantry coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Packing line: where the gantry picks boxes up and where it stacks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingConfig {
    /// Above the box stop blade.
    pub pick_up: Point,
    /// Travel height for horizontal moves.
    pub z_top: f32,
    /// How close the reported Z must get to a target to count as arrived.
    pub tolerance: f32,
    /// Drop positions in stacking order; a pallet is full after the last one.
    pub layers: Vec<Point>,
    /// Pause around grab and release so the gripper settles.
    pub settle_ms: u64,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            pick_up: Point::new(7.7, 5.3, 5.5),
            z_top: 0.0,
            tolerance: 0.3,
            layers: vec![
                Point::new(3.2, 4.2, 10.0),
                Point::new(3.2, 7.2, 10.0),
                Point::new(3.2, 4.2, 5.5),
                Point::new(3.2, 7.2, 5.5),
                Point::new(3.2, 4.2, 0.5),
                Point::new(3.2, 7.2, 0.5),
            ],
            settle_ms: 250,
        }
    }
}

/// Weight sorting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortingConfig {
    /// Boxes lighter than this go left.
    pub light_below: f32,
    /// Boxes heavier than this go right. Anything in between goes straight.
    pub heavy_above: f32,
    /// Delay between detecting a box on the scale and reading its weight.
    pub settle_ms: u64,
}

impl Default for SortingConfig {
    fn default() -> Self {
        Self {
            light_below: 5.0,
            heavy_above: 15.0,
            settle_ms: 250,
        }
    }
}

impl SortingConfig {
    pub fn direction_for(&self, weight: f32) -> Direction {
        if weight < self.light_below {
            Direction::Left
        } else if weight > self.heavy_above {
            Direction::Right
        } else {
            Direction::Straight
        }
    }
}

impl DemoConfig {
    /// Reject settings no demo can run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.conveyor.stations.is_empty() {
            return Err(AppError::Validation(
                "Conveyor demo needs at least one station".to_string(),
            ));
        }
        if let Some(station) = self.conveyor.stations.iter().find(|s| s.max_boxes == 0) {
            return Err(AppError::Validation(format!(
                "Station '{}' must allow at least one box",
                station.prefix
            )));
        }
        if self.packing.layers.is_empty() {
            return Err(AppError::Validation(
                "Packing demo needs at least one layer position".to_string(),
            ));
        }
        if !(self.packing.tolerance > 0.0) {
            return Err(AppError::Validation(
                "Packing tolerance must be positive".to_string(),
            ));
        }
        if !(self.sorting.light_below <= self.sorting.heavy_above) {
            return Err(AppError::Validation(format!(
                "Sorting thresholds out of order: light_below {} > heavy_above {}",
                self.sorting.light_below, self.sorting.heavy_above
            )));
        }
        Ok(())
    }
}

/// Load and validate a config from a YAML file.
pub fn load_config(path: &Path) -> AppResult<DemoConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: DemoConfig = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
