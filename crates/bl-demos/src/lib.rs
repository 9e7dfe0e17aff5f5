//! Control sequences for the simulated lines, and how they are configured.
//!
//! Each demo builds its devices on a shared [`Factory`](bl_registry::Factory),
//! asks the peer for a full sensor snapshot, then runs one thread per
//! concern until stopped.

pub mod config;
pub mod conveyor;
pub mod error;
pub mod packing;
pub mod runner;
pub mod sorting;

pub use config::{
    ConveyorConfig, ConveyorStationConfig, DemoConfig, PackingConfig, Point, SortingConfig,
    load_config,
};
pub use conveyor::{BoxCounter, BoxPassage, ConveyorControl};
pub use error::{AppError, AppResult};
pub use packing::PackingLine;
pub use runner::{Demo, StopFlag, wait_all};
pub use sorting::WeightSorting;
