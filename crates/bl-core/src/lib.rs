//! bl-core: shared foundation for boxline.
//!
//! Contains:
//! - value (closed set of scalar kinds a device can carry)
//! - snapshot (flat name -> value object exchanged with the peer)
//! - device (traits that connect devices to the registry that owns them)
//! - error (shared error types)

pub mod device;
pub mod error;
pub mod snapshot;
pub mod value;

// Re-exports: nice ergonomics for downstream crates
pub use device::{ApplySensor, DeviceRegistrar, PublishActuator};
pub use error::{CoreError, CoreResult};
pub use snapshot::{SEND_SENSOR_DATA, Snapshot};
pub use value::{DeviceScalar, ValueKind};
