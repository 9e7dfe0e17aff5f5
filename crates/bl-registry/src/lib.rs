//! Device registries for boxline.
//!
//! A [`Factory`] is the root registry: it owns the link to the peer, routes
//! every inbound snapshot to its sensors and publishes its own actuators. A
//! [`Station`] is a scoped registry on top of a factory. It batches and
//! flushes its own actuators, but its sensors join the factory's single
//! inbound stream.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use bl_devices::Emitter;
//! use bl_link::{LinkResult, Transport};
//! use bl_registry::{Factory, Station};
//!
//! #[derive(Clone, Default)]
//! struct Recorder(Arc<Mutex<Vec<String>>>);
//!
//! impl Transport for Recorder {
//!     fn send(&self, message: &str) -> LinkResult<()> {
//!         self.0.lock().unwrap().push(message.to_string());
//!         Ok(())
//!     }
//!     fn is_open(&self) -> bool {
//!         true
//!     }
//! }
//!
//! let recorder = Recorder::default();
//! let factory = Factory::new();
//! factory.attach(recorder.clone()).unwrap();
//!
//! let station = Station::new(&factory, "Conveyor");
//! let emitter = Emitter::new(&station, "Emitter");
//! station.publish_changes().unwrap();
//!
//! emitter.set_on(true);
//! station.publish_changes().unwrap();
//! assert_eq!(recorder.0.lock().unwrap().last().unwrap(), r#"{"Emitter":true}"#);
//! ```

pub mod error;
pub mod factory;
pub mod station;

pub use error::{RegistryError, RegistryResult};
pub use factory::{ConnectionState, Factory};
pub use station::Station;
