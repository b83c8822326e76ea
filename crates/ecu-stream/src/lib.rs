//! ECU Datastream Primitives
//!
//! This crate provides the sensor descriptors, sample events and the serial
//! link capability used to talk to Magneti Marelli ECU modules (as fitted to
//! the Ford Sierra/Escort Cosworth). The wire-level datastream framing is
//! not yet implemented; `SerialLink` opens the port and documents the
//! remaining steps, and `MockLink` stands in for tests.

mod event;
mod link;
mod sensor;

pub use event::{error_code, SampleEvent};
pub use link::{EcuLink, LinkError, MockLink, SerialLink};
pub use sensor::{RegistryError, Sensor, SensorRegistry};
