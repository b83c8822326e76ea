//! Shared ECU State
//!
//! The one concurrently shared mutable store in the monitor: latest and
//! previous sensor values, the global sample counter, cycle latency, a
//! bounded error ring and the LCD layout. Written only by the coordinator,
//! read by any number of presentation workers through snapshots.

mod ring;
mod state;

pub use ring::ErrorRing;
pub use state::{EcuSnapshot, LcdLayout, LcdPage, SensorValue, SharedEcuState};
