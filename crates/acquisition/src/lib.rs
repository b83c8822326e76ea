//! Sensor Acquisition Scheduling
//!
//! The acquisition core of the monitor: per-sensor polling timers over an
//! abstract ECU link, with a synthetic demo generator for running without
//! hardware. Each sensor cycles idle -> due -> sampled independently at its
//! own refresh rate inside a single bounded-rate polling loop.

mod demo;
mod scheduler;

pub use demo::{DemoBank, DemoSequence};
pub use scheduler::{AcquisitionScheduler, SchedulerConfig};
