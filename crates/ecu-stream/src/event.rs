//! Datastream Events
//!
//! Messages produced by the acquisition loop and consumed exactly once by
//! the coordinator.

use serde::{Deserialize, Serialize};

/// Error codes recorded in the shared error ring
pub mod error_code {
    /// A raw command could not be written to the link
    pub const LINK_WRITE: u32 = 0x01;
    /// A sensor read failed on the link
    pub const LINK_READ: u32 = 0x02;
    /// A link reset request failed
    pub const LINK_RESET: u32 = 0x03;
}

/// One message from the acquisition loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleEvent {
    /// A decoded sensor reading
    Data {
        sensor_id: String,
        value: f64,
        /// Global sample counter at the time of the reading
        counter: u64,
        /// Wall time of the most recent pacing cycle, in seconds
        cycle_latency: f64,
    },

    /// A link fault, attributed to a sensor when one was involved
    Error {
        sensor_id: Option<String>,
        /// One of the [`error_code`] constants
        code: u32,
        counter: u64,
    },

    /// Raw reply bytes from the ECU; undecoded until the wire format lands
    Reply { bytes: Vec<u8> },
}
