//! ECU Link Capability
//!
//! The abstract serial-link capability the acquisition loop drives, plus the
//! two implementations: `SerialLink` for a physical adapter and `MockLink`
//! for tests. Reads are synchronous and fast; an implementation must never
//! block past a short timeout or the whole sampler stalls.

use crate::sensor::Sensor;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Errors that can occur on the ECU link
#[derive(Debug, Error)]
pub enum LinkError {
    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(String),

    /// The serial port has not been opened
    #[error("serial port is not open")]
    PortClosed,

    /// Timeout waiting for the ECU to answer
    #[error("timeout waiting for ECU response after {0}ms")]
    Timeout(u64),

    /// The ECU answered with something unparsable
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A sensor read failed
    #[error("read failed for sensor {0}")]
    ReadFailed(String),
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Serial(err.to_string())
    }
}

/// Abstract link to the ECU datastream
///
/// The acquisition loop treats all of these as opaque and tolerates
/// `is_connected() == false` indefinitely.
pub trait EcuLink {
    /// Send a raw request frame; returns the adapter's immediate reply when
    /// one is available.
    fn write(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, LinkError>;

    /// Read one decoded value for a sensor, or `None` when no value is
    /// available this instant.
    fn read(&mut self, sensor: &Sensor) -> Result<Option<f64>, LinkError>;

    /// Whether a live connection to the ECU is established
    fn is_connected(&self) -> bool;

    /// Reset the link; behavior is transport-defined
    fn reset(&mut self) -> Result<(), LinkError>;
}

/// Serial link to a Magneti Marelli ECU
///
/// Opens the physical port via tokio-serial. The datastream handshake and
/// frame decoding are not implemented yet, so the link reports disconnected
/// and reads yield no values until they are.
pub struct SerialLink {
    /// Serial device path (e.g. "/dev/ttyUSB0")
    device: String,
    /// Baud rate; the Weber Marelli datastream runs at 1952 baud
    baud: u32,
    port: Option<tokio_serial::SerialStream>,
    /// Flips true once the datastream handshake is implemented
    connected: bool,
}

impl SerialLink {
    /// Create a link for the given device; the port is not opened yet
    pub fn new(device: &str, baud: u32) -> Self {
        Self {
            device: device.to_string(),
            baud,
            port: None,
            connected: false,
        }
    }

    /// Open the serial port
    ///
    /// Must be called from within a tokio runtime. Failure leaves the link
    /// disconnected; the caller decides whether that is fatal.
    pub fn open(&mut self) -> Result<(), LinkError> {
        info!("Opening serial device {} at {} baud", self.device, self.baud);

        match tokio_serial::new(self.device.as_str(), self.baud).open_native_async() {
            Ok(stream) => {
                self.port = Some(stream);
                info!("Serial port {} open", self.device);
                Ok(())
            }
            Err(e) => {
                self.port = None;
                Err(LinkError::Serial(e.to_string()))
            }
        }
    }

    /// Whether the underlying port is open (not the same as connected)
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl EcuLink for SerialLink {
    fn write(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, LinkError> {
        if self.port.is_none() {
            return Err(LinkError::PortClosed);
        }

        debug!("Sending {} byte command to ECU", frame.len());

        // In a real implementation, we would:
        // 1. Frame the request per the Marelli datastream format
        // 2. Write it to the port and flush
        // 3. Read the reply until the inter-byte gap expires
        // The framing is undocumented, so no bytes leave the port yet.

        Ok(None)
    }

    fn read(&mut self, sensor: &Sensor) -> Result<Option<f64>, LinkError> {
        if !self.connected {
            return Ok(None);
        }

        debug!("Reading sensor {}", sensor.id);

        // In a real implementation, we would:
        // 1. Send the datastream request byte for this sensor
        // 2. Read the raw response
        // 3. Scale it into the sensor's value range
        Ok(None)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), LinkError> {
        warn!("Resetting serial link to {}", self.device);
        self.port = None;
        self.connected = false;
        self.open()
    }
}

/// Scripted ECU link for testing (no hardware required)
#[derive(Debug, Default)]
pub struct MockLink {
    connected: bool,
    /// Per-sensor scripted values, consumed front-to-back
    values: HashMap<String, VecDeque<f64>>,
    /// Canned reply handed back on the next write
    reply: Option<Vec<u8>>,
    /// Every frame written, in order
    writes: Vec<Vec<u8>>,
    resets: u32,
    fail_reads: bool,
}

impl MockLink {
    /// A link that reports an established connection
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// A link that stays disconnected, like an adapter with the ignition off
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Queue a value to be returned for a sensor
    pub fn push_value(&mut self, sensor_id: &str, value: f64) {
        self.values
            .entry(sensor_id.to_string())
            .or_default()
            .push_back(value);
    }

    /// Set the reply returned by the next write
    pub fn set_reply(&mut self, bytes: Vec<u8>) {
        self.reply = Some(bytes);
    }

    /// Make every read fail
    pub fn fail_reads(&mut self) {
        self.fail_reads = true;
    }

    /// Frames written so far
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// How many times the link was reset
    pub fn reset_count(&self) -> u32 {
        self.resets
    }
}

impl EcuLink for MockLink {
    fn write(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, LinkError> {
        self.writes.push(frame.to_vec());
        Ok(self.reply.take())
    }

    fn read(&mut self, sensor: &Sensor) -> Result<Option<f64>, LinkError> {
        if self.fail_reads {
            return Err(LinkError::ReadFailed(sensor.id.clone()));
        }
        Ok(self
            .values
            .get_mut(&sensor.id)
            .and_then(|queue| queue.pop_front()))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), LinkError> {
        self.resets += 1;
        Ok(())
    }
}
