//! Shared State Store Implementation

use crate::ring::ErrorRing;
use ecu_stream::SensorRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// One LCD page: display slots mapped to sensor ids, top-left first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LcdPage {
    pub name: String,
    pub slots: Vec<String>,
}

/// Layout configuration for a character-mode LCD worker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LcdLayout {
    pub pages: Vec<LcdPage>,
}

/// Latest and previous reading for one sensor
///
/// Sensors that have never been sampled keep both fields at `None`; values
/// are never fabricated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorValue {
    pub current: Option<f64>,
    pub previous: Option<f64>,
}

#[derive(Debug, Clone)]
struct EcuState {
    values: HashMap<String, SensorValue>,
    sample_counter: u64,
    cycle_latency: f64,
    errors: ErrorRing,
    lcd: LcdLayout,
}

/// Point-in-time copy of the store, handed to presentation workers
#[derive(Debug, Clone, Serialize)]
pub struct EcuSnapshot {
    pub values: HashMap<String, SensorValue>,
    pub sample_counter: u64,
    /// Wall time of the last pacing cycle, in seconds
    pub cycle_latency: f64,
    /// Error codes from oldest to newest
    pub errors: Vec<u32>,
    pub lcd: LcdLayout,
}

/// Shared handle to the ECU state
///
/// One writer (the coordinator) and any number of readers. Every mutation
/// happens inside a single write section, so a reader can never observe a
/// half-updated current/previous pair.
#[derive(Clone)]
pub struct SharedEcuState {
    inner: Arc<RwLock<EcuState>>,
}

impl SharedEcuState {
    /// Create the store with every registered sensor pre-seeded at `None`
    pub fn new(registry: &SensorRegistry, max_errors: usize, lcd: LcdLayout) -> Self {
        let values = registry
            .sensors()
            .iter()
            .map(|sensor| (sensor.id.clone(), SensorValue::default()))
            .collect();

        Self {
            inner: Arc::new(RwLock::new(EcuState {
                values,
                sample_counter: 0,
                cycle_latency: 0.0,
                errors: ErrorRing::new(max_errors),
                lcd,
            })),
        }
    }

    /// Install a new reading for a sensor
    ///
    /// Moves the current value to previous, installs the new current value
    /// and refreshes the global counter and cycle latency, all atomically.
    pub async fn set_sample(&self, sensor_id: &str, value: f64, counter: u64, cycle_latency: f64) {
        let mut state = self.inner.write().await;
        let entry = state.values.entry(sensor_id.to_string()).or_default();
        entry.previous = entry.current;
        entry.current = Some(value);
        state.sample_counter = counter;
        state.cycle_latency = cycle_latency;
    }

    /// Refresh the global sample counter without a sample payload
    pub async fn set_counter(&self, counter: u64) {
        self.inner.write().await.sample_counter = counter;
    }

    /// Record an error code in the bounded ring
    pub async fn record_error(&self, code: u32) {
        debug!(code, "recording ECU error");
        self.inner.write().await.errors.push(code);
    }

    /// Consistent reading for one sensor
    pub async fn sensor(&self, sensor_id: &str) -> Option<SensorValue> {
        self.inner.read().await.values.get(sensor_id).copied()
    }

    /// Consistent point-in-time copy of the whole store
    pub async fn snapshot(&self) -> EcuSnapshot {
        let state = self.inner.read().await;
        EcuSnapshot {
            values: state.values.clone(),
            sample_counter: state.sample_counter,
            cycle_latency: state.cycle_latency,
            errors: state.errors.codes(),
            lcd: state.lcd.clone(),
        }
    }
}
