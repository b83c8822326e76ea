//! Sensor Descriptors and Registry
//!
//! Defines the static description of every monitored sensor and the
//! registry that validates the set at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Static description of one monitored sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    /// Unique sensor id (e.g. "rpm")
    pub id: String,
    /// Human-readable name shown by display workers
    pub label: String,
    /// Display unit (e.g. "mbar")
    pub unit: String,
    /// Seconds between samples; must be positive
    pub refresh: f64,
    /// Lowest value the sensor can report
    pub min_value: f64,
    /// Highest value the sensor can report
    pub max_value: f64,
}

/// Errors raised while building the sensor registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No sensors configured at all
    #[error("no sensors configured")]
    Empty,

    /// Refresh interval is zero, negative or not a number
    #[error("sensor {id}: refresh interval {refresh}s must be positive")]
    BadRefresh { id: String, refresh: f64 },

    /// Value range is inverted or not a number
    #[error("sensor {id}: min {min} exceeds max {max}")]
    BadRange { id: String, min: f64, max: f64 },

    /// Two sensors share the same id
    #[error("duplicate sensor id: {0}")]
    DuplicateId(String),
}

/// Ordered, validated set of monitored sensors
///
/// Built once at startup and immutable afterwards. Construction fails fast
/// on a bad refresh interval, an inverted value range or a duplicate id.
#[derive(Debug, Clone)]
pub struct SensorRegistry {
    sensors: Vec<Sensor>,
    pacer_id: String,
}

impl SensorRegistry {
    /// Validate the sensor list and build the registry
    pub fn new(sensors: Vec<Sensor>) -> Result<Self, RegistryError> {
        if sensors.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for sensor in &sensors {
            if !(sensor.refresh > 0.0) {
                return Err(RegistryError::BadRefresh {
                    id: sensor.id.clone(),
                    refresh: sensor.refresh,
                });
            }
            if !(sensor.min_value <= sensor.max_value) {
                return Err(RegistryError::BadRange {
                    id: sensor.id.clone(),
                    min: sensor.min_value,
                    max: sensor.max_value,
                });
            }
            if !seen.insert(sensor.id.as_str()) {
                return Err(RegistryError::DuplicateId(sensor.id.clone()));
            }
        }

        // The fastest-refreshing sensor paces the global sample counter.
        // Strict comparison keeps the first sensor in registry order on ties.
        let mut pacer = &sensors[0];
        for sensor in &sensors[1..] {
            if sensor.refresh < pacer.refresh {
                pacer = sensor;
            }
        }
        let pacer_id = pacer.id.clone();

        Ok(Self { sensors, pacer_id })
    }

    /// All sensors in registry order
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Look up a sensor by id
    pub fn get(&self, id: &str) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.id == id)
    }

    /// Id of the sensor that paces the sample counter
    pub fn pacer_id(&self) -> &str {
        &self.pacer_id
    }

    /// Number of registered sensors
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// True when no sensors are registered (never, post-construction)
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
