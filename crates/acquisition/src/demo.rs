//! Synthetic Demo Signals
//!
//! Precomputed triangle-wave value tables substituted for live reads when
//! no ECU is attached.

use ecu_stream::{Sensor, SensorRegistry};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Precomputed demo ramp for one sensor, with a wrapping cursor
///
/// The table holds `2 * steps` values: `steps` ascending from `min_value`,
/// then `steps` descending back to it. The ascent steps by
/// `max_value / steps`, not `(max_value - min_value) / steps`, so a sensor
/// with a non-zero floor peaks below its configured maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoSequence {
    values: Vec<f64>,
    cursor: usize,
}

impl DemoSequence {
    /// Build the ramp table for a sensor
    pub fn generate(sensor: &Sensor, steps: u32) -> Self {
        let steps = steps.max(1) as usize;
        let step_size = sensor.max_value / steps as f64;

        let mut values = Vec::with_capacity(2 * steps);
        let mut value = sensor.min_value;
        for _ in 0..steps {
            values.push(value);
            value += step_size;
        }
        for _ in 0..steps {
            value -= step_size;
            values.push(value);
        }

        debug!(sensor = %sensor.id, len = values.len(), "generated demo ramp");
        Self { values, cursor: 0 }
    }

    /// Emit the value at the cursor, then advance and wrap
    pub fn next_value(&mut self) -> f64 {
        let value = self.values[self.cursor];
        self.cursor = (self.cursor + 1) % self.values.len();
        value
    }

    /// Number of values in the table (`2 * steps`)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current cursor position
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The full value table
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// One demo sequence per registered sensor
///
/// Regenerated from scratch whenever demo mode is (re)enabled, which resets
/// every cursor to the start of its ramp.
#[derive(Debug, Clone)]
pub struct DemoBank {
    sequences: HashMap<String, DemoSequence>,
}

impl DemoBank {
    /// Build fresh sequences for every sensor in the registry
    pub fn generate(registry: &SensorRegistry, steps: u32) -> Self {
        warn!("Using DEMO data");
        let sequences = registry
            .sensors()
            .iter()
            .map(|sensor| (sensor.id.clone(), DemoSequence::generate(sensor, steps)))
            .collect();
        Self { sequences }
    }

    /// Next demo value for a sensor, advancing its cursor
    pub fn next_value(&mut self, sensor_id: &str) -> Option<f64> {
        self.sequences
            .get_mut(sensor_id)
            .map(DemoSequence::next_value)
    }

    /// Inspect a sensor's sequence
    pub fn sequence(&self, sensor_id: &str) -> Option<&DemoSequence> {
        self.sequences.get(sensor_id)
    }
}
