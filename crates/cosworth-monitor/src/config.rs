//! Monitor Configuration
//!
//! All tunables consumed once at startup: the sensor list, refresh and tick
//! intervals, demo parameters, serial settings and per-worker enable flags.
//! Values come from defaults, an optional `cosworth.toml` and `COSWORTH_*`
//! environment overrides, in that order.

use ecu_state::{LcdLayout, LcdPage};
use ecu_stream::{RegistryError, Sensor, SensorRegistry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serial adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device path
    pub device: String,
    /// Baud rate; the Weber Marelli datastream runs at 1952 baud
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud: 1952,
        }
    }
}

/// Which optional workers start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Terminal dashboard
    pub console: bool,
    /// Keyboard button source (GPIO stand-in)
    pub buttons: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            console: true,
            buttons: true,
        }
    }
}

/// Top-level monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Monitored sensors, in display order
    pub sensors: Vec<Sensor>,
    /// Steps in each half of the demo ramp
    pub demo_steps: u32,
    /// Capacity of the error-code ring
    pub max_errors: usize,
    /// Milliseconds between acquisition ticks
    pub acquisition_tick_ms: u64,
    /// Milliseconds between coordinator ticks
    pub coordinator_tick_ms: u64,
    /// Milliseconds between display refreshes
    pub display_tick_ms: u64,
    /// Depth of the sample queue between acquisition and coordinator
    pub sample_queue_depth: usize,
    /// Start in demo mode
    pub demo: bool,
    pub serial: SerialConfig,
    pub workers: WorkerConfig,
    pub lcd: LcdLayout,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sensors: default_sensors(),
            demo_steps: 10,
            max_errors: 16,
            acquisition_tick_ms: 5,
            coordinator_tick_ms: 10,
            display_tick_ms: 500,
            sample_queue_depth: 256,
            demo: true,
            serial: SerialConfig::default(),
            workers: WorkerConfig::default(),
            lcd: default_lcd(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from `cosworth.toml` and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("cosworth").required(false))
            .add_source(config::Environment::with_prefix("COSWORTH").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Build the validated sensor registry; fatal on bad sensor settings
    pub fn registry(&self) -> Result<SensorRegistry, RegistryError> {
        SensorRegistry::new(self.sensors.clone())
    }

    pub fn acquisition_tick(&self) -> Duration {
        Duration::from_millis(self.acquisition_tick_ms)
    }

    pub fn coordinator_tick(&self) -> Duration {
        Duration::from_millis(self.coordinator_tick_ms)
    }

    pub fn display_tick(&self) -> Duration {
        Duration::from_millis(self.display_tick_ms)
    }
}

/// The stock Cosworth YB sensor set read from the Marelli datastream
fn default_sensors() -> Vec<Sensor> {
    vec![
        Sensor {
            id: "rpm".to_string(),
            label: "Engine speed".to_string(),
            unit: "rpm".to_string(),
            refresh: 0.05,
            min_value: 0.0,
            max_value: 8000.0,
        },
        Sensor {
            id: "map".to_string(),
            label: "Boost pressure".to_string(),
            unit: "mbar".to_string(),
            refresh: 0.1,
            min_value: 0.0,
            max_value: 2500.0,
        },
        Sensor {
            id: "tps".to_string(),
            label: "Throttle position".to_string(),
            unit: "deg".to_string(),
            refresh: 0.1,
            min_value: 0.0,
            max_value: 90.0,
        },
        Sensor {
            id: "iat".to_string(),
            label: "Inlet air temp".to_string(),
            unit: "C".to_string(),
            refresh: 0.5,
            min_value: -40.0,
            max_value: 60.0,
        },
        Sensor {
            id: "ect".to_string(),
            label: "Coolant temp".to_string(),
            unit: "C".to_string(),
            refresh: 0.5,
            min_value: -40.0,
            max_value: 120.0,
        },
        Sensor {
            id: "bat".to_string(),
            label: "Battery voltage".to_string(),
            unit: "V".to_string(),
            refresh: 1.0,
            min_value: 0.0,
            max_value: 16.0,
        },
    ]
}

/// Default 20x4 Matrix Orbital page layout
fn default_lcd() -> LcdLayout {
    LcdLayout {
        pages: vec![
            LcdPage {
                name: "engine".to_string(),
                slots: vec![
                    "rpm".to_string(),
                    "map".to_string(),
                    "tps".to_string(),
                    "iat".to_string(),
                ],
            },
            LcdPage {
                name: "health".to_string(),
                slots: vec![
                    "ect".to_string(),
                    "iat".to_string(),
                    "bat".to_string(),
                    "map".to_string(),
                ],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds_valid_registry() {
        let config = MonitorConfig::default();
        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 6);
        // RPM refreshes fastest, so it paces the sample counter.
        assert_eq!(registry.pacer_id(), "rpm");
    }

    #[test]
    fn test_default_lcd_pages_reference_known_sensors() {
        let config = MonitorConfig::default();
        let registry = config.registry().unwrap();
        for page in &config.lcd.pages {
            for slot in &page.slots {
                assert!(registry.get(slot).is_some(), "unknown sensor {slot}");
            }
        }
    }

    #[test]
    fn test_bad_sensor_config_is_fatal() {
        let mut config = MonitorConfig::default();
        config.sensors[0].refresh = 0.0;
        assert!(config.registry().is_err());
    }
}
