//! Bridge configuration.
//!
//! Loaded once at startup and never mutated afterwards. Defaults match the
//! reference wiring: MCP2515 hat with CS on D9 and INT on D2, the sensor bus
//! on D4, a single 12-bit sensor, 500 kbit/s CAN, one frame every 100 ms.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Compile-time bound on registry slots.
pub const MAX_SENSORS: usize = 8;

pub const DEFAULT_SPI_CS_PIN: u8 = 9;
pub const DEFAULT_CAN_INT_PIN: u8 = 2;
pub const DEFAULT_ONE_WIRE_PIN: u8 = 4;
pub const DEFAULT_SENSOR_CAPACITY: usize = 1;
pub const DEFAULT_RESOLUTION_BITS: u8 = 12;
pub const DEFAULT_CAN_BITRATE: u32 = 500_000;
pub const DEFAULT_CYCLE_PERIOD_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub spi_cs_pin: u8,
    pub can_int_pin: u8,
    pub one_wire_pin: u8,
    /// Registry capacity `N`; discovery fails when the bus reports more.
    pub sensor_capacity: usize,
    /// Conversion resolution programmed into every sensor.
    pub resolution_bits: u8,
    pub can_bitrate: u32,
    /// Wait applied after each send; the cycle is not drift-compensated.
    pub cycle_period_ms: u64,
    pub discovery_retry: RetryPolicy,
    pub bus_init_retry: RetryPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            spi_cs_pin: DEFAULT_SPI_CS_PIN,
            can_int_pin: DEFAULT_CAN_INT_PIN,
            one_wire_pin: DEFAULT_ONE_WIRE_PIN,
            sensor_capacity: DEFAULT_SENSOR_CAPACITY,
            resolution_bits: DEFAULT_RESOLUTION_BITS,
            can_bitrate: DEFAULT_CAN_BITRATE,
            cycle_period_ms: DEFAULT_CYCLE_PERIOD_MS,
            discovery_retry: RetryPolicy::unbounded(1000),
            bus_init_retry: RetryPolicy::unbounded(100),
        }
    }
}

impl BridgeConfig {
    /// Load and validate a JSON config file; absent keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor_capacity == 0 {
            return Err(ConfigError::Invalid("sensor_capacity must be at least 1"));
        }
        if self.sensor_capacity > MAX_SENSORS {
            return Err(ConfigError::Invalid("sensor_capacity exceeds MAX_SENSORS"));
        }
        // DS18B20 family supports 9..=12 bit conversions
        if !(9..=12).contains(&self.resolution_bits) {
            return Err(ConfigError::Invalid("resolution_bits must be 9..=12"));
        }
        if self.can_bitrate == 0 {
            return Err(ConfigError::Invalid("can_bitrate must be nonzero"));
        }
        Ok(())
    }
}
