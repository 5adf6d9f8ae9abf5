//! # Thermolink
//!
//! An embedded-style telemetry bridge: temperature sensors on a single-wire
//! bus in, fixed 8-byte CAN frames out.
//!
//! ## Features
//!
//! - **Startup discovery**: sensors are enumerated once and bound to stable
//!   slot indices for the life of the process
//! - **Fault-tolerant sampling**: a disconnected sensor keeps its last valid
//!   reading; the cycle never aborts
//! - **Validated encoding**: overflow-checked fixed-point temperature plus a
//!   base-100 ripple cycle counter in every frame
//! - **Hardware-free testing**: both buses sit behind capability traits with
//!   scriptable in-process mocks
//! - **Embedded-friendly**: bounded storage, no heap growth in the hot path
//!
//! ## Quick Start
//!
//! ```rust
//! use thermolink::bus::mock::{MockCanBus, MockSensorBus};
//! use thermolink::bus::SensorAddress;
//! use thermolink::{BridgeConfig, TelemetryBridge};
//!
//! let mut sensor_bus = MockSensorBus::new();
//! sensor_bus.add_device(SensorAddress([0x28, 0, 0, 0, 0, 0, 0, 1]), 21.0);
//!
//! let mut config = BridgeConfig::default();
//! config.cycle_period_ms = 0;
//!
//! let mut bridge = TelemetryBridge::new(config, sensor_bus, MockCanBus::new());
//! bridge.run_cycles(3).unwrap();
//! assert_eq!(bridge.stats().frames_sent, 3);
//! ```
//!
//! ## Architecture
//!
//! - [`bus`] - capability traits for both buses, plus the mocks
//! - [`registry`] - discovery and the address-to-slot binding
//! - [`sampler`] - periodic conversion and readback
//! - [`frame`] - the 8-byte payload layout and ripple counter
//! - [`transmitter`] - CAN bring-up and send accounting
//! - [`bridge`] - the state machine and run loop tying it together

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod bridge;
pub mod bus;
pub mod config;
pub mod frame;
pub mod registry;
pub mod retry;
pub mod sampler;
pub mod transmitter;

// Re-export main public types for convenience
pub use bridge::{BridgeError, BridgeState, BridgeStats, TelemetryBridge};
pub use config::BridgeConfig;
pub use frame::{FrameEncoder, RippleCounter};
pub use registry::DeviceRegistry;
pub use sampler::TemperatureSampler;
pub use transmitter::Transmitter;
