//! The control loop that ties the pipeline together.
//!
//! [`TelemetryBridge`] owns both buses and all mutable session state (the
//! registry, the rolling counter, the stats) and drives the state machine
//! `Init -> Discovering -> BusInit -> Running`. Everything is
//! single-threaded and blocking: within a running cycle, sample always
//! precedes encode, which always precedes send.

use crate::bus::{CanBus, SensorBus};
use crate::config::BridgeConfig;
use crate::frame::{FrameEncoder, RippleCounter};
use crate::registry::{DeviceRegistry, DiscoveryError};
use crate::retry::run_with_retry;
use crate::sampler::{SampleEvent, TemperatureSampler};
use crate::transmitter::{BusInitError, Transmitter};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeState {
    Init,
    Discovering,
    BusInit,
    /// Terminal looping state; there is no exit short of process teardown.
    Running,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BridgeStats {
    pub cycles: u64,
    pub frames_sent: u32,
    pub send_failures: u32,
    pub encode_failures: u32,
    pub disconnected_reads: u32,
}

/// Raised only when a bounded retry policy is exhausted during bring-up.
/// Once the bridge is running, per-cycle failures are diagnostics, not
/// errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("sensor discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("CAN bring-up failed: {0}")]
    BusInit(#[from] BusInitError),
}

pub struct TelemetryBridge<S: SensorBus, C: CanBus> {
    sensor_bus: S,
    can_bus: C,
    config: BridgeConfig,
    state: BridgeState,
    registry: Option<DeviceRegistry>,
    counter: RippleCounter,
    sampler: TemperatureSampler,
    transmitter: Transmitter,
    stats: BridgeStats,
}

impl<S: SensorBus, C: CanBus> TelemetryBridge<S, C> {
    pub fn new(config: BridgeConfig, sensor_bus: S, can_bus: C) -> Self {
        Self {
            sensor_bus,
            can_bus,
            config,
            state: BridgeState::Init,
            registry: None,
            counter: RippleCounter::new(),
            sampler: TemperatureSampler::new(),
            transmitter: Transmitter::new(),
            stats: BridgeStats::default(),
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn counter(&self) -> RippleCounter {
        self.counter
    }

    pub fn registry(&self) -> Option<&DeviceRegistry> {
        self.registry.as_ref()
    }

    pub fn sensor_bus_mut(&mut self) -> &mut S {
        &mut self.sensor_bus
    }

    pub fn can_bus(&self) -> &C {
        &self.can_bus
    }

    pub fn can_bus_mut(&mut self) -> &mut C {
        &mut self.can_bus
    }

    /// Advance the state machine by one step.
    ///
    /// In `Running` a step is one full `{sample -> encode -> send}` cycle;
    /// the inter-cycle wait belongs to [`run`](Self::run) and
    /// [`run_cycles`](Self::run_cycles).
    pub fn step(&mut self) -> Result<(), BridgeError> {
        match self.state {
            BridgeState::Init => {
                info!(
                    "bridge starting: 1-wire on pin {}, CAN CS on pin {}, INT on pin {}",
                    self.config.one_wire_pin, self.config.spi_cs_pin, self.config.can_int_pin
                );
                self.state = BridgeState::Discovering;
                Ok(())
            }
            BridgeState::Discovering => {
                let policy = self.config.discovery_retry;
                let capacity = self.config.sensor_capacity;
                let resolution_bits = self.config.resolution_bits;
                let registry = run_with_retry("sensor discovery", &policy, || {
                    DeviceRegistry::discover(&mut self.sensor_bus, capacity, resolution_bits)
                })?;
                info!("discovery complete: {} slot(s) bound", registry.len());
                self.registry = Some(registry);
                self.state = BridgeState::BusInit;
                Ok(())
            }
            BridgeState::BusInit => {
                Transmitter::init_bus(
                    &mut self.can_bus,
                    self.config.can_bitrate,
                    &self.config.bus_init_retry,
                )?;
                self.state = BridgeState::Running;
                Ok(())
            }
            BridgeState::Running => {
                self.run_cycle();
                Ok(())
            }
        }
    }

    /// Bring the bridge up and loop forever at the configured cadence.
    ///
    /// Returns only when a bounded bring-up policy is exhausted. The wait is
    /// a plain blocking sleep after send, so the actual period drifts upward
    /// by however long the cycle itself took.
    pub fn run(&mut self) -> Result<(), BridgeError> {
        loop {
            self.step()?;
            if self.state == BridgeState::Running && self.config.cycle_period_ms > 0 {
                std::thread::sleep(std::time::Duration::from_millis(self.config.cycle_period_ms));
            }
        }
    }

    /// Bring the bridge up and run a fixed number of telemetry cycles.
    pub fn run_cycles(&mut self, cycles: u64) -> Result<(), BridgeError> {
        while self.state != BridgeState::Running {
            self.step()?;
        }
        for _ in 0..cycles {
            self.step()?;
            if self.config.cycle_period_ms > 0 {
                std::thread::sleep(std::time::Duration::from_millis(self.config.cycle_period_ms));
            }
        }
        Ok(())
    }

    fn run_cycle(&mut self) {
        let Some(registry) = self.registry.as_mut() else {
            // unreachable through step(), but a cycle without a registry is a no-op
            return;
        };

        let report = self.sampler.sample(registry, &mut self.sensor_bus);
        for event in &report.events {
            if let SampleEvent::SensorDisconnected { .. } = event {
                self.stats.disconnected_reads += 1;
            }
        }

        match FrameEncoder::encode(registry, self.counter) {
            Ok((frame, next_counter)) => {
                // the counter advances with the encoded frame, sent or not
                self.counter = next_counter;
                match self.transmitter.send(&mut self.can_bus, &frame) {
                    Ok(()) => self.stats.frames_sent += 1,
                    Err(err) => {
                        // one lost frame is tolerable; halting the loop is not
                        warn!("telemetry frame dropped: {err}");
                        self.stats.send_failures += 1;
                    }
                }
            }
            Err(err) => {
                warn!("skipping send this cycle: {err}");
                self.stats.encode_failures += 1;
            }
        }

        self.stats.cycles += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{MockCanBus, MockSensorBus};
    use crate::bus::SensorAddress;
    use crate::retry::RetryPolicy;

    fn address(tail: u8) -> SensorAddress {
        SensorAddress([0x28, 0, 0, 0, 0, 0, 0, tail])
    }

    fn test_config() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.cycle_period_ms = 0;
        config.discovery_retry = RetryPolicy::bounded(2, 0);
        config.bus_init_retry = RetryPolicy::bounded(2, 0);
        config
    }

    fn single_sensor_bridge(temp_c: f32) -> TelemetryBridge<MockSensorBus, MockCanBus> {
        let mut sensor_bus = MockSensorBus::new();
        sensor_bus.add_device(address(1), temp_c);
        TelemetryBridge::new(test_config(), sensor_bus, MockCanBus::new())
    }

    #[test]
    fn test_state_machine_sequence() {
        let mut bridge = single_sensor_bridge(21.0);
        assert_eq!(bridge.state(), BridgeState::Init);

        bridge.step().unwrap();
        assert_eq!(bridge.state(), BridgeState::Discovering);

        bridge.step().unwrap();
        assert_eq!(bridge.state(), BridgeState::BusInit);
        assert_eq!(bridge.registry().unwrap().len(), 1);

        bridge.step().unwrap();
        assert_eq!(bridge.state(), BridgeState::Running);
        assert!(bridge.can_bus().is_initialized());

        bridge.step().unwrap();
        assert_eq!(bridge.state(), BridgeState::Running);
        assert_eq!(bridge.stats().cycles, 1);
    }

    #[test]
    fn test_exhausted_discovery_policy_is_fatal() {
        let sensor_bus = MockSensorBus::new(); // nothing on the bus
        let mut bridge = TelemetryBridge::new(test_config(), sensor_bus, MockCanBus::new());

        bridge.step().unwrap();
        let err = bridge.step().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Discovery(DiscoveryError::NoDevicesFound)
        ));
        assert_eq!(bridge.state(), BridgeState::Discovering);
    }

    #[test]
    fn test_exhausted_bus_init_policy_is_fatal() {
        let mut bridge = single_sensor_bridge(21.0);
        bridge.can_bus_mut().fail_init_times(5);

        bridge.step().unwrap();
        bridge.step().unwrap();
        let err = bridge.step().unwrap_err();
        assert!(matches!(err, BridgeError::BusInit(_)));
        assert_eq!(bridge.state(), BridgeState::BusInit);
    }

    #[test]
    fn test_send_failure_does_not_stop_the_loop() {
        let mut bridge = single_sensor_bridge(21.0);
        bridge.run_cycles(0).unwrap();

        bridge.can_bus_mut().fail_next_sends(1);
        bridge.step().unwrap();
        bridge.step().unwrap();

        assert_eq!(bridge.stats().cycles, 2);
        assert_eq!(bridge.stats().send_failures, 1);
        assert_eq!(bridge.stats().frames_sent, 1);
        // the counter still advanced for the dropped frame
        assert_eq!(bridge.counter().ones, 2);
    }

    #[test]
    fn test_encode_failure_skips_send_and_counter() {
        let mut bridge = single_sensor_bridge(21.0);
        bridge.run_cycles(0).unwrap();

        // disconnect before the very first sample: slot 0 stays unsampled
        bridge.sensor_bus_mut().set_disconnected(&address(1), true);
        bridge.step().unwrap();

        assert_eq!(bridge.stats().encode_failures, 1);
        assert_eq!(bridge.stats().frames_sent, 0);
        assert_eq!(bridge.counter(), RippleCounter::new());
        assert!(bridge.can_bus().sent().is_empty());
    }
}
