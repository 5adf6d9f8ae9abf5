//! Periodic temperature sampling.
//!
//! One broadcast conversion request covers every sensor on the bus, then
//! each slot is read back by address. A disconnected read never overwrites a
//! slot's last valid value; it is reported in the cycle's [`SampleReport`]
//! and the cycle carries on.

use crate::bus::{is_disconnected, SensorBus};
use crate::config::MAX_SENSORS;
use crate::registry::DeviceRegistry;
use heapless::Vec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Non-fatal per-slot diagnostic raised during one sampling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleEvent {
    /// The read returned the disconnected sentinel; the previous value stands.
    SensorDisconnected { index: usize },
    /// The slot was never resolved at discovery and is skipped.
    SlotUnresolved { index: usize },
}

/// Outcome of one sampling pass. Advisory only; sampling never fails.
#[derive(Debug, Default, Clone)]
pub struct SampleReport {
    pub events: Vec<SampleEvent, MAX_SENSORS>,
    pub valid_reads: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SamplerStats {
    pub cycles: u32,
    pub valid_reads: u32,
    pub disconnected_reads: u32,
}

#[derive(Debug, Default)]
pub struct TemperatureSampler {
    stats: SamplerStats,
}

impl TemperatureSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample every registered slot in place.
    pub fn sample<B: SensorBus>(
        &mut self,
        registry: &mut DeviceRegistry,
        bus: &mut B,
    ) -> SampleReport {
        // every sensor on the bus converts off this one broadcast
        bus.request_conversion_all();

        let mut report = SampleReport::default();
        for slot in registry.slots_mut() {
            if !slot.resolved {
                let _ = report
                    .events
                    .push(SampleEvent::SlotUnresolved { index: slot.index });
                continue;
            }

            let reading = bus.read_celsius(&slot.address);
            if is_disconnected(reading) {
                warn!(
                    "sensor {} at {} did not answer, keeping last reading",
                    slot.index, slot.address
                );
                self.stats.disconnected_reads += 1;
                let _ = report
                    .events
                    .push(SampleEvent::SensorDisconnected { index: slot.index });
                continue;
            }

            slot.last_temp_c = Some(reading);
            report.valid_reads += 1;
            self.stats.valid_reads += 1;
            debug!("sensor {}: {:.3} C", slot.index, reading);
        }

        self.stats.cycles += 1;
        report
    }

    pub fn stats(&self) -> &SamplerStats {
        &self.stats
    }
}
