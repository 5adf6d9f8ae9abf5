//! Sensor discovery and the slot registry.
//!
//! Discovery runs once at startup: every address the bus reports is bound to
//! the next slot index in bus order, and the registry is immutable from then
//! on. Indices are the stable identity the rest of the pipeline works with;
//! addresses only matter when talking to the bus.

use crate::bus::{SensorAddress, SensorBus, SensorBusError};
use crate::config::MAX_SENSORS;
use heapless::Vec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// One discovered sensor bound to a stable slot index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSlot {
    /// Position assigned at discovery; contiguous from 0, never reassigned.
    pub index: usize,
    pub address: SensorAddress,
    /// Last valid reading; `None` until the first successful sample.
    pub last_temp_c: Option<f32>,
    pub resolution_bits: u8,
    /// False when resolution programming failed at discovery. The index is
    /// still reserved so later slots keep their positions; the sampler skips
    /// unresolved slots.
    pub resolved: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("found {found} sensor(s) but capacity is {capacity}")]
    CapacityExceeded { found: usize, capacity: usize },
    #[error("no sensors found on the bus")]
    NoDevicesFound,
    #[error("sensor bus error: {0}")]
    Bus(#[from] SensorBusError),
}

/// Ordered, fixed-capacity collection of discovered slots.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    slots: Vec<SensorSlot, MAX_SENSORS>,
}

impl DeviceRegistry {
    /// Enumerate the bus and bind every device to a slot.
    ///
    /// Fails without touching device state when the bus reports more devices
    /// than `capacity`, or none at all. A device that refuses resolution
    /// programming keeps its reserved index but is marked unresolved.
    pub fn discover<B: SensorBus>(
        bus: &mut B,
        capacity: usize,
        resolution_bits: u8,
    ) -> Result<Self, DiscoveryError> {
        debug_assert!(
            capacity >= 1 && capacity <= MAX_SENSORS,
            "capacity {capacity} outside 1..={MAX_SENSORS}"
        );

        info!("locating sensors on the bus");
        let addresses = bus.enumerate()?;
        let found = addresses.len();

        if found == 0 {
            return Err(DiscoveryError::NoDevicesFound);
        }
        if found > capacity {
            return Err(DiscoveryError::CapacityExceeded { found, capacity });
        }
        info!("{found} sensor(s) found");

        let mut slots: Vec<SensorSlot, MAX_SENSORS> = Vec::new();
        for (index, address) in addresses.iter().enumerate() {
            let resolved = match bus.set_resolution(address, resolution_bits) {
                Ok(()) => {
                    info!("sensor {index} at {address}: resolution set to {resolution_bits}-bit");
                    true
                }
                Err(err) => {
                    warn!("sensor {index} at {address} left unresolved: {err}");
                    false
                }
            };
            debug_assert!(
                !slots.iter().any(|slot| slot.address == *address),
                "duplicate address {address} reported by the bus"
            );
            // found <= capacity <= MAX_SENSORS, so the push cannot fail
            let _ = slots.push(SensorSlot {
                index,
                address: *address,
                last_temp_c: None,
                resolution_bits,
                resolved,
            });
        }

        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[SensorSlot] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [SensorSlot] {
        &mut self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&SensorSlot> {
        self.slots.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockSensorBus;

    fn address(tail: u8) -> SensorAddress {
        SensorAddress([0x28, 0, 0, 0, 0, 0, 0, tail])
    }

    #[test]
    fn test_discovery_binds_indices_in_bus_order() {
        let mut bus = MockSensorBus::new();
        bus.add_device(address(5), 20.0);
        bus.add_device(address(3), 21.0);
        bus.add_device(address(9), 22.0);

        let registry = DeviceRegistry::discover(&mut bus, 4, 12).unwrap();
        assert_eq!(registry.len(), 3);
        for (expected, slot) in registry.slots().iter().enumerate() {
            assert_eq!(slot.index, expected);
            assert_eq!(slot.last_temp_c, None);
            assert_eq!(slot.resolution_bits, 12);
            assert!(slot.resolved);
        }
        assert_eq!(registry.slot(0).unwrap().address, address(5));
        assert_eq!(registry.slot(1).unwrap().address, address(3));
        assert_eq!(registry.slot(2).unwrap().address, address(9));
    }

    #[test]
    fn test_discovery_programs_resolution_on_every_device() {
        let mut bus = MockSensorBus::new();
        bus.add_device(address(1), 20.0);
        bus.add_device(address(2), 21.0);

        let _registry = DeviceRegistry::discover(&mut bus, 2, 9).unwrap();
        assert_eq!(
            bus.resolution_writes(),
            &[(address(1), 9), (address(2), 9)]
        );
    }

    #[test]
    fn test_discovery_fails_when_capacity_exceeded() {
        let mut bus = MockSensorBus::new();
        bus.add_device(address(1), 20.0);
        bus.add_device(address(2), 21.0);
        bus.add_device(address(3), 22.0);

        let err = DeviceRegistry::discover(&mut bus, 2, 12).unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::CapacityExceeded {
                found: 3,
                capacity: 2
            }
        );
        // nothing was programmed on the bus
        assert!(bus.resolution_writes().is_empty());
    }

    #[test]
    fn test_discovery_fails_on_empty_bus() {
        let mut bus = MockSensorBus::new();
        let err = DeviceRegistry::discover(&mut bus, 2, 12).unwrap_err();
        assert_eq!(err, DiscoveryError::NoDevicesFound);
    }

    #[test]
    fn test_discovery_surfaces_enumeration_failure() {
        let mut bus = MockSensorBus::new();
        bus.add_device(address(1), 20.0);
        bus.fail_enumeration("bus held low");

        let err = DeviceRegistry::discover(&mut bus, 2, 12).unwrap_err();
        assert!(matches!(err, DiscoveryError::Bus(_)));
    }

    #[test]
    fn test_unresolved_slot_keeps_its_index() {
        let mut bus = MockSensorBus::new();
        bus.add_device(address(1), 20.0);
        bus.add_device(address(2), 21.0);
        bus.add_device(address(3), 22.0);
        bus.reject_resolution(&address(2));

        let registry = DeviceRegistry::discover(&mut bus, 3, 12).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.slot(0).unwrap().resolved);
        assert!(!registry.slot(1).unwrap().resolved);
        assert!(registry.slot(2).unwrap().resolved);
        // no compaction: the slot after the failure keeps its bus-order index
        assert_eq!(registry.slot(2).unwrap().address, address(3));
    }
}
