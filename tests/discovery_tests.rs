use thermolink::bus::mock::MockSensorBus;
use thermolink::bus::SensorAddress;
use thermolink::registry::{DeviceRegistry, DiscoveryError};

fn address(tail: u8) -> SensorAddress {
    SensorAddress([0x28, 0xFF, 0x64, 0x0E, 0x00, 0x00, 0x00, tail])
}

fn bus_with(count: u8) -> MockSensorBus {
    let mut bus = MockSensorBus::new();
    for tail in 0..count {
        bus.add_device(address(tail), 20.0 + f32::from(tail));
    }
    bus
}

#[cfg(test)]
mod capacity_tests {
    use super::*;

    #[test]
    fn test_every_fit_under_capacity_succeeds() {
        // k sensors fit any capacity N >= k, indices matching bus order
        for capacity in 1..=8 {
            for found in 1..=capacity {
                let mut bus = bus_with(found as u8);
                let registry = DeviceRegistry::discover(&mut bus, capacity, 12).unwrap();
                assert_eq!(registry.len(), found);
                for (expected, slot) in registry.slots().iter().enumerate() {
                    assert_eq!(slot.index, expected);
                    assert_eq!(slot.address, address(expected as u8));
                }
            }
        }
    }

    #[test]
    fn test_over_capacity_fails_without_truncation() {
        let mut bus = bus_with(5);
        let err = DeviceRegistry::discover(&mut bus, 2, 12).unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::CapacityExceeded {
                found: 5,
                capacity: 2
            }
        );
        // the device list is never silently truncated into a partial registry
        assert!(bus.resolution_writes().is_empty());
    }

    #[test]
    fn test_empty_bus_fails() {
        let mut bus = MockSensorBus::new();
        assert_eq!(
            DeviceRegistry::discover(&mut bus, 4, 12).unwrap_err(),
            DiscoveryError::NoDevicesFound
        );
    }
}

#[cfg(test)]
mod binding_tests {
    use super::*;

    #[test]
    fn test_resolution_is_programmed_in_enumeration_order() {
        let mut bus = bus_with(3);
        let _registry = DeviceRegistry::discover(&mut bus, 3, 11).unwrap();

        let writes = bus.resolution_writes();
        assert_eq!(writes.len(), 3);
        for (i, (written_address, bits)) in writes.iter().enumerate() {
            assert_eq!(*written_address, address(i as u8));
            assert_eq!(*bits, 11);
        }
    }

    #[test]
    fn test_binding_failure_reserves_the_index() {
        let mut bus = bus_with(3);
        bus.reject_resolution(&address(0));

        let registry = DeviceRegistry::discover(&mut bus, 3, 12).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(!registry.slot(0).unwrap().resolved);
        assert!(registry.slot(1).unwrap().resolved);
        assert!(registry.slot(2).unwrap().resolved);
        assert_eq!(registry.slot(1).unwrap().address, address(1));
    }

    #[test]
    fn test_slots_start_unsampled() {
        let mut bus = bus_with(2);
        let registry = DeviceRegistry::discover(&mut bus, 2, 12).unwrap();
        assert!(registry.slots().iter().all(|s| s.last_temp_c.is_none()));
    }
}
