//! Capability interfaces for the two physical buses the bridge talks to.
//!
//! The core never touches hardware directly: discovery, sampling, and
//! transmission all go through [`SensorBus`] and [`CanBus`] so the whole
//! pipeline can run against the in-process fakes in [`mock`].

pub mod mock;

use arrayvec::ArrayString;
use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard upper bound on devices a single bus search can report.
pub const MAX_BUS_DEVICES: usize = 32;

/// CAN payload length for every frame this bridge produces.
pub const FRAME_LEN: usize = 8;

/// Reading reported by the sensor driver when a device fails to answer.
///
/// This is a driver-level sentinel, not a temperature; it must never be
/// stored in a slot or encoded into a frame.
pub const DEVICE_DISCONNECTED_C: f32 = -127.0;

/// Returns true when a readback carries the disconnected sentinel.
pub fn is_disconnected(reading: f32) -> bool {
    (reading - DEVICE_DISCONNECTED_C).abs() < 0.001
}

pub type AddressList = heapless::Vec<SensorAddress, MAX_BUS_DEVICES>;

/// Unique 8-byte ROM address of one device on the single-wire bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorAddress(pub [u8; 8]);

impl SensorAddress {
    /// Zero-padded uppercase hex rendering, matching the on-wire byte order.
    pub fn hex(&self) -> ArrayString<16> {
        let mut out = ArrayString::new();
        for byte in &self.0 {
            let _ = fmt::Write::write_fmt(&mut out, format_args!("{byte:02X}"));
        }
        out
    }
}

impl fmt::Display for SensorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorBusError {
    #[error("bus search failed: {0}")]
    Enumeration(&'static str),
    #[error("device {0} did not acknowledge")]
    NoResponse(SensorAddress),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanBusError {
    #[error("controller init failed: {0}")]
    InitFailed(&'static str),
    #[error("transmit failed: {0}")]
    TxFailed(&'static str),
}

/// One outbound CAN frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    pub id: u16,
    pub extended: bool,
    pub dlc: u8,
    pub data: [u8; FRAME_LEN],
}

impl CanFrame {
    /// Standard-format frame with a full 8-byte payload.
    pub fn standard(id: u16, data: [u8; FRAME_LEN]) -> Self {
        Self {
            id,
            extended: false,
            dlc: FRAME_LEN as u8,
            data,
        }
    }
}

/// Blocking access to a single-wire temperature sensor bus.
///
/// Models the enumeration/conversion/readback primitives of a DS18B20-style
/// driver. All sensors on the bus convert in response to one broadcast
/// request; readback is per-address.
pub trait SensorBus {
    /// Search the bus and return every device address found, in bus order.
    fn enumerate(&mut self) -> Result<AddressList, SensorBusError>;

    /// Broadcast a conversion request to every device on the bus.
    fn request_conversion_all(&mut self);

    /// Read back the last converted temperature for one device.
    ///
    /// Returns [`DEVICE_DISCONNECTED_C`] when the device does not answer.
    fn read_celsius(&mut self, address: &SensorAddress) -> f32;

    /// Program the conversion resolution for one device.
    fn set_resolution(&mut self, address: &SensorAddress, bits: u8) -> Result<(), SensorBusError>;
}

/// Blocking access to a CAN controller.
pub trait CanBus {
    /// Bring the controller up at the given bitrate.
    fn init(&mut self, bitrate: u32) -> Result<(), CanBusError>;

    /// Submit one frame for transmission.
    fn send(&mut self, frame: &CanFrame) -> Result<(), CanBusError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_is_zero_padded() {
        let address = SensorAddress([0x28, 0x0F, 0x01, 0x00, 0x00, 0xAB, 0xCD, 0x05]);
        assert_eq!(address.hex().as_str(), "280F010000ABCD05");
        assert_eq!(format!("{address}"), "280F010000ABCD05");
    }

    #[test]
    fn test_disconnected_sentinel_detection() {
        assert!(is_disconnected(DEVICE_DISCONNECTED_C));
        assert!(!is_disconnected(-126.9));
        assert!(!is_disconnected(21.0));
    }

    #[test]
    fn test_standard_frame_shape() {
        let frame = CanFrame::standard(0x000, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(frame.dlc, 8);
        assert!(!frame.extended);
    }
}
