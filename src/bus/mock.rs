//! In-process fakes for both buses.
//!
//! Each mock is scriptable: tests and the demo binary decide which devices
//! exist, what they read, and which operations fail, then inspect what the
//! core did with them.

use super::{
    AddressList, CanBus, CanBusError, CanFrame, SensorAddress, SensorBus, SensorBusError,
    DEVICE_DISCONNECTED_C,
};

#[derive(Debug, Clone)]
struct MockDevice {
    address: SensorAddress,
    reading: f32,
    disconnected: bool,
    reject_resolution: bool,
}

/// A scripted single-wire bus with a fixed set of simulated devices.
#[derive(Debug, Default)]
pub struct MockSensorBus {
    devices: Vec<MockDevice>,
    enumerate_error: Option<&'static str>,
    conversion_requests: u32,
    resolution_writes: Vec<(SensorAddress, u8)>,
}

impl MockSensorBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach one device reporting `reading` until rescripted.
    pub fn add_device(&mut self, address: SensorAddress, reading: f32) {
        self.devices.push(MockDevice {
            address,
            reading,
            disconnected: false,
            reject_resolution: false,
        });
    }

    /// Change the temperature an attached device reports.
    pub fn set_reading(&mut self, address: &SensorAddress, reading: f32) {
        if let Some(device) = self.device_mut(address) {
            device.reading = reading;
        }
    }

    /// Make an attached device stop answering readbacks.
    pub fn set_disconnected(&mut self, address: &SensorAddress, disconnected: bool) {
        if let Some(device) = self.device_mut(address) {
            device.disconnected = disconnected;
        }
    }

    /// Make an attached device refuse resolution programming.
    pub fn reject_resolution(&mut self, address: &SensorAddress) {
        if let Some(device) = self.device_mut(address) {
            device.reject_resolution = true;
        }
    }

    /// Make the next enumeration fail outright.
    pub fn fail_enumeration(&mut self, reason: &'static str) {
        self.enumerate_error = Some(reason);
    }

    /// How many broadcast conversion requests the core has issued.
    pub fn conversion_requests(&self) -> u32 {
        self.conversion_requests
    }

    /// Every `(address, bits)` resolution write seen, in order.
    pub fn resolution_writes(&self) -> &[(SensorAddress, u8)] {
        &self.resolution_writes
    }

    fn device_mut(&mut self, address: &SensorAddress) -> Option<&mut MockDevice> {
        self.devices.iter_mut().find(|d| d.address == *address)
    }
}

impl SensorBus for MockSensorBus {
    fn enumerate(&mut self) -> Result<AddressList, SensorBusError> {
        if let Some(reason) = self.enumerate_error.take() {
            return Err(SensorBusError::Enumeration(reason));
        }
        let mut addresses = AddressList::new();
        for device in &self.devices {
            if addresses.push(device.address).is_err() {
                return Err(SensorBusError::Enumeration("too many devices on the bus"));
            }
        }
        Ok(addresses)
    }

    fn request_conversion_all(&mut self) {
        self.conversion_requests += 1;
    }

    fn read_celsius(&mut self, address: &SensorAddress) -> f32 {
        match self.devices.iter().find(|d| d.address == *address) {
            Some(device) if !device.disconnected => device.reading,
            _ => DEVICE_DISCONNECTED_C,
        }
    }

    fn set_resolution(&mut self, address: &SensorAddress, bits: u8) -> Result<(), SensorBusError> {
        match self.device_mut(address) {
            Some(device) if device.reject_resolution => {
                Err(SensorBusError::NoResponse(*address))
            }
            Some(_) => {
                self.resolution_writes.push((*address, bits));
                Ok(())
            }
            None => Err(SensorBusError::NoResponse(*address)),
        }
    }
}

/// A scripted CAN controller that records everything sent through it.
#[derive(Debug, Default)]
pub struct MockCanBus {
    initialized: bool,
    bitrate: Option<u32>,
    init_calls: u32,
    init_failures_remaining: u32,
    send_failures_remaining: u32,
    sent: Vec<CanFrame>,
}

impl MockCanBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` init attempts before succeeding.
    pub fn fail_init_times(&mut self, count: u32) {
        self.init_failures_remaining = count;
    }

    /// Fail the next `count` sends before recovering.
    pub fn fail_next_sends(&mut self, count: u32) {
        self.send_failures_remaining = count;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn bitrate(&self) -> Option<u32> {
        self.bitrate
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls
    }

    /// Every frame accepted for transmission, in order.
    pub fn sent(&self) -> &[CanFrame] {
        &self.sent
    }
}

impl CanBus for MockCanBus {
    fn init(&mut self, bitrate: u32) -> Result<(), CanBusError> {
        self.init_calls += 1;
        if self.init_failures_remaining > 0 {
            self.init_failures_remaining -= 1;
            return Err(CanBusError::InitFailed("controller not ready"));
        }
        self.initialized = true;
        self.bitrate = Some(bitrate);
        Ok(())
    }

    fn send(&mut self, frame: &CanFrame) -> Result<(), CanBusError> {
        if !self.initialized {
            return Err(CanBusError::TxFailed("controller not initialized"));
        }
        if self.send_failures_remaining > 0 {
            self.send_failures_remaining -= 1;
            return Err(CanBusError::TxFailed("tx buffer busy"));
        }
        self.sent.push(*frame);
        Ok(())
    }
}
