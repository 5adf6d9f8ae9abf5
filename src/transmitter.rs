//! CAN bring-up and frame transmission.
//!
//! Init runs under a retry policy because on real hardware the controller
//! simply is not ready yet; send failures are surfaced to the caller and
//! counted, never swallowed.

use crate::bus::{CanBus, CanBusError, CanFrame};
use crate::retry::{run_with_retry, RetryPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusInitError {
    #[error("CAN controller failed to initialize: {0}")]
    Controller(#[from] CanBusError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("frame transmit failed: {0}")]
    Bus(#[from] CanBusError),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TxStats {
    pub frames_sent: u32,
    pub send_failures: u32,
}

#[derive(Debug, Default)]
pub struct Transmitter {
    stats: TxStats,
}

impl Transmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the controller up, retrying under `policy`.
    ///
    /// With an unbounded policy this blocks until the hardware answers; a
    /// bounded policy surfaces the last controller error instead.
    pub fn init_bus<C: CanBus>(
        bus: &mut C,
        bitrate: u32,
        policy: &RetryPolicy,
    ) -> Result<(), BusInitError> {
        run_with_retry("CAN init", policy, || bus.init(bitrate))?;
        info!("CAN init ok at {bitrate} bit/s");
        Ok(())
    }

    /// Submit one frame. Failures are counted and returned to the caller.
    pub fn send<C: CanBus>(&mut self, bus: &mut C, frame: &CanFrame) -> Result<(), SendError> {
        match bus.send(frame) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                Ok(())
            }
            Err(err) => {
                self.stats.send_failures += 1;
                Err(SendError::Bus(err))
            }
        }
    }

    pub fn stats(&self) -> &TxStats {
        &self.stats
    }
}
