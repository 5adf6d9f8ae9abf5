//! Outbound frame packing.
//!
//! Fixed 8-byte layout on CAN id 0x000, standard format:
//!
//! | bytes | content                                              |
//! |-------|------------------------------------------------------|
//! | 0-1   | slot 0 temperature, `round(C * 100)` as i16, LE      |
//! | 2-4   | reserved, zero                                       |
//! | 5-7   | ripple counter digits: hundreds, tens, ones          |
//!
//! Only slot 0 is represented; the registry may hold more sensors, but this
//! frame format deliberately does not carry them.

use crate::bus::{CanFrame, FRAME_LEN};
use crate::registry::DeviceRegistry;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use thiserror::Error;

pub const FRAME_ID: u16 = 0x000;
pub const FRAME_DLC: u8 = 8;

const TEMP_OFFSET: usize = 0;
const COUNTER_OFFSET: usize = 5;
const COUNTER_DIGITS: usize = 3;
const TEMP_SCALE: f32 = 100.0;

/// Each counter digit rolls over at this base.
pub const COUNTER_DIGIT_BASE: u8 = 100;

const_assert!(FRAME_DLC as usize == FRAME_LEN);
const_assert!(COUNTER_OFFSET + COUNTER_DIGITS == FRAME_LEN);

/// Three-digit base-100 cycle counter.
///
/// Ones carries into tens at 100, tens into hundreds; hundreds wraps
/// silently. Every digit stays in `0..100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RippleCounter {
    pub hundreds: u8,
    pub tens: u8,
    pub ones: u8,
}

impl RippleCounter {
    pub const fn new() -> Self {
        Self {
            hundreds: 0,
            tens: 0,
            ones: 0,
        }
    }

    #[must_use]
    pub fn increment(self) -> Self {
        let mut next = self;
        next.ones += 1;
        if next.ones == COUNTER_DIGIT_BASE {
            next.ones = 0;
            next.tens += 1;
            if next.tens == COUNTER_DIGIT_BASE {
                next.tens = 0;
                next.hundreds += 1;
                if next.hundreds == COUNTER_DIGIT_BASE {
                    next.hundreds = 0;
                }
            }
        }
        next
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The scaled temperature does not fit the signed 16-bit payload field
    /// (about +/-327.67 C). Surfaced instead of wrapping: a wrapped value
    /// would be silently wrong telemetry.
    #[error("scaled temperature {scaled} exceeds the signed 16-bit payload range")]
    Overflow { scaled: i32 },
    /// Slot 0 has never produced a valid reading.
    #[error("slot {index} has no valid reading yet")]
    NotSampled { index: usize },
}

pub struct FrameEncoder;

impl FrameEncoder {
    /// Pack slot 0 and the current counter into a frame.
    ///
    /// The frame carries the counter as passed in; the returned counter is
    /// the post-increment value the caller persists for the next cycle.
    pub fn encode(
        registry: &DeviceRegistry,
        counter: RippleCounter,
    ) -> Result<(CanFrame, RippleCounter), EncodeError> {
        let slot = registry
            .slot(0)
            .ok_or(EncodeError::NotSampled { index: 0 })?;
        let temp_c = slot
            .last_temp_c
            .ok_or(EncodeError::NotSampled { index: 0 })?;

        let scaled = (temp_c * TEMP_SCALE).round() as i32;
        if scaled > i32::from(i16::MAX) || scaled < i32::from(i16::MIN) {
            return Err(EncodeError::Overflow { scaled });
        }

        let mut data = [0u8; FRAME_LEN];
        data[TEMP_OFFSET..TEMP_OFFSET + 2].copy_from_slice(&(scaled as i16).to_le_bytes());
        data[COUNTER_OFFSET] = counter.hundreds;
        data[COUNTER_OFFSET + 1] = counter.tens;
        data[COUNTER_OFFSET + 2] = counter.ones;

        Ok((CanFrame::standard(FRAME_ID, data), counter.increment()))
    }
}
