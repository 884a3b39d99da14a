//! Lamp signaling protocol.
//!
//! Three vocabularies built from "set level" and "pause":
//! - nibble display: bit 3 on lamp 0 down to bit 0 on lamp 3, steady
//! - shine: `shine_cycles` rounds of all-on then all-off
//! - serial transmission: 64 timed two-lamp pulses, LSB first,
//!   lamps 0+1 for a 1-bit and lamps 2+3 for a 0-bit

use crate::config::Timing;
use crate::error::Result;
use crate::hal::{Clock, LampBank, LINE_COUNT};

/// A full set of lamp levels, lamp 0 first.
pub type LampPattern = [bool; LINE_COUNT];

pub const ALL_OFF: LampPattern = [false; LINE_COUNT];
pub const ALL_ON: LampPattern = [true; LINE_COUNT];
/// Pulse for a transmitted 1-bit.
pub const ONE_PULSE: LampPattern = [true, true, false, false];
/// Pulse for a transmitted 0-bit.
pub const ZERO_PULSE: LampPattern = [false, false, true, true];

/// Number of pulses in a result transmission.
pub const TRANSMIT_BITS: usize = 64;

/// Lamp pattern for the low four bits of `value`, MSB of the nibble on lamp 0.
pub fn nibble_pattern(value: u64) -> LampPattern {
    let mut pattern = ALL_OFF;
    for (lamp, level) in pattern.iter_mut().enumerate() {
        *level = (value & (0b1000 >> lamp)) != 0;
    }
    pattern
}

/// Pulse sequence for `value`, least-significant bit first.
pub fn encode_pulses(value: u64) -> impl Iterator<Item = LampPattern> {
    (0..TRANSMIT_BITS).map(move |bit| {
        if (value >> bit) & 1 == 1 {
            ONE_PULSE
        } else {
            ZERO_PULSE
        }
    })
}

/// Reassemble a value from observed pulses.
///
/// Returns `None` unless there are exactly 64 pulses and each is one of the
/// two bit patterns.
pub fn decode_pulses<I>(pulses: I) -> Option<u64>
where
    I: IntoIterator<Item = LampPattern>,
{
    let mut value = 0u64;
    let mut count = 0usize;
    for pulse in pulses {
        if count >= TRANSMIT_BITS {
            return None;
        }
        match pulse {
            ONE_PULSE => value |= 1u64 << count,
            ZERO_PULSE => {}
            _ => return None,
        }
        count += 1;
    }
    (count == TRANSMIT_BITS).then_some(value)
}

/// Drives the four lamps through the signaling vocabularies.
pub struct Signaler<L, C> {
    lamps: L,
    clock: C,
    timing: Timing,
}

impl<L: LampBank, C: Clock> Signaler<L, C> {
    pub fn new(lamps: L, clock: C, timing: Timing) -> Self {
        Self {
            lamps,
            clock,
            timing,
        }
    }

    pub fn set(&mut self, lamp: usize, on: bool) -> Result<()> {
        self.lamps.write_level(lamp, on)
    }

    pub fn show(&mut self, pattern: LampPattern) -> Result<()> {
        for (lamp, &on) in pattern.iter().enumerate() {
            self.lamps.write_level(lamp, on)?;
        }
        Ok(())
    }

    pub fn all_off(&mut self) -> Result<()> {
        self.show(ALL_OFF)
    }

    pub fn all_on(&mut self) -> Result<()> {
        self.show(ALL_ON)
    }

    /// Steady display of the low nibble of `value`.
    pub fn show_nibble(&mut self, value: u64) -> Result<()> {
        self.show(nibble_pattern(value))
    }

    /// Attract/confirmation blink, ending dark.
    pub fn shine(&mut self) -> Result<()> {
        for _ in 0..self.timing.shine_cycles {
            self.all_on()?;
            self.clock.pause(self.timing.shine_on());
            self.all_off()?;
            self.clock.pause(self.timing.shine_off());
        }
        Ok(())
    }

    /// Hold one pulse, then go dark. The gap is separate.
    pub fn pulse(&mut self, pattern: LampPattern) -> Result<()> {
        self.all_off()?;
        self.show(pattern)?;
        self.clock.pause(self.timing.bit_hold());
        self.all_off()
    }

    /// Emit all 64 bits of `value`, LSB first, with a dark gap after each.
    pub fn transmit(&mut self, value: u64) -> Result<()> {
        tracing::debug!(value, "transmitting result");
        for pattern in encode_pulses(value) {
            self.pulse(pattern)?;
            self.clock.pause(self.timing.bit_gap());
        }
        Ok(())
    }
}
