//! Board configuration: which GPIO chip and line offsets to use, and how
//! long each part of the lamp protocol lasts.
//!
//! Every field has a default matching the reference wiring, so an empty
//! JSON object (or no file at all) yields a working appliance.

use crate::error::{CalcError, Result};
use crate::hal::LINE_COUNT;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CHIP: &str = "/dev/gpiochip0";
pub const DEFAULT_BUTTONS: [u32; LINE_COUNT] = [25, 10, 17, 18];
pub const DEFAULT_LAMPS: [u32; LINE_COUNT] = [24, 22, 23, 27];
pub const DEFAULT_CONSUMER: &str = "bitlamp";

/// Durations of the lamp signaling vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Number of on/off cycles in one shine flourish
    pub shine_cycles: u32,
    pub shine_on_ms: u64,
    pub shine_off_ms: u64,
    /// How long a bit pattern stays lit
    pub bit_hold_ms: u64,
    /// Dark gap between two bit patterns
    pub bit_gap_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            shine_cycles: 12,
            shine_on_ms: 100,
            shine_off_ms: 150,
            bit_hold_ms: 2000,
            bit_gap_ms: 300,
        }
    }
}

impl Timing {
    pub fn shine_on(&self) -> Duration {
        Duration::from_millis(self.shine_on_ms)
    }

    pub fn shine_off(&self) -> Duration {
        Duration::from_millis(self.shine_off_ms)
    }

    pub fn bit_hold(&self) -> Duration {
        Duration::from_millis(self.bit_hold_ms)
    }

    pub fn bit_gap(&self) -> Duration {
        Duration::from_millis(self.bit_gap_ms)
    }

    /// Wall-clock length of a full result display: two flourishes plus 64 bits.
    pub fn display_duration(&self) -> Duration {
        let shine = (self.shine_on_ms + self.shine_off_ms) * u64::from(self.shine_cycles);
        let bits = (self.bit_hold_ms + self.bit_gap_ms) * 64;
        Duration::from_millis(2 * shine + bits)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// GPIO character device
    pub chip: PathBuf,
    /// Line offsets for confirm, append-0, append-1, backspace
    pub buttons: [u32; LINE_COUNT],
    /// Line offsets for lamps 0..3
    pub lamps: [u32; LINE_COUNT],
    /// Consumer label shown by `gpioinfo`
    pub consumer: String,
    pub timing: Timing,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            chip: PathBuf::from(DEFAULT_CHIP),
            buttons: DEFAULT_BUTTONS,
            lamps: DEFAULT_LAMPS,
            consumer: DEFAULT_CONSUMER.to_string(),
            timing: Timing::default(),
        }
    }
}

impl BoardConfig {
    /// Load a JSON config; keys that are absent keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CalcError::Config {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        let config: BoardConfig = serde_json::from_str(&text).map_err(|e| CalcError::Config {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        config.validate().map_err(|e| match e {
            CalcError::Config { message, .. } => CalcError::Config {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for &offset in self.buttons.iter().chain(self.lamps.iter()) {
            if !seen.insert(offset) {
                return Err(CalcError::Config {
                    path: None,
                    message: format!("line offset {offset} is assigned more than once"),
                });
            }
        }
        if self.timing.shine_cycles == 0 {
            return Err(CalcError::Config {
                path: None,
                message: "timing.shine_cycles must be at least 1".to_string(),
            });
        }
        if self.consumer.is_empty() {
            return Err(CalcError::Config {
                path: None,
                message: "consumer label must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
