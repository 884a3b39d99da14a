//! Hardware seam between the calculator and whatever drives the lines.
//!
//! The calculator only needs three capabilities: wait for and read button
//! edges, set lamp levels, and pause for a fixed time. [`crate::gpio`]
//! implements them on a Linux GPIO chip; [`crate::testing`] implements them
//! in memory.

use crate::error::Result;
use std::time::Duration;

/// Number of buttons and number of lamps.
pub const LINE_COUNT: usize = 4;

/// Direction of an input transition.
///
/// Buttons are wired active-low with a pull-up, so a press is a falling edge
/// and a release is a rising edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    pub fn is_press(self) -> bool {
        self == Edge::Falling
    }
}

/// Four edge-triggered input lines.
pub trait ButtonBank {
    /// Block until at least one line has a pending edge; no timeout.
    ///
    /// Returns the readiness of each line in index order.
    fn wait_ready(&mut self) -> Result<[bool; LINE_COUNT]>;

    /// Consume exactly one pending edge from `line`.
    fn read_edge(&mut self, line: usize) -> Result<Edge>;
}

/// Four write-only output lines.
pub trait LampBank {
    fn write_level(&mut self, lamp: usize, on: bool) -> Result<()>;
}

/// Blocking, non-cancellable pauses.
pub trait Clock {
    fn pause(&mut self, duration: Duration);
}

impl<T: ButtonBank + ?Sized> ButtonBank for &mut T {
    fn wait_ready(&mut self) -> Result<[bool; LINE_COUNT]> {
        (**self).wait_ready()
    }

    fn read_edge(&mut self, line: usize) -> Result<Edge> {
        (**self).read_edge(line)
    }
}

impl<T: LampBank + ?Sized> LampBank for &mut T {
    fn write_level(&mut self, lamp: usize, on: bool) -> Result<()> {
        (**self).write_level(lamp, on)
    }
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration)
    }
}

/// Wall-clock pauses via `thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
