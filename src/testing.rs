//! In-memory hardware for driving the calculator without a GPIO chip.
//!
//! - [`ScriptedButtons`] replays wake cycles of edge events and fails with an
//!   I/O error once the script runs out, so any blocking loop terminates.
//! - [`RecordingLamps`] keeps the current lamp levels and a write count.
//! - [`RecordingClock`] shares state with the lamps it was created from and
//!   records, for every pause, the duration and the lamp pattern held during it.
//!
//! # Example
//!
//! ```
//! use bitlamp::testing::{RecordingLamps, ScriptedButtons};
//! use bitlamp::{Calculator, Timing};
//!
//! let buttons = ScriptedButtons::presses(&[2, 0, 0, 0]);
//! let lamps = RecordingLamps::new();
//! let clock = lamps.clock();
//! let mut calc = Calculator::new(buttons, lamps.clone(), clock, Timing::default());
//!
//! // 1 + 0, then the script runs dry while waiting for the next operand.
//! assert!(calc.run().is_err());
//! assert_eq!(calc.last_result(), Some(1));
//! ```

use crate::error::{CalcError, IoOp, LineRole, Result};
use crate::hal::{ButtonBank, Clock, Edge, LampBank, LINE_COUNT};
use crate::signal::LampPattern;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

/// Shared record of which banks were dropped, in order.
pub type ReleaseLog = Rc<RefCell<Vec<LineRole>>>;

/// Button bank that replays a fixed script of wake cycles.
#[derive(Debug, Default)]
pub struct ScriptedButtons {
    cycles: VecDeque<Vec<(usize, Edge)>>,
    pending: [VecDeque<Edge>; LINE_COUNT],
    reads: usize,
    released: Option<ReleaseLog>,
}

impl ScriptedButtons {
    /// Each inner vector is one wake cycle.
    pub fn new(cycles: Vec<Vec<(usize, Edge)>>) -> Self {
        Self {
            cycles: cycles.into(),
            pending: Default::default(),
            reads: 0,
            released: None,
        }
    }

    /// One press-and-release per line, each edge in its own wake cycle.
    pub fn presses(lines: &[usize]) -> Self {
        let cycles = lines
            .iter()
            .flat_map(|&line| [vec![(line, Edge::Falling)], vec![(line, Edge::Rising)]])
            .collect();
        Self::new(cycles)
    }

    pub fn with_release_log(mut self, log: ReleaseLog) -> Self {
        self.released = Some(log);
        self
    }

    pub fn remaining_cycles(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cycles.is_empty() && self.pending.iter().all(VecDeque::is_empty)
    }

    /// Total edges consumed so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl ButtonBank for ScriptedButtons {
    fn wait_ready(&mut self) -> Result<[bool; LINE_COUNT]> {
        if self.pending.iter().all(VecDeque::is_empty) {
            let cycle = self.cycles.pop_front().ok_or_else(|| {
                CalcError::io(
                    IoOp::Poll,
                    None,
                    io::Error::new(io::ErrorKind::UnexpectedEof, "button script exhausted"),
                )
            })?;
            for (line, edge) in cycle {
                self.pending[line].push_back(edge);
            }
        }
        let mut ready = [false; LINE_COUNT];
        for (line, queue) in self.pending.iter().enumerate() {
            ready[line] = !queue.is_empty();
        }
        Ok(ready)
    }

    fn read_edge(&mut self, line: usize) -> Result<Edge> {
        let edge = self.pending[line].pop_front().ok_or_else(|| {
            CalcError::io(
                IoOp::ReadEdge,
                Some(line),
                io::Error::new(io::ErrorKind::WouldBlock, "no pending edge"),
            )
        })?;
        self.reads += 1;
        Ok(edge)
    }
}

impl Drop for ScriptedButtons {
    fn drop(&mut self) {
        if let Some(log) = &self.released {
            log.borrow_mut().push(LineRole::Button);
        }
    }
}

#[derive(Debug, Default)]
struct LampState {
    levels: LampPattern,
    writes: usize,
    fail_after: Option<usize>,
    pauses: Vec<(Duration, LampPattern)>,
}

/// Lamp bank that remembers levels; clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct RecordingLamps {
    state: Rc<RefCell<LampState>>,
    released: Option<ReleaseLog>,
}

impl RecordingLamps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes beyond the first `writes` fail with an I/O error.
    pub fn failing_after(writes: usize) -> Self {
        let lamps = Self::new();
        lamps.state.borrow_mut().fail_after = Some(writes);
        lamps
    }

    pub fn with_release_log(mut self, log: ReleaseLog) -> Self {
        self.released = Some(log);
        self
    }

    /// A clock that snapshots these lamps at every pause.
    pub fn clock(&self) -> RecordingClock {
        RecordingClock {
            state: Rc::clone(&self.state),
        }
    }

    pub fn levels(&self) -> LampPattern {
        self.state.borrow().levels
    }

    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }

    /// Every pause so far with the pattern lit during it.
    pub fn pauses(&self) -> Vec<(Duration, LampPattern)> {
        self.state.borrow().pauses.clone()
    }

    /// Patterns held for exactly `duration`, in order.
    pub fn held_for(&self, duration: Duration) -> Vec<LampPattern> {
        self.state
            .borrow()
            .pauses
            .iter()
            .filter(|(d, _)| *d == duration)
            .map(|(_, p)| *p)
            .collect()
    }

    pub fn clear_history(&self) {
        let mut state = self.state.borrow_mut();
        state.pauses.clear();
        state.writes = 0;
    }
}

impl LampBank for RecordingLamps {
    fn write_level(&mut self, lamp: usize, on: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_after.is_some_and(|limit| state.writes >= limit) {
            return Err(CalcError::io(
                IoOp::WriteLevel,
                Some(lamp),
                io::Error::new(io::ErrorKind::BrokenPipe, "lamp line gone"),
            ));
        }
        state.levels[lamp] = on;
        state.writes += 1;
        Ok(())
    }
}

impl Drop for RecordingLamps {
    fn drop(&mut self) {
        if let Some(log) = &self.released {
            log.borrow_mut().push(LineRole::Lamp);
        }
    }
}

/// Clock that returns immediately and logs what the lamps showed.
#[derive(Clone, Debug)]
pub struct RecordingClock {
    state: Rc<RefCell<LampState>>,
}

impl RecordingClock {
    pub fn total(&self) -> Duration {
        self.state.borrow().pauses.iter().map(|(d, _)| *d).sum()
    }
}

impl Clock for RecordingClock {
    fn pause(&mut self, duration: Duration) {
        let mut state = self.state.borrow_mut();
        let levels = state.levels;
        state.pauses.push((duration, levels));
    }
}
