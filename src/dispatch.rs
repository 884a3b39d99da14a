//! Event dispatcher: blocking wait over the four buttons, routing presses
//! to whatever the current phase bound to each line.

use crate::error::Result;
use crate::hal::{ButtonBank, LINE_COUNT};

/// What a button does in the current phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Leave the current phase.
    Confirm,
    AppendZero,
    AppendOne,
    Backspace,
    CycleOperation,
    /// Probe mode: log the press and toggle the matching lamp.
    Report,
}

/// Whether the phase keeps waiting for presses after a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Advance,
}

/// Line index to optional action, rebuilt on every phase entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bindings([Option<Action>; LINE_COUNT]);

impl Bindings {
    pub fn new(actions: [Option<Action>; LINE_COUNT]) -> Self {
        Self(actions)
    }

    /// Confirm, append-0, append-1, backspace.
    pub fn operand_entry() -> Self {
        Self([
            Some(Action::Confirm),
            Some(Action::AppendZero),
            Some(Action::AppendOne),
            Some(Action::Backspace),
        ])
    }

    /// Confirm and cycle; lines 2 and 3 are ignored.
    pub fn operation_select() -> Self {
        Self([Some(Action::Confirm), Some(Action::CycleOperation), None, None])
    }

    pub fn probe() -> Self {
        Self([Some(Action::Report); LINE_COUNT])
    }

    pub fn get(&self, line: usize) -> Option<Action> {
        self.0.get(line).copied().flatten()
    }
}

/// Wait for presses until a callback returns [`Flow::Advance`].
///
/// Each wake cycle reads exactly one edge from every ready line, in index
/// order. Only falling edges on bound lines invoke `on_press`. If any
/// invocation in a cycle advances, the remaining ready lines of that cycle
/// are still serviced before returning.
///
/// Any I/O error is returned immediately.
pub fn dispatch<B, F>(buttons: &mut B, bindings: &Bindings, mut on_press: F) -> Result<()>
where
    B: ButtonBank + ?Sized,
    F: FnMut(usize, Action) -> Result<Flow>,
{
    loop {
        let ready = buttons.wait_ready()?;
        let mut advance = false;

        for (line, _) in ready.iter().enumerate().filter(|(_, r)| **r) {
            let edge = buttons.read_edge(line)?;
            if !edge.is_press() {
                tracing::trace!(line, "release ignored");
                continue;
            }
            let Some(action) = bindings.get(line) else {
                tracing::trace!(line, "press on unbound line");
                continue;
            };
            tracing::debug!(line, ?action, "button pressed");
            if on_press(line, action)? == Flow::Advance {
                advance = true;
            }
        }

        if advance {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Edge;
    use crate::testing::ScriptedButtons;

    #[test]
    fn releases_and_unbound_lines_are_ignored() {
        let mut buttons = ScriptedButtons::new(vec![
            vec![(1, Edge::Rising)],
            vec![(2, Edge::Falling), (3, Edge::Falling)],
            vec![(1, Edge::Falling)],
            vec![(0, Edge::Falling)],
        ]);
        let bindings = Bindings::operation_select();
        let mut calls = Vec::new();

        dispatch(&mut buttons, &bindings, |line, action| {
            calls.push((line, action));
            Ok(if action == Action::Confirm {
                Flow::Advance
            } else {
                Flow::Continue
            })
        })
        .unwrap();

        assert_eq!(
            calls,
            vec![(1, Action::CycleOperation), (0, Action::Confirm)]
        );
        assert!(buttons.is_exhausted());
    }

    #[test]
    fn advancing_cycle_finishes_remaining_lines() {
        let mut buttons = ScriptedButtons::new(vec![
            vec![(0, Edge::Falling), (2, Edge::Falling), (3, Edge::Rising)],
            vec![(1, Edge::Falling)],
        ]);
        let bindings = Bindings::operand_entry();
        let mut calls = Vec::new();

        dispatch(&mut buttons, &bindings, |line, action| {
            calls.push(line);
            Ok(if action == Action::Confirm {
                Flow::Advance
            } else {
                Flow::Continue
            })
        })
        .unwrap();

        assert_eq!(calls, vec![0, 2]);
        // line 3's release was consumed, the next cycle was never awaited
        assert_eq!(buttons.remaining_cycles(), 1);
    }

    #[test]
    fn later_continue_does_not_cancel_advance() {
        let mut buttons = ScriptedButtons::new(vec![vec![(0, Edge::Falling), (1, Edge::Falling)]]);
        let bindings = Bindings::operand_entry();

        let result = dispatch(&mut buttons, &bindings, |_, action| {
            Ok(if action == Action::Confirm {
                Flow::Advance
            } else {
                Flow::Continue
            })
        });
        assert!(result.is_ok());
    }

    #[test]
    fn poll_failure_propagates() {
        let mut buttons = ScriptedButtons::new(vec![vec![(1, Edge::Falling)]]);
        let bindings = Bindings::operand_entry();
        let mut calls = 0;

        let err = dispatch(&mut buttons, &bindings, |_, _| {
            calls += 1;
            Ok(Flow::Continue)
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(!err.is_invariant());
    }

    #[test]
    fn callback_error_stops_dispatch() {
        let mut buttons = ScriptedButtons::new(vec![vec![(1, Edge::Falling), (2, Edge::Falling)]]);
        let bindings = Bindings::operand_entry();
        let mut calls = 0;

        let err = dispatch(&mut buttons, &bindings, |_, _| {
            calls += 1;
            Err(crate::error::CalcError::invariant("boom"))
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(err.is_invariant());
    }

    #[test]
    fn out_of_range_line_has_no_binding() {
        assert_eq!(Bindings::probe().get(LINE_COUNT), None);
        assert_eq!(Bindings::default().get(0), None);
    }
}
