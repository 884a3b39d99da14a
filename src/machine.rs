//! Calculator phase state machine.
//!
//! ```text
//! FirstOperandInput ──confirm──▶ SecondOperandInput ──confirm──▶ OperationSelection
//!        ▲                                                              │
//!        └────────────── ResultDisplay (shine, 64 bits, shine) ◀─confirm┘
//! ```
//!
//! Each phase rebuilds its button bindings on entry and hands control to
//! [`dispatch`] until a confirm press. The result display runs to
//! completion and wraps straight back to the first phase.

use crate::arith::{calculate, Operation};
use crate::buffer::Operands;
use crate::config::Timing;
use crate::dispatch::{dispatch, Action, Bindings, Flow};
use crate::error::Result;
use crate::hal::{ButtonBank, Clock, LampBank, LINE_COUNT};
use crate::signal::Signaler;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    FirstOperandInput,
    SecondOperandInput,
    OperationSelection,
    ResultDisplay,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::FirstOperandInput => "first operand input",
            Phase::SecondOperandInput => "second operand input",
            Phase::OperationSelection => "operation selection",
            Phase::ResultDisplay => "result display",
        };
        f.write_str(name)
    }
}

/// Everything the button callbacks touch: operands, operation, lamps.
struct Session<L, C> {
    signal: Signaler<L, C>,
    operands: Operands,
    operation: Operation,
    probe_levels: [bool; LINE_COUNT],
}

impl<L: LampBank, C: Clock> Session<L, C> {
    fn handle(&mut self, line: usize, action: Action) -> Result<Flow> {
        match action {
            Action::Confirm => return Ok(Flow::Advance),
            Action::AppendZero | Action::AppendOne => {
                self.operands.append(action == Action::AppendOne);
                self.signal.show_nibble(u64::from(self.operands.window()))?;
            }
            Action::Backspace => {
                self.operands.backspace();
                self.signal.show_nibble(u64::from(self.operands.window()))?;
            }
            Action::CycleOperation => {
                self.operation = self.operation.next();
                tracing::debug!(operation = %self.operation, "operation selected");
                self.signal.show_nibble(u64::from(self.operation.code()))?;
            }
            Action::Report => {
                tracing::info!(line, "button pressed");
                self.probe_levels[line] = !self.probe_levels[line];
                self.signal.set(line, self.probe_levels[line])?;
            }
        }
        Ok(Flow::Continue)
    }
}

/// The appliance: buttons in, lamps out, one phase at a time.
///
/// Field order matters: buttons are released before lamps when the
/// calculator is dropped.
pub struct Calculator<B, L, C> {
    buttons: B,
    session: Session<L, C>,
    phase: Phase,
    running: bool,
    cycle_limit: Option<u64>,
    cycles: u64,
    last_result: Option<u64>,
}

impl<B, L, C> Calculator<B, L, C>
where
    B: ButtonBank,
    L: LampBank,
    C: Clock,
{
    pub fn new(buttons: B, lamps: L, clock: C, timing: Timing) -> Self {
        Self {
            buttons,
            session: Session {
                signal: Signaler::new(lamps, clock, timing),
                operands: Operands::new(),
                operation: Operation::default(),
                probe_levels: [false; LINE_COUNT],
            },
            phase: Phase::default(),
            running: true,
            cycle_limit: None,
            cycles: 0,
            last_result: None,
        }
    }

    /// Stop after `cycles` results have been displayed. A limit of zero
    /// leaves the calculator stopped before the first phase.
    pub fn with_cycle_limit(mut self, cycles: u64) -> Self {
        self.cycle_limit = Some(cycles);
        if cycles == 0 {
            self.running = false;
        }
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn operands(&self) -> &Operands {
        &self.session.operands
    }

    pub fn operation(&self) -> Operation {
        self.session.operation
    }

    pub fn last_result(&self) -> Option<u64> {
        self.last_result
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Blank the lamps; called once after the lines are acquired.
    pub fn blank(&mut self) -> Result<()> {
        self.session.signal.all_off()
    }

    /// Run phases until stopped. Returns the first error untouched.
    pub fn run(&mut self) -> Result<()> {
        while self.running {
            self.phase = self.step()?;
        }
        Ok(())
    }

    /// Execute the current phase and return the one that follows it.
    pub fn step(&mut self) -> Result<Phase> {
        tracing::info!(phase = %self.phase, "entering phase");
        match self.phase {
            Phase::FirstOperandInput => self.enter_operand(0),
            Phase::SecondOperandInput => self.enter_operand(1),
            Phase::OperationSelection => self.select_operation(),
            Phase::ResultDisplay => self.display_result(),
        }
    }

    fn enter_operand(&mut self, index: usize) -> Result<Phase> {
        self.session.operands.begin(index);
        self.session.signal.all_off()?;

        let session = &mut self.session;
        dispatch(&mut self.buttons, &Bindings::operand_entry(), |line, action| {
            session.handle(line, action)
        })?;

        let value = self.session.operands.value(index);
        tracing::info!(operand = index, value, "operand entered");
        Ok(if index == 0 {
            Phase::SecondOperandInput
        } else {
            Phase::OperationSelection
        })
    }

    fn select_operation(&mut self) -> Result<Phase> {
        self.session.operation = Operation::default();
        self.session.signal.all_off()?;

        let session = &mut self.session;
        dispatch(&mut self.buttons, &Bindings::operation_select(), |line, action| {
            session.handle(line, action)
        })?;

        tracing::info!(operation = %self.session.operation, "operation confirmed");
        Ok(Phase::ResultDisplay)
    }

    fn display_result(&mut self) -> Result<Phase> {
        let a = self.session.operands.value(0);
        let b = self.session.operands.value(1);
        let op = self.session.operation;
        let result = calculate(a, b, op);
        tracing::info!(a, b, operation = %op, result, "calculated");
        self.last_result = Some(result);

        let signal = &mut self.session.signal;
        signal.shine()?;
        signal.transmit(result)?;
        signal.shine()?;

        self.cycles += 1;
        if self.cycle_limit.is_some_and(|limit| self.cycles >= limit) {
            tracing::info!(cycles = self.cycles, "cycle limit reached, stopping");
            self.running = false;
        }
        Ok(Phase::FirstOperandInput)
    }

    /// Button self-test: every press is logged and toggles the lamp with the
    /// same index. Only returns on error.
    pub fn probe(&mut self) -> Result<()> {
        self.session.probe_levels = [false; LINE_COUNT];
        self.session.signal.all_off()?;
        let session = &mut self.session;
        dispatch(&mut self.buttons, &Bindings::probe(), |line, action| {
            session.handle(line, action)
        })
    }
}
