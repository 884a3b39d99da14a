//! Bitlamp - Binary Calculator Appliance
//!
//! Copyright (c) 2025 Bitlamp Contributors
//! Licensed under MIT License
//!
//! A 64-bit integer calculator for single-board computers whose only input is
//! four push-buttons and whose only output is four lamps.
//!
//! # Interaction cycle
//!
//! 1. Enter operand A bit by bit, least-significant first (confirm to finish)
//! 2. Enter operand B the same way
//! 3. Cycle through add / subtract / multiply / divide, confirm
//! 4. Watch the result blink out as 64 pulses, bracketed by a shine flourish
//!
//! # Modules
//!
//! - [`machine`]: phase state machine driving the cycle
//! - [`dispatch`]: blocking edge wait and per-phase button bindings
//! - [`buffer`]: operand edit buffer and cursor
//! - [`signal`]: lamp signaling vocabularies
//! - [`arith`]: operations and the evaluator
//! - [`hal`]: hardware traits; [`gpio`]: Linux GPIO backend
//! - [`testing`]: in-memory hardware for tests and benches

pub mod arith;
pub mod buffer;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gpio;
pub mod hal;
pub mod logging;
pub mod machine;
pub mod signal;
pub mod testing;

// Re-export main types for convenience
pub use arith::{calculate, Operation};
pub use buffer::{Cursor, Operands};
pub use config::{BoardConfig, Timing};
pub use dispatch::{dispatch, Action, Bindings, Flow};
pub use error::{CalcError, Result};
pub use hal::{ButtonBank, Clock, Edge, LampBank, SystemClock, LINE_COUNT};
pub use machine::{Calculator, Phase};
pub use signal::{decode_pulses, encode_pulses, LampPattern, Signaler, ONE_PULSE, ZERO_PULSE};
