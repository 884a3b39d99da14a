//! Error type shared by every fallible operation in the appliance.
//!
//! Hardware failures are fatal: nothing retries, the error travels up to the
//! top-level driver which drops the board (releasing inputs, then outputs)
//! and exits with a failure status.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Which bank a line belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineRole {
    Button,
    Lamp,
}

impl fmt::Display for LineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRole::Button => f.write_str("button"),
            LineRole::Lamp => f.write_str("lamp"),
        }
    }
}

/// The runtime operation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoOp {
    Poll,
    ReadEdge,
    WriteLevel,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOp::Poll => f.write_str("waiting for button edges"),
            IoOp::ReadEdge => f.write_str("reading edge event"),
            IoOp::WriteLevel => f.write_str("writing lamp level"),
        }
    }
}

/// Errors from setup, runtime I/O, configuration, and broken invariants.
#[derive(Debug)]
pub enum CalcError {
    /// The GPIO chip device could not be opened.
    Chip { path: PathBuf, source: io::Error },
    /// A line failed to open or to accept its edge configuration.
    Setup {
        role: LineRole,
        line: usize,
        pin: u32,
        source: io::Error,
    },
    /// Polling, reading an edge, or writing a level failed mid-session.
    Io {
        op: IoOp,
        line: Option<usize>,
        source: io::Error,
    },
    /// An operation code or phase value outside its defined set.
    InvariantViolated(String),
    /// The configuration file could not be read, parsed, or validated.
    Config { path: Option<PathBuf>, message: String },
}

impl CalcError {
    pub fn setup(role: LineRole, line: usize, pin: u32, source: io::Error) -> Self {
        CalcError::Setup {
            role,
            line,
            pin,
            source,
        }
    }

    pub fn io(op: IoOp, line: Option<usize>, source: io::Error) -> Self {
        CalcError::Io { op, line, source }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        CalcError::InvariantViolated(msg.into())
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self, CalcError::InvariantViolated(_))
    }

    pub fn is_setup(&self) -> bool {
        matches!(self, CalcError::Chip { .. } | CalcError::Setup { .. })
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcError::Chip { path, source } => {
                write!(f, "failed to open gpio chip {}: {source}", path.display())
            }
            CalcError::Setup {
                role,
                line,
                pin,
                source,
            } => write!(f, "failed to set up {role} {line} (pin {pin}): {source}"),
            CalcError::Io {
                op,
                line: Some(line),
                source,
            } => write!(f, "error {op} on line {line}: {source}"),
            CalcError::Io {
                op,
                line: None,
                source,
            } => write!(f, "error {op}: {source}"),
            CalcError::InvariantViolated(msg) => write!(f, "invariant violated: {msg}"),
            CalcError::Config {
                path: Some(path),
                message,
            } => write!(f, "invalid config {}: {message}", path.display()),
            CalcError::Config {
                path: None,
                message,
            } => write!(f, "invalid config: {message}"),
        }
    }
}

impl std::error::Error for CalcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalcError::Chip { source, .. }
            | CalcError::Setup { source, .. }
            | CalcError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
