//! Operations and the arithmetic evaluator.

use crate::error::{CalcError, Result};
use std::fmt;

/// Operation selected on the lamps, cycled by the second button.
///
/// The discriminant is the 2-bit code shown during selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    #[default]
    Add = 0,
    Subtract = 1,
    Multiply = 2,
    Divide = 3,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(code))
            .copied()
            .ok_or_else(|| CalcError::invariant(format!("operation code {code} out of range")))
    }

    /// Next operation in the cycle; `Divide` wraps to `Add`.
    pub fn next(self) -> Self {
        Self::ALL[(usize::from(self.code()) + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        };
        f.write_str(name)
    }
}

/// Apply `op` to `a` and `b` with wrapping 64-bit semantics.
///
/// Division by zero yields 0; it is logged, never reported on the lamps.
pub fn calculate(a: u64, b: u64, op: Operation) -> u64 {
    match op {
        Operation::Add => a.wrapping_add(b),
        Operation::Subtract => a.wrapping_sub(b),
        Operation::Multiply => a.wrapping_mul(b),
        Operation::Divide => match a.checked_div(b) {
            Some(q) => q,
            None => {
                tracing::warn!(dividend = a, "division by zero, result is 0");
                0
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(calculate(3, 5, Operation::Add), 8);
        assert_eq!(calculate(5, 3, Operation::Subtract), 2);
        assert_eq!(calculate(6, 7, Operation::Multiply), 42);
        assert_eq!(calculate(20, 4, Operation::Divide), 5);
        assert_eq!(calculate(7, 0, Operation::Divide), 0);
    }

    #[test]
    fn overflow_wraps() {
        assert_eq!(calculate(u64::MAX, 1, Operation::Add), 0);
        assert_eq!(calculate(3, 5, Operation::Subtract), u64::MAX - 1);
        assert_eq!(calculate(1 << 63, 2, Operation::Multiply), 0);
    }

    #[test]
    fn division_truncates() {
        assert_eq!(calculate(7, 2, Operation::Divide), 3);
        assert_eq!(calculate(0, 0, Operation::Divide), 0);
    }

    #[test]
    fn cycling_four_times_returns_to_add() {
        let mut op = Operation::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            op = op.next();
            seen.push(op);
        }
        assert_eq!(op, Operation::Add);
        assert_eq!(
            seen,
            vec![Operation::Subtract, Operation::Multiply, Operation::Divide, Operation::Add]
        );
    }

    #[test]
    fn unknown_code_is_an_invariant_violation() {
        let err = Operation::from_code(4).unwrap_err();
        assert!(err.is_invariant());
        assert_eq!(Operation::from_code(2).unwrap(), Operation::Multiply);
    }
}
