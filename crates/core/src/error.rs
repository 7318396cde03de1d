//! The fault taxonomy shared by every component of the interpreter.
//!
//! All errors are structured fault kinds raised synchronously at the point of
//! detection. None of them are retried anywhere in this crate; the public
//! entry points simply return `Err` and leave the caller's heap state intact.

use std::fmt;

/// A synchronous fault raised by the noun heap, the task stack, the evaluator,
/// or the garbage collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NockError {
    /// External input is not an integer or a non-empty list of nouns.
    MalformedNoun(String),
    /// The noun builder exceeded its configured depth limit.
    NounTooDeep { limit: usize },
    /// The allocator could not satisfy a request after GC and growth attempts.
    HeapOverflow,
    /// The task stack could not accept another entry.
    StackOverflow,
    /// The task stack was popped while empty.
    StackUnderflow,
    /// An accessor was called with the wrong tag (e.g. `value` on a cell).
    TypeError { expected: &'static str, index: usize },
    /// `slot` was called with an axis less than 1.
    BadAxis(u64),
    /// `slot` navigated into an atom while more of the axis remained.
    SlotOutOfRange { axis: u64, index: usize },
    /// The formula being evaluated is an atom, not a cell.
    NotAFormula(usize),
    /// The formula's head was a cell (autocons) or named an opcode outside 0..=11.
    UnsupportedFormula(usize),
    /// A formula named an opcode outside 0..=11. Distinguished from
    /// `UnsupportedFormula` so callers can tell "autocons" from "bad opcode".
    UnsupportedOp(u64),
    /// Op 6's condition evaluated to something other than 0 or 1.
    BadBooleanCondition(u64),
    /// Op 4 was applied to a cell.
    NonAtomIncrement(usize),
    /// Op 5 was applied to an atom (it requires a cell to compare head/tail).
    NonCellEquality(usize),
    /// The optional trampoline step budget was exceeded.
    StepLimitExceeded { budget: u64 },
    /// `configure_gc` was given an invalid option (out-of-range fraction, etc.).
    ConfigError(String),
    /// `nock` was called re-entrantly on the same `NockContext`.
    AlreadyRunning,
}

impl fmt::Display for NockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NockError::MalformedNoun(msg) => write!(f, "malformed noun: {msg}"),
            NockError::NounTooDeep { limit } => {
                write!(f, "noun exceeds maximum materialisation depth ({limit})")
            }
            NockError::HeapOverflow => write!(f, "heap overflow: allocator exhausted"),
            NockError::StackOverflow => write!(f, "task stack overflow"),
            NockError::StackUnderflow => write!(f, "task stack underflow"),
            NockError::TypeError { expected, index } => {
                write!(f, "type error: expected {expected} at index {index}")
            }
            NockError::BadAxis(n) => write!(f, "bad axis: {n} (axes start at 1)"),
            NockError::SlotOutOfRange { axis, index } => {
                write!(f, "slot out of range: axis {axis} hit atom at index {index}")
            }
            NockError::NotAFormula(idx) => {
                write!(f, "not a formula: atom at index {idx} cannot be evaluated")
            }
            NockError::UnsupportedFormula(idx) => {
                write!(f, "unsupported formula shape at index {idx} (autocons)")
            }
            NockError::UnsupportedOp(op) => write!(f, "unsupported op{op}"),
            NockError::BadBooleanCondition(v) => {
                write!(f, "op6 condition must be 0 or 1, got {v}")
            }
            NockError::NonAtomIncrement(idx) => {
                write!(f, "op4 requires an atom, found cell at index {idx}")
            }
            NockError::NonCellEquality(idx) => {
                write!(f, "op5 requires a cell, found atom at index {idx}")
            }
            NockError::StepLimitExceeded { budget } => {
                write!(f, "step limit exceeded ({budget} trampoline steps)")
            }
            NockError::ConfigError(msg) => write!(f, "invalid configuration: {msg}"),
            NockError::AlreadyRunning => {
                write!(f, "nock() was called re-entrantly on a busy context")
            }
        }
    }
}

impl std::error::Error for NockError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        let err = NockError::BadAxis(0);
        assert_eq!(err.to_string(), "bad axis: 0 (axes start at 1)");
    }

    #[test]
    fn errors_are_comparable() {
        assert_eq!(NockError::StackOverflow, NockError::StackOverflow);
        assert_ne!(NockError::StackOverflow, NockError::StackUnderflow);
    }
}
