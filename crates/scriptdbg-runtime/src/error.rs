//! Evaluation and debugger errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Failures reported by the runtime evaluation interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Expression text could not be parsed.
    #[error("invalid syntax: {0}")]
    Syntax(SmolStr),

    /// Name not found in locals or globals.
    #[error("name '{0}' is not defined")]
    UndefinedName(SmolStr),

    /// Unknown callable.
    #[error("'{0}' is not callable")]
    NotCallable(SmolStr),

    /// Invalid argument count for a call.
    #[error("{name}() takes {expected} arguments ({got} given)")]
    InvalidArgumentCount {
        name: SmolStr,
        expected: usize,
        got: usize,
    },

    /// Operator applied to incompatible operands.
    #[error("unsupported operand type(s) for {op}: '{left}' and '{right}'")]
    UnsupportedOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer overflow.
    #[error("integer overflow")]
    Overflow,

    /// The evaluated code raised a runtime exception.
    #[error("{type_name}: {message}")]
    Raised { type_name: SmolStr, message: SmolStr },

    /// Evaluation was abandoned because the debugger is quitting.
    #[error("evaluation aborted")]
    Aborted,
}

impl EvalError {
    /// Exception type name used when the error surfaces inside the debuggee.
    #[must_use]
    pub fn exception_type(&self) -> SmolStr {
        match self {
            EvalError::Syntax(_) => "SyntaxError".into(),
            EvalError::UndefinedName(_) => "NameError".into(),
            EvalError::NotCallable(_)
            | EvalError::InvalidArgumentCount { .. }
            | EvalError::UnsupportedOperands { .. } => "TypeError".into(),
            EvalError::DivisionByZero => "ZeroDivisionError".into(),
            EvalError::Overflow => "OverflowError".into(),
            EvalError::Raised { type_name, .. } => type_name.clone(),
            EvalError::Aborted => "DebuggerQuit".into(),
        }
    }
}

/// Failures of session bridge operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugError {
    /// The operation needs a suspended debuggee.
    #[error("debuggee is not stopped")]
    NotStopped,

    /// Frame index outside the current execution snapshot.
    #[error("unknown frame index {0}")]
    UnknownFrame(usize),

    /// The traced thread did not service the request in time.
    #[error("timed out waiting for the traced thread")]
    Timeout,

    /// Evaluation failed inside the debuggee.
    #[error(transparent)]
    Eval(#[from] EvalError),
}
