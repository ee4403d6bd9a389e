//! `scriptdbg-runtime` - trace-driven debug engine for embedded scripting runtimes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Breakpoints, trace dispatch and the session bridge.
pub mod debug;
/// Evaluation and debugger errors.
pub mod error;
/// Simulated scripting runtime for tests and demos.
pub mod harness;
/// Owned inspection values.
pub mod value;
