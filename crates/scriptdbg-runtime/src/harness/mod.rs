//! Simulated scripting runtime: a program model, an interpreter that emits trace events, and a
//! non-blocking scripted front-end.

#![allow(missing_docs)]

mod demo;
mod expr;
mod frame;
mod interp;
mod program;
mod scripted;

pub use demo::{demo_program, DEMO_FILE, DEMO_PRICING};
pub use expr::{parse, BinaryOp, Expr};
pub use frame::{SimFrame, TracebackFrame};
pub use interp::{Interpreter, RunOutcome};
pub use program::{Function, Program, Stmt, StmtKind};
pub use scripted::{ScriptedCommand, ScriptedFrontend, StopRecord};
