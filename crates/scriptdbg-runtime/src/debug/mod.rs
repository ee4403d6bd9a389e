//! Debugging support: breakpoint registry, trace dispatch and the session bridge.

#![allow(missing_docs)]

mod breakpoints;
mod control;
mod dispatch;
mod frontend;
mod hook;
mod types;

pub use breakpoints::{canonical_path, Breakpoint, BreakpointRegistry, BreakpointSpec};
pub use control::{ControlAction, ControlOutcome, DebugControl, EvaluationGuard, Suspension};
pub use dispatch::TraceDispatcher;
pub use frontend::{BridgeFrontend, DebugFrontend};
pub use hook::{
    ExceptionInfo, Evaluator, FrameId, NoopTraceHook, RuntimeFrame, TraceAction, TraceContext,
    TraceEvent, TraceHook,
};
pub use types::{
    DebugLog, DebugStatus, DebugStop, DebugStopReason, DisconnectPolicy, ExceptionMode,
    ExecutionSnapshot, FrameSnapshot, SessionWait, SteppingMode,
};
