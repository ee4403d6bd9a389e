//! Debug Adapter Protocol server for embedded scripting runtimes.
//!
//! The server speaks Content-Length framed JSON over TCP and drives a
//! [`scriptdbg_runtime::debug::DebugControl`] shared with the traced thread.

mod adapter;
pub mod config;
mod protocol;
mod server;
pub mod source;

pub use adapter::{AdapterOptions, DebugAdapter};
pub use config::{ConfigError, ConfigOverrides, DebuggerConfig};
pub use protocol::{
    Breakpoint, Capabilities, ContinueArguments, ContinueResponseBody, DisconnectArguments,
    EvaluateArguments, EvaluateResponseBody, Event, ExceptionBreakpointsFilter, ExceptionOptions,
    InitializeArguments, InitializeResponseBody, MessageType, NextArguments, OutputEventBody,
    PauseArguments, Request, Response, Scope, ScopesArguments, ScopesResponseBody,
    SetBreakpointsArguments, SetBreakpointsResponseBody, SetExceptionBreakpointsArguments, Source,
    SourceArguments, SourceBreakpoint, SourceResponseBody, StackFrame, StackTraceArguments,
    StackTraceResponseBody, StepInArguments, StepOutArguments, StoppedEventBody,
    TerminatedEventBody, Thread, ThreadsResponseBody, Variable, VariablesArguments,
    VariablesResponseBody,
};
pub use server::DebugServer;
pub use source::{FsSourceResolver, MemorySourceResolver, SourceError, SourceResolver};
