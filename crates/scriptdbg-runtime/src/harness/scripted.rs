//! Front-end that records stops and replays queued commands without blocking.

use std::cell::RefCell;
use std::collections::VecDeque;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::debug::{
    Breakpoint, DebugControl, DebugFrontend, DebugStopReason, ExceptionInfo, RuntimeFrame,
    SteppingMode, TraceContext,
};
use crate::error::EvalError;
use crate::value::Value;

/// Command applied when the front-end stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedCommand {
    StepInto,
    StepOver,
    StepReturn,
    Continue,
    /// Leave the stepping mode untouched.
    Keep,
    Quit,
}

/// One observed stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRecord {
    pub reason: DebugStopReason,
    pub function: SmolStr,
    pub line: u32,
    pub locals: IndexMap<SmolStr, Value>,
    pub breakpoint: Option<u32>,
    pub exception: Option<String>,
    pub return_value: Option<Value>,
}

impl StopRecord {
    /// `function:line` shorthand.
    #[must_use]
    pub fn at(&self) -> String {
        format!("{}:{}", self.function, self.line)
    }
}

/// Single-threaded stand-in for an interactive client.
///
/// Each stop pops the next queued command; an empty queue continues.
pub struct ScriptedFrontend {
    control: DebugControl,
    stop_on_entry: bool,
    commands: RefCell<VecDeque<ScriptedCommand>>,
    stops: RefCell<Vec<StopRecord>>,
    errors: RefCell<Vec<String>>,
}

impl ScriptedFrontend {
    #[must_use]
    pub fn new(control: DebugControl) -> Self {
        Self {
            control,
            stop_on_entry: false,
            commands: RefCell::new(VecDeque::new()),
            stops: RefCell::new(Vec::new()),
            errors: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_stop_on_entry(mut self) -> Self {
        self.stop_on_entry = true;
        self
    }

    #[must_use]
    pub fn with_commands(self, commands: impl IntoIterator<Item = ScriptedCommand>) -> Self {
        self.commands.borrow_mut().extend(commands);
        self
    }

    #[must_use]
    pub fn stops(&self) -> Vec<StopRecord> {
        self.stops.borrow().clone()
    }

    /// Locations of all stops as `function:line`.
    #[must_use]
    pub fn stop_locations(&self) -> Vec<String> {
        self.stops.borrow().iter().map(StopRecord::at).collect()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }

    fn stop(
        &self,
        ctx: TraceContext<'_>,
        reason: DebugStopReason,
        breakpoint: Option<u32>,
        exception: Option<String>,
        return_value: Option<&Value>,
    ) {
        let frame = ctx.frame;
        self.stops.borrow_mut().push(StopRecord {
            reason,
            function: frame.name().into(),
            line: frame.line(),
            locals: frame.locals(),
            breakpoint,
            exception,
            return_value: return_value.cloned(),
        });
        let command = self
            .commands
            .borrow_mut()
            .pop_front()
            .unwrap_or(ScriptedCommand::Continue);
        let mode = match command {
            ScriptedCommand::StepInto => SteppingMode::StepInto,
            ScriptedCommand::StepOver => SteppingMode::StepToFrame(frame.id()),
            ScriptedCommand::StepReturn => SteppingMode::StepUntilReturn {
                frame: frame.id(),
                caller: frame.caller().map(RuntimeFrame::id),
            },
            ScriptedCommand::Continue => SteppingMode::Continue,
            ScriptedCommand::Keep => return,
            ScriptedCommand::Quit => SteppingMode::Quitting,
        };
        self.control.set_stepping(mode);
    }
}

impl DebugFrontend for ScriptedFrontend {
    fn on_entry(&self, ctx: TraceContext<'_>) {
        if self.stop_on_entry {
            self.stop(ctx, DebugStopReason::Entry, None, None, None);
        }
    }

    fn on_call(&self, _ctx: TraceContext<'_>) {}

    fn on_line(&self, ctx: TraceContext<'_>, breakpoint: Option<&Breakpoint>) {
        let reason = if breakpoint.is_some() {
            DebugStopReason::Breakpoint
        } else {
            DebugStopReason::Step
        };
        self.stop(ctx, reason, breakpoint.map(Breakpoint::id), None, None);
    }

    fn on_return(&self, ctx: TraceContext<'_>, value: Option<&Value>) {
        self.stop(ctx, DebugStopReason::Step, None, None, value);
    }

    fn on_exception(&self, ctx: TraceContext<'_>, exception: &ExceptionInfo<'_>) {
        self.stop(
            ctx,
            DebugStopReason::Exception,
            None,
            Some(exception.describe()),
            None,
        );
    }

    fn on_breakpoint_error(&self, breakpoint: &Breakpoint, error: &EvalError) {
        self.errors
            .borrow_mut()
            .push(format!("breakpoint {}: {error}", breakpoint.id()));
    }
}
