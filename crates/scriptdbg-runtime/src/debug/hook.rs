//! Runtime trace and introspection interfaces.

#![allow(missing_docs)]

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::EvalError;
use crate::value::Value;

/// Identity of one live call activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Borrowed view of a runtime call frame.
///
/// Handles are only valid for the duration of the trace event that delivered them.
pub trait RuntimeFrame {
    /// Identity of this activation.
    fn id(&self) -> FrameId;

    /// Raw file identifier as reported by the runtime.
    fn file(&self) -> &str;

    /// Function name.
    fn name(&self) -> &str;

    /// Currently executing line.
    fn line(&self) -> u32;

    /// First line of the function definition.
    fn first_line(&self) -> u32;

    /// Calling frame, if any.
    fn caller(&self) -> Option<&dyn RuntimeFrame>;

    /// Whether an exception raised right now would be caught inside this frame.
    fn has_exception_handler(&self) -> bool {
        false
    }

    /// Copy of the frame's local variables.
    fn locals(&self) -> IndexMap<SmolStr, Value>;

    /// Copy of the frame's global variables.
    fn globals(&self) -> IndexMap<SmolStr, Value>;

    /// Source text for frames whose file is a synthetic `<...>` identifier.
    fn synthetic_source(&self) -> Option<String> {
        None
    }
}

/// Evaluates source snippets against a frame.
pub trait Evaluator {
    fn evaluate(&self, frame: &dyn RuntimeFrame, source: &str) -> Result<Value, EvalError>;
}

/// Frame plus evaluator handed to the hook with every event.
#[derive(Clone, Copy)]
pub struct TraceContext<'a> {
    pub frame: &'a dyn RuntimeFrame,
    pub evaluator: &'a dyn Evaluator,
}

impl<'a> TraceContext<'a> {
    #[must_use]
    pub fn new(frame: &'a dyn RuntimeFrame, evaluator: &'a dyn Evaluator) -> Self {
        Self { frame, evaluator }
    }
}

/// Exception payload of an exception event.
pub struct ExceptionInfo<'a> {
    pub type_name: SmolStr,
    pub message: SmolStr,
    /// Frames from the one receiving the event toward the raise site.
    pub traceback: Vec<&'a dyn RuntimeFrame>,
}

impl ExceptionInfo<'_> {
    /// `Type: message` text shown to clients.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.message.is_empty() {
            self.type_name.to_string()
        } else {
            format!("{}: {}", self.type_name, self.message)
        }
    }
}

/// Execution events delivered serially on the traced thread.
#[derive(Clone, Copy)]
pub enum TraceEvent<'a> {
    Call,
    Line,
    /// `None` when the frame exits because of an exception or unwind.
    Return(Option<&'a Value>),
    Exception(&'a ExceptionInfo<'a>),
}

impl TraceEvent<'_> {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TraceEvent::Call => "call",
            TraceEvent::Line => "line",
            TraceEvent::Return(_) => "return",
            TraceEvent::Exception(_) => "exception",
        }
    }
}

/// Decision returned to the runtime for each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceAction {
    Continue,
    /// Quit requested; the runtime should abort execution promptly.
    Unwind,
}

/// Per-event callback registered with the runtime.
pub trait TraceHook {
    fn on_event(&self, ctx: TraceContext<'_>, event: TraceEvent<'_>) -> TraceAction;
}

/// Hook that never intervenes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTraceHook;

impl TraceHook for NoopTraceHook {
    fn on_event(&self, _ctx: TraceContext<'_>, _event: TraceEvent<'_>) -> TraceAction {
        TraceAction::Continue
    }
}
