//! Frames of the simulated runtime.

use std::cell::{Cell, RefCell};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::debug::{FrameId, RuntimeFrame};
use crate::value::Value;

use super::program::Function;

/// Live activation of a program function.
pub struct SimFrame<'a> {
    id: FrameId,
    function: &'a Function,
    caller: Option<&'a dyn RuntimeFrame>,
    line: Cell<u32>,
    pub(crate) locals: RefCell<IndexMap<SmolStr, Value>>,
    globals: &'a RefCell<IndexMap<SmolStr, Value>>,
    source: Option<&'a str>,
    handlers: Cell<u32>,
}

impl<'a> SimFrame<'a> {
    pub(crate) fn new(
        id: FrameId,
        function: &'a Function,
        caller: Option<&'a dyn RuntimeFrame>,
        locals: IndexMap<SmolStr, Value>,
        globals: &'a RefCell<IndexMap<SmolStr, Value>>,
        source: Option<&'a str>,
    ) -> Self {
        Self {
            id,
            function,
            caller,
            line: Cell::new(function.first_line()),
            locals: RefCell::new(locals),
            globals,
            source,
            handlers: Cell::new(0),
        }
    }

    pub(crate) fn set_line(&self, line: u32) {
        self.line.set(line);
    }

    pub(crate) fn enter_handler(&self) {
        self.handlers.set(self.handlers.get() + 1);
    }

    pub(crate) fn leave_handler(&self) {
        self.handlers.set(self.handlers.get().saturating_sub(1));
    }
}

impl RuntimeFrame for SimFrame<'_> {
    fn id(&self) -> FrameId {
        self.id
    }

    fn file(&self) -> &str {
        self.function.file()
    }

    fn name(&self) -> &str {
        self.function.name()
    }

    fn line(&self) -> u32 {
        self.line.get()
    }

    fn first_line(&self) -> u32 {
        self.function.first_line()
    }

    fn caller(&self) -> Option<&dyn RuntimeFrame> {
        self.caller
    }

    fn has_exception_handler(&self) -> bool {
        self.handlers.get() > 0
    }

    fn locals(&self) -> IndexMap<SmolStr, Value> {
        self.locals.borrow().clone()
    }

    fn globals(&self) -> IndexMap<SmolStr, Value> {
        self.globals.borrow().clone()
    }

    fn synthetic_source(&self) -> Option<String> {
        self.source.map(str::to_string)
    }
}

/// Copy of a frame the exception already propagated out of.
#[derive(Debug, Clone)]
pub struct TracebackFrame {
    id: FrameId,
    file: SmolStr,
    name: SmolStr,
    line: u32,
    first_line: u32,
    locals: IndexMap<SmolStr, Value>,
    globals: IndexMap<SmolStr, Value>,
    source: Option<String>,
}

impl TracebackFrame {
    pub(crate) fn capture(frame: &dyn RuntimeFrame) -> Self {
        Self {
            id: frame.id(),
            file: frame.file().into(),
            name: frame.name().into(),
            line: frame.line(),
            first_line: frame.first_line(),
            locals: frame.locals(),
            globals: frame.globals(),
            source: frame.synthetic_source(),
        }
    }
}

impl RuntimeFrame for TracebackFrame {
    fn id(&self) -> FrameId {
        self.id
    }

    fn file(&self) -> &str {
        &self.file
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn line(&self) -> u32 {
        self.line
    }

    fn first_line(&self) -> u32 {
        self.first_line
    }

    fn caller(&self) -> Option<&dyn RuntimeFrame> {
        None
    }

    fn locals(&self) -> IndexMap<SmolStr, Value> {
        self.locals.clone()
    }

    fn globals(&self) -> IndexMap<SmolStr, Value> {
        self.globals.clone()
    }

    fn synthetic_source(&self) -> Option<String> {
        self.source.clone()
    }
}
