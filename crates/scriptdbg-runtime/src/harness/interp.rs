//! Tree-walking interpreter that reports execution through a [`TraceHook`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::debug::{
    Evaluator, ExceptionInfo, FrameId, RuntimeFrame, TraceAction, TraceContext, TraceEvent,
    TraceHook,
};
use crate::error::EvalError;
use crate::value::Value;

use super::expr::{self, Env};
use super::frame::{SimFrame, TracebackFrame};
use super::program::{Function, Program, Stmt, StmtKind};

const MAX_DEPTH: usize = 200;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Value),
    /// Uncaught exception.
    Raised { type_name: SmolStr, message: SmolStr },
    /// The trace hook asked to unwind.
    Aborted,
}

pub(crate) enum Fault {
    Raised(Raised),
    Aborted,
}

pub(crate) struct Raised {
    error: EvalError,
    // Frames already left, nearest first.
    traceback: Vec<TracebackFrame>,
    // Exception event already delivered in the current frame.
    reported: bool,
}

impl From<EvalError> for Fault {
    fn from(error: EvalError) -> Self {
        match error {
            EvalError::Aborted => Fault::Aborted,
            error => Fault::Raised(Raised {
                error,
                traceback: Vec::new(),
                reported: false,
            }),
        }
    }
}

impl Fault {
    fn leaving(self, frame: &dyn RuntimeFrame) -> Self {
        match self {
            Fault::Raised(mut raised) => {
                raised.traceback.insert(0, TracebackFrame::capture(frame));
                raised.reported = false;
                Fault::Raised(raised)
            }
            Fault::Aborted => Fault::Aborted,
        }
    }

    fn into_eval_error(self) -> EvalError {
        match self {
            Fault::Raised(raised) => raised.error,
            Fault::Aborted => EvalError::Aborted,
        }
    }
}

enum Flow {
    Normal,
    Return(Value),
}

fn exception_message(error: &EvalError) -> SmolStr {
    match error {
        EvalError::Raised { message, .. } => message.clone(),
        other => other.to_string().into(),
    }
}

/// Executes a [`Program`] on the calling thread.
pub struct Interpreter<'p> {
    program: &'p Program,
    hook: &'p dyn TraceHook,
    globals: RefCell<IndexMap<SmolStr, Value>>,
    sources: HashMap<SmolStr, String>,
    next_frame: Cell<u64>,
    depth: Cell<usize>,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, hook: &'p dyn TraceHook) -> Self {
        let sources = program
            .files()
            .into_iter()
            .filter(|file| file.starts_with('<') && file.ends_with('>'))
            .filter_map(|file| program.render_file(&file).map(|text| (file, text)))
            .collect();
        Self {
            program,
            hook,
            globals: RefCell::new(program.globals().clone()),
            sources,
            next_frame: Cell::new(0),
            depth: Cell::new(0),
        }
    }

    /// Run the program's entry function.
    pub fn run(&self) -> RunOutcome {
        self.call(self.program.entry(), Vec::new())
    }

    /// Call one function as the outermost frame.
    pub fn call(&self, name: &str, args: Vec<Value>) -> RunOutcome {
        let Some(function) = self.program.get(name) else {
            return RunOutcome::Raised {
                type_name: "NameError".into(),
                message: format!("name '{name}' is not defined").into(),
            };
        };
        match self.invoke(function, args, None) {
            Ok(value) => RunOutcome::Completed(value),
            Err(Fault::Raised(raised)) => RunOutcome::Raised {
                type_name: raised.error.exception_type(),
                message: exception_message(&raised.error),
            },
            Err(Fault::Aborted) => RunOutcome::Aborted,
        }
    }

    /// Copy of the current globals.
    #[must_use]
    pub fn globals(&self) -> IndexMap<SmolStr, Value> {
        self.globals.borrow().clone()
    }

    fn emit(&self, frame: &dyn RuntimeFrame, event: TraceEvent<'_>) -> Result<(), Fault> {
        match self.hook.on_event(TraceContext::new(frame, self), event) {
            TraceAction::Continue => Ok(()),
            TraceAction::Unwind => Err(Fault::Aborted),
        }
    }

    fn invoke(
        &self,
        function: &Function,
        args: Vec<Value>,
        caller: Option<&dyn RuntimeFrame>,
    ) -> Result<Value, Fault> {
        if args.len() != function.params().len() {
            return Err(EvalError::InvalidArgumentCount {
                name: function.name().into(),
                expected: function.params().len(),
                got: args.len(),
            }
            .into());
        }
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            return Err(EvalError::Raised {
                type_name: "RecursionError".into(),
                message: "maximum recursion depth exceeded".into(),
            }
            .into());
        }
        let id = self.next_frame.get() + 1;
        self.next_frame.set(id);
        let locals = function.params().iter().cloned().zip(args).collect();
        let source = self.sources.get(function.file()).map(String::as_str);
        let frame = SimFrame::new(FrameId(id), function, caller, locals, &self.globals, source);

        self.depth.set(depth + 1);
        let result = self
            .emit(&frame, TraceEvent::Call)
            .and_then(|()| self.exec_block(&frame, function.statements()));
        let outcome = match result {
            Ok(flow) => {
                let value = match flow {
                    Flow::Return(value) => value,
                    Flow::Normal => Value::None,
                };
                self.emit(&frame, TraceEvent::Return(Some(&value)))
                    .map(|()| value)
            }
            Err(fault) => {
                let _ = self.emit(&frame, TraceEvent::Return(None));
                Err(fault.leaving(&frame))
            }
        };
        self.depth.set(depth);
        outcome
    }

    fn exec_block(&self, frame: &SimFrame<'_>, body: &[Stmt]) -> Result<Flow, Fault> {
        for stmt in body {
            frame.set_line(stmt.line());
            self.emit(frame, TraceEvent::Line)?;
            match self.exec_stmt(frame, stmt) {
                Ok(Flow::Normal) => {}
                Ok(flow) => return Ok(flow),
                Err(Fault::Raised(mut raised)) if !raised.reported => {
                    raised.reported = true;
                    self.report(frame, &raised)?;
                    return Err(Fault::Raised(raised));
                }
                Err(fault) => return Err(fault),
            }
        }
        Ok(Flow::Normal)
    }

    fn report(&self, frame: &dyn RuntimeFrame, raised: &Raised) -> Result<(), Fault> {
        let mut traceback: Vec<&dyn RuntimeFrame> = vec![frame];
        traceback.extend(
            raised
                .traceback
                .iter()
                .map(|captured| captured as &dyn RuntimeFrame),
        );
        let info = ExceptionInfo {
            type_name: raised.error.exception_type(),
            message: exception_message(&raised.error),
            traceback,
        };
        self.emit(frame, TraceEvent::Exception(&info))
    }

    fn exec_stmt(&self, frame: &SimFrame<'_>, stmt: &Stmt) -> Result<Flow, Fault> {
        match stmt.kind() {
            StmtKind::Assign { target, expr } => {
                let value = self.eval_in(frame, expr)?;
                frame.locals.borrow_mut().insert(target.clone(), value);
            }
            StmtKind::Global { target, expr } => {
                let value = self.eval_in(frame, expr)?;
                self.globals.borrow_mut().insert(target.clone(), value);
            }
            StmtKind::Expr(source) => {
                self.eval_in(frame, source)?;
            }
            StmtKind::Return(Some(source)) => return Ok(Flow::Return(self.eval_in(frame, source)?)),
            StmtKind::Return(None) => return Ok(Flow::Return(Value::None)),
            StmtKind::Raise { type_name, message } => {
                let message = self.eval_in(frame, message)?;
                return Err(EvalError::Raised {
                    type_name: type_name.clone(),
                    message: message.to_string().into(),
                }
                .into());
            }
            StmtKind::Try {
                body,
                handler_line,
                handler,
            } => {
                frame.enter_handler();
                let result = self.exec_block(frame, body);
                frame.leave_handler();
                return match result {
                    Err(Fault::Raised(_)) => {
                        frame.set_line(*handler_line);
                        self.emit(frame, TraceEvent::Line)?;
                        self.exec_block(frame, handler)
                    }
                    other => other,
                };
            }
            StmtKind::Pass => {}
        }
        Ok(Flow::Normal)
    }

    fn eval_in(&self, frame: &SimFrame<'_>, source: &str) -> Result<Value, Fault> {
        let parsed = expr::parse(source)?;
        let env = FrameEnv {
            interp: self,
            frame,
            locals: Locals::Live(&frame.locals),
        };
        expr::eval(&env, &parsed)
    }
}

impl Evaluator for Interpreter<'_> {
    fn evaluate(&self, frame: &dyn RuntimeFrame, source: &str) -> Result<Value, EvalError> {
        let parsed = expr::parse(source)?;
        let env = FrameEnv {
            interp: self,
            frame,
            locals: Locals::Copied(frame.locals()),
        };
        expr::eval(&env, &parsed).map_err(Fault::into_eval_error)
    }
}

enum Locals<'e> {
    Live(&'e RefCell<IndexMap<SmolStr, Value>>),
    Copied(IndexMap<SmolStr, Value>),
}

struct FrameEnv<'e, 'p> {
    interp: &'e Interpreter<'p>,
    frame: &'e dyn RuntimeFrame,
    locals: Locals<'e>,
}

impl Env for FrameEnv<'_, '_> {
    type Error = Fault;

    fn lookup(&self, name: &str) -> Option<Value> {
        let local = match &self.locals {
            Locals::Live(cell) => cell.borrow().get(name).cloned(),
            Locals::Copied(map) => map.get(name).cloned(),
        };
        local.or_else(|| self.interp.globals.borrow().get(name).cloned())
    }

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, Fault> {
        if let Some(function) = self.interp.program.get(name) {
            return self.interp.invoke(function, args, Some(self.frame));
        }
        match expr::call_builtin(name, &args) {
            Some(result) => result.map_err(Fault::from),
            None => Err(EvalError::NotCallable(name.into()).into()),
        }
    }
}
