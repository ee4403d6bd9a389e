//! Trace dispatch: per-event stop, step and breakpoint decisions.

#![allow(missing_docs)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use tracing::trace;

use crate::value::Value;

use super::breakpoints::Breakpoint;
use super::control::DebugControl;
use super::frontend::DebugFrontend;
use super::hook::{
    ExceptionInfo, FrameId, RuntimeFrame, TraceAction, TraceContext, TraceEvent, TraceHook,
};
use super::types::{ExceptionMode, SteppingMode};

/// Trace hook driving a debuggee front-end.
///
/// Lives on the traced thread; shared state goes through the [`DebugControl`].
pub struct TraceDispatcher<F> {
    control: DebugControl,
    frontend: F,
    ignored: RefCell<HashSet<FrameId>>,
    // Frames that have not executed a line yet; function-level breakpoints apply there.
    fresh: RefCell<HashSet<FrameId>>,
    entered: Cell<bool>,
    outermost: Cell<Option<FrameId>>,
}

impl<F: DebugFrontend> TraceDispatcher<F> {
    #[must_use]
    pub fn new(control: DebugControl, frontend: F) -> Self {
        Self {
            control,
            frontend,
            ignored: RefCell::new(HashSet::new()),
            fresh: RefCell::new(HashSet::new()),
            entered: Cell::new(false),
            outermost: Cell::new(None),
        }
    }

    #[must_use]
    pub fn control(&self) -> &DebugControl {
        &self.control
    }

    #[must_use]
    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// Forget all per-run state; the next call is treated as program entry.
    pub fn reset(&self) {
        self.ignored.borrow_mut().clear();
        self.fresh.borrow_mut().clear();
        self.entered.set(false);
        self.outermost.set(None);
        self.control.reset_stepping();
    }

    fn dispatch_call(&self, ctx: TraceContext<'_>) -> TraceAction {
        let id = ctx.frame.id();
        if !self.entered.get() {
            self.entered.set(true);
            self.outermost.set(Some(id));
            self.fresh.borrow_mut().insert(id);
            self.frontend.on_entry(ctx);
            return self.after_user();
        }
        let stepping = self.control.stepping();
        if !stepping.stops_at(id) && !self.control.has_breakpoints_in(ctx.frame.file()) {
            self.ignored.borrow_mut().insert(id);
            return TraceAction::Continue;
        }
        self.fresh.borrow_mut().insert(id);
        self.frontend.on_call(ctx);
        self.after_user()
    }

    fn dispatch_line(&self, ctx: TraceContext<'_>) -> TraceAction {
        let id = ctx.frame.id();
        if self.ignored.borrow().contains(&id) {
            return TraceAction::Continue;
        }
        let function_level = self.fresh.borrow_mut().remove(&id);
        if self.control.stepping().stops_at(id) {
            self.frontend.on_line(ctx, None);
        } else if let Some(breakpoint) = self.break_here(ctx, function_level) {
            self.frontend.on_line(ctx, Some(&breakpoint));
        }
        self.after_user()
    }

    fn dispatch_return(&self, ctx: TraceContext<'_>, value: Option<&Value>) -> TraceAction {
        let id = ctx.frame.id();
        self.fresh.borrow_mut().remove(&id);
        if self.ignored.borrow_mut().remove(&id) {
            return TraceAction::Continue;
        }
        let stepping = self.control.stepping();
        let is_target = stepping.return_frame() == Some(id);
        if is_target {
            let caller = ctx.frame.caller();
            let retarget = caller.map_or(SteppingMode::Continue, |caller| {
                SteppingMode::StepUntilReturn {
                    frame: caller.id(),
                    caller: caller.caller().map(RuntimeFrame::id),
                }
            });
            // Only retarget if no command replaced the mode in between.
            self.control
                .update_stepping(|mode| if mode == stepping { retarget } else { mode });
        }
        if is_target || stepping.stops_at(id) {
            self.frontend.on_return(ctx, value);
        }
        if self.outermost.get() == Some(id) {
            let action = self.after_user();
            self.reset();
            return action;
        }
        self.after_user()
    }

    fn dispatch_exception(&self, ctx: TraceContext<'_>, exception: &ExceptionInfo<'_>) -> TraceAction {
        let should_stop = match self.control.exception_mode() {
            ExceptionMode::All => true,
            ExceptionMode::Unhandled => !handler_on_stack(ctx.frame),
            ExceptionMode::Never => false,
        } || self.control.stepping().stops_at(ctx.frame.id());
        if should_stop {
            self.frontend.on_exception(ctx, exception);
        }
        self.after_user()
    }

    /// Effective breakpoint for the frame's current line, if any.
    fn break_here(&self, ctx: TraceContext<'_>, function_level: bool) -> Option<Breakpoint> {
        let frame = ctx.frame;
        let (key, line, candidates) = self.control.with_registry(|registry| {
            let key = registry.canonicalize(frame.file());
            let line =
                registry.effective_line(&key, frame.line(), frame.first_line(), function_level)?;
            let candidates = registry.enabled_at(&key, line);
            Some((key, line, candidates))
        })?;

        for (id, condition) in candidates {
            if !self
                .control
                .with_registry(|registry| registry.record_hit(&key, line, id))
            {
                continue;
            }
            if let Some(condition) = condition {
                let result = {
                    let _guard = self.control.enter_evaluation();
                    ctx.evaluator.evaluate(frame, &condition)
                };
                match result {
                    Ok(value) if !value.is_truthy() => continue,
                    Ok(_) => {}
                    // A failing condition counts as true.
                    Err(err) => {
                        let breakpoint = self
                            .control
                            .with_registry(|registry| registry.get(&key, line, id));
                        if let Some(breakpoint) = breakpoint {
                            self.frontend.on_breakpoint_error(&breakpoint, &err);
                        }
                    }
                }
            }
            let hit = self
                .control
                .with_registry(|registry| registry.resolve_hit(&key, line, id));
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    fn after_user(&self) -> TraceAction {
        if self.control.stepping().is_quitting() {
            TraceAction::Unwind
        } else {
            TraceAction::Continue
        }
    }
}

impl<F: DebugFrontend> TraceHook for TraceDispatcher<F> {
    fn on_event(&self, ctx: TraceContext<'_>, event: TraceEvent<'_>) -> TraceAction {
        if self.control.is_evaluating() {
            return TraceAction::Continue;
        }
        if self.control.stepping().is_quitting() {
            if matches!(event, TraceEvent::Return(_)) && self.outermost.get() == Some(ctx.frame.id())
            {
                self.reset();
            }
            return TraceAction::Unwind;
        }
        trace!(
            event = event.kind(),
            frame = ctx.frame.name(),
            line = ctx.frame.line(),
            "trace event"
        );
        match event {
            TraceEvent::Call => self.dispatch_call(ctx),
            TraceEvent::Line => self.dispatch_line(ctx),
            TraceEvent::Return(value) => self.dispatch_return(ctx, value),
            TraceEvent::Exception(exception) => self.dispatch_exception(ctx, exception),
        }
    }
}

fn handler_on_stack(frame: &dyn RuntimeFrame) -> bool {
    let mut cursor = Some(frame);
    while let Some(current) = cursor {
        if current.has_exception_handler() {
            return true;
        }
        cursor = current.caller();
    }
    false
}
