//! Debuggee front-ends invoked by the dispatcher.

#![allow(missing_docs)]

use tracing::{debug, warn};

use crate::error::EvalError;
use crate::value::Value;

use super::breakpoints::Breakpoint;
use super::control::{DebugControl, Suspension};
use super::hook::{ExceptionInfo, TraceContext};
use super::types::{DebugStopReason, SessionWait};

/// Handlers the dispatcher calls once it decided an event matters.
pub trait DebugFrontend {
    /// First call since the last reset.
    fn on_entry(&self, ctx: TraceContext<'_>);

    /// Call into a frame that is not ignored.
    fn on_call(&self, ctx: TraceContext<'_>);

    /// Line that stops, because of stepping (`None`) or an effective breakpoint.
    fn on_line(&self, ctx: TraceContext<'_>, breakpoint: Option<&Breakpoint>);

    fn on_return(&self, ctx: TraceContext<'_>, value: Option<&Value>);

    fn on_exception(&self, ctx: TraceContext<'_>, exception: &ExceptionInfo<'_>);

    /// A breakpoint condition failed to evaluate; the breakpoint is treated as hit.
    fn on_breakpoint_error(&self, breakpoint: &Breakpoint, error: &EvalError);
}

/// Front-end that suspends through the session bridge for a remote client.
#[derive(Debug, Clone)]
pub struct BridgeFrontend {
    control: DebugControl,
    stop_on_entry: bool,
    session_wait: SessionWait,
}

impl BridgeFrontend {
    #[must_use]
    pub fn new(control: DebugControl) -> Self {
        Self {
            control,
            stop_on_entry: true,
            session_wait: SessionWait::default(),
        }
    }

    #[must_use]
    pub fn with_stop_on_entry(mut self, stop_on_entry: bool) -> Self {
        self.stop_on_entry = stop_on_entry;
        self
    }

    #[must_use]
    pub fn with_session_wait(mut self, wait: SessionWait) -> Self {
        self.session_wait = wait;
        self
    }
}

impl DebugFrontend for BridgeFrontend {
    fn on_entry(&self, ctx: TraceContext<'_>) {
        if !self.stop_on_entry {
            return;
        }
        if self.control.wait_for_session(self.session_wait) {
            self.control
                .suspend(ctx, Suspension::new(DebugStopReason::Entry));
        } else {
            debug!("no session attached at entry; running on");
        }
    }

    fn on_call(&self, ctx: TraceContext<'_>) {
        debug!(function = ctx.frame.name(), "call");
    }

    fn on_line(&self, ctx: TraceContext<'_>, breakpoint: Option<&Breakpoint>) {
        let suspension = match breakpoint {
            Some(breakpoint) => {
                Suspension::new(DebugStopReason::Breakpoint).with_breakpoint(breakpoint.id())
            }
            None => Suspension::new(DebugStopReason::Step),
        };
        self.control.suspend(ctx, suspension);
    }

    fn on_return(&self, ctx: TraceContext<'_>, value: Option<&Value>) {
        self.control.suspend(
            ctx,
            Suspension::new(DebugStopReason::Step).with_return_value(value),
        );
    }

    fn on_exception(&self, ctx: TraceContext<'_>, exception: &ExceptionInfo<'_>) {
        self.control.suspend(
            ctx,
            Suspension::new(DebugStopReason::Exception).with_exception(exception),
        );
    }

    fn on_breakpoint_error(&self, breakpoint: &Breakpoint, error: &EvalError) {
        warn!(
            file = breakpoint.file(),
            line = breakpoint.line(),
            %error,
            "breakpoint condition failed"
        );
        self.control.log(format!(
            "Error evaluating breakpoint condition '{}' at {}:{}: {error}",
            breakpoint.condition().unwrap_or_default(),
            breakpoint.file(),
            breakpoint.line()
        ));
    }
}
