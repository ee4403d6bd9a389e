//! Continue/pause/step handlers.
//! - handle_continue: resume execution
//! - handle_pause: request pause
//! - handle_next/step_in/step_out: stepping commands

use serde::de::DeserializeOwned;
use serde_json::Value;

use scriptdbg_runtime::debug::{ControlAction, ControlOutcome};

use crate::protocol::{
    ContinueArguments, ContinueResponseBody, NextArguments, PauseArguments, Request,
    StepInArguments, StepOutArguments,
};

use super::super::core::NOT_STOPPED;
use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_continue(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        self.resume_with::<ContinueArguments>(request, ControlAction::Continue, "continue")
    }

    pub(in crate::adapter) fn handle_next(&mut self, request: Request<Value>) -> DispatchOutcome {
        self.resume_with::<NextArguments>(request, ControlAction::StepOver, "next")
    }

    pub(in crate::adapter) fn handle_step_in(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        self.resume_with::<StepInArguments>(request, ControlAction::StepInto, "stepIn")
    }

    pub(in crate::adapter) fn handle_step_out(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        self.resume_with::<StepOutArguments>(request, ControlAction::StepReturn, "stepOut")
    }

    pub(in crate::adapter) fn handle_pause(&mut self, request: Request<Value>) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<PauseArguments>(value).ok())
        else {
            return self.error_outcome(&request, "invalid pause args");
        };
        if args.thread_id != self.control.thread_id() {
            return self.error_outcome(
                &request,
                &format!("Invalid threadId '{}'", args.thread_id),
            );
        }

        // Held before resuming so the stop cannot overtake this response.
        let gate = self.stop_gate.enter();
        if self.control.apply_action(ControlAction::Pause) == ControlOutcome::Ignored {
            drop(gate);
            return DispatchOutcome {
                responses: vec![self.ok_response::<Value>(&request, None)],
                events: vec![
                    self.debug_output_message("[scriptdbg] pause ignored (already stopped)")
                ],
                ..DispatchOutcome::default()
            };
        }
        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            events: vec![self.debug_output_message("[scriptdbg] pause requested")],
            stop_gate: Some(gate),
            ..DispatchOutcome::default()
        }
    }

    /// Shared path of the resuming commands: wait (bounded) for a stop, then resume.
    fn resume_with<A: DeserializeOwned>(
        &mut self,
        request: Request<Value>,
        action: ControlAction,
        command: &str,
    ) -> DispatchOutcome {
        if request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<A>(value).ok())
            .is_none()
        {
            return self.error_outcome(&request, &format!("invalid {command} args"));
        }
        if !self.await_stopped() {
            return self.error_outcome(&request, NOT_STOPPED);
        }
        let gate = self.stop_gate.enter();
        if self.control.apply_action(action) == ControlOutcome::Ignored {
            drop(gate);
            return self.error_outcome(&request, NOT_STOPPED);
        }

        let response = match action {
            ControlAction::Continue => self.ok_response(
                &request,
                Some(ContinueResponseBody {
                    all_threads_continued: Some(true),
                }),
            ),
            _ => self.ok_response::<Value>(&request, None),
        };
        DispatchOutcome {
            responses: vec![response],
            stop_gate: Some(gate),
            ..DispatchOutcome::default()
        }
    }
}
