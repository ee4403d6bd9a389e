//! Session lifecycle handlers.
//! - handle_attach / handle_launch: accepted, the debuggee is already running
//! - handle_configuration_done: end of the configuration phase
//! - handle_disconnect: detach from the bridge and end the session

use serde_json::Value;
use tracing::info;

use crate::protocol::{
    AttachArguments, DisconnectArguments, LaunchArguments, Request, TerminatedEventBody,
};

use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_attach(&mut self, request: Request<Value>) -> DispatchOutcome {
        let args = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<AttachArguments>(value).ok())
            .unwrap_or_default();
        let keys = args.additional.keys().cloned().collect::<Vec<_>>();
        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            events: vec![self.debug_output_message(format!(
                "[scriptdbg] attach: ignored arguments [{}]",
                keys.join(", ")
            ))],
            ..DispatchOutcome::default()
        }
    }

    pub(in crate::adapter) fn handle_launch(&mut self, request: Request<Value>) -> DispatchOutcome {
        let _args = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<LaunchArguments>(value).ok());
        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            events: vec![self.debug_output_message(
                "[scriptdbg] launch: debuggee already running, attaching",
            )],
            ..DispatchOutcome::default()
        }
    }

    pub(in crate::adapter) fn handle_configuration_done(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            ..DispatchOutcome::default()
        }
    }

    pub(in crate::adapter) fn handle_disconnect(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let args = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<DisconnectArguments>(value).ok());

        if args
            .as_ref()
            .and_then(|value| value.terminate_debuggee)
            .unwrap_or(false)
        {
            info!("client asked to terminate the debuggee");
            self.control.quit();
        }
        if self.attached {
            self.attached = false;
            if self.control.detach_session() {
                info!("disconnect resumed the debuggee");
            }
        }
        self.variable_handles.clear();
        self.frame_handles.clear();
        self.frame_ids.clear();

        let terminated_event = self.event(
            "terminated",
            Some(TerminatedEventBody {
                restart: args.as_ref().and_then(|value| value.restart),
            }),
        );

        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            should_exit: true,
            events: vec![
                self.debug_output_message("[scriptdbg] disconnect"),
                terminated_event,
            ],
            stop_gate: None,
        }
    }
}
