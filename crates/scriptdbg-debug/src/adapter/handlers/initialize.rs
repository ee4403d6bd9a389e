//! Initialize handler.
//! - handle_initialize: capabilities, session attach, pending stop re-announce

use serde_json::Value;
use tracing::info;

use crate::protocol::{
    Capabilities, ExceptionBreakpointsFilter, InitializeArguments, InitializeResponseBody, Request,
};

use super::super::stop::stopped_event_body;
use super::super::{DebugAdapter, DispatchOutcome};

fn exception_filters() -> Vec<ExceptionBreakpointsFilter> {
    [
        ("never", "Never", true),
        ("always", "Always", false),
        ("unhandled", "Unhandled", false),
    ]
    .into_iter()
    .map(|(filter, label, default)| ExceptionBreakpointsFilter {
        filter: filter.to_string(),
        label: label.to_string(),
        default: Some(default),
    })
    .collect()
}

impl DebugAdapter {
    pub(in crate::adapter) fn handle_initialize(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let args = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<InitializeArguments>(value).ok())
            .unwrap_or_default();

        let capabilities = Capabilities {
            supports_configuration_done_request: Some(true),
            supports_conditional_breakpoints: Some(true),
            supports_hit_conditional_breakpoints: Some(true),
            supports_evaluate_for_hovers: Some(true),
            supports_pause_request: Some(true),
            supports_exception_options: Some(true),
            supports_terminate_debuggee: Some(true),
            exception_breakpoint_filters: Some(exception_filters()),
        };
        let response = self.ok_response(&request, Some(InitializeResponseBody { capabilities }));
        let initialized_event = self.event("initialized", Option::<Value>::None);
        let mut events = vec![initialized_event];

        // A repeated initialize must not count the session twice.
        let pending = if self.attached {
            self.control.last_stop().filter(|_| self.control.is_stopped())
        } else {
            self.attached = true;
            self.control.attach_session()
        };
        info!(
            client = args.client_id.as_deref().unwrap_or("unknown"),
            sessions = self.control.session_count(),
            "client initialized"
        );

        let mut stop_gate = None;
        if let Some(stop) = pending {
            events.push(self.debug_output_message(format!(
                "[scriptdbg] attached while stopped: reason={}",
                stop.reason.as_str()
            )));
            events.push(self.event("stopped", Some(stopped_event_body(&stop))));
            stop_gate = Some(self.stop_gate.enter());
        }

        DispatchOutcome {
            responses: vec![response],
            events,
            should_exit: false,
            stop_gate,
        }
    }
}
