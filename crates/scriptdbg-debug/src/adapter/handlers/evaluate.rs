//! Expression evaluation handler.
//! - handle_evaluate: evaluate in a stopped frame on the traced thread

use serde_json::Value;
use tracing::debug;

use crate::protocol::{EvaluateArguments, EvaluateResponseBody, Request};

use super::super::core::NOT_STOPPED;
use super::super::{DebugAdapter, DispatchOutcome, VariableHandle};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_evaluate(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<EvaluateArguments>(value).ok())
        else {
            return self.error_outcome(&request, "invalid evaluate args");
        };
        // Evaluation never waits for a stop; a running debuggee has no frames to offer.
        let Some(current) = self.control.with_snapshot(|snapshot| snapshot.current) else {
            return self.error_outcome(&request, NOT_STOPPED);
        };
        self.sync_handles();
        let frame = match args.frame_id {
            Some(frame_id) => match self.frame_index(frame_id) {
                Some(index) => index,
                None => {
                    return self.error_outcome(&request, &format!("Invalid frameId '{frame_id}'"));
                }
            },
            None => current,
        };

        let value = match self.control.evaluate(
            frame,
            &args.expression,
            self.options.request_timeout,
        ) {
            Ok(value) => value,
            Err(err) => {
                debug!(expression = %args.expression, %err, "evaluate failed");
                return self.error_outcome(&request, &err.to_string());
            }
        };

        let result = value.repr();
        let type_name = value.type_name().to_string();
        let variables_reference = if value.has_children() {
            self.alloc_variable_handle(VariableHandle::Children(value))
        } else {
            0
        };
        let body = EvaluateResponseBody {
            result,
            r#type: Some(type_name),
            variables_reference,
        };
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(body))],
            ..DispatchOutcome::default()
        }
    }
}
