//! Scope enumeration handler.
//! - handle_scopes: Locals then Globals for one frame

use serde_json::Value;

use crate::protocol::{Request, Scope, ScopesArguments, ScopesResponseBody};

use super::super::core::NOT_STOPPED;
use super::super::{DebugAdapter, DispatchOutcome, VariableHandle};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_scopes(&mut self, request: Request<Value>) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<ScopesArguments>(value).ok())
        else {
            return self.error_outcome(&request, "invalid scopes args");
        };
        if !self.await_stopped() {
            return self.error_outcome(&request, NOT_STOPPED);
        }
        self.sync_handles();
        let live = self.frame_index(args.frame_id).map(|index| {
            let exists = self
                .control
                .with_snapshot(|snapshot| snapshot.frame(index).is_some());
            (index, exists)
        });
        let index = match live {
            Some((index, Some(true))) => index,
            Some((_, None)) => return self.error_outcome(&request, NOT_STOPPED),
            _ => {
                return self.error_outcome(
                    &request,
                    &format!("Invalid frameId '{}'", args.frame_id),
                );
            }
        };

        let locals = self.alloc_variable_handle(VariableHandle::Locals(index));
        let globals = self.alloc_variable_handle(VariableHandle::Globals(index));
        let scopes = vec![
            Scope {
                name: "Locals".to_string(),
                presentation_hint: Some("locals".to_string()),
                variables_reference: locals,
                expensive: false,
            },
            Scope {
                name: "Globals".to_string(),
                presentation_hint: None,
                variables_reference: globals,
                expensive: false,
            },
        ];
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(ScopesResponseBody { scopes }))],
            ..DispatchOutcome::default()
        }
    }
}
