//! Thread requests.
//! - handle_threads: the single traced thread

use serde_json::Value;

use crate::protocol::{Request, Thread, ThreadsResponseBody};

use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_threads(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let body = ThreadsResponseBody {
            threads: vec![Thread {
                id: self.control.thread_id(),
                name: self.options.thread_name.to_string(),
            }],
        };
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(body))],
            ..DispatchOutcome::default()
        }
    }
}
