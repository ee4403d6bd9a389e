//! Stack trace handler.
//! - handle_stack_trace: snapshot frames, innermost first

use serde_json::Value;

use scriptdbg_runtime::debug::FrameSnapshot;

use crate::protocol::{Request, Source, StackFrame, StackTraceArguments, StackTraceResponseBody};
use crate::source::is_archive_path;

use super::super::core::NOT_STOPPED;
use super::super::{DebugAdapter, DispatchOutcome, SourceHandle};

fn display_name(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or(path)
        .to_string()
}

impl DebugAdapter {
    pub(in crate::adapter) fn handle_stack_trace(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<StackTraceArguments>(value).ok())
        else {
            return self.error_outcome(&request, "invalid stackTrace args");
        };
        if args.thread_id != self.control.thread_id() {
            return self.error_outcome(
                &request,
                &format!("Unknown threadId '{}'", args.thread_id),
            );
        }
        if !self.await_stopped() {
            return self.error_outcome(&request, NOT_STOPPED);
        }
        let Some(snapshot) = self.control.snapshot() else {
            return self.error_outcome(&request, NOT_STOPPED);
        };
        self.sync_handles();
        if snapshot.generation != self.handle_generation {
            return self.error_outcome(&request, NOT_STOPPED);
        }

        let mut frames = Vec::with_capacity(snapshot.frames.len());
        for (index, frame) in snapshot.frames.iter().enumerate().rev() {
            let source = self.frame_source(frame);
            frames.push(StackFrame {
                id: self.frame_reference(index),
                name: frame.name.to_string(),
                source: Some(source),
                line: frame.line,
                column: 1,
            });
        }

        let total = frames.len();
        let start = usize::try_from(args.start_frame.unwrap_or(0)).unwrap_or(0);
        let levels = args
            .levels
            .filter(|levels| *levels > 0)
            .and_then(|levels| usize::try_from(levels).ok())
            .unwrap_or(total);
        let stack_frames = frames
            .drain(start.min(total)..)
            .take(levels)
            .collect::<Vec<_>>();

        let body = StackTraceResponseBody {
            stack_frames,
            total_frames: Some(u32::try_from(total).unwrap_or(u32::MAX)),
        };
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(body))],
            ..DispatchOutcome::default()
        }
    }

    /// Synthetic and archived files are served through `sourceReference`; plain files by path.
    fn frame_source(&mut self, frame: &FrameSnapshot) -> Source {
        let name = display_name(&frame.path);
        if frame.is_synthetic() {
            let handle = SourceHandle::Synthetic {
                name: frame.path.clone(),
                text: frame.source.clone(),
            };
            let reference = self.source_reference(&frame.path, handle);
            return Source {
                name: Some(name),
                path: None,
                source_reference: Some(reference),
            };
        }
        if is_archive_path(&frame.path) {
            let reference =
                self.source_reference(&frame.path, SourceHandle::Archive(frame.path.clone()));
            return Source {
                name: Some(name),
                path: None,
                source_reference: Some(reference),
            };
        }
        Source {
            name: Some(name),
            path: Some(frame.path.to_string()),
            source_reference: None,
        }
    }
}
