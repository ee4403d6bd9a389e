//! Stop event coordination (ordering + filtering).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc::Receiver, Arc};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::debug;

use scriptdbg_runtime::debug::{DebugControl, DebugStop};

use crate::protocol::{Event, MessageType, OutputEventBody, StoppedEventBody};

use super::protocol_io::{write_message_locked, write_protocol_log, ProtocolLog, SharedWriter};
use super::StopGate;

/// Body of the `stopped` event announcing `stop`.
pub(super) fn stopped_event_body(stop: &DebugStop) -> StoppedEventBody {
    StoppedEventBody {
        reason: stop.reason.as_str().to_string(),
        description: stop
            .description
            .as_ref()
            .map(|_| "Paused on exception".to_string()),
        thread_id: Some(stop.thread_id),
        text: stop.description.clone(),
        all_threads_stopped: Some(true),
        hit_breakpoint_ids: stop.breakpoint_id.map(|id| vec![id]),
    }
}

/// Writes stopped events once the request that caused them has been answered.
pub(super) struct StopCoordinator {
    stop_gate: StopGate,
    control: DebugControl,
    writer: SharedWriter,
    logger: Option<ProtocolLog>,
    seq: Arc<AtomicU32>,
}

impl StopCoordinator {
    pub(super) fn new(
        stop_gate: StopGate,
        control: DebugControl,
        writer: SharedWriter,
        logger: Option<ProtocolLog>,
        seq: Arc<AtomicU32>,
    ) -> Self {
        Self {
            stop_gate,
            control,
            writer,
            logger,
            seq,
        }
    }

    pub(super) fn spawn(self, stop_rx: Receiver<DebugStop>) -> JoinHandle<()> {
        thread::spawn(move || {
            while let Ok(stop) = stop_rx.recv() {
                self.stop_gate.wait_clear();
                if !self.should_emit_stop(&stop) {
                    continue;
                }
                if !self.emit_stop(&stop) {
                    break;
                }
            }
        })
    }

    /// A later suspension already superseded this one.
    fn should_emit_stop(&self, stop: &DebugStop) -> bool {
        let latest = self.control.snapshot_generation();
        if stop.generation < latest {
            debug!(
                generation = stop.generation,
                latest, "dropping superseded stop"
            );
            return false;
        }
        true
    }

    fn emit_stop(&self, stop: &DebugStop) -> bool {
        let output = OutputEventBody {
            output: format!(
                "[scriptdbg] stopped: reason={} thread_id={}\n",
                stop.reason.as_str(),
                stop.thread_id
            ),
            category: Some("console".to_string()),
            source: None,
            line: None,
            column: None,
        };
        self.write_event("output", output) && self.write_event("stopped", stopped_event_body(stop))
    }

    fn write_event<T: Serialize>(&self, name: &str, body: T) -> bool {
        let event = Event {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            message_type: MessageType::Event,
            event: name.to_string(),
            body: Some(body),
        };
        let Ok(serialized) = serde_json::to_string(&event) else {
            return true;
        };
        if let Some(logger) = &self.logger {
            let _ = write_protocol_log(logger, "->", &serialized);
        }
        write_message_locked(&self.writer, &serialized).is_ok()
    }
}
