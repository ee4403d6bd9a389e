//! Adapter core loop + request dispatch.
//! - DebugAdapter::new/with_options/with_resolver
//! - run: protocol loop for one client connection
//! - dispatch_request: route DAP requests
//! - envelope helpers: responses, events, console output
//! - reference bookkeeping: variable and source handles

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufWriter, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use serde::Serialize;
use serde_json::Value;
use smol_str::SmolStr;
use tracing::{debug, info, warn};

use scriptdbg_runtime::debug::{DebugControl, DebugLog, DebugStop};

use crate::protocol::{Event, MessageType, OutputEventBody, Request, Response};
use crate::source::{FsSourceResolver, SourceResolver};

use super::protocol_io::{
    read_message, write_message_locked, write_protocol_log, ProtocolLog, SharedWriter,
};
use super::stop::StopCoordinator;
use super::util::env_flag;
use super::{
    AdapterOptions, DebugAdapter, DispatchOutcome, SourceHandle, StopGate, VariableHandle,
};

const DAP_LOG_ENV: &str = "SCRIPTDBG_DAP_LOG";
const DAP_VERBOSE_ENV: &str = "SCRIPTDBG_DAP_VERBOSE";

pub(super) const NOT_STOPPED: &str = "debuggee is not stopped";

impl DebugAdapter {
    #[must_use]
    pub fn new(control: DebugControl) -> Self {
        Self {
            control,
            options: AdapterOptions::default(),
            resolver: Arc::new(FsSourceResolver),
            next_seq: Arc::new(AtomicU32::new(1)),
            attached: false,
            handle_generation: 0,
            variable_handles: HashMap::new(),
            next_variable_ref: 1,
            frame_handles: HashMap::new(),
            frame_ids: HashMap::new(),
            next_frame_id: 1,
            source_refs: HashMap::new(),
            source_keys: HashMap::new(),
            source_cache: HashMap::new(),
            next_source_ref: 1,
            stop_gate: StopGate::new(),
            dap_logger: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: AdapterOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn control(&self) -> &DebugControl {
        &self.control
    }

    /// Whether this session is registered with the session bridge.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Serve one client until it disconnects or the stream ends.
    ///
    /// On exit the session is detached from the bridge, which applies the disconnect policy.
    /// A malformed frame ends the session with an error; the debuggee is unaffected.
    pub fn run<R: BufRead>(
        &mut self,
        mut reader: R,
        writer: impl Write + Send + 'static,
    ) -> io::Result<()> {
        let boxed: Box<dyn Write + Send> = Box::new(writer);
        let writer: SharedWriter = Arc::new(Mutex::new(BufWriter::new(boxed)));

        let dap_log = std::env::var(DAP_LOG_ENV)
            .ok()
            .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok())
            .map(BufWriter::new)
            .map(|writer| Arc::new(Mutex::new(writer)));
        self.dap_logger = dap_log.clone();
        let dap_verbose = env_flag(DAP_VERBOSE_ENV);

        let (log_tx, log_rx) = mpsc::channel::<DebugLog>();
        self.control.set_log_sender(log_tx);
        let (stop_tx, stop_rx) = mpsc::channel::<DebugStop>();
        self.control.set_stop_sender(stop_tx);

        let log_writer = Arc::clone(&writer);
        let log_logger = dap_log.clone();
        let log_seq = Arc::clone(&self.next_seq);
        let log_thread = thread::spawn(move || {
            while let Ok(log) = log_rx.recv() {
                let output = if log.message.ends_with('\n') {
                    log.message
                } else {
                    format!("{}\n", log.message)
                };
                let event = Event {
                    seq: log_seq.fetch_add(1, Ordering::Relaxed),
                    message_type: MessageType::Event,
                    event: "output".to_string(),
                    body: Some(OutputEventBody {
                        output,
                        category: Some("console".to_string()),
                        source: None,
                        line: None,
                        column: None,
                    }),
                };
                let Ok(serialized) = serde_json::to_string(&event) else {
                    continue;
                };
                if let Some(logger) = &log_logger {
                    let _ = write_protocol_log(logger, "->", &serialized);
                }
                if write_message_locked(&log_writer, &serialized).is_err() {
                    break;
                }
            }
        });
        let stop_thread = StopCoordinator::new(
            self.stop_gate.clone(),
            self.control.clone(),
            Arc::clone(&writer),
            dap_log.clone(),
            Arc::clone(&self.next_seq),
        )
        .spawn(stop_rx);
        info!("debug session started");

        let result = self.serve(&mut reader, &writer, dap_log.as_ref(), dap_verbose);

        if self.attached {
            self.attached = false;
            if self.control.detach_session() {
                info!("session ended while stopped; debuggee resumed");
            }
        }
        self.control.clear_log_sender();
        self.control.clear_stop_sender();
        let _ = log_thread.join();
        let _ = stop_thread.join();
        self.dap_logger = None;
        match &result {
            Ok(()) => info!("debug session ended"),
            Err(err) => warn!(%err, "debug session aborted"),
        }
        result
    }

    fn serve<R: BufRead>(
        &mut self,
        reader: &mut R,
        writer: &SharedWriter,
        dap_log: Option<&ProtocolLog>,
        verbose: bool,
    ) -> io::Result<()> {
        loop {
            let Some(payload) = read_message(reader)? else {
                debug!("client closed the connection");
                return Ok(());
            };
            if let Some(logger) = dap_log {
                let _ = write_protocol_log(logger, "<-", &payload);
            }

            let request: Request<Value> = match serde_json::from_str(&payload) {
                Ok(request) => request,
                Err(err) => {
                    warn!(%err, "skipping malformed request");
                    continue;
                }
            };
            if verbose {
                let note = self.debug_output_message(format!(
                    "[scriptdbg][dap<-] seq={} command={}",
                    request.seq, request.command
                ));
                emit(writer, dap_log, &note)?;
            }

            let outcome = self.dispatch_request(request);
            for message in outcome.responses.iter().chain(&outcome.events) {
                emit(writer, dap_log, message)?;
            }
            if outcome.should_exit {
                return Ok(());
            }
        }
    }

    pub(super) fn dispatch_request(&mut self, request: Request<Value>) -> DispatchOutcome {
        if request.message_type != MessageType::Request {
            return DispatchOutcome::default();
        }
        debug!(seq = request.seq, command = %request.command, "request");

        let mut outcome = match request.command.as_str() {
            "initialize" => self.handle_initialize(request),
            "attach" => self.handle_attach(request),
            "launch" => self.handle_launch(request),
            "configurationDone" => self.handle_configuration_done(request),
            "disconnect" => self.handle_disconnect(request),
            "setBreakpoints" => self.handle_set_breakpoints(request),
            "setExceptionBreakpoints" => self.handle_set_exception_breakpoints(request),
            "threads" => self.handle_threads(request),
            "stackTrace" => self.handle_stack_trace(request),
            "scopes" => self.handle_scopes(request),
            "variables" => self.handle_variables(request),
            "source" => self.handle_source(request),
            "continue" => self.handle_continue(request),
            "pause" => self.handle_pause(request),
            "next" => self.handle_next(request),
            "stepIn" => self.handle_step_in(request),
            "stepOut" => self.handle_step_out(request),
            "evaluate" => self.handle_evaluate(request),
            _ => DispatchOutcome {
                responses: vec![self.error_response(&request, "unsupported command")],
                ..DispatchOutcome::default()
            },
        };

        outcome.events.extend(self.drain_log_events());
        outcome
    }

    fn next_seq(&self) -> u32 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub(super) fn ok_response<T>(&self, request: &Request<Value>, body: Option<T>) -> Value
    where
        T: Serialize,
    {
        let body = body
            .map(|payload| serde_json::to_value(payload))
            .transpose()
            .unwrap_or(None);
        let response = Response {
            seq: self.next_seq(),
            message_type: MessageType::Response,
            request_seq: request.seq,
            success: true,
            command: request.command.clone(),
            message: None,
            body,
        };
        serde_json::to_value(response).unwrap_or(Value::Null)
    }

    pub(super) fn error_response(&self, request: &Request<Value>, message: &str) -> Value {
        let response: Response<Value> = Response {
            seq: self.next_seq(),
            message_type: MessageType::Response,
            request_seq: request.seq,
            success: false,
            command: request.command.clone(),
            message: Some(message.to_string()),
            body: None,
        };
        serde_json::to_value(response).unwrap_or(Value::Null)
    }

    /// Outcome carrying a single error response.
    pub(super) fn error_outcome(&self, request: &Request<Value>, message: &str) -> DispatchOutcome {
        DispatchOutcome {
            responses: vec![self.error_response(request, message)],
            ..DispatchOutcome::default()
        }
    }

    pub(super) fn event<T>(&self, name: &str, body: Option<T>) -> Value
    where
        T: Serialize,
    {
        let body = body
            .map(|payload| serde_json::to_value(payload))
            .transpose()
            .unwrap_or(None);
        let event = Event {
            seq: self.next_seq(),
            message_type: MessageType::Event,
            event: name.to_string(),
            body,
        };
        serde_json::to_value(event).unwrap_or(Value::Null)
    }

    fn drain_log_events(&self) -> Vec<Value> {
        self.control
            .drain_logs()
            .into_iter()
            .map(|log| self.debug_output_message(log.message.trim_end_matches('\n')))
            .collect()
    }

    pub(super) fn debug_output_message(&self, message: impl Into<String>) -> Value {
        let output = format!("{}\n", message.into());
        let body = OutputEventBody {
            output,
            category: Some("console".to_string()),
            source: None,
            line: None,
            column: None,
        };
        self.event("output", Some(body))
    }

    /// Wait (bounded) for the debuggee to be stopped.
    pub(super) fn await_stopped(&self) -> bool {
        self.control.is_stopped() || self.control.wait_until_stopped(self.options.request_timeout)
    }

    /// Forget frame and variable references handed out for an earlier suspension.
    ///
    /// Counters keep running so a stale id never names a handle of the new suspension.
    pub(super) fn sync_handles(&mut self) {
        let generation = self.control.snapshot_generation();
        if generation != self.handle_generation {
            self.handle_generation = generation;
            self.variable_handles.clear();
            self.frame_handles.clear();
            self.frame_ids.clear();
        }
    }

    /// `frameId` for a snapshot index, stable within one suspension.
    pub(super) fn frame_reference(&mut self, index: usize) -> u32 {
        if let Some(id) = self.frame_ids.get(&index) {
            return *id;
        }
        let id = self.next_frame_id;
        self.next_frame_id = self.next_frame_id.saturating_add(1);
        self.frame_ids.insert(index, id);
        self.frame_handles.insert(id, index);
        id
    }

    pub(super) fn frame_index(&self, frame_id: u32) -> Option<usize> {
        self.frame_handles.get(&frame_id).copied()
    }

    pub(super) fn alloc_variable_handle(&mut self, handle: VariableHandle) -> u32 {
        let id = self.next_variable_ref;
        self.next_variable_ref = self.next_variable_ref.saturating_add(1);
        self.variable_handles.insert(id, handle);
        id
    }

    /// Stable `sourceReference` for a file key.
    pub(super) fn source_reference(&mut self, key: &SmolStr, handle: SourceHandle) -> u32 {
        if let Some(id) = self.source_keys.get(key) {
            return *id;
        }
        let id = self.next_source_ref;
        self.next_source_ref = self.next_source_ref.saturating_add(1);
        self.source_keys.insert(key.clone(), id);
        self.source_refs.insert(id, handle);
        id
    }
}

fn emit(writer: &SharedWriter, dap_log: Option<&ProtocolLog>, message: &Value) -> io::Result<()> {
    let serialized = serde_json::to_string(message)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    if let Some(logger) = dap_log {
        let _ = write_protocol_log(logger, "->", &serialized);
    }
    write_message_locked(writer, &serialized)
}
