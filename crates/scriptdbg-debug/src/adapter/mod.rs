//! Debug adapter module map.
//! - core: session loop, dispatch, envelope helpers
//! - handlers: DAP request handlers by area
//! - protocol_io: message framing + logging
//! - stop: stopped event emission
//! - util: small shared helpers
//! - tests: adapter unit tests

mod core;
mod handlers;
mod protocol_io;
mod stop;
mod util;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use smol_str::SmolStr;

use scriptdbg_runtime::debug::DebugControl;
use scriptdbg_runtime::value::Value;

use crate::config::DebuggerConfig;
use crate::source::SourceResolver;

use self::protocol_io::ProtocolLog;

pub(crate) use self::util::env_override;

/// Per-session settings taken from the debugger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOptions {
    pub thread_name: SmolStr,
    /// Bound for run-control requests waiting for the debuggee to stop.
    pub request_timeout: Duration,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        let config = DebuggerConfig::default();
        Self::from(&config)
    }
}

impl From<&DebuggerConfig> for AdapterOptions {
    fn from(config: &DebuggerConfig) -> Self {
        Self {
            thread_name: config.thread_name.clone(),
            request_timeout: config.request_timeout,
        }
    }
}

/// Target of a `variablesReference`, valid for one snapshot generation.
#[derive(Debug, Clone)]
enum VariableHandle {
    Locals(usize),
    Globals(usize),
    Children(Value),
}

/// Target of a `sourceReference`.
#[derive(Debug, Clone)]
enum SourceHandle {
    /// `<...>` frame; the text was captured with the frame when available.
    Synthetic { name: SmolStr, text: Option<String> },
    /// Archive member resolved through the source resolver.
    Archive(SmolStr),
}

/// Protocol server state for one client session.
pub struct DebugAdapter {
    control: DebugControl,
    options: AdapterOptions,
    resolver: Arc<dyn SourceResolver>,
    next_seq: Arc<AtomicU32>,
    attached: bool,
    handle_generation: u64,
    variable_handles: HashMap<u32, VariableHandle>,
    next_variable_ref: u32,
    /// `frameId` to snapshot index, valid for one snapshot generation.
    frame_handles: HashMap<u32, usize>,
    frame_ids: HashMap<usize, u32>,
    next_frame_id: u32,
    source_refs: HashMap<u32, SourceHandle>,
    source_keys: HashMap<SmolStr, u32>,
    source_cache: HashMap<u32, String>,
    next_source_ref: u32,
    stop_gate: StopGate,
    dap_logger: Option<ProtocolLog>,
}

#[derive(Debug, Default)]
struct DispatchOutcome {
    responses: Vec<serde_json::Value>,
    events: Vec<serde_json::Value>,
    should_exit: bool,
    stop_gate: Option<StopGateToken>,
}

/// Holds stopped events back while a request's own output is still being written.
#[derive(Debug, Clone)]
struct StopGate {
    inner: Arc<StopGateInner>,
}

#[derive(Debug)]
struct StopGateInner {
    count: Mutex<usize>,
    cvar: Condvar,
}

#[derive(Debug)]
struct StopGateToken {
    inner: Arc<StopGateInner>,
}

impl StopGate {
    fn new() -> Self {
        Self {
            inner: Arc::new(StopGateInner {
                count: Mutex::new(0),
                cvar: Condvar::new(),
            }),
        }
    }

    fn enter(&self) -> StopGateToken {
        let mut count = self.inner.count.lock().expect("stop gate poisoned");
        *count = count.saturating_add(1);
        StopGateToken {
            inner: Arc::clone(&self.inner),
        }
    }

    #[cfg(test)]
    fn is_held(&self) -> bool {
        *self.inner.count.lock().expect("stop gate poisoned") > 0
    }

    fn wait_clear(&self) {
        let mut count = self.inner.count.lock().expect("stop gate poisoned");
        while *count > 0 {
            count = self.inner.cvar.wait(count).expect("stop gate poisoned");
        }
    }
}

impl Drop for StopGateToken {
    fn drop(&mut self) {
        let mut count = self.inner.count.lock().expect("stop gate poisoned");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.inner.cvar.notify_all();
        }
    }
}
