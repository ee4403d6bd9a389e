//! Session bridge: shared debug state and the single suspension point.

#![allow(missing_docs)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use smol_str::SmolStr;
use tracing::debug;

use crate::error::DebugError;
use crate::value::Value;

use super::breakpoints::{Breakpoint, BreakpointRegistry, BreakpointSpec};
use super::hook::{ExceptionInfo, RuntimeFrame, TraceContext};
use super::types::{
    DebugLog, DebugStatus, DebugStop, DebugStopReason, DisconnectPolicy, ExceptionMode,
    ExecutionSnapshot, FrameSnapshot, SessionWait, SteppingMode,
};

/// Control actions requested by the protocol server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Stop at the next line anywhere.
    StepInto,
    /// Stop at the next line of the current frame or when it returns.
    StepOver,
    /// Stop when the current frame returns.
    StepReturn,
    /// Run until a breakpoint or exception.
    Continue,
    /// Stop at the next line anywhere, issued while running.
    Pause,
    /// Abort the debuggee; never stop again.
    Quit,
}

/// Outcome of applying a control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The action changed the debug state.
    Applied,
    /// The action was ignored because it had no effect.
    Ignored,
}

/// Why and how the traced thread suspends.
#[derive(Clone, Copy)]
pub struct Suspension<'a> {
    pub reason: DebugStopReason,
    pub exception: Option<&'a ExceptionInfo<'a>>,
    pub return_value: Option<&'a Value>,
    pub breakpoint_id: Option<u32>,
}

impl<'a> Suspension<'a> {
    #[must_use]
    pub fn new(reason: DebugStopReason) -> Self {
        Self {
            reason,
            exception: None,
            return_value: None,
            breakpoint_id: None,
        }
    }

    #[must_use]
    pub fn with_exception(mut self, exception: &'a ExceptionInfo<'a>) -> Self {
        self.exception = Some(exception);
        self
    }

    #[must_use]
    pub fn with_return_value(mut self, value: Option<&'a Value>) -> Self {
        self.return_value = value;
        self
    }

    #[must_use]
    pub fn with_breakpoint(mut self, id: u32) -> Self {
        self.breakpoint_id = Some(id);
        self
    }
}

#[derive(Debug)]
struct EvalJob {
    id: u64,
    frame: usize,
    expression: String,
}

#[derive(Debug)]
struct DebugState {
    status: DebugStatus,
    stepping: SteppingMode,
    exception_mode: ExceptionMode,
    registry: BreakpointRegistry,
    snapshot: Option<ExecutionSnapshot>,
    generation: u64,
    pause_requested: bool,
    sessions: usize,
    disconnect_policy: DisconnectPolicy,
    thread_id: u32,
    last_stop: Option<DebugStop>,
    stop_tx: Option<Sender<DebugStop>>,
    log_tx: Option<Sender<DebugLog>>,
    logs: Vec<DebugLog>,
    eval_jobs: VecDeque<EvalJob>,
    eval_results: HashMap<u64, Result<Value, DebugError>>,
    /// Jobs whose caller gave up after the traced thread picked them up.
    abandoned_jobs: HashSet<u64>,
    next_job: u64,
}

/// Shared debug state and the suspend/resume signal.
#[derive(Debug, Clone)]
pub struct DebugControl {
    state: Arc<(Mutex<DebugState>, Condvar)>,
    evaluating: Arc<AtomicBool>,
}

/// Marks the traced thread as evaluating; restores the previous flag on drop.
#[derive(Debug)]
pub struct EvaluationGuard {
    flag: Arc<AtomicBool>,
    previous: bool,
}

impl Drop for EvaluationGuard {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::SeqCst);
    }
}

impl DebugControl {
    /// Create a new debug control handle in running mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new((
                Mutex::new(DebugState {
                    status: DebugStatus::Running,
                    stepping: SteppingMode::Continue,
                    exception_mode: ExceptionMode::default(),
                    registry: BreakpointRegistry::new(),
                    snapshot: None,
                    generation: 0,
                    pause_requested: false,
                    sessions: 0,
                    disconnect_policy: DisconnectPolicy::default(),
                    thread_id: 1,
                    last_stop: None,
                    stop_tx: None,
                    log_tx: None,
                    logs: Vec::new(),
                    eval_jobs: VecDeque::new(),
                    eval_results: HashMap::new(),
                    abandoned_jobs: HashSet::new(),
                    next_job: 0,
                }),
                Condvar::new(),
            )),
            evaluating: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Apply a requested control action.
    pub fn apply_action(&self, action: ControlAction) -> ControlOutcome {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        let stopped = state.status == DebugStatus::Stopped;
        let previous = state.stepping;

        let outcome = match action {
            ControlAction::Pause => {
                if stopped {
                    ControlOutcome::Ignored
                } else {
                    state.stepping = SteppingMode::StepInto;
                    state.pause_requested = true;
                    ControlOutcome::Applied
                }
            }
            ControlAction::Quit => {
                state.stepping = SteppingMode::Quitting;
                state.pause_requested = false;
                if stopped {
                    resume(&mut state, cvar);
                }
                ControlOutcome::Applied
            }
            _ if !stopped => ControlOutcome::Ignored,
            ControlAction::StepInto => {
                state.stepping = SteppingMode::StepInto;
                ControlOutcome::Applied
            }
            ControlAction::StepOver => {
                let current = state
                    .snapshot
                    .as_ref()
                    .and_then(ExecutionSnapshot::current_frame)
                    .map(|frame| frame.id);
                state.stepping = current.map_or(SteppingMode::StepInto, SteppingMode::StepToFrame);
                ControlOutcome::Applied
            }
            ControlAction::StepReturn => {
                let target = state.snapshot.as_ref().and_then(|snapshot| {
                    snapshot.current_frame().map(|frame| SteppingMode::StepUntilReturn {
                        frame: frame.id,
                        caller: snapshot.current_caller().map(|caller| caller.id),
                    })
                });
                state.stepping = target.unwrap_or(SteppingMode::Continue);
                ControlOutcome::Applied
            }
            ControlAction::Continue => {
                state.stepping = SteppingMode::Continue;
                ControlOutcome::Applied
            }
        };

        if stopped && outcome == ControlOutcome::Applied && state.status == DebugStatus::Stopped {
            state.pause_requested = false;
            resume(&mut state, cvar);
        }

        debug!(
            ?action,
            ?outcome,
            "stepping {previous:?} -> {:?}",
            state.stepping
        );
        outcome
    }

    pub fn step_into(&self) {
        let _ = self.apply_action(ControlAction::StepInto);
    }

    pub fn step_over(&self) {
        let _ = self.apply_action(ControlAction::StepOver);
    }

    pub fn step_return(&self) {
        let _ = self.apply_action(ControlAction::StepReturn);
    }

    pub fn continue_run(&self) {
        let _ = self.apply_action(ControlAction::Continue);
    }

    pub fn pause(&self) {
        let _ = self.apply_action(ControlAction::Pause);
    }

    pub fn quit(&self) {
        let _ = self.apply_action(ControlAction::Quit);
    }

    /// Set the stepping mode directly, without touching the running state.
    pub fn set_stepping(&self, mode: SteppingMode) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.stepping = mode;
        state.pause_requested = false;
    }

    /// Current stepping mode.
    #[must_use]
    pub fn stepping(&self) -> SteppingMode {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.stepping
    }

    pub(crate) fn update_stepping(&self, f: impl FnOnce(SteppingMode) -> SteppingMode) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.stepping = f(state.stepping);
    }

    /// End of program: forget stepping state.
    pub(crate) fn reset_stepping(&self) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.stepping = SteppingMode::Continue;
        state.pause_requested = false;
    }

    #[must_use]
    pub fn exception_mode(&self) -> ExceptionMode {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.exception_mode
    }

    pub fn set_exception_mode(&self, mode: ExceptionMode) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.exception_mode = mode;
    }

    /// Replace all breakpoints for one file.
    pub fn set_breakpoints(&self, file: &str, specs: Vec<BreakpointSpec>) -> Vec<Breakpoint> {
        self.with_registry(|registry| registry.set_breakpoints(file, specs))
    }

    pub fn add_breakpoint(&self, file: &str, spec: BreakpointSpec) -> Breakpoint {
        self.with_registry(|registry| registry.add(file, spec))
    }

    pub fn remove_breakpoint(&self, id: u32) -> Option<Breakpoint> {
        self.with_registry(|registry| registry.remove(id))
    }

    pub fn clear_breakpoints(&self) {
        self.with_registry(BreakpointRegistry::clear);
    }

    #[must_use]
    pub fn breakpoints_in(&self, file: &str) -> Vec<Breakpoint> {
        self.with_registry(|registry| registry.breakpoints_in(file))
    }

    #[must_use]
    pub fn has_breakpoints_in(&self, file: &str) -> bool {
        self.with_registry(|registry| registry.has_file(file))
    }

    /// Returns the number of registered breakpoints (primarily for tests).
    #[doc(hidden)]
    pub fn breakpoint_count(&self) -> usize {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.registry.len()
    }

    pub(crate) fn with_registry<T>(&self, f: impl FnOnce(&mut BreakpointRegistry) -> T) -> T {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        f(&mut state.registry)
    }

    #[must_use]
    pub fn status(&self) -> DebugStatus {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.status
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.status() == DebugStatus::Stopped
    }

    #[must_use]
    pub fn thread_id(&self) -> u32 {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.thread_id
    }

    /// Get the live execution snapshot, if stopped.
    #[must_use]
    pub fn snapshot(&self) -> Option<ExecutionSnapshot> {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.snapshot.clone()
    }

    pub fn with_snapshot<T>(&self, f: impl FnOnce(&ExecutionSnapshot) -> T) -> Option<T> {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.snapshot.as_ref().map(f)
    }

    /// Generation of the most recent suspension.
    #[must_use]
    pub fn snapshot_generation(&self) -> u64 {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.generation
    }

    /// Return the most recent stop, if any.
    #[must_use]
    pub fn last_stop(&self) -> Option<DebugStop> {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.last_stop.clone()
    }

    /// Block until the debuggee is stopped or the timeout elapses.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        let deadline = Instant::now() + timeout;
        while state.status != DebugStatus::Stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = cvar
                .wait_timeout(state, deadline - now)
                .expect("debug state poisoned");
            state = guard;
        }
        true
    }

    /// Evaluate an expression in a snapshot frame on the traced thread.
    pub fn evaluate(
        &self,
        frame: usize,
        expression: &str,
        timeout: Duration,
    ) -> Result<Value, DebugError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        let Some(snapshot) = state.snapshot.as_ref() else {
            return Err(DebugError::NotStopped);
        };
        if frame >= snapshot.frames.len() {
            return Err(DebugError::UnknownFrame(frame));
        }
        state.next_job += 1;
        let id = state.next_job;
        state.eval_jobs.push_back(EvalJob {
            id,
            frame,
            expression: expression.to_string(),
        });
        cvar.notify_all();

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(result) = state.eval_results.remove(&id) {
                return result;
            }
            let now = Instant::now();
            if now >= deadline {
                let queued = state.eval_jobs.len();
                state.eval_jobs.retain(|job| job.id != id);
                if state.eval_jobs.len() == queued {
                    state.abandoned_jobs.insert(id);
                }
                return Err(DebugError::Timeout);
            }
            let (guard, _) = cvar
                .wait_timeout(state, deadline - now)
                .expect("debug state poisoned");
            state = guard;
        }
    }

    /// Register a session; returns the current stop so it can be re-announced.
    pub fn attach_session(&self) -> Option<DebugStop> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.sessions += 1;
        cvar.notify_all();
        debug!(sessions = state.sessions, "session attached");
        if state.status == DebugStatus::Stopped {
            state.last_stop.clone()
        } else {
            None
        }
    }

    /// Unregister a session and apply the disconnect policy. Returns true if this resumed the
    /// debuggee.
    pub fn detach_session(&self) -> bool {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.sessions = state.sessions.saturating_sub(1);
        debug!(sessions = state.sessions, "session detached");
        if state.sessions > 0 || state.disconnect_policy != DisconnectPolicy::Resume {
            return false;
        }
        if !state.stepping.is_quitting() {
            state.stepping = SteppingMode::Continue;
        }
        state.pause_requested = false;
        if state.status == DebugStatus::Stopped {
            resume(&mut state, cvar);
            return true;
        }
        false
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.sessions
    }

    /// Block until a session attaches, per `wait`. Returns whether one is attached.
    pub fn wait_for_session(&self, wait: SessionWait) -> bool {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        match wait {
            SessionWait::NoWait => state.sessions > 0,
            SessionWait::Forever => {
                while state.sessions == 0 {
                    state = cvar.wait(state).expect("debug state poisoned");
                }
                true
            }
            SessionWait::Timeout(timeout) => {
                let deadline = Instant::now() + timeout;
                while state.sessions == 0 {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let (guard, _) = cvar
                        .wait_timeout(state, deadline - now)
                        .expect("debug state poisoned");
                    state = guard;
                }
                true
            }
        }
    }

    #[must_use]
    pub fn disconnect_policy(&self) -> DisconnectPolicy {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.disconnect_policy
    }

    pub fn set_disconnect_policy(&self, policy: DisconnectPolicy) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.disconnect_policy = policy;
    }

    /// Send a console line to the session, buffering when none is listening.
    pub fn log(&self, message: impl Into<String>) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        let log = DebugLog::new(message);
        let undelivered = match &state.log_tx {
            Some(sender) => sender.send(log).err().map(|err| err.0),
            None => Some(log),
        };
        if let Some(log) = undelivered {
            state.logs.push(log);
        }
    }

    /// Drain buffered log output.
    #[must_use]
    pub fn drain_logs(&self) -> Vec<DebugLog> {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        std::mem::take(&mut state.logs)
    }

    /// Stream log output to a sender instead of buffering.
    pub fn set_log_sender(&self, sender: Sender<DebugLog>) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        for log in std::mem::take(&mut state.logs) {
            let _ = sender.send(log);
        }
        state.log_tx = Some(sender);
    }

    /// Stop streaming log output; new logs will buffer.
    pub fn clear_log_sender(&self) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.log_tx = None;
    }

    /// Stream stop events to a sender.
    pub fn set_stop_sender(&self, sender: Sender<DebugStop>) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.stop_tx = Some(sender);
    }

    /// Stop streaming stop events.
    pub fn clear_stop_sender(&self) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.stop_tx = None;
    }

    #[must_use]
    pub fn is_evaluating(&self) -> bool {
        self.evaluating.load(Ordering::SeqCst)
    }

    /// Flag the traced thread as evaluating until the guard drops.
    #[must_use]
    pub fn enter_evaluation(&self) -> EvaluationGuard {
        let previous = self.evaluating.swap(true, Ordering::SeqCst);
        EvaluationGuard {
            flag: Arc::clone(&self.evaluating),
            previous,
        }
    }

    /// Suspend the traced thread until a command resumes it.
    ///
    /// Returns immediately when no session is attached or the debugger is quitting. While
    /// suspended, queued evaluation requests are serviced on this thread.
    pub fn suspend(&self, ctx: TraceContext<'_>, suspension: Suspension<'_>) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        if state.sessions == 0 || state.stepping.is_quitting() {
            debug!(
                reason = suspension.reason.as_str(),
                "suspension skipped without session"
            );
            return;
        }

        let mut live: Vec<&dyn RuntimeFrame> = Vec::new();
        let mut cursor = Some(ctx.frame);
        while let Some(frame) = cursor {
            live.push(frame);
            cursor = frame.caller();
        }
        live.reverse();
        let current = live.len().saturating_sub(1);
        if let Some(exception) = suspension.exception {
            let skip = usize::from(
                exception
                    .traceback
                    .first()
                    .is_some_and(|frame| frame.id() == ctx.frame.id()),
            );
            live.extend(exception.traceback.iter().skip(skip).copied());
        }

        state.generation += 1;
        let generation = state.generation;
        let mut frames = Vec::with_capacity(live.len());
        for (index, frame) in live.iter().enumerate() {
            let mut locals = frame.locals();
            if index == current {
                if let Some(value) = suspension.return_value {
                    locals.insert(SmolStr::new_inline("__return__"), value.clone());
                }
            }
            frames.push(FrameSnapshot {
                id: frame.id(),
                name: SmolStr::new(frame.name()),
                path: SmolStr::new(frame.file()),
                file: state.registry.canonicalize(frame.file()),
                line: frame.line(),
                locals,
                globals: frame.globals(),
                source: frame.synthetic_source(),
            });
        }
        state.snapshot = Some(ExecutionSnapshot {
            frames,
            current,
            generation,
        });

        let mut reason = suspension.reason;
        if state.pause_requested && reason == DebugStopReason::Step {
            reason = DebugStopReason::Pause;
        }
        state.pause_requested = false;
        state.status = DebugStatus::Stopped;
        let description = suspension.exception.map(ExceptionInfo::describe);
        emit_stop(&mut state, reason, description, suspension.breakpoint_id);
        cvar.notify_all();

        loop {
            if let Some(job) = state.eval_jobs.pop_front() {
                drop(state);
                let result = match live.get(job.frame) {
                    Some(frame) => {
                        let _guard = self.enter_evaluation();
                        ctx.evaluator
                            .evaluate(*frame, &job.expression)
                            .map_err(DebugError::from)
                    }
                    None => Err(DebugError::UnknownFrame(job.frame)),
                };
                state = lock.lock().expect("debug state poisoned");
                deliver_result(&mut state, job.id, result);
                cvar.notify_all();
                continue;
            }
            match state.status {
                DebugStatus::Running => break,
                DebugStatus::Stopped => state = cvar.wait(state).expect("debug state poisoned"),
            }
        }
        debug!(generation, "resumed");
    }
}

impl Default for DebugControl {
    fn default() -> Self {
        Self::new()
    }
}

fn resume(state: &mut DebugState, cvar: &Condvar) {
    state.status = DebugStatus::Running;
    state.snapshot = None;
    for job in std::mem::take(&mut state.eval_jobs) {
        deliver_result(state, job.id, Err(DebugError::NotStopped));
    }
    cvar.notify_all();
}

fn deliver_result(state: &mut DebugState, id: u64, result: Result<Value, DebugError>) {
    if !state.abandoned_jobs.remove(&id) {
        state.eval_results.insert(id, result);
    }
}

fn emit_stop(
    state: &mut DebugState,
    reason: DebugStopReason,
    description: Option<String>,
    breakpoint_id: Option<u32>,
) {
    debug!(
        reason = reason.as_str(),
        generation = state.generation,
        "stop"
    );
    let stop = DebugStop {
        reason,
        thread_id: state.thread_id,
        description,
        breakpoint_id,
        generation: state.generation,
    };
    if let Some(sender) = &state.stop_tx {
        let _ = sender.send(stop.clone());
    }
    state.last_stop = Some(stop);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::hook::{Evaluator, FrameId};
    use crate::error::EvalError;
    use indexmap::IndexMap;
    use std::sync::mpsc::channel;
    use std::thread;

    struct StubFrame {
        id: u64,
        line: u32,
        caller: Option<Box<StubFrame>>,
    }

    impl RuntimeFrame for StubFrame {
        fn id(&self) -> FrameId {
            FrameId(self.id)
        }
        fn file(&self) -> &str {
            "<stub>"
        }
        fn name(&self) -> &str {
            "stub"
        }
        fn line(&self) -> u32 {
            self.line
        }
        fn first_line(&self) -> u32 {
            1
        }
        fn caller(&self) -> Option<&dyn RuntimeFrame> {
            self.caller.as_deref().map(|frame| frame as &dyn RuntimeFrame)
        }
        fn locals(&self) -> IndexMap<SmolStr, Value> {
            let mut locals = IndexMap::new();
            locals.insert(SmolStr::new("depth"), Value::Int(i64::try_from(self.id).unwrap()));
            locals
        }
        fn globals(&self) -> IndexMap<SmolStr, Value> {
            IndexMap::new()
        }
    }

    struct EchoEvaluator;

    fn frame_ids(snapshot: &ExecutionSnapshot) -> Vec<FrameId> {
        snapshot.frames.iter().map(|frame| frame.id).collect()
    }

    impl Evaluator for EchoEvaluator {
        fn evaluate(&self, frame: &dyn RuntimeFrame, source: &str) -> Result<Value, EvalError> {
            frame
                .locals()
                .get(source)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedName(source.into()))
        }
    }

    fn two_frames() -> StubFrame {
        StubFrame {
            id: 2,
            line: 7,
            caller: Some(Box::new(StubFrame {
                id: 1,
                line: 3,
                caller: None,
            })),
        }
    }

    #[test]
    fn suspend_without_session_does_not_block() {
        let control = DebugControl::new();
        let frame = two_frames();
        control.suspend(
            TraceContext::new(&frame, &EchoEvaluator),
            Suspension::new(DebugStopReason::Step),
        );
        assert!(!control.is_stopped());
        assert!(control.last_stop().is_none());
    }

    #[test]
    fn suspend_publishes_snapshot_and_serves_evaluation() {
        let control = DebugControl::new();
        control.attach_session();
        let (stop_tx, stop_rx) = channel();
        control.set_stop_sender(stop_tx);

        let hook = control.clone();
        let handle = thread::spawn(move || {
            let frame = two_frames();
            hook.suspend(
                TraceContext::new(&frame, &EchoEvaluator),
                Suspension::new(DebugStopReason::Breakpoint).with_breakpoint(4),
            );
        });

        let stop = stop_rx.recv_timeout(Duration::from_millis(250)).unwrap();
        assert_eq!(stop.reason, DebugStopReason::Breakpoint);
        assert_eq!(stop.breakpoint_id, Some(4));
        let snapshot = control.snapshot().unwrap();
        assert_eq!(frame_ids(&snapshot), vec![FrameId(1), FrameId(2)]);
        assert_eq!(snapshot.current, 1);
        assert_eq!(
            control.evaluate(0, "depth", Duration::from_secs(1)),
            Ok(Value::Int(1))
        );
        assert!(matches!(
            control.evaluate(1, "missing", Duration::from_secs(1)),
            Err(DebugError::Eval(EvalError::UndefinedName(_)))
        ));
        assert_eq!(
            control.evaluate(5, "depth", Duration::from_secs(1)),
            Err(DebugError::UnknownFrame(5))
        );

        assert_eq!(control.apply_action(ControlAction::Continue), ControlOutcome::Applied);
        handle.join().unwrap();
        assert!(!control.is_stopped());
        assert!(control.snapshot().is_none());
        assert_eq!(
            control.evaluate(0, "depth", Duration::from_millis(10)),
            Err(DebugError::NotStopped)
        );
    }

    struct SlowEvaluator;

    impl Evaluator for SlowEvaluator {
        fn evaluate(&self, _frame: &dyn RuntimeFrame, _source: &str) -> Result<Value, EvalError> {
            thread::sleep(Duration::from_millis(200));
            Ok(Value::Int(1))
        }
    }

    #[test]
    fn timed_out_evaluation_leaves_no_result_behind() {
        let control = DebugControl::new();
        control.attach_session();

        let hook = control.clone();
        let handle = thread::spawn(move || {
            let frame = two_frames();
            hook.suspend(
                TraceContext::new(&frame, &SlowEvaluator),
                Suspension::new(DebugStopReason::Step),
            );
        });
        assert!(control.wait_until_stopped(Duration::from_secs(1)));

        assert_eq!(
            control.evaluate(0, "slow", Duration::from_millis(20)),
            Err(DebugError::Timeout)
        );
        // Let the traced thread finish the job it already picked up.
        thread::sleep(Duration::from_millis(400));
        {
            let (lock, _) = &*control.state;
            let state = lock.lock().expect("debug state poisoned");
            assert!(state.eval_results.is_empty());
            assert!(state.abandoned_jobs.is_empty());
        }
        assert_eq!(
            control.evaluate(0, "slow", Duration::from_secs(2)),
            Ok(Value::Int(1))
        );

        control.continue_run();
        handle.join().unwrap();
    }

    #[test]
    fn pause_is_reported_as_pause() {
        let control = DebugControl::new();
        control.attach_session();
        let (stop_tx, stop_rx) = channel();
        control.set_stop_sender(stop_tx);
        assert_eq!(control.apply_action(ControlAction::Pause), ControlOutcome::Applied);
        assert_eq!(control.stepping(), SteppingMode::StepInto);

        let hook = control.clone();
        let handle = thread::spawn(move || {
            let frame = two_frames();
            hook.suspend(
                TraceContext::new(&frame, &EchoEvaluator),
                Suspension::new(DebugStopReason::Step),
            );
        });
        let stop = stop_rx.recv_timeout(Duration::from_millis(250)).unwrap();
        assert_eq!(stop.reason, DebugStopReason::Pause);
        assert_eq!(control.apply_action(ControlAction::Pause), ControlOutcome::Ignored);
        control.step_over();
        handle.join().unwrap();
        assert_eq!(control.stepping(), SteppingMode::StepToFrame(FrameId(2)));
    }

    #[test]
    fn commands_are_ignored_while_running() {
        let control = DebugControl::new();
        assert_eq!(control.apply_action(ControlAction::StepOver), ControlOutcome::Ignored);
        assert_eq!(control.apply_action(ControlAction::Continue), ControlOutcome::Ignored);
        assert_eq!(control.apply_action(ControlAction::Quit), ControlOutcome::Applied);
        assert!(control.stepping().is_quitting());
    }

    #[test]
    fn detach_resumes_under_resume_policy_only() {
        let control = DebugControl::new();
        control.set_disconnect_policy(DisconnectPolicy::StayStopped);
        control.attach_session();
        assert!(!control.detach_session());
        control.set_disconnect_policy(DisconnectPolicy::Resume);
        control.set_stepping(SteppingMode::StepInto);
        control.attach_session();
        assert!(!control.detach_session());
        assert_eq!(control.stepping(), SteppingMode::Continue);
    }

    #[test]
    fn logs_buffer_until_a_sender_is_installed() {
        let control = DebugControl::new();
        control.log("first");
        let (log_tx, log_rx) = channel();
        control.set_log_sender(log_tx);
        control.log("second");
        let messages: Vec<_> = log_rx.try_iter().map(|log| log.message).collect();
        assert_eq!(messages, vec!["first".to_string(), "second".to_string()]);
        assert!(control.drain_logs().is_empty());
    }
}
