//! Adapter unit tests.
//! - framing roundtrips and malformed frames
//! - request dispatch against a running and a stopped debuggee

use super::protocol_io::{read_message, write_message};
use super::*;
use crate::protocol::{
    EvaluateResponseBody, InitializeResponseBody, MessageType, Request, Response,
    ScopesResponseBody, SetBreakpointsResponseBody, SourceResponseBody, StackTraceResponseBody,
    ThreadsResponseBody, VariablesResponseBody,
};
use expect_test::expect;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use smol_str::SmolStr;
use std::io::BufReader;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use scriptdbg_runtime::debug::{
    BridgeFrontend, DebugControl, DebugStopReason, ExceptionMode, SessionWait, TraceDispatcher,
};
use scriptdbg_runtime::harness::{Function, Interpreter, Program, RunOutcome, Stmt};
use scriptdbg_runtime::value::Value;

const TIMEOUT: Duration = Duration::from_secs(2);
const SHOP: &str = "shop.src";
const COST: &str = "<cost>";

/// `main` (shop.src 2-4) calls `cost` (<cost> 2-3) with the number of items.
fn shop_program() -> Program {
    let prices: IndexMap<SmolStr, Value> = [("bolt", 2), ("nut", 1)]
        .into_iter()
        .map(|(name, price)| (SmolStr::new(name), Value::Int(price)))
        .collect();
    Program::new("main")
        .global("prices", Value::Dict(prices))
        .function(Function::new("main", SHOP, 1).body(vec![
            Stmt::assign("items", "['bolt', 'nut']"),
            Stmt::assign("total", "cost(len(items))"),
            Stmt::ret("total"),
        ]))
        .function(Function::new("cost", COST, 1).param("n").body(vec![
            Stmt::assign("base", "n * 2"),
            Stmt::ret("base"),
        ]))
}

fn spawn_shop(control: &DebugControl) -> JoinHandle<RunOutcome> {
    let control = control.clone();
    thread::spawn(move || {
        let program = shop_program();
        let frontend = BridgeFrontend::new(control.clone())
            .with_stop_on_entry(false)
            .with_session_wait(SessionWait::NoWait);
        let dispatcher = TraceDispatcher::new(control, frontend);
        Interpreter::new(&program, &dispatcher).run()
    })
}

fn request(seq: u32, command: &str, arguments: Option<JsonValue>) -> Request<JsonValue> {
    Request {
        seq,
        message_type: MessageType::Request,
        command: command.to_string(),
        arguments,
    }
}

fn response<T: DeserializeOwned>(outcome: &DispatchOutcome) -> Response<T> {
    assert_eq!(outcome.responses.len(), 1);
    serde_json::from_value(outcome.responses[0].clone()).unwrap()
}

fn body<T: DeserializeOwned>(outcome: &DispatchOutcome) -> T {
    let response = response::<T>(outcome);
    assert!(response.success, "{:?}", response.message);
    response.body.unwrap()
}

fn error_message(outcome: &DispatchOutcome) -> String {
    let response = response::<JsonValue>(outcome);
    assert!(!response.success);
    response.message.unwrap()
}

fn event_names(outcome: &DispatchOutcome) -> Vec<String> {
    outcome
        .events
        .iter()
        .map(|event| event["event"].as_str().unwrap().to_string())
        .collect()
}

/// Adapter attached to a shop debuggee stopped at `<cost>` line 2.
fn stopped_shop() -> (DebugAdapter, JoinHandle<RunOutcome>) {
    let control = DebugControl::new();
    let mut adapter = DebugAdapter::new(control.clone());
    adapter.dispatch_request(request(1, "initialize", None));
    let outcome = adapter.dispatch_request(request(
        2,
        "setBreakpoints",
        Some(json!({"source": {"path": COST}, "breakpoints": [{"line": 2}]})),
    ));
    assert!(body::<SetBreakpointsResponseBody>(&outcome).breakpoints[0].verified);
    let handle = spawn_shop(&control);
    assert!(control.wait_until_stopped(TIMEOUT));
    (adapter, handle)
}

fn finish(mut adapter: DebugAdapter, handle: JoinHandle<RunOutcome>) -> RunOutcome {
    adapter.control().clear_breakpoints();
    let outcome =
        adapter.dispatch_request(request(90, "continue", Some(json!({"threadId": 1}))));
    assert!(response::<JsonValue>(&outcome).success);
    handle.join().unwrap()
}

#[test]
fn stdio_roundtrip() {
    let payload = r#"{"seq":1,"type":"request","command":"initialize"}"#;
    let mut buffer = Vec::new();
    write_message(&mut buffer, payload).unwrap();
    expect![[r#"Content-Length: 49\r\n\r\n{"seq":1,"type":"request","command":"initialize"}"#]]
        .assert_eq(&String::from_utf8(buffer.clone()).unwrap().replace("\r\n", "\\r\\n"));

    let mut reader = BufReader::new(&buffer[..]);
    let read = read_message(&mut reader).unwrap().unwrap();
    assert_eq!(read, payload);
    assert!(read_message(&mut reader).unwrap().is_none());
}

#[test]
fn malformed_frames_are_errors() {
    let mut reader = BufReader::new(&b"Content-Length: 0\r\n\r\n"[..]);
    assert_eq!(
        read_message(&mut reader).unwrap_err().kind(),
        std::io::ErrorKind::InvalidData
    );
    let mut reader = BufReader::new(&b"X-Other: 1\r\n\r\n{}"[..]);
    assert_eq!(
        read_message(&mut reader).unwrap_err().kind(),
        std::io::ErrorKind::InvalidData
    );
    let mut reader = BufReader::new(&b"Content-Length: 10\r\n"[..]);
    assert_eq!(
        read_message(&mut reader).unwrap_err().kind(),
        std::io::ErrorKind::UnexpectedEof
    );
}

#[test]
fn initialize_advertises_filters_and_attaches_once() {
    let control = DebugControl::new();
    let mut adapter = DebugAdapter::new(control.clone());

    let outcome = adapter.dispatch_request(request(
        1,
        "initialize",
        Some(json!({"clientID": "test", "adapterID": "scriptdbg"})),
    ));
    let capabilities = body::<InitializeResponseBody>(&outcome).capabilities;
    assert_eq!(capabilities.supports_configuration_done_request, Some(true));
    let filters = capabilities
        .exception_breakpoint_filters
        .unwrap()
        .into_iter()
        .map(|filter| filter.filter)
        .collect::<Vec<_>>();
    assert_eq!(filters, vec!["never", "always", "unhandled"]);
    assert_eq!(event_names(&outcome), vec!["initialized"]);
    assert!(adapter.is_attached());
    assert_eq!(control.session_count(), 1);

    adapter.dispatch_request(request(2, "initialize", None));
    assert_eq!(control.session_count(), 1);
}

#[test]
fn unsupported_commands_get_error_responses() {
    let mut adapter = DebugAdapter::new(DebugControl::new());
    let outcome = adapter.dispatch_request(request(7, "restartFrame", None));
    let response = response::<JsonValue>(&outcome);
    assert_eq!(response.request_seq, 7);
    assert_eq!(response.command, "restartFrame");
    assert_eq!(response.message.as_deref(), Some("unsupported command"));

    let mut event = request(8, "initialize", None);
    event.message_type = MessageType::Event;
    assert!(adapter.dispatch_request(event).responses.is_empty());
}

#[test]
fn set_breakpoints_maps_conditions_and_hit_counts() {
    let control = DebugControl::new();
    let mut adapter = DebugAdapter::new(control.clone());

    let outcome = adapter.dispatch_request(request(
        1,
        "setBreakpoints",
        Some(json!({
            "source": {"name": "main.src", "path": "main.src"},
            "breakpoints": [
                {"line": 4, "condition": "x > 2"},
                {"line": 9, "hitCondition": "3"},
                {"line": 12, "hitCondition": "% 2"}
            ]
        })),
    ));
    let breakpoints = body::<SetBreakpointsResponseBody>(&outcome).breakpoints;
    assert_eq!(breakpoints.len(), 3);
    assert!(breakpoints.iter().all(|breakpoint| breakpoint.verified));
    assert_eq!(breakpoints[1].line, Some(9));
    assert_eq!(
        breakpoints[0].source.as_ref().and_then(|source| source.path.as_deref()),
        Some("main.src")
    );
    assert!(breakpoints[2].message.as_deref().unwrap().contains("% 2"));

    let installed = control.breakpoints_in("main.src");
    assert_eq!(installed[0].condition(), Some("x > 2"));
    assert_eq!(installed[0].id(), breakpoints[0].id.unwrap());
    assert_eq!(installed[1].ignore_count, 2);
    assert_eq!(installed[2].ignore_count, 0);

    let outcome = adapter.dispatch_request(request(
        2,
        "setBreakpoints",
        Some(json!({"source": {"path": "main.src"}, "lines": [7]})),
    ));
    assert_eq!(body::<SetBreakpointsResponseBody>(&outcome).breakpoints.len(), 1);
    assert_eq!(control.breakpoints_in("main.src")[0].line(), 7);

    let outcome = adapter.dispatch_request(request(
        3,
        "setBreakpoints",
        Some(json!({"source": {"path": "main.src"}, "breakpoints": []})),
    ));
    assert!(body::<SetBreakpointsResponseBody>(&outcome).breakpoints.is_empty());
    assert!(!control.has_breakpoints_in("main.src"));

    let outcome = adapter.dispatch_request(request(
        4,
        "setBreakpoints",
        Some(json!({"source": {"sourceReference": 3}, "breakpoints": [{"line": 1}]})),
    ));
    assert!(body::<SetBreakpointsResponseBody>(&outcome).breakpoints.is_empty());
}

#[test]
fn exception_breakpoints_select_the_mode() {
    let control = DebugControl::new();
    let mut adapter = DebugAdapter::new(control.clone());
    let mut set = |seq, arguments| {
        let outcome = adapter.dispatch_request(request(seq, "setExceptionBreakpoints", arguments));
        assert!(response::<JsonValue>(&outcome).success);
    };

    set(1, Some(json!({"filters": ["unhandled"]})));
    assert_eq!(control.exception_mode(), ExceptionMode::Unhandled);
    set(2, Some(json!({"filters": ["unhandled", "always"]})));
    assert_eq!(control.exception_mode(), ExceptionMode::All);
    set(
        3,
        Some(json!({
            "filters": ["always"],
            "exceptionOptions": [{"breakMode": "always"}, {"breakMode": "never"}]
        })),
    );
    assert_eq!(control.exception_mode(), ExceptionMode::Never);
    set(4, Some(json!({"filters": []})));
    assert_eq!(control.exception_mode(), ExceptionMode::Never);
}

#[test]
fn threads_report_the_traced_thread() {
    let mut adapter = DebugAdapter::new(DebugControl::new()).with_options(AdapterOptions {
        thread_name: "script".into(),
        request_timeout: TIMEOUT,
    });
    let outcome = adapter.dispatch_request(request(1, "threads", None));
    let threads = body::<ThreadsResponseBody>(&outcome).threads;
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].id, 1);
    assert_eq!(threads[0].name, "script");
}

#[test]
fn running_debuggee_rejects_inspection() {
    let mut adapter = DebugAdapter::new(DebugControl::new()).with_options(AdapterOptions {
        thread_name: "main".into(),
        request_timeout: Duration::from_millis(20),
    });
    let outcome = adapter.dispatch_request(request(
        1,
        "evaluate",
        Some(json!({"expression": "1 + 1"})),
    ));
    assert_eq!(error_message(&outcome), "debuggee is not stopped");

    let outcome = adapter.dispatch_request(request(2, "continue", Some(json!({"threadId": 1}))));
    assert_eq!(error_message(&outcome), "debuggee is not stopped");
    let outcome = adapter.dispatch_request(request(3, "stackTrace", Some(json!({"threadId": 1}))));
    assert_eq!(error_message(&outcome), "debuggee is not stopped");

    let outcome = adapter.dispatch_request(request(4, "pause", Some(json!({"threadId": 4}))));
    assert_eq!(error_message(&outcome), "Invalid threadId '4'");
    let outcome = adapter.dispatch_request(request(5, "pause", Some(json!({"threadId": 1}))));
    assert!(response::<JsonValue>(&outcome).success);
    assert!(outcome.stop_gate.is_some());
}

#[test]
fn stopped_debuggee_exposes_frames_scopes_and_variables() {
    let (mut adapter, handle) = stopped_shop();

    let outcome = adapter.dispatch_request(request(3, "stackTrace", Some(json!({"threadId": 1}))));
    let trace = body::<StackTraceResponseBody>(&outcome);
    assert_eq!(trace.total_frames, Some(2));
    let frames = trace
        .stack_frames
        .iter()
        .map(|frame| (frame.id, frame.name.as_str(), frame.line, frame.column))
        .collect::<Vec<_>>();
    assert_eq!(frames, vec![(1, "cost", 2, 1), (2, "main", 3, 1)]);
    let cost_source = trace.stack_frames[0].source.clone().unwrap();
    assert!(cost_source.path.is_none());
    assert!(cost_source.source_reference.unwrap() > 0);
    let main_source = trace.stack_frames[1].source.clone().unwrap();
    assert_eq!(main_source.path.as_deref(), Some(SHOP));
    assert_eq!(main_source.source_reference, None);

    let outcome = adapter.dispatch_request(request(
        4,
        "stackTrace",
        Some(json!({"threadId": 1, "startFrame": 1, "levels": 1})),
    ));
    let sliced = body::<StackTraceResponseBody>(&outcome);
    assert_eq!(sliced.stack_frames.len(), 1);
    assert_eq!(sliced.stack_frames[0].name, "main");
    assert_eq!(sliced.stack_frames[0].id, 2);
    assert_eq!(sliced.total_frames, Some(2));

    let outcome = adapter.dispatch_request(request(5, "scopes", Some(json!({"frameId": 2}))));
    let scopes = body::<ScopesResponseBody>(&outcome).scopes;
    assert_eq!(scopes[0].name, "Locals");
    assert_eq!(scopes[0].presentation_hint.as_deref(), Some("locals"));
    assert_eq!(scopes[1].name, "Globals");

    let outcome = adapter.dispatch_request(request(
        6,
        "variables",
        Some(json!({"variablesReference": scopes[0].variables_reference})),
    ));
    let locals = body::<VariablesResponseBody>(&outcome).variables;
    assert_eq!(locals[0].name, "items");
    assert_eq!(locals[0].value, "['bolt', 'nut']");
    assert_eq!(locals[0].r#type.as_deref(), Some("list"));
    assert!(locals[0].variables_reference > 0);

    let outcome = adapter.dispatch_request(request(
        7,
        "variables",
        Some(json!({"variablesReference": locals[0].variables_reference})),
    ));
    let items = body::<VariablesResponseBody>(&outcome).variables;
    let items = items
        .iter()
        .map(|item| (item.name.as_str(), item.value.as_str(), item.variables_reference))
        .collect::<Vec<_>>();
    assert_eq!(items, vec![("0", "bolt", 0), ("1", "nut", 0)]);

    let outcome = adapter.dispatch_request(request(
        8,
        "variables",
        Some(json!({"variablesReference": scopes[1].variables_reference})),
    ));
    let globals = body::<VariablesResponseBody>(&outcome).variables;
    let prices = globals.iter().find(|item| item.name == "prices").unwrap();
    assert_eq!(prices.r#type.as_deref(), Some("dict"));
    let outcome = adapter.dispatch_request(request(
        9,
        "variables",
        Some(json!({"variablesReference": prices.variables_reference})),
    ));
    let entries = body::<VariablesResponseBody>(&outcome).variables;
    assert_eq!(entries[0].name, "bolt");
    assert_eq!(entries[0].value, "2");
    assert_eq!(entries[0].r#type.as_deref(), Some("int"));

    assert_eq!(finish(adapter, handle), RunOutcome::Completed(Value::Int(4)));
}

#[test]
fn stopped_debuggee_reports_lookup_errors() {
    let (mut adapter, handle) = stopped_shop();

    let outcome = adapter.dispatch_request(request(3, "stackTrace", Some(json!({"threadId": 5}))));
    assert_eq!(error_message(&outcome), "Unknown threadId '5'");
    let outcome = adapter.dispatch_request(request(4, "scopes", Some(json!({"frameId": 7}))));
    assert_eq!(error_message(&outcome), "Invalid frameId '7'");
    let outcome = adapter.dispatch_request(request(
        5,
        "variables",
        Some(json!({"variablesReference": 999})),
    ));
    assert_eq!(error_message(&outcome), "Unknown variablesReference '999'");
    let outcome = adapter.dispatch_request(request(6, "source", None));
    assert_eq!(error_message(&outcome), "Invalid SourceRequest");
    let outcome = adapter.dispatch_request(request(
        7,
        "source",
        Some(json!({"sourceReference": 42})),
    ));
    assert_eq!(error_message(&outcome), "Unknown source reference '42'");
    let outcome = adapter.dispatch_request(request(
        8,
        "evaluate",
        Some(json!({"expression": "missing + 1"})),
    ));
    assert_eq!(error_message(&outcome), "name 'missing' is not defined");

    assert_eq!(finish(adapter, handle), RunOutcome::Completed(Value::Int(4)));
}

#[test]
fn synthetic_frames_serve_their_source_by_reference() {
    let (mut adapter, handle) = stopped_shop();

    let outcome = adapter.dispatch_request(request(3, "stackTrace", Some(json!({"threadId": 1}))));
    let trace = body::<StackTraceResponseBody>(&outcome);
    let reference = trace.stack_frames[0]
        .source
        .as_ref()
        .and_then(|source| source.source_reference)
        .unwrap();

    let outcome = adapter.dispatch_request(request(
        4,
        "source",
        Some(json!({"source": {"sourceReference": reference}, "sourceReference": reference})),
    ));
    let content = body::<SourceResponseBody>(&outcome).content;
    assert_eq!(content.lines().nth(1).map(str::trim), Some("base = n * 2"));

    // The same file keeps its reference across requests.
    let outcome = adapter.dispatch_request(request(5, "stackTrace", Some(json!({"threadId": 1}))));
    let again = body::<StackTraceResponseBody>(&outcome);
    assert_eq!(
        again.stack_frames[0]
            .source
            .as_ref()
            .and_then(|source| source.source_reference),
        Some(reference)
    );

    assert_eq!(finish(adapter, handle), RunOutcome::Completed(Value::Int(4)));
}

#[test]
fn evaluate_uses_the_requested_frame() {
    let (mut adapter, handle) = stopped_shop();
    let outcome = adapter.dispatch_request(request(2, "stackTrace", Some(json!({"threadId": 1}))));
    let main_id = body::<StackTraceResponseBody>(&outcome).stack_frames[1].id;

    let outcome = adapter.dispatch_request(request(
        3,
        "evaluate",
        Some(json!({"expression": "n * 10", "context": "repl"})),
    ));
    let result = body::<EvaluateResponseBody>(&outcome);
    assert_eq!(result.result, "20");
    assert_eq!(result.r#type.as_deref(), Some("int"));
    assert_eq!(result.variables_reference, 0);

    let outcome = adapter.dispatch_request(request(
        4,
        "evaluate",
        Some(json!({"expression": "items", "frameId": main_id})),
    ));
    let result = body::<EvaluateResponseBody>(&outcome);
    assert_eq!(result.result, "['bolt', 'nut']");
    assert!(result.variables_reference > 0);

    let outcome = adapter.dispatch_request(request(
        5,
        "evaluate",
        Some(json!({"expression": "1", "frameId": 9})),
    ));
    assert_eq!(error_message(&outcome), "Invalid frameId '9'");

    assert_eq!(finish(adapter, handle), RunOutcome::Completed(Value::Int(4)));
}

#[test]
fn stepping_invalidates_variable_references() {
    let (mut adapter, handle) = stopped_shop();
    let control = adapter.control().clone();
    let first = control.snapshot_generation();

    let outcome = adapter.dispatch_request(request(2, "stackTrace", Some(json!({"threadId": 1}))));
    let cost_id = body::<StackTraceResponseBody>(&outcome).stack_frames[0].id;
    let outcome =
        adapter.dispatch_request(request(3, "scopes", Some(json!({"frameId": cost_id}))));
    let locals = body::<ScopesResponseBody>(&outcome).scopes[0].variables_reference;

    let outcome = adapter.dispatch_request(request(4, "next", Some(json!({"threadId": 1}))));
    assert!(response::<JsonValue>(&outcome).success);
    assert!(outcome.stop_gate.is_some());
    drop(outcome);
    assert!(control.wait_until_stopped(TIMEOUT));
    assert!(control.snapshot_generation() > first);
    assert_eq!(
        control.with_snapshot(|snapshot| snapshot.current_frame().map(|frame| frame.line)),
        Some(Some(3))
    );

    let outcome = adapter.dispatch_request(request(
        5,
        "variables",
        Some(json!({"variablesReference": locals})),
    ));
    assert_eq!(
        error_message(&outcome),
        format!("Unknown variablesReference '{locals}'")
    );
    let outcome = adapter.dispatch_request(request(6, "stackTrace", Some(json!({"threadId": 1}))));
    let fresh_id = body::<StackTraceResponseBody>(&outcome).stack_frames[0].id;
    assert_ne!(fresh_id, cost_id);
    let outcome =
        adapter.dispatch_request(request(7, "scopes", Some(json!({"frameId": fresh_id}))));
    let scopes = body::<ScopesResponseBody>(&outcome).scopes;
    assert_ne!(scopes[0].variables_reference, locals);

    assert_eq!(finish(adapter, handle), RunOutcome::Completed(Value::Int(4)));
}

#[test]
fn stepping_invalidates_frame_ids() {
    let (mut adapter, handle) = stopped_shop();
    let control = adapter.control().clone();

    let outcome = adapter.dispatch_request(request(2, "stackTrace", Some(json!({"threadId": 1}))));
    let frames = body::<StackTraceResponseBody>(&outcome).stack_frames;
    let (cost_id, main_id) = (frames[0].id, frames[1].id);

    let outcome = adapter.dispatch_request(request(3, "next", Some(json!({"threadId": 1}))));
    assert!(response::<JsonValue>(&outcome).success);
    drop(outcome);
    assert!(control.wait_until_stopped(TIMEOUT));

    for (seq, frame_id) in [(4, cost_id), (5, main_id)] {
        let outcome =
            adapter.dispatch_request(request(seq, "scopes", Some(json!({"frameId": frame_id}))));
        assert_eq!(error_message(&outcome), format!("Invalid frameId '{frame_id}'"));
    }
    let outcome = adapter.dispatch_request(request(
        6,
        "evaluate",
        Some(json!({"expression": "1", "frameId": main_id})),
    ));
    assert_eq!(error_message(&outcome), format!("Invalid frameId '{main_id}'"));

    assert_eq!(finish(adapter, handle), RunOutcome::Completed(Value::Int(4)));
}

#[test]
fn resuming_holds_the_stop_gate_before_the_debuggee_runs() {
    let (mut adapter, handle) = stopped_shop();
    let control = adapter.control().clone();
    let (stop_tx, stop_rx) = mpsc::channel();
    control.set_stop_sender(stop_tx);
    let gate = adapter.stop_gate.clone();
    let watcher = thread::spawn(move || {
        let stop = stop_rx.recv_timeout(TIMEOUT).unwrap();
        (stop.reason, gate.is_held())
    });

    let outcome = adapter.dispatch_request(request(3, "next", Some(json!({"threadId": 1}))));
    assert!(response::<JsonValue>(&outcome).success);
    let (reason, held) = watcher.join().unwrap();
    assert_eq!(reason, DebugStopReason::Step);
    assert!(held, "stop arrived before the gate was taken");
    drop(outcome);
    assert!(!adapter.stop_gate.is_held());

    control.clear_stop_sender();
    assert_eq!(finish(adapter, handle), RunOutcome::Completed(Value::Int(4)));
}

#[test]
fn initialize_reannounces_an_existing_stop() {
    let (adapter, handle) = stopped_shop();
    let control = adapter.control().clone();

    let mut second = DebugAdapter::new(control.clone());
    let outcome = second.dispatch_request(request(1, "initialize", None));
    assert_eq!(event_names(&outcome), vec!["initialized", "output", "stopped"]);
    let stopped = outcome.events.last().unwrap();
    assert_eq!(stopped["body"]["reason"], "breakpoint");
    assert_eq!(stopped["body"]["threadId"], 1);
    assert!(outcome.stop_gate.is_some());
    assert_eq!(control.session_count(), 2);
    drop(outcome);

    let outcome = second.dispatch_request(request(2, "disconnect", None));
    assert!(outcome.should_exit);
    assert!(control.is_stopped());
    assert_eq!(finish(adapter, handle), RunOutcome::Completed(Value::Int(4)));
}

#[test]
fn disconnect_resumes_and_ends_the_session() {
    let (mut adapter, handle) = stopped_shop();
    let control = adapter.control().clone();
    control.clear_breakpoints();

    let outcome = adapter.dispatch_request(request(3, "disconnect", Some(json!({}))));
    assert!(outcome.should_exit);
    assert!(response::<JsonValue>(&outcome).success);
    assert_eq!(event_names(&outcome), vec!["output", "terminated"]);
    assert!(!adapter.is_attached());
    assert_eq!(control.session_count(), 0);
    assert_eq!(handle.join().unwrap(), RunOutcome::Completed(Value::Int(4)));
}

#[test]
fn disconnect_can_terminate_the_debuggee() {
    let (mut adapter, handle) = stopped_shop();
    let outcome = adapter.dispatch_request(request(
        3,
        "disconnect",
        Some(json!({"terminateDebuggee": true})),
    ));
    assert!(outcome.should_exit);
    assert_eq!(handle.join().unwrap(), RunOutcome::Aborted);
}
