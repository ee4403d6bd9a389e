#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{json, Value};

use scriptdbg_debug::{AdapterOptions, DebugServer, MemorySourceResolver};
use scriptdbg_runtime::debug::{BridgeFrontend, DebugControl, SessionWait, TraceDispatcher};
use scriptdbg_runtime::harness::{Function, Interpreter, Program, RunOutcome, Stmt};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// `main` (2-4) calls `check(x)` (9: def, 10-11) with 1 then 3.
pub fn check_program() -> Program {
    Program::new("main")
        .function(Function::new("main", "a.src", 1).body(vec![
            Stmt::expr("check(1)"),
            Stmt::expr("check(3)"),
            Stmt::ret("'done'"),
        ]))
        .function(Function::new("check", "a.src", 9).param("x").body(vec![
            Stmt::assign("y", "x * 2"),
            Stmt::ret("y"),
        ]))
}

/// `main` (2) calls `fail` (4: def, 5) which raises an uncaught `RuntimeError`.
pub fn raising_program() -> Program {
    Program::new("main")
        .function(Function::new("main", "r.src", 1).body(vec![Stmt::expr("fail('bad')")]))
        .function(
            Function::new("fail", "r.src", 4)
                .param("why")
                .body(vec![Stmt::raise("RuntimeError", "why")]),
        )
}

/// Serve `control` on an ephemeral local port.
pub fn start_server(control: &DebugControl, program: &Program) -> SocketAddr {
    let options = AdapterOptions {
        thread_name: "main".into(),
        request_timeout: TIMEOUT,
    };
    let server = DebugServer::bind(
        "127.0.0.1:0",
        control.clone(),
        options,
        Arc::new(MemorySourceResolver::from_program(program)),
    )
    .expect("bind debug server");
    let addr = server.local_addr().expect("local addr");
    let _ = server.spawn();
    addr
}

/// Run `program` on its own traced thread.
pub fn spawn_debuggee(
    control: &DebugControl,
    program: Program,
    stop_on_entry: bool,
    wait: SessionWait,
) -> JoinHandle<RunOutcome> {
    let control = control.clone();
    thread::spawn(move || {
        let frontend = BridgeFrontend::new(control.clone())
            .with_stop_on_entry(stop_on_entry)
            .with_session_wait(wait);
        let dispatcher = TraceDispatcher::new(control, frontend);
        Interpreter::new(&program, &dispatcher).run()
    })
}

/// Minimal DAP client speaking Content-Length frames over TCP.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    seq: u64,
    backlog: VecDeque<Value>,
}

impl Client {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect");
        stream.set_read_timeout(Some(TIMEOUT)).expect("read timeout");
        let reader = BufReader::new(stream.try_clone().expect("clone stream"));
        Self {
            reader,
            writer: stream,
            seq: 0,
            backlog: VecDeque::new(),
        }
    }

    pub fn send(&mut self, command: &str, arguments: Value) -> u64 {
        self.seq += 1;
        let message = json!({
            "seq": self.seq,
            "type": "request",
            "command": command,
            "arguments": arguments,
        });
        self.write_raw(&message.to_string());
        self.seq
    }

    pub fn write_raw(&mut self, payload: &str) {
        write!(self.writer, "Content-Length: {}\r\n\r\n{payload}", payload.len())
            .expect("write frame");
        self.writer.flush().expect("flush");
    }

    /// Send a request and return its response, keeping events for later.
    pub fn request(&mut self, command: &str, arguments: Value) -> Value {
        let seq = self.send(command, arguments);
        loop {
            let message = self.read_frame();
            if message["type"] == "response" && message["request_seq"] == seq {
                return message;
            }
            self.backlog.push_back(message);
        }
    }

    /// Next event named `name`, skipping others.
    pub fn wait_event(&mut self, name: &str) -> Value {
        if let Some(index) = self
            .backlog
            .iter()
            .position(|message| message["type"] == "event" && message["event"] == name)
        {
            return self.backlog.remove(index).expect("backlog entry");
        }
        loop {
            let message = self.read_frame();
            if message["type"] == "event" && message["event"] == name {
                return message;
            }
            self.backlog.push_back(message);
        }
    }

    pub fn initialize(&mut self) -> Value {
        let response = self.request("initialize", json!({"clientID": "tests"}));
        assert_eq!(response["success"], true);
        self.wait_event("initialized");
        response
    }

    /// Whether the server closed the connection.
    pub fn closed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(self.reader.read(&mut byte), Ok(0))
    }

    fn read_frame(&mut self) -> Value {
        let mut length = None;
        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).expect("read header");
            assert!(read > 0, "connection closed");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.strip_prefix("Content-Length:") {
                length = Some(value.trim().parse::<usize>().expect("length"));
            }
        }
        let mut buffer = vec![0u8; length.expect("Content-Length header")];
        self.reader.read_exact(&mut buffer).expect("read body");
        serde_json::from_slice(&buffer).expect("json body")
    }
}
