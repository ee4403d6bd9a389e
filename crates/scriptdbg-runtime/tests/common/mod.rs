#![allow(dead_code)]

use std::thread::{self, JoinHandle};

use scriptdbg_runtime::debug::{BridgeFrontend, DebugControl, SessionWait, TraceDispatcher};
use scriptdbg_runtime::harness::{Function, Interpreter, Program, RunOutcome, Stmt};

pub const LAWS: &str = "<laws>";

/// `main` (lines 2-4) calls `outer` (6: def, 7-8) twice, which calls `inner` (10: def, 11-12).
pub fn laws_program() -> Program {
    Program::new("main")
        .function(Function::new("main", LAWS, 1).body(vec![
            Stmt::assign("a", "outer(1)"),
            Stmt::assign("b", "outer(2)"),
            Stmt::ret("a + b"),
        ]))
        .function(Function::new("outer", LAWS, 6).param("n").body(vec![
            Stmt::assign("m", "inner(n)"),
            Stmt::ret("m + 1"),
        ]))
        .function(Function::new("inner", LAWS, 10).param("k").body(vec![
            Stmt::assign("t", "k * 10"),
            Stmt::ret("t"),
        ]))
}

/// `main` (line 2) calls `fail` (4: def, 5) which raises an uncaught `RuntimeError`.
pub fn raising_program() -> Program {
    Program::new("main")
        .function(Function::new("main", LAWS, 1).body(vec![Stmt::expr("fail('bad')")]))
        .function(
            Function::new("fail", LAWS, 4)
                .param("why")
                .body(vec![Stmt::raise("RuntimeError", "why")]),
        )
}

/// `main` (2-4) calls `check(x)` (9: def, 10-11) with 1 then 3, in a real-looking file.
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

/// Run `program` on its own thread behind a bridge front-end.
pub fn spawn_debuggee(
    control: &DebugControl,
    program: Program,
    stop_on_entry: bool,
) -> JoinHandle<RunOutcome> {
    let control = control.clone();
    thread::spawn(move || {
        let frontend = BridgeFrontend::new(control.clone())
            .with_stop_on_entry(stop_on_entry)
            .with_session_wait(SessionWait::NoWait);
        let dispatcher = TraceDispatcher::new(control, frontend);
        Interpreter::new(&program, &dispatcher).run()
    })
}
