//! Small inventory program used by the demo binary.

use crate::value::Value;

use super::program::{Function, Program, Stmt};

/// File holding the main inventory functions.
pub const DEMO_FILE: &str = "demo/inventory.src";

/// Synthetic file whose source is only available through the debugger.
pub const DEMO_PRICING: &str = "<pricing>";

/// Restocks two items, summarizes the result and trips over a budget check.
///
/// Line layout of [`DEMO_FILE`]: `main` statements on lines 2-10, `restock` on 12-14,
/// `summarize` on 17, `validate` on 20.
#[must_use]
pub fn demo_program() -> Program {
    Program::new("main")
        .global("stock", Value::Int(0))
        .global("budget", Value::Int(10))
        .function(Function::new("main", DEMO_FILE, 1).body(vec![
            Stmt::assign("total", "0"),
            Stmt::assign("total", "total + restock('bolts', 1)"),
            Stmt::assign("total", "total + restock('nuts', 3)"),
            Stmt::assign("report", "summarize(total)"),
            Stmt::try_except(
                vec![Stmt::assign("checked", "validate(total)")],
                vec![Stmt::assign("checked", "False")],
            ),
            Stmt::ret("report"),
        ]))
        .function(
            Function::new("restock", DEMO_FILE, 11)
                .param("item")
                .param("qty")
                .body(vec![
                    Stmt::assign("cost", "price(item) * qty"),
                    Stmt::global("stock", "stock + qty"),
                    Stmt::ret("cost"),
                ]),
        )
        .function(
            Function::new("summarize", DEMO_FILE, 16)
                .param("total")
                .body(vec![Stmt::ret("'total=' + str(total) + ' stock=' + str(stock)")]),
        )
        .function(
            Function::new("validate", DEMO_FILE, 19)
                .param("total")
                .body(vec![Stmt::raise(
                    "ValueError",
                    "'budget ' + str(budget) + ' exceeded by ' + str(total - budget)",
                )]),
        )
        .function(
            Function::new("price", DEMO_PRICING, 1)
                .param("item")
                .body(vec![Stmt::assign("base", "2"), Stmt::ret("base + len(item)")]),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::NoopTraceHook;
    use crate::harness::{Interpreter, RunOutcome};

    #[test]
    fn demo_runs_to_completion_without_a_debugger() {
        let program = demo_program();
        let interp = Interpreter::new(&program, &NoopTraceHook);
        assert_eq!(
            interp.run(),
            RunOutcome::Completed(Value::str("total=25 stock=4"))
        );
    }

    #[test]
    fn layout_matches_documented_lines() {
        let program = demo_program();
        let main = program.get("main").unwrap();
        assert_eq!(main.first_line(), 1);
        assert_eq!(main.last_line(), 10);
        assert_eq!(program.get("restock").unwrap().last_line(), 14);
        assert_eq!(program.get("validate").unwrap().statements()[0].line(), 20);
    }
}
