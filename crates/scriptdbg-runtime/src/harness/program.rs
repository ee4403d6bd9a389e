//! Program model of the simulated runtime.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::value::Value;

/// One numbered statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    line: u32,
    kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `target = expr` in the frame's locals.
    Assign { target: SmolStr, expr: SmolStr },
    /// `target = expr` in the program globals.
    Global { target: SmolStr, expr: SmolStr },
    /// Evaluate and discard.
    Expr(SmolStr),
    Return(Option<SmolStr>),
    Raise { type_name: SmolStr, message: SmolStr },
    Try {
        body: Vec<Stmt>,
        handler_line: u32,
        handler: Vec<Stmt>,
    },
    Pass,
}

impl Stmt {
    fn new(kind: StmtKind) -> Self {
        Self { line: 0, kind }
    }

    pub fn assign(target: &str, expr: &str) -> Self {
        Self::new(StmtKind::Assign {
            target: target.into(),
            expr: expr.into(),
        })
    }

    pub fn global(target: &str, expr: &str) -> Self {
        Self::new(StmtKind::Global {
            target: target.into(),
            expr: expr.into(),
        })
    }

    pub fn expr(source: &str) -> Self {
        Self::new(StmtKind::Expr(source.into()))
    }

    pub fn ret(source: &str) -> Self {
        Self::new(StmtKind::Return(Some(source.into())))
    }

    pub fn ret_none() -> Self {
        Self::new(StmtKind::Return(None))
    }

    /// `raise type_name(message)`; `message` is an expression.
    pub fn raise(type_name: &str, message: &str) -> Self {
        Self::new(StmtKind::Raise {
            type_name: type_name.into(),
            message: message.into(),
        })
    }

    pub fn try_except(body: Vec<Stmt>, handler: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Try {
            body,
            handler_line: 0,
            handler,
        })
    }

    pub fn pass() -> Self {
        Self::new(StmtKind::Pass)
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn kind(&self) -> &StmtKind {
        &self.kind
    }
}

// `try:` and `except:` take a line each; nested blocks follow them.
fn number(stmts: &mut [Stmt], next: &mut u32) {
    for stmt in stmts {
        stmt.line = *next;
        *next += 1;
        if let StmtKind::Try {
            body,
            handler_line,
            handler,
        } = &mut stmt.kind
        {
            number(body, next);
            *handler_line = *next;
            *next += 1;
            number(handler, next);
        }
    }
}

fn render(stmts: &[Stmt], indent: usize, lines: &mut [String]) {
    let pad = "    ".repeat(indent);
    for stmt in stmts {
        let text = match &stmt.kind {
            StmtKind::Assign { target, expr } => format!("{pad}{target} = {expr}"),
            StmtKind::Global { target, expr } => format!("{pad}global {target}; {target} = {expr}"),
            StmtKind::Expr(source) => format!("{pad}{source}"),
            StmtKind::Return(Some(source)) => format!("{pad}return {source}"),
            StmtKind::Return(None) => format!("{pad}return"),
            StmtKind::Raise { type_name, message } => format!("{pad}raise {type_name}({message})"),
            StmtKind::Try {
                body,
                handler_line,
                handler,
            } => {
                render(body, indent + 1, lines);
                if let Some(slot) = slot(lines, *handler_line) {
                    *slot = format!("{pad}except:");
                }
                render(handler, indent + 1, lines);
                format!("{pad}try:")
            }
            StmtKind::Pass => format!("{pad}pass"),
        };
        if let Some(slot) = slot(lines, stmt.line) {
            *slot = text;
        }
    }
}

fn slot(lines: &mut [String], line: u32) -> Option<&mut String> {
    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    lines.get_mut(index)
}

/// A function of the simulated program.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    name: SmolStr,
    file: SmolStr,
    first_line: u32,
    params: Vec<SmolStr>,
    body: Vec<Stmt>,
    last_line: u32,
}

impl Function {
    /// Statements are numbered from `first_line + 1`.
    pub fn new(name: &str, file: &str, first_line: u32) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            first_line,
            params: Vec::new(),
            body: Vec::new(),
            last_line: first_line,
        }
    }

    #[must_use]
    pub fn param(mut self, name: &str) -> Self {
        self.params.push(name.into());
        self
    }

    #[must_use]
    pub fn body(mut self, mut stmts: Vec<Stmt>) -> Self {
        let mut next = self.first_line + 1;
        number(&mut stmts, &mut next);
        self.body = stmts;
        self.last_line = next - 1;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    #[must_use]
    pub fn first_line(&self) -> u32 {
        self.first_line
    }

    #[must_use]
    pub fn last_line(&self) -> u32 {
        self.last_line
    }

    #[must_use]
    pub fn params(&self) -> &[SmolStr] {
        &self.params
    }

    #[must_use]
    pub fn statements(&self) -> &[Stmt] {
        &self.body
    }

    fn render_into(&self, lines: &mut [String]) {
        if let Some(slot) = slot(lines, self.first_line) {
            *slot = format!("def {}({}):", self.name, self.params.join(", "));
        }
        render(&self.body, 1, lines);
    }
}

/// Functions, initial globals and the entry point.
#[derive(Debug, Clone, Default)]
pub struct Program {
    functions: IndexMap<SmolStr, Function>,
    globals: IndexMap<SmolStr, Value>,
    entry: SmolStr,
}

impl Program {
    pub fn new(entry: &str) -> Self {
        Self {
            entry: entry.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn function(mut self, function: Function) -> Self {
        self.functions.insert(function.name.clone(), function);
        self
    }

    #[must_use]
    pub fn global(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    #[must_use]
    pub fn globals(&self) -> &IndexMap<SmolStr, Value> {
        &self.globals
    }

    /// Distinct files, in definition order.
    #[must_use]
    pub fn files(&self) -> Vec<SmolStr> {
        let mut files: Vec<SmolStr> = Vec::new();
        for function in self.functions.values() {
            if !files.contains(&function.file) {
                files.push(function.file.clone());
            }
        }
        files
    }

    /// Pseudo-source of one file with statements on their numbered lines.
    #[must_use]
    pub fn render_file(&self, file: &str) -> Option<String> {
        let functions: Vec<&Function> = self
            .functions
            .values()
            .filter(|function| function.file == file)
            .collect();
        let last = functions.iter().map(|function| function.last_line).max()?;
        let mut lines = vec![String::new(); usize::try_from(last).ok()?];
        for function in functions {
            function.render_into(&mut lines);
        }
        let mut text = lines.join("\n");
        text.push('\n');
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn statements_are_numbered_after_the_definition_line() {
        let function = Function::new("f", "<t>", 3).param("x").body(vec![
            Stmt::assign("y", "x + 1"),
            Stmt::try_except(vec![Stmt::raise("ValueError", "'bad'")], vec![Stmt::pass()]),
            Stmt::ret("y"),
        ]);
        let lines: Vec<u32> = function.statements().iter().map(Stmt::line).collect();
        assert_eq!(lines, vec![4, 5, 9]);
        assert_eq!(function.last_line(), 9);
    }

    #[test]
    fn render_places_statements_on_their_lines() {
        let program = Program::new("f").function(
            Function::new("f", "<t>", 1).param("x").body(vec![
                Stmt::assign("y", "x + 1"),
                Stmt::try_except(vec![Stmt::raise("ValueError", "'bad'")], vec![Stmt::pass()]),
                Stmt::ret("y"),
            ]),
        );
        let text = program.render_file("<t>").unwrap();
        expect![[r#"
            def f(x):
                y = x + 1
                try:
                    raise ValueError('bad')
                except:
                    pass
                return y
        "#]]
        .assert_eq(&text);
        assert!(program.render_file("<missing>").is_none());
    }
}
