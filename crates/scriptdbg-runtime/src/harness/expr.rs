//! Expression language of the simulated runtime.

use smol_str::SmolStr;

use crate::error::EvalError;
use crate::value::Value;

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(SmolStr),
    List(Vec<Expr>),
    Call(SmolStr, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// Name resolution and calls available to an evaluation.
pub(crate) trait Env {
    type Error: From<EvalError>;

    fn lookup(&self, name: &str) -> Option<Value>;

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(SmolStr),
    Ident(SmolStr),
    Op(&'static str),
}

fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        let ch = chars[pos];
        if ch.is_whitespace() {
            pos += 1;
            continue;
        }
        if ch.is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            let token = if text.contains('.') {
                text.parse().map(Token::Float).ok()
            } else {
                text.parse().map(Token::Int).ok()
            };
            tokens.push(token.ok_or_else(|| EvalError::Syntax(format!("bad number '{text}'").into()))?);
            continue;
        }
        if ch.is_alphabetic() || ch == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            tokens.push(Token::Ident(text.into()));
            continue;
        }
        if ch == '\'' || ch == '"' {
            let quote = ch;
            let mut text = String::new();
            pos += 1;
            loop {
                match chars.get(pos) {
                    None => return Err(EvalError::Syntax("unterminated string".into())),
                    Some('\\') => {
                        if let Some(next) = chars.get(pos + 1) {
                            text.push(*next);
                        }
                        pos += 2;
                    }
                    Some(c) if *c == quote => {
                        pos += 1;
                        break;
                    }
                    Some(c) => {
                        text.push(*c);
                        pos += 1;
                    }
                }
            }
            tokens.push(Token::Str(text.into()));
            continue;
        }
        let two: String = chars[pos..chars.len().min(pos + 2)].iter().collect();
        let op = match two.as_str() {
            "==" => Some("=="),
            "!=" => Some("!="),
            "<=" => Some("<="),
            ">=" => Some(">="),
            _ => None,
        };
        if let Some(op) = op {
            tokens.push(Token::Op(op));
            pos += 2;
            continue;
        }
        let op = match ch {
            '+' => "+",
            '-' => "-",
            '*' => "*",
            '/' => "/",
            '%' => "%",
            '<' => "<",
            '>' => ">",
            '(' => "(",
            ')' => ")",
            '[' => "[",
            ']' => "]",
            ',' => ",",
            other => return Err(EvalError::Syntax(format!("unexpected '{other}'").into())),
        };
        tokens.push(Token::Op(op));
        pos += 1;
    }
    Ok(tokens)
}

const MAX_NESTING: usize = 64;

/// Parse expression source text.
pub fn parse(source: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    if parser.pos != parser.tokens.len() {
        return Err(EvalError::Syntax(format!("unexpected trailing input in '{source}'").into()));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(found)) if *found == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(found)) if found == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), EvalError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(EvalError::Syntax(format!("expected '{op}'").into()))
        }
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        if self.depth >= MAX_NESTING {
            return Err(EvalError::Syntax("expression nested too deeply".into()));
        }
        self.depth += 1;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        self.nested(|parser| {
            let mut left = parser.and()?;
            while parser.eat_keyword("or") {
                left = Expr::Or(Box::new(left), Box::new(parser.and()?));
            }
            Ok(left)
        })
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.not()?;
        while self.eat_keyword("and") {
            left = Expr::And(Box::new(left), Box::new(self.not()?));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, EvalError> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.nested(Self::not)?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let left = self.sum()?;
        let op = match self.peek() {
            Some(Token::Op("==")) => BinaryOp::Eq,
            Some(Token::Op("!=")) => BinaryOp::Ne,
            Some(Token::Op("<")) => BinaryOp::Lt,
            Some(Token::Op("<=")) => BinaryOp::Le,
            Some(Token::Op(">")) => BinaryOp::Gt,
            Some(Token::Op(">=")) => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        Ok(Expr::Binary(op, Box::new(left), Box::new(self.sum()?)))
    }

    fn sum(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;
        loop {
            let op = if self.eat_op("+") {
                BinaryOp::Add
            } else if self.eat_op("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            left = Expr::Binary(op, Box::new(left), Box::new(self.term()?));
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat_op("*") {
                BinaryOp::Mul
            } else if self.eat_op("/") {
                BinaryOp::Div
            } else if self.eat_op("%") {
                BinaryOp::Mod
            } else {
                return Ok(left);
            };
            left = Expr::Binary(op, Box::new(left), Box::new(self.unary()?));
        }
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat_op("-") {
            return Ok(Expr::Neg(Box::new(self.nested(Self::unary)?)));
        }
        let mut expr = self.primary()?;
        while self.eat_op("[") {
            let index = self.or()?;
            self.expect_op("]")?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
        }
        Ok(expr)
    }

    fn items(&mut self, close: &str) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        if self.eat_op(close) {
            return Ok(items);
        }
        loop {
            items.push(self.or()?);
            if self.eat_op(close) {
                return Ok(items);
            }
            self.expect_op(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(EvalError::Syntax("unexpected end of expression".into()));
        };
        self.pos += 1;
        match token {
            Token::Int(value) => Ok(Expr::Literal(Value::Int(value))),
            Token::Float(value) => Ok(Expr::Literal(Value::Float(value))),
            Token::Str(text) => Ok(Expr::Literal(Value::Str(text))),
            Token::Ident(name) => match name.as_str() {
                "True" => Ok(Expr::Literal(Value::Bool(true))),
                "False" => Ok(Expr::Literal(Value::Bool(false))),
                "None" => Ok(Expr::Literal(Value::None)),
                "and" | "or" | "not" => Err(EvalError::Syntax(format!("unexpected '{name}'").into())),
                _ => {
                    if self.eat_op("(") {
                        Ok(Expr::Call(name, self.items(")")?))
                    } else {
                        Ok(Expr::Name(name))
                    }
                }
            },
            Token::Op("(") => {
                let inner = self.or()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Token::Op("[") => Ok(Expr::List(self.items("]")?)),
            Token::Op(op) => Err(EvalError::Syntax(format!("unexpected '{op}'").into())),
        }
    }
}

/// Evaluate a parsed expression.
pub(crate) fn eval<E: Env + ?Sized>(env: &E, expr: &Expr) -> Result<Value, E::Error> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => env
            .lookup(name)
            .ok_or_else(|| EvalError::UndefinedName(name.clone()).into()),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(env, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval(env, arg))
                .collect::<Result<Vec<_>, _>>()?;
            env.call(name, args)
        }
        Expr::Index(target, index) => {
            let target = eval(env, target)?;
            let index = eval(env, index)?;
            Ok(subscript(&target, &index)?)
        }
        Expr::Neg(inner) => match eval(env, inner)? {
            Value::Int(value) => Ok(Value::Int(value.checked_neg().ok_or(EvalError::Overflow)?)),
            Value::Float(value) => Ok(Value::Float(-value)),
            other => Err(EvalError::Raised {
                type_name: "TypeError".into(),
                message: format!("bad operand type for unary -: '{}'", other.type_name()).into(),
            }
            .into()),
        },
        Expr::Not(inner) => Ok(Value::Bool(!eval(env, inner)?.is_truthy())),
        Expr::And(left, right) => {
            let left = eval(env, left)?;
            if left.is_truthy() {
                eval(env, right)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = eval(env, left)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                eval(env, right)
            }
        }
        Expr::Binary(op, left, right) => {
            let left = eval(env, left)?;
            let right = eval(env, right)?;
            Ok(binary(*op, &left, &right)?)
        }
    }
}

/// Builtin functions available to every program.
pub(crate) fn call_builtin(name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
    let result = match (name, args) {
        ("len", [Value::Str(text)]) => Ok(Value::Int(count(text.chars().count()))),
        ("len", [Value::List(items)]) => Ok(Value::Int(count(items.len()))),
        ("len", [Value::Dict(entries)]) => Ok(Value::Int(count(entries.len()))),
        ("len", [other]) => Err(EvalError::Raised {
            type_name: "TypeError".into(),
            message: format!("object of type '{}' has no len()", other.type_name()).into(),
        }),
        ("str", [value]) => Ok(Value::str(value.to_string())),
        ("len" | "str", _) => Err(EvalError::InvalidArgumentCount {
            name: name.into(),
            expected: 1,
            got: args.len(),
        }),
        _ => return None,
    };
    Some(result)
}

fn count(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn subscript(target: &Value, index: &Value) -> Result<Value, EvalError> {
    match (target, index) {
        (Value::List(items), Value::Int(position)) => {
            let len = count(items.len());
            let resolved = if *position < 0 { len + position } else { *position };
            usize::try_from(resolved)
                .ok()
                .and_then(|idx| items.get(idx))
                .cloned()
                .ok_or_else(|| EvalError::Raised {
                    type_name: "IndexError".into(),
                    message: "list index out of range".into(),
                })
        }
        (Value::Dict(entries), key) => {
            let key = SmolStr::new(key.to_string());
            entries.get(&key).cloned().ok_or_else(|| EvalError::Raised {
                type_name: "KeyError".into(),
                message: Value::Str(key).repr().into(),
            })
        }
        _ => Err(EvalError::Raised {
            type_name: "TypeError".into(),
            message: format!("'{}' object is not subscriptable", target.type_name()).into(),
        }),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        #[allow(clippy::cast_precision_loss)]
        Value::Int(value) => Some(*value as f64),
        Value::Float(value) => Some(*value),
        Value::Bool(value) => Some(f64::from(u8::from(*value))),
        _ => None,
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let unsupported = || EvalError::UnsupportedOperands {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    };
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::Ne => return Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                _ => {
                    let (Some(a), Some(b)) = (as_float(left), as_float(right)) else {
                        return Err(unsupported());
                    };
                    a.partial_cmp(&b).ok_or_else(unsupported)?
                }
            };
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            return Ok(Value::Bool(result));
        }
        _ => {}
    }

    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (_, Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or(EvalError::Overflow),
                BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or(EvalError::Overflow),
                BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or(EvalError::Overflow),
                BinaryOp::Div if b == 0 => Err(EvalError::DivisionByZero),
                #[allow(clippy::cast_precision_loss)]
                BinaryOp::Div => Ok(Value::Float(a as f64 / b as f64)),
                BinaryOp::Mod if b == 0 => Err(EvalError::DivisionByZero),
                BinaryOp::Mod => {
                    let rem = a.checked_rem(b).ok_or(EvalError::Overflow)?;
                    if rem != 0 && (rem < 0) != (b < 0) {
                        Ok(Value::Int(rem + b))
                    } else {
                        Ok(Value::Int(rem))
                    }
                }
                _ => Err(unsupported()),
            }
        }
        _ => {
            let (Some(a), Some(b)) = (as_float(left), as_float(right)) else {
                return Err(unsupported());
            };
            match op {
                BinaryOp::Add => Ok(Value::Float(a + b)),
                BinaryOp::Sub => Ok(Value::Float(a - b)),
                BinaryOp::Mul => Ok(Value::Float(a * b)),
                BinaryOp::Div | BinaryOp::Mod if b == 0.0 => Err(EvalError::DivisionByZero),
                BinaryOp::Div => Ok(Value::Float(a / b)),
                BinaryOp::Mod => Ok(Value::Float(a - b * (a / b).floor())),
                _ => Err(unsupported()),
            }
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            as_float(left) == as_float(right)
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    struct MapEnv(IndexMap<SmolStr, Value>);

    impl Env for MapEnv {
        type Error = EvalError;

        fn lookup(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }

        fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
            call_builtin(name, &args).unwrap_or_else(|| Err(EvalError::NotCallable(name.into())))
        }
    }

    fn run(source: &str) -> Result<Value, EvalError> {
        let mut vars = IndexMap::new();
        vars.insert(SmolStr::new("x"), Value::Int(3));
        vars.insert(SmolStr::new("name"), Value::str("bolts"));
        eval(&MapEnv(vars), &parse(source)?)
    }

    #[test]
    fn arithmetic_follows_script_semantics() {
        assert_eq!(run("x * 2 + 1"), Ok(Value::Int(7)));
        assert_eq!(run("7 / 2"), Ok(Value::Float(3.5)));
        assert_eq!(run("-7 % 3"), Ok(Value::Int(2)));
        assert_eq!(run("'n=' + str(x)"), Ok(Value::str("n=3")));
        assert_eq!(run("len(name) + len([1, 2])"), Ok(Value::Int(7)));
        assert_eq!(run("[1, 2, 3][-1]"), Ok(Value::Int(3)));
    }

    #[test]
    fn comparisons_and_boolean_operators() {
        assert_eq!(run("x > 2"), Ok(Value::Bool(true)));
        assert_eq!(run("x > 2 and name == 'nuts'"), Ok(Value::Bool(false)));
        assert_eq!(run("0 or 'fallback'"), Ok(Value::str("fallback")));
        assert_eq!(run("not x"), Ok(Value::Bool(false)));
        assert_eq!(run("1 == 1.0"), Ok(Value::Bool(true)));
    }

    #[test]
    fn errors_are_typed() {
        assert_eq!(run("y + 1"), Err(EvalError::UndefinedName("y".into())));
        assert_eq!(run("x / 0"), Err(EvalError::DivisionByZero));
        assert!(matches!(run("x +"), Err(EvalError::Syntax(_))));
        assert!(matches!(
            run("name - 1"),
            Err(EvalError::UnsupportedOperands { op: "-", .. })
        ));
        assert_eq!(run("nope(1)"), Err(EvalError::NotCallable("nope".into())));
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(parse(&parens), Err(EvalError::Syntax(_))));
        let negations = format!("{}1", "-".repeat(100_000));
        assert!(matches!(parse(&negations), Err(EvalError::Syntax(_))));
        let nots = format!("{}x", "not ".repeat(100_000));
        assert!(matches!(parse(&nots), Err(EvalError::Syntax(_))));
        assert_eq!(run(&format!("{}x{}", "(".repeat(20), ")".repeat(20))), Ok(Value::Int(3)));
    }
}
