//! Inspection values copied out of the traced runtime.

use std::fmt;

use indexmap::IndexMap;
use smol_str::SmolStr;

/// Owned copy of a runtime value, safe to keep after the originating frame is gone.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value.
    None,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Str(SmolStr),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Mapping keyed by the string form of the original key.
    Dict(IndexMap<SmolStr, Value>),
    /// Any other runtime object, described by its type and representation.
    Object {
        /// Runtime type name.
        type_name: SmolStr,
        /// Printable representation.
        repr: SmolStr,
    },
}

impl Value {
    /// Build a string value.
    #[must_use]
    pub fn str(text: impl Into<SmolStr>) -> Self {
        Self::Str(text.into())
    }

    /// Type label reported to debug clients.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::None | Value::Object { .. } => "object",
        }
    }

    /// Truthiness as used for breakpoint conditions.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Str(value) => !value.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            Value::Object { .. } => true,
        }
    }

    /// Whether inspection can expand this value into children.
    #[must_use]
    pub fn has_children(&self) -> bool {
        match self {
            Value::List(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            _ => false,
        }
    }

    /// Child entries as (name, value) pairs.
    #[must_use]
    pub fn children(&self) -> Vec<(SmolStr, Value)> {
        match self {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| (SmolStr::new(idx.to_string()), item.clone()))
                .collect(),
            Value::Dict(entries) => entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Quoted representation (strings carry quotes).
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Value::Str(text) => format!("'{}'", text.replace('\'', "\\'")),
            Value::Object { repr, .. } => repr.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => {
                if value.is_finite() && value.fract() == 0.0 {
                    write!(f, "{value:.1}")
                } else {
                    write!(f, "{value}")
                }
            }
            Value::Str(text) => f.write_str(text),
            Value::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.repr())?;
                }
                f.write_str("]")
            }
            Value::Dict(entries) => {
                f.write_str("{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{key}': {}", value.repr())?;
                }
                f.write_str("}")
            }
            Value::Object { repr, .. } => f.write_str(repr),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}
