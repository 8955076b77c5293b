//! Generated cell values.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A single generated cell.
///
/// Values are hashable so they can be stored in the value cache and in
/// unique-constraint state. Floats compare and hash by bit pattern.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Format as a PostgreSQL literal for INSERT statements
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Text(s) => format!("'{}'", escape_postgres_string(s)),
            Value::Bytes(b) => format!("'\\x{}'", hex::encode(b)),
        }
    }

    /// Format as a field of PostgreSQL COPY text format (tab-separated)
    pub fn to_copy_field(&self) -> String {
        match self {
            Value::Null => "\\N".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Bool(b) => if *b { "t" } else { "f" }.to_string(),
            Value::Text(s) => escape_postgres_copy(s),
            Value::Bytes(b) => format!("\\\\x{}", hex::encode(b)),
        }
    }

    /// Convert a YAML scalar (as found in `oneof` item lists) into a value
    pub fn from_yaml(value: &serde_yaml_ng::Value) -> Option<Self> {
        match value {
            serde_yaml_ng::Value::Null => Some(Value::Null),
            serde_yaml_ng::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_yaml_ng::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_yaml_ng::Value::String(s) => Some(Value::Text(s.clone())),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "\\x{}", hex::encode(b)),
        }
    }
}

fn escape_postgres_string(s: &str) -> String {
    s.replace('\'', "''")
}

fn escape_postgres_copy(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
