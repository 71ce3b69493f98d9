use std::cmp::Ordering;
use std::fmt;

use crate::ast::Literal;

/// Distinguished control values passed between sibling statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum ControlSignal {
    /// The previous branch test passed (`ifTrue`)
    #[strum(serialize = "ifTrue")]
    True,
    /// The previous branch test failed (`ifFalse`)
    #[strum(serialize = "ifFalse")]
    False,
    /// An iterator ran out of items
    Break,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Value,
    pub optional: bool,
}

/// Runtime type values produced by the type constructors.
#[derive(Debug, Clone, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConvoType {
    String,
    Number,
    Int,
    Boolean,
    Time,
    Void,
    Any,
    Enum(Vec<Value>),
    Struct(Vec<StructField>),
    Map,
    Array,
}

impl ConvoType {
    pub fn check(&self, value: &Value) -> bool {
        match self {
            ConvoType::String => matches!(value, Value::String(_)),
            ConvoType::Number => matches!(value, Value::Number(_)),
            ConvoType::Int => matches!(value, Value::Number(n) if n.is_finite() && n.fract() == 0.0),
            ConvoType::Boolean => matches!(value, Value::Boolean(_)),
            ConvoType::Time => match value {
                Value::Number(n) => n.is_finite(),
                Value::String(s) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
                _ => false,
            },
            ConvoType::Void => matches!(value, Value::Undefined | Value::Null),
            ConvoType::Any => true,
            ConvoType::Enum(values) => values.contains(value),
            ConvoType::Struct(fields) => {
                let Value::Object(entries) = value else {
                    return false;
                };
                fields.iter().all(|field| {
                    match entries.iter().find(|(k, _)| *k == field.name) {
                        Some((_, v)) if *v != Value::Undefined => field.matches(v),
                        _ => field.optional,
                    }
                })
            }
            ConvoType::Map => matches!(value, Value::Object(_)),
            ConvoType::Array => matches!(value, Value::Array(_)),
        }
    }
}

impl StructField {
    /// Type values check the candidate, any other value must be equal.
    pub fn matches(&self, value: &Value) -> bool {
        match &self.ty {
            Value::Type(t) => t.check(value),
            other => other == value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// Insertion ordered key/value pairs
    Object(Vec<(String, Value)>),
    Type(ConvoType),
    Signal(ControlSignal),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Signal(ControlSignal::True) => true,
            Value::Signal(_) => false,
            Value::Array(_) | Value::Object(_) | Value::Type(_) => true,
        }
    }

    pub fn is_signal(&self, signal: ControlSignal) -> bool {
        matches!(self, Value::Signal(s) if *s == signal)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Loose numeric conversion used by arithmetic.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Null => 0.0,
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    s.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// Ordering for comparison operators. Only numbers with numbers and
    /// strings with strings are ordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn object() -> Self {
        Value::Object(Vec::new())
    }

    /// Inserts or replaces `key` when `self` is an object.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        if let Value::Object(entries) = self {
            let key = key.into();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
    }

    /// Property access used by dotted references: object keys, array
    /// indexes and `length`. Missing properties are undefined.
    pub fn property(&self, key: &str) -> Value {
        match self {
            Value::Object(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
            Value::Array(items) if key == "length" => Value::Number(items.len() as f64),
            Value::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_default(),
            Value::String(s) if key == "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Undefined,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    Json::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Json::Number)
                        .unwrap_or(Json::Null)
                }
            }
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(entries) => Json::Object(
                entries
                    .iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Type(t) => Json::String(t.to_string()),
            Value::Signal(s) => Json::String(s.to_string()),
        }
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
            Value::Type(t) => write!(f, "{}", t),
            Value::Signal(s) => write!(f, "{}", s),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ControlSignal> for Value {
    fn from(s: ControlSignal) -> Self {
        Value::Signal(s)
    }
}

impl From<ConvoType> for Value {
    fn from(t: ConvoType) -> Self {
        Value::Type(t)
    }
}
