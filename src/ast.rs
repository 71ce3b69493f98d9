use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tokenizer::keyword::NonFuncKeyword;

/// Literal values that can appear directly in script source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Undefined => write!(f, "undefined"),
            Literal::Null => write!(f, "null"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// A node of the parse tree.
///
/// Exactly one of `fn_name`, `value`, `var_ref` or `keyword` decides what the
/// statement is. `label`, `opt`, `set` and `comment` only decorate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub fn_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Statement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub opt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<NonFuncKeyword>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Borrowed view of the primary determinant of a statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementKind<'a> {
    Call {
        name: &'a str,
        params: &'a [Statement],
    },
    Value(&'a Literal),
    VarRef(&'a str),
    Keyword(NonFuncKeyword),
    /// Statement with nothing filled in yet (only seen in partial parse output)
    Empty,
}

impl Statement {
    pub fn call(name: impl Into<String>, params: Vec<Statement>) -> Self {
        Self {
            fn_name: Some(name.into()),
            params,
            ..Default::default()
        }
    }

    pub fn literal(value: Literal) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(Literal::String(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Self::literal(Literal::Number(value))
    }

    pub fn var_ref(name: impl Into<String>) -> Self {
        Self {
            var_ref: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn keyword(keyword: NonFuncKeyword) -> Self {
        Self {
            keyword: Some(keyword),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>, opt: bool) -> Self {
        self.label = Some(label.into());
        self.opt = opt;
        self
    }

    pub fn kind(&self) -> StatementKind<'_> {
        if let Some(name) = &self.fn_name {
            StatementKind::Call {
                name,
                params: &self.params,
            }
        } else if let Some(value) = &self.value {
            StatementKind::Value(value)
        } else if let Some(name) = &self.var_ref {
            StatementKind::VarRef(name)
        } else if let Some(keyword) = self.keyword {
            StatementKind::Keyword(keyword)
        } else {
            StatementKind::Empty
        }
    }

    pub fn is_call_to(&self, name: &str) -> bool {
        self.fn_name.as_deref() == Some(name)
    }
}

/// Source-like rendering, used in error messages and the CLI.
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{}{}: ", label, if self.opt { "?" } else { "" })?;
        }
        if let Some(set) = &self.set {
            write!(f, "{} = ", set)?;
        }
        match self.kind() {
            StatementKind::Call { name, params } => {
                write!(f, "{}(", name)?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            StatementKind::Value(v) => write!(f, "{}", v),
            StatementKind::VarRef(name) => write!(f, "{}", name),
            StatementKind::Keyword(k) => write!(f, "{}", k),
            StatementKind::Empty => Ok(()),
        }
    }
}

/// A function declared with a `> name(...)` header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvoFunction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub params: Vec<Statement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params_name: Option<String>,
    #[serde(default)]
    pub body: Vec<Statement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

pub const FUNCTION_ROLE: &str = "function";

/// One top-level block of a script: a role turn or a function declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvoMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<Statement>,
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ConvoFunction>,
}

impl ConvoMessage {
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Default::default()
        }
    }

    pub fn function(function: ConvoFunction) -> Self {
        Self {
            role: FUNCTION_ROLE.to_string(),
            function: Some(function),
            ..Default::default()
        }
    }

    pub fn is_function(&self) -> bool {
        self.function.is_some()
    }
}
