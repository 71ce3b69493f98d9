//! Parser and scope evaluator for convo scripts.
//!
//! A script is a sequence of `> role` messages, which may embed expressions
//! with `{{ }}`, and `> name(params) -> (body)` function declarations.
//! [`parser::parse`] turns source text into [`ast::ConvoMessage`]s and
//! [`eval::Evaluator`] walks the resulting statement trees.

pub mod ast;
pub mod capability;
pub mod config;
pub mod conversation;
pub mod error;
pub mod eval;
pub mod functions;
pub mod parser;
pub mod tokenizer;

// Re-exports
pub use ast::*;
pub use conversation::{Conversation, FlatMessage};
pub use error::*;
pub use eval::{EvalError, EvalResult, Evaluator, ExecutionContext, Value};
pub use parser::{parse, ParseError, ParseErrorKind, ParseResult};
