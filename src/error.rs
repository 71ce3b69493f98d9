use thiserror::Error;

use crate::capability::CapabilityError;
use crate::eval::evaluator::EvalError;
use crate::parser::ParseError;

#[derive(Error, Debug)]
pub enum ConvoError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, ConvoError>;

// エラー作成用のヘルパー関数
impl ConvoError {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        ConvoError::Internal(message.into())
    }
}
