use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ast::ConvoMessage;
use crate::eval::{EvalError, EvalResult, Evaluator, ExecutionContext, Value};
use crate::parser::{parse, ParseError};

/// A role message with its content fully evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatMessage {
    pub role: String,
    pub content: String,
}

/// Parsed messages plus the state they are evaluated against.
///
/// Function declarations are registered in the context as they are appended,
/// so later messages and [`Conversation::call_function`] can use them.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ConvoMessage>,
    evaluator: Evaluator,
    ctx: ExecutionContext,
}

impl Conversation {
    pub fn new(evaluator: Evaluator, ctx: ExecutionContext) -> Self {
        Self {
            messages: Vec::new(),
            evaluator,
            ctx,
        }
    }

    pub fn messages(&self) -> &[ConvoMessage] {
        &self.messages
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.ctx
    }

    /// Parses `code` and appends its messages. Nothing is appended when the
    /// code fails to parse.
    pub fn append(&mut self, code: &str) -> Result<(), ParseError> {
        let messages = parse(code).into_result()?;
        for message in &messages {
            if let Some(function) = &message.function {
                debug!("register function {}", function.name);
                self.ctx.define_function(function.clone());
            }
        }
        info!("appended {} messages", messages.len());
        self.messages.extend(messages);
        Ok(())
    }

    /// Evaluates every role message in order. Function declarations are not
    /// part of the output.
    ///
    /// Messages share variables with each other, but each call starts from
    /// the conversation's base context and leaves it unchanged.
    pub async fn flatten(&self) -> EvalResult<Vec<FlatMessage>> {
        let mut ctx = self.ctx.clone();
        let mut flat = Vec::new();
        for message in &self.messages {
            if message.is_function() {
                continue;
            }
            let content = match (&message.statement, &message.content) {
                (Some(statement), _) => {
                    let value = self.evaluator.evaluate(statement, &mut ctx).await?;
                    value.to_string()
                }
                (None, Some(content)) => content.clone(),
                (None, None) => String::new(),
            };
            flat.push(FlatMessage {
                role: message.role.clone(),
                content,
            });
        }
        Ok(flat)
    }

    /// Calls a declared function against a copy of the base context.
    pub async fn call_function(&self, name: &str, args: Value) -> EvalResult<Value> {
        let function = self
            .ctx
            .function(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        let mut ctx = self.ctx.clone();
        self.evaluator.call_function(&function, args, &mut ctx).await
    }
}
