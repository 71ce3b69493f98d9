use std::sync::Arc;

use async_recursion::async_recursion;
use thiserror::Error;
use tracing::{instrument, trace};

use crate::ast::{ConvoFunction, Statement, StatementKind};
use crate::capability::CapabilityError;
use crate::parser::BODY_FN;

use super::context::ExecutionContext;
use super::function::{FunctionRegistry, ScopeFunction};
use super::scope::Scope;
use super::value::Value;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Unknown name: {0}")]
    UnknownName(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("{0} is a value and can not be called")]
    NotCallable(String),
    #[error("Invalid arguments for {fn_name}: {message}")]
    InvalidArgs { fn_name: String, message: String },
    #[error("{0}")]
    Capability(#[from] CapabilityError),
    #[error("Can not assign to {path}: {message}")]
    InvalidAssignment { path: String, message: String },
    #[error("Max call depth of {0} exceeded")]
    MaxCallDepth(usize),
    #[error("Max nesting depth of {0} exceeded")]
    MaxNestingDepth(usize),
    #[error("{source} (at `{statement}`)")]
    AtStatement {
        statement: Box<Statement>,
        source: Box<EvalError>,
    },
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    pub fn invalid_args(fn_name: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::InvalidArgs {
            fn_name: fn_name.into(),
            message: message.into(),
        }
    }

    /// Tags the error with the statement it came from. The innermost
    /// statement wins.
    pub fn at(self, statement: &Statement) -> Self {
        match self {
            e @ EvalError::AtStatement { .. } => e,
            e => EvalError::AtStatement {
                statement: Box::new(statement.clone()),
                source: Box::new(e),
            },
        }
    }

    pub fn root(&self) -> &EvalError {
        match self {
            EvalError::AtStatement { source, .. } => source.root(),
            e => e,
        }
    }

    pub fn statement(&self) -> Option<&Statement> {
        match self {
            EvalError::AtStatement { statement, .. } => Some(statement),
            _ => None,
        }
    }

    /// Stable kind string for callers that surface errors as messages.
    pub fn kind(&self) -> &'static str {
        match self.root() {
            EvalError::UnknownName(_) => "unknown-name",
            EvalError::UnknownFunction(_) => "unknown-function",
            EvalError::NotCallable(_) => "not-callable",
            EvalError::InvalidArgs { .. } => "invalid-args",
            EvalError::Capability(_) => "capability",
            EvalError::InvalidAssignment { .. } => "invalid-assignment",
            EvalError::MaxCallDepth(_) => "max-call-depth",
            EvalError::MaxNestingDepth(_) => "max-nesting-depth",
            EvalError::AtStatement { .. } => "internal",
        }
    }
}

/// Walks statement trees with explicit scope frames.
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<FunctionRegistry>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Arc::new(FunctionRegistry::with_defaults()))
    }
}

impl Evaluator {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Top level entry point for a single statement
    pub async fn evaluate(
        &self,
        statement: &Statement,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        let scope = self.execute_scope(statement, None, ctx).await?;
        Ok(scope.value)
    }

    /// Evaluates statements as the children of a `body` call.
    #[instrument(level = "debug", skip_all, fields(len = statements.len()))]
    pub async fn evaluate_body(
        &self,
        statements: &[Statement],
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        let body = Statement::call(BODY_FN, statements.to_vec());
        self.evaluate(&body, ctx).await
    }

    /// Calls a declared function with an argument object.
    #[instrument(level = "debug", skip(self, function, args, ctx), fields(name = %function.name))]
    pub async fn call_function(
        &self,
        function: &ConvoFunction,
        args: Value,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        ctx.enter_call()?;
        ctx.push_frame();
        let result = self.run_function(function, args, ctx).await;
        ctx.pop_frame();
        ctx.exit_call();
        result
    }

    async fn run_function(
        &self,
        function: &ConvoFunction,
        args: Value,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        for decl in &function.params {
            let Some(name) = param_name(decl) else {
                continue;
            };
            let value = args.property(name);
            if value.is_undefined() {
                if !decl.opt && decl.label.is_some() {
                    return Err(EvalError::invalid_args(
                        &function.name,
                        format!("missing required parameter `{}`", name),
                    ));
                }
            } else if decl.label.is_some() {
                if let Value::Type(ty) = self.evaluate(decl, ctx).await? {
                    if !ty.check(&value) {
                        return Err(EvalError::invalid_args(
                            &function.name,
                            format!("parameter `{}` expects {}, got {}", name, ty, value),
                        ));
                    }
                }
            }
            ctx.define_var(name, value);
        }
        if let Some(params_name) = &function.params_name {
            ctx.define_var(params_name.clone(), args);
        }

        let body = Statement::call(BODY_FN, function.body.clone());
        let scope = self.execute_scope(&body, None, ctx).await?;
        Ok(scope.value)
    }

    /// Evaluates one statement in a new frame and returns the frame.
    #[async_recursion]
    pub async fn execute_scope<'s>(
        &self,
        statement: &'s Statement,
        parent: Option<&mut Scope<'s>>,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Scope<'s>> {
        ctx.enter_scope().map_err(|e| e.at(statement))?;
        let result = self.execute_statement(statement, parent, ctx).await;
        ctx.exit_scope();
        result
    }

    async fn execute_statement<'s>(
        &self,
        statement: &'s Statement,
        parent: Option<&mut Scope<'s>>,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Scope<'s>> {
        let mut scope = Scope::new(statement);

        match statement.kind() {
            StatementKind::Call { name, .. } => {
                if let Some(function) = self.registry.function(name) {
                    self.execute_call(function, &mut scope, parent, ctx)
                        .await
                        .map_err(|e| e.at(statement))?;
                } else if let Some(declared) = ctx.function(name) {
                    scope.value = self
                        .call_declared(&declared, &mut scope, ctx)
                        .await
                        .map_err(|e| e.at(statement))?;
                } else if self.registry.contains(name) {
                    return Err(EvalError::NotCallable(name.to_string()).at(statement));
                } else {
                    return Err(EvalError::UnknownFunction(name.to_string()).at(statement));
                }
            }
            StatementKind::Value(literal) => scope.value = literal.into(),
            StatementKind::VarRef(name) => {
                scope.value = self.resolve(name, ctx).map_err(|e| e.at(statement))?;
            }
            StatementKind::Keyword(_) | StatementKind::Empty => {}
        }

        if !scope.skipped {
            if let Some(target) = &statement.set {
                ctx.set_path(target, scope.value.clone())
                    .map_err(|e| e.at(statement))?;
            }
        }
        Ok(scope)
    }

    async fn execute_call<'s>(
        &self,
        function: Arc<dyn ScopeFunction>,
        scope: &mut Scope<'s>,
        mut parent: Option<&mut Scope<'s>>,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<()> {
        let flags = function.flags();
        if !function.should_execute(scope, parent.as_deref()) {
            trace!("skip {}", function.name());
            scope.skipped = true;
            return Ok(());
        }

        if flags.keep_data {
            scope.keeps_data = true;
            if let Some(p) = parent.as_deref_mut() {
                if let Some(kept) = p.kept.remove(&p.i) {
                    scope.restore(kept);
                }
            }
        }

        let params = scope.params();
        let len = params.len();
        let mut next = function.start_param(scope, parent.as_deref_mut());
        let mut stopped = false;

        while let Some(index) = next {
            if index >= len {
                break;
            }
            scope.i = index;
            let child = self
                .execute_scope(&params[index], Some(&mut *scope), ctx)
                .await?;

            if child.keeps_data {
                scope.kept.insert(index, child.keep());
            }

            if child.r {
                scope.r = true;
                scope.value = child.value;
                stopped = true;
                break;
            }

            if child.bl {
                if let Some(goto) = scope.goto_index {
                    // break ends the loop running in this frame
                    scope.kept.remove(&goto);
                    scope.record(child.value, flags.discard_params);
                    scope.last_skipped = false;
                    let resume = scope.li.unwrap_or(index);
                    scope.clear_loop();
                    scope.i = resume;
                    next = Some(resume + 1);
                    continue;
                }
                scope.bl = true;
                scope.value = child.value;
                stopped = true;
                break;
            }

            if child.skipped {
                scope.last_skipped = true;
                if !flags.discard_params {
                    scope.record(Value::Undefined, false);
                }
            } else {
                scope.last_skipped = false;
                scope.record(child.value, flags.discard_params);
            }

            let mut n = function.next_param(scope, parent.as_deref_mut());
            if n.is_some() && scope.goto_index.is_some() && scope.li == Some(index) {
                // loop body finished, go back to the loop header
                n = scope.goto_index.take();
            }
            if let (Some(bi), Some(target)) = (scope.bi, n) {
                if target >= bi {
                    n = None;
                }
            }
            if let Some(target) = n {
                scope.i = target.min(len);
            }
            next = n;
        }

        if !stopped {
            scope.value = function.invoke(scope, ctx).await?;
        }
        if flags.catch_return {
            scope.r = false;
        }
        Ok(())
    }

    /// Evaluates call arguments and runs a declared function.
    async fn call_declared<'s>(
        &self,
        function: &ConvoFunction,
        scope: &mut Scope<'s>,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        let params = scope.params();
        let mut args = Value::object();
        let mut position = 0;
        for (index, param) in params.iter().enumerate() {
            scope.i = index;
            let child = self.execute_scope(param, Some(&mut *scope), ctx).await?;
            let key = match &param.label {
                Some(label) => label.clone(),
                None => {
                    let key = function
                        .params
                        .get(position)
                        .and_then(param_name)
                        .map(str::to_string)
                        .unwrap_or_else(|| position.to_string());
                    position += 1;
                    key
                }
            };
            args.insert(key, child.value);
        }
        self.call_function(function, args, ctx).await
    }

    fn resolve(&self, name: &str, ctx: &ExecutionContext) -> EvalResult<Value> {
        if let Some(value) = ctx.lookup_path(name) {
            return Ok(value);
        }
        let (root, rest) = match name.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (name, None),
        };
        let Some(mut value) = self.registry.value(root) else {
            return Err(EvalError::UnknownName(name.to_string()));
        };
        for key in rest.into_iter().flat_map(|r| r.split('.')) {
            value = value.property(key);
        }
        Ok(value)
    }
}

/// Parameter name of a declaration: the label of `name: type`, or a bare
/// `name`.
fn param_name(decl: &Statement) -> Option<&str> {
    decl.label.as_deref().or(decl.var_ref.as_deref())
}
