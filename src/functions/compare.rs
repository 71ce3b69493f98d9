use std::cmp::Ordering;

use async_trait::async_trait;

use crate::eval::{
    EvalResult, ExecutionContext, FunctionRegistry, Scope, ScopeFunction, ScopeFunctionFlags,
    Value,
};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(And);
    registry.register(Or);
    registry.register(Not);
    registry.register(Is);
    registry.register(Equal);
    registry.register(Compare {
        name: "gt",
        accept: |o| o == Ordering::Greater,
    });
    registry.register(Compare {
        name: "gte",
        accept: |o| o != Ordering::Less,
    });
    registry.register(Compare {
        name: "lt",
        accept: |o| o == Ordering::Less,
    });
    registry.register(Compare {
        name: "lte",
        accept: |o| o != Ordering::Greater,
    });
}

/// Stops at the first falsy argument.
struct And;

#[async_trait]
impl ScopeFunction for And {
    fn name(&self) -> &'static str {
        "and"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    fn next_param(&self, scope: &mut Scope<'_>, _parent: Option<&mut Scope<'_>>) -> Option<usize> {
        scope.last().is_truthy().then_some(scope.i + 1)
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(Value::Boolean(!scope.is_empty() && scope.last().is_truthy()))
    }
}

struct Or;

#[async_trait]
impl ScopeFunction for Or {
    fn name(&self) -> &'static str {
        "or"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(Value::Boolean(scope.param_values.iter().any(Value::is_truthy)))
    }
}

struct Not;

#[async_trait]
impl ScopeFunction for Not {
    fn name(&self) -> &'static str {
        "not"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(Value::Boolean(!scope.param_values.iter().any(Value::is_truthy)))
    }
}

/// `is(a b type)` checks every leading value against the trailing type.
struct Is;

#[async_trait]
impl ScopeFunction for Is {
    fn name(&self) -> &'static str {
        "is"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let Some((last, values)) = scope.param_values.split_last() else {
            return Ok(Value::Boolean(false));
        };
        if values.is_empty() {
            return Ok(Value::Boolean(false));
        }
        let Value::Type(ty) = last else {
            return Ok(Value::Boolean(false));
        };
        Ok(Value::Boolean(values.iter().all(|v| ty.check(v))))
    }
}

/// Strict chained equality, no coercion.
struct Equal;

#[async_trait]
impl ScopeFunction for Equal {
    fn name(&self) -> &'static str {
        "eq"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let values = &scope.param_values;
        Ok(Value::Boolean(
            values.len() >= 2 && values.windows(2).all(|w| w[0] == w[1]),
        ))
    }
}

struct Compare {
    name: &'static str,
    accept: fn(Ordering) -> bool,
}

#[async_trait]
impl ScopeFunction for Compare {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let values = &scope.param_values;
        let holds = values.len() >= 2
            && values
                .windows(2)
                .all(|w| w[0].compare(&w[1]).is_some_and(self.accept));
        Ok(Value::Boolean(holds))
    }
}
