use async_trait::async_trait;

use crate::eval::{
    EvalError, EvalResult, ExecutionContext, FunctionRegistry, Scope, ScopeFunction,
    ScopeFunctionFlags, Value,
};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Add);
    registry.register(Arith {
        name: "sub",
        op: |a, b| a - b,
    });
    registry.register(Arith {
        name: "mul",
        op: |a, b| a * b,
    });
    registry.register(Arith {
        name: "div",
        op: |a, b| a / b,
    });
    registry.register(Arith {
        name: "mod",
        op: |a, b| a % b,
    });
    registry.register(Arith {
        name: "pow",
        op: f64::powf,
    });
    registry.register(Step {
        name: "inc",
        sign: 1.0,
    });
    registry.register(Step {
        name: "dec",
        sign: -1.0,
    });
}

fn defined<'a>(scope: &'a Scope<'_>) -> impl Iterator<Item = &'a Value> + 'a {
    scope.param_values.iter().filter(|v| !v.is_undefined())
}

/// Numbers add, strings concatenate and arrays join. Undefined is skipped.
struct Add;

#[async_trait]
impl ScopeFunction for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let values: Vec<&Value> = defined(scope).collect();
        if values.is_empty() {
            return Ok(Value::Undefined);
        }
        if values.iter().any(|v| matches!(v, Value::String(_))) {
            let joined: String = values.iter().map(|v| v.to_string()).collect();
            return Ok(Value::String(joined));
        }
        if values.iter().all(|v| matches!(v, Value::Array(_))) {
            let items = values
                .into_iter()
                .flat_map(|v| match v {
                    Value::Array(items) => items.clone(),
                    _ => Vec::new(),
                })
                .collect();
            return Ok(Value::Array(items));
        }
        Ok(Value::Number(values.iter().map(|v| v.to_number()).sum()))
    }
}

/// Left to right numeric reduction.
struct Arith {
    name: &'static str,
    op: fn(f64, f64) -> f64,
}

#[async_trait]
impl ScopeFunction for Arith {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let result = defined(scope)
            .map(Value::to_number)
            .reduce(|acc, n| (self.op)(acc, n));
        Ok(result.map(Value::Number).unwrap_or_default())
    }
}

/// `inc(name amount?)` / `dec(name amount?)`
struct Step {
    name: &'static str,
    sign: f64,
}

#[async_trait]
impl ScopeFunction for Step {
    fn name(&self) -> &'static str {
        self.name
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    // 最初の引数は変数参照なので評価しない
    fn start_param(&self, _scope: &mut Scope<'_>, _parent: Option<&mut Scope<'_>>) -> Option<usize> {
        Some(1)
    }

    async fn invoke(&self, scope: &mut Scope<'_>, ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let Some(target) = scope.params().first().and_then(|p| p.var_ref.as_deref()) else {
            return Err(EvalError::invalid_args(
                self.name,
                "first argument must be a variable reference",
            ));
        };
        let amount = if scope.len() > 1 {
            scope.first().to_number()
        } else {
            1.0
        };
        let current = match ctx.lookup_path(target) {
            Some(Value::Undefined) | None => 0.0,
            Some(v) => v.to_number(),
        };
        let value = Value::Number(current + self.sign * amount);
        ctx.set_path(target, value.clone())
            .map_err(|e| EvalError::invalid_args(self.name, e.to_string()))?;
        Ok(value)
    }
}
