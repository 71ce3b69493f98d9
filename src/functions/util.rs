use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::eval::{
    EvalResult, ExecutionContext, FunctionRegistry, Scope, ScopeFunction, Value,
};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Print);
    registry.register(Rand);
    registry.register(Sleep);
    registry.register(EncodeUri {
        name: "encodeURI",
        keep: URI_RESERVED,
    });
    registry.register(EncodeUri {
        name: "encodeURIComponent",
        keep: "",
    });
}

/// Prints its arguments separated by spaces and returns the last one.
struct Print;

#[async_trait]
impl ScopeFunction for Print {
    fn name(&self) -> &'static str {
        "print"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let line = scope
            .param_values
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        ctx.capabilities().printer.print(&line);
        Ok(scope.last().clone())
    }
}

/// `rand()` in `[0, 1)`, `rand(n)` a whole number in `[0, n]`.
struct Rand;

#[async_trait]
impl ScopeFunction for Rand {
    fn name(&self) -> &'static str {
        "rand"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let r = ctx.capabilities().random.next_f64();
        Ok(match scope.first() {
            Value::Number(range) => Value::Number((r * range).round()),
            _ => Value::Number(r),
        })
    }
}

/// `sleep(ms)`, returns the milliseconds actually waited.
struct Sleep;

#[async_trait]
impl ScopeFunction for Sleep {
    fn name(&self) -> &'static str {
        "sleep"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let ms = match scope.first() {
            Value::Number(ms) if ms.is_finite() && *ms > 0.0 => *ms as u64,
            _ => 0,
        };
        debug!("sleep {}ms", ms);
        let clock = ctx.capabilities().clock.clone();
        let elapsed = clock.sleep(Duration::from_millis(ms)).await;
        Ok(Value::Number(elapsed.as_millis() as f64))
    }
}

const URI_RESERVED: &str = ";,/?:@&=+$#";
const URI_UNRESERVED: &str = "-_.!~*'()";

/// Percent-encodes UTF-8 bytes outside the unreserved set and `keep`.
struct EncodeUri {
    name: &'static str,
    keep: &'static str,
}

impl EncodeUri {
    fn encode(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            if c.is_ascii_alphanumeric() || URI_UNRESERVED.contains(c) || self.keep.contains(c) {
                out.push(c);
                continue;
            }
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
        out
    }
}

#[async_trait]
impl ScopeFunction for EncodeUri {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let input = match scope.first() {
            Value::Undefined | Value::Null => String::new(),
            v => v.to_string(),
        };
        Ok(Value::String(self.encode(&input)))
    }
}
