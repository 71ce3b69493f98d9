use async_trait::async_trait;

use crate::eval::scope::{CtrlData, IterCursor};
use crate::eval::{
    ControlSignal, EvalResult, ExecutionContext, FunctionRegistry, Scope, ScopeFunction,
    ScopeFunctionFlags, Value,
};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(If { name: "if" });
    registry.register(Elif);
    registry.register(Then);
    registry.register(Else);
    registry.register(While);
    registry.register(Foreach);
    registry.register(In);
    registry.register(Break);
    registry.register(Do);
    registry.register(Body);
    registry.register(Fn);
    registry.register(Return);
}

fn signal(truthy: bool) -> Value {
    if truthy {
        ControlSignal::True.into()
    } else {
        ControlSignal::False.into()
    }
}

fn prev_is(parent: Option<&Scope<'_>>, signal: ControlSignal) -> bool {
    parent.is_some_and(|p| p.last().is_signal(signal))
}

/// The loop body after the current child is never visited.
fn leave_loop(parent: Option<&mut Scope<'_>>) -> Option<usize> {
    if let Some(p) = parent {
        p.skip_next();
        p.clear_loop();
    }
    None
}

/// `if(cond...)`: the sibling after it only runs when every condition holds.
struct If {
    name: &'static str,
}

#[async_trait]
impl ScopeFunction for If {
    fn name(&self) -> &'static str {
        self.name
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    fn start_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        if scope.is_empty() {
            if let Some(p) = parent {
                p.skip_next();
            }
            return None;
        }
        Some(0)
    }

    fn next_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        if scope.last().is_truthy() {
            return Some(scope.i + 1);
        }
        if let Some(p) = parent {
            p.skip_next();
        }
        None
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(signal(scope.last().is_truthy()))
    }
}

/// `elif` behaves like `if` once the previous branch test failed.
struct Elif;

#[async_trait]
impl ScopeFunction for Elif {
    fn name(&self) -> &'static str {
        "elif"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    fn should_execute(&self, _scope: &Scope<'_>, parent: Option<&Scope<'_>>) -> bool {
        prev_is(parent, ControlSignal::False)
    }

    fn start_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        If { name: "elif" }.start_param(scope, parent)
    }

    fn next_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        If { name: "elif" }.next_param(scope, parent)
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(signal(scope.last().is_truthy()))
    }
}

struct Then;

#[async_trait]
impl ScopeFunction for Then {
    fn name(&self) -> &'static str {
        "then"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    // a skipped elif leaves the earlier True in place
    fn should_execute(&self, _scope: &Scope<'_>, parent: Option<&Scope<'_>>) -> bool {
        prev_is(parent, ControlSignal::True) && parent.is_some_and(|p| !p.last_skipped)
    }

    async fn invoke(&self, _scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(signal(true))
    }
}

struct Else;

#[async_trait]
impl ScopeFunction for Else {
    fn name(&self) -> &'static str {
        "else"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    fn should_execute(&self, _scope: &Scope<'_>, parent: Option<&Scope<'_>>) -> bool {
        prev_is(parent, ControlSignal::False)
    }

    async fn invoke(&self, _scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(signal(true))
    }
}

/// `while(cond) body`: re-enters itself after the body while `cond` holds.
struct While;

#[async_trait]
impl ScopeFunction for While {
    fn name(&self) -> &'static str {
        "while"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    fn start_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        if scope.is_empty() {
            return leave_loop(parent);
        }
        Some(0)
    }

    fn next_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        let Some(p) = parent else {
            return None;
        };
        if scope.i == 0 {
            p.from_index = None;
        }
        if !scope.last().is_truthy() {
            return leave_loop(Some(p));
        }
        if scope.i + 1 >= scope.len() {
            p.arm_loop();
        }
        Some(scope.i + 1)
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(signal(scope.last().is_truthy()))
    }
}

/// `foreach(item = in(list)) body`
struct Foreach;

#[async_trait]
impl ScopeFunction for Foreach {
    fn name(&self) -> &'static str {
        "foreach"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD_KEEP
    }

    fn start_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        if scope.is_empty() {
            return leave_loop(parent);
        }
        Some(0)
    }

    fn next_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        if scope.first().is_signal(ControlSignal::Break) {
            return leave_loop(parent);
        }
        if scope.i + 1 >= scope.len() {
            if let Some(p) = parent {
                p.arm_loop();
            }
        }
        Some(scope.i + 1)
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let ran = scope.ctrl_value().is_some();
        if scope.first().is_signal(ControlSignal::Break) {
            scope.ctrl_data = None;
            return Ok(signal(ran));
        }
        scope.ctrl_data = Some(CtrlData::Value(Value::Boolean(true)));
        Ok(signal(true))
    }
}

/// Yields one element of its collection per pass, then `Break`.
struct In;

#[async_trait]
impl ScopeFunction for In {
    fn name(&self) -> &'static str {
        "in"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD_KEEP
    }

    fn next_param(&self, scope: &mut Scope<'_>, _parent: Option<&mut Scope<'_>>) -> Option<usize> {
        if matches!(scope.ctrl_data, Some(CtrlData::Iter(_))) {
            return None;
        }
        let keys = match scope.last() {
            Value::Array(_) => None,
            Value::Object(entries) => Some(entries.iter().map(|(k, _)| k.clone()).collect()),
            _ => return None,
        };
        scope.ctrl_data = Some(CtrlData::Iter(IterCursor { i: 0, keys }));
        None
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let Some(CtrlData::Iter(cursor)) = &mut scope.ctrl_data else {
            return Ok(ControlSignal::Break.into());
        };
        let item = match (&cursor.keys, scope.param_values.first()) {
            (None, Some(Value::Array(items))) => items.get(cursor.i).cloned(),
            (Some(keys), Some(target)) => keys.get(cursor.i).map(|key| {
                let mut entry = Value::object();
                entry.insert("key", Value::from(key.as_str()));
                entry.insert("value", target.property(key));
                entry
            }),
            _ => None,
        };
        match item {
            Some(item) => {
                cursor.i += 1;
                Ok(item)
            }
            None => {
                scope.ctrl_data = None;
                Ok(ControlSignal::Break.into())
            }
        }
    }
}

/// `break(cond?)` ends the nearest loop, yielding the value before it.
struct Break;

#[async_trait]
impl ScopeFunction for Break {
    fn name(&self) -> &'static str {
        "break"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    fn start_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        if let Some(p) = parent {
            scope.ctrl_data = Some(CtrlData::Value(p.last().clone()));
        }
        Some(0)
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        if scope.is_empty() || scope.last().is_truthy() {
            scope.bl = true;
        }
        Ok(scope.ctrl_value().cloned().unwrap_or_default())
    }
}

struct Do;

#[async_trait]
impl ScopeFunction for Do {
    fn name(&self) -> &'static str {
        "do"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(scope.last().clone())
    }
}

/// Function body. Absorbs `return`.
struct Body;

#[async_trait]
impl ScopeFunction for Body {
    fn name(&self) -> &'static str {
        "body"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD_CATCH
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(scope.last().clone())
    }
}

struct Fn;

#[async_trait]
impl ScopeFunction for Fn {
    fn name(&self) -> &'static str {
        "fn"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD_CATCH
    }

    async fn invoke(&self, _scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(Value::Undefined)
    }
}

struct Return;

#[async_trait]
impl ScopeFunction for Return {
    fn name(&self) -> &'static str {
        "return"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        scope.r = true;
        Ok(scope.last().clone())
    }
}
