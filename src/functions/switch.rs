use async_trait::async_trait;

use crate::ast::Statement;
use crate::eval::{
    EvalResult, ExecutionContext, FunctionRegistry, Scope, ScopeFunction, ScopeFunctionFlags,
    Value,
};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Switch);
    registry.register(Case {
        name: "case",
        truthy: false,
    });
    registry.register(Case {
        name: "test",
        truthy: true,
    });
    registry.register(DefaultCase);
}

const SWITCH_FN: &str = "switch";

fn is_match_case(statement: &Statement) -> bool {
    ["case", "test", "default"]
        .iter()
        .any(|name| statement.is_call_to(name))
}

fn under_switch(parent: Option<&Scope<'_>>) -> bool {
    parent.is_some_and(|p| p.fn_name() == Some(SWITCH_FN))
}

/// `switch(value case(a) A case(b) B default() C)`, or `switch(cond A B)`
/// as a ternary.
struct Switch;

#[async_trait]
impl ScopeFunction for Switch {
    fn name(&self) -> &'static str {
        SWITCH_FN
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    fn next_param(&self, scope: &mut Scope<'_>, _parent: Option<&mut Scope<'_>>) -> Option<usize> {
        let has_cases = scope.params().iter().any(is_match_case);
        if scope.i == 0 {
            if has_cases {
                scope.sv = Some(scope.first().clone());
                return Some(1);
            }
            return if scope.first().is_truthy() { Some(1) } else { Some(2) };
        }
        if !has_cases {
            return None;
        }
        if !is_match_case(&scope.params()[scope.i]) {
            scope.sv = Some(scope.first().clone());
        }
        scope.take_pending_jump().or(Some(scope.i + 1))
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(scope.first().clone())
    }
}

/// `case(values...)` matches by equality, `test(conds...)` by truthiness.
/// The statement after a match runs and ends the switch.
struct Case {
    name: &'static str,
    truthy: bool,
}

impl Case {
    fn matches(&self, value: &Value, parent: &Scope<'_>) -> bool {
        if self.truthy {
            value.is_truthy()
        } else {
            parent.sv.as_ref() == Some(value)
        }
    }
}

#[async_trait]
impl ScopeFunction for Case {
    fn name(&self) -> &'static str {
        self.name
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    fn start_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        if scope.is_empty() || !under_switch(parent.as_deref()) {
            return None;
        }
        Some(0)
    }

    fn next_param(&self, scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        let p = parent?;
        if self.matches(scope.first(), p) {
            p.set_break_index(p.i + 2);
            return None;
        }
        if scope.i + 1 >= scope.len() {
            p.set_pending_jump(p.i + 2);
            return None;
        }
        Some(scope.i + 1)
    }

    async fn invoke(&self, _scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(Value::Undefined)
    }
}

struct DefaultCase;

#[async_trait]
impl ScopeFunction for DefaultCase {
    fn name(&self) -> &'static str {
        "default"
    }

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::DISCARD
    }

    fn start_param(&self, _scope: &mut Scope<'_>, parent: Option<&mut Scope<'_>>) -> Option<usize> {
        if let Some(p) = parent {
            if p.fn_name() == Some(SWITCH_FN) {
                p.set_break_index(p.i + 2);
            }
        }
        None
    }

    async fn invoke(&self, _scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(Value::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::Value;
    use crate::functions::testing::{run, value};
    use pretty_assertions::assert_eq;

    fn switch_code(x: &str) -> String {
        format!(
            "switch({}\n  case(1) 'one'\n  case(2 3) 'two or three'\n  default() 'many'\n)",
            x
        )
    }

    #[tokio::test]
    async fn test_switch_cases() {
        assert_eq!(value(&switch_code("1")).await, Value::from("one"));
        assert_eq!(value(&switch_code("2")).await, Value::from("two or three"));
        assert_eq!(value(&switch_code("3")).await, Value::from("two or three"));
        assert_eq!(value(&switch_code("9")).await, Value::from("many"));
    }

    #[tokio::test]
    async fn test_switch_runs_only_matching_branch() {
        let code = "switch(2 case(1) print('a') case(2) print('b') case(3) print('c'))";
        let (_, _, out) = run(code).await;
        assert_eq!(out.lines(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_switch_without_match_or_default() {
        let (result, _, out) = run("switch(5 case(1) print('a'))").await;
        assert!(out.lines().is_empty());
        assert_eq!(result.unwrap(), Value::Undefined);
    }

    #[tokio::test]
    async fn test_switch_test_matches_truthy() {
        let code = "n = 7\nswitch(n test(lt(n 5)) 'small' test(lt(n 10)) 'medium' default() 'large')";
        assert_eq!(value(code).await, Value::from("medium"));
    }

    #[tokio::test]
    async fn test_switch_as_ternary() {
        assert_eq!(value("switch(true 'yes' 'no')").await, Value::from("yes"));
        assert_eq!(value("switch(0 'yes' 'no')").await, Value::from("no"));
    }

    #[tokio::test]
    async fn test_case_outside_switch_is_inert() {
        let (result, _, out) = run("do(case(1) print('x'))").await;
        assert_eq!(out.lines(), vec!["x"]);
        assert!(result.is_ok());
    }
}
