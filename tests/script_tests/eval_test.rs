use std::sync::Arc;

use convo::capability::{Capabilities, HttpMethod, HttpResponse, MockHttpClient};
use convo::config::EvalConfig;
use convo::eval::ControlSignal;
use convo::{Conversation, EvalError, Evaluator, ExecutionContext, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::run;

#[tokio::test]
async fn it_yields_the_taken_branch_signal() {
    let r = run("if(false) then() else()").await;
    assert_eq!(r.result.unwrap(), Value::Signal(ControlSignal::True));

    let r = run("if(true) then(print('then')) else(print('else'))").await;
    assert_eq!(r.result.unwrap(), Value::Signal(ControlSignal::True));
    assert_eq!(r.printed, vec!["then"]);
}

#[tokio::test]
async fn it_stops_while_on_first_falsy_condition() {
    let r = run("n = 0\nchecks = 0\nwhile(do(inc(checks) lt(n 3))) do(\n  inc(n)\n)\nchecks").await;
    assert_eq!(r.result.unwrap(), Value::Number(4.0));
    assert_eq!(r.ctx.get_var("n"), Some(&Value::Number(3.0)));
}

#[tokio::test]
async fn it_dispatches_switch_to_one_branch() {
    for (x, expected) in [(1, "A"), (2, "B"), (7, "C")] {
        let code = format!(
            "x = {}\nswitch(x\n  case(1) print('A')\n  case(2) print('B')\n  default() print('C')\n)",
            x
        );
        let r = run(&code).await;
        assert_eq!(r.printed, vec![expected], "x = {}", x);
    }
}

#[tokio::test]
async fn it_iterates_objects_in_declaration_order() {
    let code = "obj = map(z: 1 a: 2 m: 3)\nforeach(e = in(obj)) print(e.key e.value)";
    let r = run(code).await;
    assert_eq!(r.printed, vec!["z 1", "a 2", "m 3"]);
    assert!(r.result.is_ok());
}

#[tokio::test]
async fn it_iterates_arrays_by_index() {
    let r = run("foreach(item = in(array('x' 'y'))) print(item)").await;
    assert_eq!(r.printed, vec!["x", "y"]);
}

#[tokio::test]
async fn it_signals_exhaustion_with_break() {
    let r = run("list = array()\nitem = in(list)").await;
    assert_eq!(r.result.unwrap(), Value::Signal(ControlSignal::Break));
}

#[tokio::test]
async fn it_ends_foreach_with_the_break_value() {
    let code = "foreach(n = in(array(1 2 3))) do(\n  print(n)\n  if(eq(n 2)) do(mul(n 100) break())\n)";
    let r = run(code).await;
    assert_eq!(r.printed, vec!["1", "2"]);
    assert_eq!(r.result.unwrap(), Value::Number(200.0));
}

#[tokio::test]
async fn it_breaks_only_the_innermost_loop() {
    let code = r#"
rows = 0
foreach(row = in(array(1 2 3))) do(
    inc(rows)
    col = 0
    while(true) do(
        inc(col)
        break(gte(col row))
    )
    print(row col)
)
rows
"#;
    let r = run(code).await;
    assert_eq!(r.printed, vec!["1 1", "2 2", "3 3"]);
    assert_eq!(r.result.unwrap(), Value::Number(3.0));
}

#[tokio::test]
async fn it_nests_switch_inside_loop() {
    let code = r#"
foreach(n = in(array(1 2 3))) do(
    switch(n
        case(2) print('two')
        default() print('other')
    )
)
"#;
    let r = run(code).await;
    assert_eq!(r.printed, vec!["other", "two", "other"]);
}

#[tokio::test]
async fn it_uses_switch_as_ternary() {
    let r = run("label = switch(gt(5 3) 'big' 'small')\nlabel").await;
    assert_eq!(r.result.unwrap(), Value::from("big"));
}

#[tokio::test]
async fn it_returns_from_a_loop_inside_a_function() {
    let mut convo = Conversation::default();
    convo
        .append(
            r#"
> firstOver(limit: number; items: array) -> (
    foreach(i = in(items)) do(
        if(gt(i limit)) return(i)
    )
    return(null)
)
"#,
        )
        .unwrap();
    let args = Value::from_json(json!({"limit": 2, "items": [1, 2, 5, 9]}));
    assert_eq!(
        convo.call_function("firstOver", args).await.unwrap(),
        Value::Number(5.0)
    );
    let args = Value::from_json(json!({"limit": 20, "items": [1, 2]}));
    assert_eq!(
        convo.call_function("firstOver", args).await.unwrap(),
        Value::Null
    );
}

#[tokio::test]
async fn it_binds_declared_function_arguments() {
    let mut convo = Conversation::default();
    convo
        .append(
            r#"
> describe(name: string; age?: number) -> args (
    add(name ' ' age ' ' args.name)
)

> user
{{ describe('Ann' 30) }} / {{ describe(age: 4 name: 'Bo') }}
"#,
        )
        .unwrap();
    let flat = convo.flatten().await.unwrap();
    assert_eq!(flat.len(), 1);
    assert_eq!(flat[0].content, "Ann 30 Ann / Bo 4 Bo");

    let err = convo
        .call_function("describe", Value::from_json(json!({"name": 3})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid-args");
}

#[tokio::test]
async fn it_limits_recursion_depth() {
    let mut ctx = ExecutionContext::new().with_config(EvalConfig {
        max_call_depth: 8,
        ..Default::default()
    });
    ctx.define_function(
        convo::parse("> loop() -> (loop())")
            .into_result()
            .unwrap()
            .remove(0)
            .function
            .unwrap(),
    );
    let err = Evaluator::default()
        .evaluate_body(&super::body_of("loop()"), &mut ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "max-call-depth");
}

fn nested_adds(depth: usize) -> String {
    format!("{}1{}", "add(".repeat(depth), ")".repeat(depth))
}

#[tokio::test]
async fn it_limits_statement_nesting() {
    let r = run(&nested_adds(50)).await;
    assert_eq!(r.result.unwrap(), Value::Number(1.0));

    let r = run(&nested_adds(1000)).await;
    let err = r.result.unwrap_err();
    assert_eq!(err.kind(), "max-nesting-depth");
    assert_eq!(err.root(), &EvalError::MaxNestingDepth(128));

    // 失敗後も同じコンテキストで評価を続けられる
    let mut ctx = r.ctx;
    let v = Evaluator::default()
        .evaluate_body(&super::body_of("add(1 2)"), &mut ctx)
        .await
        .unwrap();
    assert_eq!(v, Value::Number(3.0));
}

#[tokio::test]
async fn it_tags_errors_with_the_statement() {
    let r = run("print(add(1 missing))").await;
    let err = r.result.unwrap_err();
    assert_eq!(err.root(), &EvalError::UnknownName("missing".into()));
    assert_eq!(err.statement().unwrap().var_ref.as_deref(), Some("missing"));

    let r = run("nope(1)").await;
    assert_eq!(r.result.unwrap_err().kind(), "unknown-function");

    let r = run("string(1)").await;
    assert_eq!(r.result.unwrap_err().kind(), "not-callable");
}

#[tokio::test]
async fn it_rejects_non_string_urls() {
    let mut http = MockHttpClient::new();
    http.expect_request().never();
    let mut ctx =
        ExecutionContext::with_capabilities(Capabilities::default().with_http(Arc::new(http)));
    let err = Evaluator::default()
        .evaluate_body(&super::body_of("httpPost(map(a: 1) 'body')"), &mut ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid-args");
    assert!(err.to_string().contains("First arg must be a string URL"));
}

#[tokio::test]
async fn it_fetches_json_through_the_http_capability() {
    let mut http = MockHttpClient::new();
    http.expect_request()
        .withf(|req| req.method == HttpMethod::Put && req.body == Some(json!({"done": true})))
        .returning(|_| {
            Ok(HttpResponse {
                status: 200,
                body: r#"{"ok": true, "id": 7}"#.into(),
            })
        });
    let mut ctx =
        ExecutionContext::with_capabilities(Capabilities::default().with_http(Arc::new(http)));
    let v = Evaluator::default()
        .evaluate_body(
            &super::body_of("res = httpPut('https://todo.test/7' map(done: true))\nres.id"),
            &mut ctx,
        )
        .await
        .unwrap();
    assert_eq!(v, Value::Number(7.0));
}
