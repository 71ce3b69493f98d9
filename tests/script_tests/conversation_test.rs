use std::sync::Arc;

use convo::capability::{BufferPrinter, Capabilities};
use convo::{Conversation, Evaluator, ExecutionContext, FlatMessage, Value};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn it_flattens_across_appends() {
    let printer = Arc::new(BufferPrinter::new());
    let ctx =
        ExecutionContext::with_capabilities(Capabilities::default().with_printer(printer.clone()));
    let mut convo = Conversation::new(Evaluator::default(), ctx);

    convo
        .append("> shout(text: string) -> (\n  print(text)\n  add(text '!')\n)")
        .unwrap();
    convo.append("> assistant\n{{ shout('hello') }}").unwrap();
    convo.append("> user\nplain reply").unwrap();

    assert_eq!(convo.messages().len(), 3);
    let flat = convo.flatten().await.unwrap();
    assert_eq!(
        flat,
        vec![
            FlatMessage {
                role: "assistant".into(),
                content: "hello!".into(),
            },
            FlatMessage {
                role: "user".into(),
                content: "plain reply".into(),
            },
        ]
    );
    assert_eq!(printer.lines(), vec!["hello"]);
}

#[tokio::test]
async fn it_does_not_carry_variables_between_calls() {
    let mut convo = Conversation::default();
    convo
        .append("> bump() -> (\n  total = add(total 1)\n)")
        .unwrap();
    convo.context_mut().set_var("total", Value::Number(0.0));
    for _ in 0..3 {
        assert_eq!(
            convo.call_function("bump", Value::object()).await.unwrap(),
            Value::Number(1.0)
        );
    }
    assert_eq!(convo.context().get_var("total"), Some(&Value::Number(0.0)));
}

#[tokio::test]
async fn it_flattens_the_same_output_twice() {
    let mut convo = Conversation::default();
    convo.append("> user\n{{ inc(n) }}").unwrap();
    let first = convo.flatten().await.unwrap();
    let second = convo.flatten().await.unwrap();
    assert_eq!(first[0].content, "1");
    assert_eq!(second, first);
}

#[tokio::test]
async fn it_surfaces_evaluation_errors() {
    let mut convo = Conversation::default();
    convo.append("> user\n{{ undefinedThing }}").unwrap();
    let err = convo.flatten().await.unwrap_err();
    assert_eq!(err.kind(), "unknown-name");
}
