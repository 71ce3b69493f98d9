mod conversation_test;
mod eval_test;
mod parser_test;
mod robustness_test;

use std::sync::Arc;

use convo::capability::{BufferPrinter, Capabilities};
use convo::{parse, EvalResult, Evaluator, ExecutionContext, Statement, Value};

/// Body statements of `> main() -> ( code )`.
pub fn body_of(code: &str) -> Vec<Statement> {
    let source = format!("> main() -> (\n{}\n)", code);
    let messages = parse(&source).into_result().unwrap();
    messages[0].function.clone().unwrap().body
}

pub struct Run {
    pub result: EvalResult<Value>,
    pub ctx: ExecutionContext,
    pub printed: Vec<String>,
}

pub async fn run(code: &str) -> Run {
    let printer = Arc::new(BufferPrinter::new());
    let mut ctx =
        ExecutionContext::with_capabilities(Capabilities::default().with_printer(printer.clone()));
    let result = Evaluator::default()
        .evaluate_body(&body_of(code), &mut ctx)
        .await;
    Run {
        result,
        ctx,
        printed: printer.lines(),
    }
}
