use convo::parser::ADD_FN;
use convo::{parse, Literal, ParseErrorKind, Statement};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn it_parses_embed_into_add_call() {
    let result = parse("> user\nhello {{ 1 }} world");
    assert_eq!(result.error, None);
    assert_eq!(result.messages.len(), 1);
    let statement = result.messages[0].statement.clone().unwrap();
    assert_eq!(
        statement,
        Statement::call(
            ADD_FN,
            vec![
                Statement::string("hello "),
                Statement::number(1.0),
                Statement::string(" world"),
            ]
        )
    );
}

#[test]
fn it_parses_a_full_script() {
    let code = r#"
# Looks up the weather
> getWeather(city: string; units?: enum("c" "f")) -> (
    res = httpGet(add("https://weather.test/" city))
    return(res.temp)
)

> system
You are a helpful assistant.

> user
What is the weather in {{ city }}?
"#;
    let messages = parse(code).into_result().unwrap();
    assert_eq!(messages.len(), 3);

    let f = messages[0].function.as_ref().unwrap();
    assert_eq!(f.name, "getWeather");
    assert_eq!(f.description.as_deref(), Some("Looks up the weather"));
    assert_eq!(f.params.len(), 2);
    assert!(f.params[1].opt);
    assert!(f.params[1].is_call_to("enum"));
    assert_eq!(f.body.len(), 2);
    assert_eq!(f.body[0].set.as_deref(), Some("res"));

    assert_eq!(messages[1].role, "system");
    assert_eq!(
        messages[1].content.as_deref(),
        Some("You are a helpful assistant.")
    );

    assert_eq!(messages[2].role, "user");
    let add = messages[2].statement.as_ref().unwrap();
    assert_eq!(add.params[1], Statement::var_ref("city"));
    assert_eq!(add.params[2].value, Some(Literal::String("?".into())));
}

#[test]
fn it_reports_unterminated_quote_position() {
    let code = "> user\nfirst line\n{{ print(\"oops) }}\n";
    let error = parse(code).error.unwrap();
    assert_eq!(error.kind, ParseErrorKind::UnterminatedString);
    assert_eq!(error.line_number, 3);

    let quote = code.find('"').unwrap();
    assert_eq!(error.index, quote);
    let mut lines = error.near.lines();
    let excerpt: Vec<char> = lines.next().unwrap().chars().collect();
    let caret = lines.next().unwrap();
    let column = caret.find('^').unwrap();
    assert_eq!(excerpt[column], '"');
}

#[test]
fn it_serializes_messages_and_errors() {
    let result = parse("> user\nhi {{ n }}");
    let json = serde_json::to_value(&result.messages).unwrap();
    assert_eq!(
        json,
        json!([{
            "role": "user",
            "statement": {
                "fn": "add",
                "params": [
                    {"value": {"type": "string", "value": "hi "}},
                    {"varRef": "n"}
                ]
            }
        }])
    );

    let error = parse("> f(").error.unwrap();
    let json = serde_json::to_value(&error).unwrap();
    assert_eq!(json["lineNumber"], json!(1));
    assert!(json.get("near").is_some());
}
