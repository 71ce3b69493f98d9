use convo::parse;
use proptest::prelude::*;

proptest! {
    #[test]
    fn parse_never_panics(code in "\\PC{0,200}") {
        let result = parse(&code);
        if let Some(error) = result.error {
            prop_assert!(error.index <= code.len());
            prop_assert!(error.line_number >= 1);
        }
    }

    #[test]
    fn parse_handles_script_like_input(
        code in "(> (user|f\\(a\\)|x) ?\n)?([a-z ]|\\{\\{|\\}\\}|\\(|\\)|'|\"|\n|>|#|:|=|\\?){0,80}"
    ) {
        let _ = parse(&code);
    }

    #[test]
    fn plain_messages_round_trip(text in "[a-zA-Z][a-zA-Z ,.!]{0,40}[a-zA-Z.!]") {
        let code = format!("> user\n{}", text);
        let messages = parse(&code).into_result().unwrap();
        prop_assert_eq!(messages.len(), 1);
        prop_assert_eq!(messages[0].content.as_deref(), Some(text.as_str()));
    }
}
