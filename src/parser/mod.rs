//! Single pass, index driven parser for convo scripts.
//!
//! The parser walks the source with a cursor and switches between three
//! modes: top level (headers and comments), statement (inside a function or
//! a message embed) and string (literal text up to a terminator or `{{`).
//! Open calls live on a statement stack; open strings on a string stack.

pub mod error;
pub mod strings;

use serde::Serialize;
use tracing::{debug, trace};

use crate::ast::{ConvoFunction, ConvoMessage, Literal, Statement};
use crate::tokenizer::keyword::{NonFuncKeyword, ValueConstant};
use crate::tokenizer::scanner::{
    at_line_start, is_newline, is_space, is_word, skip_inline_space, skip_space, starts_with_at,
    take_modifiers, take_value_word, take_word, unescape,
};

pub use error::{ParseError, ParseErrorKind};
use strings::{find_end, StringFrame, StringKind};

pub const ADD_FN: &str = "add";
pub const BODY_FN: &str = "body";
pub const MAP_FN: &str = "map";

/// Output of [`parse`]. Messages read before a failure are kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub messages: Vec<ConvoMessage>,
    pub end_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ParseError>,
}

impl ParseResult {
    pub fn into_result(self) -> Result<Vec<ConvoMessage>, ParseError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.messages),
        }
    }
}

/// Parses a convo script. Never panics; failures are reported in
/// [`ParseResult::error`].
#[tracing::instrument(level = "debug", skip(code), fields(len = code.len()))]
pub fn parse(code: &str) -> ParseResult {
    Parser::new(code).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    TopLevel,
    Message,
    Function { in_body: bool },
}

enum Header {
    Function { scope: Option<String>, name: String, next: usize },
    Role { name: String, next: usize },
}

type Step = Result<(), ParseErrorKind>;

struct Parser<'a> {
    code: &'a str,
    bytes: &'a [u8],
    index: usize,
    mode: Mode,
    messages: Vec<ConvoMessage>,
    stack: Vec<Statement>,
    strings: Vec<StringFrame>,
    in_string: bool,
    comment: Option<String>,
}

impl<'a> Parser<'a> {
    fn new(code: &'a str) -> Self {
        Self {
            code,
            bytes: code.as_bytes(),
            index: 0,
            mode: Mode::TopLevel,
            messages: Vec::new(),
            stack: Vec::new(),
            strings: Vec::new(),
            in_string: false,
            comment: None,
        }
    }

    fn run(mut self) -> ParseResult {
        let error = self
            .parse_all()
            .err()
            .map(|kind| ParseError::new(self.code, self.index, kind));
        if let Some(e) = &error {
            debug!("parse failed at {}: {}", e.index, e.message);
        }
        ParseResult {
            messages: self.messages,
            end_index: self.index,
            error,
        }
    }

    fn parse_all(&mut self) -> Step {
        loop {
            if self.in_string {
                self.scan_string()?;
                continue;
            }
            if self.index >= self.bytes.len() {
                break;
            }
            match self.mode {
                Mode::TopLevel => self.scan_top_level()?,
                Mode::Message | Mode::Function { .. } => self.scan_statement()?,
            }
        }
        match self.mode {
            Mode::TopLevel => Ok(()),
            Mode::Message => Err(ParseErrorKind::UnexpectedEndOfMessage),
            Mode::Function { .. } => Err(ParseErrorKind::UnexpectedEndOfFunction),
        }
    }

    fn current_char(&self) -> char {
        self.code[self.index..].chars().next().unwrap_or('\0')
    }

    // ---- top level ----

    fn scan_top_level(&mut self) -> Step {
        let b = self.bytes[self.index];
        if b == b'>' && at_line_start(self.bytes, self.index) {
            self.read_header()
        } else if b == b'#' {
            self.take_comment();
            Ok(())
        } else if is_space(b) {
            self.index += 1;
            Ok(())
        } else {
            Err(ParseErrorKind::UnexpectedCharacter(self.current_char()))
        }
    }

    fn take_comment(&mut self) {
        let start = self.index + 1;
        let end = self.code[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(self.code.len());
        let text = self.code[start..end].trim();
        self.comment = match self.comment.take() {
            Some(prev) if !prev.trim().is_empty() => Some(format!("{}\n{}", prev, text)),
            _ => Some(text.to_string()),
        };
        self.index = end;
    }

    fn read_header(&mut self) -> Step {
        match self.match_header()? {
            Header::Function { scope, name, next } => {
                debug!("function header: {}", name);
                let function = ConvoFunction {
                    name,
                    description: self.comment.take().filter(|c| !c.is_empty()),
                    scope,
                    ..Default::default()
                };
                self.messages.push(ConvoMessage::function(function));
                self.stack.push(Statement::call(MAP_FN, Vec::new()));
                self.mode = Mode::Function { in_body: false };
                self.index = next;
            }
            Header::Role { name, next } => {
                debug!("role header: {}", name);
                self.messages.push(ConvoMessage::role(name));
                self.comment = None;
                self.mode = Mode::Message;
                self.strings.push(StringFrame::new(
                    StringKind::Message,
                    next,
                    Statement::default(),
                ));
                self.in_string = true;
                self.index = next;
            }
        }
        Ok(())
    }

    /// Matches `> [scope] name [*?!] (` or `> role [*?!]` at the cursor.
    fn match_header(&self) -> Result<Header, ParseErrorKind> {
        let b = self.bytes;
        let after_gt = self.index + 1;
        let first = skip_inline_space(b, after_gt);
        let first_end = take_word(b, first);

        if first_end == first {
            return Err(match b.get(first) {
                Some(b'(') => ParseErrorKind::MissingFunctionName,
                None => ParseErrorKind::MissingRole,
                Some(c) if is_newline(*c) => ParseErrorKind::MissingRole,
                Some(_) => ParseErrorKind::MalformedHeader,
            });
        }
        let first_word = &self.code[first..first_end];

        // scope word followed by the function name
        let second = skip_inline_space(b, first_end);
        if second > first_end {
            let second_end = take_word(b, second);
            if second_end > second {
                if let Some(next) = self.open_paren_after(second_end) {
                    return Ok(Header::Function {
                        scope: Some(first_word.to_string()),
                        name: self.code[second..second_end].to_string(),
                        next,
                    });
                }
            }
        }

        // a function name needs whitespace between it and `>`
        if first > after_gt {
            if let Some(next) = self.open_paren_after(first_end) {
                return Ok(Header::Function {
                    scope: None,
                    name: first_word.to_string(),
                    next,
                });
            }
        }

        let i = skip_inline_space(b, first_end);
        let i = take_modifiers(b, i);
        Ok(Header::Role {
            name: first_word.to_string(),
            next: skip_space(b, i),
        })
    }

    fn open_paren_after(&self, i: usize) -> Option<usize> {
        let i = skip_inline_space(self.bytes, i);
        let i = take_modifiers(self.bytes, i);
        let i = skip_inline_space(self.bytes, i);
        (self.bytes.get(i) == Some(&b'(')).then_some(i + 1)
    }

    // ---- statements ----

    fn scan_statement(&mut self) -> Step {
        let b = self.bytes;
        let mut i = self.index;
        while i < b.len() && (is_space(b[i]) || b[i] == b',' || b[i] == b';') {
            i += 1;
        }
        self.index = i;
        if i >= b.len() {
            return Ok(());
        }
        match b[i] {
            b'#' => {
                self.take_comment();
                Ok(())
            }
            b')' => self.close_call(),
            b'}' if starts_with_at(b, i, b"}}") => self.close_embed(),
            _ => self.read_statement(),
        }
    }

    /// Stack depth that a `)` may not pop below: the `add` of the innermost
    /// open string embed.
    fn embed_floor(&self) -> usize {
        self.strings.last().map(|f| f.depth).unwrap_or(0)
    }

    fn close_call(&mut self) -> Step {
        self.comment = None;
        let floor = self.embed_floor();
        if self.stack.len() <= floor {
            return Err(if floor > 0 {
                ParseErrorKind::CallStackEndedInString
            } else {
                ParseErrorKind::UnmatchedClose
            });
        }
        self.index += 1;
        let Some(done) = self.stack.pop() else {
            return Err(ParseErrorKind::UnmatchedClose);
        };
        trace!("pop {:?}, depth {}", done.fn_name, self.stack.len());

        if let Some(top) = self.stack.last_mut() {
            top.params.push(done);
            return Ok(());
        }

        match self.mode {
            Mode::Function { in_body: false } => {
                if let Some(f) = self.current_function() {
                    f.params = done.params;
                }
                self.read_return_clause();
                Ok(())
            }
            Mode::Function { in_body: true } => {
                if let Some(f) = self.current_function() {
                    f.body = done.params;
                }
                self.mode = Mode::TopLevel;
                Ok(())
            }
            _ => Err(ParseErrorKind::UnmatchedClose),
        }
    }

    /// `-> [name] [(]` after a function's parameter list.
    fn read_return_clause(&mut self) {
        let b = self.bytes;
        let arrow = skip_space(b, self.index);
        if starts_with_at(b, arrow, b"->") {
            let name = skip_space(b, arrow + 2);
            let name_end = take_word(b, name);
            let mut i = name;
            if name_end > name {
                let params_name = self.code[name..name_end].to_string();
                if let Some(f) = self.current_function() {
                    f.params_name = Some(params_name);
                }
                i = skip_space(b, name_end);
            }
            if b.get(i) == Some(&b'(') {
                self.index = i + 1;
                self.stack.push(Statement::call(BODY_FN, Vec::new()));
                self.mode = Mode::Function { in_body: true };
                return;
            }
            self.index = i;
        }
        self.mode = Mode::TopLevel;
    }

    fn current_function(&mut self) -> Option<&mut ConvoFunction> {
        self.messages.last_mut().and_then(|m| m.function.as_mut())
    }

    fn close_embed(&mut self) -> Step {
        self.comment = None;
        let Some(frame) = self.strings.last() else {
            return Err(ParseErrorKind::StrayEmbedClose);
        };
        if self.stack.len() != frame.depth {
            return Err(ParseErrorKind::UnclosedCallInEmbed);
        }
        self.index += 2;
        self.in_string = true;
        Ok(())
    }

    fn read_statement(&mut self) -> Step {
        let b = self.bytes;
        let mut i = self.index;
        let mut statement = Statement {
            comment: self.comment.take(),
            ..Default::default()
        };

        // label: `name:` or `name?:`
        let word_end = take_word(b, i);
        if word_end > i {
            let opt = b.get(word_end) == Some(&b'?');
            let colon = if opt { word_end + 1 } else { word_end };
            if b.get(colon) == Some(&b':') {
                statement.label = Some(self.code[i..word_end].to_string());
                statement.opt = opt;
                i = skip_space(b, colon + 1);
            }
        }

        // assignment: `name =`
        let word_end = take_word(b, i);
        if word_end > i {
            let eq = skip_space(b, word_end);
            if b.get(eq) == Some(&b'=') {
                statement.set = Some(self.code[i..word_end].to_string());
                i = skip_space(b, eq + 1);
            }
        }

        self.index = i;
        let Some(&c) = b.get(i) else {
            return Ok(());
        };

        if let Some(kind) = StringKind::from_quote(c) {
            self.strings.push(StringFrame::new(kind, i, statement));
            self.in_string = true;
            self.index = i + 1;
            return Ok(());
        }
        if c == b'(' {
            return Err(ParseErrorKind::MissingCallName);
        }
        if !is_word(c) && c != b'.' {
            return Err(ParseErrorKind::UnexpectedCharacter(self.current_char()));
        }

        let word_end = take_word(b, i);
        if word_end > i {
            let paren = skip_space(b, word_end);
            if b.get(paren) == Some(&b'(') {
                statement.fn_name = Some(self.code[i..word_end].to_string());
                trace!("push {}", &self.code[i..word_end]);
                self.stack.push(statement);
                self.index = paren + 1;
                return Ok(());
            }
        }

        let value_end = take_value_word(b, i);
        let word = &self.code[i..value_end];
        if c.is_ascii_digit() || c == b'.' {
            let n: f64 = word
                .parse()
                .map_err(|_| ParseErrorKind::InvalidLiteral(word.to_string()))?;
            statement.value = Some(Literal::Number(n));
        } else if let Some(constant) = ValueConstant::lookup(word) {
            statement.value = Some(match constant {
                ValueConstant::True => Literal::Boolean(true),
                ValueConstant::False => Literal::Boolean(false),
                ValueConstant::Null => Literal::Null,
                ValueConstant::Undefined => Literal::Undefined,
            });
        } else if let Some(keyword) = NonFuncKeyword::lookup(word) {
            statement.keyword = Some(keyword);
        } else {
            statement.var_ref = Some(word.to_string());
        }
        self.index = value_end;
        self.append(statement)
    }

    fn append(&mut self, statement: Statement) -> Step {
        match self.stack.last_mut() {
            Some(top) => {
                top.params.push(statement);
                Ok(())
            }
            None => Err(ParseErrorKind::UnmatchedClose),
        }
    }

    // ---- strings ----

    fn scan_string(&mut self) -> Step {
        let Some(frame) = self.strings.last() else {
            self.in_string = false;
            return Ok(());
        };
        let kind = frame.kind;
        let from = self.index;
        let Some(end) = find_end(self.bytes, from, kind) else {
            self.index = frame.start;
            return Err(ParseErrorKind::UnterminatedString);
        };

        let raw = &self.code[from..end.content_end];
        let content = if kind.unescapes() {
            unescape(raw)
        } else {
            raw.to_string()
        };
        self.index = end.next;

        if end.embed {
            self.open_embed(content)
        } else {
            self.close_string(content)
        }
    }

    fn open_embed(&mut self, fragment: String) -> Step {
        let Some(frame) = self.strings.last_mut() else {
            return Err(ParseErrorKind::StringNotOnTop);
        };
        match frame.statement.take() {
            Some(mut statement) => {
                statement.fn_name = Some(ADD_FN.to_string());
                statement.params.push(Statement::string(fragment));
                self.stack.push(statement);
                frame.depth = self.stack.len();
            }
            None => {
                if self.stack.len() != frame.depth {
                    return Err(ParseErrorKind::StringNotOnTop);
                }
                if let Some(add) = self.stack.last_mut() {
                    add.params.push(Statement::string(fragment));
                }
            }
        }
        trace!("open embed at {}", self.index);
        self.in_string = false;
        Ok(())
    }

    fn close_string(&mut self, fragment: String) -> Step {
        let Some(frame) = self.strings.pop() else {
            return Err(ParseErrorKind::StringNotOnTop);
        };
        self.in_string = false;

        let embedded = frame.is_embedded();
        let statement = match frame.statement {
            Some(mut statement) => {
                statement.value = Some(Literal::String(fragment));
                statement
            }
            None => {
                if self.stack.len() != frame.depth {
                    return Err(ParseErrorKind::StringNotOnTop);
                }
                let Some(mut add) = self.stack.pop() else {
                    return Err(ParseErrorKind::StringNotOnTop);
                };
                if !fragment.is_empty() {
                    add.params.push(Statement::string(fragment));
                }
                add
            }
        };

        if frame.kind != StringKind::Message {
            return self.append(statement);
        }

        if let Some(message) = self.messages.last_mut() {
            match (&statement.value, embedded) {
                (Some(Literal::String(text)), false) => {
                    message.content = Some(text.trim().to_string());
                }
                _ => message.statement = Some(statement),
            }
        }
        self.mode = Mode::TopLevel;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok(code: &str) -> Vec<ConvoMessage> {
        let result = parse(code);
        assert_eq!(result.error, None, "unexpected error for {:?}", code);
        result.messages
    }

    fn err(code: &str) -> ParseError {
        parse(code).error.expect("expected parse error")
    }

    #[test]
    fn test_plain_message() {
        let messages = ok("> user\n  hello there  \n\n> assistant\nhi");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content.as_deref(), Some("hello there"));
        assert_eq!(messages[0].statement, None);
        assert_eq!(messages[1].content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_message_with_embed() {
        let messages = ok("> user\nhello {{ 1 }} world");
        let s = messages[0].statement.as_ref().unwrap();
        assert_eq!(
            *s,
            Statement::call(
                ADD_FN,
                vec![
                    Statement::string("hello "),
                    Statement::number(1.0),
                    Statement::string(" world"),
                ]
            )
        );
        assert_eq!(messages[0].content, None);
    }

    #[test]
    fn test_embed_at_start_keeps_empty_fragment() {
        let messages = ok("> user\n{{name}}");
        let s = messages[0].statement.as_ref().unwrap();
        assert_eq!(
            s.params,
            vec![Statement::string(""), Statement::var_ref("name")]
        );
    }

    #[test]
    fn test_message_strings_are_not_unescaped() {
        let messages = ok("> user\na\\nb");
        assert_eq!(messages[0].content.as_deref(), Some("a\\nb"));
    }

    #[test]
    fn test_nested_embed_in_quoted_string() {
        let messages = ok("> user\n{{ print('a{{ x }}b') }}");
        let add = messages[0].statement.as_ref().unwrap();
        let print = &add.params[1];
        assert_eq!(print.fn_name.as_deref(), Some("print"));
        assert_eq!(
            print.params[0],
            Statement::call(
                ADD_FN,
                vec![
                    Statement::string("a"),
                    Statement::var_ref("x"),
                    Statement::string("b"),
                ]
            )
        );
    }

    #[test]
    fn test_function_declaration() {
        let code = "# Adds two numbers\n> local sum(a: number; b?: number) -> args (\n  return(add(a b))\n)";
        let messages = ok(code);
        assert_eq!(messages.len(), 1);
        let f = messages[0].function.as_ref().unwrap();
        assert_eq!(messages[0].role, "function");
        assert_eq!(f.name, "sum");
        assert_eq!(f.scope.as_deref(), Some("local"));
        assert_eq!(f.description.as_deref(), Some("Adds two numbers"));
        assert_eq!(f.params_name.as_deref(), Some("args"));
        assert_eq!(
            f.params,
            vec![
                Statement::var_ref("number").with_label("a", false),
                Statement::var_ref("number").with_label("b", true),
            ]
        );
        assert_eq!(f.body.len(), 1);
        assert!(f.body[0].is_call_to("return"));
    }

    #[test]
    fn test_function_without_body() {
        let messages = ok("> ping()\n> user\nhi");
        let f = messages[0].function.as_ref().unwrap();
        assert_eq!(f.name, "ping");
        assert!(f.params.is_empty());
        assert!(f.body.is_empty());
        assert_eq!(messages[1].content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_statement_shapes() {
        let messages = ok("> f() -> (\n  # counter\n  x = inc(n)\n  s = 'it\\'s'\n  k: .5\n  in\n  null\n)");
        let body = &messages[0].function.as_ref().unwrap().body;
        assert_eq!(body[0].set.as_deref(), Some("x"));
        assert_eq!(body[0].comment.as_deref(), Some("counter"));
        assert!(body[0].is_call_to("inc"));
        assert_eq!(body[1].value, Some(Literal::String("it's".into())));
        assert_eq!(body[2].label.as_deref(), Some("k"));
        assert_eq!(body[2].value, Some(Literal::Number(0.5)));
        assert_eq!(body[3].keyword, Some(NonFuncKeyword::In));
        assert_eq!(body[4].value, Some(Literal::Null));
    }

    #[test]
    fn test_dotted_reference() {
        let messages = ok("> f() -> (user.name.first)");
        let body = &messages[0].function.as_ref().unwrap().body;
        assert_eq!(body[0], Statement::var_ref("user.name.first"));
    }

    #[test]
    fn test_unterminated_quote() {
        let code = "> f() -> (\n  print('abc)\n)";
        let e = err(code);
        assert_eq!(e.kind, ParseErrorKind::UnterminatedString);
        assert_eq!(e.line_number, 2);
        assert_eq!(e.index, code.find('\'').unwrap());
        let caret = e.near.lines().nth(1).unwrap();
        assert_eq!(caret, "          ^");
        assert_eq!(e.near.lines().next().unwrap().chars().nth(10), Some('\''));
    }

    #[test]
    fn test_errors() {
        assert_eq!(err("> f() -> (x))").kind, ParseErrorKind::UnexpectedCharacter(')'));
        assert_eq!(err("> f() -> (x }})").kind, ParseErrorKind::StrayEmbedClose);
        assert_eq!(err("> f(a, (b))").kind, ParseErrorKind::MissingCallName);
        assert_eq!(err("> f(1.2.3)").kind, ParseErrorKind::InvalidLiteral("1.2.3".into()));
        assert_eq!(err("> f(a").kind, ParseErrorKind::UnexpectedEndOfFunction);
        assert_eq!(err("> user\n{{ add(1 }}").kind, ParseErrorKind::UnclosedCallInEmbed);
        assert_eq!(err("> user\n{{ ) }}").kind, ParseErrorKind::CallStackEndedInString);
        assert_eq!(err("> (x)").kind, ParseErrorKind::MissingFunctionName);
        assert_eq!(err(">\n").kind, ParseErrorKind::MissingRole);
        assert_eq!(err("> !x").kind, ParseErrorKind::MalformedHeader);
        assert_eq!(err("hello").kind, ParseErrorKind::UnexpectedCharacter('h'));
    }

    #[test]
    fn test_partial_messages_survive_error() {
        let result = parse("> user\nfine\n> f(a");
        assert!(result.error.is_some());
        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages[0].content.as_deref(), Some("fine"));
        assert_eq!(result.messages[1].role, "function");
    }
}
