use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("End of string not found")]
    UnterminatedString,
    #[error("Unexpected end of function")]
    UnexpectedEndOfFunction,
    #[error("Unexpected end of message")]
    UnexpectedEndOfMessage,
    #[error("Unexpected end of function call")]
    UnmatchedClose,
    #[error("End of call stack reached within a string")]
    CallStackEndedInString,
    #[error("Unexpected string embed closing found")]
    StrayEmbedClose,
    #[error("Unclosed function call in string embed")]
    UnclosedCallInEmbed,
    #[error("String not on top of stack")]
    StringNotOnTop,
    #[error("function name expected")]
    MissingFunctionName,
    #[error("function call name expected")]
    MissingCallName,
    #[error("message role expected")]
    MissingRole,
    #[error("Message or function expected")]
    MalformedHeader,
    #[error("Invalid literal - {0}")]
    InvalidLiteral(String),
    #[error("Unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

/// Failure of a single parse with enough position data to point at the
/// offending source.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message} (line {line_number})")]
#[serde(rename_all = "camelCase")]
pub struct ParseError {
    #[serde(skip)]
    pub kind: ParseErrorKind,
    pub message: String,
    pub index: usize,
    pub line_number: usize,
    pub line: String,
    pub near: String,
}

const NEAR_BEFORE: usize = 10;
const NEAR_AFTER: usize = 20;

impl ParseError {
    pub fn new(code: &str, index: usize, kind: ParseErrorKind) -> Self {
        let index = floor_char_boundary(code, index.min(code.len()));
        let line_number = 1 + code[..index].bytes().filter(|b| *b == b'\n').count();

        let line_start = code[..index].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = code[index..]
            .find('\n')
            .map(|i| index + i)
            .unwrap_or(code.len());
        let line = code[line_start..line_end].trim().to_string();

        Self {
            message: kind.to_string(),
            kind,
            index,
            line_number,
            line,
            near: near_excerpt(code, index),
        }
    }
}

/// Excerpt around `index` with line breaks shown as `↩`, other whitespace as
/// `•`, and a caret line pointing at `index`.
fn near_excerpt(code: &str, index: usize) -> String {
    let before: Vec<char> = code[..index].chars().rev().take(NEAR_BEFORE).collect();
    let after = code[index..].chars().take(NEAR_AFTER);

    let visible = |c: char| match c {
        '\n' => '↩',
        c if c.is_whitespace() => '•',
        c => c,
    };

    let mut near: String = before.iter().rev().copied().map(visible).collect();
    near.extend(after.map(visible));
    near.push('\n');
    near.push_str(&" ".repeat(before.len()));
    near.push('^');
    near
}

fn floor_char_boundary(code: &str, mut index: usize) -> usize {
    while index > 0 && !code.is_char_boundary(index) {
        index -= 1;
    }
    index
}
