use crate::ast::Statement;
use crate::tokenizer::scanner::{at_line_start, is_newline, preceding_backslashes, skip_space, starts_with_at};

/// Which terminator ends an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Single,
    Double,
    /// Role message body, ended by a line starting with `>` or end of input
    Message,
}

impl StringKind {
    pub fn from_quote(b: u8) -> Option<Self> {
        match b {
            b'\'' => Some(StringKind::Single),
            b'"' => Some(StringKind::Double),
            _ => None,
        }
    }

    fn quote(self) -> Option<u8> {
        match self {
            StringKind::Single => Some(b'\''),
            StringKind::Double => Some(b'"'),
            StringKind::Message => None,
        }
    }

    pub fn unescapes(self) -> bool {
        self != StringKind::Message
    }
}

/// An open string on the parser's string stack.
#[derive(Debug)]
pub struct StringFrame {
    pub kind: StringKind,
    /// Index of the opening quote (or message content start)
    pub start: usize,
    /// The statement receiving the string while it has no embeds. Once an
    /// embed is found the statement turns into an `add` call and moves to
    /// the call stack at `depth - 1`.
    pub statement: Option<Statement>,
    pub depth: usize,
}

impl StringFrame {
    pub fn new(kind: StringKind, start: usize, statement: Statement) -> Self {
        Self {
            kind,
            start,
            statement: Some(statement),
            depth: 0,
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.statement.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringEnd {
    /// End of the literal text (exclusive)
    pub content_end: usize,
    /// Where scanning resumes
    pub next: usize,
    /// `{{` was found rather than the terminator
    pub embed: bool,
}

/// Finds the next embed opener or terminator of a `kind` string starting
/// at `from`. Returns `None` for a quoted string that never ends.
pub fn find_end(bytes: &[u8], from: usize, kind: StringKind) -> Option<StringEnd> {
    match kind.quote() {
        Some(quote) => find_quote_end(bytes, from, quote),
        None => Some(find_message_end(bytes, from)),
    }
}

fn find_quote_end(bytes: &[u8], from: usize, quote: u8) -> Option<StringEnd> {
    let mut p = from;
    while p < bytes.len() {
        if starts_with_at(bytes, p, b"{{") {
            return Some(StringEnd {
                content_end: p,
                next: p + 2,
                embed: true,
            });
        }
        if bytes[p] == quote && preceding_backslashes(bytes, p) % 2 == 0 {
            return Some(StringEnd {
                content_end: p,
                next: p + 1,
                embed: false,
            });
        }
        p += 1;
    }
    None
}

fn find_message_end(bytes: &[u8], from: usize) -> StringEnd {
    // header right after the role line: empty message
    if from < bytes.len() && bytes[from] == b'>' && at_line_start(bytes, from) {
        return StringEnd {
            content_end: from,
            next: from,
            embed: false,
        };
    }
    let mut p = from;
    while p < bytes.len() {
        if starts_with_at(bytes, p, b"{{") {
            return StringEnd {
                content_end: p,
                next: p + 2,
                embed: true,
            };
        }
        if is_newline(bytes[p]) {
            let q = skip_space(bytes, p);
            if q == bytes.len() || bytes[q] == b'>' {
                return StringEnd {
                    content_end: p,
                    next: q,
                    embed: false,
                };
            }
        }
        p += 1;
    }
    StringEnd {
        content_end: bytes.len(),
        next: bytes.len(),
        embed: false,
    }
}
