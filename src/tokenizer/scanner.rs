//! Byte level helpers for the parser.
//!
//! Every token boundary the parser cares about is ASCII, so indexes returned
//! here are always valid `str` slice boundaries of the scanned text.

pub fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub fn is_space(b: u8) -> bool {
    b.is_ascii_whitespace()
}

pub fn is_inline_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

pub fn is_newline(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

/// Index of the first non-whitespace byte at or after `i`.
pub fn skip_space(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_space(bytes[i]) {
        i += 1;
    }
    i
}

pub fn skip_inline_space(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_inline_space(bytes[i]) {
        i += 1;
    }
    i
}

/// End index of the `\w+` run starting at `i` (equal to `i` when empty).
pub fn take_word(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_word(bytes[i]) {
        i += 1;
    }
    i
}

/// End index of the `[\w.]+` run starting at `i`.
pub fn take_value_word(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (is_word(bytes[i]) || bytes[i] == b'.') {
        i += 1;
    }
    i
}

/// Header modifiers `*`, `?` and `!`.
pub fn take_modifiers(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && matches!(bytes[i], b'*' | b'?' | b'!') {
        i += 1;
    }
    i
}

pub fn starts_with_at(bytes: &[u8], i: usize, pat: &[u8]) -> bool {
    bytes.len() >= i + pat.len() && &bytes[i..i + pat.len()] == pat
}

/// True when only spaces or tabs sit between the previous line break (or the
/// start of input) and `i`.
pub fn at_line_start(bytes: &[u8], i: usize) -> bool {
    let mut j = i;
    while j > 0 {
        let b = bytes[j - 1];
        if is_newline(b) {
            return true;
        }
        if !is_inline_space(b) {
            return false;
        }
        j -= 1;
    }
    true
}

/// Number of backslashes directly before `i`.
pub fn preceding_backslashes(bytes: &[u8], i: usize) -> usize {
    bytes[..i].iter().rev().take_while(|b| **b == b'\\').count()
}

/// Resolves `\n`, `\t`, `\r` and `\<char>` escapes.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
