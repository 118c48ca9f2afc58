//! Escape sequences
//!
//! Delimiters inside a value travel as escape sequences: `\F\` field,
//! `\S\` component, `\T\` subcomponent, `\R\` repetition and `\E\` the escape
//! character itself (shown with the default delimiters). Formatting and
//! character set sequences such as `\H\`, `\.br\` or `\X0D\` are not
//! translated; they stay in the value verbatim and are written back unchanged.

use crate::domain::encoding::EncodingCharacters;
use std::borrow::Cow;

/// Replaces delimiter escape sequences with the characters they stand for
///
/// # Examples
///
/// ```
/// use pipehat::core::escape::unescape;
/// use pipehat::domain::EncodingCharacters;
///
/// let enc = EncodingCharacters::default();
/// assert_eq!(unescape("Smith\\S\\Jones", &enc), "Smith^Jones");
/// assert_eq!(unescape("line\\.br\\two", &enc), "line\\.br\\two");
/// ```
pub fn unescape<'a>(text: &'a str, enc: &EncodingCharacters) -> Cow<'a, str> {
    let esc = enc.escape_character();
    if !text.contains(esc) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(esc) {
        out.push_str(&rest[..start]);
        let after = &rest[start + esc.len_utf8()..];
        let Some(end) = after.find(esc) else {
            // unterminated, keep as is
            out.push_str(&rest[start..]);
            return Cow::Owned(out);
        };

        let sequence = &after[..end];
        match delimiter_for(sequence, enc) {
            Some(c) => out.push(c),
            None => {
                out.push(esc);
                out.push_str(sequence);
                out.push(esc);
            }
        }
        rest = &after[end + esc.len_utf8()..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Replaces delimiter characters with escape sequences
///
/// Formatting sequences already present in the value are left alone so a
/// parsed value encodes back to the text it came from.
///
/// # Examples
///
/// ```
/// use pipehat::core::escape::escape;
/// use pipehat::domain::EncodingCharacters;
///
/// let enc = EncodingCharacters::default();
/// assert_eq!(escape("A&B|C", &enc), "A\\T\\B\\F\\C");
/// assert_eq!(escape("bold \\H\\ text", &enc), "bold \\H\\ text");
/// ```
pub fn escape<'a>(text: &'a str, enc: &EncodingCharacters) -> Cow<'a, str> {
    if !text.chars().any(|c| enc.is_delimiter(c)) {
        return Cow::Borrowed(text);
    }

    let esc = enc.escape_character();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with(esc) {
            if let Some(len) = formatting_sequence_len(rest, esc) {
                out.push_str(&rest[..len]);
                i += len;
                continue;
            }
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        match code_for(c, enc) {
            Some(code) => {
                out.push(esc);
                out.push(code);
                out.push(esc);
            }
            None => out.push(c),
        }
        i += c.len_utf8();
    }
    Cow::Owned(out)
}

fn delimiter_for(sequence: &str, enc: &EncodingCharacters) -> Option<char> {
    match sequence {
        "F" => Some(enc.field_separator()),
        "S" => Some(enc.component_separator()),
        "T" => Some(enc.subcomponent_separator()),
        "R" => Some(enc.repetition_separator()),
        "E" => Some(enc.escape_character()),
        _ => None,
    }
}

fn code_for(c: char, enc: &EncodingCharacters) -> Option<char> {
    if c == enc.field_separator() {
        Some('F')
    } else if c == enc.component_separator() {
        Some('S')
    } else if c == enc.subcomponent_separator() {
        Some('T')
    } else if c == enc.repetition_separator() {
        Some('R')
    } else if c == enc.escape_character() {
        Some('E')
    } else {
        None
    }
}

/// Length in bytes of a formatting sequence at the start of `text`, both
/// escape characters included
fn formatting_sequence_len(text: &str, esc: char) -> Option<usize> {
    let body = text.strip_prefix(esc)?;
    let end = body.find(esc)?;
    if is_formatting(&body[..end]) {
        Some(2 * esc.len_utf8() + end)
    } else {
        None
    }
}

/// Highlighting, formatted text and character set sequences
fn is_formatting(sequence: &str) -> bool {
    let mut chars = sequence.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let rest = chars.as_str();
    match first {
        'H' | 'N' => rest.is_empty(),
        '.' => {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
        }
        'X' | 'Z' | 'C' | 'M' => {
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}
