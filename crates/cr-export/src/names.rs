//! ISO 9075 encoding of item names for use as XML names.
//!
//! A character that may not appear at its position in an XML name is
//! written as `_xHHHH_` (uppercase hex of the code point). An underscore
//! that would otherwise read as the start of such an escape is itself
//! escaped as `_x005F_`. The prefix and local part of a prefixed name are
//! encoded separately and the colon between them is kept.

use std::fmt::Write;

/// Encode a possibly prefixed item name as an XML qualified name.
pub(crate) fn encode_name(name: &str) -> String {
    match name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() => {
            format!("{}:{}", encode_part(prefix), encode_part(local))
        }
        _ => encode_part(name),
    }
}

fn encode_part(part: &str) -> String {
    let chars: Vec<char> = part.chars().collect();
    let mut out = String::with_capacity(part.len());
    for (i, &c) in chars.iter().enumerate() {
        let allowed = if i == 0 {
            is_name_start_char(c)
        } else {
            is_name_char(c)
        };
        if !allowed || (c == '_' && looks_escaped(&chars[i..])) {
            // Writing to a String cannot fail.
            let _ = write!(out, "_x{:04X}_", c as u32);
        } else {
            out.push(c);
        }
    }
    out
}

/// `_xHHHH_` at the start of `chars`.
fn looks_escaped(chars: &[char]) -> bool {
    chars.len() >= 7
        && chars[1] == 'x'
        && chars[2..6].iter().all(char::is_ascii_hexdigit)
        && chars[6] == '_'
}

/// XML 1.0 `NameStartChar`, without the colon.
fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// XML 1.0 `NameChar`, without the colon.
fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}
