// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Conversion between plain strings and C character-literal lists.
//!
//! V-USB expects string descriptors as a brace-less initializer of single
//! character literals, e.g. `#define USB_CFG_VENDOR_NAME 'A','c','m','e'`.
//! [`to_usb_charlist`] produces that form; [`from_usb_charlist`] reads it back.
//!
//! Encoding rules:
//! - one literal per `char`, in order, joined by `,` with no spaces;
//! - `\n` and `\r` become a space (the macro must stay on one line);
//! - `'` is written as `'\''` and `\` as `'\\'`.

use thiserror::Error;

/// Failure to decode a character-literal list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed char literal list at byte {offset}: {reason}")]
pub struct CharlistError {
    /// Byte offset into the input where decoding stopped.
    pub offset: usize,
    /// Short description of the problem.
    pub reason: &'static str,
}

/// Encode `s` as a comma-separated list of C character literals.
pub fn to_usb_charlist(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 4);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match ch {
            '\n' | '\r' => out.push_str("' '"),
            '\'' => out.push_str(r"'\''"),
            '\\' => out.push_str(r"'\\'"),
            other => {
                out.push('\'');
                out.push(other);
                out.push('\'');
            }
        }
    }
    out
}

/// Decode a list produced by [`to_usb_charlist`].
///
/// Whitespace around the separators is tolerated so hand-edited headers
/// (`'A', 'B'`) decode too. An empty or all-blank list decodes to `""`.
pub fn from_usb_charlist(list: &str) -> Result<String, CharlistError> {
    let mut out = String::new();
    let mut chars = list.char_indices().peekable();
    let err = |offset, reason| CharlistError { offset, reason };

    loop {
        while chars.next_if(|(_, c)| c.is_ascii_whitespace()).is_some() {}
        let Some((start, open)) = chars.next() else {
            return Ok(out);
        };
        if open != '\'' {
            return Err(err(start, "expected opening quote"));
        }
        let value = match chars.next() {
            Some((_, '\\')) => match chars.next() {
                Some((_, '\'')) => '\'',
                Some((_, '\\')) => '\\',
                Some((at, _)) => return Err(err(at, "unsupported escape")),
                None => return Err(err(list.len(), "unterminated literal")),
            },
            Some((at, '\'')) => return Err(err(at, "empty literal")),
            Some((_, c)) => c,
            None => return Err(err(list.len(), "unterminated literal")),
        };
        match chars.next() {
            Some((_, '\'')) => out.push(value),
            Some((at, _)) => return Err(err(at, "expected closing quote")),
            None => return Err(err(list.len(), "unterminated literal")),
        }

        while chars.next_if(|(_, c)| c.is_ascii_whitespace()).is_some() {}
        match chars.next() {
            None => return Ok(out),
            Some((_, ',')) => {}
            Some((at, _)) => return Err(err(at, "expected `,`")),
        }
    }
}

/// Number of literals [`to_usb_charlist`] emits for `s`.
pub fn charlist_len(s: &str) -> usize {
    s.chars().count()
}

/// True when `s` is plain ASCII; anything else may not render on every host.
pub fn is_ascii_safe(s: &str) -> bool {
    s.is_ascii()
}
