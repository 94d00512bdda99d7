// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Line rules for rewriting the right-hand side of a `#define`.
//!
//! Matching works on raw bytes so header content outside the patched lines
//! survives byte-for-byte, even when it is not valid UTF-8. Lines end at `\n`
//! or `\r\n`; a trailing `\r` is never consumed. Whitespace inside a rule is
//! horizontal only (space, tab), so no rule can reach into the next line.
//! Form feed and vertical tab do not count as whitespace in either rule, so a
//! `#define` separated by them is left alone and reported as a mismatch.

use regex::bytes::{Captures, Regex};

use crate::plan::Rule;

/// Compile the line pattern for `name` under `rule`.
///
/// `prefix` captures `#define NAME ` (leading indentation included) and is
/// kept verbatim. For [`Rule::Length`] the RHS must be a bare decimal
/// integer; `trail` captures whitespace after it.
pub fn define_regex(name: &str, rule: Rule) -> Result<Regex, regex::Error> {
    let name = regex::escape(name);
    let pattern = match rule {
        Rule::Value => format!(r"(?mR-u)^(?P<prefix>[ \t]*#define[ \t]+{name}[ \t]+)[^\r\n]*$"),
        Rule::Length => {
            format!(r"(?mR-u)^(?P<prefix>[ \t]*#define[ \t]+{name}[ \t]+)[0-9]+(?P<trail>[ \t]*)$")
        }
    };
    Regex::new(&pattern)
}

/// Replace the RHS of every line matching `name` under `rule` with `rhs`.
///
/// Returns the rewritten text and how many lines matched. Callers decide what
/// a count other than one means; this function never fails on it.
pub fn replace_define(
    text: &[u8],
    name: &str,
    rule: Rule,
    rhs: &[u8],
) -> Result<(Vec<u8>, usize), regex::Error> {
    let re = define_regex(name, rule)?;
    let mut count = 0usize;
    let out = re.replace_all(text, |caps: &Captures<'_>| {
        count += 1;
        let mut line = caps["prefix"].to_vec();
        line.extend_from_slice(rhs);
        if let Some(trail) = caps.name("trail") {
            line.extend_from_slice(trail.as_bytes());
        }
        line
    });
    Ok((out.into_owned(), count))
}

/// Current RHS of the single line defining `name`, if exactly one exists.
pub fn read_define<'t>(text: &'t [u8], name: &str) -> Result<Option<&'t [u8]>, regex::Error> {
    let re = define_regex(name, Rule::Value)?;
    let mut hits = re.captures_iter(text);
    let (Some(caps), None) = (hits.next(), hits.next()) else {
        return Ok(None);
    };
    let (Some(whole), Some(prefix)) = (caps.get(0), caps.name("prefix")) else {
        return Ok(None);
    };
    Ok(Some(&text[prefix.end()..whole.end()]))
}
