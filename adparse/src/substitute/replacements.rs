//! The replacements pass (textual symbol substitution and character
//! references) and the post-replacements pass (hard line breaks).

// Byte offsets in this module come from `find`/`char_indices` over the
// string being sliced, so direct slicing stays on char boundaries.
#![allow(clippy::indexing_slicing)]

use crate::model::Element;

use super::map_strings_nested;

/// Symbol sequences replaced wherever they appear. Ordered so longer
/// sequences win over their prefixes.
const SYMBOLS: &[(&str, &str)] = &[
    ("(C)", "\u{a9}"),
    ("(R)", "\u{ae}"),
    ("(TM)", "\u{2122}"),
    ("...", "\u{2026}\u{200b}"),
    ("<=", "\u{21d0}"),
    ("=>", "\u{21d2}"),
    ("<-", "\u{2190}"),
    ("->", "\u{2192}"),
];

pub(crate) fn apply(elements: Vec<Element>) -> Vec<Element> {
    map_strings_nested(elements, &mut |text| {
        vec![Element::String(replace_in(&text))]
    })
}

fn replace_in(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    'outer: while !rest.is_empty() {
        // An escaped sequence loses the backslash and is kept literal.
        if let Some(tail) = rest.strip_prefix('\\') {
            for (from, _) in SYMBOLS {
                if tail.starts_with(from) {
                    out.push_str(from);
                    rest = &tail[from.len()..];
                    continue 'outer;
                }
            }
        }
        for (from, to) in SYMBOLS {
            if rest.starts_with(from) {
                out.push_str(to);
                rest = &rest[from.len()..];
                continue 'outer;
            }
        }
        if let Some((replacement, remainder)) = char_reference(rest) {
            out.push(replacement);
            rest = remainder;
            continue;
        }
        if let Some((replacement, remainder)) = em_dash(rest, &out) {
            out.push_str(replacement);
            rest = remainder;
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

/// A numeric character reference: `&#8212;` or `&#x2014;`.
fn char_reference(rest: &str) -> Option<(char, &str)> {
    let tail = rest.strip_prefix("&#")?;
    let (code, after) = match tail.strip_prefix(['x', 'X']) {
        Some(hex) => {
            let end = hex.find(';')?;
            (u32::from_str_radix(&hex[..end], 16).ok()?, &hex[end + 1..])
        }
        None => {
            let end = tail.find(';')?;
            (tail[..end].parse().ok()?, &tail[end + 1..])
        }
    };
    Some((char::from_u32(code)?, after))
}

/// `--` between word characters, or spaced ` -- `, becomes an em dash.
fn em_dash<'a>(rest: &'a str, out: &str) -> Option<(&'static str, &'a str)> {
    if let Some(after) = rest.strip_prefix(" -- ") {
        return Some(("\u{2009}\u{2014}\u{2009}", after));
    }
    let after = rest.strip_prefix("--")?;
    let prev_word = out.chars().last().is_some_and(char::is_alphanumeric);
    let next_word = after.chars().next().is_some_and(char::is_alphanumeric);
    if prev_word && next_word {
        Some(("\u{2014}", after))
    } else {
        None
    }
}

/// The post-replacements pass: a line ending in ` +` becomes a hard
/// [`Element::LineBreak`].
pub(crate) fn apply_post(elements: Vec<Element>) -> Vec<Element> {
    let mut elements = elements;
    let mut trailing = false;
    if let Some(Element::String(text)) = elements.last_mut() {
        if text.ends_with(" +") {
            text.truncate(text.len() - 2);
            let trimmed = text.trim_end().len();
            text.truncate(trimmed);
            trailing = true;
        }
    }
    if trailing {
        if matches!(elements.last(), Some(Element::String(text)) if text.is_empty()) {
            elements.pop();
        }
        elements.push(Element::LineBreak);
    }
    elements
}
