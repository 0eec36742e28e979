//! The quotes pass: formatting spans (`*bold*`, `_italic_`, `` `mono` ``,
//! `#highlight#`, `^sup^`, `~sub~`) in their constrained and unconstrained
//! forms, with an optional `[.role]` prefix.

// Byte offsets in this module come from `find`/`char_indices` over the
// string being sliced, so direct slicing stays on char boundaries.
#![allow(clippy::indexing_slicing)]

use crate::model::Element;

use super::{Context, map_strings};

pub(crate) fn apply(elements: Vec<Element>, ctx: &Context) -> Vec<Element> {
    let compat = ctx.compat_mode;
    map_strings(elements, |text| scan(&text, compat))
}

fn variant(marker: char, role: Option<String>, body: Vec<Element>) -> Element {
    match marker {
        '*' => Element::Bold { role, body },
        '_' => Element::Italic { role, body },
        '#' => Element::Highlight { role, body },
        // '`' and compat-mode '+'
        _ => Element::Monospace { role, body },
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric()
}

fn scan(text: &str, compat: bool) -> Vec<Element> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();
    // The character preceding position `i` in the source text, spans
    // included. Governs the constrained-form boundary rule.
    let mut prev: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        // Escaped marker: drop the backslash, keep the marker as text.
        if chars[i] == '\\' && i + 1 < chars.len() && is_marker(chars[i + 1], compat) {
            current.push(chars[i + 1]);
            prev = Some(chars[i + 1]);
            i += 2;
            continue;
        }

        if chars[i] == '[' {
            if let Some((role, start)) = role_prefix(&chars, i) {
                if let Some((element, next)) = span_at(&chars, start, true, Some(role), compat) {
                    flush(&mut out, &mut current);
                    out.push(element);
                    prev = chars.get(next - 1).copied();
                    i = next;
                    continue;
                }
            }
        }

        if is_marker(chars[i], compat) {
            let boundary = prev.map_or(true, |c| !is_word(c));
            if let Some((element, next)) = span_at(&chars, i, boundary, None, compat) {
                flush(&mut out, &mut current);
                out.push(element);
                prev = chars.get(next - 1).copied();
                i = next;
                continue;
            }
        }

        current.push(chars[i]);
        prev = Some(chars[i]);
        i += 1;
    }
    flush(&mut out, &mut current);
    out
}

fn is_marker(c: char, compat: bool) -> bool {
    matches!(c, '*' | '_' | '`' | '#' | '^' | '~') || (compat && c == '+')
}

/// Try to read a formatting span starting at `i`. Returns the element and
/// the index just past the closing marker.
fn span_at(
    chars: &[char],
    i: usize,
    open_boundary: bool,
    role: Option<String>,
    compat: bool,
) -> Option<(Element, usize)> {
    let marker = chars[i];

    match marker {
        '^' | '~' => return tight_span(chars, i, marker),
        _ => {}
    }

    // Unconstrained form: doubled marker, closes at the next doubled marker.
    if chars.get(i + 1) == Some(&marker) && marker != '+' {
        let mut j = i + 2;
        while j + 1 < chars.len() {
            if chars[j] == marker && chars[j + 1] == marker {
                if j > i + 2 {
                    let inner: String = chars[i + 2..j].iter().collect();
                    return Some((variant(marker, role, scan(&inner, compat)), j + 2));
                }
                return None;
            }
            j += 1;
        }
        // No closing pair; fall through to the constrained attempt.
    }

    // Constrained form: single marker at a word boundary.
    if !open_boundary {
        return None;
    }
    let first = *chars.get(i + 1)?;
    if first.is_whitespace() || first == marker {
        return None;
    }
    let mut j = i + 2;
    while j < chars.len() {
        if chars[j] == marker
            && !chars[j - 1].is_whitespace()
            && chars.get(j + 1).map_or(true, |c| !is_word(*c))
        {
            let inner: String = chars[i + 1..j].iter().collect();
            return Some((variant(marker, role, scan(&inner, compat)), j + 1));
        }
        j += 1;
    }
    None
}

/// Superscript and subscript admit no whitespace at all inside the span.
fn tight_span(chars: &[char], i: usize, marker: char) -> Option<(Element, usize)> {
    let mut j = i + 1;
    while j < chars.len() {
        if chars[j] == marker {
            if j == i + 1 {
                return None;
            }
            let inner: String = chars[i + 1..j].iter().collect();
            let body = vec![Element::String(inner)];
            let element = if marker == '^' {
                Element::Superscript { body }
            } else {
                Element::Subscript { body }
            };
            return Some((element, j + 1));
        }
        if chars[j].is_whitespace() {
            return None;
        }
        j += 1;
    }
    None
}

/// A `[.role]` or `[role]` prefix immediately before a span marker. Returns
/// the role text and the marker index.
fn role_prefix(chars: &[char], i: usize) -> Option<(String, usize)> {
    let mut j = i + 1;
    let mut inner = String::new();
    while j < chars.len() && chars[j] != ']' {
        if chars[j] == '[' || chars[j].is_whitespace() {
            return None;
        }
        inner.push(chars[j]);
        j += 1;
    }
    if j >= chars.len() || inner.is_empty() {
        return None;
    }
    let marker = *chars.get(j + 1)?;
    if !matches!(marker, '*' | '_' | '`' | '#') {
        return None;
    }
    let role = inner
        .split('.')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if role.is_empty() {
        return None;
    }
    Some((role, j + 1))
}

fn flush(out: &mut Vec<Element>, current: &mut String) {
    if !current.is_empty() {
        out.push(Element::String(std::mem::take(current)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Element {
        Element::String(s.to_string())
    }

    fn run(input: &str) -> Vec<Element> {
        scan(input, false)
    }

    #[test]
    fn test_constrained_bold() {
        assert_eq!(
            run("a *strong* word"),
            vec![
                text("a "),
                Element::Bold {
                    role: None,
                    body: vec![text("strong")]
                },
                text(" word"),
            ]
        );
    }

    #[test]
    fn test_unconstrained_bold_inside_word() {
        assert_eq!(
            run("in**something**out"),
            vec![
                text("in"),
                Element::Bold {
                    role: None,
                    body: vec![text("something")]
                },
                text("out"),
            ]
        );
    }

    #[test]
    fn test_constrained_requires_boundary() {
        // A lone asterisk inside a word is plain text.
        assert_eq!(run("3*4*5"), vec![text("3*4*5")]);
    }

    #[test]
    fn test_spaced_asterisks_stay_text() {
        assert_eq!(run("2 * 3 * 4"), vec![text("2 * 3 * 4")]);
    }

    #[test]
    fn test_nested_spans() {
        assert_eq!(
            run("*bold _both_*"),
            vec![Element::Bold {
                role: None,
                body: vec![
                    text("bold "),
                    Element::Italic {
                        role: None,
                        body: vec![text("both")]
                    },
                ]
            }]
        );
    }

    #[test]
    fn test_monospace_and_highlight() {
        assert_eq!(
            run("`code` and #marked#"),
            vec![
                Element::Monospace {
                    role: None,
                    body: vec![text("code")]
                },
                text(" and "),
                Element::Highlight {
                    role: None,
                    body: vec![text("marked")]
                },
            ]
        );
    }

    #[test]
    fn test_superscript_and_subscript() {
        assert_eq!(
            run("E=mc^2^ and H~2~O"),
            vec![
                text("E=mc"),
                Element::Superscript {
                    body: vec![text("2")]
                },
                text(" and H"),
                Element::Subscript {
                    body: vec![text("2")]
                },
                text("O"),
            ]
        );
    }

    #[test]
    fn test_superscript_rejects_whitespace() {
        assert_eq!(run("a ^not this^ b"), vec![text("a ^not this^ b")]);
    }

    #[test]
    fn test_role_prefix() {
        assert_eq!(
            run("[.big]#shout#"),
            vec![Element::Highlight {
                role: Some("big".to_string()),
                body: vec![text("shout")]
            }]
        );
    }

    #[test]
    fn test_multiple_roles_joined() {
        assert_eq!(
            run("[.red.shadow]*loud*"),
            vec![Element::Bold {
                role: Some("red shadow".to_string()),
                body: vec![text("loud")]
            }]
        );
    }

    #[test]
    fn test_escaped_marker() {
        assert_eq!(run("\\*not bold*"), vec![text("*not bold*")]);
    }

    #[test]
    fn test_compat_plus_is_monospace() {
        assert_eq!(
            scan("use +literal+ here", true),
            vec![
                text("use "),
                Element::Monospace {
                    role: None,
                    body: vec![text("literal")]
                },
                text(" here"),
            ]
        );
    }

    #[test]
    fn test_unterminated_span_stays_text() {
        assert_eq!(run("a *dangling thing"), vec![text("a *dangling thing")]);
    }
}
