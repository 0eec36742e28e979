//! The macros pass: inline macros (`image:`, `link:`, `xref:`), shorthand
//! cross-references and anchors, autolinks, and the passthrough forms that
//! shield content from the rest of the pipeline.

// Byte offsets in this module come from `find`/`char_indices` over the
// string being sliced, so direct slicing stays on char boundaries.
#![allow(clippy::indexing_slicing)]

use crate::{
    attrlist,
    model::{AttributeList, Element, SubstitutionSet, XrefFormat},
};

use super::{Context, map_strings_nested};

const AUTOLINK_SCHEMES: &[&str] = &["https", "http", "ftp", "irc", "mailto"];

/// Carve `pass:[]`, `+++...+++` and constrained `+...+` runs out of the
/// string segments before any pass runs. In compat mode single-plus is a
/// monospace form and is left for the quotes pass.
pub(crate) fn extract_passthroughs(elements: Vec<Element>, ctx: &mut Context) -> Vec<Element> {
    let mut out = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Element::String(text) => extract_from(&text, ctx, &mut out),
            other => out.push(other),
        }
    }
    out
}

fn extract_from(text: &str, ctx: &mut Context, out: &mut Vec<Element>) {
    let mut current = String::new();
    let mut rest = text;

    'outer: while !rest.is_empty() {
        if let Some(open) = rest.find(|c| c == '+' || c == 'p') {
            let (before, at) = rest.split_at(open);
            let escaped = before.ends_with('\\');

            if let Some(tail) = at.strip_prefix("+++") {
                if let Some(close) = tail.find("+++") {
                    if escaped {
                        current.push_str(&before[..before.len() - 1]);
                        current.push_str("+++");
                        rest = tail;
                        continue 'outer;
                    }
                    current.push_str(before);
                    flush(&mut current, out);
                    out.push(Element::Passthrough {
                        body: vec![Element::String(tail[..close].to_string())],
                    });
                    rest = &tail[close + 3..];
                    continue 'outer;
                }
            } else if at.starts_with("pass:") {
                if let Some((element, remainder)) = pass_macro(at, ctx) {
                    if escaped {
                        current.push_str(&before[..before.len() - 1]);
                        current.push_str(&at[..at.len() - remainder.len()]);
                        rest = remainder;
                        continue 'outer;
                    }
                    current.push_str(before);
                    flush(&mut current, out);
                    out.push(element);
                    rest = remainder;
                    continue 'outer;
                }
            } else if at.starts_with('+') && !ctx.compat_mode && !escaped {
                if let Some((inner, remainder)) = constrained_plus(before, at) {
                    current.push_str(before);
                    flush(&mut current, out);
                    out.push(Element::Passthrough {
                        body: vec![Element::String(inner.to_string())],
                    });
                    rest = remainder;
                    continue 'outer;
                }
            }

            // No passthrough at this position; emit up to and including the
            // trigger character and keep scanning.
            current.push_str(before);
            let mut chars = at.chars();
            if let Some(c) = chars.next() {
                current.push(c);
            }
            rest = chars.as_str();
        } else {
            current.push_str(rest);
            break;
        }
    }
    flush(&mut current, out);
}

/// `pass:spec[content]`: apply exactly the named substitutions to the
/// content. An invalid spec means the macro is not recognized at all.
fn pass_macro<'a>(at: &'a str, ctx: &mut Context) -> Option<(Element, &'a str)> {
    let tail = at.strip_prefix("pass:")?;
    let open = tail.find('[')?;
    let spec = &tail[..open];
    let close = tail[open + 1..].find(']')? + open + 1;
    let content = &tail[open + 1..close];

    let subs = if spec.is_empty() {
        SubstitutionSet::none()
    } else {
        SubstitutionSet::parse_exact(spec)?
    };
    let body = super::substitute_line(content, &subs, ctx)?;
    Some((Element::Passthrough { body }, &tail[close + 1..]))
}

/// Constrained `+...+`: same word-boundary rules as the quote spans.
fn constrained_plus<'a>(before: &str, at: &'a str) -> Option<(&'a str, &'a str)> {
    if before.chars().last().is_some_and(char::is_alphanumeric) {
        return None;
    }
    let tail = &at[1..];
    let first = tail.chars().next()?;
    if first.is_whitespace() || first == '+' {
        return None;
    }
    // The closing '+' is a single byte, so every later offset lands on a
    // char boundary; only the first character needs its real width.
    let mut search = first.len_utf8();
    while let Some(found) = tail[search..].find('+') {
        let close = search + found;
        let prev = tail[..close].chars().last()?;
        let next = tail[close + 1..].chars().next();
        if !prev.is_whitespace() && next.map_or(true, |c| !c.is_alphanumeric()) {
            return Some((&tail[..close], &tail[close + 1..]));
        }
        search = close + 1;
    }
    None
}

/// The macros pass proper. Runs after the quotes pass, so it descends into
/// formatting spans.
pub(crate) fn apply(elements: Vec<Element>, _ctx: &mut Context) -> Vec<Element> {
    map_strings_nested(elements, &mut |text| scan(&text))
}

fn scan(text: &str) -> Vec<Element> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some(pos) = rest.find(|c: char| c == '<' || c == '[' || c.is_ascii_alphabetic())
        else {
            current.push_str(rest);
            break;
        };
        let (before, at) = rest.split_at(pos);
        let escaped = before.ends_with('\\');

        let matched = if escaped {
            None
        } else {
            match_at(at)
        };
        match matched {
            Some((element, remainder)) => {
                current.push_str(before);
                flush(&mut current, &mut out);
                out.push(element);
                rest = remainder;
            }
            None => {
                if escaped && match_at(at).is_some() {
                    // Drop the escaping backslash, keep the macro literal.
                    current.push_str(&before[..before.len() - 1]);
                } else {
                    current.push_str(before);
                }
                let mut chars = at.chars();
                if let Some(c) = chars.next() {
                    current.push(c);
                }
                rest = chars.as_str();
            }
        }
    }
    flush(&mut current, &mut out);
    out
}

fn match_at(at: &str) -> Option<(Element, &str)> {
    if let Some(tail) = at.strip_prefix("<<") {
        return shorthand_xref(tail);
    }
    if let Some(tail) = at.strip_prefix("[[") {
        return inline_anchor(tail);
    }
    if let Some(tail) = at.strip_prefix("image:") {
        // `image::` is a block macro and never an inline match.
        if !tail.starts_with(':') {
            return bracket_macro(tail).map(|(path, attributes, rest)| {
                (Element::InlineImage { path, attributes }, rest)
            });
        }
        return None;
    }
    if let Some(tail) = at.strip_prefix("xref:") {
        if !tail.starts_with(':') {
            return bracket_macro(tail).map(|(id, attributes, rest)| {
                let body = attributes
                    .positional(1)
                    .map(|value| value.to_string())
                    .filter(|value| !value.is_empty());
                (
                    Element::CrossReference {
                        id,
                        body,
                        format: XrefFormat::Macro,
                    },
                    rest,
                )
            });
        }
        return None;
    }
    if let Some(tail) = at.strip_prefix("link:") {
        if !tail.starts_with(':') {
            return bracket_macro(tail).map(|(target, attributes, rest)| {
                let (scheme, path) = split_scheme(&target);
                (
                    Element::Link {
                        scheme,
                        path,
                        attributes,
                    },
                    rest,
                )
            });
        }
        return None;
    }
    autolink(at)
}

/// `target[attrs]` with a whitespace-free target.
fn bracket_macro(tail: &str) -> Option<(String, AttributeList, &str)> {
    let open = tail.find('[')?;
    let target = &tail[..open];
    if target.is_empty() || target.chars().any(char::is_whitespace) {
        return None;
    }
    let close = tail[open + 1..].find(']')? + open + 1;
    let attributes = attrlist::parse_macro(&tail[open + 1..close]).ok()?;
    Some((target.to_string(), attributes, &tail[close + 1..]))
}

fn shorthand_xref(tail: &str) -> Option<(Element, &str)> {
    let close = tail.find(">>")?;
    let inner = &tail[..close];
    if inner.is_empty() || inner.contains('\n') {
        return None;
    }
    let (id, body) = match inner.split_once(',') {
        Some((id, text)) => (id.trim(), Some(text.trim().to_string())),
        None => (inner.trim(), None),
    };
    if id.is_empty() {
        return None;
    }
    Some((
        Element::CrossReference {
            id: id.to_string(),
            body,
            format: XrefFormat::Shorthand,
        },
        &tail[close + 2..],
    ))
}

fn inline_anchor(tail: &str) -> Option<(Element, &str)> {
    let close = tail.find("]]")?;
    let inner = &tail[..close];
    let (id, label) = match inner.split_once(',') {
        Some((id, label)) => (id, Some(label.trim().to_string())),
        None => (inner, None),
    };
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return None;
    }
    Some((
        Element::Anchor {
            id: id.to_string(),
            label,
        },
        &tail[close + 2..],
    ))
}

/// A bare URL. Recognized schemes only; trailing punctuation stays outside
/// the link.
fn autolink(at: &str) -> Option<(Element, &str)> {
    let scheme = AUTOLINK_SCHEMES
        .iter()
        .find(|scheme| at.starts_with(&format!("{scheme}:")))?;
    let end = at
        .find(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '<' | '>'))
        .unwrap_or(at.len());
    let mut candidate = &at[..end];
    while candidate.ends_with(['.', ',', ';', ':', ')', '!', '?']) {
        candidate = &candidate[..candidate.len() - 1];
    }
    // The scheme prefix alone is not a link.
    if candidate.len() <= scheme.len() + 1 {
        return None;
    }
    if url::Url::parse(candidate).is_err() {
        return None;
    }
    let (scheme, path) = split_scheme(candidate);
    Some((
        Element::Link {
            scheme,
            path,
            attributes: AttributeList::new(),
        },
        &at[candidate.len()..],
    ))
}

fn split_scheme(target: &str) -> (String, String) {
    match target.split_once(':') {
        Some((scheme, path)) if scheme.chars().all(|c| c.is_ascii_alphanumeric()) => {
            (scheme.to_string(), path.to_string())
        }
        Some(_) | None => (String::new(), target.to_string()),
    }
}

fn flush(current: &mut String, out: &mut Vec<Element>) {
    if !current.is_empty() {
        out.push(Element::String(std::mem::take(current)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SafeMode, attributes::AttributeStore, options::AttributeMissing};
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Element {
        Element::String(s.to_string())
    }

    #[test]
    fn test_inline_image() {
        let elements = scan("see image:logo.png[Logo] here");
        assert_eq!(elements.len(), 3);
        assert!(matches!(
            &elements[1],
            Element::InlineImage { path, .. } if path == "logo.png"
        ));
    }

    #[test]
    fn test_block_image_not_matched_inline() {
        assert_eq!(
            scan("image::logo.png[]"),
            vec![text("image::logo.png[]")]
        );
    }

    #[test]
    fn test_xref_macro() {
        let elements = scan("xref:section-b[Section B]");
        assert_eq!(
            elements,
            vec![Element::CrossReference {
                id: "section-b".to_string(),
                body: Some("Section B".to_string()),
                format: XrefFormat::Macro,
            }]
        );
    }

    #[test]
    fn test_shorthand_xref() {
        assert_eq!(
            scan("see <<intro,the intro>>"),
            vec![
                text("see "),
                Element::CrossReference {
                    id: "intro".to_string(),
                    body: Some("the intro".to_string()),
                    format: XrefFormat::Shorthand,
                },
            ]
        );
    }

    #[test]
    fn test_inline_anchor() {
        assert_eq!(
            scan("[[target,A Label]]text"),
            vec![
                Element::Anchor {
                    id: "target".to_string(),
                    label: Some("A Label".to_string()),
                },
                text("text"),
            ]
        );
    }

    #[test]
    fn test_autolink_trims_trailing_punctuation() {
        let elements = scan("read https://example.com/docs.");
        assert_eq!(
            elements,
            vec![
                text("read "),
                Element::Link {
                    scheme: "https".to_string(),
                    path: "//example.com/docs".to_string(),
                    attributes: AttributeList::new(),
                },
                text("."),
            ]
        );
    }

    #[test]
    fn test_link_macro() {
        let elements = scan("link:https://example.com[Example]");
        assert!(matches!(
            &elements[0],
            Element::Link { scheme, path, .. } if scheme == "https" && path == "//example.com"
        ));
    }

    #[test]
    fn test_escaped_macro_stays_literal() {
        assert_eq!(
            scan("\\image:x.png[y]"),
            vec![text("image:x.png[y]")]
        );
    }

    #[test]
    fn test_plain_word_not_a_macro() {
        assert_eq!(scan("imagery and passion"), vec![text("imagery and passion")]);
    }

    fn ctx_store() -> AttributeStore {
        AttributeStore::new(SafeMode::Unsafe)
    }

    #[test]
    fn test_triple_plus_passthrough() {
        let mut store = ctx_store();
        let mut ctx = Context {
            store: &mut store,
            attribute_missing: AttributeMissing::Skip,
            compat_mode: false,
        };
        let out = extract_passthroughs(vec![text("a +++{b}+++ c")], &mut ctx);
        assert_eq!(
            out,
            vec![
                text("a "),
                Element::Passthrough {
                    body: vec![text("{b}")]
                },
                text(" c"),
            ]
        );
    }

    #[test]
    fn test_pass_macro_with_valid_spec() {
        let mut store = ctx_store();
        store.set("name", "value").ok();
        let mut ctx = Context {
            store: &mut store,
            attribute_missing: AttributeMissing::Skip,
            compat_mode: false,
        };
        let out = extract_passthroughs(vec![text("pass:a[{name}]")], &mut ctx);
        assert_eq!(
            out,
            vec![Element::Passthrough {
                body: vec![text("value")]
            }]
        );
    }

    #[test]
    fn test_pass_macro_invalid_spec_falls_through() {
        let mut store = ctx_store();
        let mut ctx = Context {
            store: &mut store,
            attribute_missing: AttributeMissing::Skip,
            compat_mode: false,
        };
        let out = extract_passthroughs(vec![text("pass:bogus[text]")], &mut ctx);
        assert_eq!(out, vec![text("pass:bogus[text]")]);
    }

    #[test]
    fn test_constrained_plus_passthrough() {
        let mut store = ctx_store();
        let mut ctx = Context {
            store: &mut store,
            attribute_missing: AttributeMissing::Skip,
            compat_mode: false,
        };
        let out = extract_passthroughs(vec![text("keep +{x}+ raw")], &mut ctx);
        assert_eq!(
            out,
            vec![
                text("keep "),
                Element::Passthrough {
                    body: vec![text("{x}")]
                },
                text(" raw"),
            ]
        );
    }

    #[test]
    fn test_constrained_plus_multibyte_content() {
        let mut store = ctx_store();
        let mut ctx = Context {
            store: &mut store,
            attribute_missing: AttributeMissing::Skip,
            compat_mode: false,
        };
        let out = extract_passthroughs(vec![text("+日本+ text")], &mut ctx);
        assert_eq!(
            out,
            vec![
                Element::Passthrough {
                    body: vec![text("日本")]
                },
                text(" text"),
            ]
        );
    }

    #[test]
    fn test_compat_mode_leaves_single_plus() {
        let mut store = ctx_store();
        let mut ctx = Context {
            store: &mut store,
            attribute_missing: AttributeMissing::Skip,
            compat_mode: true,
        };
        let out = extract_passthroughs(vec![text("keep +lit+ raw")], &mut ctx);
        assert_eq!(out, vec![text("keep +lit+ raw")]);
    }
}
