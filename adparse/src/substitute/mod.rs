//! The inline substitution pipeline.
//!
//! Substitution passes are applied to a run of inline content in the order
//! given by its [`SubstitutionSet`]. Each pass rewrites only
//! [`Element::String`] segments, splitting them where it introduces
//! structure; elements produced by an earlier pass, passthroughs above all,
//! are never revisited.
//!
//! All scanning is done over char indices so multi-byte text is never split
//! mid-codepoint.

// Byte offsets in this module come from `find`/`char_indices` over the
// string being sliced, so direct slicing stays on char boundaries.
#![allow(clippy::indexing_slicing)]

pub(crate) mod macros;
pub(crate) mod quotes;
pub(crate) mod replacements;

use crate::{
    attributes::AttributeStore,
    model::{Element, Substitution, SubstitutionSet},
    options::AttributeMissing,
};

/// Mutable state threaded through a substitution run.
#[derive(Debug)]
pub(crate) struct Context<'a> {
    pub(crate) store: &'a mut AttributeStore,
    pub(crate) attribute_missing: AttributeMissing,
    pub(crate) compat_mode: bool,
}

impl Context<'_> {
    /// The effective missing-reference policy: the `attribute-missing`
    /// document attribute wins over the API-supplied default.
    fn missing_policy(&self) -> AttributeMissing {
        match self.store.get("attribute-missing") {
            Some(value) => AttributeMissing::from_attribute(value.as_text()),
            None => self.attribute_missing,
        }
    }
}

/// Substitute a multi-line run of inline content. Lines are separated by
/// [`Element::NewLine`] in the output; a line removed by the `drop-line`
/// missing policy disappears along with its separator.
pub(crate) fn substitute_lines(
    lines: &[String],
    subs: &SubstitutionSet,
    ctx: &mut Context,
) -> Vec<Element> {
    let mut out = Vec::new();
    for line in lines {
        if let Some(elements) = substitute_line(line, subs, ctx) {
            if !out.is_empty() {
                out.push(Element::NewLine);
            }
            out.extend(elements);
        }
    }
    out
}

/// Substitute a single-line run, such as a block title or attribute value.
pub(crate) fn substitute_text(text: &str, subs: &SubstitutionSet, ctx: &mut Context) -> Vec<Element> {
    substitute_line(text, subs, ctx).unwrap_or_default()
}

/// Run the pipeline over one source line. `None` means the line was removed
/// by the `drop-line` missing policy.
fn substitute_line(line: &str, subs: &SubstitutionSet, ctx: &mut Context) -> Option<Vec<Element>> {
    let mut elements = vec![Element::String(line.to_string())];
    if subs.is_empty() {
        return Some(elements);
    }

    // Passthroughs are carved out before any pass runs, so their content is
    // shielded from the whole pipeline.
    if subs.contains(Substitution::Macros) {
        elements = macros::extract_passthroughs(elements, ctx);
    }

    for sub in subs.iter() {
        elements = match sub {
            // Special characters and callouts have no representation at the
            // tree level; they matter to renderers, not to structure.
            Substitution::SpecialCharacters | Substitution::Callouts => elements,
            Substitution::Attributes => apply_attributes(elements, ctx)?,
            Substitution::Quotes => quotes::apply(elements, ctx),
            Substitution::Replacements => replacements::apply(elements),
            Substitution::Macros => macros::apply(elements, ctx),
            Substitution::PostReplacements => replacements::apply_post(elements),
        };
    }
    Some(elements)
}

/// Map a pass over the string segments of `elements`, leaving everything
/// else untouched.
pub(crate) fn map_strings(
    elements: Vec<Element>,
    mut f: impl FnMut(String) -> Vec<Element>,
) -> Vec<Element> {
    let mut out = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Element::String(text) => out.extend(f(text)),
            other => out.push(other),
        }
    }
    out
}

/// Like [`map_strings`], but also descends into the bodies of formatting
/// spans so passes that run after the quotes pass still reach their text.
/// Passthrough content stays untouched.
pub(crate) fn map_strings_nested(
    elements: Vec<Element>,
    f: &mut impl FnMut(String) -> Vec<Element>,
) -> Vec<Element> {
    let mut out = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Element::String(text) => out.extend(f(text)),
            Element::Bold { role, body } => out.push(Element::Bold {
                role,
                body: map_strings_nested(body, f),
            }),
            Element::Italic { role, body } => out.push(Element::Italic {
                role,
                body: map_strings_nested(body, f),
            }),
            Element::Monospace { role, body } => out.push(Element::Monospace {
                role,
                body: map_strings_nested(body, f),
            }),
            Element::Highlight { role, body } => out.push(Element::Highlight {
                role,
                body: map_strings_nested(body, f),
            }),
            Element::Subscript { body } => out.push(Element::Subscript {
                body: map_strings_nested(body, f),
            }),
            Element::Superscript { body } => out.push(Element::Superscript {
                body: map_strings_nested(body, f),
            }),
            other => out.push(other),
        }
    }
    out
}

/// Expand `{name}` references in `input` against the store, leaving anything
/// unresolved in place. Used where only the expanded text is wanted, such as
/// `ifeval` operands and include targets.
pub(crate) fn expand_attribute_refs(input: &str, store: &AttributeStore) -> String {
    let mut in_progress = Vec::new();
    expand_into(input, store, &mut in_progress)
}

fn expand_into(input: &str, store: &AttributeStore, in_progress: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('{') {
        let (before, from_brace) = rest.split_at(open);
        out.push_str(before);
        match reference_at(from_brace) {
            Some((name, after)) => {
                match resolve(name, store, in_progress) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = after;
            }
            None => {
                out.push('{');
                rest = &from_brace[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// A `{name}` reference at the start of `input`, if the braces enclose a
/// valid attribute name. Returns the name and the remainder after `}`.
fn reference_at(input: &str) -> Option<(&str, &str)> {
    debug_assert!(input.starts_with('{'));
    let close = input.find('}')?;
    let name = &input[1..close];
    if name.is_empty() || !is_valid_name(name) {
        return None;
    }
    Some((name, &input[close + 1..]))
}

fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Resolve an attribute to its fully expanded value. A name already being
/// resolved further up the stack stays unresolved, bounding recursion under
/// self-reference.
fn resolve(name: &str, store: &AttributeStore, in_progress: &mut Vec<String>) -> Option<String> {
    if in_progress.iter().any(|n| n == name) {
        return None;
    }
    let value = store.get(name)?.as_text().to_string();
    in_progress.push(name.to_string());
    let expanded = expand_into(&value, store, in_progress);
    in_progress.pop();
    Some(expanded)
}

/// The attributes pass: `{name}` references, `{counter:...}` forms and the
/// `\{name}` escape. `None` drops the whole line (`drop-line` policy).
fn apply_attributes(elements: Vec<Element>, ctx: &mut Context) -> Option<Vec<Element>> {
    let policy = ctx.missing_policy();
    let mut out = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Element::String(text) => {
                out.extend(attribute_scan(&text, ctx, policy)?);
            }
            other => out.push(other),
        }
    }
    Some(out)
}

fn attribute_scan(
    text: &str,
    ctx: &mut Context,
    policy: AttributeMissing,
) -> Option<Vec<Element>> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        let (before, from_brace) = rest.split_at(open);

        // Escaped reference: the backslash comes off, the braces stay.
        if before.ends_with('\\') {
            current.push_str(&before[..before.len() - 1]);
            if let Some((name, after)) = reference_at(from_brace) {
                current.push('{');
                current.push_str(name);
                current.push('}');
                rest = after;
            } else {
                current.push('{');
                rest = &from_brace[1..];
            }
            continue;
        }
        current.push_str(before);

        if let Some((body, after)) = counter_at(from_brace) {
            flush(&mut out, &mut current);
            out.push(advance_counter(body, ctx));
            rest = after;
            continue;
        }

        match reference_at(from_brace) {
            Some((name, after)) => {
                let mut in_progress = Vec::new();
                match resolve(name, ctx.store, &mut in_progress) {
                    Some(value) => current.push_str(&value),
                    None => match policy {
                        AttributeMissing::Skip => {
                            flush(&mut out, &mut current);
                            out.push(Element::UserAttributeReference {
                                name: name.to_string(),
                            });
                        }
                        AttributeMissing::Drop => {
                            tracing::debug!(name, "dropping unresolved attribute reference");
                        }
                        AttributeMissing::DropLine => {
                            tracing::debug!(
                                name,
                                "dropping line with unresolved attribute reference"
                            );
                            return None;
                        }
                    },
                }
                rest = after;
            }
            None => {
                current.push('{');
                rest = &from_brace[1..];
            }
        }
    }
    current.push_str(rest);
    flush(&mut out, &mut current);
    Some(out)
}

/// A `{counter:name}` / `{counter2:name}` / `{counter:name:seed}` form at
/// the start of `input`. Returns the brace body and the remainder.
fn counter_at(input: &str) -> Option<(&str, &str)> {
    let close = input.find('}')?;
    let body = &input[1..close];
    if body.starts_with("counter:") || body.starts_with("counter2:") {
        Some((body, &input[close + 1..]))
    } else {
        None
    }
}

fn advance_counter(body: &str, ctx: &mut Context) -> Element {
    let (display, spec) = match body.strip_prefix("counter2:") {
        Some(spec) => (false, spec),
        None => (true, body.strip_prefix("counter:").unwrap_or(body)),
    };
    let mut parts = spec.splitn(2, ':');
    let name = parts.next().unwrap_or_default().to_string();
    let initial_value = parts.next().map(str::to_string);
    ctx.store.advance_counter(&name, initial_value.as_deref());
    Element::Counter {
        name,
        initial_value,
        display,
    }
}

fn flush(out: &mut Vec<Element>, current: &mut String) {
    if !current.is_empty() {
        out.push(Element::String(std::mem::take(current)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SafeMode;
    use pretty_assertions::assert_eq;

    fn store() -> AttributeStore {
        AttributeStore::new(SafeMode::Unsafe)
    }

    fn normal(line: &str, store: &mut AttributeStore) -> Vec<Element> {
        let mut ctx = Context {
            store,
            attribute_missing: AttributeMissing::Skip,
            compat_mode: false,
        };
        substitute_line(line, &SubstitutionSet::normal(), &mut ctx).unwrap_or_default()
    }

    #[test]
    fn test_resolved_reference_inlined() {
        let mut attrs = store();
        attrs.set("product", "Widget").ok();
        assert_eq!(
            normal("the {product} ships", &mut attrs),
            vec![Element::String("the Widget ships".to_string())]
        );
    }

    #[test]
    fn test_nested_reference_expands_once_more() {
        let mut attrs = store();
        attrs.set("inner", "deep").ok();
        attrs.set("outer", "in {inner} water").ok();
        assert_eq!(
            normal("{outer}", &mut attrs),
            vec![Element::String("in deep water".to_string())]
        );
    }

    #[test]
    fn test_self_reference_stays_literal() {
        let mut attrs = store();
        attrs.set("loop", "a {loop} b").ok();
        assert_eq!(
            normal("{loop}", &mut attrs),
            vec![Element::String("a {loop} b".to_string())]
        );
    }

    #[test]
    fn test_missing_reference_skip_policy() {
        let mut attrs = store();
        assert_eq!(
            normal("Belly up to the {foo}.", &mut attrs),
            vec![
                Element::String("Belly up to the ".to_string()),
                Element::UserAttributeReference {
                    name: "foo".to_string()
                },
                Element::String(".".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_reference_drop_policy() {
        let mut attrs = store();
        attrs.set("attribute-missing", "drop").ok();
        assert_eq!(
            normal("a {gone} b", &mut attrs),
            vec![Element::String("a  b".to_string())]
        );
    }

    #[test]
    fn test_missing_reference_drop_line_policy() {
        let mut attrs = store();
        attrs.set("attribute-missing", "drop-line").ok();
        let mut ctx = Context {
            store: &mut attrs,
            attribute_missing: AttributeMissing::Skip,
            compat_mode: false,
        };
        let lines = vec![
            "first".to_string(),
            "gone {nope} here".to_string(),
            "last".to_string(),
        ];
        assert_eq!(
            substitute_lines(&lines, &SubstitutionSet::normal(), &mut ctx),
            vec![
                Element::String("first".to_string()),
                Element::NewLine,
                Element::String("last".to_string()),
            ]
        );
    }

    #[test]
    fn test_escaped_reference_kept_literal() {
        let mut attrs = store();
        attrs.set("name", "value").ok();
        assert_eq!(
            normal("literal \\{name} here", &mut attrs),
            vec![Element::String("literal {name} here".to_string())]
        );
    }

    #[test]
    fn test_stray_brace_is_text() {
        let mut attrs = store();
        assert_eq!(
            normal("set {a b} aside", &mut attrs),
            vec![Element::String("set {a b} aside".to_string())]
        );
    }

    #[test]
    fn test_counter_advances_store() {
        let mut attrs = store();
        let elements = normal("rev {counter:rev}", &mut attrs);
        assert_eq!(
            elements,
            vec![
                Element::String("rev ".to_string()),
                Element::Counter {
                    name: "rev".to_string(),
                    initial_value: None,
                    display: true
                },
            ]
        );
        assert_eq!(attrs.get("rev").map(|v| v.as_text().to_string()), Some("0".to_string()));

        normal("{counter:rev}", &mut attrs);
        assert_eq!(attrs.get("rev").map(|v| v.as_text().to_string()), Some("1".to_string()));
    }

    #[test]
    fn test_hidden_counter() {
        let mut attrs = store();
        let elements = normal("{counter2:idx:5}", &mut attrs);
        assert_eq!(
            elements,
            vec![Element::Counter {
                name: "idx".to_string(),
                initial_value: Some("5".to_string()),
                display: false
            }]
        );
        assert_eq!(attrs.get("idx").map(|v| v.as_text().to_string()), Some("5".to_string()));
    }

    #[test]
    fn test_empty_set_is_identity() {
        let mut attrs = store();
        attrs.set("name", "value").ok();
        let mut ctx = Context {
            store: &mut attrs,
            attribute_missing: AttributeMissing::Skip,
            compat_mode: false,
        };
        assert_eq!(
            substitute_line("keep {name} raw", &SubstitutionSet::none(), &mut ctx),
            Some(vec![Element::String("keep {name} raw".to_string())])
        );
    }

    #[test]
    fn test_expand_attribute_refs_plain() {
        let mut attrs = store();
        attrs.set("version", "3".to_string()).ok();
        assert_eq!(expand_attribute_refs("v{version}!", &attrs), "v3!");
        assert_eq!(expand_attribute_refs("{missing}", &attrs), "{missing}");
    }

    #[test]
    fn test_multibyte_text_survives() {
        let mut attrs = store();
        attrs.set("lang", "日本語").ok();
        assert_eq!(
            normal("テキスト {lang} 🎉", &mut attrs),
            vec![Element::String("テキスト 日本語 🎉".to_string())]
        );
    }
}
