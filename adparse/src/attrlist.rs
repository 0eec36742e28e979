//! Parser for the bracketed `[...]` attribute-list syntax.
//!
//! The grammar extracts raw comma-separated slots (honoring quoting); slot
//! interpretation (style shorthand, positional offsets, named keys) happens
//! in plain Rust on top of that.

use crate::model::{
    Attribute, AttributeList, NamedAttribute, PositionalAttribute, QuoteKind, ShorthandAttribute,
    ShorthandOption, ShorthandRole,
};

/// The bracketed text was not a valid attribute list. The caller falls back
/// to treating the whole `[...]` run as literal text.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AttrListError {
    #[error("attribute list may not start with whitespace")]
    LeadingWhitespace,
    #[error("invalid attribute name: {0}")]
    InvalidName(String),
    #[error("unparseable attribute list")]
    Unparseable,
}

#[derive(Debug)]
struct RawSlot {
    text: String,
    quote: QuoteKind,
    /// Split at the first `=` of an unquoted slot: `Some((name, value, value_quote))`.
    named: Option<(String, String, QuoteKind)>,
}

peg::parser! {
    grammar slots_parser() for str {
        pub(super) rule slots() -> Vec<RawSlot>
            = s:(slot() ** ",") { s }

        rule slot() -> RawSlot
            = named_slot() / value_slot()

        rule named_slot() -> RawSlot
            = ws() name:$(name_start() name_char()* ("." name_char()+)?) ws() "=" ws() v:quoted_or_bare() ws() {
                RawSlot {
                    text: String::new(),
                    quote: QuoteKind::None,
                    named: Some((name.to_string(), v.0, v.1)),
                }
            }

        rule value_slot() -> RawSlot
            = ws() v:quoted_or_bare() ws() {
                RawSlot { text: v.0, quote: v.1, named: None }
            }

        rule quoted_or_bare() -> (String, QuoteKind)
            = v:double_quoted() { (v, QuoteKind::Double) }
            / v:single_quoted() { (v, QuoteKind::Single) }
            / v:bare() { (v, QuoteKind::None) }

        rule double_quoted() -> String
            = "\"" parts:(escaped_dquote() / plain_dquote())* "\"" { parts.concat() }

        rule escaped_dquote() -> String
            = "\\\"" { "\"".to_string() }

        rule plain_dquote() -> String
            = c:$([^ '"']) { c.to_string() }

        rule single_quoted() -> String
            = "'" parts:(escaped_squote() / plain_squote())* "'" { parts.concat() }

        rule escaped_squote() -> String
            = "\\'" { "'".to_string() }

        rule plain_squote() -> String
            = c:$([^ '\'']) { c.to_string() }

        rule bare() -> String
            = v:$([^ ',']*) { v.trim().to_string() }

        rule name_start() = ['a'..='z' | 'A'..='Z' | '_']
        rule name_char() = ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']

        rule ws() = quiet!{[' ' | '\t']*}
    }
}

fn valid_name(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    let mut seen_dot = false;
    for c in chars {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' => {}
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    true
}

/// Detect a bare slot that was clearly meant to be a named attribute but
/// carries an invalid key (e.g. `-foo=bar`). Per the grammar contract this
/// poisons the whole list.
fn invalid_named_attempt(slot: &RawSlot) -> Option<String> {
    if slot.named.is_some() || slot.quote != QuoteKind::None {
        return None;
    }
    let (lhs, _) = slot.text.split_once('=')?;
    let candidate = lhs.trim();
    if candidate.is_empty() || candidate.contains(char::is_whitespace) {
        return None;
    }
    if valid_name(candidate) {
        None
    } else {
        Some(candidate.to_string())
    }
}

/// Parse the first (style) slot's shorthand syntax:
/// `style#id.role1.role2%opt`. A bare token with no marker is just a style.
fn parse_shorthand(text: &str) -> ShorthandAttribute {
    let mut shorthand = ShorthandAttribute::default();
    let mut current = String::new();
    // '\0' marks the leading style segment
    let mut marker = '\0';

    let commit = |marker: char, segment: &str, shorthand: &mut ShorthandAttribute| {
        if segment.is_empty() {
            return;
        }
        match marker {
            '\0' => shorthand.style = Some(segment.to_string()),
            '#' => shorthand.id = Some(segment.to_string()),
            '.' => shorthand.roles.push(ShorthandRole(segment.to_string())),
            '%' => shorthand
                .options
                .push(ShorthandOption(segment.to_string())),
            _ => {}
        }
    };

    for c in text.chars() {
        if c == '#' || c == '.' || c == '%' {
            commit(marker, &current, &mut shorthand);
            current.clear();
            marker = c;
        } else {
            current.push(c);
        }
    }
    commit(marker, &current, &mut shorthand);
    shorthand
}

fn build(slots: Vec<RawSlot>, first_slot_is_style: bool) -> Result<AttributeList, AttrListError> {
    for slot in &slots {
        if let Some(candidate) = invalid_named_attempt(slot) {
            return Err(AttrListError::InvalidName(candidate));
        }
    }

    let mut list = AttributeList::new();
    let mut offset = 0;
    for (index, slot) in slots.into_iter().enumerate() {
        if let Some((name, value, quote)) = slot.named {
            list.push(Attribute::Named(NamedAttribute {
                name,
                value,
                quote_kind: quote,
            }));
            continue;
        }
        if index == 0 && first_slot_is_style && slot.quote == QuoteKind::None {
            // Style slot: consumes no positional offset.
            if !slot.text.is_empty() {
                let shorthand = parse_shorthand(&slot.text);
                if !shorthand.is_empty() {
                    list.push(Attribute::Shorthand(shorthand));
                }
            }
            continue;
        }
        offset += 1;
        list.push(Attribute::Positional(PositionalAttribute {
            offset,
            implied_name: None,
            value: slot.text,
        }));
    }
    Ok(list)
}

fn parse_slots(contents: &str) -> Result<Vec<RawSlot>, AttrListError> {
    if contents.starts_with(' ') || contents.starts_with('\t') {
        return Err(AttrListError::LeadingWhitespace);
    }
    slots_parser::slots(contents).map_err(|error| {
        tracing::debug!(?error, "attribute list did not parse");
        AttrListError::Unparseable
    })
}

/// Parse a block attribute line's bracket contents. The first unquoted slot
/// is the style slot and may carry `#id`/`.role`/`%option` shorthand;
/// positional offsets count the remaining slots from 1.
pub fn parse(contents: &str) -> Result<AttributeList, AttrListError> {
    build(parse_slots(contents)?, true)
}

/// Parse a macro's bracket contents (`image:...[alt,width]`): every unquoted
/// slot is positional, starting at offset 1.
pub fn parse_macro(contents: &str) -> Result<AttributeList, AttrListError> {
    if contents.is_empty() {
        return Ok(AttributeList::new());
    }
    build(parse_slots(contents)?, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_block_scenario() {
        let list = parse("quote, Famous Person, Famous Book (1999)").unwrap();
        assert_eq!(list.style(), Some("quote"));
        assert_eq!(list.positional(1), Some("Famous Person"));
        assert_eq!(list.positional(2), Some("Famous Book (1999)"));
    }

    #[test]
    fn test_leading_comma_elides_style_slot() {
        let list = parse(",ruby").unwrap();
        assert_eq!(list.style(), None);
        assert_eq!(list.positional(1), Some("ruby"));
    }

    #[test]
    fn test_leading_whitespace_rejected() {
        assert_eq!(parse(" quote"), Err(AttrListError::LeadingWhitespace));
    }

    #[test]
    fn test_shorthand_combinations() {
        let list = parse("source#main.wide.deep%collapsible,ruby").unwrap();
        assert_eq!(list.style(), Some("source"));
        assert_eq!(list.id(), Some("main"));
        assert_eq!(list.roles(), vec!["wide", "deep"]);
        assert!(list.has_option("collapsible"));
        assert_eq!(list.positional(1), Some("ruby"));
    }

    #[test]
    fn test_id_shorthand_without_style() {
        let list = parse("#anchor.role1").unwrap();
        assert_eq!(list.style(), None);
        assert_eq!(list.id(), Some("anchor"));
        assert_eq!(list.roles(), vec!["role1"]);
    }

    #[test]
    fn test_named_attributes_with_quoting() {
        let list = parse("cols=\"2*\", title='Single, with comma'").unwrap();
        assert_eq!(list.named("cols"), Some("2*"));
        assert_eq!(list.named("title"), Some("Single, with comma"));
    }

    #[test]
    fn test_dotted_second_segment_key() {
        let list = parse("foo.foo=bar").unwrap();
        assert_eq!(list.named("foo.foo"), Some("bar"));
    }

    #[test]
    fn test_invalid_key_poisons_whole_list() {
        assert_eq!(
            parse("quote,-foo=bar"),
            Err(AttrListError::InvalidName("-foo".to_string()))
        );
    }

    #[test]
    fn test_escaped_quote_inside_value() {
        let list = parse(r#"title="a \"quoted\" word""#).unwrap();
        assert_eq!(list.named("title"), Some(r#"a "quoted" word"#));
    }

    #[test]
    fn test_quoted_first_slot_is_positional_not_style() {
        let list = parse("\"not a style\"").unwrap();
        assert_eq!(list.style(), None);
        assert_eq!(list.positional(1), Some("not a style"));
    }

    #[test]
    fn test_macro_form_counts_all_slots() {
        let list = parse_macro("Alt text,640,480").unwrap();
        assert_eq!(list.positional(1), Some("Alt text"));
        assert_eq!(list.positional(2), Some("640"));
        assert_eq!(list.positional(3), Some("480"));
    }
}
