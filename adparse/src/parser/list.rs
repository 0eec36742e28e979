//! List assembly: ordered, unordered and description lists, checklists, and
//! the `+` continuation that attaches whole blocks to an item.

// Byte offsets in this module come from `find`/`char_indices` over the
// string being sliced, so direct slicing stays on char boundaries.
#![allow(clippy::indexing_slicing)]

use crate::{
    error::Error,
    model::{Element, SubstitutionSet},
    substitute,
};

use super::Assembler;

#[derive(Debug, PartialEq, Eq)]
enum ItemKind {
    Unordered,
    Ordered,
    Description { term: String, delimiter: String },
}

#[derive(Debug)]
struct ItemStart {
    kind: ItemKind,
    marker: String,
    indent: usize,
    checked: Option<bool>,
    text: String,
}

pub(crate) fn opens_list(line: &str) -> bool {
    item_start(line).is_some()
}

fn item_start(line: &str) -> Option<ItemStart> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let rest = &line[indent..];

    if let Some(start) = bullet_item(rest, indent) {
        return Some(start);
    }
    description_item(rest, indent)
}

fn bullet_item(rest: &str, indent: usize) -> Option<ItemStart> {
    let (marker, kind) = match rest.chars().next()? {
        '*' => {
            let run = rest.chars().take_while(|c| *c == '*').count();
            if run > 5 {
                return None;
            }
            (rest[..run].to_string(), ItemKind::Unordered)
        }
        '-' => {
            if rest.chars().nth(1) == Some('-') {
                return None;
            }
            ("-".to_string(), ItemKind::Unordered)
        }
        '.' => {
            let run = rest.chars().take_while(|c| *c == '.').count();
            if run > 5 {
                return None;
            }
            (rest[..run].to_string(), ItemKind::Ordered)
        }
        c if c.is_ascii_digit() => {
            let digits = rest.chars().take_while(char::is_ascii_digit).count();
            if rest[digits..].starts_with('.') {
                (rest[..=digits].to_string(), ItemKind::Ordered)
            } else {
                return None;
            }
        }
        _ => return None,
    };
    let after = rest[marker.len()..].strip_prefix(' ')?;
    let (checked, text) = checklist(after);
    Some(ItemStart {
        kind,
        marker,
        indent,
        checked,
        text: text.to_string(),
    })
}

fn checklist(text: &str) -> (Option<bool>, &str) {
    if let Some(rest) = text.strip_prefix("[ ] ") {
        return (Some(false), rest);
    }
    if let Some(rest) = text.strip_prefix("[x] ").or_else(|| text.strip_prefix("[*] ")) {
        return (Some(true), rest);
    }
    (None, text)
}

fn description_item(rest: &str, indent: usize) -> Option<ItemStart> {
    let colon = rest.find("::")?;
    let term = &rest[..colon];
    if term.is_empty() || term.contains(':') {
        return None;
    }
    let run = rest[colon..].chars().take_while(|c| *c == ':').count();
    if run > 4 {
        return None;
    }
    let delimiter = rest[colon..colon + run].to_string();
    let after = &rest[colon + run..];
    let text = match after.strip_prefix(' ') {
        Some(text) => text,
        None if after.is_empty() => "",
        None => return None,
    };
    Some(ItemStart {
        kind: ItemKind::Description {
            term: term.to_string(),
            delimiter,
        },
        marker: String::new(),
        indent,
        checked: None,
        text: text.to_string(),
    })
}

/// Collect a whole list run starting at `lines[0]`. Returns the item
/// elements and the number of lines consumed.
pub(crate) fn collect(
    asm: &mut Assembler,
    lines: &[String],
    base: usize,
) -> Result<(Vec<Element>, usize), Error> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].as_str();

        if line.is_empty() {
            // A blank line ends the list unless another item follows it
            // directly.
            match lines.get(i + 1) {
                Some(next) if item_start(next).is_some() => {
                    i += 1;
                    continue;
                }
                Some(_) | None => break,
            }
        }

        let Some(start) = item_start(line) else {
            break;
        };
        i += 1;

        // Lazy continuation lines belong to the item's text.
        let mut text_lines = vec![start.text.clone()];
        while i < lines.len()
            && !lines[i].is_empty()
            && lines[i] != "+"
            && item_start(&lines[i]).is_none()
        {
            text_lines.push(lines[i].trim_start().to_string());
            i += 1;
        }

        let mut ctx = asm.ctx();
        let mut body = substitute::substitute_lines(&text_lines, &SubstitutionSet::normal(), &mut ctx);

        // `+` attaches the following block to this item.
        while i < lines.len() && lines[i] == "+" {
            i += 1;
            let attached = attached_block(&lines[i..]);
            body.extend(asm.assemble(&lines[i..i + attached], base + i)?);
            i += attached;
        }

        out.push(match start.kind {
            ItemKind::Unordered => Element::UnorderedListItem {
                marker: start.marker,
                indent: start.indent,
                checked: start.checked,
                body,
            },
            ItemKind::Ordered => Element::OrderedListItem {
                marker: start.marker,
                indent: start.indent,
                checked: start.checked,
                body,
            },
            ItemKind::Description { term, delimiter } => Element::DescriptionListItem {
                term,
                delimiter,
                body,
            },
        });
    }

    Ok((out, i))
}

/// How many lines the block attached by a `+` continuation spans: a fenced
/// block runs to its closing fence, anything else to the next blank line or
/// item start.
fn attached_block(lines: &[String]) -> usize {
    let Some(first) = lines.first() else {
        return 0;
    };
    if let Some((open, _)) = super::delimited::fence_open(first) {
        for (index, line) in lines.iter().enumerate().skip(1) {
            if let Some(fence) = crate::model::Delimiter::detect(line) {
                if open.closed_by(fence.kind, fence.length) {
                    return index + 1;
                }
            }
        }
        return lines.len();
    }
    lines
        .iter()
        .position(|line| line.is_empty() || line == "+" || item_start(line).is_some())
        .unwrap_or(lines.len())
}
