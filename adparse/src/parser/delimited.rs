//! Collection and construction of delimited blocks.

// Byte offsets in this module come from `find`/`char_indices` over the
// string being sliced, so direct slicing stays on char boundaries.
#![allow(clippy::indexing_slicing)]

use crate::{
    error::Error,
    model::{Delimiter, DelimiterKind, Element, SubstitutionSet, Substitution},
    substitute,
};

use super::{Assembler, Pending, table};

/// Recognize a line that opens a delimited block. Markdown fences may carry
/// a language after the backticks; everything else must be a bare fence.
pub(crate) fn fence_open(line: &str) -> Option<(Delimiter, Option<String>)> {
    if let Some(delimiter) = Delimiter::detect(line) {
        return Some((delimiter, None));
    }
    let ticks = line.chars().take_while(|c| *c == '`').count();
    if ticks >= 3 {
        let info = &line[ticks..];
        if !info.is_empty()
            && info
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+')
        {
            return Some((
                Delimiter {
                    kind: DelimiterKind::Fence,
                    length: ticks,
                },
                Some(info.to_string()),
            ));
        }
    }
    None
}

/// Collect the block opened by `open` at `lines[0]` and build its element.
/// Returns the element and the number of lines consumed, closing fence
/// included. An unterminated block closes implicitly at end of input.
pub(crate) fn collect(
    asm: &mut Assembler,
    lines: &[String],
    open: Delimiter,
    fence_language: Option<String>,
    pending: &mut Pending,
    line_number: usize,
) -> Result<(Element, usize), Error> {
    let mut end = None;
    for (index, line) in lines.iter().enumerate().skip(1) {
        if let Some(fence) = Delimiter::detect(line) {
            if open.closed_by(fence.kind, fence.length) {
                end = Some(index);
                break;
            }
        }
    }
    let (body, consumed) = match end {
        Some(index) => (&lines[1..index], index + 1),
        None => {
            tracing::warn!(
                line = line_number,
                kind = ?open.kind,
                "delimited block not closed before end of input"
            );
            (&lines[1..], lines.len())
        }
    };

    // A bare comment fence never consumes pending metadata; the metadata
    // still applies to whatever block follows the comment.
    if open.kind == DelimiterKind::Comment {
        return Ok((
            Element::MultiLineComment {
                lines: body.to_vec(),
            },
            consumed,
        ));
    }

    let attributes = pending.take();
    let style = attributes.style().map(str::to_string);
    let subs_spec = attributes.named("subs").map(str::to_string);

    if style.as_deref() == Some("comment") {
        return Ok((
            Element::MultiLineComment {
                lines: body.to_vec(),
            },
            consumed,
        ));
    }

    // A registered block processor claims its style outright.
    if let Some(style) = &style {
        if let Some(processor) = asm
            .options
            .block_processors
            .iter()
            .find(|p| p.style() == style)
        {
            let element = processor.process(&attributes, body);
            return Ok((element, consumed));
        }
    }

    let element = match open.kind {
        DelimiterKind::Listing | DelimiterKind::Fence => {
            let language = fence_language
                .or_else(|| source_language(asm, &attributes, style.as_deref()));
            asm.store.advance_counter("listing-number", Some("1"));
            Element::Listing {
                delimiter: open,
                attributes,
                language,
                lines: verbatim_lines(asm, body, subs_spec.as_deref()),
            }
        }
        DelimiterKind::Literal => Element::LiteralBlock {
            delimiter: open,
            attributes,
            lines: verbatim_lines(asm, body, subs_spec.as_deref()),
        },
        DelimiterKind::Pass => {
            let lines = verbatim_lines(asm, body, subs_spec.as_deref());
            if style.as_deref() == Some("stem") {
                Element::StemBlock {
                    delimiter: open,
                    attributes,
                    lines,
                }
            } else {
                Element::PassBlock {
                    delimiter: open,
                    attributes,
                    lines,
                }
            }
        }
        DelimiterKind::Example => {
            // Collapsible examples are excluded from the shared numbering.
            if !attributes.options().contains(&"collapsible") {
                asm.store.advance_counter("example-number", Some("1"));
            }
            Element::ExampleBlock {
                delimiter: open,
                attributes,
                body: asm.assemble(body, line_number)?,
            }
        }
        DelimiterKind::Quote => Element::QuoteBlock {
            delimiter: open,
            attributes,
            body: asm.assemble(body, line_number)?,
        },
        DelimiterKind::Sidebar => Element::SidebarBlock {
            delimiter: open,
            attributes,
            body: asm.assemble(body, line_number)?,
        },
        DelimiterKind::Open => Element::OpenBlock {
            delimiter: open,
            attributes,
            body: asm.assemble(body, line_number)?,
        },
        DelimiterKind::Table => {
            asm.store.advance_counter("table-number", Some("1"));
            table::parse(asm, attributes, body, line_number)?
        }
        // Comment was handled above.
        DelimiterKind::Comment => Element::MultiLineComment {
            lines: body.to_vec(),
        },
    };
    Ok((element, consumed))
}

/// The language of a listing promoted to a source block: an explicit
/// `source` style takes its language from positional 2 of the original
/// attribute list (offset 1 here, past the style slot); a bare second
/// positional with no style promotes likewise. An explicit non-source style
/// suppresses promotion.
fn source_language(asm: &Assembler, attributes: &crate::model::AttributeList, style: Option<&str>) -> Option<String> {
    let fallback = || {
        asm.options.source_language.clone().or_else(|| {
            asm.store
                .get("source-language")
                .map(|v| v.as_text().to_string())
        })
    };
    match style {
        Some("source") => attributes
            .positional(1)
            .map(str::to_string)
            .or_else(fallback),
        Some(_) => None,
        None => attributes.positional(1).map(str::to_string),
    }
}

/// Verbatim block content: raw lines, except that a `subs` attribute naming
/// the attributes pass gets `{name}` references expanded in place.
fn verbatim_lines(asm: &mut Assembler, body: &[String], subs: Option<&str>) -> Vec<String> {
    let set = match subs {
        Some(spec) => SubstitutionSet::verbatim().modified_by(spec),
        None => return body.to_vec(),
    };
    if set.contains(Substitution::Attributes) {
        body.iter()
            .map(|line| substitute::expand_attribute_refs(line, &asm.store))
            .collect()
    } else {
        body.to_vec()
    }
}
