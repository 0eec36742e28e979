//! Table assembly: `cols=` column specifications, psv cell splitting with
//! per-cell format specifiers, `format=csv` bodies, and recursive parsing of
//! `a|` cells.

// Byte offsets in this module come from `find`/`char_indices` over the
// string being sliced, so direct slicing stays on char boundaries.
#![allow(clippy::indexing_slicing)]

use crate::{
    error::{Detail, Error, Position},
    model::{AttributeList, CellFormat, Element, SubstitutionSet, TableCell, TableRow},
    substitute,
};

use super::Assembler;

pub(crate) fn parse(
    asm: &mut Assembler,
    attributes: AttributeList,
    body: &[String],
    line_number: usize,
) -> Result<Element, Error> {
    let columns = match attributes.named("cols") {
        Some(spec) => Some(column_formats(spec, line_number)?),
        None => None,
    };

    let raw_cells = if attributes.named("format") == Some("csv") {
        csv_cells(body)?
    } else {
        psv_cells(body)
    };

    let column_count = columns
        .as_ref()
        .map(Vec::len)
        .or_else(|| first_row_width(body))
        .unwrap_or_else(|| raw_cells.len().max(1));

    let mut rows = Vec::new();
    for chunk in raw_cells.chunks(column_count.max(1)) {
        let mut cells = Vec::new();
        for (index, raw) in chunk.iter().enumerate() {
            let format = match raw.format {
                Some(explicit) => explicit,
                None => columns
                    .as_ref()
                    .and_then(|formats| formats.get(index).copied())
                    .unwrap_or_default(),
            };
            cells.push(TableCell {
                format,
                body: cell_body(asm, format, &raw.content, line_number)?,
            });
        }
        rows.push(TableRow { cells });
    }

    Ok(Element::Table {
        column_count,
        attributes,
        rows,
    })
}

/// Parse a `cols=` specification into per-column default formats. Width
/// digits and alignment markers are accepted and ignored; only the format
/// character matters to the tree.
fn column_formats(spec: &str, line_number: usize) -> Result<Vec<CellFormat>, Error> {
    let invalid = || {
        Error::InvalidColumnSpec(
            Detail {
                position: Position {
                    line: line_number,
                    column: 1,
                },
            },
            spec.to_string(),
        )
    };

    let mut out = Vec::new();
    for entry in spec.split(',') {
        let entry = entry.trim();
        let (repeat, rest) = match entry.find('*') {
            Some(star) => {
                let count: usize = entry[..star].parse().map_err(|_| invalid())?;
                (count, &entry[star + 1..])
            }
            None => (1, entry),
        };
        let format = entry_format(rest).ok_or_else(invalid)?;
        for _ in 0..repeat {
            out.push(format);
        }
    }
    if out.is_empty() {
        return Err(invalid());
    }
    Ok(out)
}

fn entry_format(entry: &str) -> Option<CellFormat> {
    let mut format = None;
    for c in entry.chars() {
        match c {
            '<' | '^' | '>' | '.' => {}
            c if c.is_ascii_digit() => {}
            c => {
                if format.is_some() {
                    return None;
                }
                format = Some(CellFormat::from_spec_char(c)?);
            }
        }
    }
    Some(format.unwrap_or_default())
}

/// A cell as split out of the body, before column defaults are applied.
#[derive(Debug)]
struct RawCell {
    format: Option<CellFormat>,
    content: String,
}

impl RawCell {
    fn append(&mut self, piece: &str) {
        let piece = piece.trim();
        if piece.is_empty() && self.content.is_empty() {
            return;
        }
        if !self.content.is_empty() {
            self.content.push('\n');
        }
        self.content.push_str(piece);
    }
}

/// Split psv body lines into cells. A `|` opens a cell; a format specifier
/// character directly before the `|` (at segment start or after whitespace)
/// styles it. Lines without a `|` continue the previous cell, which is how
/// `a|` cells carry nested block content. `\|` is a literal bar.
fn psv_cells(body: &[String]) -> Vec<RawCell> {
    let mut cells: Vec<RawCell> = Vec::new();

    for line in body {
        if line.is_empty() {
            continue;
        }
        let mut found_bar = false;
        let mut segment = String::new();
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'|') => {
                    chars.next();
                    segment.push('|');
                }
                '|' => {
                    let (text, format) = split_spec(&segment);
                    if !text.trim().is_empty() {
                        if let Some(last) = cells.last_mut() {
                            last.append(text);
                        }
                    }
                    cells.push(RawCell {
                        format,
                        content: String::new(),
                    });
                    segment.clear();
                    found_bar = true;
                }
                c => segment.push(c),
            }
        }
        if let Some(last) = cells.last_mut() {
            if found_bar || !segment.trim().is_empty() {
                last.append(&segment);
            }
        }
    }
    cells
}

/// Peel a trailing format specifier off the text preceding a `|`. The
/// specifier must stand alone: segment start or preceded by whitespace.
fn split_spec(segment: &str) -> (&str, Option<CellFormat>) {
    let mut chars = segment.chars();
    let Some(last) = chars.next_back() else {
        return (segment, None);
    };
    let Some(format) = CellFormat::from_spec_char(last) else {
        return (segment, None);
    };
    let head = chars.as_str();
    if head.is_empty() || head.ends_with(char::is_whitespace) {
        (head, Some(format))
    } else {
        (segment, None)
    }
}

fn csv_cells(body: &[String]) -> Result<Vec<RawCell>, Error> {
    let joined = body.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(joined.as_bytes());

    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record?;
        for field in record.iter() {
            cells.push(RawCell {
                format: None,
                content: field.trim().to_string(),
            });
        }
    }
    Ok(cells)
}

/// Cell count of the first psv body line, which fixes the column count when
/// no `cols=` is given.
fn first_row_width(body: &[String]) -> Option<usize> {
    let first = body.iter().find(|line| !line.is_empty())?;
    let mut count = 0;
    let mut previous = None;
    for c in first.chars() {
        if c == '|' && previous != Some('\\') {
            count += 1;
        }
        previous = Some(c);
    }
    (count > 0).then_some(count)
}

fn cell_body(
    asm: &mut Assembler,
    format: CellFormat,
    content: &str,
    line_number: usize,
) -> Result<Vec<Element>, Error> {
    if content.is_empty() {
        return Ok(Vec::new());
    }
    match format {
        CellFormat::AsciiDoc => {
            // Nested blocks get their own attribute scope; counters carry in
            // but advances do not leak back out.
            let mut inner = Assembler {
                options: asm.options,
                store: asm.store.child(),
            };
            let lines: Vec<String> = content.lines().map(str::to_string).collect();
            inner.assemble(&lines, line_number)
        }
        CellFormat::Literal => Ok(vec![Element::String(content.to_string())]),
        CellFormat::Default
        | CellFormat::Header
        | CellFormat::Emphasis
        | CellFormat::Monospace
        | CellFormat::Strong => {
            let lines: Vec<String> = content.lines().map(str::to_string).collect();
            let mut ctx = asm.ctx();
            Ok(substitute::substitute_lines(
                &lines,
                &SubstitutionSet::normal(),
                &mut ctx,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::Options;

    use super::*;

    fn lines(source: &[&str]) -> Vec<String> {
        source.iter().map(|s| (*s).to_string()).collect()
    }

    fn table(attributes: AttributeList, body: &[&str]) -> Element {
        let options = Options::default();
        let mut asm = Assembler::new(&options);
        parse(&mut asm, attributes, &lines(body), 1).unwrap()
    }

    fn cols_attribute(spec: &str) -> AttributeList {
        let mut attributes = AttributeList::new();
        attributes.push(crate::model::Attribute::Named(
            crate::model::NamedAttribute {
                name: "cols".to_string(),
                value: spec.to_string(),
                quote_kind: crate::model::QuoteKind::Double,
            },
        ));
        attributes
    }

    #[test]
    fn test_column_formats_multiplier() {
        let formats = column_formats("2*", 1).unwrap();
        assert_eq!(formats, vec![CellFormat::Default, CellFormat::Default]);
    }

    #[test]
    fn test_column_formats_mixed() {
        let formats = column_formats("1a, 2m, 3", 1).unwrap();
        assert_eq!(
            formats,
            vec![CellFormat::AsciiDoc, CellFormat::Monospace, CellFormat::Default]
        );
    }

    #[test]
    fn test_column_formats_rejects_garbage() {
        let error = column_formats("2*zz", 7).unwrap_err();
        let Error::InvalidColumnSpec(detail, spec) = error else {
            panic!("expected column spec error");
        };
        assert_eq!(detail.position.line, 7);
        assert_eq!(spec, "2*zz");
    }

    #[test]
    fn test_single_row_psv() {
        let element = table(AttributeList::new(), &["|one |two"]);
        let Element::Table { column_count, rows, .. } = &element else {
            panic!("expected table");
        };
        assert_eq!(*column_count, 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells[0].body, vec![Element::String("one".to_string())]);
        assert_eq!(rows[0].cells[1].body, vec![Element::String("two".to_string())]);
    }

    #[test]
    fn test_rows_wrap_at_column_count() {
        let element = table(cols_attribute("2*"), &["|a |b", "|c |d"]);
        let Element::Table { rows, .. } = &element else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cells[0].body, vec![Element::String("c".to_string())]);
    }

    #[test]
    fn test_asciidoc_cell_parses_blocks() {
        let element = table(
            cols_attribute("2*"),
            &[
                "a|",
                ".Title for Bar",
                "image::bar.jpg[]",
                "|.Title for Baz",
                "image::baz.jpg[]",
            ],
        );
        let Element::Table { rows, .. } = &element else {
            panic!("expected table");
        };
        let first = &rows[0].cells[0];
        assert_eq!(first.format, CellFormat::AsciiDoc);
        assert!(
            first
                .body
                .iter()
                .any(|element| matches!(element, Element::BlockImage { .. })),
            "asciidoc cell should contain a parsed block image: {:?}",
            first.body
        );
        let second = &rows[0].cells[1];
        assert_eq!(second.format, CellFormat::Default);
        assert!(
            second
                .body
                .iter()
                .all(|element| !matches!(element, Element::BlockImage { .. })),
            "default cell must stay literal: {:?}",
            second.body
        );
    }

    #[test]
    fn test_explicit_spec_overrides_column_format() {
        let element = table(cols_attribute("2*m"), &["|mono l|raw"]);
        let Element::Table { rows, .. } = &element else {
            panic!("expected table");
        };
        assert_eq!(rows[0].cells[0].format, CellFormat::Monospace);
        assert_eq!(rows[0].cells[1].format, CellFormat::Literal);
    }

    #[test]
    fn test_escaped_bar_is_literal() {
        let element = table(AttributeList::new(), &["|a\\|b |c"]);
        let Element::Table { column_count, rows, .. } = &element else {
            panic!("expected table");
        };
        assert_eq!(*column_count, 2);
        assert_eq!(rows[0].cells[0].body, vec![Element::String("a|b".to_string())]);
    }

    #[test]
    fn test_csv_format() {
        let mut attributes = AttributeList::new();
        attributes.push(crate::model::Attribute::Named(
            crate::model::NamedAttribute {
                name: "format".to_string(),
                value: "csv".to_string(),
                quote_kind: crate::model::QuoteKind::None,
            },
        ));
        attributes.push(crate::model::Attribute::Named(
            crate::model::NamedAttribute {
                name: "cols".to_string(),
                value: "3*".to_string(),
                quote_kind: crate::model::QuoteKind::Double,
            },
        ));
        let element = table(attributes, &["a,b,c", "d,e,f"]);
        let Element::Table { column_count, rows, .. } = &element else {
            panic!("expected table");
        };
        assert_eq!(*column_count, 3);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cells[2].body, vec![Element::String("f".to_string())]);
    }
}
