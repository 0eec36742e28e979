//! The block-level assembler: a state machine over the preprocessed line
//! stream that produces the document tree.
//!
//! Assembly is flat-first: the line loop emits a flat element sequence with
//! section headings as markers, then [`section::build_tree`] folds the
//! sequence into nested sections, cross references are resolved against the
//! collected anchors, and finally any registered tree processors run.

// Byte offsets in this module come from `find`/`char_indices` over the
// string being sliced, so direct slicing stays on char boundaries.
#![allow(clippy::indexing_slicing)]

pub(crate) mod delimited;
pub(crate) mod list;
pub(crate) mod section;
pub(crate) mod table;

use std::str::FromStr;

use crate::{
    attributes::AttributeStore,
    attrlist,
    error::{Detail, Error, Position},
    model::{
        AdmonitionKind, AnchorAttribute, Attribute, AttributeList, Delimiter, DelimiterKind,
        Document, Element, PositionalAttribute, SubstitutionSet, TitleAttribute,
    },
    options::Options,
    preprocessor::{Preprocessor, attribute},
    substitute::{self, Context},
};

/// Metadata lines accumulated ahead of the block they will attach to:
/// attribute lists, anchors and a `.Title` line.
#[derive(Debug, Default)]
pub(crate) struct Pending {
    pub(crate) attributes: AttributeList,
    pub(crate) title: Option<String>,
}

impl Pending {
    fn take(&mut self) -> AttributeList {
        let mut attributes = std::mem::take(&mut self.attributes);
        if let Some(title) = self.title.take() {
            attributes.push(Attribute::Title(TitleAttribute { value: title }));
        }
        attributes
    }

    fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.title.is_none()
    }
}

/// Parse a complete source text into a document.
pub(crate) fn parse_document(source: &str, options: &Options) -> Result<Document, Error> {
    let assembler = Assembler::new(options);
    let lines = Preprocessor::process(source, options, &assembler.store)?;
    assembler.run(&lines)
}

pub(crate) struct Assembler<'a> {
    pub(crate) options: &'a Options,
    pub(crate) store: AttributeStore,
}

impl<'a> Assembler<'a> {
    pub(crate) fn new(options: &'a Options) -> Self {
        let mut store = AttributeStore::new(options.safe_mode);
        for (name, value) in &options.initial_attributes {
            match value {
                Some(value) => {
                    store.set(name, value.clone()).ok();
                }
                None => {
                    store.unset(name).ok();
                }
            }
            // API-supplied attributes take precedence over document entries.
            store.lock(name);
        }
        Assembler { options, store }
    }

    fn run(mut self, lines: &[String]) -> Result<Document, Error> {
        let flat = self.assemble(lines, 0)?;
        let elements = section::build_tree(flat);
        let mut document = Document {
            elements,
            attributes: self.store,
        };
        resolve_xrefs(&mut document);
        for processor in &self.options.tree_processors {
            processor.process(&mut document);
        }
        Ok(document)
    }

    /// The substitution context for inline content, honoring the
    /// `compat-mode` document attribute.
    pub(crate) fn ctx(&mut self) -> Context<'_> {
        let compat_mode = self.options.compat_mode || self.store.is_set("compat-mode");
        Context {
            store: &mut self.store,
            attribute_missing: self.options.attribute_missing,
            compat_mode,
        }
    }

    /// The main line loop. `base` is the zero-based offset of `lines[0]` in
    /// the overall stream, for error positions in recursive calls.
    pub(crate) fn assemble(&mut self, lines: &[String], base: usize) -> Result<Vec<Element>, Error> {
        let mut out = Vec::new();
        let mut pending = Pending::default();
        let mut last_level: Option<u8> = None;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].as_str();
            let line_number = base + i + 1;

            if line.is_empty() {
                out.push(Element::EmptyLine);
                i += 1;
                continue;
            }

            if let Some(content) = line.strip_prefix("//") {
                if !content.starts_with("//") {
                    out.push(Element::SingleLineComment {
                        content: content.trim_start().to_string(),
                    });
                    i += 1;
                    continue;
                }
            }

            if line == "'''" {
                out.push(Element::ThematicBreak);
                i += 1;
                continue;
            }
            if line == "<<<" {
                out.push(Element::PageBreak);
                i += 1;
                continue;
            }

            if let Some((delimiter, language)) = delimited::fence_open(line) {
                let (element, consumed) =
                    delimited::collect(self, &lines[i..], delimiter, language, &mut pending, line_number)?;
                out.push(element);
                i += consumed;
                continue;
            }

            if let Some((level, title)) = heading(line) {
                if let Some(last) = last_level {
                    if level > last + 1 {
                        return Err(Error::NestedSectionLevelMismatch(
                            Detail {
                                position: Position {
                                    line: line_number,
                                    column: 1,
                                },
                            },
                            last + 1,
                            level,
                        ));
                    }
                }
                last_level = Some(level);
                out.push(self.section_marker(level, title, &mut pending));
                i += 1;
                continue;
            }

            if line.starts_with(':') {
                if let Some(entry) = attribute::parse_line(line) {
                    out.push(self.attribute_entry(entry));
                    i += 1;
                    continue;
                }
            }

            if let Some(anchor) = anchor_line(line) {
                pending.attributes.push(Attribute::Anchor(anchor));
                i += 1;
                continue;
            }

            if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
                match attrlist::parse(&line[1..line.len() - 1]) {
                    Ok(list) => {
                        pending.attributes.extend_from(list);
                        i += 1;
                        continue;
                    }
                    Err(error) => {
                        // Malformed lists degrade to literal paragraph text.
                        tracing::warn!(line = line_number, %error, "malformed attribute list");
                    }
                }
            }

            if let Some(title) = title_line(line) {
                pending.title = Some(title.to_string());
                i += 1;
                continue;
            }

            if let Some(element) = self.block_macro(line, line_number, &mut pending)? {
                out.push(element);
                i += 1;
                continue;
            }

            if list::opens_list(line) {
                let (items, consumed) = list::collect(self, &lines[i..], base + i)?;
                out.extend(items);
                i += consumed;
                continue;
            }

            if line.starts_with('>') {
                let (element, consumed) = self.markdown_quote(&lines[i..], &mut pending);
                out.push(element);
                i += consumed;
                continue;
            }

            let (element, consumed) = self.paragraph(&lines[i..], &mut pending);
            if let Some(element) = element {
                out.push(element);
            }
            i += consumed;
        }

        if !pending.is_empty() {
            tracing::debug!("dangling block metadata at end of input");
        }
        Ok(out)
    }

    fn section_marker(&mut self, level: u8, title: &str, pending: &mut Pending) -> Element {
        // Anchors and id/style shorthand attach to the section itself; a
        // pending title or positional list is demoted to the first block
        // inside the section.
        let mut attributes = AttributeList::new();
        let rest: Vec<Attribute> = std::mem::take(&mut pending.attributes)
            .into_iter()
            .filter_map(|attribute| match attribute {
                Attribute::Anchor(_) | Attribute::Shorthand(_) => {
                    attributes.push(attribute);
                    None
                }
                Attribute::Named(ref named) if named.name == "id" => {
                    attributes.push(attribute);
                    None
                }
                other => Some(other),
            })
            .collect();
        for attribute in rest {
            pending.attributes.push(attribute);
        }

        // A pending block title above the heading claims the first block
        // inside the section, and above `= Title` it also demotes the
        // heading to an ordinary section title.
        if level == 0 && pending.title.is_none() {
            self.store.set("doctitle", title).ok();
        }
        let mut ctx = self.ctx();
        let title = substitute::substitute_text(title, &SubstitutionSet::normal(), &mut ctx);
        Element::Section {
            level,
            title,
            attributes,
            body: Vec::new(),
        }
    }

    fn attribute_entry(&mut self, entry: attribute::AttributeLine) -> Element {
        match entry {
            attribute::AttributeLine::Set { name, value } => {
                let value_elements = match &value {
                    Some(raw) => {
                        let expanded = substitute::expand_attribute_refs(raw, &self.store);
                        if self.store.set_from_document(&name, expanded.clone()).is_err() {
                            tracing::debug!(name, "document attribute entry ignored");
                        }
                        vec![Element::String(expanded)]
                    }
                    None => {
                        if self.store.set_from_document(&name, true).is_err() {
                            tracing::debug!(name, "document attribute entry ignored");
                        }
                        Vec::new()
                    }
                };
                Element::AttributeEntry {
                    name,
                    value: value_elements,
                }
            }
            attribute::AttributeLine::Unset { name } => {
                if self.store.unset(&name).is_err() {
                    tracing::debug!(name, "document attribute reset ignored");
                }
                Element::AttributeReset { name }
            }
        }
    }

    /// A block macro line (`name::target[attrs]`). A malformed name is the
    /// one fatal condition; an unknown (but well-formed) macro degrades to
    /// paragraph text.
    fn block_macro(
        &mut self,
        line: &str,
        line_number: usize,
        pending: &mut Pending,
    ) -> Result<Option<Element>, Error> {
        let Some((name, rest)) = line.split_once("::") else {
            return Ok(None);
        };
        if !line.ends_with(']') || name.is_empty() {
            return Ok(None);
        }
        let Some(open) = rest.find('[') else {
            return Ok(None);
        };
        let target = &rest[..open];
        if target.chars().any(char::is_whitespace) {
            return Ok(None);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::IllegalBlockMacroName(
                Detail {
                    position: Position {
                        line: line_number,
                        column: 1,
                    },
                },
                name.to_string(),
            ));
        }

        let Ok(mut attributes) = attrlist::parse_macro(&rest[open + 1..rest.len() - 1]) else {
            return Ok(None);
        };

        match name {
            "image" => {
                let titled = pending.title.is_some();
                attributes.extend_from(pending.take());
                if titled {
                    self.store.advance_counter("figure-number", Some("1"));
                }
                Ok(Some(Element::BlockImage {
                    path: target.to_string(),
                    attributes,
                }))
            }
            "include" => Ok(Some(Element::FileInclude {
                path: target.to_string(),
                attributes,
            })),
            _ => {
                tracing::warn!(name, line = line_number, "unknown block macro");
                Ok(None)
            }
        }
    }

    fn markdown_quote(&mut self, lines: &[String], pending: &mut Pending) -> (Element, usize) {
        let mut body_lines = Vec::new();
        let mut consumed = 0;
        for line in lines {
            if let Some(rest) = line.strip_prefix('>') {
                body_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            } else if !line.is_empty() && consumed > 0 {
                // Lazy continuation.
                body_lines.push(line.clone());
            } else {
                break;
            }
            consumed += 1;
        }
        let attributes = pending.take();
        let mut ctx = self.ctx();
        let body = substitute::substitute_lines(&body_lines, &SubstitutionSet::normal(), &mut ctx);
        (
            Element::QuoteBlock {
                delimiter: Delimiter {
                    kind: DelimiterKind::Quote,
                    length: 0,
                },
                attributes,
                body,
            },
            consumed,
        )
    }

    /// Collect a paragraph run, including its quoted-paragraph and
    /// admonition-prefix forms.
    fn paragraph(&mut self, lines: &[String], pending: &mut Pending) -> (Option<Element>, usize) {
        let mut consumed = 0;
        while consumed < lines.len() && !ends_paragraph(&lines[consumed], consumed) {
            consumed += 1;
        }
        let run = &lines[..consumed];

        if let Some((element, used)) = self.quoted_paragraph(run, pending) {
            return (Some(element), used);
        }

        let attributes = pending.take();
        let mut admonition = attributes
            .style()
            .and_then(|style| AdmonitionKind::from_str(style).ok());

        let mut body_lines: Vec<String> = run.to_vec();
        if admonition.is_none() {
            if let Some(first) = body_lines.first() {
                if let Some((prefix, rest)) = first.split_once(": ") {
                    if let Ok(kind) = AdmonitionKind::from_str(prefix) {
                        admonition = Some(kind);
                        body_lines[0] = rest.to_string();
                    }
                }
            }
        }

        let subs = match attributes.named("subs") {
            Some(spec) => SubstitutionSet::normal().modified_by(spec),
            None => SubstitutionSet::normal(),
        };
        let mut ctx = self.ctx();
        let body = substitute::substitute_lines(&body_lines, &subs, &mut ctx);
        if body.is_empty() && attributes.is_empty() && admonition.is_none() {
            // Every line was removed by drop-line; no construct remains.
            return (None, consumed);
        }
        (
            Some(Element::Paragraph {
                attributes,
                admonition,
                body,
            }),
            consumed,
        )
    }

    /// The `"..."` + `-- attribution` lexical form of a quote block.
    fn quoted_paragraph(
        &mut self,
        run: &[String],
        pending: &mut Pending,
    ) -> Option<(Element, usize)> {
        let first = run.first()?;
        if !first.starts_with('"') {
            return None;
        }
        let closing = run
            .iter()
            .enumerate()
            .position(|(index, line)| line.ends_with('"') && (index > 0 || line.len() > 1))?;
        let attribution = run.get(closing + 1)?.strip_prefix("-- ")?;

        let mut body_lines: Vec<String> = run[..=closing].to_vec();
        if let Some(line) = body_lines.first_mut() {
            line.remove(0);
        }
        if let Some(line) = body_lines.last_mut() {
            line.truncate(line.len() - 1);
        }

        let mut attributes = pending.take();
        for (index, part) in attribution.splitn(2, ", ").enumerate() {
            attributes.push(Attribute::Positional(PositionalAttribute {
                offset: index + 1,
                implied_name: Some(if index == 0 { "attribution" } else { "citetitle" }.to_string()),
                value: part.trim().to_string(),
            }));
        }

        let mut ctx = self.ctx();
        let body = substitute::substitute_lines(&body_lines, &SubstitutionSet::normal(), &mut ctx);
        Some((
            Element::QuoteBlock {
                delimiter: Delimiter {
                    kind: DelimiterKind::Quote,
                    length: 0,
                },
                attributes,
                body,
            },
            closing + 2,
        ))
    }
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let count = line.chars().take_while(|c| *c == '=').count();
    if count == 0 || count > 6 {
        return None;
    }
    let rest = line[count..].strip_prefix(' ')?;
    if rest.is_empty() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(((count - 1) as u8, rest))
}

fn title_line(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('.')?;
    let first = rest.chars().next()?;
    if first == '.' || first.is_whitespace() {
        return None;
    }
    Some(rest)
}

fn anchor_line(line: &str) -> Option<AnchorAttribute> {
    let inner = line.strip_prefix("[[")?.strip_suffix("]]")?;
    let (id, label) = match inner.split_once(',') {
        Some((id, label)) => (id, Some(label.trim().to_string())),
        None => (inner, None),
    };
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return None;
    }
    Some(AnchorAttribute {
        id: id.to_string(),
        label,
    })
}

/// Whether `line` terminates the paragraph being collected. The first line
/// of the run never terminates it.
fn ends_paragraph(line: &str, index: usize) -> bool {
    if index == 0 {
        return false;
    }
    line.is_empty()
        || Delimiter::detect(line).is_some()
        || delimited::fence_open(line).is_some()
        || heading(line).is_some()
        || (line.starts_with(':') && attribute::parse_line(line).is_some())
        || (line.starts_with('[') && line.ends_with(']'))
        || line.starts_with("//")
        || list::opens_list(line)
        || line.starts_with('>')
}

/// Second pass: fill in the body of bare cross references from the anchors
/// and section titles they point at.
fn resolve_xrefs(document: &mut Document) {
    let mut labels: Vec<(String, String)> = Vec::new();
    collect_labels(&document.elements, &mut labels);
    fill_xrefs(&mut document.elements, &labels);
}

#[allow(clippy::wildcard_enum_match_arm)]
fn collect_labels(elements: &[Element], labels: &mut Vec<(String, String)>) {
    for element in elements {
        match element {
            Element::Anchor {
                id,
                label: Some(label),
            } => labels.push((id.clone(), label.clone())),
            Element::Section {
                title, attributes, ..
            } => {
                if let Some(id) = attributes.id() {
                    let text: String = title
                        .iter()
                        .filter_map(|e| match e {
                            Element::String(s) => Some(s.as_str()),
                            _ => None,
                        })
                        .collect();
                    if !text.is_empty() {
                        labels.push((id.to_string(), text));
                    }
                }
            }
            _ => {}
        }
        if let Some(body) = element.body() {
            collect_labels(body, labels);
        }
    }
}

#[allow(clippy::wildcard_enum_match_arm)]
fn fill_xrefs(elements: &mut [Element], labels: &[(String, String)]) {
    for element in elements {
        match element {
            Element::CrossReference { id, body, .. } => {
                if body.is_none() {
                    *body = labels
                        .iter()
                        .find(|(anchor, _)| anchor == id)
                        .map(|(_, label)| label.clone());
                }
            }
            Element::Section { body, .. }
            | Element::Paragraph { body, .. }
            | Element::ExampleBlock { body, .. }
            | Element::QuoteBlock { body, .. }
            | Element::SidebarBlock { body, .. }
            | Element::OpenBlock { body, .. }
            | Element::OrderedListItem { body, .. }
            | Element::UnorderedListItem { body, .. }
            | Element::DescriptionListItem { body, .. }
            | Element::Bold { body, .. }
            | Element::Italic { body, .. }
            | Element::Monospace { body, .. }
            | Element::Highlight { body, .. } => fill_xrefs(body, labels),
            Element::Table { rows, .. } => {
                for row in rows {
                    for cell in &mut row.cells {
                        fill_xrefs(&mut cell.body, labels);
                    }
                }
            }
            _ => {}
        }
    }
}
