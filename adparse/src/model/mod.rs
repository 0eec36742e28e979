//! The data model for the parsed `AsciiDoc` document tree.

use std::str::FromStr;

use serde::Serialize;

use crate::attributes::AttributeStore;

mod attrlist;
mod substitution;

pub use attrlist::*;
pub use substitution::*;

/// The root of a parsed document: an ordered sequence of top-level elements
/// plus the attribute store that was built up while parsing them.
#[derive(Debug, Default, Serialize)]
pub struct Document {
    pub elements: Vec<Element>,
    pub attributes: AttributeStore,
}

/// The fence character class of a delimited block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterKind {
    /// `====`
    Example,
    /// `----`
    Listing,
    /// `....`
    Literal,
    /// `____`
    Quote,
    /// `****`
    Sidebar,
    /// `--`
    Open,
    /// `++++`
    Pass,
    /// `////`
    Comment,
    /// `|===`
    Table,
    /// markdown-style ```` ``` ```` fence
    Fence,
}

/// An opening or closing block fence: its character class and repeat count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Delimiter {
    pub kind: DelimiterKind,
    pub length: usize,
}

impl Delimiter {
    /// Recognize a line that consists entirely of a block fence.
    ///
    /// Repeated-character fences need at least four characters, except the
    /// open block (exactly `--`) and markdown fences (at least three
    /// backticks). `|===` is the table fence.
    #[must_use]
    pub fn detect(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line == "--" {
            return Some(Delimiter {
                kind: DelimiterKind::Open,
                length: 2,
            });
        }
        if let Some(rest) = line.strip_prefix('|') {
            if rest.len() >= 3 && rest.bytes().all(|b| b == b'=') {
                return Some(Delimiter {
                    kind: DelimiterKind::Table,
                    length: line.len(),
                });
            }
            return None;
        }
        let mut chars = line.chars();
        let first = chars.next()?;
        if !chars.all(|c| c == first) {
            return None;
        }
        let length = line.len();
        let kind = match first {
            '=' if length >= 4 => DelimiterKind::Example,
            '-' if length >= 4 => DelimiterKind::Listing,
            '.' if length >= 4 => DelimiterKind::Literal,
            '_' if length >= 4 => DelimiterKind::Quote,
            '*' if length >= 4 => DelimiterKind::Sidebar,
            '+' if length >= 4 => DelimiterKind::Pass,
            '/' if length >= 4 => DelimiterKind::Comment,
            '`' if length >= 3 => DelimiterKind::Fence,
            _ => return None,
        };
        Some(Delimiter { kind, length })
    }

    /// Fences whose body is taken verbatim. Directives and attribute entries
    /// inside these are never interpreted.
    #[must_use]
    pub fn shields_content(&self) -> bool {
        matches!(
            self.kind,
            DelimiterKind::Listing
                | DelimiterKind::Literal
                | DelimiterKind::Pass
                | DelimiterKind::Comment
                | DelimiterKind::Fence
        )
    }

    /// Whether a fence of this kind and `closing` length closes a block that
    /// was opened by `self`. Most kinds require an exact length match;
    /// markdown fences accept any closing fence at least as long as the
    /// opening one.
    #[must_use]
    pub fn closed_by(&self, kind: DelimiterKind, closing: usize) -> bool {
        if kind != self.kind {
            return false;
        }
        match self.kind {
            DelimiterKind::Fence => closing >= self.length,
            DelimiterKind::Example
            | DelimiterKind::Listing
            | DelimiterKind::Literal
            | DelimiterKind::Quote
            | DelimiterKind::Sidebar
            | DelimiterKind::Open
            | DelimiterKind::Pass
            | DelimiterKind::Comment
            | DelimiterKind::Table => closing == self.length,
        }
    }
}

/// Admonition paragraph/block variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmonitionKind {
    Note,
    Tip,
    Important,
    Caution,
    Warning,
}

impl FromStr for AdmonitionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOTE" | "note" => Ok(AdmonitionKind::Note),
            "TIP" | "tip" => Ok(AdmonitionKind::Tip),
            "IMPORTANT" | "important" => Ok(AdmonitionKind::Important),
            "CAUTION" | "caution" => Ok(AdmonitionKind::Caution),
            "WARNING" | "warning" => Ok(AdmonitionKind::Warning),
            _ => Err(()),
        }
    }
}

/// How a cross reference was written in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum XrefFormat {
    /// `<<id>>` / `<<id,label>>`
    Shorthand,
    /// `xref:id[label]`
    Macro,
}

/// A conditional preprocessor directive (`ifdef::`/`ifndef::`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConditionalDirective {
    pub names: Vec<String>,
    /// `true` for a comma-separated name list (any may match), `false` for a
    /// `+`-separated list (all must match).
    pub union_mode: bool,
    /// Content of the single-line form `ifdef::name[content]`.
    pub inline: Option<String>,
}

/// One row of a table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// One cell of a table row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableCell {
    pub format: CellFormat,
    pub body: Vec<Element>,
}

/// Per-cell content format, from the specifier character before the `|`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellFormat {
    #[default]
    Default,
    /// `a|` — cell content is recursively parsed as `AsciiDoc` blocks.
    AsciiDoc,
    /// `l|`
    Literal,
    /// `h|`
    Header,
    /// `e|`
    Emphasis,
    /// `m|`
    Monospace,
    /// `s|`
    Strong,
}

impl CellFormat {
    #[must_use]
    pub fn from_spec_char(c: char) -> Option<Self> {
        match c {
            'a' => Some(CellFormat::AsciiDoc),
            'l' => Some(CellFormat::Literal),
            'h' => Some(CellFormat::Header),
            'e' => Some(CellFormat::Emphasis),
            'm' => Some(CellFormat::Monospace),
            's' => Some(CellFormat::Strong),
            'd' => Some(CellFormat::Default),
            _ => None,
        }
    }
}

/// A structural or inline element of the document tree.
///
/// This is deliberately a closed sum type: block styles are resolved to a
/// concrete variant once, at assembly time, never through open-ended runtime
/// dispatch.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Element {
    /// A literal text run.
    String(String),
    /// A soft line break inside a paragraph.
    NewLine,
    /// A blank source line. Structurally significant: it terminates
    /// paragraphs and separates blocks, so it is never dropped.
    EmptyLine,
    /// A hard line break (trailing ` +`).
    LineBreak,
    /// A `'''` horizontal rule line.
    ThematicBreak,
    /// A `<<<` page break line.
    PageBreak,

    Bold {
        role: Option<String>,
        body: Vec<Element>,
    },
    Italic {
        role: Option<String>,
        body: Vec<Element>,
    },
    Monospace {
        role: Option<String>,
        body: Vec<Element>,
    },
    Highlight {
        role: Option<String>,
        body: Vec<Element>,
    },
    Subscript {
        body: Vec<Element>,
    },
    Superscript {
        body: Vec<Element>,
    },
    /// Inline content exempt from any further substitution passes.
    Passthrough {
        body: Vec<Element>,
    },

    Section {
        level: u8,
        title: Vec<Element>,
        attributes: AttributeList,
        body: Vec<Element>,
    },
    Paragraph {
        attributes: AttributeList,
        admonition: Option<AdmonitionKind>,
        body: Vec<Element>,
    },

    Listing {
        delimiter: Delimiter,
        attributes: AttributeList,
        /// Set when the block was promoted to a source block.
        language: Option<String>,
        lines: Vec<String>,
    },
    LiteralBlock {
        delimiter: Delimiter,
        attributes: AttributeList,
        lines: Vec<String>,
    },
    PassBlock {
        delimiter: Delimiter,
        attributes: AttributeList,
        lines: Vec<String>,
    },
    StemBlock {
        delimiter: Delimiter,
        attributes: AttributeList,
        lines: Vec<String>,
    },
    ExampleBlock {
        delimiter: Delimiter,
        attributes: AttributeList,
        body: Vec<Element>,
    },
    QuoteBlock {
        delimiter: Delimiter,
        attributes: AttributeList,
        body: Vec<Element>,
    },
    SidebarBlock {
        delimiter: Delimiter,
        attributes: AttributeList,
        body: Vec<Element>,
    },
    OpenBlock {
        delimiter: Delimiter,
        attributes: AttributeList,
        body: Vec<Element>,
    },

    OrderedListItem {
        marker: String,
        indent: usize,
        checked: Option<bool>,
        body: Vec<Element>,
    },
    UnorderedListItem {
        marker: String,
        indent: usize,
        checked: Option<bool>,
        body: Vec<Element>,
    },
    DescriptionListItem {
        term: String,
        delimiter: String,
        body: Vec<Element>,
    },

    Table {
        column_count: usize,
        attributes: AttributeList,
        rows: Vec<TableRow>,
    },

    AttributeEntry {
        name: String,
        value: Vec<Element>,
    },
    AttributeReset {
        name: String,
    },
    /// A `{name}` reference that could not be resolved (default
    /// `attribute-missing` behavior keeps it in the tree).
    UserAttributeReference {
        name: String,
    },
    /// A `{counter:name}` / `{counter2:name}` reference.
    Counter {
        name: String,
        initial_value: Option<String>,
        display: bool,
    },

    IfDef(ConditionalDirective),
    IfNDef(ConditionalDirective),
    EndIf {
        names: Vec<String>,
    },

    CrossReference {
        id: String,
        body: Option<String>,
        format: XrefFormat,
    },
    Anchor {
        id: String,
        label: Option<String>,
    },
    Link {
        scheme: String,
        path: String,
        attributes: AttributeList,
    },
    BlockImage {
        path: String,
        attributes: AttributeList,
    },
    InlineImage {
        path: String,
        attributes: AttributeList,
    },
    /// An `include::path[]` directive left in place because no include
    /// processor was registered.
    FileInclude {
        path: String,
        attributes: AttributeList,
    },

    SingleLineComment {
        content: String,
    },
    MultiLineComment {
        lines: Vec<String>,
    },
}

impl Element {
    /// Whether this element is pure spacing with no content of its own.
    #[must_use]
    pub fn is_spacing(&self) -> bool {
        matches!(self, Element::EmptyLine | Element::NewLine)
    }

    /// The nested body of this element, for elements that admit nested
    /// structure.
    #[must_use]
    #[allow(clippy::wildcard_enum_match_arm)]
    pub fn body(&self) -> Option<&[Element]> {
        match self {
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
            | Element::Highlight { body, .. }
            | Element::Subscript { body }
            | Element::Superscript { body }
            | Element::Passthrough { body } => Some(body),
            _ => None,
        }
    }
}
