//! An `AsciiDoc` parser that turns markup text into a strongly-typed
//! document tree.
//!
//! Parsing runs in two stages. The preprocessor resolves conditional
//! directives (`ifdef`/`ifndef`/`ifeval`), includes and line continuations,
//! producing a flat line stream. The assembler then builds the block tree
//! from that stream (sections, delimited blocks, lists, tables) and runs the
//! inline substitution pipeline over textual content: attribute references,
//! quoted formatting, character replacements, macros and passthroughs.
//!
//! ```
//! use adparse::Element;
//!
//! let document = adparse::parse(":name: world\n\n== Hello\n")?;
//! assert!(matches!(document.elements[0], Element::AttributeEntry { .. }));
//! # Ok::<(), adparse::Error>(())
//! ```

use tracing::instrument;

mod attributes;
mod attrlist;
mod error;
mod extensions;
mod model;
mod options;
mod parser;
mod preprocessor;
#[cfg(test)]
mod proptests;
mod safe_mode;
mod substitute;

pub use attributes::{AttributeStore, AttributeValue, CounterValue};
pub use attrlist::AttrListError;
pub use error::{Detail as ErrorDetail, Error, Locked, Position};
pub use extensions::{BlockProcessor, IncludeProcessor, TreeProcessor};
pub use model::{
    AdmonitionKind, AnchorAttribute, Attribute, AttributeList, CellFormat, ConditionalDirective,
    Delimiter, DelimiterKind, Document, Element, NamedAttribute, PositionalAttribute, QuoteKind,
    ShorthandAttribute, ShorthandOption, ShorthandRole, Substitution, SubstitutionSet, TableCell,
    TableRow, TitleAttribute, XrefFormat,
};
pub use options::{AttributeMissing, AttributeUndefined, Options, OptionsBuilder};
pub use safe_mode::SafeMode;

/// Parse a complete source text with default options.
///
/// # Errors
///
/// Returns an error for structural problems the tree cannot represent, such
/// as a section nested more than one level deeper than its parent or a
/// malformed conditional directive. Recoverable problems (an unterminated
/// block, a stray `endif`) degrade with a warning instead.
#[instrument(skip(source))]
pub fn parse(source: &str) -> Result<Document, Error> {
    parser::parse_document(source, &Options::default())
}

/// Parse a complete source text.
///
/// # Errors
///
/// As [`parse`].
#[instrument(skip(source, options))]
pub fn parse_with_options(source: &str, options: &Options) -> Result<Document, Error> {
    parser::parse_document(source, options)
}
