//! Extension points implemented by external collaborators.
//!
//! The core only calls these at fixed, well-defined points; it never
//! implements the extensions themselves.

use std::fmt::Debug;

use crate::model::{AttributeList, Document, Element};

/// Post-parse whole-tree rewrite, invoked once after the full document has
/// been assembled.
pub trait TreeProcessor: Debug + Send + Sync {
    fn process(&self, document: &mut Document);
}

/// Resolves `include::path[attrs]` directives into lines.
///
/// Returning `None` declines the include; the directive is then left in the
/// tree as a literal [`Element::FileInclude`].
pub trait IncludeProcessor: Debug + Send + Sync {
    fn resolve(&self, path: &str, attributes: &AttributeList) -> Option<Vec<String>>;
}

/// Produces an element for a custom block style, invoked at block-recognition
/// time. The returned element is accepted verbatim.
pub trait BlockProcessor: Debug + Send + Sync {
    /// The block style this processor claims.
    fn style(&self) -> &str;

    fn process(&self, attributes: &AttributeList, body: &[String]) -> Element;
}
