use std::sync::Arc;

use crate::attributes::AttributeValue;
use crate::extensions::{BlockProcessor, IncludeProcessor, TreeProcessor};
use crate::safe_mode::SafeMode;

/// Behavior for an unresolvable `{name}` reference, controlled by the
/// `attribute-missing` attribute or the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttributeMissing {
    /// Keep the reference text in place.
    #[default]
    Skip,
    /// Remove just the reference.
    Drop,
    /// Remove the whole source line containing the reference.
    DropLine,
}

impl AttributeMissing {
    #[must_use]
    pub fn from_attribute(value: &str) -> Self {
        match value {
            "drop" => AttributeMissing::Drop,
            "drop-line" => AttributeMissing::DropLine,
            _ => AttributeMissing::Skip,
        }
    }
}

/// Behavior for a reference to an explicitly unset attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttributeUndefined {
    #[default]
    Drop,
}

/// Parser configuration.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Options {
    pub safe_mode: SafeMode,
    pub attribute_missing: AttributeMissing,
    pub attribute_undefined: AttributeUndefined,
    pub compat_mode: bool,
    /// Default language applied when a listing is promoted to a source block
    /// without an explicit language.
    pub source_language: Option<String>,
    /// Attributes supplied through the API. `Some(value)` sets and locks the
    /// attribute against document-level overrides (subject to safe mode);
    /// `None` unsets and locks it.
    pub initial_attributes: Vec<(String, Option<AttributeValue>)>,
    pub tree_processors: Vec<Arc<dyn TreeProcessor>>,
    pub include_processor: Option<Arc<dyn IncludeProcessor>>,
    pub block_processors: Vec<Arc<dyn BlockProcessor>>,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use adparse::{Options, SafeMode};
    ///
    /// let options = Options::builder()
    ///     .with_safe_mode(SafeMode::Safe)
    ///     .with_attribute("toc", "left")
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }
}

/// Builder for [`Options`].
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: SafeMode) -> Self {
        self.options.safe_mode = safe_mode;
        self
    }

    #[must_use]
    pub fn with_attribute_missing(mut self, attribute_missing: AttributeMissing) -> Self {
        self.options.attribute_missing = attribute_missing;
        self
    }

    #[must_use]
    pub fn with_compat_mode(mut self) -> Self {
        self.options.compat_mode = true;
        self
    }

    #[must_use]
    pub fn with_source_language(mut self, language: impl Into<String>) -> Self {
        self.options.source_language = Some(language.into());
        self
    }

    /// Set an attribute from the API. API-supplied values take precedence
    /// over document-level entries for the same name.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.options
            .initial_attributes
            .push((name.into(), Some(value.into())));
        self
    }

    /// Unset an attribute from the API and lock it against the document.
    #[must_use]
    pub fn without_attribute(mut self, name: impl Into<String>) -> Self {
        self.options.initial_attributes.push((name.into(), None));
        self
    }

    #[must_use]
    pub fn with_tree_processor(mut self, processor: Arc<dyn TreeProcessor>) -> Self {
        self.options.tree_processors.push(processor);
        self
    }

    #[must_use]
    pub fn with_include_processor(mut self, processor: Arc<dyn IncludeProcessor>) -> Self {
        self.options.include_processor = Some(processor);
        self
    }

    #[must_use]
    pub fn with_block_processor(mut self, processor: Arc<dyn BlockProcessor>) -> Self {
        self.options.block_processors.push(processor);
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        self.options
    }
}
