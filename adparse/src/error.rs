use std::fmt;

use serde::{Deserialize, Serialize};

/// A position in the source text, 1-indexed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line: {}, column: {}", self.line, self.column)
    }
}

/// Position detail attached to structural errors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub position: Position,
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.position)
    }
}

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("parsing error: {0}")]
    Parse(String),

    #[error("section level mismatch: {1} (expected at most '{2}'), position: {0}")]
    NestedSectionLevelMismatch(Detail, u8, u8),

    #[error("illegal block macro name: {1}, position: {0}")]
    IllegalBlockMacroName(Detail, String),

    #[error("invalid conditional directive, position: {0}")]
    InvalidConditionalDirective(Detail),

    #[error("ifeval operands have mismatched types, position: {0}")]
    IfEvalMismatchedTypes(Detail),

    #[error("invalid column specification: {1}, position: {0}")]
    InvalidColumnSpec(Detail, String),

    #[error("csv error in table: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Extract the source position from this error if it carries one.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::NestedSectionLevelMismatch(detail, ..)
            | Self::IllegalBlockMacroName(detail, ..)
            | Self::InvalidConditionalDirective(detail)
            | Self::IfEvalMismatchedTypes(detail)
            | Self::InvalidColumnSpec(detail, ..) => Some(detail.position),
            Self::Parse(_) | Self::Csv(_) => None,
        }
    }

    /// Advice for resolving this error, where we have something useful to say.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::NestedSectionLevelMismatch(..) => Some(
                "Section levels must increment by at most 1. For example, level 2 (==) cannot be followed directly by level 4 (====)",
            ),
            Self::IfEvalMismatchedTypes(..) => Some(
                "ifeval expressions must compare values of the same type (both numbers or both strings)",
            ),
            Self::IllegalBlockMacroName(..) => {
                Some("Block macro names may only contain letters, digits, hyphens and underscores")
            }
            Self::Parse(_)
            | Self::InvalidConditionalDirective(_)
            | Self::InvalidColumnSpec(..)
            | Self::Csv(_) => None,
        }
    }
}

/// Error returned when trying to mutate a locked attribute.
///
/// Callers are expected to swallow this: a locked write is a no-op, never a
/// parse failure.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("attribute '{name}' is locked")]
pub struct Locked {
    pub name: String,
}
