//! Typed counter sequences backing `{counter:...}` references.

use serde::Serialize;

/// The current value of a counter sequence.
///
/// The seed decides the type: numeric seeds advance arithmetically, a single
/// ASCII letter advances through its alphabet, and anything else (multibyte
/// text, emoji, multi-character strings) is opaque and re-emitted unchanged
/// on every advance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CounterValue {
    Numeric { value: i64, step: i64 },
    Alpha(char),
    Opaque(String),
}

impl CounterValue {
    /// Build the initial value from a seed string. `None` or empty defaults
    /// to numeric `0`. A seed of the form `N:S` sets an explicit step.
    #[must_use]
    pub fn from_seed(seed: Option<&str>) -> Self {
        let seed = seed.unwrap_or("").trim();
        if seed.is_empty() {
            return CounterValue::Numeric { value: 0, step: 1 };
        }
        if let Some((start, step)) = seed.split_once(':') {
            if let (Ok(value), Ok(step)) = (start.trim().parse(), step.trim().parse()) {
                return CounterValue::Numeric { value, step };
            }
        }
        if let Ok(value) = seed.parse::<i64>() {
            return CounterValue::Numeric { value, step: 1 };
        }
        let mut chars = seed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => CounterValue::Alpha(c),
            _ => CounterValue::Opaque(seed.to_string()),
        }
    }

    /// Advance the sequence by one position.
    pub fn advance(&mut self) {
        match self {
            CounterValue::Numeric { value, step } => *value = value.wrapping_add(*step),
            CounterValue::Alpha(c) => {
                // Wrap within the case that is advancing.
                *c = match *c {
                    'z' => 'a',
                    'Z' => 'A',
                    other => char::from_u32(other as u32 + 1).unwrap_or(other),
                };
            }
            CounterValue::Opaque(_) => {}
        }
    }

    /// The text emitted when this counter is referenced.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            CounterValue::Numeric { value, .. } => value.to_string(),
            CounterValue::Alpha(c) => c.to_string(),
            CounterValue::Opaque(s) => s.clone(),
        }
    }
}
