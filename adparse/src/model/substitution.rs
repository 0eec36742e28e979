//! Substitution passes and the ordered sets they form.

use serde::Serialize;

/// One substitution pass applied to a run of inline content.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Substitution {
    SpecialCharacters,
    Quotes,
    Attributes,
    Replacements,
    Macros,
    PostReplacements,
    Callouts,
}

impl Substitution {
    /// Parse one substitution name or its single-letter alias. Group names
    /// (`normal`, `verbatim`, `none`) are handled at the set level, not here.
    fn from_name(value: &str) -> Option<Self> {
        match value {
            "specialcharacters" | "specialchars" | "c" => Some(Substitution::SpecialCharacters),
            "quotes" | "q" => Some(Substitution::Quotes),
            "attributes" | "a" => Some(Substitution::Attributes),
            "replacements" | "r" => Some(Substitution::Replacements),
            "macros" | "m" => Some(Substitution::Macros),
            "post_replacements" | "post replacements" | "p" => Some(Substitution::PostReplacements),
            "callouts" => Some(Substitution::Callouts),
            _ => None,
        }
    }
}

/// The passes applied to normal prose, in order.
pub const NORMAL: &[Substitution] = &[
    Substitution::SpecialCharacters,
    Substitution::Attributes,
    Substitution::Quotes,
    Substitution::Replacements,
    Substitution::Macros,
    Substitution::PostReplacements,
];

/// The passes applied to verbatim content (listing/literal blocks).
pub const VERBATIM: &[Substitution] = &[Substitution::SpecialCharacters, Substitution::Callouts];

/// The passes applied to attribute entry values and document header lines.
pub const HEADER: &[Substitution] = &[Substitution::SpecialCharacters, Substitution::Attributes];

/// An ordered set of substitution passes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubstitutionSet(Vec<Substitution>);

impl SubstitutionSet {
    #[must_use]
    pub fn none() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn normal() -> Self {
        Self(NORMAL.to_vec())
    }

    #[must_use]
    pub fn verbatim() -> Self {
        Self(VERBATIM.to_vec())
    }

    #[must_use]
    pub fn header() -> Self {
        Self(HEADER.to_vec())
    }

    #[must_use]
    pub fn contains(&self, substitution: Substitution) -> bool {
        self.0.contains(&substitution)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Substitution> + '_ {
        self.0.iter().copied()
    }

    fn insert_sorted(&mut self, substitution: Substitution) {
        if self.contains(substitution) {
            return;
        }
        // Keep the canonical pass order regardless of how the set was built up.
        let rank = |s: Substitution| NORMAL.iter().position(|n| *n == s).unwrap_or(NORMAL.len());
        let at = self
            .0
            .iter()
            .position(|s| rank(*s) > rank(substitution))
            .unwrap_or(self.0.len());
        self.0.insert(at, substitution);
    }

    fn remove(&mut self, substitution: Substitution) {
        self.0.retain(|s| *s != substitution);
    }

    /// Apply a `subs` attribute value on top of this block's default set.
    ///
    /// Supports absolute (`subs=quotes`), additive (`subs=+quotes`,
    /// `subs=quotes+`) and subtractive (`subs=-quotes`) forms, applied left to
    /// right. An empty or all-comma spec degenerates to no substitutions.
    /// Unknown names are reported and skipped rather than failing the block.
    #[must_use]
    pub fn modified_by(&self, spec: &str) -> Self {
        let tokens: Vec<&str> = spec.split(',').map(str::trim).collect();
        if tokens.iter().all(|t| t.is_empty()) {
            return Self::none();
        }
        let incremental = tokens
            .iter()
            .all(|t| t.is_empty() || t.starts_with('+') || t.starts_with('-') || t.ends_with('+'));
        let mut set = if incremental {
            self.clone()
        } else {
            Self::none()
        };
        for token in tokens {
            if token.is_empty() {
                continue;
            }
            let (op, name) = if let Some(rest) = token.strip_prefix('+') {
                ('+', rest)
            } else if let Some(rest) = token.strip_prefix('-') {
                ('-', rest)
            } else if let Some(rest) = token.strip_suffix('+') {
                ('+', rest)
            } else {
                ('=', token)
            };
            match name {
                "normal" | "n" => {
                    for s in NORMAL {
                        if op == '-' {
                            set.remove(*s);
                        } else {
                            set.insert_sorted(*s);
                        }
                    }
                }
                "verbatim" | "v" => {
                    for s in VERBATIM {
                        if op == '-' {
                            set.remove(*s);
                        } else {
                            set.insert_sorted(*s);
                        }
                    }
                }
                "none" => set = Self::none(),
                _ => match Substitution::from_name(name) {
                    Some(substitution) => {
                        if op == '-' {
                            set.remove(substitution);
                        } else {
                            set.insert_sorted(substitution);
                        }
                    }
                    None => {
                        tracing::warn!(substitution = name, "unknown substitution name in subs attribute");
                    }
                },
            }
        }
        set
    }

    /// Parse a `pass:` macro substitution spec, e.g. `a,q`. Unlike
    /// [`Self::modified_by`], any unknown name makes the whole spec invalid so
    /// the macro can fall through as literal text. An empty spec is valid and
    /// means no substitutions at all.
    #[must_use]
    pub fn parse_exact(spec: &str) -> Option<Self> {
        let mut set = Self::none();
        for token in spec.split(',').map(str::trim) {
            if token.is_empty() {
                continue;
            }
            match token {
                "normal" | "n" => {
                    for s in NORMAL {
                        set.insert_sorted(*s);
                    }
                }
                "verbatim" | "v" => {
                    for s in VERBATIM {
                        set.insert_sorted(*s);
                    }
                }
                "none" => {}
                _ => set.insert_sorted(Substitution::from_name(token)?),
            }
        }
        Some(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absolute_replaces() {
        let set = SubstitutionSet::normal().modified_by("quotes");
        assert!(set.contains(Substitution::Quotes));
        assert!(!set.contains(Substitution::Macros));
    }

    #[test]
    fn test_additive_and_subtractive() {
        let set = SubstitutionSet::verbatim().modified_by("+quotes,-callouts");
        assert!(set.contains(Substitution::Quotes));
        assert!(set.contains(Substitution::SpecialCharacters));
        assert!(!set.contains(Substitution::Callouts));
    }

    #[test]
    fn test_empty_spec_means_no_subs() {
        assert!(SubstitutionSet::normal().modified_by("").is_empty());
        assert!(SubstitutionSet::normal().modified_by(",,").is_empty());
    }

    #[test]
    fn test_pass_spec_strict() {
        let set = SubstitutionSet::parse_exact("a,q");
        assert_eq!(
            set,
            Some(SubstitutionSet(vec![
                Substitution::Attributes,
                Substitution::Quotes
            ]))
        );
        assert_eq!(SubstitutionSet::parse_exact("bogus"), None);
        assert_eq!(SubstitutionSet::parse_exact(""), Some(SubstitutionSet::none()));
    }

    #[test]
    fn test_canonical_order_kept() {
        let set = SubstitutionSet::none().modified_by("+macros,+attributes");
        let order: Vec<Substitution> = set.iter().collect();
        assert_eq!(order, vec![Substitution::Attributes, Substitution::Macros]);
    }
}
