//! Conditional preprocessor directives: `ifdef::`, `ifndef::`, `ifeval::`,
//! `endif::`.

use crate::{
    attributes::AttributeStore,
    error::{Detail, Error, Position},
    model::ConditionalDirective,
};

#[derive(Debug)]
pub(crate) enum Conditional {
    Ifdef(ConditionalDirective),
    Ifndef(ConditionalDirective),
    Ifeval(Ifeval),
}

#[derive(Debug)]
pub(crate) struct Ifeval {
    left: EvalValue,
    operator: Operator,
    right: EvalValue,
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub(crate) enum EvalValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

#[derive(Debug, PartialEq)]
pub(crate) enum Operator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

#[derive(Debug)]
pub(crate) struct Endif {
    pub(crate) names: Vec<String>,
}

peg::parser! {
    grammar conditional_parser() for str {
        pub(crate) rule conditional() -> Conditional
            = ifdef() / ifndef() / ifeval()

        pub(crate) rule endif() -> Endif
            = "endif::" names:(n:name() { n })? "[]" {
                Endif { names: names.into_iter().collect() }
            }

        rule ifdef() -> Conditional
            = "ifdef::" a:names() "[" inline:inline()? "]" {
                Conditional::Ifdef(ConditionalDirective {
                    names: a.0,
                    union_mode: a.1,
                    inline,
                })
            }

        rule ifndef() -> Conditional
            = "ifndef::" a:names() "[" inline:inline()? "]" {
                Conditional::Ifndef(ConditionalDirective {
                    names: a.0,
                    union_mode: a.1,
                    inline,
                })
            }

        rule ifeval() -> Conditional
            = "ifeval::[" left:eval_value() operator:operator() right:eval_value() "]" {
                // Both sides stay strings here; type coercion happens during
                // evaluation, once attribute references have been expanded.
                Conditional::Ifeval(Ifeval {
                    left: EvalValue::String(left),
                    operator,
                    right: EvalValue::String(right),
                })
            }

        rule names() -> (Vec<String>, bool)
            = n1:name() "," rest:(name() ** ",") {
                let mut names = vec![n1];
                names.extend(rest);
                (names, true)
            }
            / n1:name() "+" rest:(name() ** "+") {
                let mut names = vec![n1];
                names.extend(rest);
                (names, false)
            }
            / n1:name() { (vec![n1], true) }

        rule name() -> String
            = n:$((!['[' | ',' | '+'] [_])+) { n.to_string() }

        rule inline() -> String
            = c:$((!"]" [_])+) { c.to_string() }

        rule eval_value() -> String
            = n:$((!operator() ![']'] [_])+) { n.trim().to_string() }

        rule operator() -> Operator
            = "==" { Operator::Equal }
            / "!=" { Operator::NotEqual }
            / "<=" { Operator::LessThanOrEqual }
            / ">=" { Operator::GreaterThanOrEqual }
            / "<" { Operator::LessThan }
            / ">" { Operator::GreaterThan }
    }
}

impl Conditional {
    fn names_match(directive: &ConditionalDirective, store: &AttributeStore, negate: bool) -> bool {
        if directive.names.is_empty() {
            tracing::warn!("conditional directive without attribute names");
            return !negate;
        }
        let result = if directive.union_mode {
            directive.names.iter().any(|name| store.is_set(name))
        } else {
            directive.names.iter().all(|name| store.is_set(name))
        };
        if negate { !result } else { result }
    }

    /// Evaluate this conditional against the current attribute state.
    ///
    /// For the single-line forms the admitted content, if any, is written
    /// into `inline_content`.
    pub(crate) fn is_true(
        &self,
        store: &AttributeStore,
        inline_content: &mut Option<String>,
        line: usize,
    ) -> Result<bool, Error> {
        Ok(match self {
            Conditional::Ifdef(directive) => {
                let admitted = Self::names_match(directive, store, false);
                if admitted {
                    inline_content.clone_from(&directive.inline);
                }
                admitted
            }
            Conditional::Ifndef(directive) => {
                let admitted = Self::names_match(directive, store, true);
                if admitted {
                    inline_content.clone_from(&directive.inline);
                }
                admitted
            }
            Conditional::Ifeval(ifeval) => ifeval.evaluate(store, line)?,
        })
    }

    pub(crate) fn is_inline(&self) -> bool {
        match self {
            Conditional::Ifdef(directive) | Conditional::Ifndef(directive) => {
                directive.inline.is_some()
            }
            Conditional::Ifeval(_) => false,
        }
    }
}

impl Endif {
    /// Whether this `endif` closes the given conditional. A bare `endif::[]`
    /// closes anything; a named one only its matching directive.
    pub(crate) fn closes(&self, conditional: &Conditional) -> bool {
        if self.names.is_empty() {
            return true;
        }
        match conditional {
            Conditional::Ifdef(directive) | Conditional::Ifndef(directive) => self
                .names
                .iter()
                .all(|name| directive.names.contains(name)),
            Conditional::Ifeval(_) => false,
        }
    }
}

impl Ifeval {
    fn evaluate(&self, store: &AttributeStore, line: usize) -> Result<bool, Error> {
        let left = self.left.convert(store);
        let right = self.right.convert(store);

        match (&left, &right) {
            (EvalValue::Number(_), EvalValue::Number(_))
            | (EvalValue::Boolean(_), EvalValue::Boolean(_))
            | (EvalValue::String(_), EvalValue::String(_)) => {}
            _ => {
                tracing::error!(?left, ?right, "mismatched operand types in ifeval directive");
                return Err(Error::IfEvalMismatchedTypes(Detail {
                    position: Position { line, column: 1 },
                }));
            }
        }

        Ok(match self.operator {
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            Operator::LessThan => left < right,
            Operator::GreaterThan => left > right,
            Operator::LessThanOrEqual => left <= right,
            Operator::GreaterThanOrEqual => left >= right,
        })
    }
}

impl EvalValue {
    fn convert(&self, store: &AttributeStore) -> Self {
        match self {
            EvalValue::String(s) => {
                let s = crate::substitute::expand_attribute_refs(s, store);

                s.parse::<bool>()
                    .map(EvalValue::Boolean)
                    .or_else(|_| s.parse::<f64>().map(EvalValue::Number))
                    .or_else(|_| evalexpr::eval_float(&s).map(EvalValue::Number))
                    .or_else(|_| {
                        #[allow(clippy::cast_precision_loss)]
                        evalexpr::eval_int(&s)
                            .map(|v| v as f64)
                            .map(EvalValue::Number)
                    })
                    .unwrap_or_else(|_| EvalValue::String(Self::strip_quotes(&s)))
            }
            value @ (EvalValue::Number(_) | EvalValue::Boolean(_)) => value.clone(),
        }
    }

    #[allow(clippy::indexing_slicing)] // single-quote delimiters are one byte
    fn strip_quotes(s: &str) -> String {
        if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
            s[1..s.len() - 1].to_string()
        } else {
            s.to_string()
        }
    }
}

pub(crate) fn parse_line(line: &str, line_number: usize) -> Result<Conditional, Error> {
    conditional_parser::conditional(line).map_err(|error| {
        tracing::error!(?error, "failed to parse conditional directive");
        Error::InvalidConditionalDirective(Detail {
            position: Position {
                line: line_number,
                column: 1,
            },
        })
    })
}

pub(crate) fn parse_endif(line: &str, line_number: usize) -> Result<Endif, Error> {
    conditional_parser::endif(line).map_err(|error| {
        tracing::error!(?error, "failed to parse endif directive");
        Error::InvalidConditionalDirective(Detail {
            position: Position {
                line: line_number,
                column: 1,
            },
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SafeMode;

    fn store() -> AttributeStore {
        AttributeStore::new(SafeMode::Unsafe)
    }

    #[test]
    fn test_ifdef_single_name() -> Result<(), Error> {
        let conditional = parse_line("ifdef::attribute[]", 1)?;
        assert!(matches!(
            &conditional,
            Conditional::Ifdef(d) if d.names == vec!["attribute"] && d.inline.is_none()
        ));
        Ok(())
    }

    #[test]
    fn test_ifdef_union_of_names() -> Result<(), Error> {
        let conditional = parse_line("ifdef::attr1,attr2[]", 1)?;
        assert!(matches!(
            &conditional,
            Conditional::Ifdef(d) if d.names == vec!["attr1", "attr2"] && d.union_mode
        ));

        let mut attrs = store();
        attrs.set("attr2", "").ok();
        let mut inline = None;
        assert!(conditional.is_true(&attrs, &mut inline, 1)?);
        Ok(())
    }

    #[test]
    fn test_ifdef_intersection_of_names() -> Result<(), Error> {
        let conditional = parse_line("ifdef::attr1+attr2[]", 1)?;
        assert!(matches!(
            &conditional,
            Conditional::Ifdef(d) if d.names == vec!["attr1", "attr2"] && !d.union_mode
        ));

        let mut attrs = store();
        attrs.set("attr1", "").ok();
        let mut inline = None;
        assert!(!conditional.is_true(&attrs, &mut inline, 1)?);
        attrs.set("attr2", "").ok();
        assert!(conditional.is_true(&attrs, &mut inline, 1)?);
        Ok(())
    }

    #[test]
    fn test_ifndef() -> Result<(), Error> {
        let conditional = parse_line("ifndef::attribute[]", 1)?;
        let mut inline = None;
        assert!(conditional.is_true(&store(), &mut inline, 1)?);
        Ok(())
    }

    #[test]
    fn test_ifdef_inline_content() -> Result<(), Error> {
        let conditional = parse_line("ifdef::attribute[Some content here]", 1)?;
        assert!(conditional.is_inline());

        let mut attrs = store();
        attrs.set("attribute", "").ok();
        let mut inline = None;
        assert!(conditional.is_true(&attrs, &mut inline, 1)?);
        assert_eq!(inline.as_deref(), Some("Some content here"));
        Ok(())
    }

    #[test]
    fn test_ifeval_simple_math() -> Result<(), Error> {
        let conditional = parse_line("ifeval::[1 + 1 == 2]", 1)?;
        let mut inline = None;
        assert!(conditional.is_true(&store(), &mut inline, 1)?);
        Ok(())
    }

    #[test]
    fn test_ifeval_string_equality() -> Result<(), Error> {
        let conditional = parse_line("ifeval::['ASDF' == ASDF]", 1)?;
        let mut inline = None;
        assert!(conditional.is_true(&store(), &mut inline, 1)?);
        Ok(())
    }

    #[test]
    fn test_ifeval_attribute_expansion() -> Result<(), Error> {
        let mut attrs = store();
        attrs.set("level", "3").ok();
        let conditional = parse_line("ifeval::[{level} >= 2]", 1)?;
        let mut inline = None;
        assert!(conditional.is_true(&attrs, &mut inline, 1)?);
        Ok(())
    }

    #[test]
    fn test_ifeval_mismatched_types() -> Result<(), Error> {
        let conditional = parse_line("ifeval::['1+1' >= 2]", 1)?;
        let mut inline = None;
        assert!(matches!(
            conditional.is_true(&store(), &mut inline, 1),
            Err(Error::IfEvalMismatchedTypes(_))
        ));
        Ok(())
    }

    #[test]
    fn test_endif_named() -> Result<(), Error> {
        let endif = parse_endif("endif::attribute[]", 1)?;
        assert_eq!(endif.names, vec!["attribute"]);

        let conditional = parse_line("ifdef::attribute[]", 1)?;
        assert!(endif.closes(&conditional));

        let other = parse_line("ifdef::something-else[]", 1)?;
        assert!(!endif.closes(&other));
        Ok(())
    }

    #[test]
    fn test_endif_bare_closes_anything() -> Result<(), Error> {
        let endif = parse_endif("endif::[]", 1)?;
        assert!(endif.names.is_empty());
        assert!(endif.closes(&parse_line("ifeval::[1 == 1]", 1)?));
        Ok(())
    }

    #[test]
    fn test_malformed_directive() {
        assert!(matches!(
            parse_line("ifdef::[]", 1),
            Err(Error::InvalidConditionalDirective(_))
        ));
    }
}
