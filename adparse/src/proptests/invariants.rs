//! The invariants themselves, from hardest (never panic) to behavioral laws
//! over the attribute store and counters.

use proptest::prelude::*;

use crate::{AttributeStore, CounterValue, Element, SafeMode};

use super::generators::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// The parser must always return a `Result`, never panic, no matter how
    /// malformed the input.
    #[test]
    fn parser_never_panics(input in any_document_string()) {
        let _ = crate::parse(&input);
    }

    /// Same, over input that actually looks like markup and so reaches the
    /// deeper assembly paths.
    #[test]
    fn parser_survives_structured_input(input in structured_document()) {
        let _ = crate::parse(&input);
    }

    /// `set` followed by `get` observes the written value.
    #[test]
    fn store_set_then_get_round_trips(name in attribute_name(), value in attribute_value()) {
        let mut store = AttributeStore::new(SafeMode::Unsafe);
        store.set(&name, value.as_str()).unwrap();
        prop_assert_eq!(store.get(&name).map(|v| v.as_text()), Some(value.as_str()));
    }

    /// A failed write to a locked name leaves the store unchanged.
    #[test]
    fn locked_write_is_a_noop(name in attribute_name(), before in attribute_value(), after in attribute_value()) {
        let mut store = AttributeStore::new(SafeMode::Unsafe);
        store.set(&name, before.as_str()).unwrap();
        store.lock(&name);
        prop_assert!(store.set(&name, after.as_str()).is_err());
        prop_assert!(store.unset(&name).is_err());
        prop_assert_eq!(store.get(&name).map(|v| v.as_text()), Some(before.as_str()));
    }

    /// A numeric counter with seed N and step S emits the arithmetic
    /// sequence N, N+S, N+2S, strictly in order.
    #[test]
    fn numeric_counter_is_arithmetic(start in -1000i64..1000, step in 1i64..10, advances in 1usize..20) {
        let mut counter = CounterValue::from_seed(Some(&format!("{start}:{step}")));
        for k in 1..=advances {
            counter.advance();
            let expected = start + step * i64::try_from(k).unwrap();
            prop_assert_eq!(counter.display(), expected.to_string());
        }
    }

    /// Verbatim block content round-trips byte for byte: no substitution is
    /// ever applied to listing lines.
    #[test]
    fn verbatim_listing_round_trips(lines in prop::collection::vec(verbatim_line(), 0..8)) {
        let mut source = String::from("----\n");
        for line in &lines {
            source.push_str(line);
            source.push('\n');
        }
        source.push_str("----\n");

        let document = crate::parse(&source).unwrap();
        let Some(Element::Listing { lines: parsed, .. }) = document.elements.first() else {
            return Err(TestCaseError::fail(format!(
                "expected a listing, got {:?}",
                document.elements.first()
            )));
        };
        prop_assert_eq!(parsed, &lines);
    }
}
