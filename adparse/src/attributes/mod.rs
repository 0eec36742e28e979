//! The document attribute store: an ordered, lockable name→value table plus
//! counter state.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::Locked;
use crate::safe_mode::SafeMode;

mod counter;

pub use counter::CounterValue;

/// An attribute value: a string, set-with-no-value, or explicitly unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    /// Set without a value (`:name:`).
    Bool(bool),
}

impl AttributeValue {
    /// The text this value contributes when referenced inline. A set-with-no-
    /// value attribute contributes an empty string.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            AttributeValue::String(s) => s.as_str(),
            AttributeValue::Bool(_) => "",
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Names whose value a counter reference must never overwrite, even though
/// the counter's own internal sequence still advances.
const PROTECTED: &[&str] = &["max-include-depth", "safe-mode-level", "docdir", "docfile"];

/// Mutable, insertion-ordered document attribute table with lock and counter
/// semantics.
///
/// Writes happen in document order; a read observes the state at the point of
/// the reference, not the final state.
#[derive(Clone, Debug, Default)]
pub struct AttributeStore {
    values: FxHashMap<String, AttributeValue>,
    order: Vec<String>,
    locked: FxHashSet<String>,
    counters: FxHashMap<String, CounterValue>,
    safe_mode: SafeMode,
}

impl Serialize for AttributeStore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.order.len()))?;
        for name in &self.order {
            if let Some(value) = self.values.get(name) {
                state.serialize_entry(name, value)?;
            }
        }
        state.end()
    }
}

impl AttributeStore {
    /// A store pre-seeded with the built-in attributes.
    #[must_use]
    pub fn new(safe_mode: SafeMode) -> Self {
        let mut store = Self {
            safe_mode,
            ..Self::default()
        };
        store.seed("backend", "html5");
        store.seed("doctype", "article");
        // attribute-missing is deliberately not seeded: the API option is
        // the default, and a document `:attribute-missing:` entry overrides.
        store.seed("example-caption", "Example");
        store.seed("figure-caption", "Figure");
        store.seed("table-caption", "Table");
        store.seed("max-include-depth", "64");
        store.lock("max-include-depth");
        store
    }

    fn seed(&mut self, name: &str, value: &str) {
        self.insert_raw(name.to_string(), AttributeValue::String(value.to_string()));
    }

    fn insert_raw(&mut self, name: String, value: AttributeValue) {
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value);
    }

    /// Mark a name locked: subsequent `set`/`unset` calls become no-op errors.
    pub fn lock(&mut self, name: &str) {
        self.locked.insert(name.to_string());
    }

    #[must_use]
    pub fn is_locked(&self, name: &str) -> bool {
        self.locked.contains(name)
    }

    /// Set an attribute from the API or the parser itself. Only an explicit
    /// lock prevents the write.
    pub fn set(&mut self, name: &str, value: impl Into<AttributeValue>) -> Result<(), Locked> {
        if self.is_locked(name) {
            return Err(Locked {
                name: name.to_string(),
            });
        }
        self.insert_raw(name.to_string(), value.into());
        Ok(())
    }

    /// Set an attribute from a document-level `:name: value` entry. In
    /// addition to locks, the safe-mode precedence table gates whether the
    /// document may override this name at all.
    pub fn set_from_document(
        &mut self,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<(), Locked> {
        if !self.safe_mode.permits_document_override(name) {
            return Err(Locked {
                name: name.to_string(),
            });
        }
        self.set(name, value)
    }

    /// Unset an attribute (`:name!:`). The entry stays in the table, marked
    /// unset, so that later `ifdef` checks see it as undefined.
    pub fn unset(&mut self, name: &str) -> Result<(), Locked> {
        if self.is_locked(name) {
            return Err(Locked {
                name: name.to_string(),
            });
        }
        self.insert_raw(name.to_string(), AttributeValue::Bool(false));
        Ok(())
    }

    /// The value of `name`, or `None` if absent or explicitly unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        match self.values.get(name) {
            Some(AttributeValue::Bool(false)) | None => None,
            Some(value) => Some(value),
        }
    }

    /// Whether `name` is currently defined (set and not reset).
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn safe_mode(&self) -> SafeMode {
        self.safe_mode
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.order
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.as_str(), v)))
    }

    /// Advance the counter sequence for `name` and return the emitted text.
    ///
    /// The first reference initializes the sequence: from the attribute's
    /// current value if it already has one, else from `seed`, else `0`. The
    /// emitted value is written back to the attribute table unless the name
    /// is protected or locked, in which case only the internal sequence
    /// advances and the stored value stays untouched.
    pub fn advance_counter(&mut self, name: &str, seed: Option<&str>) -> String {
        let display = if let Some(counter) = self.counters.get_mut(name) {
            counter.advance();
            counter.display()
        } else {
            let existing = self.get(name).map(|v| v.as_text().to_string());
            let counter = match existing {
                Some(current) => {
                    let mut counter = CounterValue::from_seed(Some(&current));
                    counter.advance();
                    counter
                }
                None => CounterValue::from_seed(seed),
            };
            let display = counter.display();
            self.counters.insert(name.to_string(), counter);
            display
        };

        if PROTECTED.contains(&name) || self.is_locked(name) {
            tracing::debug!(name, "counter name is protected; value not written back");
        } else {
            self.insert_raw(name.to_string(), AttributeValue::String(display.clone()));
        }
        display
    }

    /// Fork a child scope for a nested document: the child reads a snapshot
    /// of this store (including counter state); its writes stay local.
    #[must_use]
    pub fn child(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_then_get_round_trips() {
        let mut store = AttributeStore::new(SafeMode::Unsafe);
        store.set("foo", "bar").ok();
        assert_eq!(store.get("foo"), Some(&AttributeValue::String("bar".into())));
    }

    #[test]
    fn test_locked_write_is_noop_and_store_unchanged() {
        let mut store = AttributeStore::new(SafeMode::Unsafe);
        store.set("foo", "original").ok();
        store.lock("foo");
        assert!(store.set("foo", "changed").is_err());
        assert!(store.unset("foo").is_err());
        assert_eq!(
            store.get("foo"),
            Some(&AttributeValue::String("original".into()))
        );
    }

    #[test]
    fn test_unset_hides_value_from_get() {
        let mut store = AttributeStore::new(SafeMode::Unsafe);
        store.set("foo", "bar").ok();
        store.unset("foo").ok();
        assert_eq!(store.get("foo"), None);
        assert!(!store.is_set("foo"));
    }

    #[test]
    fn test_safe_mode_gates_document_overrides() {
        let mut store = AttributeStore::new(SafeMode::Server);
        assert!(store.set_from_document("backend", "docbook").is_err());
        assert_eq!(
            store.get("backend"),
            Some(&AttributeValue::String("html5".into()))
        );
        // Ordinary attributes still pass through.
        assert!(store.set_from_document("toc", "left").is_ok());
    }

    #[test]
    fn test_counter_initializes_from_existing_value() {
        let mut store = AttributeStore::new(SafeMode::Unsafe);
        store.set("idx", "5").ok();
        assert_eq!(store.advance_counter("idx", None), "6");
        assert_eq!(store.advance_counter("idx", None), "7");
        assert_eq!(store.get("idx"), Some(&AttributeValue::String("7".into())));
    }

    #[test]
    fn test_counter_on_protected_name_advances_but_never_writes() {
        let mut store = AttributeStore::new(SafeMode::Unsafe);
        assert_eq!(
            store.get("max-include-depth"),
            Some(&AttributeValue::String("64".into()))
        );
        let first = store.advance_counter("max-include-depth", None);
        let second = store.advance_counter("max-include-depth", None);
        // Internal sequence still advances...
        assert_eq!(first, "65");
        assert_eq!(second, "66");
        // ...but the stored attribute stays locked in place.
        assert_eq!(
            store.get("max-include-depth"),
            Some(&AttributeValue::String("64".into()))
        );
    }

    #[test]
    fn test_child_scope_writes_stay_local() {
        let mut parent = AttributeStore::new(SafeMode::Unsafe);
        parent.advance_counter("figure-number", None);
        let mut child = parent.child();
        assert_eq!(child.advance_counter("figure-number", None), "1");
        child.set("local", "x").ok();
        assert!(!parent.is_set("local"));
        assert_eq!(parent.advance_counter("figure-number", None), "1");
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut store = AttributeStore::default();
        store.set("b", "1").ok();
        store.set("a", "2").ok();
        store.set("b", "3").ok();
        let names: Vec<&str> = store.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
