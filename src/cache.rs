//! Per-key memoization with explicit invalidation.
//!
//! Every layer that renders something expensive (legend fragments, rules,
//! help text) holds one of these stores so a redraw cycle only recomputes
//! entries a handler explicitly invalidated. Invalidation marks an entry
//! stale without discarding the stale value, so `get_or_compute` runs the
//! closure exactly once per invalidation no matter how many redraw cycles
//! happen in between.

use std::collections::HashMap;

#[derive(Debug)]
struct CachedElement<T> {
    value: Option<T>,
    valid: bool,
}

/// Memoized rendering fragments keyed by logical element name.
#[derive(Debug)]
pub struct CachedElementStore<T> {
    elements: HashMap<String, CachedElement<T>>,
}

impl<T> Default for CachedElementStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CachedElementStore<T> {
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
        }
    }

    /// Returns the cached value only on a valid hit.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.elements
            .get(key)
            .filter(|elem| elem.valid)
            .and_then(|elem| elem.value.as_ref())
    }

    /// Stores a fresh value and marks it valid.
    pub fn set(&mut self, key: &str, value: T) {
        self.elements.insert(
            key.to_string(),
            CachedElement {
                value: Some(value),
                valid: true,
            },
        );
    }

    /// Returns the cached value, computing it first if the entry is missing
    /// or stale.
    pub fn get_or_compute(&mut self, key: &str, compute: impl FnOnce() -> T) -> &T {
        let entry = self
            .elements
            .entry(key.to_string())
            .or_insert(CachedElement {
                value: None,
                valid: false,
            });
        if !entry.valid {
            entry.value = Some(compute());
            entry.valid = true;
        }
        entry
            .value
            .as_ref()
            .unwrap_or_else(|| unreachable!("valid cache entry holds a value"))
    }

    /// Marks a single key stale. The stale value is kept until recomputed.
    pub fn invalidate(&mut self, key: &str) {
        if let Some(entry) = self.elements.get_mut(key) {
            entry.valid = false;
        }
    }

    /// Marks every key stale.
    pub fn invalidate_all(&mut self) {
        for entry in self.elements.values_mut() {
            entry.valid = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_runs_once_until_invalidated() {
        let mut store = CachedElementStore::new();
        let mut calls = 0;
        for _ in 0..3 {
            let value = *store.get_or_compute("rule", || {
                calls += 1;
                42
            });
            assert_eq!(value, 42);
        }
        assert_eq!(calls, 1);

        store.invalidate("rule");
        let value = *store.get_or_compute("rule", || {
            calls += 1;
            43
        });
        assert_eq!(value, 43);
        assert_eq!(calls, 2);
    }

    #[test]
    fn get_misses_on_stale_entry() {
        let mut store = CachedElementStore::new();
        store.set("bar", "fragment");
        assert_eq!(store.get("bar"), Some(&"fragment"));
        store.invalidate("bar");
        assert_eq!(store.get("bar"), None);
        // A miss forces recomputation; the fresh value reflects current state.
        assert_eq!(*store.get_or_compute("bar", || "fresh"), "fresh");
        assert_eq!(store.get("bar"), Some(&"fresh"));
    }

    #[test]
    fn invalidate_all_marks_every_key() {
        let mut store = CachedElementStore::new();
        store.set("a", 1);
        store.set("b", 2);
        store.invalidate_all();
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn invalidate_unknown_key_is_a_no_op() {
        let mut store: CachedElementStore<u8> = CachedElementStore::new();
        store.invalidate("missing");
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn identical_value_between_invalidations() {
        let mut store = CachedElementStore::new();
        let first = store.get_or_compute("k", || vec![1, 2, 3]).clone();
        let second = store.get_or_compute("k", || vec![9, 9, 9]).clone();
        assert_eq!(first, second);
    }
}
