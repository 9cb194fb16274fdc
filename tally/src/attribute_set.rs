//! Canonical attribute sets used as series identifiers.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::attributes::{Key, KeyValue, Value};

fn calculate_hash(values: &[KeyValue]) -> u64 {
    let mut hasher = FxHasher::default();
    values.iter().for_each(|kv| kv.hash(&mut hasher));
    hasher.finish()
}

/// A unique set of attributes identifying one series of an instrument.
///
/// The pairs are sorted by key and deduplicated, so two sets built from the
/// same pairs in any order compare equal and hash identically. When a key is
/// repeated the value passed last wins. The hash is computed once at
/// construction since sets are hashed on every measurement.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct AttributeSet(Vec<KeyValue>, u64);

impl From<&[KeyValue]> for AttributeSet {
    fn from(values: &[KeyValue]) -> Self {
        let mut seen = HashSet::with_capacity(values.len());
        let mut vec: Vec<KeyValue> = values
            .iter()
            .rev()
            .filter(|kv| seen.insert(kv.key.clone()))
            .cloned()
            .collect();
        vec.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        let hash = calculate_hash(&vec);
        AttributeSet(vec, hash)
    }
}

impl AttributeSet {
    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the key-value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.0.iter().map(|kv| (&kv.key, &kv.value))
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.0
            .binary_search_by(|kv| kv.key.cmp(key))
            .ok()
            .map(|idx| &self.0[idx].value)
    }
}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.1)
    }
}
