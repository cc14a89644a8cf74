use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A map from one key to many distinct values. Empty value sets are never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiMap<K: Ord, V: Ord> {
    map: BTreeMap<K, BTreeSet<V>>,
    #[serde(skip)]
    empty: BTreeSet<V>,
}

impl<K, V> MultiMap<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    pub fn new() -> MultiMap<K, V> {
        MultiMap {
            map: BTreeMap::new(),
            empty: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.map.entry(key).or_default().insert(value);
    }

    pub fn remove(&mut self, key: K, value: V) {
        if let Some(values) = self.map.get_mut(&key) {
            values.remove(&value);
            if values.is_empty() {
                self.map.remove(&key);
            }
        }
    }

    pub fn get(&self, key: K) -> &BTreeSet<V> {
        self.map.get(&key).unwrap_or(&self.empty)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K, V> Default for MultiMap<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    fn default() -> Self {
        MultiMap::new()
    }
}

/// Counts occurrences of each key.
#[derive(Clone, Debug)]
pub struct Counter<T: Ord + PartialEq + Clone> {
    map: BTreeMap<T, usize>,
}

impl<T: Ord + PartialEq + Clone> Default for Counter<T> {
    fn default() -> Self {
        Counter::new()
    }
}

impl<T: Ord + PartialEq + Clone> Counter<T> {
    pub fn new() -> Counter<T> {
        Counter {
            map: BTreeMap::new(),
        }
    }

    /// Adds one to the count of this key, returning the new count.
    pub fn inc(&mut self, val: T) -> usize {
        let entry = self.map.entry(val).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Keys seen more than once, in sorted order.
    pub fn duplicates(&self) -> Vec<T> {
        self.map
            .iter()
            .filter(|(_, cnt)| **cnt > 1)
            .map(|(key, _)| key.clone())
            .collect()
    }
}
