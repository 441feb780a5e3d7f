//! TableBuilder: assembles a `HashTable` from four caller-supplied closures.

use crate::chain_table::MIN_CAPACITY;
use crate::error::TableError;
use crate::hash_table::HashTable;
use crate::policy::{DisposeFn, EqualsFn, FnPolicy, HashFn};
use core::marker::PhantomData;

/// All four behaviours are required; `build` names the first one missing.
pub struct TableBuilder<K, V> {
    hash: Option<HashFn<K>>,
    equals: Option<EqualsFn<K>>,
    dispose_key: Option<DisposeFn<K>>,
    dispose_value: Option<DisposeFn<V>>,
    initial_capacity: usize,
}

impl<K, V> TableBuilder<K, V> {
    pub fn new() -> Self {
        Self {
            hash: None,
            equals: None,
            dispose_key: None,
            dispose_value: None,
            initial_capacity: MIN_CAPACITY,
        }
    }

    pub fn hash<F>(mut self, f: F) -> Self
    where
        F: Fn(&K) -> u64 + Send + Sync + 'static,
    {
        self.hash = Some(Box::new(f));
        self
    }

    /// `f` returns true when two keys match.
    pub fn equals<F>(mut self, f: F) -> Self
    where
        F: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        self.equals = Some(Box::new(f));
        self
    }

    pub fn dispose_key<F>(mut self, f: F) -> Self
    where
        F: Fn(K) + Send + Sync + 'static,
    {
        self.dispose_key = Some(Box::new(f));
        self
    }

    pub fn dispose_value<F>(mut self, f: F) -> Self
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        self.dispose_value = Some(Box::new(f));
        self
    }

    /// Rounded up to a power of two; values below 16 become 16.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<HashTable<K, V, FnPolicy<K, V>>, TableError> {
        let missing = |missing| TableError::InvalidConfiguration { missing };
        let policy = FnPolicy {
            hash: self.hash.ok_or_else(|| missing("hash"))?,
            equals: self.equals.ok_or_else(|| missing("equals"))?,
            dispose_key: self.dispose_key.ok_or_else(|| missing("dispose_key"))?,
            dispose_value: self.dispose_value.ok_or_else(|| missing("dispose_value"))?,
            _pd: PhantomData,
        };
        Ok(HashTable::with_capacity_and_policy(
            self.initial_capacity,
            policy,
        ))
    }
}

impl<K, V> Default for TableBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
