//! HashTable: public, thread-safe layer over `ChainTable`.

use crate::chain_table::{ChainTable, Rejected, TableStats, MIN_CAPACITY};
use crate::error::TableError;
use crate::policy::{EntryPolicy, StdPolicy};
use crate::reentrancy::DebugReentrancy;
use core::fmt::{self, Write as _};
use core::hash::{BuildHasher, Hash};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use tracing::{debug, trace};

/// Shared borrow of a stored value. The table's read lock is held for as
/// long as the `ValueRef` lives, so mutating the same table from the same
/// thread while holding one deadlocks.
pub type ValueRef<'a, V> = MappedRwLockReadGuard<'a, V>;

pub struct HashTable<K, V, P = StdPolicy>
where
    P: EntryPolicy<K, V>,
{
    policy: P,
    table: RwLock<ChainTable<K, V>>,
    reentrancy: DebugReentrancy,
}

impl<K, V> HashTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_policy(StdPolicy::default())
    }
}

impl<K, V> Default for HashTable<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashTable<K, V, StdPolicy<S>>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_policy(StdPolicy::with_hasher(hasher))
    }
}

impl<K, V, P> HashTable<K, V, P>
where
    P: EntryPolicy<K, V>,
{
    pub fn with_policy(policy: P) -> Self {
        Self::with_capacity_and_policy(MIN_CAPACITY, policy)
    }

    /// `capacity` is rounded up to a power of two of at least 16.
    pub fn with_capacity_and_policy(capacity: usize, policy: P) -> Self {
        let table = ChainTable::with_capacity(capacity);
        debug!(capacity = table.capacity(), "created hash table");
        Self {
            policy,
            table: RwLock::new(table),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Insert `key -> value`, taking ownership of both.
    ///
    /// If an equal key is already present its key and value are replaced
    /// and handed to the policy's disposal routines once the write lock has
    /// been released. The table grows before placement when its load factor
    /// has reached 0.75.
    ///
    /// If that growth cannot be allocated the table is left unchanged, the
    /// new key and value are disposed through the policy like any other
    /// pair the table gave up, and `AllocationFailed` is returned.
    pub fn put(&self, key: K, value: V) -> Result<(), TableError> {
        let hash = self.policy.hash(&key);
        let placed = {
            let _g = self.reentrancy.enter();
            let mut table = self.table.write();
            table.put(hash, key, value, |a, b| self.policy.equals(a, b))
        };
        match placed {
            Ok(Some((old_key, old_value))) => {
                trace!(hash, "replaced entry");
                self.dispose(old_key, old_value);
            }
            Ok(None) => trace!(hash, "inserted entry"),
            Err(Rejected { error, key, value }) => {
                self.dispose(key, value);
                return Err(error);
            }
        }
        Ok(())
    }

    /// Remove the entry for `key`, disposing its key and value. Returns
    /// whether an entry was removed; capacity never shrinks.
    pub fn remove(&self, key: &K) -> bool {
        let hash = self.policy.hash(key);
        let removed = {
            let _g = self.reentrancy.enter();
            let mut table = self.table.write();
            table.remove(hash, |k| self.policy.equals(k, key))
        };
        match removed {
            Some((k, v)) => {
                trace!(hash, "removed entry");
                self.dispose(k, v);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &K) -> Option<ValueRef<'_, V>> {
        let hash = self.policy.hash(key);
        let _g = self.reentrancy.enter();
        let table = self.table.read();
        RwLockReadGuard::try_map(table, |t| {
            t.find(hash, |k| self.policy.equals(k, key)).map(|(_, v)| v)
        })
        .ok()
    }

    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get(key).map(|v| V::clone(&v))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let hash = self.policy.hash(key);
        let _g = self.reentrancy.enter();
        self.table
            .read()
            .find(hash, |k| self.policy.equals(k, key))
            .is_some()
    }

    /// Visit every entry in no particular order. `f` runs under the read
    /// lock and must not call back into this table.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        let _g = self.reentrancy.enter();
        for (k, v) in self.table.read().iter() {
            f(k, v);
        }
    }

    pub fn occupancy(&self) -> usize {
        let _g = self.reentrancy.enter();
        self.table.read().occupancy()
    }
    pub fn len(&self) -> usize {
        self.occupancy()
    }
    pub fn is_empty(&self) -> bool {
        let _g = self.reentrancy.enter();
        self.table.read().is_empty()
    }
    pub fn capacity(&self) -> usize {
        let _g = self.reentrancy.enter();
        self.table.read().capacity()
    }
    pub fn load_factor(&self) -> f64 {
        let _g = self.reentrancy.enter();
        self.table.read().load_factor()
    }

    pub fn stats(&self) -> TableStats {
        let _g = self.reentrancy.enter();
        self.table.read().stats()
    }

    /// Human-readable listing of every bucket followed by the counts.
    pub fn dump(&self) -> String
    where
        K: fmt::Debug,
        V: fmt::Debug,
    {
        let _g = self.reentrancy.enter();
        let table = self.table.read();
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = Self::write_dump(&table, &mut out);
        out
    }

    fn write_dump(table: &ChainTable<K, V>, out: &mut String) -> fmt::Result
    where
        K: fmt::Debug,
        V: fmt::Debug,
    {
        for i in 0..table.capacity() {
            write!(out, "{i:>6} |")?;
            let mut chain = table.chain(i).peekable();
            if chain.peek().is_none() {
                out.push_str(" -");
            }
            for (k, v) in chain {
                write!(out, " <{k:?}, {v:?}>")?;
            }
            out.push('\n');
        }
        writeln!(
            out,
            "occupancy = {} | capacity = {} | load factor = {:.4}",
            table.occupancy(),
            table.capacity(),
            table.load_factor()
        )
    }

    /// Tear the table down, disposing every live entry. Equivalent to
    /// dropping it.
    pub fn destroy(self) {
        drop(self);
    }

    fn dispose(&self, key: K, value: V) {
        self.policy.dispose_key(key);
        self.policy.dispose_value(value);
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.table
            .read()
            .assert_invariants(|k| self.policy.hash(k));
    }
}

impl<K, V, P> Drop for HashTable<K, V, P>
where
    P: EntryPolicy<K, V>,
{
    fn drop(&mut self) {
        let table = self.table.get_mut();
        let disposed = table.occupancy();
        for (k, v) in table.drain() {
            self.policy.dispose_key(k);
            self.policy.dispose_value(v);
        }
        debug!(disposed, "destroyed hash table");
    }
}
