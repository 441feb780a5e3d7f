//! ChainTable: structural layer. A power-of-two bucket array whose slots
//! head singly linked collision chains; nodes live in a generational arena
//! and link to each other by arena key.
//!
//! The API follows `hashbrown::HashTable`: callers supply the hash and an
//! equality closure, so this layer never calls into a hashing policy of its
//! own. Nothing here disposes keys or values; superseded and removed pairs
//! are handed back once the structure is consistent again.

use crate::error::TableError;
use slotmap::{DefaultKey, SlotMap};
use tracing::{debug, warn};

/// Capacity a fresh table starts with; also the smallest capacity allowed.
pub const MIN_CAPACITY: usize = 16;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    hash: u64,
    next: Option<DefaultKey>,
}

pub struct ChainTable<K, V> {
    buckets: Vec<Option<DefaultKey>>,
    slots: SlotMap<DefaultKey, Node<K, V>>, // chain nodes, linked by key
    occupancy: usize,
    // Makes the next growth fail as if the allocator had refused it.
    #[cfg(test)]
    pub(crate) deny_growth: bool,
}

/// A put that needed to grow the table and could not. The key and value
/// are handed back untouched, mirroring `hashbrown`'s `OccupiedError`.
#[derive(Debug)]
pub struct Rejected<K, V> {
    pub error: TableError,
    pub key: K,
    pub value: V,
}

/// Point-in-time shape of a table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TableStats {
    pub occupancy: usize,
    pub capacity: usize,
    pub load_factor: f64,
    pub empty_buckets: usize,
    pub longest_chain: usize,
}

/// Iterator over one bucket's chain, head to tail.
pub struct Chain<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Node<K, V>>,
    cursor: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.slots.get(self.cursor?)?;
        self.cursor = node.next;
        Some((&node.key, &node.value))
    }
}

impl<K, V> ChainTable<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    /// `capacity` is rounded up to a power of two no smaller than `MIN_CAPACITY`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY).next_power_of_two();
        Self {
            buckets: vec![None; capacity],
            slots: SlotMap::with_key(),
            occupancy: 0,
            #[cfg(test)]
            deny_growth: false,
        }
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy
    }
    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.occupancy as f64 / self.capacity() as f64
    }

    #[inline]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    // occupancy / capacity >= 0.75, exactly.
    #[inline]
    fn needs_growth(&self) -> bool {
        self.occupancy.saturating_mul(4) >= self.buckets.len().saturating_mul(3)
    }

    pub fn find<F>(&self, hash: u64, mut eq: F) -> Option<(&K, &V)>
    where
        F: FnMut(&K) -> bool,
    {
        let mut cursor = self.buckets[self.bucket_index(hash)];
        while let Some(k) = cursor {
            let node = &self.slots[k];
            if node.hash == hash && eq(&node.key) {
                return Some((&node.key, &node.value));
            }
            cursor = node.next;
        }
        None
    }

    /// Insert `key -> value`, or overwrite the entry whose key satisfies
    /// `eq`. Growth is decided before placement from the current counts.
    ///
    /// Returns the superseded pair on replacement. If growth fails the
    /// table is left as it was and the pair comes back in `Rejected`.
    pub fn put<F>(
        &mut self,
        hash: u64,
        key: K,
        value: V,
        mut eq: F,
    ) -> Result<Option<(K, V)>, Rejected<K, V>>
    where
        F: FnMut(&K, &K) -> bool,
    {
        if self.needs_growth() {
            if let Err(error) = self.grow() {
                return Err(Rejected { error, key, value });
            }
        }

        let index = self.bucket_index(hash);
        let mut cursor = self.buckets[index];
        let mut tail = None;
        while let Some(k) = cursor {
            let node = &mut self.slots[k];
            if node.hash == hash && eq(&node.key, &key) {
                let old_key = core::mem::replace(&mut node.key, key);
                let old_value = core::mem::replace(&mut node.value, value);
                return Ok(Some((old_key, old_value)));
            }
            tail = Some(k);
            cursor = node.next;
        }

        let k = self.slots.insert(Node {
            key,
            value,
            hash,
            next: None,
        });
        match tail {
            None => self.buckets[index] = Some(k),
            Some(t) => self.slots[t].next = Some(k),
        }
        self.occupancy += 1;
        Ok(None)
    }

    /// Unlink and return the entry whose key satisfies `eq`.
    pub fn remove<F>(&mut self, hash: u64, mut eq: F) -> Option<(K, V)>
    where
        F: FnMut(&K) -> bool,
    {
        let index = self.bucket_index(hash);
        let mut prev: Option<DefaultKey> = None;
        let mut cursor = self.buckets[index];
        while let Some(k) = cursor {
            let node = &self.slots[k];
            if node.hash == hash && eq(&node.key) {
                let next = node.next;
                match prev {
                    None => self.buckets[index] = next,
                    Some(p) => self.slots[p].next = next,
                }
                self.occupancy -= 1;
                return self.slots.remove(k).map(|n| (n.key, n.value));
            }
            prev = Some(k);
            cursor = node.next;
        }
        None
    }

    /// Double the bucket count and move every node whose index changes to
    /// the tail of its new chain. Nodes are relinked, never reallocated, and
    /// placement uses the hash cached at insertion.
    fn grow(&mut self) -> Result<(), TableError> {
        let old_capacity = self.buckets.len();
        let Some(new_capacity) = old_capacity.checked_mul(2) else {
            warn!(old_capacity, "bucket count overflow");
            return Err(TableError::AllocationFailed {
                requested: usize::MAX,
            });
        };
        #[cfg(test)]
        if self.deny_growth {
            return Err(TableError::AllocationFailed {
                requested: new_capacity,
            });
        }
        if self.buckets.try_reserve_exact(old_capacity).is_err() {
            warn!(old_capacity, new_capacity, "could not reserve bucket array");
            return Err(TableError::AllocationFailed {
                requested: new_capacity,
            });
        }
        self.buckets.resize(new_capacity, None);

        for i in 0..old_capacity {
            let mut cursor = self.buckets[i].take();
            let mut kept_tail: Option<DefaultKey> = None;
            while let Some(k) = cursor {
                let node = &mut self.slots[k];
                cursor = node.next.take();
                let target = (node.hash % new_capacity as u64) as usize;
                if target == i {
                    match kept_tail {
                        None => self.buckets[i] = Some(k),
                        Some(t) => self.slots[t].next = Some(k),
                    }
                    kept_tail = Some(k);
                } else {
                    self.append(target, k);
                }
            }
        }

        debug!(
            old_capacity,
            new_capacity,
            occupancy = self.occupancy,
            "grew bucket array"
        );
        Ok(())
    }

    fn append(&mut self, index: usize, k: DefaultKey) {
        let Some(mut tail) = self.buckets[index] else {
            self.buckets[index] = Some(k);
            return;
        };
        while let Some(next) = self.slots[tail].next {
            tail = next;
        }
        self.slots[tail].next = Some(k);
    }

    /// Walk the chain headed at `index`.
    pub fn chain(&self, index: usize) -> Chain<'_, K, V> {
        Chain {
            slots: &self.slots,
            cursor: self.buckets.get(index).copied().flatten(),
        }
    }

    /// Unordered walk over every live entry.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().map(|(_, n)| (&n.key, &n.value))
    }

    /// Empty the table, yielding every entry. Capacity is kept.
    pub fn drain(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
        self.buckets.fill(None);
        self.occupancy = 0;
        self.slots.drain().map(|(_, n)| (n.key, n.value))
    }

    pub fn stats(&self) -> TableStats {
        let mut empty_buckets = 0;
        let mut longest_chain = 0;
        for i in 0..self.buckets.len() {
            let len = self.chain(i).count();
            if len == 0 {
                empty_buckets += 1;
            }
            longest_chain = longest_chain.max(len);
        }
        TableStats {
            occupancy: self.occupancy,
            capacity: self.capacity(),
            load_factor: self.load_factor(),
            empty_buckets,
            longest_chain,
        }
    }

    /// Panics unless every structural invariant holds. `rehash` must agree
    /// with the hashes the entries were inserted under.
    #[cfg(test)]
    pub(crate) fn assert_invariants<H>(&self, rehash: H)
    where
        H: Fn(&K) -> u64,
    {
        let capacity = self.capacity();
        assert!(capacity >= MIN_CAPACITY && capacity.is_power_of_two());
        assert!(self.occupancy * 4 <= capacity * 3, "load bound exceeded");
        assert_eq!(self.occupancy, self.slots.len());

        let mut seen = std::collections::HashSet::new();
        for (i, head) in self.buckets.iter().enumerate() {
            let mut cursor = *head;
            while let Some(k) = cursor {
                assert!(seen.insert(k), "node reachable twice");
                let node = &self.slots[k];
                assert_eq!(node.hash, rehash(&node.key));
                assert_eq!((node.hash % capacity as u64) as usize, i, "misplaced node");
                cursor = node.next;
            }
        }
        assert_eq!(seen.len(), self.slots.len(), "unreachable node");
    }
}

impl<K, V> Default for ChainTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
