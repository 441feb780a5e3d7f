//! chain-hashmap: a separately chained hash table with pluggable hashing,
//! equality and disposal, guarded by a single reader/writer lock.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep the structural algorithm (chaining, growth) independent of
//!   synchronization and of user callbacks so each can be reasoned about
//!   on its own.
//! - Layers:
//!   - ChainTable<K, V>: bucket array of chain heads over a generational
//!     arena of nodes linked by arena key. Takes the hash and an equality
//!     closure per call, like `hashbrown::HashTable`. Never disposes.
//!   - HashTable<K, V, P>: public API. Owns an `EntryPolicy` and wraps
//!     the ChainTable in a `parking_lot::RwLock`; disposes superseded and
//!     removed entries after the write lock is released.
//!   - TableBuilder<K, V>: assembles a table from four closures and
//!     rejects incomplete configurations.
//!
//! Constraints
//! - Capacity is a power of two, at least 16, and only ever doubles.
//! - A put first checks `occupancy / capacity >= 0.75` against the counts
//!   before placement and grows if so, even when the put then replaces.
//! - Each key appears at most once; a put with an equal key replaces both
//!   key and value.
//! - No iteration order, no shrinking, no per-bucket locking.
//!
//! Ownership
//! - `put` moves the key and value into the table. Every key and value the
//!   table gives up (replacement, removal, teardown) goes through
//!   `EntryPolicy::dispose_key` / `dispose_value` exactly once.
//!
//! Concurrency and reentrancy
//! - `put`/`remove` take the write lock; lookups take the read lock, so
//!   lookups never observe a chain mid-relink or a bucket array mid-growth.
//! - The probe key is hashed before the lock is taken. `equals` runs under
//!   the lock; a debug-only guard panics if it (or a `for_each` visitor)
//!   re-enters the same table rather than deadlocking.
//! - Disposal runs after the lock is dropped and may re-enter freely.
//!
//! Hashing and growth
//! - Each node stores the `u64` hash computed at insertion. Growth
//!   relocates by the stored hash and never calls user code, and probing
//!   compares stored hashes before calling `equals`.
//! - Growth reserves the doubled bucket array before relinking anything;
//!   if the reservation fails, `put` disposes the key and value it was
//!   given, reports `AllocationFailed`, and leaves the table unchanged.

mod builder;
#[cfg(not(feature = "bench_internal"))]
mod chain_table;
#[cfg(feature = "bench_internal")]
pub mod chain_table;
#[cfg(test)]
mod chain_table_proptest;
mod error;
mod hash_table;
mod policy;
mod reentrancy;

// Public surface
pub use builder::TableBuilder;
pub use chain_table::{TableStats, MIN_CAPACITY};
pub use error::TableError;
pub use hash_table::{HashTable, ValueRef};
pub use policy::{EntryPolicy, FnPolicy, StdPolicy};
