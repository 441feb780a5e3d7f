//! Caller-supplied behaviour: hashing, key equality and disposal.

use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use hashbrown::hash_map::DefaultHashBuilder;

/// Strategy injected into a `HashTable`.
///
/// `hash` and `equals` must agree: keys that compare equal must hash
/// equally. The table neither checks nor repairs violations of this
/// contract.
pub trait EntryPolicy<K, V> {
    fn hash(&self, key: &K) -> u64;

    fn equals(&self, a: &K, b: &K) -> bool;

    /// Called once for every key the table gives up: on replacement,
    /// removal and teardown.
    fn dispose_key(&self, key: K) {
        drop(key);
    }

    /// Counterpart of `dispose_key` for values.
    fn dispose_value(&self, value: V) {
        drop(value);
    }
}

/// Policy backed by `K: Hash + Eq` and a `BuildHasher`; disposal is a plain drop.
pub struct StdPolicy<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> StdPolicy<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<S: Default> Default for StdPolicy<S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<S: Clone> Clone for StdPolicy<S> {
    fn clone(&self) -> Self {
        Self::with_hasher(self.hasher.clone())
    }
}

impl<S> fmt::Debug for StdPolicy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdPolicy").finish_non_exhaustive()
    }
}

impl<K, V, S> EntryPolicy<K, V> for StdPolicy<S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

pub(crate) type HashFn<K> = Box<dyn Fn(&K) -> u64 + Send + Sync>;
pub(crate) type EqualsFn<K> = Box<dyn Fn(&K, &K) -> bool + Send + Sync>;
pub(crate) type DisposeFn<T> = Box<dyn Fn(T) + Send + Sync>;

/// Policy assembled from four closures by `TableBuilder`.
pub struct FnPolicy<K, V> {
    pub(crate) hash: HashFn<K>,
    pub(crate) equals: EqualsFn<K>,
    pub(crate) dispose_key: DisposeFn<K>,
    pub(crate) dispose_value: DisposeFn<V>,
    pub(crate) _pd: PhantomData<fn(K, V)>,
}

impl<K, V> fmt::Debug for FnPolicy<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy").finish_non_exhaustive()
    }
}

impl<K, V> EntryPolicy<K, V> for FnPolicy<K, V> {
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        (self.hash)(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        (self.equals)(a, b)
    }

    fn dispose_key(&self, key: K) {
        (self.dispose_key)(key)
    }

    fn dispose_value(&self, value: V) {
        (self.dispose_value)(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn std_policy_is_consistent_with_eq() {
        let p: StdPolicy = StdPolicy::default();
        let a = "key".to_string();
        let b = "key".to_string();
        assert!(EntryPolicy::<String, ()>::equals(&p, &a, &b));
        assert_eq!(
            EntryPolicy::<String, ()>::hash(&p, &a),
            EntryPolicy::<String, ()>::hash(&p, &b)
        );
        assert!(!EntryPolicy::<String, ()>::equals(&p, &a, &"other".to_string()));
    }

    #[test]
    fn fn_policy_forwards_to_closures() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let (dk, dv) = (disposed.clone(), disposed.clone());
        let p: FnPolicy<u32, u32> = FnPolicy {
            hash: Box::new(|k| u64::from(*k) * 3),
            equals: Box::new(|a, b| a == b),
            dispose_key: Box::new(move |_| {
                dk.fetch_add(1, Ordering::SeqCst);
            }),
            dispose_value: Box::new(move |_| {
                dv.fetch_add(10, Ordering::SeqCst);
            }),
            _pd: PhantomData,
        };
        assert_eq!(p.hash(&4), 12);
        assert!(p.equals(&1, &1));
        p.dispose_key(1);
        p.dispose_value(2);
        assert_eq!(disposed.load(Ordering::SeqCst), 11);
    }
}
