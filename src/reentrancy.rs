//! Debug-only reentrancy guard.
//!
//! Detects a thread re-entering a table from user code that runs while the
//! table's lock is held (`equals`, `for_each` visitors, `Debug` impls
//! formatted by `dump`). Keys are hashed before the lock is taken. With a
//! reader/writer lock such reentry deadlocks or corrupts lock fairness, so
//! debug builds panic instead. Each thread records the tables it is
//! currently inside; release builds compile this to a no-op.

#[cfg(not(debug_assertions))]
use core::marker::PhantomData;
#[cfg(debug_assertions)]
use std::cell::RefCell;

#[cfg(debug_assertions)]
std::thread_local! {
    static ENTERED: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Per-instance reentrancy tracker. Embed this in a table and guard public
/// entry-points with `let _g = self.reentrancy.enter();`.
#[derive(Debug, Default)]
pub struct DebugReentrancy {
    // Gives each tracker a distinct address to identify it by.
    #[cfg(debug_assertions)]
    _anchor: u8,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            _anchor: 0,
        }
    }

    #[cfg(debug_assertions)]
    fn id(&self) -> usize {
        self as *const Self as usize
    }

    /// Enter a guarded section. In debug builds, panics if the current
    /// thread is already inside this tracker's section.
    #[inline]
    pub fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let id = self.id();
            ENTERED.with(|entered| {
                let mut entered = entered.borrow_mut();
                assert!(
                    !entered.contains(&id),
                    "reentrancy detected: nested entry into hash table"
                );
                entered.push(id);
            });
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return ReentrancyGuard { _z: PhantomData };
        }
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl<'a> Drop for ReentrancyGuard<'a> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let id = self.owner.id();
            ENTERED.with(|entered| {
                let mut entered = entered.borrow_mut();
                if let Some(pos) = entered.iter().rposition(|&e| e == id) {
                    entered.swap_remove(pos);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn enter_and_exit_is_ok() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter();
        }
        let _g = r.enter();
    }

    #[test]
    fn distinct_trackers_nest() {
        let a = DebugReentrancy::new();
        let b = DebugReentrancy::new();
        let _ga = a.enter();
        let _gb = b.enter();
    }

    #[test]
    fn other_threads_are_independent() {
        let r = DebugReentrancy::new();
        let _g = r.enter();
        std::thread::scope(|s| {
            s.spawn(|| {
                let _g = r.enter();
            });
        });
    }

    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g1 = r.enter();
            let _g2 = r.enter();
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
        // The unwound guard released its entry.
        let _g = r.enter();
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn reentrancy_noop_in_release() {
        let r = DebugReentrancy::new();
        let _g1 = r.enter();
        let _g2 = r.enter();
    }
}
