//! Debug-only reentrancy check for map entry points.
//!
//! `BucketHashMap` calls into user code (`K: Hash`, `K: Eq`) while it walks
//! or relinks a chain. If that code finds its way back into the same map,
//! the chain could be observed half-linked. In debug builds, a nested entry
//! panics and names both operations involved. In release builds the check
//! compiles away.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Per-map record of the entry point currently running, if any.
#[derive(Debug)]
pub(crate) struct ReentrancyCheck {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // Single-threaded: keeps the owning map !Send + !Sync.
    _local: PhantomData<*mut ()>,
}

impl ReentrancyCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _local: PhantomData,
        }
    }

    /// Marks `op` as running until the returned guard drops.
    #[inline]
    pub(crate) fn enter(&self, op: &'static str) -> Entered<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.replace(Some(op)) {
                panic!("reentrant call into BucketHashMap::{op} while {outer} is running");
            }
            return Entered { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            return Entered { _owner: PhantomData };
        }
    }
}

impl Default for ReentrancyCheck {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Entered<'a> {
    #[cfg(debug_assertions)]
    owner: &'a ReentrancyCheck,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a ()>,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let prev = self.owner.active.take();
            debug_assert!(prev.is_some());
        }
    }
}
