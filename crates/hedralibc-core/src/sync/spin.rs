//! Spinning mutual-exclusion lock.
//!
//! One shared word, two states, no owner field and no waiter queue: whoever
//! test-and-sets the word holds the lock until it clears it, and everyone
//! else retries with a yield between attempts. Unfair and unbounded, which
//! is the point — the footprint is one byte and the primitive suits only
//! short critical sections.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::sys;

/// A test-and-set spin lock.
pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    /// A new, unlocked lock. Const so locks can live in statics.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquires the lock, spinning until it is free.
    ///
    /// Each failed test-and-set yields the processor before retrying. There
    /// is no timeout and no iteration bound: a holder that never releases
    /// spins every other caller indefinitely.
    pub fn acquire(&self) {
        while self.locked.swap(true, Ordering::Acquire) {
            sys::yield_now();
        }
    }

    /// One test-and-set attempt. Never yields, never retries.
    ///
    /// Returns true if the caller now holds the lock.
    pub fn try_acquire(&self) -> bool {
        !self.locked.swap(true, Ordering::Acquire)
    }

    /// Releases the lock.
    ///
    /// Precondition: the caller holds the lock. Releasing an unheld lock is
    /// a contract violation, debug-asserted here.
    pub fn release(&self) {
        debug_assert!(
            self.locked.load(Ordering::Relaxed),
            "release of an unheld spin lock"
        );
        self.locked.store(false, Ordering::Release);
    }

    /// Whether the lock is currently held by someone.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}
