//! Counting semaphore.
//!
//! A signed counter plus a process-shared flag, both set exactly once at
//! initialization. Only the increment side is implemented: [`post`] adds
//! one with release ordering so that writes made before a post are visible
//! to whoever later observes the raised count. Any future decrement must
//! pair it with acquire ordering and block rather than spin.

use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::errno::RuntimeError;

/// A counting semaphore.
pub struct Semaphore {
    value: AtomicI32,
    /// Whether the semaphore is shared across processes. Immutable after
    /// [`Semaphore::init`].
    pshared: AtomicBool,
}

impl Semaphore {
    /// A zeroed semaphore awaiting [`Semaphore::init`]. Const so semaphores
    /// can live in statics and shared mappings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: AtomicI32::new(0),
            pshared: AtomicBool::new(false),
        }
    }

    /// Initializes the counter and the process-shared flag.
    ///
    /// Must be called exactly once, before any other operation; the flag is
    /// immutable afterwards.
    pub fn init(&self, pshared: bool, initial: i32) {
        self.pshared.store(pshared, Ordering::Release);
        self.value.store(initial, Ordering::Release);
    }

    /// Current counter value.
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    /// Whether the semaphore was initialized as process-shared.
    pub fn process_shared(&self) -> bool {
        self.pshared.load(Ordering::Acquire)
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

/// Increments the semaphore's counter by one with release ordering.
///
/// A null (`None`) reference reports [`RuntimeError::InvalidArgument`]
/// without mutating anything. An increment that would overflow the counter
/// is rejected with [`RuntimeError::ValueOverflow`] — the counter never
/// wraps or saturates.
pub fn post(sem: Option<&Semaphore>) -> Result<(), RuntimeError> {
    let Some(sem) = sem else {
        return Err(RuntimeError::InvalidArgument);
    };
    let mut current = sem.value.load(Ordering::Relaxed);
    loop {
        if current == i32::MAX {
            return Err(RuntimeError::ValueOverflow);
        }
        match sem.value.compare_exchange_weak(
            current,
            current + 1,
            Ordering::Release,
            Ordering::Relaxed,
        ) {
            Ok(_) => return Ok(()),
            Err(observed) => current = observed,
        }
    }
}
