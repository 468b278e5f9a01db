//! Mutexes: an attribute record in front of the spin lock.
//!
//! Locking delegates entirely to [`SpinLock`]; the attribute block records
//! the requested kind and sharing so later phases (error checking,
//! recursion) have somewhere to hang their state.

use crate::sync::spin::SpinLock;

/// Default mutex kind.
pub const MUTEX_DEFAULT: i32 = 0;
/// Error-checking mutex — would report a relock by the owner.
pub const MUTEX_ERRORCHECK: i32 = 1;
/// Normal mutex — no error checking, no recursive locking.
pub const MUTEX_NORMAL: i32 = 2;
/// Recursive mutex — the owner could re-lock without deadlock.
pub const MUTEX_RECURSIVE: i32 = 3;

/// Returns true if `kind` is a recognized mutex kind.
#[must_use]
pub const fn valid_mutex_kind(kind: i32) -> bool {
    matches!(
        kind,
        MUTEX_DEFAULT | MUTEX_ERRORCHECK | MUTEX_NORMAL | MUTEX_RECURSIVE
    )
}

/// Sanitize a mutex kind: unknown values fall back to the default.
#[must_use]
pub const fn sanitize_mutex_kind(kind: i32) -> i32 {
    if valid_mutex_kind(kind) { kind } else { MUTEX_DEFAULT }
}

/// Mutex creation attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexAttr {
    /// One of the `MUTEX_*` kinds.
    pub kind: i32,
    /// Whether the mutex is shared across processes.
    pub pshared: bool,
}

impl Default for MutexAttr {
    fn default() -> Self {
        Self {
            kind: MUTEX_DEFAULT,
            pshared: false,
        }
    }
}

/// A mutual-exclusion lock with creation attributes.
pub struct Mutex {
    attr: MutexAttr,
    lock: SpinLock,
}

impl Mutex {
    /// A new mutex with default attributes, unlocked. Const so mutexes can
    /// live in statics.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attr: MutexAttr {
                kind: MUTEX_DEFAULT,
                pshared: false,
            },
            lock: SpinLock::new(),
        }
    }

    /// Reinitializes with the given attributes (defaults when `None`),
    /// sanitizing an unknown kind.
    pub fn init(&mut self, attr: Option<&MutexAttr>) {
        self.attr = attr.copied().unwrap_or_default();
        self.attr.kind = sanitize_mutex_kind(self.attr.kind);
        self.lock = SpinLock::new();
    }

    /// The attributes this mutex was created with.
    pub fn attr(&self) -> &MutexAttr {
        &self.attr
    }

    /// Acquires the mutex, spinning until it is free.
    pub fn lock(&self) {
        self.lock.acquire();
    }

    /// One acquisition attempt; returns whether it succeeded.
    pub fn try_lock(&self) -> bool {
        self.lock.try_acquire()
    }

    /// Releases the mutex. Precondition: the caller holds it.
    pub fn unlock(&self) {
        self.lock.release();
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}
