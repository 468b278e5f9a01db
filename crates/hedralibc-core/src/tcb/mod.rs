//! Thread control blocks and the registry that resolves them.
//!
//! Every other component in this crate starts by asking "whose state am I
//! touching?" — the answer is always [`resolve_current`]. Resolution is
//! backed by a static arena of fixed slots, open-addressed by kernel TID,
//! so it never allocates, never blocks, and never fails. A thread claims a
//! slot with one CAS the first time it resolves itself and frees it again
//! through [`release_current`] on the way out.
//!
//! A TCB is owned by its thread: the registry hands out shared references,
//! but only the owning thread mutates the errno slot, the dynamic thread
//! vector, and the cleanup list. The atomics exist for the registry's
//! claim/release protocol, not for cross-thread mutation.

use core::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use crate::cleanup;
use crate::sys;

/// Number of dynamic-thread-vector entries per TCB.
///
/// Slot 0 holds the module count, slot 1 the thread's TLS region; the rest
/// are per-module base addresses.
pub const DTV_SLOTS: usize = 16;

/// Maximum concurrent threads tracked by the registry.
const TCB_SLOTS: usize = 1024;

/// Per-thread control block.
///
/// One instance per live thread, created on first resolution and destroyed
/// (returned to the arena) at thread exit.
pub struct Tcb {
    /// Kernel TID owning this slot; 0 marks the slot free.
    tid: AtomicI32,
    /// Per-thread error code.
    errno: AtomicI32,
    /// Dynamic thread vector: indexed table of TLS module base addresses.
    dtv: [AtomicUsize; DTV_SLOTS],
    /// Head of the cleanup-handler list (`*mut CleanupNode` as usize).
    cleanup_head: AtomicUsize,
}

impl Tcb {
    const fn empty() -> Self {
        Self {
            tid: AtomicI32::new(0),
            errno: AtomicI32::new(0),
            dtv: [const { AtomicUsize::new(0) }; DTV_SLOTS],
            cleanup_head: AtomicUsize::new(0),
        }
    }

    /// The kernel TID this block belongs to.
    pub fn tid(&self) -> i32 {
        self.tid.load(Ordering::Acquire)
    }

    /// Reads this thread's errno slot.
    pub fn errno(&self) -> i32 {
        self.errno.load(Ordering::Acquire)
    }

    /// Writes this thread's errno slot.
    pub fn set_errno(&self, value: i32) {
        self.errno.store(value, Ordering::Release);
    }

    /// Reads a dynamic-thread-vector entry.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= DTV_SLOTS`.
    pub fn dtv(&self, slot: usize) -> usize {
        assert!(slot < DTV_SLOTS, "dtv slot {slot} out of range");
        self.dtv[slot].load(Ordering::Acquire)
    }

    /// Writes a dynamic-thread-vector entry.
    ///
    /// Only the owning thread may call this.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= DTV_SLOTS`.
    pub fn set_dtv(&self, slot: usize, value: usize) {
        assert!(slot < DTV_SLOTS, "dtv slot {slot} out of range");
        self.dtv[slot].store(value, Ordering::Release);
    }

    pub(crate) fn cleanup_head(&self) -> &AtomicUsize {
        &self.cleanup_head
    }

    fn reset(&self) {
        self.errno.store(0, Ordering::Release);
        for slot in &self.dtv {
            slot.store(0, Ordering::Release);
        }
        self.cleanup_head.store(0, Ordering::Release);
    }
}

/// The slot arena. Static so that resolution is allocation-free from any
/// code path, including error paths.
static TCBS: [Tcb; TCB_SLOTS] = [const { Tcb::empty() }; TCB_SLOTS];

/// Shared fallback block handed out if the arena is ever exhausted.
///
/// Threads landing here lose per-thread errno/TLS isolation but keep
/// working; 1024 slots makes this a theoretical path.
static FALLBACK: Tcb = Tcb::empty();

/// Resolves the calling thread's control block.
///
/// O(1) expected (one hash probe), allocation-free, non-blocking, and
/// infallible: a thread resolving itself for the first time claims a free
/// slot with a single CAS.
pub fn resolve_current() -> &'static Tcb {
    resolve(sys::thread_id())
}

fn resolve(tid: i32) -> &'static Tcb {
    let start = (tid as u32 as usize) % TCB_SLOTS;
    for i in 0..TCB_SLOTS {
        let idx = (start + i) % TCB_SLOTS;
        let current = TCBS[idx].tid.load(Ordering::Acquire);
        if current == tid {
            return &TCBS[idx];
        }
        if current == 0 {
            // Free slot: claim it. Only the owning thread registers its own
            // TID, so a lost race means another thread took the slot and we
            // keep probing.
            if TCBS[idx]
                .tid
                .compare_exchange(0, tid, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return &TCBS[idx];
            }
        }
    }
    &FALLBACK
}

/// Thread-exit teardown for the calling thread.
///
/// Runs every pending cleanup handler (most recent first), clears the
/// block's fields, and frees the slot for TID reuse. After this call the
/// thread must not touch its old TCB; a later [`resolve_current`] claims a
/// fresh slot.
pub fn release_current() {
    let tid = sys::thread_id();
    let tcb = resolve(tid);
    cleanup::run_all(tcb);
    tcb.reset();
    // Freeing the slot is the last store so no other probe can observe a
    // half-cleared block under this TID.
    tcb.tid.store(0, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_is_stable_within_a_thread() {
        std::thread::spawn(|| {
            let a = resolve_current() as *const Tcb;
            let b = resolve_current() as *const Tcb;
            assert_eq!(a, b, "same thread must resolve the same block");
            release_current();
        })
        .join()
        .unwrap();
    }

    #[test]
    fn resolution_records_the_callers_tid() {
        std::thread::spawn(|| {
            assert_eq!(resolve_current().tid(), sys::thread_id());
            release_current();
        })
        .join()
        .unwrap();
    }

    #[test]
    fn concurrent_threads_never_share_a_block() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    let ptr = resolve_current() as *const Tcb as usize;
                    // Hold the slot long enough for every thread to resolve.
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    release_current();
                    ptr
                })
            })
            .collect();
        let mut ptrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ptrs.sort_unstable();
        ptrs.dedup();
        assert_eq!(ptrs.len(), 8, "live threads must own distinct blocks");
    }

    #[test]
    fn errno_is_isolated_per_thread() {
        std::thread::spawn(|| {
            resolve_current().set_errno(42);
            let observed = std::thread::spawn(|| {
                let value = resolve_current().errno();
                release_current();
                value
            })
            .join()
            .unwrap();
            assert_eq!(observed, 0, "a fresh thread starts with errno 0");
            assert_eq!(resolve_current().errno(), 42);
            release_current();
        })
        .join()
        .unwrap();
    }

    #[test]
    fn release_clears_the_block_for_reuse() {
        std::thread::spawn(|| {
            let tcb = resolve_current();
            tcb.set_errno(7);
            tcb.set_dtv(1, 0xBEEF);
            release_current();

            let again = resolve_current();
            assert_eq!(again.errno(), 0);
            assert_eq!(again.dtv(1), 0);
            release_current();
        })
        .join()
        .unwrap();
    }

    #[test]
    fn dtv_slot_bounds_are_enforced() {
        let panicked = std::thread::spawn(|| {
            let tcb = resolve_current();
            let caught = std::panic::catch_unwind(|| tcb.dtv(DTV_SLOTS));
            release_current();
            caught.is_err()
        })
        .join()
        .unwrap();
        assert!(panicked, "dtv access past DTV_SLOTS must panic");
    }
}
