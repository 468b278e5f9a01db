//! Per-thread cleanup-handler stack.
//!
//! Each thread owns a LIFO list of pending handlers, anchored in its TCB and
//! run in reverse-of-push order at scope exit or thread exit. The list is
//! thread-local by construction — only the owning thread pushes and pops —
//! so no synchronization is needed beyond the TCB's storage.
//!
//! Nodes are carved straight out of the allocator so that an allocation
//! refusal surfaces as [`RuntimeError::AllocationFailed`] instead of an
//! abort: a half-constructed cleanup scope cannot be safely resumed.

#![allow(unsafe_code)]

use core::sync::atomic::Ordering;
use std::alloc::{Layout, alloc, dealloc};

use crate::errno::RuntimeError;
use crate::tcb::{self, Tcb};

/// One pending handler. Owned by the pushing thread, linked head-first.
struct CleanupNode {
    handler: fn(usize),
    argument: usize,
    next: *mut CleanupNode,
}

/// Pushes a cleanup handler for the calling thread.
///
/// The handler becomes the new head of the thread's cleanup list; it will be
/// the first to run. Fails only if the allocator refuses the node.
pub fn push(handler: fn(usize), argument: usize) -> Result<(), RuntimeError> {
    let tcb = tcb::resolve_current();
    let layout = Layout::new::<CleanupNode>();
    // SAFETY: CleanupNode has non-zero size.
    let node = unsafe { alloc(layout) } as *mut CleanupNode;
    if node.is_null() {
        return Err(RuntimeError::AllocationFailed);
    }
    let head = tcb.cleanup_head().load(Ordering::Acquire) as *mut CleanupNode;
    // SAFETY: `node` is a fresh, properly-aligned allocation for CleanupNode.
    unsafe {
        node.write(CleanupNode {
            handler,
            argument,
            next: head,
        });
    }
    tcb.cleanup_head().store(node as usize, Ordering::Release);
    Ok(())
}

/// Pops the calling thread's most recently pushed handler.
///
/// If `execute` is true the handler runs, with its stored argument, before
/// the node's memory is released.
///
/// Popping an empty stack is a contract violation — every push must be
/// paired with exactly one pop on the same thread. It is debug-asserted and
/// a no-op in release builds.
pub fn pop(execute: bool) {
    pop_on(tcb::resolve_current(), execute);
}

fn pop_on(tcb: &Tcb, execute: bool) {
    let head = tcb.cleanup_head().load(Ordering::Acquire) as *mut CleanupNode;
    if head.is_null() {
        debug_assert!(false, "cleanup pop on an empty stack");
        return;
    }
    // SAFETY: a non-null head was written by push on this same thread and
    // has not been freed; reading it out transfers ownership to this frame.
    let node = unsafe { head.read() };
    tcb.cleanup_head().store(node.next as usize, Ordering::Release);
    if execute {
        (node.handler)(node.argument);
    }
    // SAFETY: `head` came from `alloc` with this exact layout and is
    // unlinked, so nothing can reach it after this point.
    unsafe { dealloc(head as *mut u8, Layout::new::<CleanupNode>()) };
}

/// Number of handlers currently pending for the calling thread.
pub fn depth() -> usize {
    let mut count = 0;
    let mut node =
        tcb::resolve_current().cleanup_head().load(Ordering::Acquire) as *const CleanupNode;
    while !node.is_null() {
        count += 1;
        // SAFETY: list nodes are live until popped by this same thread.
        node = unsafe { (*node).next };
    }
    count
}

/// Runs and releases every pending handler on `tcb`, most recent first.
///
/// Thread-exit path; called by [`tcb::release_current`].
pub(crate) fn run_all(tcb: &Tcb) {
    while tcb.cleanup_head().load(Ordering::Acquire) != 0 {
        pop_on(tcb, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes the tests in this module: they all record through LOG.
    static TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

    /// Invocation log shared with the handlers under test.
    static LOG: Mutex<Vec<usize>> = Mutex::new(Vec::new());

    fn record(argument: usize) {
        LOG.lock().unwrap().push(argument);
    }

    fn take_log() -> Vec<usize> {
        std::mem::take(&mut *LOG.lock().unwrap())
    }

    /// Handlers run on the spawned thread; the log mutex serializes tests
    /// that share it.
    fn on_fresh_thread<F: FnOnce() + Send + 'static>(body: F) {
        let _guard = TEST_LOCK.lock();
        std::thread::spawn(|| {
            body();
            tcb::release_current();
        })
        .join()
        .unwrap();
    }

    #[test]
    fn handlers_run_in_reverse_push_order() {
        on_fresh_thread(|| {
            let _ = take_log();
            push(record, 1).unwrap(); // A
            push(record, 2).unwrap(); // B
            push(record, 3).unwrap(); // C
            pop(true);
            pop(true);
            pop(true);
            assert_eq!(take_log(), vec![3, 2, 1], "LIFO law: C, B, A");
        });
    }

    #[test]
    fn pop_without_execute_skips_the_handler() {
        on_fresh_thread(|| {
            let _ = take_log();
            push(record, 10).unwrap();
            push(record, 20).unwrap();
            pop(false); // 20 discarded
            pop(true); // 10 runs
            assert_eq!(take_log(), vec![10]);
        });
    }

    #[test]
    fn depth_tracks_pushes_and_pops() {
        on_fresh_thread(|| {
            assert_eq!(depth(), 0);
            push(record, 0).unwrap();
            push(record, 0).unwrap();
            assert_eq!(depth(), 2);
            pop(false);
            assert_eq!(depth(), 1);
            pop(false);
            assert_eq!(depth(), 0);
            let _ = take_log();
        });
    }

    #[test]
    fn thread_exit_runs_pending_handlers_lifo() {
        let _guard = TEST_LOCK.lock();
        let _ = take_log();
        std::thread::spawn(|| {
            push(record, 100).unwrap();
            push(record, 200).unwrap();
            // No explicit pops: teardown drains the stack.
            tcb::release_current();
        })
        .join()
        .unwrap();
        assert_eq!(take_log(), vec![200, 100]);
    }

    #[test]
    fn handler_argument_is_preserved() {
        on_fresh_thread(|| {
            let _ = take_log();
            push(record, 0xCAFE).unwrap();
            pop(true);
            assert_eq!(take_log(), vec![0xCAFE]);
        });
    }

    #[test]
    fn interleaved_scopes_nest() {
        on_fresh_thread(|| {
            let _ = take_log();
            push(record, 1).unwrap();
            {
                push(record, 2).unwrap();
                pop(true);
            }
            push(record, 3).unwrap();
            pop(true);
            pop(true);
            assert_eq!(take_log(), vec![2, 3, 1]);
        });
    }
}
