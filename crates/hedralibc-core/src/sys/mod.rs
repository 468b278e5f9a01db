//! Execution-environment shims.
//!
//! Each function here forwards its arguments to one host primitive and
//! translates a failing return into an errno code. Nothing in this module
//! retries, caches, or blocks; the substrate consumes these as opaque,
//! status-reporting operations.

#![allow(unsafe_code)]

use core::ptr;

/// A blocked-signal set, in the host's serialized representation.
pub type Sigset = libc::sigset_t;

/// Returns the kernel thread ID of the calling thread.
///
/// This is the identity the TCB registry keys on. The raw syscall is used
/// rather than a cached value so the shim stays correct across forks.
pub fn thread_id() -> i32 {
    // SAFETY: gettid takes no arguments and cannot fault.
    unsafe { libc::syscall(libc::SYS_gettid) as i32 }
}

/// Yields the processor — a cooperative hint to the scheduler.
///
/// Used by the spin lock between test-and-set retries.
pub fn yield_now() {
    // sched_yield cannot fail on Linux; the status is discarded.
    // SAFETY: no arguments, no memory touched.
    unsafe {
        libc::sched_yield();
    }
}

/// Writes the calling thread's currently-blocked signal set into `set`.
///
/// Returns the errno value reported by the host on failure.
pub fn current_sigmask_into(set: &mut Sigset) -> Result<(), i32> {
    // SAFETY: a null new-set pointer makes this a pure query; `set` is a
    // valid destination for the snapshot.
    let rc = unsafe { libc::pthread_sigmask(libc::SIG_SETMASK, ptr::null(), set) };
    if rc != 0 { Err(rc) } else { Ok(()) }
}

/// Replaces the calling thread's blocked signal set with `set`.
pub fn set_sigmask(set: &Sigset) -> Result<(), i32> {
    // SAFETY: `set` is a valid source; the old-set pointer may be null.
    let rc = unsafe { libc::pthread_sigmask(libc::SIG_SETMASK, set, ptr::null_mut()) };
    if rc != 0 { Err(rc) } else { Ok(()) }
}

/// Returns an empty signal set.
pub fn empty_sigset() -> Sigset {
    // SAFETY: sigemptyset initializes the set before it is read.
    unsafe {
        let mut set: Sigset = core::mem::zeroed();
        libc::sigemptyset(&mut set);
        set
    }
}
