//! Error number definitions.
//!
//! The per-thread errno value lives in the calling thread's control block
//! (see [`crate::tcb`]); the accessors here are thin reads and writes of that
//! slot. [`RuntimeError`] is the typed face of the same taxonomy: every
//! variant maps onto one errno constant.

use thiserror::Error;

use crate::tcb;

/// Well-known errno constants.
pub const EPERM: i32 = 1;
pub const ESRCH: i32 = 3;
pub const EINTR: i32 = 4;
pub const EAGAIN: i32 = 11;
pub const ENOMEM: i32 = 12;
pub const EFAULT: i32 = 14;
pub const EBUSY: i32 = 16;
pub const EINVAL: i32 = 22;
pub const EDEADLK: i32 = 35;
pub const ENOSYS: i32 = 38;
pub const ERANGE: i32 = 34;
pub const EOVERFLOW: i32 = 75;
pub const ETIMEDOUT: i32 = 110;

/// Failures the substrate can report.
///
/// Precondition violations (unpaired cleanup pop, release of an unheld lock,
/// resuming a dead jump context) are deliberately *not* represented here:
/// they are caller contract violations, debug-asserted where expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The allocator refused a cleanup-node allocation.
    #[error("cleanup node allocation failed")]
    AllocationFailed,

    /// A null object reference was passed where one is required.
    #[error("invalid argument")]
    InvalidArgument,

    /// A TLS descriptor reported more bytes than the reserved region holds.
    #[error("TLS image of {len} bytes exceeds the {capacity}-byte reserved region")]
    TlsImageTooLarge { len: usize, capacity: usize },

    /// A counter increment would overflow the counter's range.
    #[error("counter is at its maximum value")]
    ValueOverflow,
}

impl RuntimeError {
    /// The errno value this failure reports at a C-flavored boundary.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            RuntimeError::AllocationFailed => ENOMEM,
            RuntimeError::InvalidArgument => EINVAL,
            RuntimeError::TlsImageTooLarge { .. } => ERANGE,
            RuntimeError::ValueOverflow => EOVERFLOW,
        }
    }
}

/// Returns the calling thread's errno value.
pub fn get_errno() -> i32 {
    tcb::resolve_current().errno()
}

/// Sets the calling thread's errno value.
pub fn set_errno(value: i32) {
    tcb::resolve_current().set_errno(value);
}
