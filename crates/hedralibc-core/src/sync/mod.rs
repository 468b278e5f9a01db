//! Cross-thread synchronization primitives.
//!
//! The spin lock and the counting semaphore are the only objects in this
//! crate designed to be shared between threads (and, for the semaphore,
//! optionally between processes). The mutex is the substrate's first
//! consumer: an attribute record in front of the spin lock.

pub mod mutex;
pub mod sem;
pub mod spin;

pub use mutex::{Mutex, MutexAttr};
pub use sem::Semaphore;
pub use spin::SpinLock;
