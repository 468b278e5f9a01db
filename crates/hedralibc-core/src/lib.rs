//! # hedralibc-core
//!
//! The thread-runtime substrate of a POSIX-flavored process model.
//!
//! This crate implements the per-thread machinery everything else in the
//! system stands on: control-block resolution, installation of the
//! process-launch TLS image, the LIFO cleanup-handler stack run at thread
//! exit, a spinning mutual-exclusion lock, a counting semaphore, and
//! non-local jumps with an optional blocked-signal-mask snapshot.
//!
//! Unsafe code is denied at the crate level and opted back in only by the
//! modules that touch raw memory or the execution environment directly.

#![deny(unsafe_code)]

#[allow(unsafe_code)]
pub mod cleanup;
pub mod errno;
#[allow(unsafe_code)]
#[cfg(target_arch = "x86_64")]
pub mod jump;
pub mod sync;
#[allow(unsafe_code)]
pub mod sys;
pub mod tcb;
#[allow(unsafe_code)]
pub mod tls;
