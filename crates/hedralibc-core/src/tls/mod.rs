//! Thread-local-storage image installation.
//!
//! At process launch the loader publishes one read-only [`TlsDescriptor`]
//! naming the initial TLS image. Each thread, once, copies that image into
//! its own reserved TLS page so the image ends flush with the end of the
//! page — the layout the rest of the runtime assumes when it addresses
//! thread locals backwards from the page end.
//!
//! The destination is reached through the calling thread's dynamic thread
//! vector: slot [`DTV_TLS_REGION`] holds the base address of a region of at
//! least [`TLS_PAGE_SIZE`] bytes, established by the thread-start sequence.
//! An oversized descriptor is rejected here rather than allowed to overwrite
//! whatever sits past the region.

#![allow(unsafe_code)]

use crate::errno::RuntimeError;
use crate::tcb::{self, DTV_SLOTS, Tcb};

/// Size of the reserved per-thread TLS page.
pub const TLS_PAGE_SIZE: usize = 4096;

/// Dynamic-thread-vector slot holding the thread's TLS region base.
pub const DTV_TLS_REGION: usize = 1;

/// Process-launch metadata describing the initial TLS image.
///
/// Produced once by the loading collaborator before any thread runs;
/// consumed once per thread start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsDescriptor {
    /// Source address of the image.
    pub base: usize,
    /// Image length in bytes.
    pub len: usize,
}

/// Installs the process TLS image into the calling thread's TLS region.
///
/// Copies `descriptor.len` bytes so that the image ends at the end of the
/// thread's reserved page. A zero-length descriptor is a no-op; a
/// descriptor longer than [`TLS_PAGE_SIZE`] is rejected with
/// [`RuntimeError::TlsImageTooLarge`]. Reinstalling the same descriptor
/// re-copies the same source bytes, so the operation is idempotent; calling
/// it once per thread lifetime is the caller's responsibility.
///
/// # Safety
///
/// The caller must guarantee that:
/// - `descriptor.base` points to at least `descriptor.len` readable bytes,
/// - the calling thread's dtv slot [`DTV_TLS_REGION`] points to a writable
///   region of at least [`TLS_PAGE_SIZE`] bytes.
pub unsafe fn install_tls(descriptor: &TlsDescriptor) -> Result<(), RuntimeError> {
    if descriptor.len == 0 {
        return Ok(());
    }
    if descriptor.len > TLS_PAGE_SIZE {
        return Err(RuntimeError::TlsImageTooLarge {
            len: descriptor.len,
            capacity: TLS_PAGE_SIZE,
        });
    }
    let region = tcb::resolve_current().dtv(DTV_TLS_REGION);
    let destination = region + TLS_PAGE_SIZE - descriptor.len;
    // SAFETY: the length was bounds-checked against the page above; source
    // and destination validity is the caller's contract.
    unsafe {
        copy_image(
            descriptor.base as *const u8,
            destination as *mut u8,
            descriptor.len,
        );
    }
    Ok(())
}

/// The single raw copy behind [`install_tls`]. Every byte moved by this
/// module goes through here, after the bounds check.
#[inline]
unsafe fn copy_image(src: *const u8, dst: *mut u8, len: usize) {
    // SAFETY: caller upholds validity of both ranges; the source image and
    // a thread's own TLS page never overlap.
    unsafe { core::ptr::copy_nonoverlapping(src, dst, len) }
}

/// Rewrites `child`'s dynamic thread vector from `parent`'s, rebasing every
/// module address from the parent's TLS region onto the child's.
///
/// This is the vector handoff a thread-start sequence performs after
/// reserving the child's region: entry counts are copied as-is, addresses
/// are translated by the distance between the two regions. The child's
/// [`DTV_TLS_REGION`] slot must already be set.
pub fn rebase_dtv(parent: &Tcb, child: &Tcb) {
    let parent_region = parent.dtv(DTV_TLS_REGION);
    let child_region = child.dtv(DTV_TLS_REGION);
    let count = parent.dtv(0).min(DTV_SLOTS - 1);
    child.set_dtv(0, count);
    for slot in 2..=count {
        let rebased = parent
            .dtv(slot)
            .wrapping_sub(parent_region)
            .wrapping_add(child_region);
        child.set_dtv(slot, rebased);
    }
}
