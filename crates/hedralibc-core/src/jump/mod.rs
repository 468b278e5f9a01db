//! Non-local jumps (x86_64).
//!
//! [`capture`] snapshots the minimal execution state needed to resume at
//! its call site — the Sys V callee-saved registers, the stack pointer, and
//! the return address — and [`resume`] restores that snapshot so the
//! earlier capture appears to return a second time with a caller-chosen
//! value. The mask-aware pair additionally snapshots and restores the
//! thread's blocked-signal set; the mask is restored strictly before the
//! register state so the resumed code observes the correct mask from its
//! first instruction.
//!
//! This is a control-flow primitive, not an unwinder: a resume crosses
//! frames without running any cleanup. Callers needing their cleanup
//! handlers run must pop them before jumping.
//!
//! # Contract
//!
//! A context may be resumed any number of times, but only while the frame
//! that captured it is still live on some call path. Resuming after that
//! frame has returned is undefined behavior; it cannot be detected here.

#![allow(unsafe_code)]

use crate::sys::{self, Sigset};

/// Register offsets inside [`JumpContext::regs`], matched by the assembly
/// below: rbx, rbp, r12, r13, r14, r15, rsp, rip.
const REG_SLOTS: usize = 8;

/// An opaque snapshot of execution state.
///
/// The register file sits first and at fixed offsets (`repr(C)`); the
/// mask-aware extension — a flag word and a serialized signal set — follows
/// it and is only touched from Rust.
#[repr(C)]
pub struct JumpContext {
    regs: [u64; REG_SLOTS],
    /// Non-zero when `mask` holds a snapshot to restore.
    mask_saved: u64,
    mask: Sigset,
}

impl JumpContext {
    /// An empty context. Resuming it before a capture is undefined.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: [0; REG_SLOTS],
            mask_saved: 0,
            mask: sys::empty_sigset(),
        }
    }

    /// Whether a blocked-signal snapshot was recorded at capture time.
    pub fn mask_saved(&self) -> bool {
        self.mask_saved != 0
    }
}

impl Default for JumpContext {
    fn default() -> Self {
        Self::new()
    }
}

// Register capture and restore.
//
// Layout contract with JumpContext (repr(C)):
//   0x00 rbx   0x08 rbp   0x10 r12   0x18 r13
//   0x20 r14   0x28 r15   0x30 rsp   0x38 rip
//
// hedra_jump_capture saves the callee-saved set, the caller's post-return
// stack pointer, and the return address, then returns 0. hedra_jump_resume
// reloads them and jumps through the saved return address with the value in
// rax (0 coerced to 1, so the capture site can always distinguish the
// resumed return). hedra_jump_capture_mask records the signal mask via a
// helper, then tail-jumps into the plain capture so the snapshot still
// describes the original caller's frame.
core::arch::global_asm!(
    r#"
.global hedra_jump_capture
.p2align 4
hedra_jump_capture:
    mov [rdi + 0x00], rbx
    mov [rdi + 0x08], rbp
    mov [rdi + 0x10], r12
    mov [rdi + 0x18], r13
    mov [rdi + 0x20], r14
    mov [rdi + 0x28], r15
    lea rax, [rsp + 8]
    mov [rdi + 0x30], rax
    mov rax, [rsp]
    mov [rdi + 0x38], rax
    xor eax, eax
    ret

.global hedra_jump_capture_mask
.p2align 4
hedra_jump_capture_mask:
    push rdi
    call {record_sigmask}
    pop rdi
    jmp hedra_jump_capture

.global hedra_jump_resume
.p2align 4
hedra_jump_resume:
    mov rbx, [rdi + 0x00]
    mov rbp, [rdi + 0x08]
    mov r12, [rdi + 0x10]
    mov r13, [rdi + 0x18]
    mov r14, [rdi + 0x20]
    mov r15, [rdi + 0x28]
    mov rax, rsi
    test rax, rax
    jnz 2f
    mov eax, 1
2:
    mov rsp, [rdi + 0x30]
    jmp qword ptr [rdi + 0x38]
"#,
    record_sigmask = sym record_sigmask,
);

/// Called from `hedra_jump_capture_mask` with the original argument
/// registers intact, before the register snapshot is taken.
///
/// Must not unwind: it runs below an assembly frame.
unsafe extern "C" fn record_sigmask(ctx: *mut JumpContext, save_mask: i32) {
    // SAFETY: the assembly forwards the caller's context pointer, which the
    // public contract requires to be valid and exclusive.
    let ctx = unsafe { &mut *ctx };
    ctx.mask_saved = 0;
    if save_mask != 0 && sys::current_sigmask_into(&mut ctx.mask).is_ok() {
        ctx.mask_saved = 1;
    }
}

unsafe extern "C" {
    /// Saves the calling frame's execution state into `ctx`.
    ///
    /// Returns 0 on the direct call. When the context is later resumed,
    /// this call appears to return again with the resumer's value.
    ///
    /// # Safety
    ///
    /// `ctx` must be valid for writes. The snapshot is only meaningful
    /// while the calling frame is live; see the module contract.
    #[link_name = "hedra_jump_capture"]
    pub fn capture(ctx: *mut JumpContext) -> isize;

    /// Like [`capture`], additionally recording the thread's blocked-signal
    /// set when `save_mask` is non-zero.
    ///
    /// # Safety
    ///
    /// Same contract as [`capture`].
    #[link_name = "hedra_jump_capture_mask"]
    pub fn capture_with_mask(ctx: *mut JumpContext, save_mask: i32) -> isize;

    #[link_name = "hedra_jump_resume"]
    fn jump_resume_raw(ctx: *const JumpContext, value: isize) -> !;
}

/// Restores the state saved in `ctx`; the matching [`capture`] call appears
/// to return `value` (coerced to 1 if 0). Never returns to its caller.
///
/// # Safety
///
/// `ctx` must hold a snapshot whose capturing frame is still live. No
/// cleanup runs for the frames jumped over.
pub unsafe fn resume(ctx: &JumpContext, value: isize) -> ! {
    // SAFETY: forwarded caller contract.
    unsafe { jump_resume_raw(ctx, value) }
}

/// Mask-aware [`resume`]: first restores the blocked-signal set recorded at
/// capture time (if one was recorded), then restores the register state.
///
/// # Safety
///
/// Same contract as [`resume`].
pub unsafe fn resume_with_mask(ctx: &JumpContext, value: isize) -> ! {
    if ctx.mask_saved != 0 {
        // Restore the mask before any register state so the resumed code
        // observes it from its first instruction. A failed restore is
        // ignored: the jump itself must still happen.
        let _ = sys::set_sigmask(&ctx.mask);
    }
    // SAFETY: forwarded caller contract.
    unsafe { jump_resume_raw(ctx, value) }
}
