//! x86_64 interrupt flag.

use core::arch::asm;

/// Disable interrupts.
#[inline(always)]
pub fn cli() {
    unsafe { asm!("cli", options(nomem, nostack)) }
}

/// Enable interrupts.
#[inline(always)]
pub fn sti() {
    unsafe { asm!("sti", options(nomem, nostack)) }
}

/// Enable interrupts and halt until the next one arrives.
#[inline(always)]
pub fn sti_hlt() {
    unsafe { asm!("sti; hlt", options(nomem, nostack)) }
}

/// Check whether interrupts are currently enabled.
pub fn interrupts_enabled() -> bool {
    let flags: u64;
    unsafe { asm!("pushfq", "pop {}", out(reg) flags) };

    flags & (1 << 9) != 0
}
