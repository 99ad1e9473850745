//! # Interrupt enable state
//!
//! The single-core atomicity primitive: a section of code that runs with
//! interrupts disabled cannot be interleaved with an interrupt handler, and
//! on a uniprocessor that is enough to make it indivisible.

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "x86_64", target_os = "none"))] {
        #[path = "arch/x86_64/mod.rs"]
        mod arch;
    } else {
        #[path = "arch/emulated.rs"]
        mod arch;
    }
}

pub use arch::interrupts_enabled as enabled;

use arch::{cli, sti, sti_hlt};

/// Disable interrupts and return whether they were previously enabled.
#[cfg(not(test))]
pub fn disable() -> bool {
    let ret = enabled();
    cli();
    ret
}

#[cfg(test)]
pub fn disable() -> bool {
    false
}

/// Enable interrupts and return whether they were previously enabled.
#[cfg(not(test))]
pub fn enable() -> bool {
    let ret = enabled();
    sti();
    ret
}

#[cfg(test)]
pub fn enable() -> bool {
    false
}

/// Restore a state previously returned by [disable].
#[inline]
pub fn restore(was_enabled: bool) {
    if was_enabled {
        enable();
    }
}

/// Enable interrupts and halt immediately.
#[cfg(not(test))]
pub fn enable_and_halt() {
    sti_hlt()
}

#[cfg(test)]
pub fn enable_and_halt() {}

/// Never return, sleeping between interrupts.
pub fn halt_loop() -> ! {
    loop {
        enable_and_halt();
    }
}
