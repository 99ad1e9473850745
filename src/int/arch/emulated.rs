//! A software interrupt flag for hosted builds, where the real flag is not
//! ours to touch.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(true);

pub fn cli() {
    ENABLED.store(false, Ordering::SeqCst);
}

pub fn sti() {
    ENABLED.store(true, Ordering::SeqCst);
}

pub fn sti_hlt() {
    sti();
    spin_loop();
}

pub fn interrupts_enabled() -> bool {
    ENABLED.load(Ordering::SeqCst)
}
