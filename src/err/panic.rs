//! Bare-metal panics.

use core::panic::PanicInfo;

use log_crate::error;

use crate::int;

/// A broken frame-table invariant ends up here. The message goes to the
/// log, and the processor sleeps with interrupts on so the console can
/// still drain.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    match info.location() {
        Some(at) => error!("Panicked at {}:{}: {}", at.file(), at.line(), info.message()),
        None => error!("Panicked: {}", info.message()),
    }

    int::halt_loop();
}
