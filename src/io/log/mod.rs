// Logging facilities. All log output is printed to the installed console, if
// any.

use core::fmt;

mod logger;


use crate::util::sync::Spinlock;

/// A sink for kernel output. The serial line or debug port on real hardware,
/// standard error or a capture buffer when hosted.
pub trait Console: Sync {
    fn write_fmt(&self, args: fmt::Arguments);
}

static CONSOLE: Spinlock<Option<&'static dyn Console>> = Spinlock::new(None);

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    let console = *CONSOLE.lock();
    if let Some(console) = console {
        console.write_fmt(args);
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::io::log::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

/// Install the console and the global logger. Later calls only replace the
/// console.
pub fn init(console: &'static dyn Console) {
    *CONSOLE.lock() = Some(console);

    logger::init();
}
