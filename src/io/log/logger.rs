//! Log formatting.

use log_crate::{Level, LevelFilter, Log, Metadata, Record};

/// Per-module log level overrides.
const LOG_LEVELS: [(&str, LevelFilter); 1] =
    [("syzygy_physmem::mem::phys::clock", LevelFilter::Trace)];

/// The global logger.
struct Logger {
    /// The current global level filter.
    level: LevelFilter,
}

impl Log for Logger {
    #[inline]
    fn enabled(&self, metadata: &Metadata) -> bool {
        let level = metadata.level();
        if level <= self.level {
            true
        } else {
            for (target, filter) in LOG_LEVELS.iter() {
                if metadata.target().starts_with(target) {
                    return level <= *filter;
                }
            }

            false
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        crate::println!(
            "{} ({}) --> {}",
            prefix(record.level()),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        // no-op
    }
}

impl Logger {
    fn the() -> &'static Logger {
        static LOGGER: Logger = Logger {
            level: LevelFilter::Debug,
        };

        &LOGGER
    }
}

pub(super) fn prefix(level: Level) -> char {
    match level {
        Level::Error => 'e',
        Level::Warn => 'w',
        Level::Info => 'i',
        Level::Debug => 'd',
        Level::Trace => 't',
    }
}

/// Strip the crate name from a log target.
pub(super) fn short_target(target: &str) -> &str {
    const MAIN: &str = "syzygy_physmem::";
    match target.strip_prefix(MAIN) {
        Some(rest) => rest,
        None if target == &MAIN[..MAIN.len() - 2] => "init",
        None => target,
    }
}

/// Initialize the logger.
pub fn init() {
    // Only the first call installs the logger; the console may be swapped
    // freely afterwards.
    if log_crate::set_logger(Logger::the()).is_ok() {
        log_crate::set_max_level(LevelFilter::Trace);
    }
}
