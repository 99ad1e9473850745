// Global constants and configuration defaults.

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("GIT_HASH"));

/// Default number of physical frames.
pub const NUM_PHYS_PAGES: usize = 20;
/// Default size of a page (and a frame) in bytes.
pub const PAGE_SIZE: usize = 128;
/// Default number of virtual pages per address space.
pub const MAX_VIRTUAL_PAGES: usize = 1024;
