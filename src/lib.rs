//! Physical memory management for a small teaching kernel.
//!
//! A fixed pool of frames is multiplexed across address spaces. Frames are
//! allocated on demand, reclaimed with a clock (second-chance) scan when the
//! pool runs dry, and written back to swap on the way out. See
//! [PhysicalMemory](mem::phys::PhysicalMemory) for the allocation protocol
//! and [resolve](mem::fault::resolve) for its main caller.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(test, allow(unused_imports))]

extern crate alloc;

#[macro_use]
mod util;

pub mod config;
pub mod consts;
mod err;
pub mod int;
pub mod io;
pub mod mem;
pub mod task;

pub use config::{Config, ConfigError};
pub use mem::phys::{FrameInfo, PhysicalMemory};
pub use mem::{Context, FrameIndex, SwapSlot, Vpn};

pub use util::sync::{Spinlock, SpinlockGuard};

use log_crate::info;

/// Install the console and logger and announce ourselves.
pub fn init(console: &'static dyn io::log::Console) {
    io::log::init(console);
    info!("This is {} v{}", consts::NAME, consts::VERSION);
}
