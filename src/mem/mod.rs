pub mod fault;
pub mod phys;
pub mod swap;
mod types;
pub mod virt;

pub use types::{FrameIndex, SwapSlot, Vpn};

use alloc::sync::Arc;

use crate::config::Config;
use phys::MainMemory;
use swap::Swap;

/// What the memory manager needs from the rest of the machine.
pub struct Context {
    pub config: Config,
    pub memory: Arc<MainMemory>,
    pub swap: Arc<dyn Swap>,
}

impl Context {
    /// A context with fresh, zeroed main memory.
    pub fn new(config: Config, swap: Arc<dyn Swap>) -> Context {
        Context {
            memory: Arc::new(MainMemory::new(&config)),
            config,
            swap,
        }
    }
}
