//! Basic types for dealing with pages and frames.

use core::fmt::{self, Display, Formatter};

/// The number of a physical frame, in `[0, frame_count)`.
pub type FrameIndex = usize;

/// A virtual page number within one address space.
pub type Vpn = usize;

/// A location in the swap store holding the contents of one page.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwapSlot(usize);

impl SwapSlot {
    pub const fn new(raw: usize) -> SwapSlot {
        SwapSlot(raw)
    }

    pub const fn raw(&self) -> usize {
        self.0
    }
}

impl Display for SwapSlot {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SwapSlot({})", self.0)
    }
}
