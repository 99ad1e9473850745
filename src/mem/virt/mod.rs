//! Address spaces and the per-page bits the frame manager relies on.
//!
//! The translation table's layout belongs to whoever implements
//! [TranslationTable]; the frame manager reads and flips individual bits
//! through the trait and never touches entries directly.

mod table;
mod wait;

pub use table::{EntryFlags, PageTable};
pub use wait::{begin_io, BeginIo};

use alloc::sync::{Arc, Weak};
use core::task::Waker;

use crate::mem::{FrameIndex, SwapSlot, Vpn};
use crate::util::sync::Spinlock;

/// Per-page state of an address space, as seen by the frame manager and the
/// fault handler. All methods panic on a page number outside the table.
pub trait TranslationTable: Send + Sync {
    /// The number of pages covered by the table.
    fn len(&self) -> usize;

    /// Whether the page was accessed since the bit was last cleared.
    fn referenced(&self, vpn: Vpn) -> bool;
    fn set_referenced(&self, vpn: Vpn);
    fn clear_referenced(&self, vpn: Vpn);

    /// Whether the page was written since it was last read in.
    fn modified(&self, vpn: Vpn) -> bool;
    fn clear_modified(&self, vpn: Vpn);

    /// Whether accesses to the page may use its frame.
    fn valid(&self, vpn: Vpn) -> bool;
    fn set_valid(&self, vpn: Vpn);
    fn clear_valid(&self, vpn: Vpn);

    /// Whether a swap transfer of the page is in flight.
    fn io_busy(&self, vpn: Vpn) -> bool;
    /// Set the I/O-busy bit if it is clear. Returns whether it was set by
    /// this call.
    fn try_begin_io(&self, vpn: Vpn) -> bool;
    /// Clear the I/O-busy bit and wake everyone waiting on it.
    fn end_io(&self, vpn: Vpn);
    /// Wake `waker` at the next [end_io](TranslationTable::end_io) of the
    /// page.
    fn wait_io(&self, vpn: Vpn, waker: &Waker);

    /// Whether the page has a copy in swap.
    fn swapped(&self, vpn: Vpn) -> bool;
    fn set_swapped(&self, vpn: Vpn);
    fn swap_slot(&self, vpn: Vpn) -> Option<SwapSlot>;
    fn set_swap_slot(&self, vpn: Vpn, slot: SwapSlot);

    /// The frame the page was last mapped to.
    fn frame(&self, vpn: Vpn) -> Option<FrameIndex>;
    fn map(&self, vpn: Vpn, frame: FrameIndex);
}

make_id!(pub SpaceId);

/// An address space. Its translation table is dropped at teardown, while
/// frames may still hold weak references to the space.
pub struct AddressSpace {
    id: SpaceId,
    table: Spinlock<Option<Arc<dyn TranslationTable>>>,
}

impl AddressSpace {
    pub fn new(table: Arc<dyn TranslationTable>) -> Arc<AddressSpace> {
        Arc::new(AddressSpace {
            id: SpaceId::new(),
            table: Spinlock::new(Some(table)),
        })
    }

    pub fn id(&self) -> SpaceId {
        self.id
    }

    /// The translation table, unless the space was torn down.
    pub fn table(&self) -> Option<Arc<dyn TranslationTable>> {
        self.table.lock().clone()
    }

    /// Drop the translation table. Frames still owned by the space are left
    /// for the caller to release.
    pub fn teardown(&self) -> Option<Arc<dyn TranslationTable>> {
        self.table.lock().take()
    }
}

/// A non-owning reference from a frame to the address space using it.
#[derive(Clone)]
pub struct Owner {
    id: SpaceId,
    space: Weak<AddressSpace>,
}

impl Owner {
    pub fn new(space: &Arc<AddressSpace>) -> Owner {
        Owner {
            id: space.id(),
            space: Arc::downgrade(space),
        }
    }

    pub fn id(&self) -> SpaceId {
        self.id
    }

    /// The owner's translation table, if both the space and its table are
    /// still alive.
    pub fn table(&self) -> Option<Arc<dyn TranslationTable>> {
        self.space.upgrade().and_then(|space| space.table())
    }
}
