//! The swap store, as far as the frame manager is concerned.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use log_crate::trace;

use crate::mem::SwapSlot;
use crate::util::sync::Spinlock;

/// A page-granular backing store. Transfers either succeed or never return.
pub trait Swap: Send + Sync {
    /// Write a page. With `Some(slot)` the slot is overwritten; with `None` a
    /// new slot is assigned. Returns the slot written.
    fn put_page(&self, slot: Option<SwapSlot>, data: &[u8]) -> SwapSlot;

    /// Read the page held in `slot` into `buf`.
    fn get_page(&self, slot: SwapSlot, buf: &mut [u8]);
}

/// A swap store kept in kernel heap memory.
#[derive(Default)]
pub struct MemorySwap {
    pages: Spinlock<Vec<Box<[u8]>>>,
    writes: AtomicUsize,
}

impl MemorySwap {
    pub fn new() -> MemorySwap {
        MemorySwap::default()
    }

    /// The number of slots handed out so far.
    pub fn slots(&self) -> usize {
        self.pages.lock().len()
    }

    /// The number of pages written so far, new or overwritten.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Swap for MemorySwap {
    fn put_page(&self, slot: Option<SwapSlot>, data: &[u8]) -> SwapSlot {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut pages = self.pages.lock();

        match slot {
            Some(slot) => {
                let page = pages
                    .get_mut(slot.raw())
                    .unwrap_or_else(|| panic!("Write to unassigned {}.", slot));
                page.copy_from_slice(data);
                trace!("Rewrote {}.", slot);
                slot
            }
            None => {
                pages.push(data.into());
                let slot = SwapSlot::new(pages.len() - 1);
                trace!("Assigned {}.", slot);
                slot
            }
        }
    }

    fn get_page(&self, slot: SwapSlot, buf: &mut [u8]) {
        let pages = self.pages.lock();
        let page = pages
            .get(slot.raw())
            .unwrap_or_else(|| panic!("Read from unassigned {}.", slot));
        buf.copy_from_slice(page);
    }
}
