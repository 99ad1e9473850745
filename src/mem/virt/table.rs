//! A flat, software-walked translation table.

use alloc::vec;
use alloc::vec::Vec;
use core::task::Waker;

use bitflags::bitflags;
use hashbrown::HashMap;

use super::TranslationTable;
use crate::mem::{FrameIndex, SwapSlot, Vpn};
use crate::util::sync::Spinlock;

bitflags! {
    /// Per-page state bits.
    pub struct EntryFlags: u8 {
        /// The mapping may be used.
        const VALID = 1 << 0;
        /// Set on access, cleared by the clock scan.
        const REFERENCED = 1 << 1;
        /// Set on write, cleared when the page is read in from swap.
        const MODIFIED = 1 << 2;
        /// A swap transfer of the page is in flight.
        const IO = 1 << 3;
        /// The page has a copy in swap.
        const SWAP = 1 << 4;
        const READ_ALLOWED = 1 << 5;
        const WRITE_ALLOWED = 1 << 6;
    }
}

#[derive(Copy, Clone)]
struct Entry {
    flags: EntryFlags,
    frame: Option<FrameIndex>,
    swap_slot: Option<SwapSlot>,
}

impl Entry {
    const EMPTY: Entry = Entry {
        flags: EntryFlags::empty(),
        frame: None,
        swap_slot: None,
    };
}

/// A translation table with one entry per virtual page.
pub struct PageTable {
    entries: Spinlock<Vec<Entry>>,
    io_waiters: Spinlock<HashMap<Vpn, Vec<Waker>>>,
}

impl PageTable {
    /// A table of `pages` entries, all unmapped, readable and writable.
    pub fn new(pages: usize) -> PageTable {
        let mut entry = Entry::EMPTY;
        entry.flags = EntryFlags::READ_ALLOWED | EntryFlags::WRITE_ALLOWED;

        PageTable {
            entries: Spinlock::new(vec![entry; pages]),
            io_waiters: Spinlock::new(HashMap::new()),
        }
    }

    fn with_entry<R>(&self, vpn: Vpn, f: impl FnOnce(&mut Entry) -> R) -> R {
        let mut entries = self.entries.lock();
        let len = entries.len();
        let entry = entries
            .get_mut(vpn)
            .unwrap_or_else(|| panic!("Virtual page {} outside table of {} pages.", vpn, len));
        f(entry)
    }

    fn test(&self, vpn: Vpn, flags: EntryFlags) -> bool {
        self.with_entry(vpn, |e| e.flags.contains(flags))
    }

    fn set(&self, vpn: Vpn, flags: EntryFlags, value: bool) {
        self.with_entry(vpn, |e| e.flags.set(flags, value))
    }

    /// All state bits of the page.
    pub fn flags(&self, vpn: Vpn) -> EntryFlags {
        self.with_entry(vpn, |e| e.flags)
    }

    /// What the MMU does on an access through a valid mapping: mark the page
    /// referenced, and modified if written.
    pub fn access(&self, vpn: Vpn, write: bool) {
        self.with_entry(vpn, |e| {
            assert!(
                e.flags.contains(EntryFlags::VALID),
                "Access through invalid mapping of page {}.",
                vpn
            );
            e.flags.insert(EntryFlags::REFERENCED);
            if write {
                e.flags.insert(EntryFlags::MODIFIED);
            }
        })
    }
}

impl TranslationTable for PageTable {
    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn referenced(&self, vpn: Vpn) -> bool {
        self.test(vpn, EntryFlags::REFERENCED)
    }

    fn set_referenced(&self, vpn: Vpn) {
        self.set(vpn, EntryFlags::REFERENCED, true)
    }

    fn clear_referenced(&self, vpn: Vpn) {
        self.set(vpn, EntryFlags::REFERENCED, false)
    }

    fn modified(&self, vpn: Vpn) -> bool {
        self.test(vpn, EntryFlags::MODIFIED)
    }

    fn clear_modified(&self, vpn: Vpn) {
        self.set(vpn, EntryFlags::MODIFIED, false)
    }

    fn valid(&self, vpn: Vpn) -> bool {
        self.test(vpn, EntryFlags::VALID)
    }

    fn set_valid(&self, vpn: Vpn) {
        self.set(vpn, EntryFlags::VALID, true)
    }

    fn clear_valid(&self, vpn: Vpn) {
        self.set(vpn, EntryFlags::VALID, false)
    }

    fn io_busy(&self, vpn: Vpn) -> bool {
        self.test(vpn, EntryFlags::IO)
    }

    fn try_begin_io(&self, vpn: Vpn) -> bool {
        self.with_entry(vpn, |e| {
            if e.flags.contains(EntryFlags::IO) {
                false
            } else {
                e.flags.insert(EntryFlags::IO);
                true
            }
        })
    }

    fn end_io(&self, vpn: Vpn) {
        self.set(vpn, EntryFlags::IO, false);

        let waiters = self.io_waiters.lock().remove(&vpn).unwrap_or_default();
        for waker in waiters {
            waker.wake();
        }
    }

    fn wait_io(&self, vpn: Vpn, waker: &Waker) {
        let mut io_waiters = self.io_waiters.lock();
        let waiters = io_waiters.entry(vpn).or_insert_with(Vec::new);
        if !waiters.iter().any(|w| w.will_wake(waker)) {
            waiters.push(waker.clone());
        }
    }

    fn swapped(&self, vpn: Vpn) -> bool {
        self.test(vpn, EntryFlags::SWAP)
    }

    fn set_swapped(&self, vpn: Vpn) {
        self.set(vpn, EntryFlags::SWAP, true)
    }

    fn swap_slot(&self, vpn: Vpn) -> Option<SwapSlot> {
        self.with_entry(vpn, |e| e.swap_slot)
    }

    fn set_swap_slot(&self, vpn: Vpn, slot: SwapSlot) {
        self.with_entry(vpn, |e| e.swap_slot = Some(slot))
    }

    fn frame(&self, vpn: Vpn) -> Option<FrameIndex> {
        self.with_entry(vpn, |e| e.frame)
    }

    fn map(&self, vpn: Vpn, frame: FrameIndex) {
        self.with_entry(vpn, |e| e.frame = Some(frame))
    }
}
