//! The clock (second-chance) scan.

use alloc::sync::Arc;

use log_crate::{debug, trace, warn};

use super::frame::Frames;
use crate::mem::virt::TranslationTable;
use crate::mem::{FrameIndex, Vpn};

/// How a scan ended.
pub(super) enum Scan {
    /// The frame under the cursor is to be evicted.
    Victim(FrameIndex),
    /// A whole revolution found nothing but locked frames. The cursor is
    /// where the scan gave up.
    AllLocked,
}

/// A victim, taken out of service but not yet written back.
pub(super) struct Eviction {
    pub(super) frame: FrameIndex,
    /// The victim's table and page, unless its address space is gone and
    /// there is nothing to write back.
    pub(super) page: Option<(Arc<dyn TranslationTable>, Vpn)>,
    /// Whether the page's I/O-busy bit was claimed along with the frame.
    pub(super) io_claimed: bool,
}

impl Frames {
    /// Advance the clock until it lands on an unlocked frame whose reference
    /// bit is already clear, clearing set bits on the way. Must only run with
    /// the free list empty.
    pub(super) fn scan(&mut self) -> Scan {
        let capacity = self.capacity();
        let mut locked_seen = 0;

        loop {
            self.cursor = (self.cursor + 1) % capacity;
            let frame = self.cursor;
            let desc = self.get(frame);
            assert!(!desc.free, "Clock reached free frame {}.", frame);

            if desc.locked {
                locked_seen += 1;
                trace!("Frame {} locked ({}/{}).", frame, locked_seen, capacity);
                if locked_seen >= capacity {
                    return Scan::AllLocked;
                }
                continue;
            }
            locked_seen = 0;

            let vpn = desc.virtual_page;
            let table = match desc.owner.as_ref().and_then(|o| o.table()) {
                Some(table) => table,
                None => {
                    warn!("Frame {} outlived its address space, reclaiming.", frame);
                    return Scan::Victim(frame);
                }
            };

            if table.referenced(vpn) {
                trace!("Frame {} referenced, second chance.", frame);
                table.clear_referenced(vpn);
            } else {
                trace!("Frame {} unreferenced.", frame);
                return Scan::Victim(frame);
            }
        }
    }

    /// Lock a victim and invalidate its mapping, so that accesses fault
    /// instead of reading a frame about to be reused.
    pub(super) fn begin_eviction(&mut self, frame: FrameIndex) -> Eviction {
        let desc = self.get_mut(frame);
        assert!(!desc.locked, "Evicting locked frame {}.", frame);
        desc.locked = true;

        let vpn = desc.virtual_page;
        let page = desc.owner.as_ref().and_then(|o| o.table()).map(|table| {
            table.clear_valid(vpn);
            (table, vpn)
        });
        let io_claimed = page
            .as_ref()
            .map_or(false, |(table, vpn)| table.try_begin_io(*vpn));

        debug!("Evicting frame {} (virtual page {}).", frame, vpn);
        Eviction {
            frame,
            page,
            io_claimed,
        }
    }
}
