//! Page-fault resolution: bring a page of the current process into a frame.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context as TaskContext, Poll};

use log_crate::{debug, trace};

use crate::mem::phys::PhysicalMemory;
use crate::mem::virt::TranslationTable;
use crate::mem::{Context, FrameIndex, Vpn};
use crate::task::Thread;

/// Resolve a fault on `vpn` in the address space of `thread`'s process and
/// return the frame now backing it. The page is read back from swap if it
/// has been swapped out before, and zero-filled otherwise.
pub async fn resolve(physmem: &PhysicalMemory, thread: &Thread, vpn: Vpn) -> FrameIndex {
    let process = thread.process();
    process.stats().incr_page_fault();
    trace!("Page fault on virtual page {} in {}.", vpn, process.id());

    let pages = physmem.context().config.virtual_pages();
    assert!(
        vpn < pages,
        "Fault on virtual page {} outside address space of {} pages.",
        vpn,
        pages
    );

    let space = process.address_space();
    let table = space
        .table()
        .expect("Page fault in a torn-down address space.");

    // The I/O-busy bit is held for the whole resolution. It makes the fault
    // wait for an eviction of the same page to finish writing it back, and
    // keeps two faults on one page from mapping it twice.
    let claim = Claim {
        physmem,
        table: &*table,
        vpn,
    };
    if let Some(frame) = claim.await {
        trace!("Virtual page {} already resident in frame {}.", vpn, frame);
        return frame;
    }

    let held = HeldIo {
        table: &*table,
        vpn,
        armed: true,
    };
    let frame = physmem.acquire(thread, space, vpn).await;
    held.disarm();

    let Context { memory, swap, .. } = physmem.context();
    match table.swap_slot(vpn).filter(|_| table.swapped(vpn)) {
        Some(slot) => {
            memory.with_frame_mut(frame, |bytes| swap.get_page(slot, bytes));
            table.clear_modified(vpn);
            process.stats().incr_swap_read();
            debug!("Read virtual page {} from {} into frame {}.", vpn, slot, frame);
        }
        None => {
            memory.fill(frame, 0);
            debug!("Zero-filled frame {} for virtual page {}.", frame, vpn);
        }
    }

    table.map(vpn, frame);
    table.set_referenced(vpn);
    table.set_valid(vpn);
    table.end_io(vpn);

    physmem.unlock(frame);
    frame
}

/// The I/O-busy bit of a page whose fault is waiting for a frame. Given
/// back if the fault is dropped before a frame arrives.
struct HeldIo<'a> {
    table: &'a dyn TranslationTable,
    vpn: Vpn,
    armed: bool,
}

impl HeldIo<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for HeldIo<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.table.end_io(self.vpn);
        }
    }
}

/// Takes the page's I/O-busy bit for a fault. Resolves to the page's frame,
/// with the bit given back, if the page turns out to be resident already.
struct Claim<'a> {
    physmem: &'a PhysicalMemory,
    table: &'a dyn TranslationTable,
    vpn: Vpn,
}

impl Claim<'_> {
    /// Claiming and checking residency happen together with respect to the
    /// clock, so a page the clock takes between the two is never mistaken
    /// for one that is simply absent.
    fn try_claim(&self) -> Option<Option<FrameIndex>> {
        let Claim { table, vpn, .. } = *self;
        self.physmem.exclusive(|| {
            if !table.try_begin_io(vpn) {
                return None;
            }

            let frame = if table.valid(vpn) { table.frame(vpn) } else { None };
            if frame.is_some() {
                table.end_io(vpn);
            }
            Some(frame)
        })
    }
}

impl Future for Claim<'_> {
    type Output = Option<FrameIndex>;

    fn poll(self: Pin<&mut Self>, ctx: &mut TaskContext) -> Poll<Self::Output> {
        if let Some(resident) = self.try_claim() {
            return Poll::Ready(resident);
        }

        self.table.wait_io(self.vpn, ctx.waker());
        match self.try_claim() {
            Some(resident) => Poll::Ready(resident),
            None => Poll::Pending,
        }
    }
}
