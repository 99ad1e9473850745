//! Physical frame management.
//!
//! A fixed pool of frames is shared by every address space. Frames are
//! handed out from a free list while it lasts; after that a clock scan
//! picks a victim, writes it back to swap if needed, and hands it to the
//! new owner directly.
//!
//! Every frame returned by [acquire](PhysicalMemory::acquire) is locked: the
//! clock skips it until the caller has filled it in and called
//! [unlock](PhysicalMemory::unlock). A frame that is never unlocked can
//! never be evicted again.

mod clock;
mod frame;
mod memory;
mod wait;

#[cfg(test)]
mod test;

pub use frame::FrameInfo;
pub use memory::MainMemory;

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt::Write;
use core::mem::take;

use log_crate::{debug, info, trace, warn};

use crate::mem::virt::{begin_io, AddressSpace, Owner, TranslationTable};
use crate::mem::{Context, FrameIndex, SwapSlot, Vpn};
use crate::task::Thread;
use crate::util::sync::Spinlock;
use clock::{Eviction, Scan};
use frame::Frames;
use wait::UnlockWait;

/// The physical frame manager.
pub struct PhysicalMemory {
    context: Context,
    frames: Spinlock<Frames>,
}

impl PhysicalMemory {
    /// Create the manager with every frame free.
    pub fn new(context: Context) -> PhysicalMemory {
        let capacity = context.config.frame_count();
        info!(
            "INITIALIZED {} frames of {} bytes.",
            capacity,
            context.config.page_size()
        );

        PhysicalMemory {
            frames: Spinlock::new(Frames::new(capacity)),
            context,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn free_count(&self) -> usize {
        self.frames.lock().free_count()
    }

    /// The last frame the clock looked at.
    pub fn cursor(&self) -> FrameIndex {
        self.frames.lock().cursor
    }

    /// A snapshot of one frame's descriptor.
    pub fn frame(&self, frame: FrameIndex) -> FrameInfo {
        self.frames.lock().get(frame).into()
    }

    /// Run `f` with the frame table held, so no frame is picked, locked, or
    /// released while it runs. `f` may touch translation tables, but never
    /// this manager.
    pub(crate) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _frames = self.frames.lock();
        f()
    }

    /// Take a free frame, if there is one. The frame comes back reserved,
    /// but without an owner; [acquire](PhysicalMemory::acquire) fills it in.
    fn find_free(&self, thread: &Thread) -> Option<FrameIndex> {
        let frame = self.frames.lock().pop_free()?;
        thread.process().stats().incr_memory_access();
        Some(frame)
    }

    /// Get a frame to back `vpn` in `owner`, evicting one if none is free.
    /// May suspend. The frame is returned locked and must be
    /// [unlocked](PhysicalMemory::unlock) once its contents are in place.
    ///
    /// Dropping the future early gives back whatever it had taken: a victim
    /// still waiting for its page's I/O is unlocked and stays mapped. Once
    /// the write-back has started it runs to completion.
    pub async fn acquire(
        &self,
        thread: &Thread,
        owner: &Arc<AddressSpace>,
        vpn: Vpn,
    ) -> FrameIndex {
        let frame = match self.find_free(thread) {
            Some(frame) => frame,
            None => self.evict(thread).await,
        };

        let mut frames = self.frames.lock();
        let desc = frames.get_mut(frame);
        desc.free = false;
        desc.locked = true;
        desc.owner = Some(Owner::new(owner));
        desc.virtual_page = vpn;

        debug!("Mapped virtual page {} to frame {}.", vpn, frame);
        frame
    }

    /// Let the clock consider a frame again.
    pub fn unlock(&self, frame: FrameIndex) {
        let waiters = {
            let mut frames = self.frames.lock();
            let desc = frames.get_mut(frame);
            assert!(!desc.free, "Unlocking free frame {}.", frame);
            assert!(desc.locked, "Unlocking unlocked frame {}.", frame);
            desc.locked = false;

            frames.unlocks += 1;
            take(&mut frames.unlock_waiters)
        };

        for waker in waiters {
            waker.wake();
        }
    }

    /// Return a frame whose mapping is being torn down to the free list. The
    /// old owner's mapping is invalidated if the owner is still around.
    pub fn release(&self, frame: FrameIndex) {
        let mut frames = self.frames.lock();
        let (owner, vpn) = frames.push_free(frame);

        if let Some(table) = owner.as_ref().and_then(Owner::table) {
            table.clear_valid(vpn);
        }
        debug!("Released frame {} (virtual page {}).", frame, vpn);
    }

    /// Hand a frame to the address space of `new_owner`, a thread sharing
    /// the mapping.
    pub fn change_owner(&self, thread: &Thread, frame: FrameIndex, new_owner: &Thread) {
        thread.process().stats().incr_memory_access();

        let mut frames = self.frames.lock();
        let desc = frames.get_mut(frame);
        assert!(!desc.free, "Changing owner of free frame {}.", frame);
        desc.owner = Some(Owner::new(new_owner.process().address_space()));
    }

    /// Find a victim with the clock and write it back. Suspends while every
    /// frame is locked, and while the victim's page has a transfer in flight.
    async fn evict(&self, thread: &Thread) -> FrameIndex {
        let mut resume = None;

        let eviction = loop {
            let wait = {
                let mut frames = self.frames.lock();
                if let Some(cursor) = resume.take() {
                    frames.cursor = cursor;
                }

                // Someone may have released a frame since we last looked.
                if let Some(frame) = frames.pop_free() {
                    thread.process().stats().incr_memory_access();
                    return frame;
                }

                match frames.scan() {
                    Scan::Victim(frame) => break frames.begin_eviction(frame),
                    Scan::AllLocked => {
                        thread.save_clock(frames.cursor);
                        trace!(
                            "Every frame locked, {} suspends at frame {}.",
                            thread.id(),
                            frames.cursor
                        );
                        UnlockWait::new(&self.frames, frames.unlocks)
                    }
                }
            };

            wait.await;
            let cursor = thread.restore_clock();
            trace!("{} resumes at frame {}.", thread.id(), cursor);
            resume = Some(cursor);
        };

        self.swap_out(thread, eviction).await
    }

    /// Make sure swap holds the victim's contents.
    async fn swap_out(&self, thread: &Thread, eviction: Eviction) -> FrameIndex {
        let Eviction {
            frame,
            page,
            io_claimed,
        } = eviction;
        let (table, vpn) = match page {
            Some(page) => page,
            None => return frame,
        };

        if !io_claimed {
            trace!("Virtual page {} has I/O in flight, waiting.", vpn);
            let pending = PendingEviction {
                physmem: self,
                frame,
                table: &*table,
                vpn,
                armed: true,
            };
            begin_io(&*table, vpn).await;
            pending.disarm();
        }

        if table.swapped(vpn) {
            if table.modified(vpn) {
                let slot = table
                    .swap_slot(vpn)
                    .expect("Swap-backed page without a slot.");
                self.write_back(thread, frame, Some(slot));
                debug!("Rewrote virtual page {} to {}.", vpn, slot);
            }
        } else {
            let slot = self.write_back(thread, frame, None);
            table.set_swap_slot(vpn, slot);
            table.set_swapped(vpn);
            debug!("Wrote virtual page {} to new {}.", vpn, slot);
        }

        table.end_io(vpn);
        frame
    }

    fn write_back(&self, thread: &Thread, frame: FrameIndex, slot: Option<SwapSlot>) -> SwapSlot {
        thread.process().stats().incr_swap_write();
        let Context { memory, swap, .. } = &self.context;
        memory.with_frame(frame, |bytes| swap.put_page(slot, bytes))
    }

    /// Describe every frame: free and locked flags, backed page, owner, and
    /// the owner's reference and modified bits.
    pub fn dump(&self) -> String {
        let frames = self.frames.lock();
        let mut out = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(out, "Frame table ({} frames)", frames.capacity());
        for (frame, desc) in frames.iter().enumerate() {
            let table = desc.owner.as_ref().and_then(Owner::table);
            let bit = |f: fn(&dyn TranslationTable, Vpn) -> bool| {
                table.as_ref().map_or(0, |t| f(&**t, desc.virtual_page) as u8)
            };

            let _ = write!(
                out,
                "Frame {} free={} locked={} ",
                frame, desc.free as u8, desc.locked as u8
            );
            match &desc.owner {
                Some(owner) if !desc.free => {
                    let _ = write!(out, "virtpage={} owner={} ", desc.virtual_page, owner.id());
                }
                _ => {
                    let _ = write!(out, "virtpage=- owner=- ");
                }
            }
            let _ = writeln!(
                out,
                "U={} M={}",
                bit(|t, v| t.referenced(v)),
                bit(|t, v| t.modified(v))
            );
        }

        out
    }

    /// [dump](PhysicalMemory::dump) to the log.
    pub fn print(&self) {
        for line in self.dump().lines() {
            debug!("{}", line);
        }
    }
}

/// A victim waiting for its page's I/O-busy bit. If the wait is dropped, the
/// frame goes back into service with its mapping intact, since nothing has
/// been written or overwritten yet.
struct PendingEviction<'a> {
    physmem: &'a PhysicalMemory,
    frame: FrameIndex,
    table: &'a dyn TranslationTable,
    vpn: Vpn,
    armed: bool,
}

impl PendingEviction<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingEviction<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!(
            "Eviction of frame {} abandoned, virtual page {} stays resident.",
            self.frame, self.vpn
        );
        let (table, vpn) = (self.table, self.vpn);
        self.physmem.exclusive(|| table.set_valid(vpn));
        self.physmem.unlock(self.frame);
    }
}
