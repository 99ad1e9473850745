//! # Threads and processes
//!
//! Only as much of them as the memory manager needs: who is asking, which
//! process gets billed, and where a suspended clock scan keeps its place.

mod process;

pub use process::{Process, ProcessId, Statistics};

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

make_id!(pub ThreadId);

/// A kernel thread.
pub struct Thread {
    id: ThreadId,
    process: Arc<Process>,
    /// The clock cursor saved when the thread suspended inside a scan.
    clock: AtomicUsize,
}

impl Thread {
    pub fn new(process: Arc<Process>) -> Thread {
        Thread {
            id: ThreadId::new(),
            process,
            clock: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// The process the thread belongs to.
    pub fn process(&self) -> &Arc<Process> {
        &self.process
    }

    /// Remember where the clock scan stopped before suspending.
    pub fn save_clock(&self, cursor: usize) {
        self.clock.store(cursor, Ordering::Release);
    }

    /// The cursor saved by the last [save_clock](Thread::save_clock).
    pub fn restore_clock(&self) -> usize {
        self.clock.load(Ordering::Acquire)
    }
}
