use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::mem::virt::AddressSpace;

make_id!(pub ProcessId);

/// Per-process event counters.
#[derive(Default)]
pub struct Statistics {
    memory_accesses: AtomicU64,
    page_faults: AtomicU64,
    swap_reads: AtomicU64,
    swap_writes: AtomicU64,
}

impl Statistics {
    pub fn incr_memory_access(&self) {
        self.memory_accesses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_page_fault(&self) {
        self.page_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_swap_read(&self) {
        self.swap_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_swap_write(&self) {
        self.swap_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn memory_accesses(&self) -> u64 {
        self.memory_accesses.load(Ordering::Relaxed)
    }

    pub fn page_faults(&self) -> u64 {
        self.page_faults.load(Ordering::Relaxed)
    }

    pub fn swap_reads(&self) -> u64 {
        self.swap_reads.load(Ordering::Relaxed)
    }

    pub fn swap_writes(&self) -> u64 {
        self.swap_writes.load(Ordering::Relaxed)
    }
}

/// A process: an address space plus accounting.
pub struct Process {
    id: ProcessId,
    address_space: Arc<AddressSpace>,
    stats: Statistics,
}

impl Process {
    pub fn new(address_space: Arc<AddressSpace>) -> Arc<Process> {
        Arc::new(Process {
            id: ProcessId::new(),
            address_space,
            stats: Statistics::default(),
        })
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn address_space(&self) -> &Arc<AddressSpace> {
        &self.address_space
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }
}
