//! Testing

use alloc::sync::Arc;
use std::collections::HashSet;
use std::time::Duration;

use futures::future;
use futures::poll;
use tokio::time::timeout;

use super::{FrameInfo, PhysicalMemory};
use crate::config::Config;
use crate::mem::swap::{MemorySwap, Swap};
use crate::mem::virt::{AddressSpace, PageTable, TranslationTable};
use crate::mem::{Context, SwapSlot};
use crate::task::{Process, Thread};
use crate::util::sync::Spinlock;

const PAGE_SIZE: usize = 16;
const PAGES: usize = 64;

struct Fixture {
    physmem: Arc<PhysicalMemory>,
    swap: Arc<MemorySwap>,
    table: Arc<PageTable>,
    space: Arc<AddressSpace>,
    thread: Arc<Thread>,
}

fn fixture(frames: usize) -> Fixture {
    let swap = Arc::new(MemorySwap::new());
    let config = Config::new(frames, PAGE_SIZE, PAGES).unwrap();
    let table = Arc::new(PageTable::new(config.virtual_pages()));
    let physmem = Arc::new(PhysicalMemory::new(Context::new(config, swap.clone())));
    let space = AddressSpace::new(table.clone());
    let thread = Arc::new(Thread::new(Process::new(space.clone())));

    Fixture {
        physmem,
        swap,
        table,
        space,
        thread,
    }
}

impl Fixture {
    /// Acquire a frame for `vpn`, map it, and unlock it, as a fault handler
    /// would.
    async fn load(&self, vpn: usize) -> usize {
        let frame = self.physmem.acquire(&self.thread, &self.space, vpn).await;
        self.table.map(vpn, frame);
        self.table.set_valid(vpn);
        self.physmem.unlock(frame);
        frame
    }

    fn check(&self) {
        self.physmem.frames.lock().check();
    }
}

const INITIAL: FrameInfo = FrameInfo {
    free: true,
    locked: false,
    virtual_page: None,
    owner: None,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn round_trip() {
    let f = fixture(2);
    assert_eq!(f.physmem.frame(0), INITIAL);

    let frame = f.physmem.acquire(&f.thread, &f.space, 7).await;
    assert_eq!(frame, 0);
    assert_eq!(
        f.physmem.frame(frame),
        FrameInfo {
            free: false,
            locked: true,
            virtual_page: Some(7),
            owner: Some(f.space.id()),
        }
    );
    assert_eq!(f.physmem.free_count(), 1);
    f.check();

    f.physmem.unlock(frame);
    assert!(!f.physmem.frame(frame).locked);
    f.physmem.release(frame);

    assert_eq!(f.physmem.frame(frame), INITIAL);
    assert_eq!(f.physmem.free_count(), 2);
    f.check();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn free_frames_credit_the_caller() {
    let f = fixture(3);
    for vpn in 0..3 {
        assert_eq!(f.load(vpn).await, vpn);
    }
    assert_eq!(f.thread.process().stats().memory_accesses(), 3);
    assert_eq!(f.physmem.free_count(), 0);
    assert_eq!(f.swap.writes(), 0);
    f.check();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn released_frame_is_reused_first() {
    let f = fixture(4);
    for vpn in 0..4 {
        f.load(vpn).await;
    }
    f.physmem.release(2);
    f.physmem.release(0);
    f.check();

    assert_eq!(f.load(10).await, 0);
    assert_eq!(f.load(11).await, 2);
    assert_eq!(f.swap.writes(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clock_gives_second_chances() {
    let f = fixture(4);
    for vpn in 0..4 {
        f.load(vpn).await;
    }
    for (vpn, referenced) in [true, true, false, true].iter().enumerate() {
        if *referenced {
            f.table.set_referenced(vpn);
        } else {
            f.table.clear_referenced(vpn);
        }
    }
    assert_eq!(f.physmem.cursor(), 3);

    let frame = f.physmem.acquire(&f.thread, &f.space, 20).await;

    assert_eq!(frame, 2);
    assert_eq!(f.physmem.cursor(), 2);
    assert!(!f.table.referenced(0));
    assert!(!f.table.referenced(1));
    assert!(f.table.referenced(3));
    assert!(!f.table.valid(2));
    assert!(f.table.valid(3));
    assert_eq!(f.physmem.frame(2).virtual_page, Some(20));
    assert!(f.physmem.frame(2).locked);
    f.check();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_frame_referenced_takes_a_full_revolution() {
    let f = fixture(3);
    for vpn in 0..3 {
        f.load(vpn).await;
        f.table.set_referenced(vpn);
    }

    let frame = f.physmem.acquire(&f.thread, &f.space, 30).await;

    assert_eq!(frame, 0);
    assert_eq!(f.physmem.cursor(), 0);
    assert!(!f.table.referenced(1));
    assert!(!f.table.referenced(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn locked_frames_are_never_victims() {
    let f = fixture(3);
    let held = f.physmem.acquire(&f.thread, &f.space, 0).await;
    f.load(1).await;
    f.load(2).await;

    let first = f.physmem.acquire(&f.thread, &f.space, 3).await;
    let second = f.physmem.acquire(&f.thread, &f.space, 4).await;

    assert_eq!(held, 0);
    assert_eq!((first, second), (1, 2));
    assert_eq!(f.physmem.frame(0).virtual_page, Some(0));
    f.check();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scan_resumes_from_saved_cursor() {
    let f = fixture(3);
    for vpn in 0..3 {
        f.physmem.acquire(&f.thread, &f.space, vpn).await;
    }

    let waiter = Thread::new(f.thread.process().clone());
    let mut third = Box::pin(f.physmem.acquire(&waiter, &f.space, 9));
    assert!(poll!(third.as_mut()).is_pending());
    assert_eq!(waiter.restore_clock(), 2);

    // Another scan moved the hand in the meantime.
    f.physmem.frames.lock().cursor = 0;
    f.physmem.unlock(1);
    f.physmem.unlock(0);

    assert_eq!(third.await, 0);
    assert_eq!(f.physmem.cursor(), 0);
    f.check();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unlock_wakes_blocked_acquire() {
    let f = fixture(2);
    f.physmem.acquire(&f.thread, &f.space, 0).await;
    f.physmem.acquire(&f.thread, &f.space, 1).await;

    let blocked = {
        let physmem = f.physmem.clone();
        let space = f.space.clone();
        let thread = Thread::new(f.thread.process().clone());
        tokio::spawn(async move { physmem.acquire(&thread, &space, 2).await })
    };

    while f.physmem.frames.lock().unlock_waiters.is_empty() {
        tokio::task::yield_now().await;
    }
    f.physmem.unlock(0);

    assert_eq!(blocked.await.expect("Blocked acquire panicked."), 0);
    assert_eq!(f.physmem.frame(0).virtual_page, Some(2));
    assert!(f.physmem.frame(1).locked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn swap_out_writes_only_when_needed() {
    let f = fixture(1);
    let memory = f.physmem.context().memory.clone();

    // Never swapped: a new slot.
    f.load(0).await;
    memory.fill(0, 0x11);
    f.load(1).await;
    let slot = f.table.swap_slot(0).expect("Evicted page has no slot.");
    assert!(f.table.swapped(0));
    assert_eq!(f.swap.slots(), 1);
    assert_eq!(f.swap.writes(), 1);

    // Swapped and dirty: the same slot again.
    f.load(0).await;
    f.table.access(0, true);
    f.table.clear_referenced(0);
    memory.fill(0, 0x22);
    f.load(2).await;
    assert_eq!(f.table.swap_slot(0), Some(slot));
    assert_eq!(f.swap.slots(), 2);
    assert_eq!(f.swap.writes(), 3);

    let mut page = [0; PAGE_SIZE];
    f.swap.get_page(slot, &mut page);
    assert_eq!(page, [0x22; PAGE_SIZE]);

    // Swapped and clean: nothing written.
    f.load(0).await;
    f.table.clear_modified(0);
    f.load(3).await;
    assert_eq!(f.swap.writes(), 4);
    assert_eq!(f.swap.slots(), 3);
    assert_eq!(f.table.swap_slot(0), Some(slot));
    assert_eq!(f.thread.process().stats().swap_writes(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn eviction_waits_for_io_in_flight() {
    let f = fixture(1);
    f.load(0).await;
    assert!(f.table.try_begin_io(0));

    let mut next = Box::pin(f.physmem.acquire(&f.thread, &f.space, 1));
    assert!(poll!(next.as_mut()).is_pending());

    // The victim is already out of service while it waits.
    assert!(f.physmem.frame(0).locked);
    assert!(!f.table.valid(0));
    assert_eq!(f.swap.writes(), 0);

    f.table.end_io(0);
    assert_eq!(next.await, 0);
    assert_eq!(f.swap.writes(), 1);
    assert!(!f.table.io_busy(0));
    assert_eq!(f.table.swap_slot(0), Some(SwapSlot::new(0)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_eviction_puts_victim_back() {
    let f = fixture(1);
    f.load(0).await;
    assert!(f.table.try_begin_io(0));

    let mut next = Box::pin(f.physmem.acquire(&f.thread, &f.space, 1));
    assert!(poll!(next.as_mut()).is_pending());
    assert!(f.physmem.frame(0).locked);
    drop(next);

    let info = f.physmem.frame(0);
    assert!(!info.locked);
    assert_eq!(info.virtual_page, Some(0));
    assert!(f.table.valid(0));
    assert!(f.table.io_busy(0));
    f.check();

    f.table.end_io(0);
    let frame = timeout(
        Duration::from_secs(5),
        f.physmem.acquire(&f.thread, &f.space, 1),
    )
    .await
    .expect("Frame never came back into service.");
    assert_eq!(frame, 0);
    assert_eq!(f.swap.writes(), 1);
    assert!(!f.table.valid(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn frames_of_dead_spaces_are_reclaimed_without_swap() {
    let f = fixture(1);
    let other = AddressSpace::new(Arc::new(PageTable::new(PAGES)));
    let frame = f.physmem.acquire(&f.thread, &other, 0).await;
    f.physmem.unlock(frame);
    other.teardown();

    assert_eq!(f.load(5).await, frame);
    assert_eq!(f.swap.writes(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn release_invalidates_live_owner_only() {
    let f = fixture(2);
    let a = f.load(0).await;
    let b = f.load(1).await;

    f.physmem.release(a);
    assert!(!f.table.valid(0));
    assert!(f.table.valid(1));

    f.space.teardown();
    f.physmem.release(b);
    assert!(f.table.valid(1));
    f.check();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn change_owner_rebinds_and_credits_caller() {
    let f = fixture(1);
    let frame = f.load(0).await;

    let other_space = AddressSpace::new(Arc::new(PageTable::new(PAGES)));
    let other = Thread::new(Process::new(other_space.clone()));
    let before = f.thread.process().stats().memory_accesses();

    f.physmem.change_owner(&f.thread, frame, &other);

    assert_eq!(f.physmem.frame(frame).owner, Some(other_space.id()));
    assert_eq!(f.thread.process().stats().memory_accesses(), before + 1);
    assert_eq!(other.process().stats().memory_accesses(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dump_lists_every_frame() {
    let f = fixture(2);
    let frame = f.physmem.acquire(&f.thread, &f.space, 5).await;
    f.table.set_referenced(5);

    let dump = f.physmem.dump();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(
        lines,
        [
            "Frame table (2 frames)".to_string(),
            format!(
                "Frame 0 free=0 locked=1 virtpage=5 owner={} U=1 M=0",
                f.space.id()
            ),
            "Frame 1 free=1 locked=0 virtpage=- owner=- U=0 M=0".to_string(),
        ]
    );

    // No side effects.
    assert!(f.table.referenced(5));
    assert!(f.physmem.frame(frame).locked);
    f.physmem.print();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dump_reads_zero_bits_for_dead_owner() {
    let f = fixture(1);
    let frame = f.load(0).await;
    f.table.access(0, true);
    assert!(f.physmem.dump().contains("U=1 M=1"));

    f.space.teardown();
    let line = format!(
        "Frame {} free=0 locked=0 virtpage=0 owner={} U=0 M=0",
        frame,
        f.space.id()
    );
    assert_eq!(f.physmem.dump().lines().nth(1), Some(line.as_str()));
}

#[test]
#[should_panic(expected = "Frame 0 is already free.")]
fn release_free_frame() {
    fixture(1).physmem.release(0);
}

#[test]
#[should_panic(expected = "Unlocking free frame 0.")]
fn unlock_free_frame() {
    fixture(1).physmem.unlock(0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[should_panic(expected = "Unlocking unlocked frame 0.")]
async fn unlock_twice() {
    let f = fixture(1);
    let frame = f.load(0).await;
    f.physmem.unlock(frame);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[should_panic(expected = "Frame 0 is locked.")]
async fn release_locked_frame() {
    let f = fixture(1);
    let frame = f.physmem.acquire(&f.thread, &f.space, 0).await;
    f.physmem.release(frame);
}

#[test]
#[should_panic(expected = "Frame 4 outside table of 4 frames.")]
fn frame_out_of_range() {
    fixture(4).physmem.unlock(4);
}

async fn churn(f: Arc<Fixture>, in_use: Arc<Spinlock<HashSet<usize>>>, base: usize) {
    for i in 0..40 {
        let vpn = base + i;
        let frame = f.physmem.acquire(&f.thread, &f.space, vpn).await;
        assert!(
            in_use.lock().insert(frame),
            "Frame {} handed out twice.",
            frame
        );

        f.table.map(vpn, frame);
        f.table.set_valid(vpn);
        f.table.set_referenced(vpn);
        tokio::task::yield_now().await;

        in_use.lock().remove(&frame);
        f.physmem.unlock(frame);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_double_allocation() {
    let mut handles = Vec::new();
    let in_use = Arc::new(Spinlock::new(HashSet::new()));
    let shared = fixture(4);
    let swap = shared.swap.clone();
    let physmem = shared.physmem.clone();

    for t in 0..6 {
        let table = Arc::new(PageTable::new(PAGES));
        let space = AddressSpace::new(table.clone());
        let f = Arc::new(Fixture {
            physmem: physmem.clone(),
            swap: swap.clone(),
            table,
            space: space.clone(),
            thread: Arc::new(Thread::new(Process::new(space))),
        });
        handles.push(tokio::spawn(churn(f, in_use.clone(), t % 2 * 20)));
    }

    for result in future::join_all(handles).await {
        result.expect("Churning task panicked.");
    }

    assert!(in_use.lock().is_empty());
    physmem.frames.lock().check();
    for frame in 0..4 {
        assert!(!physmem.frame(frame).locked);
    }
}
