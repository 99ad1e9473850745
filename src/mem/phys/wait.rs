//! Waiting for a frame to be unlocked.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use super::frame::Frames;
use crate::util::sync::Spinlock;

/// Resolves once some frame has been unlocked after the wait was set up.
pub(super) struct UnlockWait<'a> {
    frames: &'a Spinlock<Frames>,
    /// The unlock count when the waiter decided to block.
    seen: u64,
}

impl<'a> UnlockWait<'a> {
    /// Must be created inside the same critical section that found every
    /// frame locked, with `seen` read there too.
    pub(super) fn new(frames: &'a Spinlock<Frames>, seen: u64) -> Self {
        Self { frames, seen }
    }
}

impl Future for UnlockWait<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, ctx: &mut Context) -> Poll<()> {
        let mut frames = self.frames.lock();
        if frames.unlocks != self.seen {
            return Poll::Ready(());
        }

        if !frames.unlock_waiters.iter().any(|w| w.will_wake(ctx.waker())) {
            frames.unlock_waiters.push(ctx.waker().clone());
        }
        Poll::Pending
    }
}
