//! The interrupt-safe spinlock behind every critical section in the crate.

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::int;

/// Mutual exclusion for short, non-suspending sections. Taking the lock
/// turns interrupts off on the current processor, and dropping the guard
/// puts back whatever state was there before, so guards nest.
pub struct Spinlock<T> {
    /// `true` while some guard is alive.
    held: AtomicBool,
    data: UnsafeCell<T>,
}

/// Access to the contents of a [Spinlock], for as long as it lives.
pub struct SpinlockGuard<'a, T> {
    lock: &'a Spinlock<T>,
    /// Interrupt state to restore on release.
    interrupts: bool,
}

unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

impl<T> Spinlock<T> {
    pub const fn new(data: T) -> Spinlock<T> {
        Spinlock {
            held: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Disable interrupts, then spin until the lock is ours.
    pub fn lock(&self) -> SpinlockGuard<T> {
        let interrupts = int::disable();
        while self
            .held
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Wait on a plain load so contended spinning stays read-only.
            while self.held.load(Ordering::Relaxed) {
                spin_loop();
            }
        }

        SpinlockGuard {
            lock: self,
            interrupts,
        }
    }

    /// Whether a guard is currently alive. Only a hint: it may be stale by
    /// the time it is looked at.
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for Spinlock<T> {
    fn default() -> Self {
        Spinlock::new(T::default())
    }
}

impl<T> Drop for SpinlockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
        int::restore(self.interrupts);
    }
}

impl<T> Deref for SpinlockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // The guard is the only way in while `held` is set.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinlockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}
