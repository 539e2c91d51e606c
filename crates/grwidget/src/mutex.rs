//! Fail-fast mutex shared between the application loop and interrupting
//! producers.
//!
//! Acquisition is a single compare-and-swap from free to held. It never spins
//! and never sleeps: a producer that finds the mutex held gives up at once,
//! because the holder is the context it interrupted and cannot make progress
//! until the producer returns. Release is an unconditional store of free.
//!
//! There are no fairness or priority-inheritance guarantees.

use std::sync::atomic::{AtomicBool, Ordering};

/// A single-word mutex with non-blocking acquire.
#[derive(Debug, Default)]
pub struct WidgetMutex {
    held: AtomicBool,
}

impl WidgetMutex {
    /// Create a mutex in the free state.
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Try to take the mutex.
    ///
    /// Returns `true` if the caller now owns the mutex and must call
    /// [`release`](Self::release), or `false` if it was already held.
    #[inline]
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Return the mutex to the free state.
    ///
    /// This does not check ownership.
    #[inline]
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    /// Check whether some context currently holds the mutex.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }

    /// Try to take the mutex, returning a guard that releases it on drop.
    #[inline]
    pub fn try_lock(&self) -> Option<WidgetMutexGuard<'_>> {
        self.try_acquire().then_some(WidgetMutexGuard { mutex: self })
    }

    /// Take the mutex, retrying until the current holder lets go.
    ///
    /// Only the draining context uses this. Producers hold the mutex for a
    /// handful of stores, so the wait is bounded by one enqueue.
    pub(crate) fn lock_spinning(&self) -> WidgetMutexGuard<'_> {
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            std::hint::spin_loop();
        }
    }
}

/// Releases the owning [`WidgetMutex`] when dropped.
#[derive(Debug)]
#[must_use = "the mutex is released as soon as the guard is dropped"]
pub struct WidgetMutexGuard<'a> {
    mutex: &'a WidgetMutex,
}

impl Drop for WidgetMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.release();
    }
}
