//! Thread parking capability.
//!
//! The queue core never blocks a thread directly. It asks the waiting
//! thread's [`Park`] implementation to suspend it and later asks the same
//! implementation to resume it. [`Parker`] is the default implementation for
//! OS threads; a green-thread scheduler can supply its own by registering a
//! different `Park` through [`Waiter::register_current`](crate::Waiter::register_current).
//!
//! Every implementation must follow the permit model: an `unpark` that
//! arrives before the matching `park` is remembered, and the next `park`
//! returns immediately by consuming it. Spurious returns from `park` are
//! allowed; callers always re-check their wait condition.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Suspend/resume capability for one waiting thread or task.
pub trait Park: Send + Sync + fmt::Debug {
    /// Blocks until unparked (or spuriously).
    fn park(&self);

    /// Blocks until unparked, until `deadline` passes, or spuriously.
    fn park_until(&self, deadline: Instant);

    /// Wakes the parked thread, or leaves a permit for its next `park`.
    fn unpark(&self);
}

#[derive(Debug)]
struct ParkerInner {
    notified: AtomicBool,
    waiting: AtomicUsize,
    mutex: Mutex<()>,
    cvar: Condvar,
}

/// Permit-based parker for OS threads.
#[derive(Debug)]
pub struct Parker {
    inner: ParkerInner,
}

impl Parker {
    /// Creates a new parker with no permit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: ParkerInner {
                notified: AtomicBool::new(false),
                waiting: AtomicUsize::new(0),
                mutex: Mutex::new(()),
                cvar: Condvar::new(),
            },
        }
    }

    #[inline]
    fn lock_unpoisoned(&self) -> MutexGuard<'_, ()> {
        self.inner
            .mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn try_consume(&self) -> bool {
        self.inner
            .notified
            .compare_exchange(true, false, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for Parker {
    fn default() -> Self {
        Self::new()
    }
}

impl Park for Parker {
    fn park(&self) {
        if self.try_consume() {
            return;
        }

        self.inner.waiting.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.lock_unpoisoned();
        while !self.try_consume() {
            guard = self
                .inner
                .cvar
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        self.inner.waiting.fetch_sub(1, Ordering::SeqCst);
        drop(guard);
    }

    fn park_until(&self, deadline: Instant) {
        if self.try_consume() {
            return;
        }
        let Some(timeout) = deadline.checked_duration_since(Instant::now()) else {
            return;
        };
        if timeout.is_zero() {
            return;
        }

        self.inner.waiting.fetch_add(1, Ordering::SeqCst);
        let (guard, _timeout) = self
            .inner
            .cvar
            .wait_timeout_while(self.lock_unpoisoned(), timeout, |()| !self.try_consume())
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.waiting.fetch_sub(1, Ordering::SeqCst);
        drop(guard);
    }

    fn unpark(&self) {
        if self
            .inner
            .notified
            .compare_exchange(false, true, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            // Permit already published.
            return;
        }
        if self.inner.waiting.load(Ordering::SeqCst) == 0 {
            return;
        }
        // Taking the mutex orders this notify after the waiter's condition check.
        let _guard = self.lock_unpoisoned();
        self.inner.cvar.notify_one();
    }
}
