//! One-shot countdown latch.
//!
//! Threads calling [`CountDownLatch::wait`] block until the count reaches
//! zero; the release that brings it to zero wakes every queued waiter
//! through shared-mode propagation. The count cannot be reset.

use std::fmt;
use std::sync::atomic::AtomicI64;
use std::time::Duration;

use crate::error::Result;
use crate::queue::{Hooks, QueuedSynchronizer};

#[derive(Debug)]
struct CountSync;

impl Hooks for CountSync {
    type Word = AtomicI64;

    fn try_acquire_shared(&self, sync: &QueuedSynchronizer<Self>, _arg: i64) -> Result<i64> {
        Ok(if sync.state() == 0 { 1 } else { -1 })
    }

    fn try_release_shared(&self, sync: &QueuedSynchronizer<Self>, _arg: i64) -> Result<bool> {
        loop {
            let count = sync.state();
            if count == 0 {
                return Ok(false);
            }
            if sync.compare_and_set_state(count, count - 1) {
                return Ok(count == 1);
            }
        }
    }
}

/// A latch that opens once it has been counted down to zero.
pub struct CountDownLatch {
    sync: QueuedSynchronizer<CountSync>,
}

impl CountDownLatch {
    /// Creates a latch that opens after `count` calls to
    /// [`count_down`](Self::count_down).
    ///
    /// # Panics
    ///
    /// Panics if `count` is negative.
    #[must_use]
    pub fn new(count: i64) -> Self {
        assert!(count >= 0, "latch count must be non-negative");
        Self {
            sync: QueuedSynchronizer::with_state(CountSync, count),
        }
    }

    /// Blocks until the count reaches zero.
    ///
    /// # Errors
    ///
    /// [`SyncError::Interrupted`](crate::SyncError::Interrupted) if the
    /// calling thread is interrupted first.
    pub fn wait(&self) -> Result<()> {
        self.sync.acquire_shared_interruptibly(1)
    }

    /// Blocks until the count reaches zero or `timeout` elapses.
    ///
    /// Returns false on timeout.
    pub fn wait_for(&self, timeout: Duration) -> Result<bool> {
        self.sync.try_acquire_shared_for(1, timeout)
    }

    /// Decrements the count, opening the latch when it reaches zero.
    /// Does nothing once the latch is open.
    pub fn count_down(&self) {
        // The count-down hook cannot fail.
        if let Err(err) = self.sync.release_shared(1) {
            tracing::error!(error = %err, "latch count_down failed");
        }
    }

    /// Returns the current count.
    #[must_use]
    pub fn count(&self) -> i64 {
        self.sync.state()
    }

    /// Returns the number of threads waiting for the latch.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.sync.queue_length()
    }
}

impl fmt::Display for CountDownLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CountDownLatch[Count = {}]", self.count())
    }
}

impl fmt::Debug for CountDownLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountDownLatch")
            .field("count", &self.count())
            .field("queue_length", &self.queue_length())
            .finish()
    }
}
