//! Condition queues attached to an exclusive synchronizer.
//!
//! A waiter enters the condition queue, fully releases the synchronizer
//! (saving the state word), parks until it is signalled, interrupted or timed
//! out, then re-acquires with the saved state before returning. Whatever woke
//! it, the waiter always holds the synchronizer again when `wait*` returns.
//!
//! Signal and self-transfer (after a timeout or interrupt) both move the node
//! under the queue lock, so exactly one of them wins. A signal that lands on a
//! waiter which already gave up therefore never disappears: it is taken by
//! the next waiter in the condition queue instead.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, SyncError};
use crate::queue::node::{Mode, NodeId};
use crate::queue::synchronizer::{Acquisition, Hooks, QueuedSynchronizer, StateOf, WaitPolicy};
use crate::util::ArenaIndex;
use crate::waiter::Waiter;

/// How a wait must report an interrupt once the synchronizer is re-acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptMode {
    None,
    /// Interrupted before any signal: fail with [`SyncError::Interrupted`].
    Throw,
    /// Interrupted after a signal (or uninterruptibly): re-assert the flag.
    Reinterrupt,
}

/// Why a wait loop stopped parking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wakeup {
    Transferred,
    TimedOut,
}

/// A condition bound to one [`QueuedSynchronizer`].
///
/// Every operation requires the calling thread to hold the synchronizer
/// exclusively, as reported by [`Hooks::is_held_exclusively`].
pub struct ConditionObject<H: Hooks> {
    sync: Arc<QueuedSynchronizer<H>>,
    id: ArenaIndex,
}

impl<H: Hooks> ConditionObject<H> {
    pub(crate) fn new(sync: Arc<QueuedSynchronizer<H>>, id: ArenaIndex) -> Self {
        Self { sync, id }
    }

    pub(crate) fn id(&self) -> ArenaIndex {
        self.id
    }

    /// Returns the synchronizer this condition belongs to.
    #[must_use]
    pub fn synchronizer(&self) -> &Arc<QueuedSynchronizer<H>> {
        &self.sync
    }

    /// Waits until signalled or interrupted.
    ///
    /// # Errors
    ///
    /// [`SyncError::IllegalMonitorState`] if the caller does not hold the
    /// synchronizer, [`SyncError::Interrupted`] if interrupted before being
    /// signalled. In the interrupted case the synchronizer has been
    /// re-acquired before the error is returned.
    pub fn wait(&self) -> Result<()> {
        self.wait_inner(true, None).map(drop)
    }

    /// Waits until signalled. Interrupts are recorded and re-asserted on
    /// return rather than ending the wait.
    pub fn wait_uninterruptibly(&self) -> Result<()> {
        self.wait_inner(false, None).map(drop)
    }

    /// Waits until signalled, interrupted or `timeout` elapses.
    ///
    /// Returns `None` on timeout, otherwise the unused portion of `timeout`
    /// (which may be zero if the signal arrived just before the deadline).
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<Duration>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait().map(|()| Some(timeout));
        };
        let signalled = self.wait_inner(true, Some(deadline))?;
        Ok(signalled.then(|| deadline.saturating_duration_since(Instant::now())))
    }

    /// Waits until signalled, interrupted or `deadline` passes.
    ///
    /// Returns false if the deadline passed first.
    pub fn wait_until(&self, deadline: Instant) -> Result<bool> {
        self.wait_inner(true, Some(deadline))
    }

    /// Like [`wait_until`](Self::wait_until) with a relative timeout.
    pub fn wait_for(&self, timeout: Duration) -> Result<bool> {
        self.wait_timeout(timeout).map(|left| left.is_some())
    }

    /// Moves the longest waiter, if any, to the synchronizer's queue.
    pub fn signal(&self) -> Result<()> {
        self.sync.require_exclusive("signal")?;
        self.sync.queue.lock().transfer_for_signal(self.id);
        Ok(())
    }

    /// Moves every waiter to the synchronizer's queue, in wait order.
    pub fn signal_all(&self) -> Result<()> {
        self.sync.require_exclusive("signal_all")?;
        let mut queue = self.sync.queue.lock();
        let mut moved = 0usize;
        while queue.transfer_for_signal(self.id) {
            moved += 1;
        }
        drop(queue);
        tracing::trace!(moved, "signal_all");
        Ok(())
    }

    /// Returns true if any thread is waiting on this condition.
    pub fn has_waiters(&self) -> Result<bool> {
        self.sync.has_waiters(self)
    }

    /// Returns an estimate of the number of waiting threads.
    pub fn wait_queue_length(&self) -> Result<usize> {
        self.sync.wait_queue_length(self)
    }

    /// Returns the waiting threads, longest waiter first.
    pub fn waiting_threads(&self) -> Result<Vec<Waiter>> {
        self.sync.waiting_threads(self)
    }

    fn wait_inner(&self, interruptible: bool, deadline: Option<Instant>) -> Result<bool> {
        let waiter = Waiter::current();
        if interruptible && waiter.take_interrupt() {
            return Err(SyncError::Interrupted);
        }
        let (node, saved) = self.enter(&waiter)?;

        let mut interrupt = InterruptMode::None;
        let mut wakeup = Wakeup::Transferred;
        while !self.sync.queue.lock().is_on_sync_queue(node) {
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    if self
                        .sync
                        .queue
                        .lock()
                        .transfer_after_cancelled_wait(self.id, node)
                    {
                        wakeup = Wakeup::TimedOut;
                    }
                    break;
                }
                if deadline - now > self.sync.config().timeout_spin_threshold {
                    waiter.park_until(deadline);
                } else {
                    std::hint::spin_loop();
                }
            } else {
                waiter.park();
            }

            if waiter.take_interrupt() {
                if !interruptible {
                    interrupt = InterruptMode::Reinterrupt;
                    continue;
                }
                interrupt = if self
                    .sync
                    .queue
                    .lock()
                    .transfer_after_cancelled_wait(self.id, node)
                {
                    InterruptMode::Throw
                } else {
                    InterruptMode::Reinterrupt
                };
                break;
            }
        }

        let outcome = self.sync.acquire_queued(
            node,
            &waiter,
            Mode::Exclusive,
            saved,
            WaitPolicy::UNINTERRUPTIBLE,
        )?;
        if outcome == (Acquisition::Acquired { interrupted: true })
            && interrupt != InterruptMode::Throw
        {
            interrupt = InterruptMode::Reinterrupt;
        }
        tracing::trace!(node = ?node, ?wakeup, ?interrupt, "condition wait finished");

        match interrupt {
            InterruptMode::Throw => Err(SyncError::Interrupted),
            InterruptMode::Reinterrupt => {
                waiter.restore_interrupt();
                Ok(wakeup == Wakeup::Transferred)
            }
            InterruptMode::None => Ok(wakeup == Wakeup::Transferred),
        }
    }

    /// Joins the condition queue and fully releases the synchronizer.
    fn enter(&self, waiter: &Waiter) -> Result<(NodeId, StateOf<H>)> {
        self.sync.require_exclusive("wait")?;
        let node = self
            .sync
            .queue
            .lock()
            .add_condition_waiter(self.id, waiter.clone());
        let saved = self.sync.state();
        let released = match self.sync.release(saved) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SyncError::IllegalMonitorState(
                "wait could not fully release",
            )),
            Err(err) => Err(err),
        };
        if let Err(err) = released {
            self.sync
                .queue
                .lock()
                .remove_condition_waiter(self.id, node);
            return Err(err);
        }
        Ok((node, saved))
    }
}

impl<H: Hooks> Drop for ConditionObject<H> {
    fn drop(&mut self) {
        self.sync.queue.lock().conditions.remove(self.id);
    }
}

impl<H: Hooks> fmt::Debug for ConditionObject<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionObject")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
