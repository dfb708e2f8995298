//! Reentrant mutual-exclusion lock built on the queued synchronizer.
//!
//! The state word is the hold count: zero means unlocked, `n > 0` means the
//! owning thread has locked `n` times without unlocking. The owner is
//! recorded as the synchronizer's exclusive owner.
//!
//! # Fairness
//!
//! A non-fair mutex lets an arriving thread take a free lock even when others
//! are queued (barging). A fair mutex refuses to barge when the queue has a
//! thread ahead of the caller, except through [`ReentrantMutex::try_lock`],
//! which always barges.
//!
//! # Example
//!
//! ```
//! use qsync::sync::ReentrantMutex;
//!
//! let mutex = ReentrantMutex::new();
//! let outer = mutex.guard()?;
//! let inner = mutex.guard()?;
//! assert_eq!(mutex.hold_count(), 2);
//! drop(inner);
//! drop(outer);
//! assert!(!mutex.is_locked());
//! # Ok::<(), qsync::SyncError>(())
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::AtomicI32;
use std::time::{Duration, Instant};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::queue::{ConditionObject, Hooks, QueuedSynchronizer};
use crate::waiter::Waiter;

/// Hooks of [`ReentrantMutex`]: hold count in a 32-bit word.
#[derive(Debug)]
pub struct LockSync {
    fair: bool,
}

impl LockSync {
    /// Returns true if this lock refuses to barge past queued threads.
    #[must_use]
    pub const fn is_fair(&self) -> bool {
        self.fair
    }

    /// Acquire path shared by fair and non-fair modes.
    fn acquire_hold(
        sync: &QueuedSynchronizer<Self>,
        acquires: i32,
        respect_queue: bool,
    ) -> Result<bool> {
        let current = sync.state();
        if current == 0 {
            if respect_queue && sync.has_queued_predecessors() {
                return Ok(false);
            }
            if sync.compare_and_set_state(0, acquires) {
                sync.set_exclusive_owner(Some(&Waiter::current()));
                return Ok(true);
            }
            return Ok(false);
        }
        if sync.is_owned_by_current() {
            let next = current
                .checked_add(acquires)
                .ok_or(SyncError::CountOverflow("maximum lock count exceeded"))?;
            // Only the owner writes a non-zero state, so a plain store suffices.
            sync.set_state(next);
            return Ok(true);
        }
        Ok(false)
    }
}

impl Hooks for LockSync {
    type Word = AtomicI32;

    fn try_acquire(&self, sync: &QueuedSynchronizer<Self>, acquires: i32) -> Result<bool> {
        Self::acquire_hold(sync, acquires, self.fair)
    }

    fn try_release(&self, sync: &QueuedSynchronizer<Self>, releases: i32) -> Result<bool> {
        if !sync.is_owned_by_current() {
            return Err(SyncError::IllegalMonitorState(
                "unlock by a thread that does not hold the lock",
            ));
        }
        let next = sync.state() - releases;
        let free = next == 0;
        if free {
            sync.set_exclusive_owner(None);
        }
        sync.set_state(next);
        Ok(free)
    }

    fn is_held_exclusively(&self, sync: &QueuedSynchronizer<Self>) -> Result<bool> {
        Ok(sync.is_owned_by_current())
    }
}

/// Condition variable bound to a [`ReentrantMutex`].
pub type MutexCondition = ConditionObject<LockSync>;

/// A reentrant mutual-exclusion lock with optional fairness and conditions.
///
/// Cloning is cheap and yields a handle to the same lock.
#[derive(Clone)]
pub struct ReentrantMutex {
    sync: Arc<QueuedSynchronizer<LockSync>>,
}

impl ReentrantMutex {
    /// Creates a non-fair mutex.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fairness(false)
    }

    /// Creates a fair mutex.
    #[must_use]
    pub fn fair() -> Self {
        Self::with_fairness(true)
    }

    /// Creates a mutex with the given fairness policy.
    #[must_use]
    pub fn with_fairness(fair: bool) -> Self {
        Self::with_config(fair, SyncConfig::default())
    }

    /// Creates a mutex with the given fairness policy and tuning.
    #[must_use]
    pub fn with_config(fair: bool, config: SyncConfig) -> Self {
        Self {
            sync: Arc::new(QueuedSynchronizer::with_config(
                LockSync { fair },
                0,
                config,
            )),
        }
    }

    /// Acquires the lock, parking until it is available. Interrupts are
    /// deferred until the lock is held.
    ///
    /// # Errors
    ///
    /// [`SyncError::CountOverflow`] if the caller already holds the lock
    /// `i32::MAX` times.
    pub fn lock(&self) -> Result<()> {
        self.sync.acquire(1)
    }

    /// Acquires the lock unless the calling thread is interrupted.
    pub fn lock_interruptibly(&self) -> Result<()> {
        self.sync.acquire_interruptibly(1)
    }

    /// Acquires the lock only if it is free or already held by the caller.
    ///
    /// Barges even on a fair mutex.
    pub fn try_lock(&self) -> Result<bool> {
        LockSync::acquire_hold(&self.sync, 1, false)
    }

    /// Acquires the lock if it becomes available within `timeout`.
    ///
    /// Honors the fairness policy, unlike [`try_lock`](Self::try_lock).
    pub fn try_lock_for(&self, timeout: Duration) -> Result<bool> {
        self.sync.try_acquire_for(1, timeout)
    }

    /// Acquires the lock if it becomes available before `deadline`.
    pub fn try_lock_until(&self, deadline: Instant) -> Result<bool> {
        self.sync.try_acquire_until(1, deadline)
    }

    /// Releases one hold. The lock is freed when the hold count reaches zero.
    ///
    /// # Errors
    ///
    /// [`SyncError::IllegalMonitorState`] if the caller does not hold the lock.
    pub fn unlock(&self) -> Result<()> {
        self.sync.release(1).map(drop)
    }

    /// Acquires the lock and returns a guard that unlocks on drop.
    pub fn guard(&self) -> Result<ReentrantMutexGuard<'_>> {
        self.lock()?;
        Ok(ReentrantMutexGuard {
            mutex: self,
            _not_send: PhantomData,
        })
    }

    /// Creates a condition bound to this lock.
    #[must_use]
    pub fn new_condition(&self) -> MutexCondition {
        self.sync.new_condition()
    }

    /// Returns the number of holds the calling thread has on this lock.
    #[must_use]
    pub fn hold_count(&self) -> u32 {
        if self.sync.is_owned_by_current() {
            u32::try_from(self.sync.state()).unwrap_or(0)
        } else {
            0
        }
    }

    /// Returns true if the calling thread holds this lock.
    #[must_use]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.sync.is_owned_by_current()
    }

    /// Returns true if any thread holds this lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.sync.state() != 0
    }

    /// Returns true if this lock is fair.
    #[must_use]
    pub fn is_fair(&self) -> bool {
        self.sync.hooks().is_fair()
    }

    /// Returns the thread holding the lock, if any.
    #[must_use]
    pub fn owner(&self) -> Option<Waiter> {
        if self.is_locked() {
            self.sync.exclusive_owner()
        } else {
            None
        }
    }

    /// Returns true if any thread is queued for the lock.
    #[must_use]
    pub fn has_queued_threads(&self) -> bool {
        self.sync.has_queued_threads()
    }

    /// Returns true if `waiter` is queued for the lock.
    #[must_use]
    pub fn has_queued_thread(&self, waiter: &Waiter) -> bool {
        self.sync.is_queued(waiter)
    }

    /// Returns the number of threads queued for the lock.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.sync.queue_length()
    }

    /// Returns the threads queued for the lock.
    #[must_use]
    pub fn queued_threads(&self) -> Vec<Waiter> {
        self.sync.queued_threads()
    }

    /// Returns true if any thread waits on `condition`. Requires the lock.
    pub fn has_waiters(&self, condition: &MutexCondition) -> Result<bool> {
        self.sync.has_waiters(condition)
    }

    /// Returns the number of threads waiting on `condition`. Requires the lock.
    pub fn wait_queue_length(&self, condition: &MutexCondition) -> Result<usize> {
        self.sync.wait_queue_length(condition)
    }

    /// Returns the threads waiting on `condition`. Requires the lock.
    pub fn waiting_threads(&self, condition: &MutexCondition) -> Result<Vec<Waiter>> {
        self.sync.waiting_threads(condition)
    }
}

impl Default for ReentrantMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReentrantMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner() {
            Some(owner) => write!(f, "ReentrantMutex[Locked by {owner}]"),
            None => f.write_str("ReentrantMutex[Unlocked]"),
        }
    }
}

impl fmt::Debug for ReentrantMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrantMutex")
            .field("fair", &self.is_fair())
            .field("state", &self.sync.state())
            .field("owner", &self.owner())
            .field("queue_length", &self.queue_length())
            .finish()
    }
}

/// A guard that releases one hold when dropped.
///
/// The hold belongs to the locking thread, so the guard cannot leave it:
///
/// ```compile_fail
/// use qsync::sync::ReentrantMutex;
///
/// let mutex = ReentrantMutex::new();
/// let guard = mutex.guard().unwrap();
/// std::thread::scope(|s| {
///     s.spawn(move || drop(guard));
/// });
/// ```
#[must_use = "guard will be immediately released if not held"]
pub struct ReentrantMutexGuard<'a> {
    mutex: &'a ReentrantMutex,
    _not_send: PhantomData<*const ()>,
}

impl ReentrantMutexGuard<'_> {
    /// Returns the mutex this guard holds.
    #[must_use]
    pub fn mutex(&self) -> &ReentrantMutex {
        self.mutex
    }
}

impl fmt::Debug for ReentrantMutexGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrantMutexGuard")
            .field("hold_count", &self.mutex.hold_count())
            .finish()
    }
}

impl Drop for ReentrantMutexGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.mutex.unlock() {
            tracing::error!(error = %err, "failed to release mutex guard");
        }
    }
}
