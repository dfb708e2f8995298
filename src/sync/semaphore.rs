//! Counting semaphore built on shared-mode acquisition.
//!
//! The state word holds the number of available permits. Acquiring `n`
//! permits subtracts `n` when enough are available; releasing adds them back
//! and wakes queued acquirers, with the wakeup propagating down the queue as
//! long as permits remain.
//!
//! # Example
//!
//! ```
//! use qsync::sync::Semaphore;
//!
//! let sem = Semaphore::new(2);
//! let permit = sem.acquire(1)?;
//! assert_eq!(sem.available_permits(), 1);
//! drop(permit);
//! assert_eq!(sem.available_permits(), 2);
//! # Ok::<(), qsync::SyncError>(())
//! ```

use std::fmt;
use std::sync::atomic::AtomicI32;
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::queue::{Hooks, QueuedSynchronizer};

/// Hooks of [`Semaphore`]: available permits in a 32-bit word.
#[derive(Debug)]
pub struct PermitSync {
    fair: bool,
}

impl PermitSync {
    fn acquire_permits(sync: &QueuedSynchronizer<Self>, acquires: i32, respect_queue: bool) -> i32 {
        loop {
            if respect_queue && sync.has_queued_predecessors() {
                return -1;
            }
            let available = sync.state();
            let Some(remaining) = available.checked_sub(acquires) else {
                return -1;
            };
            if remaining < 0 || sync.compare_and_set_state(available, remaining) {
                return remaining;
            }
        }
    }
}

impl Hooks for PermitSync {
    type Word = AtomicI32;

    fn try_acquire_shared(&self, sync: &QueuedSynchronizer<Self>, acquires: i32) -> Result<i32> {
        Ok(Self::acquire_permits(sync, acquires, self.fair))
    }

    fn try_release_shared(&self, sync: &QueuedSynchronizer<Self>, releases: i32) -> Result<bool> {
        loop {
            let current = sync.state();
            let next = current
                .checked_add(releases)
                .ok_or(SyncError::CountOverflow("maximum permit count exceeded"))?;
            if sync.compare_and_set_state(current, next) {
                return Ok(true);
            }
        }
    }
}

fn to_word(permits: u32) -> i32 {
    i32::try_from(permits).unwrap_or_else(|_| panic!("permit count {permits} exceeds i32::MAX"))
}

/// A counting semaphore.
pub struct Semaphore {
    sync: QueuedSynchronizer<PermitSync>,
}

impl Semaphore {
    /// Creates a non-fair semaphore with `permits` available permits.
    ///
    /// # Panics
    ///
    /// Panics if `permits` exceeds `i32::MAX`.
    #[must_use]
    pub fn new(permits: u32) -> Self {
        Self::with_fairness(permits, false)
    }

    /// Creates a fair semaphore: queued acquirers are served in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if `permits` exceeds `i32::MAX`.
    #[must_use]
    pub fn fair(permits: u32) -> Self {
        Self::with_fairness(permits, true)
    }

    /// Creates a semaphore with the given fairness policy.
    ///
    /// # Panics
    ///
    /// Panics if `permits` exceeds `i32::MAX`.
    #[must_use]
    pub fn with_fairness(permits: u32, fair: bool) -> Self {
        Self {
            sync: QueuedSynchronizer::with_state(PermitSync { fair }, to_word(permits)),
        }
    }

    /// Returns the number of permits currently available.
    ///
    /// May be negative after [`reduce_permits`](Self::reduce_permits).
    #[must_use]
    pub fn available_permits(&self) -> i32 {
        self.sync.state()
    }

    /// Returns true if this semaphore is fair.
    #[must_use]
    pub fn is_fair(&self) -> bool {
        self.sync.hooks().fair
    }

    /// Acquires `count` permits, parking until they are available.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero or exceeds `i32::MAX`.
    pub fn acquire(&self, count: u32) -> Result<SemaphorePermit<'_>> {
        assert!(count > 0, "cannot acquire 0 permits");
        self.sync.acquire_shared(to_word(count))?;
        Ok(SemaphorePermit { sem: self, count })
    }

    /// Acquires `count` permits unless the calling thread is interrupted.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero or exceeds `i32::MAX`.
    pub fn acquire_interruptibly(&self, count: u32) -> Result<SemaphorePermit<'_>> {
        assert!(count > 0, "cannot acquire 0 permits");
        self.sync.acquire_shared_interruptibly(to_word(count))?;
        Ok(SemaphorePermit { sem: self, count })
    }

    /// Acquires `count` permits only if they are available right now.
    ///
    /// Barges even on a fair semaphore.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero or exceeds `i32::MAX`.
    #[must_use]
    pub fn try_acquire(&self, count: u32) -> Option<SemaphorePermit<'_>> {
        assert!(count > 0, "cannot acquire 0 permits");
        let remaining = PermitSync::acquire_permits(&self.sync, to_word(count), false);
        (remaining >= 0).then_some(SemaphorePermit { sem: self, count })
    }

    /// Acquires `count` permits if they become available within `timeout`.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero or exceeds `i32::MAX`.
    pub fn try_acquire_for(
        &self,
        count: u32,
        timeout: Duration,
    ) -> Result<Option<SemaphorePermit<'_>>> {
        assert!(count > 0, "cannot acquire 0 permits");
        let acquired = self.sync.try_acquire_shared_for(to_word(count), timeout)?;
        Ok(acquired.then_some(SemaphorePermit { sem: self, count }))
    }

    /// Returns `count` permits to the semaphore, waking queued acquirers.
    ///
    /// # Errors
    ///
    /// [`SyncError::CountOverflow`] if the permit count would exceed `i32::MAX`.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds `i32::MAX`.
    pub fn add_permits(&self, count: u32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        self.sync.release_shared(to_word(count)).map(drop)
    }

    /// Takes every available permit, returning how many were taken.
    pub fn drain_permits(&self) -> i32 {
        loop {
            let current = self.sync.state();
            if current <= 0 || self.sync.compare_and_set_state(current, 0) {
                return current.max(0);
            }
        }
    }

    /// Shrinks the number of available permits without blocking.
    ///
    /// # Errors
    ///
    /// [`SyncError::CountOverflow`] if the count would drop below `i32::MIN`.
    ///
    /// # Panics
    ///
    /// Panics if `reduction` exceeds `i32::MAX`.
    pub fn reduce_permits(&self, reduction: u32) -> Result<()> {
        let reduction = to_word(reduction);
        loop {
            let current = self.sync.state();
            let next = current
                .checked_sub(reduction)
                .ok_or(SyncError::CountOverflow("permit count underflow"))?;
            if self.sync.compare_and_set_state(current, next) {
                return Ok(());
            }
        }
    }

    /// Returns true if any thread is queued for permits.
    #[must_use]
    pub fn has_queued_threads(&self) -> bool {
        self.sync.has_queued_threads()
    }

    /// Returns the number of threads queued for permits.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.sync.queue_length()
    }
}

impl fmt::Display for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Semaphore[Permits = {}]", self.available_permits())
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("permits", &self.available_permits())
            .field("fair", &self.is_fair())
            .field("queue_length", &self.queue_length())
            .finish()
    }
}

/// Permits held from a [`Semaphore`], returned on drop.
#[must_use = "permit will be immediately released if not held"]
pub struct SemaphorePermit<'a> {
    sem: &'a Semaphore,
    count: u32,
}

impl SemaphorePermit<'_> {
    /// Returns the number of permits held.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Keeps the permits acquired forever.
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl fmt::Debug for SemaphorePermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemaphorePermit")
            .field("count", &self.count)
            .finish()
    }
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.sem.add_permits(self.count) {
            tracing::error!(error = %err, count = self.count, "failed to return semaphore permits");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    fn init_test(test_name: &str) {
        init_test_logging();
        crate::test_phase!(test_name);
    }

    fn wait_until_queued(sem: &Semaphore, count: usize) {
        let start = Instant::now();
        while sem.queue_length() < count {
            assert!(
                start.elapsed() < Duration::from_secs(10),
                "timed out waiting for {count} queued threads"
            );
            thread::yield_now();
        }
    }

    #[test]
    fn new_semaphore_has_correct_permits() {
        init_test("new_semaphore_has_correct_permits");
        let sem = Semaphore::new(5);
        let available = sem.available_permits();
        crate::assert_with_log!(available == 5, "available permits", 5, available);
        assert!(!sem.is_fair());
        assert_eq!(sem.to_string(), "Semaphore[Permits = 5]");
        crate::test_complete!("new_semaphore_has_correct_permits");
    }

    #[test]
    fn acquire_decrements_and_drop_restores() {
        init_test("acquire_decrements_and_drop_restores");
        let sem = Semaphore::new(5);
        let permit = sem.acquire(2).expect("acquire");
        assert_eq!(permit.count(), 2);
        assert_eq!(sem.available_permits(), 3);
        drop(permit);
        assert_eq!(sem.available_permits(), 5);
        crate::test_complete!("acquire_decrements_and_drop_restores");
    }

    #[test]
    fn try_acquire_respects_availability() {
        init_test("try_acquire_respects_availability");
        let sem = Semaphore::new(1);
        let held = sem.try_acquire(1).expect("first");
        let none = sem.try_acquire(1).is_none();
        crate::assert_with_log!(none, "no permit left", true, none);
        drop(held);
        assert!(sem.try_acquire(1).is_some());
        crate::test_complete!("try_acquire_respects_availability");
    }

    #[test]
    fn forget_keeps_permits() {
        init_test("forget_keeps_permits");
        let sem = Semaphore::new(3);
        sem.acquire(2).expect("acquire").forget();
        assert_eq!(sem.available_permits(), 1);
        crate::test_complete!("forget_keeps_permits");
    }

    #[test]
    fn drain_and_reduce() {
        init_test("drain_and_reduce");
        let sem = Semaphore::new(4);
        assert_eq!(sem.drain_permits(), 4);
        assert_eq!(sem.drain_permits(), 0);
        sem.reduce_permits(2).expect("reduce");
        assert_eq!(sem.available_permits(), -2);
        assert!(sem.try_acquire(1).is_none());
        sem.add_permits(3).expect("add");
        assert!(sem.try_acquire(1).is_some());
        crate::test_complete!("drain_and_reduce");
    }

    #[test]
    fn release_past_max_overflows() {
        init_test("release_past_max_overflows");
        let sem = Semaphore::new(i32::MAX.unsigned_abs());
        assert_eq!(
            sem.add_permits(1),
            Err(SyncError::CountOverflow("maximum permit count exceeded"))
        );
        assert_eq!(sem.available_permits(), i32::MAX);
        crate::test_complete!("release_past_max_overflows");
    }

    #[test]
    #[should_panic(expected = "cannot acquire 0 permits")]
    fn zero_permit_acquire_panics() {
        let sem = Semaphore::new(1);
        let _ = sem.try_acquire(0);
    }

    #[test]
    #[should_panic(expected = "exceeds i32::MAX")]
    fn oversized_reduction_panics() {
        let sem = Semaphore::new(1);
        let _ = sem.reduce_permits(u32::MAX);
    }

    #[test]
    #[should_panic(expected = "exceeds i32::MAX")]
    fn oversized_fair_semaphore_panics() {
        let _ = Semaphore::fair(u32::MAX);
    }

    #[test]
    fn try_acquire_for_times_out() {
        init_test("try_acquire_for_times_out");
        let sem = Semaphore::fair(0);
        let got = sem
            .try_acquire_for(1, Duration::from_millis(20))
            .expect("no error");
        assert!(got.is_none());
        assert_eq!(sem.queue_length(), 0);
        crate::test_complete!("try_acquire_for_times_out");
    }

    #[test]
    fn release_propagates_to_several_waiters() {
        init_test("release_propagates_to_several_waiters");
        let sem = Arc::new(Semaphore::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let (s, d) = (Arc::clone(&sem), Arc::clone(&done));
                thread::spawn(move || {
                    s.acquire(1).expect("acquire").forget();
                    d.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        wait_until_queued(&sem, 3);
        assert!(sem.has_queued_threads());
        sem.add_permits(3).expect("add");
        for handle in handles {
            handle.join().expect("join");
        }
        let done = done.load(Ordering::SeqCst);
        crate::assert_with_log!(done == 3, "every waiter got a permit", 3usize, done);
        assert_eq!(sem.available_permits(), 0);
        crate::test_complete!("release_propagates_to_several_waiters");
    }

    #[test]
    fn fair_semaphore_does_not_barge_queued_waiter() {
        init_test("fair_semaphore_does_not_barge_queued_waiter");
        let sem = Arc::new(Semaphore::fair(0));
        let s = Arc::clone(&sem);
        let handle = thread::spawn(move || s.acquire(2).expect("acquire").forget());
        wait_until_queued(&sem, 1);

        sem.add_permits(1).expect("add");
        // A fair timed acquire of one permit must not overtake the queued request.
        let barged = sem
            .try_acquire_for(1, Duration::ZERO)
            .expect("no error")
            .is_some();
        crate::assert_with_log!(!barged, "fair semaphore refused barging", false, barged);
        sem.add_permits(1).expect("add");
        handle.join().expect("join");
        assert_eq!(sem.available_permits(), 0);
        crate::test_complete!("fair_semaphore_does_not_barge_queued_waiter");
    }
}
