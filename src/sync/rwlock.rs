//! Reentrant read-write lock built on both modes of the queued synchronizer.
//!
//! The 64-bit state word is split in two: the low half counts write holds
//! (all by the one owning thread), the high half counts read holds across
//! every reader. Writers queue as exclusive nodes and readers as shared
//! nodes in the same FIFO queue, so a released writer hands the lock to the
//! whole run of readers queued behind it and to nobody past the next writer.
//!
//! # Reentrancy
//!
//! Both locks are reentrant. The write holder may also take the read lock,
//! and releasing the write lock afterwards downgrades it to a read hold.
//! Upgrading is refused: asking for the write lock while holding only the
//! read lock fails with [`SyncError::IllegalMonitorState`] instead of
//! deadlocking.
//!
//! # Fairness
//!
//! A fair lock grants in arrival order. A non-fair lock lets writers barge,
//! and lets readers barge unless the first queued thread is a writer, which
//! keeps a steady stream of readers from starving writers. A thread that
//! already holds read holds may always re-enter.
//!
//! # Example
//!
//! ```
//! use qsync::sync::ReadWriteLock;
//!
//! let lock = ReadWriteLock::new();
//! {
//!     let _a = lock.read()?;
//!     let _b = lock.read()?;
//!     assert_eq!(lock.read_lock_count(), 2);
//!     assert!(!lock.try_lock_write()?);
//! }
//! let _w = lock.write()?;
//! assert!(lock.is_write_locked_by_current_thread());
//! # Ok::<(), qsync::SyncError>(())
//! ```

use parking_lot::Mutex as ParkingMutex;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::time::Duration;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::queue::{ConditionObject, Hooks, QueuedSynchronizer};
use crate::waiter::{Waiter, WaiterId};

const SHARED_SHIFT: u32 = 32;
const SHARED_UNIT: i64 = 1 << SHARED_SHIFT;
const EXCLUSIVE_MASK: i64 = SHARED_UNIT - 1;
/// Limit for each half of the word.
const MAX_COUNT: i64 = (1 << 31) - 1;

const fn shared_count(state: i64) -> i64 {
    state >> SHARED_SHIFT
}

const fn exclusive_count(state: i64) -> i64 {
    state & EXCLUSIVE_MASK
}

/// Hooks of [`ReadWriteLock`].
#[derive(Debug)]
pub struct RwSync {
    fair: bool,
    /// Read holds per thread; the state word only carries the total.
    read_holds: ParkingMutex<HashMap<WaiterId, u32>>,
}

impl RwSync {
    /// Returns true if this lock grants in arrival order.
    #[must_use]
    pub const fn is_fair(&self) -> bool {
        self.fair
    }

    fn held_reads(&self) -> u32 {
        self.read_holds
            .lock()
            .get(&Waiter::current().id())
            .copied()
            .unwrap_or(0)
    }

    fn reader_should_block(&self, sync: &QueuedSynchronizer<Self>) -> bool {
        if self.fair {
            sync.has_queued_predecessors()
        } else {
            sync.first_queued_is_exclusive()
        }
    }

    fn acquire_write(
        &self,
        sync: &QueuedSynchronizer<Self>,
        acquires: i64,
        respect_queue: bool,
    ) -> Result<bool> {
        let current = sync.state();
        if current != 0 {
            let writes = exclusive_count(current);
            if writes == 0 {
                if self.held_reads() > 0 {
                    return Err(SyncError::IllegalMonitorState(
                        "write lock requested while holding the read lock",
                    ));
                }
                return Ok(false);
            }
            if !sync.is_owned_by_current() {
                return Ok(false);
            }
            if writes + exclusive_count(acquires) > MAX_COUNT {
                return Err(SyncError::CountOverflow("maximum write lock count exceeded"));
            }
            // Readers cannot enter while we hold the write lock.
            sync.set_state(current + acquires);
            return Ok(true);
        }
        if respect_queue && sync.has_queued_predecessors() {
            return Ok(false);
        }
        if !sync.compare_and_set_state(0, acquires) {
            return Ok(false);
        }
        sync.set_exclusive_owner(Some(&Waiter::current()));
        Ok(true)
    }

    fn acquire_read(&self, sync: &QueuedSynchronizer<Self>, respect_queue: bool) -> Result<i64> {
        loop {
            let current = sync.state();
            if exclusive_count(current) != 0 {
                if !sync.is_owned_by_current() {
                    return Ok(-1);
                }
            } else if respect_queue && self.reader_should_block(sync) && self.held_reads() == 0 {
                return Ok(-1);
            }
            if shared_count(current) == MAX_COUNT {
                return Err(SyncError::CountOverflow("maximum read lock count exceeded"));
            }
            if sync.compare_and_set_state(current, current + SHARED_UNIT) {
                *self
                    .read_holds
                    .lock()
                    .entry(Waiter::current().id())
                    .or_insert(0) += 1;
                return Ok(1);
            }
        }
    }
}

impl Hooks for RwSync {
    type Word = AtomicI64;

    fn try_acquire(&self, sync: &QueuedSynchronizer<Self>, acquires: i64) -> Result<bool> {
        self.acquire_write(sync, acquires, self.fair)
    }

    fn try_release(&self, sync: &QueuedSynchronizer<Self>, releases: i64) -> Result<bool> {
        if !sync.is_owned_by_current() {
            return Err(SyncError::IllegalMonitorState(
                "write unlock by a thread that does not hold the write lock",
            ));
        }
        let next = sync.state() - releases;
        let free = exclusive_count(next) == 0;
        if free {
            sync.set_exclusive_owner(None);
        }
        sync.set_state(next);
        Ok(free)
    }

    fn try_acquire_shared(&self, sync: &QueuedSynchronizer<Self>, _arg: i64) -> Result<i64> {
        self.acquire_read(sync, true)
    }

    fn try_release_shared(&self, sync: &QueuedSynchronizer<Self>, _arg: i64) -> Result<bool> {
        let me = Waiter::current().id();
        {
            let mut holds = self.read_holds.lock();
            match holds.get_mut(&me) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    holds.remove(&me);
                }
                None => {
                    return Err(SyncError::IllegalMonitorState(
                        "read unlock by a thread that does not hold the read lock",
                    ));
                }
            }
        }
        loop {
            let current = sync.state();
            let next = current - SHARED_UNIT;
            if sync.compare_and_set_state(current, next) {
                return Ok(next == 0);
            }
        }
    }

    fn is_held_exclusively(&self, sync: &QueuedSynchronizer<Self>) -> Result<bool> {
        Ok(sync.is_owned_by_current())
    }
}

/// Condition variable bound to the write side of a [`ReadWriteLock`].
pub type WriteCondition = ConditionObject<RwSync>;

/// A reentrant read-write lock with optional fairness.
///
/// Cloning is cheap and yields a handle to the same lock.
#[derive(Clone)]
pub struct ReadWriteLock {
    sync: Arc<QueuedSynchronizer<RwSync>>,
}

impl ReadWriteLock {
    /// Creates a non-fair read-write lock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fairness(false)
    }

    /// Creates a fair read-write lock.
    #[must_use]
    pub fn fair() -> Self {
        Self::with_fairness(true)
    }

    /// Creates a read-write lock with the given fairness policy.
    #[must_use]
    pub fn with_fairness(fair: bool) -> Self {
        Self::with_config(fair, SyncConfig::default())
    }

    /// Creates a read-write lock with the given fairness policy and tuning.
    #[must_use]
    pub fn with_config(fair: bool, config: SyncConfig) -> Self {
        let hooks = RwSync {
            fair,
            read_holds: ParkingMutex::new(HashMap::new()),
        };
        Self {
            sync: Arc::new(QueuedSynchronizer::with_config(hooks, 0, config)),
        }
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    /// Acquires a read hold, parking while a writer holds or is due the lock.
    ///
    /// # Errors
    ///
    /// [`SyncError::CountOverflow`] if the read count is saturated.
    pub fn lock_read(&self) -> Result<()> {
        self.sync.acquire_shared(1)
    }

    /// Acquires a read hold unless the calling thread is interrupted.
    pub fn lock_read_interruptibly(&self) -> Result<()> {
        self.sync.acquire_shared_interruptibly(1)
    }

    /// Acquires a read hold if no other thread holds the write lock.
    ///
    /// Barges past queued threads even on a fair lock.
    pub fn try_lock_read(&self) -> Result<bool> {
        Ok(self.sync.hooks().acquire_read(&self.sync, false)? >= 0)
    }

    /// Acquires a read hold if one becomes available within `timeout`.
    pub fn try_lock_read_for(&self, timeout: Duration) -> Result<bool> {
        self.sync.try_acquire_shared_for(1, timeout)
    }

    /// Releases one read hold of the calling thread.
    ///
    /// # Errors
    ///
    /// [`SyncError::IllegalMonitorState`] if the caller holds no read hold.
    pub fn unlock_read(&self) -> Result<()> {
        self.sync.release_shared(1).map(drop)
    }

    /// Acquires a read hold and returns a guard that releases it on drop.
    pub fn read(&self) -> Result<ReadGuard<'_>> {
        self.lock_read()?;
        Ok(ReadGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    // ------------------------------------------------------------------
    // Write side
    // ------------------------------------------------------------------

    /// Acquires the write lock, parking until no other thread holds either lock.
    ///
    /// # Errors
    ///
    /// [`SyncError::IllegalMonitorState`] if the caller holds only the read
    /// lock, [`SyncError::CountOverflow`] if the write count is saturated.
    pub fn lock_write(&self) -> Result<()> {
        self.sync.acquire(1)
    }

    /// Acquires the write lock unless the calling thread is interrupted.
    pub fn lock_write_interruptibly(&self) -> Result<()> {
        self.sync.acquire_interruptibly(1)
    }

    /// Acquires the write lock if it is free or already held by the caller.
    ///
    /// Barges even on a fair lock.
    pub fn try_lock_write(&self) -> Result<bool> {
        self.sync.hooks().acquire_write(&self.sync, 1, false)
    }

    /// Acquires the write lock if it becomes available within `timeout`.
    pub fn try_lock_write_for(&self, timeout: Duration) -> Result<bool> {
        self.sync.try_acquire_for(1, timeout)
    }

    /// Releases one write hold.
    ///
    /// # Errors
    ///
    /// [`SyncError::IllegalMonitorState`] if the caller does not hold the
    /// write lock.
    pub fn unlock_write(&self) -> Result<()> {
        self.sync.release(1).map(drop)
    }

    /// Acquires the write lock and returns a guard that releases it on drop.
    pub fn write(&self) -> Result<WriteGuard<'_>> {
        self.lock_write()?;
        Ok(WriteGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Creates a condition bound to the write lock.
    #[must_use]
    pub fn new_condition(&self) -> WriteCondition {
        self.sync.new_condition()
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Returns the number of read holds across all threads.
    #[must_use]
    pub fn read_lock_count(&self) -> u32 {
        u32::try_from(shared_count(self.sync.state())).unwrap_or(0)
    }

    /// Returns the number of read holds of the calling thread.
    #[must_use]
    pub fn read_hold_count(&self) -> u32 {
        self.sync.hooks().held_reads()
    }

    /// Returns true if any thread holds the write lock.
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        exclusive_count(self.sync.state()) != 0
    }

    /// Returns true if the calling thread holds the write lock.
    #[must_use]
    pub fn is_write_locked_by_current_thread(&self) -> bool {
        self.sync.is_owned_by_current()
    }

    /// Returns the number of write holds of the calling thread.
    #[must_use]
    pub fn write_hold_count(&self) -> u32 {
        if self.sync.is_owned_by_current() {
            u32::try_from(exclusive_count(self.sync.state())).unwrap_or(0)
        } else {
            0
        }
    }

    /// Returns true if this lock is fair.
    #[must_use]
    pub fn is_fair(&self) -> bool {
        self.sync.hooks().is_fair()
    }

    /// Returns the thread holding the write lock, if any.
    #[must_use]
    pub fn owner(&self) -> Option<Waiter> {
        if self.is_write_locked() {
            self.sync.exclusive_owner()
        } else {
            None
        }
    }

    /// Returns true if any thread is queued for either lock.
    #[must_use]
    pub fn has_queued_threads(&self) -> bool {
        self.sync.has_queued_threads()
    }

    /// Returns true if `waiter` is queued for either lock.
    #[must_use]
    pub fn has_queued_thread(&self, waiter: &Waiter) -> bool {
        self.sync.is_queued(waiter)
    }

    /// Returns the number of threads queued for either lock.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.sync.queue_length()
    }

    /// Returns the threads queued for the write lock.
    #[must_use]
    pub fn queued_writer_threads(&self) -> Vec<Waiter> {
        self.sync.exclusive_queued_threads()
    }

    /// Returns the threads queued for the read lock.
    #[must_use]
    pub fn queued_reader_threads(&self) -> Vec<Waiter> {
        self.sync.shared_queued_threads()
    }
}

impl Default for ReadWriteLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReadWriteLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.sync.state();
        write!(
            f,
            "ReadWriteLock[Write locks = {}, Read locks = {}]",
            exclusive_count(state),
            shared_count(state)
        )
    }
}

impl fmt::Debug for ReadWriteLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadWriteLock")
            .field("fair", &self.is_fair())
            .field("write_locked", &self.is_write_locked())
            .field("read_lock_count", &self.read_lock_count())
            .field("owner", &self.owner())
            .field("queue_length", &self.queue_length())
            .finish()
    }
}

/// A guard that releases one read hold when dropped.
///
/// Read holds are counted per thread, so the guard cannot leave it:
///
/// ```compile_fail
/// use qsync::sync::ReadWriteLock;
///
/// let lock = ReadWriteLock::new();
/// let guard = lock.read().unwrap();
/// std::thread::scope(|s| {
///     s.spawn(move || drop(guard));
/// });
/// ```
#[must_use = "guard will be immediately released if not held"]
pub struct ReadGuard<'a> {
    lock: &'a ReadWriteLock,
    _not_send: PhantomData<*const ()>,
}

impl fmt::Debug for ReadGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadGuard")
            .field("read_hold_count", &self.lock.read_hold_count())
            .finish()
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.unlock_read() {
            tracing::error!(error = %err, "failed to release read guard");
        }
    }
}

/// A guard that releases one write hold when dropped.
///
/// ```compile_fail
/// use qsync::sync::ReadWriteLock;
///
/// let lock = ReadWriteLock::new();
/// let guard = lock.write().unwrap();
/// std::thread::scope(|s| {
///     s.spawn(move || drop(guard));
/// });
/// ```
#[must_use = "guard will be immediately released if not held"]
pub struct WriteGuard<'a> {
    lock: &'a ReadWriteLock,
    _not_send: PhantomData<*const ()>,
}

impl WriteGuard<'_> {
    /// Returns the lock this guard holds.
    #[must_use]
    pub fn lock(&self) -> &ReadWriteLock {
        self.lock
    }
}

impl fmt::Debug for WriteGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteGuard")
            .field("write_hold_count", &self.lock.write_hold_count())
            .finish()
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.unlock_write() {
            tracing::error!(error = %err, "failed to release write guard");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::{Barrier, mpsc};
    use std::thread;
    use std::time::Instant;

    fn init_test(test_name: &str) {
        init_test_logging();
        crate::test_phase!(test_name);
    }

    fn wait_until_queued(lock: &ReadWriteLock, count: usize) {
        let start = Instant::now();
        while lock.queue_length() < count {
            assert!(
                start.elapsed() < Duration::from_secs(10),
                "timed out waiting for {count} queued threads"
            );
            thread::yield_now();
        }
    }

    #[test]
    fn readers_share_and_exclude_writers() {
        init_test("readers_share_and_exclude_writers");
        let lock = ReadWriteLock::new();
        let _read = lock.read().expect("read");

        let l = lock.clone();
        let (other_read, other_write) = thread::spawn(move || {
            let read = l.try_lock_read().expect("try read");
            let count = l.read_lock_count();
            if read {
                l.unlock_read().expect("unlock read");
            }
            let write = l.try_lock_write().expect("try write");
            (read && count == 2, write)
        })
        .join()
        .expect("join");

        crate::assert_with_log!(other_read, "second reader shares", true, other_read);
        crate::assert_with_log!(!other_write, "writer excluded", false, other_write);
        assert_eq!(lock.read_lock_count(), 1);
        assert_eq!(lock.read_hold_count(), 1);
        crate::test_complete!("readers_share_and_exclude_writers");
    }

    #[test]
    fn write_lock_is_reentrant_and_downgrades() {
        init_test("write_lock_is_reentrant_and_downgrades");
        let lock = ReadWriteLock::new();
        lock.lock_write().expect("write");
        lock.lock_write().expect("rewrite");
        lock.lock_read().expect("read under write");
        assert_eq!(lock.write_hold_count(), 2);
        assert_eq!(lock.read_hold_count(), 1);
        assert_eq!(lock.to_string(), "ReadWriteLock[Write locks = 2, Read locks = 1]");

        lock.unlock_write().expect("unlock");
        lock.unlock_write().expect("unlock");
        assert!(!lock.is_write_locked());
        assert!(lock.owner().is_none());

        let l = lock.clone();
        let (read, write) = thread::spawn(move || {
            let read = l.try_lock_read().expect("try read");
            if read {
                l.unlock_read().expect("unlock read");
            }
            (read, l.try_lock_write().expect("try write"))
        })
        .join()
        .expect("join");
        assert!(read, "downgraded lock admits readers");
        assert!(!write, "downgraded lock still excludes writers");

        lock.unlock_read().expect("unlock read");
        assert_eq!(lock.to_string(), "ReadWriteLock[Write locks = 0, Read locks = 0]");
        crate::test_complete!("write_lock_is_reentrant_and_downgrades");
    }

    #[test]
    fn upgrade_is_rejected() {
        init_test("upgrade_is_rejected");
        let lock = ReadWriteLock::fair();
        lock.lock_read().expect("read");
        let err = lock.lock_write().expect_err("upgrade");
        crate::assert_with_log!(
            err.is_illegal_monitor_state(),
            "upgrade refused",
            "IllegalMonitorState",
            err
        );
        assert!(lock.try_lock_write().is_err());
        assert_eq!(lock.read_hold_count(), 1);
        assert!(!lock.has_queued_threads());
        lock.unlock_read().expect("unlock");
        crate::test_complete!("upgrade_is_rejected");
    }

    #[test]
    fn unlock_without_hold_is_illegal() {
        init_test("unlock_without_hold_is_illegal");
        let lock = ReadWriteLock::new();
        assert!(lock.unlock_read().expect_err("no read").is_illegal_monitor_state());
        assert!(lock.unlock_write().expect_err("no write").is_illegal_monitor_state());

        lock.lock_read().expect("read");
        let l = lock.clone();
        let err = thread::spawn(move || l.unlock_read())
            .join()
            .expect("join")
            .expect_err("read hold belongs to another thread");
        assert!(err.is_illegal_monitor_state());
        assert_eq!(lock.read_lock_count(), 1);
        lock.unlock_read().expect("unlock");
        crate::test_complete!("unlock_without_hold_is_illegal");
    }

    #[test]
    fn released_writer_admits_reader_run_then_next_writer() {
        init_test("released_writer_admits_reader_run_then_next_writer");
        let lock = ReadWriteLock::fair();
        lock.lock_write().expect("write");
        let log = Arc::new(ParkingMutex::new(Vec::new()));
        let together = Arc::new(Barrier::new(2));

        let mut handles = Vec::new();
        for (i, name) in ["r1", "r2", "w1", "r3"].into_iter().enumerate() {
            let (l, log, together) = (lock.clone(), Arc::clone(&log), Arc::clone(&together));
            handles.push(thread::spawn(move || {
                if name.starts_with('w') {
                    let _guard = l.write().expect("write");
                    log.lock().push(name);
                } else {
                    let _guard = l.read().expect("read");
                    log.lock().push(name);
                    if name != "r3" {
                        // Both leading readers must be inside at once.
                        together.wait();
                    }
                }
            }));
            wait_until_queued(&lock, i + 1);
        }
        assert_eq!(lock.queued_writer_threads().len(), 1);
        assert_eq!(lock.queued_reader_threads().len(), 3);

        lock.unlock_write().expect("unlock");
        for handle in handles {
            handle.join().expect("join");
        }
        let log = log.lock().clone();
        let leading: Vec<_> = log[..2].to_vec();
        assert!(leading.contains(&"r1") && leading.contains(&"r2"), "{log:?}");
        assert_eq!(&log[2..], ["w1", "r3"], "writer blocks the trailing reader");
        assert!(!lock.has_queued_threads());
        crate::test_complete!("released_writer_admits_reader_run_then_next_writer");
    }

    #[test]
    fn nonfair_readers_queue_behind_first_writer() {
        init_test("nonfair_readers_queue_behind_first_writer");
        let lock = ReadWriteLock::new();
        lock.lock_read().expect("read");

        let l = lock.clone();
        let writer = thread::spawn(move || {
            l.lock_write().expect("write");
            l.unlock_write().expect("unlock");
        });
        wait_until_queued(&lock, 1);
        assert!(lock.sync.first_queued_is_exclusive());

        let l = lock.clone();
        let (timed, barged) = thread::spawn(move || {
            let timed = l.try_lock_read_for(Duration::from_millis(20)).expect("timed");
            let barged = l.try_lock_read().expect("barge");
            if barged {
                l.unlock_read().expect("unlock");
            }
            (timed, barged)
        })
        .join()
        .expect("join");
        crate::assert_with_log!(!timed, "new reader waits for writer", false, timed);
        crate::assert_with_log!(barged, "try_lock_read barges", true, barged);

        // A thread already holding read holds may re-enter past the writer.
        lock.lock_read().expect("reentrant read");
        assert_eq!(lock.read_hold_count(), 2);
        lock.unlock_read().expect("unlock");
        lock.unlock_read().expect("unlock");
        writer.join().expect("join");
        assert!(!lock.is_write_locked());
        crate::test_complete!("nonfair_readers_queue_behind_first_writer");
    }

    #[test]
    fn interrupted_reader_leaves_queue() {
        init_test("interrupted_reader_leaves_queue");
        let lock = ReadWriteLock::new();
        lock.lock_write().expect("write");
        let (tx, rx) = mpsc::channel();
        let l = lock.clone();
        let handle = thread::spawn(move || {
            tx.send(Waiter::current()).expect("send");
            l.lock_read_interruptibly()
        });
        let waiter = rx.recv().expect("recv");
        wait_until_queued(&lock, 1);
        assert!(lock.has_queued_thread(&waiter));
        waiter.interrupt();
        assert_eq!(handle.join().expect("join"), Err(SyncError::Interrupted));
        assert!(!lock.has_queued_threads());
        assert_eq!(lock.read_lock_count(), 0);
        lock.unlock_write().expect("unlock");
        crate::test_complete!("interrupted_reader_leaves_queue");
    }

    #[test]
    fn write_condition_restores_write_holds() {
        init_test("write_condition_restores_write_holds");
        let lock = ReadWriteLock::new();
        let cond = Arc::new(lock.new_condition());

        lock.lock_read().expect("read");
        assert!(cond.wait().expect_err("read hold only").is_illegal_monitor_state());
        lock.unlock_read().expect("unlock");

        lock.lock_write().expect("write");
        lock.lock_write().expect("rewrite");
        let (l, c) = (lock.clone(), Arc::clone(&cond));
        let signaller = thread::spawn(move || {
            let _guard = l.write().expect("write");
            c.signal().expect("signal");
        });
        cond.wait().expect("wait");
        let holds = lock.write_hold_count();
        crate::assert_with_log!(holds == 2, "write holds restored", 2u32, holds);
        signaller.join().expect("join");
        lock.unlock_write().expect("unlock");
        lock.unlock_write().expect("unlock");
        crate::test_complete!("write_condition_restores_write_holds");
    }
}
