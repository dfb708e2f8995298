//! Blocking synchronization primitives built on [`QueuedSynchronizer`].
//!
//! # Primitives
//!
//! - [`ReentrantMutex`]: exclusive, reentrant, optionally fair, with conditions
//! - [`ReadWriteLock`]: reentrant readers-writer lock mixing both modes in one queue
//! - [`Semaphore`]: counting semaphore over shared-mode acquisition
//! - [`CountDownLatch`]: one-shot gate released by counting down to zero
//!
//! Every blocking call has an interruptible and a timed variant; see
//! [`Waiter::interrupt`](crate::Waiter::interrupt).
//!
//! [`QueuedSynchronizer`]: crate::queue::QueuedSynchronizer

mod latch;
mod mutex;
mod rwlock;
mod semaphore;

pub use latch::CountDownLatch;
pub use mutex::{LockSync, MutexCondition, ReentrantMutex, ReentrantMutexGuard};
pub use rwlock::{ReadGuard, ReadWriteLock, RwSync, WriteCondition, WriteGuard};
pub use semaphore::{PermitSync, Semaphore, SemaphorePermit};
