//! FIFO queued synchronizers for blocking threads.
//!
//! `qsync` provides a reusable core for building locks and related
//! synchronizers: an atomic state word, a FIFO wait queue of parked threads,
//! and a small set of hooks that decide what acquiring and releasing mean.
//!
//! # Layout
//!
//! - [`queue`]: the synchronizer core ([`QueuedSynchronizer`], [`Hooks`]) and
//!   condition queues ([`ConditionObject`])
//! - [`sync`]: ready-made primitives ([`ReentrantMutex`], [`ReadWriteLock`],
//!   [`Semaphore`], [`CountDownLatch`])
//! - [`waiter`]: thread identity, parking handle and interrupt flag
//! - [`park`]: the parking capability and the default OS-thread [`Parker`]
//! - [`config`]: spin and timeout tuning
//! - [`error`]: the [`SyncError`] type
//!
//! # Writing a synchronizer
//!
//! ```
//! use std::sync::atomic::AtomicI32;
//! use qsync::{Hooks, QueuedSynchronizer, Result};
//!
//! /// A binary latch: acquire blocks until someone has signalled once.
//! struct Gate;
//!
//! impl Hooks for Gate {
//!     type Word = AtomicI32;
//!
//!     fn try_acquire_shared(&self, sync: &QueuedSynchronizer<Self>, _arg: i32) -> Result<i32> {
//!         Ok(if sync.state() != 0 { 1 } else { -1 })
//!     }
//!
//!     fn try_release_shared(&self, sync: &QueuedSynchronizer<Self>, _arg: i32) -> Result<bool> {
//!         sync.set_state(1);
//!         Ok(true)
//!     }
//! }
//!
//! let gate = QueuedSynchronizer::new(Gate);
//! gate.release_shared(1)?;
//! gate.acquire_shared(1)?;
//! # Ok::<(), qsync::SyncError>(())
//! ```

pub mod config;
pub mod error;
pub mod park;
pub mod queue;
pub mod sync;
pub mod util;
pub mod waiter;

#[cfg(test)]
pub mod test_utils;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use park::{Park, Parker};
pub use queue::{ConditionObject, Hooks, Mode, QueuedSynchronizer, StateOf, StateWord, WaitStatus};
pub use sync::{CountDownLatch, ReadWriteLock, ReentrantMutex, Semaphore};
pub use waiter::{Waiter, WaiterId, interrupted};
