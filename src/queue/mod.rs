//! Queued synchronizer framework.
//!
//! - [`QueuedSynchronizer`]: state word plus FIFO wait queue, driven by [`Hooks`]
//! - [`ConditionObject`]: condition queues for exclusive synchronizers
//! - [`StateWord`]: 32- and 64-bit atomic state cells

pub mod condition;
pub mod node;
pub mod state;
pub mod synchronizer;

pub use condition::ConditionObject;
pub use node::{Mode, WaitStatus};
pub use state::{StateValue, StateWord};
pub use synchronizer::{Hooks, QueuedSynchronizer, StateOf};
