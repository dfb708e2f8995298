//! Internal utilities shared by the queue implementation.

pub mod arena;

pub use arena::{Arena, ArenaIndex};
