//! Error types for queued synchronizers.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Hook failures propagate synchronously to the caller of `acquire`/`release`
//!   after the wait queue has been restored to a consistent shape
//! - Timeouts are ordinary results (`bool` / `Option`), never errors
//!
//! # Error Categories
//!
//! - **Unsupported**: a hook was invoked that the synchronizer does not implement
//! - **Illegal monitor state**: release, wait or signal without the required hold
//! - **Interrupted**: a blocking wait was interrupted
//! - **Count overflow**: a hold count or permit count would leave its word range
//! - **Foreign condition**: a condition was passed to a synchronizer that does not own it

use thiserror::Error;

/// Errors produced by synchronizer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A hook was invoked but the synchronizer does not implement it.
    #[error("operation not supported by this synchronizer: {0}")]
    Unsupported(&'static str),

    /// The caller does not hold the synchronizer in the required mode.
    #[error("illegal monitor state: {0}")]
    IllegalMonitorState(&'static str),

    /// The calling thread was interrupted while waiting.
    #[error("wait interrupted")]
    Interrupted,

    /// A counter stored in the state word would overflow.
    #[error("count overflow: {0}")]
    CountOverflow(&'static str),

    /// The condition is not associated with this synchronizer.
    #[error("condition is not owned by this synchronizer")]
    ForeignCondition,
}

impl SyncError {
    /// Returns true if this error reports an interrupted wait.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Returns true if this error reports a missing hold.
    #[must_use]
    pub const fn is_illegal_monitor_state(&self) -> bool {
        matches!(self, Self::IllegalMonitorState(_))
    }

    /// Returns true if the error is a programming error rather than a runtime condition.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::Unsupported(_) | Self::IllegalMonitorState(_) | Self::ForeignCondition
        )
    }
}

/// Convenience alias for synchronizer results.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
