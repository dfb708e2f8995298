//! The synchronization state word.
//!
//! The meaning of the word belongs entirely to the synchronizer's hooks
//! (0 = unlocked, N = hold count, N = permits, ...). The core only reads it,
//! writes it and compare-and-swaps it, always with acquire/release ordering so
//! a successful release is visible to the thread that next observes a
//! successful acquire.
//!
//! Two widths are provided: [`AtomicI32`] for the classic 32-bit state and
//! [`AtomicI64`] for synchronizers that need to count past `i32::MAX`.

use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

/// Integer type stored in a [`StateWord`].
pub trait StateValue:
    Copy + Eq + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The zero value.
    const ZERO: Self;
    /// The one value.
    const ONE: Self;

    /// Adds, returning `None` on overflow.
    fn checked_add(self, rhs: Self) -> Option<Self>;

    /// Subtracts, returning `None` on overflow.
    fn checked_sub(self, rhs: Self) -> Option<Self>;

    /// Returns true if the value is strictly negative.
    #[inline]
    fn is_negative(self) -> bool {
        self < Self::ZERO
    }

    /// Returns true if the value is strictly positive.
    #[inline]
    fn is_positive(self) -> bool {
        self > Self::ZERO
    }
}

/// Atomic cell holding the synchronization state.
pub trait StateWord: Send + Sync + fmt::Debug {
    /// The integer held by this word.
    type Value: StateValue;

    /// Creates a word holding `value`.
    fn new(value: Self::Value) -> Self;

    /// Reads the word with acquire ordering.
    fn get(&self) -> Self::Value;

    /// Writes the word with release ordering.
    fn set(&self, value: Self::Value);

    /// Atomically replaces `expect` with `update`; returns true on success.
    fn compare_and_set(&self, expect: Self::Value, update: Self::Value) -> bool;
}

macro_rules! state_word {
    ($atomic:ty, $int:ty) => {
        impl StateValue for $int {
            const ZERO: Self = 0;
            const ONE: Self = 1;

            #[inline]
            fn checked_add(self, rhs: Self) -> Option<Self> {
                <$int>::checked_add(self, rhs)
            }

            #[inline]
            fn checked_sub(self, rhs: Self) -> Option<Self> {
                <$int>::checked_sub(self, rhs)
            }
        }

        impl StateWord for $atomic {
            type Value = $int;

            #[inline]
            fn new(value: $int) -> Self {
                <$atomic>::new(value)
            }

            #[inline]
            fn get(&self) -> $int {
                self.load(Ordering::Acquire)
            }

            #[inline]
            fn set(&self, value: $int) {
                self.store(value, Ordering::Release);
            }

            #[inline]
            fn compare_and_set(&self, expect: $int, update: $int) -> bool {
                self.compare_exchange(expect, update, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            }
        }
    };
}

state_word!(AtomicI32, i32);
state_word!(AtomicI64, i64);
