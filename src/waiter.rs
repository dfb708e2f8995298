//! Waiting-thread identity, parking and interruption.
//!
//! A [`Waiter`] is the handle a wait-queue node keeps for its thread. It is a
//! back-reference used only to unpark the thread and to report queue
//! membership; synchronization decisions never depend on it beyond identity
//! comparison.
//!
//! Rust threads carry no interrupt status of their own, so the waiter holds
//! one: [`Waiter::interrupt`] sets the flag and unparks the thread, and the
//! interruptible acquire and wait operations observe it.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crate::park::{Park, Parker};

static NEXT_WAITER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<Waiter>> = const { RefCell::new(None) };
}

/// Process-unique identifier of a [`Waiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(u64);

impl WaiterId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WaiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "waiter-{}", self.0)
    }
}

struct WaiterInner {
    id: WaiterId,
    name: Option<String>,
    parker: Arc<dyn Park>,
    interrupted: AtomicBool,
}

/// Cheaply clonable handle to a thread that may block in a synchronizer.
#[derive(Clone)]
pub struct Waiter {
    inner: Arc<WaiterInner>,
}

impl Waiter {
    fn with_parker(name: Option<String>, parker: Arc<dyn Park>) -> Self {
        Self {
            inner: Arc::new(WaiterInner {
                id: WaiterId(NEXT_WAITER_ID.fetch_add(1, Ordering::Relaxed)),
                name,
                parker,
                interrupted: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the waiter for the calling thread, creating it on first use.
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(|| {
                    let name = std::thread::current().name().map(str::to_owned);
                    Self::with_parker(name, Arc::new(Parker::new()))
                })
                .clone()
        })
    }

    /// Replaces the calling thread's waiter with one that parks through `parker`.
    ///
    /// Used by schedulers that multiplex tasks onto threads. Any handle to the
    /// previous waiter stays valid but no longer identifies this thread.
    pub fn register_current(parker: Arc<dyn Park>) -> Self {
        let name = std::thread::current().name().map(str::to_owned);
        let waiter = Self::with_parker(name, parker);
        CURRENT.with(|slot| *slot.borrow_mut() = Some(waiter.clone()));
        waiter
    }

    /// Returns this waiter's identifier.
    #[must_use]
    pub fn id(&self) -> WaiterId {
        self.inner.id
    }

    /// Returns the thread name captured when the waiter was created.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Returns true if this handle identifies the calling thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        CURRENT.with(|slot| {
            slot.borrow()
                .as_ref()
                .is_some_and(|current| current.id() == self.id())
        })
    }

    /// Sets the interrupt flag and wakes the thread if it is parked.
    pub fn interrupt(&self) {
        self.inner.interrupted.store(true, Ordering::Release);
        self.inner.parker.unpark();
    }

    /// Returns the interrupt flag without clearing it.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::Acquire)
    }

    /// Clears the interrupt flag, returning its previous value.
    pub(crate) fn take_interrupt(&self) -> bool {
        self.inner.interrupted.swap(false, Ordering::AcqRel)
    }

    /// Re-asserts an interrupt that was consumed while waiting.
    pub(crate) fn restore_interrupt(&self) {
        self.inner.interrupted.store(true, Ordering::Release);
    }

    pub(crate) fn park(&self) {
        self.inner.parker.park();
    }

    pub(crate) fn park_until(&self, deadline: Instant) {
        self.inner.parker.park_until(deadline);
    }

    pub(crate) fn unpark(&self) {
        self.inner.parker.unpark();
    }
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Waiter {}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("interrupted", &self.is_interrupted())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.id()),
        }
    }
}

/// Tests and clears the calling thread's interrupt flag.
pub fn interrupted() -> bool {
    Waiter::current().take_interrupt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct CountingPark {
        unparks: AtomicUsize,
    }

    impl Park for CountingPark {
        fn park(&self) {}
        fn park_until(&self, _deadline: Instant) {}
        fn unpark(&self) {
            self.unparks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn current_is_stable_per_thread() {
        let a = Waiter::current();
        let b = Waiter::current();
        assert_eq!(a, b);
        assert!(a.is_current());

        let other = thread::spawn(Waiter::current).join().expect("join");
        assert_ne!(a, other);
        assert!(!other.is_current());
    }

    #[test]
    fn captures_thread_name() {
        let waiter = thread::Builder::new()
            .name("named-waiter".into())
            .spawn(Waiter::current)
            .expect("spawn")
            .join()
            .expect("join");
        assert_eq!(waiter.name(), Some("named-waiter"));
        assert_eq!(waiter.to_string(), "named-waiter");
    }

    #[test]
    fn interrupt_flag_is_taken_once() {
        let waiter = Waiter::current();
        waiter.interrupt();
        assert!(waiter.is_interrupted());
        assert!(interrupted());
        assert!(!interrupted());
        // Drain the permit left by interrupt().
        waiter.park_until(Instant::now());
    }

    #[test]
    fn interrupt_wakes_parked_thread() {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = thread::spawn(move || {
            let me = Waiter::current();
            tx.send(me.clone()).expect("send");
            while !me.is_interrupted() {
                me.park();
            }
            me.take_interrupt()
        });
        let waiter = rx.recv().expect("recv");
        thread::sleep(Duration::from_millis(10));
        waiter.interrupt();
        assert!(handle.join().expect("join"));
    }

    #[test]
    fn registered_parker_receives_unparks() {
        thread::spawn(|| {
            let park = Arc::new(CountingPark::default());
            let waiter = Waiter::register_current(park.clone());
            assert_eq!(Waiter::current(), waiter);
            waiter.unpark();
            waiter.interrupt();
            assert_eq!(park.unparks.load(Ordering::SeqCst), 2);
        })
        .join()
        .expect("join");
    }
}
