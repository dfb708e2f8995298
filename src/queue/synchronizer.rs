//! The queued synchronizer core.
//!
//! A [`QueuedSynchronizer`] couples an atomic state word with a FIFO queue of
//! parked threads. What "acquired" and "released" mean is decided entirely by
//! the [`Hooks`] a concrete lock supplies; the core only runs the protocol:
//!
//! ```text
//! acquire:
//!     while !try_acquire(arg) {
//!         enqueue the thread if it is not already queued
//!         possibly park
//!     }
//!
//! release:
//!     if try_release(arg) {
//!         unpark the first queued thread
//!     }
//! ```
//!
//! Shared mode is the same except that a successful shared acquire may
//! cascade the wakeup to the next shared waiter.
//!
//! # Queue discipline
//!
//! The queue is a doubly linked list of arena nodes guarded by a short
//! internal lock. The state word is never touched under that lock, and hooks
//! are never invoked while it is held, so hooks may freely call the
//! introspection methods (for example [`has_queued_predecessors`]).
//!
//! The released head of the queue is represented only by its wait status.
//! A queued thread parks only after it has set its predecessor's status (or
//! the head status, when it is first) to [`WaitStatus::Signal`] and retried
//! once; a release unparks the first node only when the head status asks for
//! it. Because both steps meet under the queue lock, a release that races with
//! a thread going to sleep either sees the request or happens before the
//! thread's final retry.
//!
//! # Barging
//!
//! `acquire` calls the hook before touching the queue, so an arriving thread
//! can take the synchronizer ahead of parked ones. FIFO order is enforced
//! only when the hook consults [`has_queued_predecessors`].
//!
//! [`has_queued_predecessors`]: QueuedSynchronizer::has_queued_predecessors

use parking_lot::Mutex as ParkingMutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::queue::condition::ConditionObject;
use crate::queue::node::{Mode, Node, NodeId, NodeList, WaitStatus};
use crate::queue::state::{StateValue, StateWord};
use crate::util::{Arena, ArenaIndex};
use crate::waiter::Waiter;

/// The integer type a synchronizer with hooks `H` stores in its state word.
pub type StateOf<H> = <<H as Hooks>::Word as StateWord>::Value;

/// Acquire/release policy supplied by a concrete synchronizer.
///
/// Every hook defaults to failing with [`SyncError::Unsupported`]; implement
/// the ones your synchronizer needs. Hooks must be thread-safe, short, and
/// must never block. A hook that fails leaves the queue consistent: the
/// calling thread's node (if any) is cancelled before the error propagates.
pub trait Hooks: Send + Sync + Sized {
    /// Width of the state word.
    type Word: StateWord;

    /// Attempts an exclusive acquire. Must have no side effects on failure.
    fn try_acquire(&self, _sync: &QueuedSynchronizer<Self>, _arg: StateOf<Self>) -> Result<bool> {
        Err(SyncError::Unsupported("try_acquire"))
    }

    /// Attempts an exclusive release; returns true once the synchronizer is
    /// fully released and waiters may proceed.
    fn try_release(&self, _sync: &QueuedSynchronizer<Self>, _arg: StateOf<Self>) -> Result<bool> {
        Err(SyncError::Unsupported("try_release"))
    }

    /// Attempts a shared acquire.
    ///
    /// Negative means failure; zero means success with no room for further
    /// shared acquires; positive means later shared acquires may also succeed.
    fn try_acquire_shared(
        &self,
        _sync: &QueuedSynchronizer<Self>,
        _arg: StateOf<Self>,
    ) -> Result<StateOf<Self>> {
        Err(SyncError::Unsupported("try_acquire_shared"))
    }

    /// Attempts a shared release; returns true if a waiting acquire may now succeed.
    fn try_release_shared(
        &self,
        _sync: &QueuedSynchronizer<Self>,
        _arg: StateOf<Self>,
    ) -> Result<bool> {
        Err(SyncError::Unsupported("try_release_shared"))
    }

    /// Returns true if the calling thread holds the synchronizer exclusively.
    ///
    /// Required only by synchronizers that hand out conditions.
    fn is_held_exclusively(&self, _sync: &QueuedSynchronizer<Self>) -> Result<bool> {
        Err(SyncError::Unsupported("is_held_exclusively"))
    }
}

/// How a queued wait may end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WaitPolicy {
    pub(crate) interruptible: bool,
    pub(crate) deadline: Option<Instant>,
}

impl WaitPolicy {
    pub(crate) const UNINTERRUPTIBLE: Self = Self {
        interruptible: false,
        deadline: None,
    };

    pub(crate) const INTERRUPTIBLE: Self = Self {
        interruptible: true,
        deadline: None,
    };

    pub(crate) const fn until(deadline: Instant) -> Self {
        Self {
            interruptible: true,
            deadline: Some(deadline),
        }
    }
}

/// Result of a queued wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquisition {
    /// The synchronizer was acquired; `interrupted` records an interrupt that
    /// arrived during an uninterruptible wait.
    Acquired { interrupted: bool },
    TimedOut,
    Interrupted,
}

/// Queue bookkeeping guarded by the synchronizer's internal lock.
#[derive(Debug)]
pub(crate) struct QueueState {
    pub(crate) nodes: Arena<Node>,
    pub(crate) sync_queue: NodeList,
    /// Wait status of the released head (the node most recently dequeued).
    pub(crate) head_status: WaitStatus,
    pub(crate) conditions: Arena<NodeList>,
    contended: bool,
}

impl QueueState {
    fn new() -> Self {
        Self {
            nodes: Arena::new(),
            sync_queue: NodeList::new(),
            head_status: WaitStatus::Initial,
            conditions: Arena::new(),
            contended: false,
        }
    }

    fn enqueue(&mut self, waiter: Waiter, mode: Mode) -> NodeId {
        let id = self
            .nodes
            .insert(Node::new(waiter, mode, WaitStatus::Initial));
        self.sync_queue.push_back(&mut self.nodes, id);
        self.contended = true;
        id
    }

    pub(crate) fn is_first(&self, id: NodeId) -> bool {
        self.sync_queue.front() == Some(id)
    }

    /// Status slot of the node's predecessor: the previous queued node, or the
    /// released head when `id` is first.
    fn pred_status_mut(&mut self, id: NodeId) -> &mut WaitStatus {
        match self.nodes[id].prev() {
            Some(prev) => &mut self.nodes[prev].status,
            None => &mut self.head_status,
        }
    }

    /// Asks the predecessor to unpark `id`. Returns true if the request was
    /// already in place and the thread may park; false if it was just made,
    /// in which case the caller must retry its acquire once before parking.
    fn signal_predecessor(&mut self, id: NodeId) -> bool {
        let status = self.pred_status_mut(id);
        if *status == WaitStatus::Signal {
            true
        } else {
            *status = WaitStatus::Signal;
            false
        }
    }

    fn front_waiter(&self) -> Option<Waiter> {
        self.sync_queue
            .front()
            .map(|first| self.nodes[first].waiter.clone())
    }

    /// Exclusive release: consume the head's wakeup request, if any.
    fn take_successor(&mut self) -> Option<Waiter> {
        if self.head_status.wants_wakeup() {
            self.head_status = WaitStatus::Initial;
            self.front_waiter()
        } else {
            None
        }
    }

    /// Shared release: wake the first waiter, or record that the release
    /// must propagate to whoever queues next.
    fn release_shared_locked(&mut self) -> Option<Waiter> {
        match self.head_status {
            WaitStatus::Signal => {
                self.head_status = WaitStatus::Initial;
                self.front_waiter()
            }
            WaitStatus::Initial => {
                self.head_status = WaitStatus::Propagate;
                None
            }
            _ => None,
        }
    }

    /// Dequeues the first node after its acquire succeeded, making it the new
    /// released head. Returns a shared waiter to wake when propagating.
    fn set_head<V: StateValue>(&mut self, id: NodeId, propagate: Option<V>) -> Option<Waiter> {
        debug_assert!(self.is_first(id));
        let prior = self.head_status;
        self.sync_queue.unlink(&mut self.nodes, id);
        let node = self.nodes.remove(id)?;
        self.head_status = node.status;

        let propagate = propagate?;
        let next_is_shared = self
            .sync_queue
            .front()
            .is_none_or(|next| self.nodes[next].mode == Mode::Shared);
        let wants = propagate.is_positive()
            || prior.wants_wakeup()
            || self.head_status.wants_wakeup();
        if wants && next_is_shared {
            self.release_shared_locked()
        } else {
            None
        }
    }

    /// Removes an abandoned node from the main queue, handing its wakeup
    /// duties to its neighbours. Returns a waiter that must be unparked.
    fn cancel(&mut self, id: NodeId) -> Option<Waiter> {
        let was_first = self.is_first(id);
        let prev = self.nodes[id].prev();
        let status = self.nodes[id].status;
        self.nodes[id].status = WaitStatus::Cancelled;
        self.sync_queue.unlink(&mut self.nodes, id);
        self.nodes.remove(id);

        if was_first {
            // The cancelled node may have swallowed an unpark meant for the
            // first waiter; the new first waiter re-checks for itself.
            return self.front_waiter();
        }
        if status == WaitStatus::Signal {
            if let Some(prev) = prev {
                self.nodes[prev].status = WaitStatus::Signal;
            }
        }
        None
    }

    pub(crate) fn new_condition(&mut self) -> ArenaIndex {
        self.conditions.insert(NodeList::new())
    }

    pub(crate) fn add_condition_waiter(&mut self, condition: ArenaIndex, waiter: Waiter) -> NodeId {
        let id = self
            .nodes
            .insert(Node::new(waiter, Mode::Exclusive, WaitStatus::Condition));
        self.conditions[condition].push_back(&mut self.nodes, id);
        id
    }

    /// Drops a condition waiter that never got to block.
    pub(crate) fn remove_condition_waiter(&mut self, condition: ArenaIndex, id: NodeId) {
        self.nodes[id].status = WaitStatus::Cancelled;
        self.conditions[condition].unlink(&mut self.nodes, id);
        self.nodes.remove(id);
    }

    pub(crate) fn is_on_sync_queue(&self, id: NodeId) -> bool {
        self.nodes[id].status != WaitStatus::Condition
    }

    fn move_to_sync_queue(&mut self, condition: ArenaIndex, id: NodeId) {
        self.conditions[condition].unlink(&mut self.nodes, id);
        self.nodes[id].status = WaitStatus::Initial;
        self.sync_queue.push_back(&mut self.nodes, id);
        self.contended = true;
    }

    /// Moves the longest-waiting node of `condition` to the main queue.
    /// Returns false if the condition had no waiters.
    pub(crate) fn transfer_for_signal(&mut self, condition: ArenaIndex) -> bool {
        let Some(id) = self.conditions[condition].front() else {
            return false;
        };
        self.move_to_sync_queue(condition, id);
        // The waiter is still parked in its condition loop; make sure the
        // release chain will unpark it once it reaches the front.
        *self.pred_status_mut(id) = WaitStatus::Signal;
        tracing::trace!(node = ?id, "condition waiter transferred by signal");
        true
    }

    /// Transfers a waiter that stopped waiting on its own (timeout or
    /// interrupt). Returns true if the waiter beat any signal to it, false if
    /// a signal had already moved it.
    pub(crate) fn transfer_after_cancelled_wait(&mut self, condition: ArenaIndex, id: NodeId) -> bool {
        if self.nodes[id].status != WaitStatus::Condition {
            return false;
        }
        self.move_to_sync_queue(condition, id);
        tracing::trace!(node = ?id, "condition waiter transferred itself");
        true
    }

    fn waiters_where(&self, mut keep: impl FnMut(&Node) -> bool) -> Vec<Waiter> {
        self.sync_queue
            .iter(&self.nodes)
            .filter(|(_, node)| keep(node))
            .map(|(_, node)| node.waiter.clone())
            .collect()
    }

    pub(crate) fn condition_waiters(&self, condition: ArenaIndex) -> Vec<Waiter> {
        self.conditions[condition]
            .iter(&self.nodes)
            .map(|(_, node)| node.waiter.clone())
            .collect()
    }
}

/// A FIFO-queueing blocking synchronizer around an atomic state word.
pub struct QueuedSynchronizer<H: Hooks> {
    state: H::Word,
    owner: ParkingMutex<Option<Waiter>>,
    owner_id: AtomicU64,
    pub(crate) queue: ParkingMutex<QueueState>,
    config: SyncConfig,
    pub(crate) hooks: H,
}

impl<H: Hooks> QueuedSynchronizer<H> {
    /// Creates a synchronizer with state zero and default configuration.
    #[must_use]
    pub fn new(hooks: H) -> Self {
        Self::with_state(hooks, <StateOf<H> as StateValue>::ZERO)
    }

    /// Creates a synchronizer with the given initial state.
    #[must_use]
    pub fn with_state(hooks: H, initial: StateOf<H>) -> Self {
        Self::with_config(hooks, initial, SyncConfig::default())
    }

    /// Creates a synchronizer with the given initial state and tuning.
    #[must_use]
    pub fn with_config(hooks: H, initial: StateOf<H>, mut config: SyncConfig) -> Self {
        config.normalize();
        Self {
            state: H::Word::new(initial),
            owner: ParkingMutex::new(None),
            owner_id: AtomicU64::new(0),
            queue: ParkingMutex::new(QueueState::new()),
            config,
            hooks,
        }
    }

    /// Returns the hooks.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Returns the tuning configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // State word
    // ------------------------------------------------------------------

    /// Reads the state word (acquire ordering).
    #[inline]
    #[must_use]
    pub fn state(&self) -> StateOf<H> {
        self.state.get()
    }

    /// Writes the state word (release ordering).
    #[inline]
    pub fn set_state(&self, value: StateOf<H>) {
        self.state.set(value);
    }

    /// Atomically sets the state to `update` if it currently equals `expect`.
    #[inline]
    pub fn compare_and_set_state(&self, expect: StateOf<H>, update: StateOf<H>) -> bool {
        self.state.compare_and_set(expect, update)
    }

    // ------------------------------------------------------------------
    // Exclusive owner
    // ------------------------------------------------------------------

    /// Records (or clears) the exclusive holder. Diagnostic only.
    pub fn set_exclusive_owner(&self, owner: Option<&Waiter>) {
        self.owner_id
            .store(owner.map_or(0, |w| w.id().as_u64()), Ordering::Release);
        *self.owner.lock() = owner.cloned();
    }

    /// Returns the recorded exclusive holder.
    #[must_use]
    pub fn exclusive_owner(&self) -> Option<Waiter> {
        self.owner.lock().clone()
    }

    /// Returns true if the calling thread is the recorded exclusive holder.
    #[must_use]
    pub fn is_owned_by_current(&self) -> bool {
        let owner = self.owner_id.load(Ordering::Acquire);
        owner != 0 && owner == Waiter::current().id().as_u64()
    }

    // ------------------------------------------------------------------
    // Exclusive mode
    // ------------------------------------------------------------------

    /// Acquires in exclusive mode, ignoring interrupts.
    ///
    /// An interrupt that arrives while parked is recorded and re-asserted on
    /// the calling thread's [`Waiter`] once the acquire completes.
    pub fn acquire(&self, arg: StateOf<H>) -> Result<()> {
        self.do_acquire(Mode::Exclusive, arg, WaitPolicy::UNINTERRUPTIBLE)
            .map(drop)
    }

    /// Acquires in exclusive mode, aborting with [`SyncError::Interrupted`]
    /// if the calling thread is interrupted.
    pub fn acquire_interruptibly(&self, arg: StateOf<H>) -> Result<()> {
        self.do_acquire(Mode::Exclusive, arg, WaitPolicy::INTERRUPTIBLE)
            .map(drop)
    }

    /// Attempts an exclusive acquire, waiting at most `timeout`.
    ///
    /// Returns `Ok(false)` on timeout; the thread's node is unlinked first.
    pub fn try_acquire_for(&self, arg: StateOf<H>, timeout: Duration) -> Result<bool> {
        self.do_acquire(Mode::Exclusive, arg, policy_for(timeout))
    }

    /// Attempts an exclusive acquire, waiting until `deadline` at the latest.
    pub fn try_acquire_until(&self, arg: StateOf<H>, deadline: Instant) -> Result<bool> {
        self.do_acquire(Mode::Exclusive, arg, WaitPolicy::until(deadline))
    }

    /// Releases in exclusive mode, unparking the first waiter if the hook
    /// reports a full release. Returns the hook's verdict.
    pub fn release(&self, arg: StateOf<H>) -> Result<bool> {
        if self.hooks.try_release(self, arg)? {
            let successor = self.queue.lock().take_successor();
            wake(successor);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ------------------------------------------------------------------
    // Shared mode
    // ------------------------------------------------------------------

    /// Acquires in shared mode, ignoring interrupts.
    pub fn acquire_shared(&self, arg: StateOf<H>) -> Result<()> {
        self.do_acquire(Mode::Shared, arg, WaitPolicy::UNINTERRUPTIBLE)
            .map(drop)
    }

    /// Acquires in shared mode, aborting if interrupted.
    pub fn acquire_shared_interruptibly(&self, arg: StateOf<H>) -> Result<()> {
        self.do_acquire(Mode::Shared, arg, WaitPolicy::INTERRUPTIBLE)
            .map(drop)
    }

    /// Attempts a shared acquire, waiting at most `timeout`.
    pub fn try_acquire_shared_for(&self, arg: StateOf<H>, timeout: Duration) -> Result<bool> {
        self.do_acquire(Mode::Shared, arg, policy_for(timeout))
    }

    /// Attempts a shared acquire, waiting until `deadline` at the latest.
    pub fn try_acquire_shared_until(&self, arg: StateOf<H>, deadline: Instant) -> Result<bool> {
        self.do_acquire(Mode::Shared, arg, WaitPolicy::until(deadline))
    }

    /// Releases in shared mode, propagating wakeups if the hook allows it.
    pub fn release_shared(&self, arg: StateOf<H>) -> Result<bool> {
        if self.hooks.try_release_shared(self, arg)? {
            let successor = self.queue.lock().release_shared_locked();
            wake(successor);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ------------------------------------------------------------------
    // Acquire protocol
    // ------------------------------------------------------------------

    /// One hook attempt. `Some(propagate)` on success.
    fn attempt(&self, mode: Mode, arg: StateOf<H>) -> Result<Option<StateOf<H>>> {
        match mode {
            Mode::Exclusive => Ok(self
                .hooks
                .try_acquire(self, arg)?
                .then_some(<StateOf<H> as StateValue>::ZERO)),
            Mode::Shared => {
                let remaining = self.hooks.try_acquire_shared(self, arg)?;
                Ok((!remaining.is_negative()).then_some(remaining))
            }
        }
    }

    fn do_acquire(&self, mode: Mode, arg: StateOf<H>, policy: WaitPolicy) -> Result<bool> {
        let waiter = Waiter::current();
        if policy.interruptible && waiter.take_interrupt() {
            return Err(SyncError::Interrupted);
        }
        if self.attempt(mode, arg)?.is_some() {
            return Ok(true);
        }
        if policy.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Ok(false);
        }

        let node = self.queue.lock().enqueue(waiter.clone(), mode);
        tracing::trace!(node = ?node, mode = ?mode, waiter = %waiter, "enqueued waiter");
        match self.acquire_queued(node, &waiter, mode, arg, policy)? {
            Acquisition::Acquired { interrupted } => {
                if interrupted {
                    waiter.restore_interrupt();
                }
                Ok(true)
            }
            Acquisition::TimedOut => Ok(false),
            Acquisition::Interrupted => Err(SyncError::Interrupted),
        }
    }

    /// Runs the queued part of an acquire for a node already on the main queue.
    ///
    /// On every exit other than success the node has been unlinked.
    pub(crate) fn acquire_queued(
        &self,
        node: NodeId,
        waiter: &Waiter,
        mode: Mode,
        arg: StateOf<H>,
        policy: WaitPolicy,
    ) -> Result<Acquisition> {
        let mut interrupted = false;
        let mut spins = self.config.spins_before_park;

        loop {
            let first = self.queue.lock().is_first(node);
            if first {
                match self.attempt(mode, arg) {
                    Ok(Some(propagate)) => {
                        let propagate = (mode == Mode::Shared).then_some(propagate);
                        let next = self.queue.lock().set_head(node, propagate);
                        wake(next);
                        return Ok(Acquisition::Acquired { interrupted });
                    }
                    Ok(None) => {}
                    Err(err) => {
                        self.cancel(node, "hook failure");
                        return Err(err);
                    }
                }
                if spins > 0 {
                    spins -= 1;
                    std::hint::spin_loop();
                    continue;
                }
            }

            if !self.queue.lock().signal_predecessor(node) {
                continue;
            }

            match policy.deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.cancel(node, "timeout");
                        return Ok(Acquisition::TimedOut);
                    }
                    if deadline - now > self.config.timeout_spin_threshold {
                        tracing::trace!(node = ?node, "parking with deadline");
                        waiter.park_until(deadline);
                    } else {
                        std::hint::spin_loop();
                    }
                }
                None => {
                    tracing::trace!(node = ?node, "parking");
                    waiter.park();
                }
            }

            if waiter.take_interrupt() {
                if policy.interruptible {
                    self.cancel(node, "interrupt");
                    return Ok(Acquisition::Interrupted);
                }
                interrupted = true;
            }
        }
    }

    fn cancel(&self, node: NodeId, reason: &'static str) {
        let forward = self.queue.lock().cancel(node);
        tracing::debug!(node = ?node, reason, forwarded = forward.is_some(), "cancelled queued acquire");
        wake(forward);
    }

    // ------------------------------------------------------------------
    // Queue inspection
    // ------------------------------------------------------------------

    /// Returns true if any thread is queued. A snapshot; may change at once.
    #[must_use]
    pub fn has_queued_threads(&self) -> bool {
        !self.queue.lock().sync_queue.is_empty()
    }

    /// Returns true if any thread has ever had to queue.
    #[must_use]
    pub fn has_contended(&self) -> bool {
        self.queue.lock().contended
    }

    /// Returns the longest-queued thread, if any.
    #[must_use]
    pub fn first_queued_thread(&self) -> Option<Waiter> {
        self.queue.lock().front_waiter()
    }

    /// Returns true if `waiter` is currently queued.
    #[must_use]
    pub fn is_queued(&self, waiter: &Waiter) -> bool {
        let queue = self.queue.lock();
        queue
            .sync_queue
            .iter(&queue.nodes)
            .any(|(_, node)| node.waiter == *waiter)
    }

    /// Returns true if another thread is queued ahead of the calling thread.
    ///
    /// Fair synchronizers call this from their acquire hooks and refuse to
    /// barge when it returns true.
    #[must_use]
    pub fn has_queued_predecessors(&self) -> bool {
        let me = Waiter::current();
        let queue = self.queue.lock();
        queue
            .sync_queue
            .front()
            .is_some_and(|first| queue.nodes[first].waiter != me)
    }

    /// Returns true if the longest-queued thread waits for an exclusive acquire.
    ///
    /// Non-fair shared hooks consult this so that a stream of shared acquires
    /// cannot starve a queued exclusive one.
    #[must_use]
    pub fn first_queued_is_exclusive(&self) -> bool {
        let queue = self.queue.lock();
        queue
            .sync_queue
            .front()
            .is_some_and(|first| queue.nodes[first].mode == Mode::Exclusive)
    }

    /// Returns the number of queued threads.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.queue.lock().sync_queue.len()
    }

    /// Returns the queued threads in queue order.
    #[must_use]
    pub fn queued_threads(&self) -> Vec<Waiter> {
        self.queue.lock().waiters_where(|_| true)
    }

    /// Returns the threads queued for an exclusive acquire.
    #[must_use]
    pub fn exclusive_queued_threads(&self) -> Vec<Waiter> {
        self.queue
            .lock()
            .waiters_where(|node| node.mode == Mode::Exclusive)
    }

    /// Returns the threads queued for a shared acquire.
    #[must_use]
    pub fn shared_queued_threads(&self) -> Vec<Waiter> {
        self.queue
            .lock()
            .waiters_where(|node| node.mode == Mode::Shared)
    }

    // ------------------------------------------------------------------
    // Conditions
    // ------------------------------------------------------------------

    /// Creates a condition bound to this synchronizer.
    ///
    /// Waiting on it requires [`Hooks::is_held_exclusively`] and a full
    /// release/re-acquire through [`Hooks::try_release`] / [`Hooks::try_acquire`].
    #[must_use]
    pub fn new_condition(self: &Arc<Self>) -> ConditionObject<H> {
        let id = self.queue.lock().new_condition();
        ConditionObject::new(Arc::clone(self), id)
    }

    /// Returns true if `condition` was created by this synchronizer.
    #[must_use]
    pub fn owns(&self, condition: &ConditionObject<H>) -> bool {
        std::ptr::eq(self, Arc::as_ptr(condition.synchronizer()))
    }

    /// Returns true if any thread waits on `condition`.
    pub fn has_waiters(&self, condition: &ConditionObject<H>) -> Result<bool> {
        self.check_condition(condition)?;
        Ok(!self.queue.lock().conditions[condition.id()].is_empty())
    }

    /// Returns the number of threads waiting on `condition`.
    pub fn wait_queue_length(&self, condition: &ConditionObject<H>) -> Result<usize> {
        self.check_condition(condition)?;
        Ok(self.queue.lock().conditions[condition.id()].len())
    }

    /// Returns the threads waiting on `condition`, longest waiter first.
    pub fn waiting_threads(&self, condition: &ConditionObject<H>) -> Result<Vec<Waiter>> {
        self.check_condition(condition)?;
        Ok(self.queue.lock().condition_waiters(condition.id()))
    }

    fn check_condition(&self, condition: &ConditionObject<H>) -> Result<()> {
        if !self.owns(condition) {
            return Err(SyncError::ForeignCondition);
        }
        self.require_exclusive("inspect condition")
    }

    pub(crate) fn require_exclusive(&self, operation: &'static str) -> Result<()> {
        if self.hooks.is_held_exclusively(self)? {
            Ok(())
        } else {
            Err(SyncError::IllegalMonitorState(operation))
        }
    }
}

fn policy_for(timeout: Duration) -> WaitPolicy {
    match Instant::now().checked_add(timeout) {
        Some(deadline) => WaitPolicy::until(deadline),
        None => WaitPolicy::INTERRUPTIBLE,
    }
}

#[inline]
fn wake(waiter: Option<Waiter>) {
    if let Some(waiter) = waiter {
        tracing::trace!(waiter = %waiter, "unparking");
        waiter.unpark();
    }
}

impl<H: Hooks> fmt::Display for QueuedSynchronizer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = if self.has_queued_threads() {
            "nonempty"
        } else {
            "empty"
        };
        write!(
            f,
            "QueuedSynchronizer[State = {}, {queue} queue]",
            self.state()
        )
    }
}

impl<H: Hooks + fmt::Debug> fmt::Debug for QueuedSynchronizer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedSynchronizer")
            .field("state", &self.state())
            .field("owner", &self.exclusive_owner())
            .field("queue_length", &self.queue_length())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
