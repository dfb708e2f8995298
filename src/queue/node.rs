//! Wait-queue nodes and the intrusive lists that hold them.
//!
//! Nodes live in a per-synchronizer [`Arena`] and are linked by
//! [`ArenaIndex`]. A node belongs to at most one list at a time: either the
//! synchronizer's main wait queue or one condition queue. Moving a node from
//! a condition queue to the main queue keeps its index, so the thread that
//! owns the node can keep tracking it across the transfer.

use std::fmt;

use crate::util::{Arena, ArenaIndex};
use crate::waiter::Waiter;

/// Identifier of a queued node.
pub(crate) type NodeId = ArenaIndex;

/// Acquisition mode requested by a queued thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Only one holder at a time.
    Exclusive,
    /// Any number of concurrent holders.
    Shared,
}

/// Per-node wait status.
///
/// `Signal` on a node means its successor must be unparked when the node
/// releases or is cancelled. `Propagate` is only ever set on the released
/// head and records that a shared release must keep waking successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WaitStatus {
    /// Freshly created; nobody is relying on this node for a wakeup.
    #[default]
    Initial,
    /// The wait was abandoned (timeout, interrupt or hook failure).
    Cancelled,
    /// The successor is parked and needs an unpark from this node.
    Signal,
    /// Parked on a condition queue.
    Condition,
    /// A shared release must propagate to further shared waiters.
    Propagate,
}

impl WaitStatus {
    /// Returns true for the statuses that demand a successor wakeup.
    #[must_use]
    pub const fn wants_wakeup(self) -> bool {
        matches!(self, Self::Signal | Self::Propagate)
    }
}

impl fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Cancelled => "cancelled",
            Self::Signal => "signal",
            Self::Condition => "condition",
            Self::Propagate => "propagate",
        };
        f.write_str(name)
    }
}

/// One blocked thread.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) waiter: Waiter,
    pub(crate) mode: Mode,
    pub(crate) status: WaitStatus,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(waiter: Waiter, mode: Mode, status: WaitStatus) -> Self {
        Self {
            waiter,
            mode,
            status,
            prev: None,
            next: None,
        }
    }

    pub(crate) fn prev(&self) -> Option<NodeId> {
        self.prev
    }
}

/// Doubly linked FIFO list of nodes stored in an arena.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NodeList {
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl NodeList {
    pub(crate) const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn front(&self) -> Option<NodeId> {
        self.head
    }

    /// Links `id` at the tail. The node must not be on any list.
    pub(crate) fn push_back(&mut self, nodes: &mut Arena<Node>, id: NodeId) {
        let old_tail = self.tail;
        {
            let node = &mut nodes[id];
            debug_assert!(node.prev.is_none() && node.next.is_none());
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => nodes[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    /// Unlinks `id` in O(1), repairing both neighbours. The node must be on this list.
    pub(crate) fn unlink(&mut self, nodes: &mut Arena<Node>, id: NodeId) {
        let (prev, next) = {
            let node = &mut nodes[id];
            let links = (node.prev, node.next);
            node.prev = None;
            node.next = None;
            links
        };
        match prev {
            Some(prev) => nodes[prev].next = next,
            None => {
                debug_assert_eq!(self.head, Some(id), "unlinking a node from the wrong list");
                self.head = next;
            }
        }
        match next {
            Some(next) => nodes[next].prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
    }

    /// Iterates the list from head to tail.
    pub(crate) fn iter<'a>(&self, nodes: &'a Arena<Node>) -> NodeIter<'a> {
        NodeIter {
            nodes,
            cursor: self.head,
        }
    }
}

/// Forward iterator over a [`NodeList`].
pub(crate) struct NodeIter<'a> {
    nodes: &'a Arena<Node>,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = &self.nodes[id];
        self.cursor = node.next;
        Some((id, node))
    }
}
