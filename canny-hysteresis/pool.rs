//! Arena-backed doubly linked list used as the active list during edge
//! linking.
//!
//! [`NodePool`] owns every node up front; a node is addressed by its
//! [`NodeRef`] index and recycled through a free stack, so pushing and
//! popping never touches the allocator once the pool exists. A
//! [`SparseList`] only stores the head and tail handles and borrows the pool
//! for every operation.

use crate::error::{CannyError, CannyResult};

const NIL: usize = usize::MAX;

/// Handle to a node slot inside a [`NodePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct ListNode {
    value: usize,
    next: usize,
    previous: usize,
}

impl ListNode {
    const EMPTY: ListNode = ListNode {
        value: 0,
        next: NIL,
        previous: NIL,
    };
}

/// Fixed-capacity store of list nodes
#[derive(Debug)]
pub struct NodePool {
    nodes: Vec<ListNode>,
    free: Vec<usize>,
    allocations: usize,
    releases: usize,
    peak: usize,
}

impl NodePool {
    pub fn with_capacity(capacity: usize) -> Self {
        // Reverse order so slots are handed out 0, 1, 2, ...
        let free = (0..capacity).rev().collect();
        Self {
            nodes: vec![ListNode::EMPTY; capacity],
            free,
            allocations: 0,
            releases: 0,
            peak: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Nodes handed out and not yet released
    pub fn outstanding(&self) -> usize {
        self.allocations - self.releases
    }

    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn releases(&self) -> usize {
        self.releases
    }

    /// High-water mark of [`NodePool::outstanding`]
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Takes a free node and stores `value` in it
    pub fn allocate(&mut self, value: usize) -> CannyResult<NodeRef> {
        let slot = self.free.pop().ok_or(CannyError::PoolExhausted {
            capacity: self.capacity(),
        })?;
        self.nodes[slot] = ListNode {
            value,
            next: NIL,
            previous: NIL,
        };
        self.allocations += 1;
        self.peak = self.peak.max(self.outstanding());
        Ok(NodeRef(slot))
    }

    /// Returns a node to the pool. The node must not be linked into a list
    /// and must not already be free.
    pub fn release(&mut self, node: NodeRef) {
        debug_assert!(self.free.len() < self.nodes.len(), "double release");
        self.nodes[node.0] = ListNode::EMPTY;
        self.free.push(node.0);
        self.releases += 1;
    }

    pub fn value(&self, node: NodeRef) -> usize {
        self.nodes[node.0].value
    }
}

/// Doubly linked list whose nodes live in a [`NodePool`]
#[derive(Debug)]
pub struct SparseList {
    head: usize,
    tail: usize,
    len: usize,
}

impl Default for SparseList {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseList {
    pub fn new() -> Self {
        Self {
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn front(&self) -> Option<NodeRef> {
        (self.head != NIL).then_some(NodeRef(self.head))
    }

    pub fn back(&self) -> Option<NodeRef> {
        (self.tail != NIL).then_some(NodeRef(self.tail))
    }

    pub fn push_front(&mut self, pool: &mut NodePool, node: NodeRef) {
        let n = node.0;
        pool.nodes[n].previous = NIL;
        pool.nodes[n].next = self.head;
        if self.head != NIL {
            pool.nodes[self.head].previous = n;
        } else {
            self.tail = n;
        }
        self.head = n;
        self.len += 1;
    }

    /// Unlinks the first node; the caller releases it
    pub fn pop_front(&mut self, pool: &mut NodePool) -> Option<NodeRef> {
        let node = self.front()?;
        self.remove(pool, node);
        Some(node)
    }

    /// Unlinks `node`, which must belong to this list
    pub fn remove(&mut self, pool: &mut NodePool, node: NodeRef) {
        let ListNode { next, previous, .. } = pool.nodes[node.0];
        if previous != NIL {
            pool.nodes[previous].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            pool.nodes[next].previous = previous;
        } else {
            self.tail = previous;
        }
        pool.nodes[node.0].next = NIL;
        pool.nodes[node.0].previous = NIL;
        self.len -= 1;
    }

    /// Unlinks and releases every node
    pub fn clear(&mut self, pool: &mut NodePool) {
        while let Some(node) = self.pop_front(pool) {
            pool.release(node);
        }
    }

    /// Node handles from front to back
    pub fn iter<'a>(&self, pool: &'a NodePool) -> impl Iterator<Item = NodeRef> + 'a {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor == NIL {
                return None;
            }
            let node = NodeRef(cursor);
            cursor = pool.nodes[cursor].next;
            Some(node)
        })
    }
}
