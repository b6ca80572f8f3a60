//! The adjust-heights heap: the worklist used to cascade a height increase
//! to every node downstream of a rebind, so the recompute heap's "lower
//! height always computed first" invariant keeps holding after the graph's
//! shape changes.
//!
//! Unlike the recompute heap this one is singly-linked, `next_in_
//! adjust_heights_heap` only. It's drained strictly in the order nodes are
//! discovered, never removed early, so a `prev` pointer buys nothing.

use std::cell::Cell;

use crate::config;

use super::{Node, NodeRef};

const UNSET: isize = -1;

pub struct AdjustHeightsHeap {
    buckets: Vec<Cell<Option<NodeRef>>>,
    min_height: Cell<usize>,
    /// Upper bound nodes in this heap are allowed to be raised to, set once
    /// per cascade: rebinding a scope created at height `h` caps every
    /// descendant's new height so a runaway cycle can't loop forever
    /// instead of surfacing as a contract violation.
    max_height_allowed: Cell<usize>,
    len: Cell<usize>,
}

impl AdjustHeightsHeap {
    pub fn new() -> Self {
        AdjustHeightsHeap {
            buckets: Vec::new(),
            min_height: Cell::new(usize::MAX),
            max_height_allowed: Cell::new(usize::MAX),
            len: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_max_height_allowed(&self, height: usize) {
        self.max_height_allowed.set(height);
    }

    fn bucket(&mut self, height: usize) -> &Cell<Option<NodeRef>> {
        if height >= self.buckets.len() {
            self.buckets.resize_with(height + 1, || Cell::new(None));
        }
        &self.buckets[height]
    }

    /// Enqueues `node` at its height *before* this cascade started. Returns
    /// an error describing a contract violation if that height already
    /// exceeds `max_height_allowed`: a cycle the out-of-scope `bind`
    /// machinery should have rejected earlier.
    pub fn insert(&mut self, arena: &super::NodeArena, node: NodeRef) -> Result<(), String> {
        let height = arena.get(node).height();
        if height > self.max_height_allowed.get() {
            return Err(format!(
                "cycle detected: node {:?} height {} exceeds max_height_allowed {}",
                arena.get(node).id(),
                height,
                self.max_height_allowed.get()
            ));
        }
        if arena.get(node).height_in_adjust_heights_heap() != UNSET {
            return Ok(());
        }
        config::trace!(
            "adjust-heights heap enqueued node {:?} at pre-adjustment height {}",
            arena.get(node).id(),
            height
        );
        let bucket = self.bucket(height);
        arena.get(node).set_next_in_adjust_heights_heap(bucket.get());
        arena.get(node).set_height_in_adjust_heights_heap(height as isize);
        bucket.set(Some(node));

        if height < self.min_height.get() {
            self.min_height.set(height);
        }
        self.len.set(self.len.get() + 1);
        Ok(())
    }

    /// Pops the lowest-height node, clearing its membership flag. Callers
    /// are expected to raise the node's height and re-enqueue its parents,
    /// which is why popping doesn't also unlink downstream state: there is
    /// none left to unlink once `height_in_adjust_heights_heap` is cleared.
    pub fn remove_min(&mut self, arena: &super::NodeArena) -> Option<NodeRef> {
        if self.is_empty() {
            return None;
        }
        while self.min_height.get() < self.buckets.len() {
            let bucket = &self.buckets[self.min_height.get()];
            if let Some(node) = bucket.get() {
                let next = arena.get(node).next_in_adjust_heights_heap();
                bucket.set(next);
                arena.get(node).set_next_in_adjust_heights_heap(None);
                arena.get(node).set_height_in_adjust_heights_heap(UNSET);
                self.len.set(self.len.get() - 1);
                return Some(node);
            }
            self.min_height.set(self.min_height.get() + 1);
        }
        None
    }

    pub fn is_in_heap(node: &Node) -> bool {
        node.height_in_adjust_heights_heap() != UNSET
    }
}

impl Default for AdjustHeightsHeap {
    fn default() -> Self {
        Self::new()
    }
}
