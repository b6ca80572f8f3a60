//! The recompute heap: every stale-and-necessary node, bucketed by height,
//! waiting for the out-of-scope engine to stabilize it.
//!
//! A node's own `height_in_recompute_heap`/`prev_in_recompute_heap`/
//! `next_in_recompute_heap` fields only make sense against a concrete
//! bucket structure, so this type is included even though the engine that
//! drives it (`stabilize`) is out of scope: it's what those fields are for,
//! and what exercises them in tests.
//!
//! Buckets are intrusive doubly-linked lists threaded through the node's own
//! `prev_in_recompute_heap`/`next_in_recompute_heap` cells. No separate
//! allocation per entry.

use std::cell::Cell;

use crate::config;

use super::{Node, NodeRef};

const UNSET: isize = -1;

pub struct RecomputeHeap {
    /// `buckets[h]` is the head of the height-`h` bucket, or `None`.
    buckets: Vec<Cell<Option<NodeRef>>>,
    min_height: Cell<usize>,
    len: Cell<usize>,
}

impl RecomputeHeap {
    pub fn new() -> Self {
        RecomputeHeap {
            buckets: Vec::new(),
            min_height: Cell::new(usize::MAX),
            len: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket(&mut self, height: usize) -> &Cell<Option<NodeRef>> {
        if height >= self.buckets.len() {
            self.buckets.resize_with(height + 1, || Cell::new(None));
        }
        &self.buckets[height]
    }

    /// Links `node` into the bucket for its current height. The node must
    /// not already be in the heap: it's in the recompute heap at most once.
    pub fn insert(&mut self, arena: &super::NodeArena, node: NodeRef) {
        let height = arena.get(node).height();
        debug_assert!(
            arena.get(node).height_in_recompute_heap() == UNSET,
            "node already in recompute heap"
        );
        let bucket = self.bucket(height);
        let old_head = bucket.get();
        if let Some(old_head) = old_head {
            arena.get(old_head).set_prev_in_recompute_heap(Some(node));
        }
        arena.get(node).set_next_in_recompute_heap(old_head);
        arena.get(node).set_prev_in_recompute_heap(None);
        arena.get(node).set_height_in_recompute_heap(height as isize);
        bucket.set(Some(node));

        if height < self.min_height.get() {
            self.min_height.set(height);
        }
        self.len.set(self.len.get() + 1);
    }

    /// Unlinks `node` from whichever bucket it's currently in. No-op if the
    /// node isn't in the heap.
    pub fn remove(&mut self, arena: &super::NodeArena, node: NodeRef) {
        let height_in_heap = arena.get(node).height_in_recompute_heap();
        if height_in_heap == UNSET {
            return;
        }
        let prev = arena.get(node).prev_in_recompute_heap();
        let next = arena.get(node).next_in_recompute_heap();

        match prev {
            Some(prev) => arena.get(prev).set_next_in_recompute_heap(next),
            None => self.buckets[height_in_heap as usize].set(next),
        }
        if let Some(next) = next {
            arena.get(next).set_prev_in_recompute_heap(prev);
        }

        arena.get(node).set_prev_in_recompute_heap(None);
        arena.get(node).set_next_in_recompute_heap(None);
        arena.get(node).set_height_in_recompute_heap(UNSET);
        self.len.set(self.len.get() - 1);
    }

    /// Pops and returns one node from the lowest non-empty bucket, or `None`
    /// if the heap is empty. Height order is what makes single-pass
    /// stabilization correct: a node is only popped once every child at a
    /// lower height has already been recomputed this stabilization.
    pub fn remove_min(&mut self, arena: &super::NodeArena) -> Option<NodeRef> {
        if self.is_empty() {
            return None;
        }
        while self.min_height.get() < self.buckets.len() {
            if let Some(node) = self.buckets[self.min_height.get()].get() {
                self.remove(arena, node);
                config::trace!(
                    "recompute heap popped node {:?} at height {}",
                    arena.get(node).id(),
                    self.min_height.get()
                );
                return Some(node);
            }
            self.min_height.set(self.min_height.get() + 1);
        }
        None
    }

    pub fn is_in_heap(node: &Node) -> bool {
        node.height_in_recompute_heap() != UNSET
    }
}

impl Default for RecomputeHeap {
    fn default() -> Self {
        Self::new()
    }
}
