//! The core graph node: the one data structure this crate exists to
//! provide. Everything a node needs to participate in stabilization lives
//! here as plain fields; the recomputation algorithm itself (what actually
//! calls these in what order) belongs to the out-of-scope State/engine.
//!
//! `Node` is intentionally non-generic: its value is type-erased behind
//! `Box<dyn Any>` (see the `value` module), so one arena and one set of
//! intrusive linked lists serve every node in a graph regardless of what
//! each one computes. A phantom-typed, ergonomic combinator surface would
//! sit on top of this; that surface is out of scope here.

mod adjust_heights_heap;
mod diagnostics;
mod handler;
mod id;
mod kind;
mod observer;
mod value;

pub use adjust_heights_heap::AdjustHeightsHeap;
pub use diagnostics::{iter_descendants, to_dot};
pub use handler::{HandlerList, OnUpdateEvent, OnUpdateHandler};
pub use id::NodeId;
pub use kind::Kind;
pub use observer::{ObserverRecord, ObserverState};
pub use recompute_heap::RecomputeHeap;
pub use value::Value;

mod recompute_heap;

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};

use crate::arena::{Graph, NodePtr};
use crate::config;
use crate::cutoff::Cutoff;
use crate::error::{ValueError, ValueErrorReason};
use crate::scope::{ScopeId, ScopeInfo};
use crate::stabilization_num::StabilizationNum;

/// A reference to a node, valid for the lifetime of the arena that created
/// it. Bare pointer, no borrow-checker lifetime attached; see
/// `arena::NodePtr`'s docs for why: nodes reference each other (parents,
/// children, recompute-heap links) inside the same arena, which a
/// lifetime-carrying handle can't express without self-referential structs.
pub type NodeRef = NodePtr<Node>;

/// Identity, not value equality: true iff `a` and `b` name the same arena
/// slot.
pub fn same(a: NodeRef, b: NodeRef) -> bool {
    a == b
}

const HEIGHT_UNSET: isize = -1;
const HEAP_UNSET: isize = -1;
const CHILD_INDEX_UNSET: usize = usize::MAX;

/// The node itself: one slot in the arena, shaped to be reused by
/// `Uninitialized`/`Invalid` recycling rather than ever truly deallocated.
/// `typed_arena` never returns memory to the allocator, so "freeing" a node
/// means resetting it and relinking it into `NodeArena`'s free list for the
/// next `create` to reuse.
pub struct Node {
    id: Cell<NodeId>,
    arena_token: Cell<u32>,

    kind: RefCell<Kind>,
    cutoff: RefCell<Cutoff>,

    value: RefCell<Value>,
    old_value: RefCell<Value>,

    recomputed_at: Cell<StabilizationNum>,
    changed_at: Cell<StabilizationNum>,

    height: Cell<isize>,
    height_in_recompute_heap: Cell<isize>,
    prev_in_recompute_heap: Cell<Option<NodeRef>>,
    next_in_recompute_heap: Cell<Option<NodeRef>>,
    height_in_adjust_heights_heap: Cell<isize>,
    next_in_adjust_heights_heap: Cell<Option<NodeRef>>,

    created_in: Cell<ScopeId>,
    created_in_height: Cell<usize>,
    next_node_in_same_scope: Cell<Option<NodeRef>>,

    parents: RefCell<Vec<NodeRef>>,
    /// `my_index_in_child_at_index[i]` is the index this node occupies in
    /// `child_i`'s `parents` array, where `child_i` is the node's `i`-th
    /// child in `Kind::iteri_children` order. Lets a node remove itself from
    /// a child's parent list with `Vec::swap_remove` instead of a linear
    /// scan.
    my_index_in_child_at_index: RefCell<Vec<usize>>,

    observers: RefCell<Option<ObserverRecord>>,
    num_on_update_handlers: Cell<usize>,
    handlers: HandlerList,

    creation_backtrace: Option<Backtrace>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id.get()
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.borrow().name()
    }

    pub fn with_kind<R>(&self, f: impl FnOnce(&Kind) -> R) -> R {
        f(&self.kind.borrow())
    }

    /// Replaces the node's kind wholesale (used when a `bind`/`if_`/`join`
    /// picks a new rhs, or when a node is invalidated). Resets the back-edge
    /// table to the new kind's arity, since the old one belonged to the old
    /// set of child slots and carries no meaning for the new one.
    pub fn set_kind(&self, kind: Kind) {
        let new_arity = kind.max_num_children();
        *self.my_index_in_child_at_index.borrow_mut() = vec![CHILD_INDEX_UNSET; new_arity];
        *self.kind.borrow_mut() = kind;
    }

    pub fn is_valid(&self) -> bool {
        self.kind.borrow().is_valid()
    }

    pub fn is_const(&self) -> bool {
        self.kind.borrow().is_const()
    }

    pub fn get_cutoff(&self) -> std::cell::Ref<'_, Cutoff> {
        self.cutoff.borrow()
    }

    pub fn set_cutoff(&self, cutoff: Cutoff) {
        *self.cutoff.borrow_mut() = cutoff;
    }

    // -- value -----------------------------------------------------------

    pub fn set_value(&self, value: Box<dyn Any>) {
        let old = self.value.borrow_mut().take();
        if let Some(old) = old {
            *self.old_value.borrow_mut() = Value::Some(old);
        }
        *self.value.borrow_mut() = Value::Some(value);
    }

    pub fn clear_old_value(&self) {
        self.old_value.borrow_mut().take();
    }

    pub fn has_value(&self) -> bool {
        matches!(*self.value.borrow(), Value::Some(_))
    }

    /// The one user-facing failure this layer produces. Everything else
    /// that can go wrong here is a contract violation and panics instead.
    pub fn value_exn(&self) -> Result<std::cell::Ref<'_, dyn Any>, ValueError> {
        if !self.is_valid() {
            return Err(ValueError {
                node_id: self.id(),
                kind_name: self.kind_name(),
                reason: ValueErrorReason::Invalid,
            });
        }
        if !self.has_value() {
            return Err(ValueError {
                node_id: self.id(),
                kind_name: self.kind_name(),
                reason: ValueErrorReason::NeverComputed,
            });
        }
        Ok(std::cell::Ref::map(self.value.borrow(), |v| match v {
            Value::Some(b) => &**b,
            Value::None => unreachable!(),
        }))
    }

    // -- stabilization bookkeeping ----------------------------------------

    pub fn recomputed_at(&self) -> StabilizationNum {
        self.recomputed_at.get()
    }

    pub fn set_recomputed_at(&self, at: StabilizationNum) {
        self.recomputed_at.set(at);
    }

    pub fn changed_at(&self) -> StabilizationNum {
        self.changed_at.get()
    }

    pub fn set_changed_at(&self, at: StabilizationNum) {
        self.changed_at.set(at);
    }

    /// A node is stale if it has never been computed, or if a child (or,
    /// for `Var`, the external setter) changed more recently than this node
    /// was last recomputed.
    pub fn is_stale_with(&self, child_changed_at: impl Fn(NodeRef) -> StabilizationNum) -> bool {
        if !self.is_valid() {
            return false;
        }
        if self.recomputed_at().is_none() {
            return true;
        }
        if let Some(set_at) = self.kind.borrow().var_set_at() {
            return set_at.get() > self.recomputed_at();
        }
        let mut stale = false;
        self.kind.borrow().iteri_children(|_, child| {
            if child_changed_at(child) > self.recomputed_at() {
                stale = true;
            }
        });
        stale
    }

    // -- height -------------------------------------------------------------

    pub fn height(&self) -> usize {
        let h = self.height.get();
        debug_assert!(h >= 0, "height read before being set");
        h as usize
    }

    pub fn height_unset(&self) -> bool {
        self.height.get() == HEIGHT_UNSET
    }

    pub fn set_height(&self, height: usize) {
        self.height.set(height as isize);
    }

    /// Demotes the node back to "unnecessary": removing the last
    /// observer/parent of a subgraph resets its members' heights to unset
    /// rather than leaving a stale height lying around.
    pub fn unset_height(&self) {
        self.height.set(HEIGHT_UNSET);
    }

    pub fn created_in(&self) -> ScopeId {
        self.created_in.get()
    }

    pub fn created_in_height(&self) -> usize {
        self.created_in_height.get()
    }

    pub fn next_node_in_same_scope(&self) -> Option<NodeRef> {
        self.next_node_in_same_scope.get()
    }

    pub fn set_next_node_in_same_scope(&self, next: Option<NodeRef>) {
        self.next_node_in_same_scope.set(next);
    }

    // -- recompute heap linkage -------------------------------------------

    pub fn height_in_recompute_heap(&self) -> isize {
        self.height_in_recompute_heap.get()
    }

    pub fn set_height_in_recompute_heap(&self, h: isize) {
        self.height_in_recompute_heap.set(h);
    }

    pub fn prev_in_recompute_heap(&self) -> Option<NodeRef> {
        self.prev_in_recompute_heap.get()
    }

    pub fn set_prev_in_recompute_heap(&self, prev: Option<NodeRef>) {
        self.prev_in_recompute_heap.set(prev);
    }

    pub fn next_in_recompute_heap(&self) -> Option<NodeRef> {
        self.next_in_recompute_heap.get()
    }

    pub fn set_next_in_recompute_heap(&self, next: Option<NodeRef>) {
        self.next_in_recompute_heap.set(next);
    }

    pub fn height_in_adjust_heights_heap(&self) -> isize {
        self.height_in_adjust_heights_heap.get()
    }

    pub fn set_height_in_adjust_heights_heap(&self, h: isize) {
        self.height_in_adjust_heights_heap.set(h);
    }

    pub fn next_in_adjust_heights_heap(&self) -> Option<NodeRef> {
        self.next_in_adjust_heights_heap.get()
    }

    pub fn set_next_in_adjust_heights_heap(&self, next: Option<NodeRef>) {
        self.next_in_adjust_heights_heap.set(next);
    }

    // -- necessity / observers ---------------------------------------------

    pub fn num_parents(&self) -> usize {
        self.parents.borrow().len()
    }

    /// There's no fixed arity on the parent side the way
    /// `Kind::max_num_children` gives one for children: any number of
    /// parents may reference a node, so this is simply the current parent
    /// count.
    pub fn max_num_parents(&self) -> usize {
        self.num_parents()
    }

    /// Panics if `index` is out of range, the same contract as
    /// `Kind::slow_get_child`.
    pub fn get_parent(&self, index: usize) -> NodeRef {
        self.parents.borrow().get(index).copied().unwrap_or_else(|| {
            panic!("parent index {index} out of bounds for node {:?}", self.id())
        })
    }

    /// Enumerates this node's parents in their current (unobservable, may
    /// reorder across `remove_parent`'s `swap_remove`) array order.
    pub fn iteri_parents(&self, mut visit: impl FnMut(usize, NodeRef)) {
        for (i, parent) in self.parents.borrow().iter().enumerate() {
            visit(i, *parent);
        }
    }

    /// True iff `parent` occurs at least once in this node's parent list
    /// (duplicates from e.g. `map2 n n` still count once each but
    /// `has_parent` only asks "at all").
    pub fn has_parent(&self, parent: NodeRef) -> bool {
        self.parents.borrow().contains(&parent)
    }

    /// True iff `child` appears as one of this node's current children, per
    /// `Kind::iteri_children`.
    pub fn has_child(&self, child: NodeRef) -> bool {
        let mut found = false;
        self.kind.borrow().iteri_children(|_, c| {
            if c == child {
                found = true;
            }
        });
        found
    }

    /// True iff any current child is invalid, shielded or not. Unlike
    /// `should_be_invalidated`, this asks about every child slot.
    pub fn has_invalid_child(&self, arena: &NodeArena) -> bool {
        let mut any_invalid = false;
        self.kind.borrow().iteri_children(|_, child| {
            if !arena.get(child).is_valid() {
                any_invalid = true;
            }
        });
        any_invalid
    }

    /// The raw value slot, with no validity check, unlike `value_exn` which
    /// refuses to hand back a value from an invalid node. Callers must
    /// independently know the value is meaningful.
    pub fn unsafe_value(&self) -> Option<std::cell::Ref<'_, dyn Any>> {
        self.has_value().then(|| {
            std::cell::Ref::map(self.value.borrow(), |v| match v {
                Value::Some(b) => &**b,
                Value::None => unreachable!(),
            })
        })
    }

    pub fn is_in_recompute_heap(&self) -> bool {
        self.height_in_recompute_heap() != HEAP_UNSET
    }

    pub fn is_in_adjust_heights_heap(&self) -> bool {
        self.height_in_adjust_heights_heap() != HEAP_UNSET
    }

    /// Necessary and stale: must coincide exactly with
    /// `is_in_recompute_heap`.
    pub fn needs_to_be_computed(&self, child_changed_at: impl Fn(NodeRef) -> StabilizationNum) -> bool {
        self.is_necessary() && self.is_stale_with(child_changed_at)
    }

    /// Walks every observer currently linked to this node, in list order,
    /// regardless of state (includes a `Disallowed` record still waiting to
    /// be unlinked).
    pub fn iter_observers(&self, mut visit: impl FnMut(&ObserverRecord)) {
        let mut rec = self.observers.borrow().clone();
        while let Some(r) = rec {
            visit(&r);
            rec = r.next_in_observing();
        }
    }

    /// Left fold over the same list `iter_observers` walks.
    pub fn fold_observers<B>(&self, init: B, mut f: impl FnMut(B, &ObserverRecord) -> B) -> B {
        let mut rec = self.observers.borrow().clone();
        let mut acc = init;
        while let Some(r) = rec {
            acc = f(acc, &r);
            rec = r.next_in_observing();
        }
        acc
    }

    pub fn is_observed(&self) -> bool {
        let mut observed = false;
        self.iter_observers(|r| {
            if matches!(r.state(), ObserverState::InUse) {
                observed = true;
            }
        });
        observed
    }

    /// A node is necessary if something downstream needs its value: a
    /// parent, or a live observer.
    pub fn is_necessary(&self) -> bool {
        self.num_parents() > 0 || self.is_observed()
    }

    pub fn num_on_update_handlers(&self) -> usize {
        self.num_on_update_handlers.get()
    }

    pub fn add_on_update_handler(&self, handler: OnUpdateHandler) {
        self.handlers.push(handler);
        self.adjust_num_on_update_handlers(1);
    }

    /// Adds (or, with a negative `delta`, removes) from the cached handler
    /// count. A signed delta instead of separate `inc`/`dec` methods since
    /// both `ObserverRecord` (adding a handler) and
    /// `link_observer`/`unlink_observer` (an observer arriving or leaving
    /// with handlers already on it) need the same bookkeeping.
    pub(crate) fn adjust_num_on_update_handlers(&self, delta: isize) {
        let new = self.num_on_update_handlers.get() as isize + delta;
        debug_assert!(new >= 0, "num_on_update_handlers underflow");
        self.num_on_update_handlers.set(new as usize);
    }

    pub fn run_on_update_handlers(&self, event: OnUpdateEvent<'_>, now: StabilizationNum) {
        config::trace!("running on-update handlers for node {:?} at {}", self.id(), now);
        self.handlers.run(event, now);
        self.iter_observers(|r| r.run_handlers(event, now));
    }

    pub(crate) fn link_observer(&self, new_head: ObserverRecord) {
        if let Some(old_head) = self.observers.borrow().clone() {
            old_head.set_prev_in_observing(Some(new_head.clone()));
            new_head.set_next_in_observing(Some(old_head));
        }
        self.adjust_num_on_update_handlers(new_head.num_on_update_handlers() as isize);
        *self.observers.borrow_mut() = Some(new_head);
    }

    pub(crate) fn unlink_observer(&self, record: &ObserverRecord) {
        let prev = record.prev_in_observing();
        let next = record.next_in_observing();
        match &prev {
            Some(prev) => prev.set_next_in_observing(next.clone()),
            None => *self.observers.borrow_mut() = next.clone(),
        }
        if let Some(next) = &next {
            next.set_prev_in_observing(prev);
        }
        record.set_prev_in_observing(None);
        record.set_next_in_observing(None);
        self.adjust_num_on_update_handlers(-(record.num_on_update_handlers() as isize));
    }

    // -- parent/child linkage ------------------------------------------------

    /// Links `parent` to `child` through `parent`'s `child_slot`-th child
    /// slot (its position in `Kind::iteri_children` order). The back-edge
    /// `parent.my_index_in_child_at_index[child_slot]` records where
    /// `parent` landed in `child.parents`, so `remove_parent` below can
    /// undo this in O(1) rather than scanning `child.parents` for `parent`.
    pub fn add_parent(arena: &NodeArena, child: NodeRef, parent: NodeRef, child_slot: usize) {
        let child_node = arena.get(child);
        let mut parents = child_node.parents.borrow_mut();
        let index_in_parents = parents.len();
        parents.push(parent);

        let parent_node = arena.get(parent);
        let mut indices = parent_node.my_index_in_child_at_index.borrow_mut();
        if child_slot >= indices.len() {
            indices.resize(child_slot + 1, CHILD_INDEX_UNSET);
        }
        indices[child_slot] = index_in_parents;
    }

    /// Removes `parent` from `child`'s parent list in O(1) via
    /// `swap_remove`, using the back-edge recorded on `parent`. `child_slot`
    /// identifies which of `parent`'s children `child` is, since a parent
    /// can reference the same child through more than one slot.
    pub fn remove_parent(arena: &NodeArena, child: NodeRef, parent: NodeRef, child_slot: usize) {
        let parent_node = arena.get(parent);
        let index_in_parents = parent_node.my_index_in_child_at_index.borrow()[child_slot];

        let child_node = arena.get(child);
        let mut parents = child_node.parents.borrow_mut();
        let last_index = parents.len() - 1;
        parents.swap_remove(index_in_parents);

        if index_in_parents != last_index {
            // whichever parent used to be last is now at `index_in_parents`;
            // find that parent's own back-edge (for whichever of its child
            // slots points at `child`) and repoint it.
            let moved_parent = parents[index_in_parents];
            drop(parents);
            let moved_parent_node = arena.get(moved_parent);
            let mut moved_indices = moved_parent_node.my_index_in_child_at_index.borrow_mut();
            moved_parent_node.with_kind(|kind| {
                kind.iteri_children(|slot, c| {
                    if c == child && moved_indices[slot] == last_index {
                        moved_indices[slot] = index_in_parents;
                    }
                });
            });
        }
    }

    // -- invalidation ---------------------------------------------------------

    /// A node must be invalidated once any non-shielded child is invalid,
    /// except that `Bind_main`/`If_then_else`/`Join_main` are shielded by
    /// their own change-sentinel: an invalid rhs/branch alone doesn't
    /// invalidate them until the sentinel itself fires and picks a new one.
    pub fn should_be_invalidated(&self, arena: &NodeArena) -> bool {
        if !self.is_valid() {
            return false;
        }
        let kind = self.kind.borrow();
        if let Some(shielded) = kind.shielding_change_sentinel() {
            return !arena.get(shielded).is_valid();
        }
        let mut any_invalid = false;
        kind.iteri_children(|_, child| {
            if !arena.get(child).is_valid() {
                any_invalid = true;
            }
        });
        any_invalid
    }

    pub fn invalidate(&self) {
        config::trace!("invalidating node {:?} ({})", self.id(), self.kind_name());
        *self.kind.borrow_mut() = Kind::Invalid;
        self.value.borrow_mut().take();
        self.old_value.borrow_mut().take();
    }

    // -- diagnostics ----------------------------------------------------------

    pub fn creation_backtrace(&self) -> Option<&Backtrace> {
        self.creation_backtrace.as_ref()
    }

    /// Structural self-check used by tests. Panics with a description of
    /// whichever invariant fails, rather than returning a `Result`: a
    /// violation here always indicates an engine bug, never bad user input.
    pub fn check_invariant(&self, arena: &NodeArena, me: NodeRef) {
        if !self.is_valid() {
            assert!(!self.has_value(), "invalid node {:?} still holds a value", self.id());
            return;
        }
        self.kind.borrow().iteri_children(|i, child| {
            let child_node = arena.get(child);
            assert!(
                self.height_unset() || child_node.height() < self.height(),
                "node {:?} does not have greater height than child {:?} (slot {})",
                self.id(),
                child_node.id(),
                i
            );
            assert!(
                child_node.parents.borrow().contains(&me),
                "node {:?} is not listed as a parent of its child {:?}",
                self.id(),
                child_node.id()
            );
            // Exact back-edge check: my_index_in_child_at_index[i] must name
            // this node's own slot in the child's parent list, not merely
            // contain it somewhere. Gated on `debug` since it's O(parents)
            // per child rather than the O(1) membership check above.
            if config::debug() {
                let idx = self.my_index_in_child_at_index.borrow()[i];
                assert_eq!(
                    child_node.parents.borrow().get(idx).copied(),
                    Some(me),
                    "node {:?}'s back-edge for child {:?} (slot {}) points at the wrong parent-list index",
                    self.id(),
                    child_node.id(),
                    i
                );
            }
        });
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("kind", &self.kind_name())
            .field("height", &self.height.get())
            .field("recomputed_at", &self.recomputed_at())
            .field("changed_at", &self.changed_at())
            .finish()
    }
}

/// Owns the arena backing every node created through it, plus the free list
/// recycling logical "frees" into reusable slots. A process can have more
/// than one `NodeArena`; `arena_token` stops a `NodeRef` minted by one from
/// being dereferenced through another.
pub struct NodeArena {
    token: u32,
    graph: Graph<Node>,
    free_list: RefCell<Vec<NodeRef>>,
}

thread_local! {
    static NEXT_ARENA_TOKEN: Cell<u32> = const { Cell::new(1) };
}

impl NodeArena {
    pub fn new() -> Self {
        let token = NEXT_ARENA_TOKEN.with(|next| {
            let t = next.get();
            next.set(t + 1);
            t
        });
        NodeArena {
            token,
            graph: Graph::new(),
            free_list: RefCell::new(Vec::new()),
        }
    }

    /// Creates a fresh node in the given scope, or recycles a freed slot if
    /// one is available. `kind` is set immediately; nothing should ever
    /// observe `Kind::Uninitialized`.
    pub fn create(&self, scope: &impl ScopeInfo, kind: Kind) -> NodeRef {
        let initial_indices = vec![CHILD_INDEX_UNSET; kind.max_num_children()];
        let fresh = Node {
            id: Cell::new(NodeId::fresh()),
            arena_token: Cell::new(self.token),
            kind: RefCell::new(kind),
            cutoff: RefCell::new(Cutoff::never()),
            value: RefCell::new(Value::None),
            old_value: RefCell::new(Value::None),
            recomputed_at: Cell::new(StabilizationNum::NONE),
            changed_at: Cell::new(StabilizationNum::NONE),
            height: Cell::new(HEIGHT_UNSET),
            height_in_recompute_heap: Cell::new(HEAP_UNSET),
            prev_in_recompute_heap: Cell::new(None),
            next_in_recompute_heap: Cell::new(None),
            height_in_adjust_heights_heap: Cell::new(HEAP_UNSET),
            next_in_adjust_heights_heap: Cell::new(None),
            created_in: Cell::new(scope.id()),
            created_in_height: Cell::new(scope.height()),
            next_node_in_same_scope: Cell::new(None),
            parents: RefCell::new(Vec::new()),
            my_index_in_child_at_index: RefCell::new(initial_indices),
            observers: RefCell::new(None),
            num_on_update_handlers: Cell::new(0),
            handlers: HandlerList::default(),
            creation_backtrace: if config::keep_node_creation_backtrace() {
                Some(Backtrace::capture())
            } else {
                None
            },
        };

        if let Some(reused) = self.free_list.borrow_mut().pop() {
            // SAFETY: `reused` was handed back through `free`, so nothing
            // else holds a live reference to it; the arena slot is ours to
            // overwrite.
            let new_id = fresh.id.get();
            let slot = unsafe { &mut *(reused.lookup_unchecked::<'_>().node() as *const Node as *mut Node) };
            *slot = fresh;
            config::trace!("recycled node slot for {:?}", new_id);
            return reused;
        }

        self.graph.with(|gg| unsafe { gg.insert(fresh).make_ptr() })
    }

    /// Logically frees `node`: detaches it from every parent/child/observer
    /// list, marks it `Invalid`, and pushes the slot onto the free list for
    /// a later `create` to reuse. The arena itself never shrinks, since
    /// `typed_arena` has no way to give memory back, so this is recycling,
    /// not deallocation.
    pub fn free(&self, node: NodeRef) {
        let n = self.get(node);
        assert!(
            n.num_parents() == 0 && !n.is_observed(),
            "freed node {:?} still has parents or observers",
            n.id()
        );
        n.invalidate();
        n.height.set(HEIGHT_UNSET);
        self.free_list.borrow_mut().push(node);
    }

    /// Creates a fresh `InUse` observer on `node` and links it in. Observer
    /// lifecycle itself (the external disallow/unobserve calls between
    /// stabilizations) belongs to the out-of-scope observer module; this is
    /// the node-side linkage it builds on.
    pub fn observe(&self, node: NodeRef) -> ObserverRecord {
        let record = ObserverRecord::new(node);
        record.set_state(ObserverState::InUse);
        self.get(node).link_observer(record.clone());
        record
    }

    /// Unlinks a previously created observer. The record itself becomes
    /// inert (`Unlinked`); it must never be relinked.
    pub fn unobserve(&self, record: &ObserverRecord) {
        self.get(record.observing()).unlink_observer(record);
        record.set_state(ObserverState::Unlinked);
    }

    /// Dereferences a `NodeRef` minted by this arena. Panics (a contract
    /// violation) if `node` belongs to a different `NodeArena`.
    pub fn get(&self, node: NodeRef) -> &Node {
        let n = unsafe { node.lookup_unchecked::<'_>().node() };
        assert_eq!(
            n.arena_token.get(),
            self.token,
            "node {:?} dereferenced through the wrong arena",
            n.id()
        );
        n
    }

    /// The recursive structural check, run over every node reachable from
    /// `roots` rather than a single node at a time (`Node::check_invariant`'s
    /// job). Built on `diagnostics::iter_descendants` so it walks exactly
    /// the edges the engine would.
    pub fn check_graph_invariant(&self, roots: &[NodeRef]) {
        for node in diagnostics::iter_descendants(self, roots) {
            self.get(node).check_invariant(self, node);
        }
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::StaticScope;

    fn leaf(arena: &NodeArena) -> NodeRef {
        arena.create(&StaticScope::TOP, Kind::Const)
    }

    #[test]
    fn fresh_node_is_uncomputed_and_has_no_value() {
        let arena = NodeArena::new();
        let n = leaf(&arena);
        assert!(arena.get(n).recomputed_at().is_none());
        assert!(!arena.get(n).has_value());
        assert!(arena.get(n).value_exn().is_err());
    }

    #[test]
    fn var_is_stale_when_set_after_last_recompute() {
        let arena = NodeArena::new();
        let var = arena.create(&StaticScope::TOP, Kind::var(StabilizationNum::NONE.next()));
        assert!(arena.get(var).is_stale_with(|_| StabilizationNum::NONE));
        arena.get(var).set_recomputed_at(StabilizationNum::NONE.next());
        assert!(!arena.get(var).is_stale_with(|_| StabilizationNum::NONE));
    }

    #[test]
    fn add_and_remove_parent_is_consistent() {
        let arena = NodeArena::new();
        let child = leaf(&arena);
        let parent = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![child] });
        Node::add_parent(&arena, child, parent, 0);
        assert_eq!(arena.get(child).num_parents(), 1);
        Node::remove_parent(&arena, child, parent, 0);
        assert_eq!(arena.get(child).num_parents(), 0);
    }

    #[test]
    fn invalidating_a_child_marks_a_plain_map_node_for_invalidation() {
        let arena = NodeArena::new();
        let child = leaf(&arena);
        let parent = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![child] });
        assert!(!arena.get(parent).should_be_invalidated(&arena));
        arena.get(child).invalidate();
        assert!(arena.get(parent).should_be_invalidated(&arena));
    }

    #[test]
    fn bind_main_is_shielded_from_a_dangling_rhs() {
        let arena = NodeArena::new();
        let sentinel = leaf(&arena);
        let rhs = leaf(&arena);
        let bind = arena.create(&StaticScope::TOP, Kind::bind_main(sentinel, Some(rhs)));
        arena.get(rhs).invalidate();
        assert!(!arena.get(bind).should_be_invalidated(&arena));
        arena.get(sentinel).invalidate();
        assert!(arena.get(bind).should_be_invalidated(&arena));
    }

    #[test]
    #[should_panic(expected = "wrong arena")]
    fn dereferencing_through_the_wrong_arena_panics() {
        let arena_a = NodeArena::new();
        let arena_b = NodeArena::new();
        let n = leaf(&arena_a);
        arena_b.get(n);
    }
}
