//! Observer records and the state machine gating which ones a node's
//! on-update dispatch is allowed to see.
//!
//! Observer *creation and teardown* live with the (external) observer
//! module; what the node layer owns is the doubly-linked list threading
//! observer records together per node, and the invariant that only
//! `In_use`/`Disallowed` observers are ever reachable from a live node.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::handler::OnUpdateHandler;
use super::NodeRef;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ObserverState {
    /// Allocated, not yet linked into its node's observer list.
    Created,
    /// Linked in; eligible to run on-update handlers.
    InUse,
    /// Linked in, but a prior handler in this dispatch disabled it. Skipped
    /// for the remainder of the current dispatch and should be unlinked
    /// before the next one.
    Disallowed,
    /// Unlinked; must never appear in a node's observer list.
    Unlinked,
}

struct ObserverRecordInner {
    observing: NodeRef,
    state: Cell<ObserverState>,
    on_update_handlers: RefCell<Vec<OnUpdateHandler>>,
    prev_in_observing: RefCell<Option<ObserverRecord>>,
    next_in_observing: RefCell<Option<ObserverRecord>>,
}

/// A handle to one observer record. Cheap to clone (it's an `Rc`); the
/// underlying record is shared between the node's observer list and
/// whatever external observer-lifecycle type owns it.
#[derive(Clone)]
pub struct ObserverRecord(Rc<ObserverRecordInner>);

impl ObserverRecord {
    pub fn new(observing: NodeRef) -> ObserverRecord {
        ObserverRecord(Rc::new(ObserverRecordInner {
            observing,
            state: Cell::new(ObserverState::Created),
            on_update_handlers: RefCell::new(Vec::new()),
            prev_in_observing: RefCell::new(None),
            next_in_observing: RefCell::new(None),
        }))
    }

    pub fn observing(&self) -> NodeRef {
        self.0.observing
    }

    pub fn state(&self) -> ObserverState {
        self.0.state.get()
    }

    pub fn set_state(&self, state: ObserverState) {
        self.0.state.set(state);
    }

    pub fn disallow(&self) {
        self.set_state(ObserverState::Disallowed);
    }

    /// Number of handlers attached to this observer, for the node's
    /// `num_on_update_handlers` accounting.
    pub fn num_on_update_handlers(&self) -> usize {
        self.0.on_update_handlers.borrow().len()
    }

    /// Registers `handler` on this observer and keeps the owning node's
    /// cached `num_on_update_handlers` in sync.
    pub fn add_on_update_handler(&self, arena: &super::NodeArena, handler: OnUpdateHandler) {
        self.0.on_update_handlers.borrow_mut().push(handler);
        arena.get(self.observing()).adjust_num_on_update_handlers(1);
    }

    pub(crate) fn next_in_observing(&self) -> Option<ObserverRecord> {
        self.0.next_in_observing.borrow().clone()
    }

    pub(crate) fn set_next_in_observing(&self, next: Option<ObserverRecord>) {
        *self.0.next_in_observing.borrow_mut() = next;
    }

    pub(crate) fn prev_in_observing(&self) -> Option<ObserverRecord> {
        self.0.prev_in_observing.borrow().clone()
    }

    pub(crate) fn set_prev_in_observing(&self, prev: Option<ObserverRecord>) {
        *self.0.prev_in_observing.borrow_mut() = prev;
    }

    /// Runs every handler currently attached to this observer, re-reading
    /// `state` before each invocation: a handler that disallows its own
    /// observer must stop the rest of that observer's handlers from running
    /// in the same dispatch.
    pub(crate) fn run_handlers(&self, event: super::handler::OnUpdateEvent<'_>, now: crate::stabilization_num::StabilizationNum) {
        let len_at_start = self.0.on_update_handlers.borrow().len();
        for i in (0..len_at_start).rev() {
            match self.state() {
                ObserverState::InUse => {}
                ObserverState::Disallowed => continue,
                ObserverState::Created | ObserverState::Unlinked => {
                    panic!("contract violation: observer in {:?} state reachable from a node's observer list", self.state());
                }
            }
            let mut handlers = self.0.on_update_handlers.borrow_mut();
            let handler = &mut handlers[i];
            // Reborrow dance: the handler itself may want to add more
            // observers/handlers, which would re-enter `on_update_handlers`.
            // Drop the borrow before calling out.
            let mut handler_taken = std::mem::replace(handler, OnUpdateHandler::noop());
            drop(handlers);
            handler_taken.call(event.clone(), now);
            let mut handlers = self.0.on_update_handlers.borrow_mut();
            handlers[i] = handler_taken;
        }
    }

    pub fn ptr_eq(&self, other: &ObserverRecord) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for ObserverRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRecord")
            .field("state", &self.state())
            .field("num_on_update_handlers", &self.num_on_update_handlers())
            .finish()
    }
}
