//! On-update handlers: user callbacks fired whenever a node's value changes,
//! and once more when the node or its owning graph is finalized.
//!
//! Handlers are stored append-only, no removal, in insertion order. A
//! dispatch pass snapshots the list length before it starts and walks
//! `(0..len_at_start).rev()`: LIFO order over exactly the handlers that
//! existed when the pass began, so a handler that appends another handler
//! mid-dispatch never makes that new handler run in the same pass.

use std::cell::RefCell;
use std::rc::Rc;

use crate::stabilization_num::StabilizationNum;

use super::NodeRef;

/// What fired the handler: a real change, or the one-time finalization
/// signal delivered when the node (or the whole graph) is torn down.
#[derive(Clone, Copy, Debug)]
pub enum OnUpdateEvent<'a> {
    Changed { node: NodeRef, at: &'a dyn std::any::Any },
    Invalidated { node: NodeRef },
}

type HandlerFn = dyn FnMut(OnUpdateEvent<'_>, StabilizationNum);

/// A single registered callback. Cloneable handle so the same handler can be
/// referenced from both a node's handler list and whatever external owner
/// registered it, matching `ObserverRecord`'s sharing model.
pub struct OnUpdateHandler {
    f: Option<Box<HandlerFn>>,
}

impl OnUpdateHandler {
    pub fn new(f: impl FnMut(OnUpdateEvent<'_>, StabilizationNum) + 'static) -> Self {
        OnUpdateHandler { f: Some(Box::new(f)) }
    }

    /// Placeholder swapped in while a handler is being called, so a
    /// reentrant registration doesn't see a half-moved `Vec` slot.
    pub(crate) fn noop() -> Self {
        OnUpdateHandler { f: None }
    }

    pub(crate) fn call(&mut self, event: OnUpdateEvent<'_>, now: StabilizationNum) {
        if let Some(f) = &mut self.f {
            f(event, now);
        }
    }
}

impl std::fmt::Debug for OnUpdateHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnUpdateHandler")
            .field("registered", &self.f.is_some())
            .finish()
    }
}

/// Append-only registry of a node's handlers, independent of any particular
/// observer. Registered directly via `Node::add_on_update_handler`, as
/// opposed to the per-observer handlers held in `ObserverRecord`.
#[derive(Default)]
pub struct HandlerList(RefCell<Vec<Rc<RefCell<OnUpdateHandler>>>>);

impl HandlerList {
    pub fn push(&self, handler: OnUpdateHandler) {
        self.0.borrow_mut().push(Rc::new(RefCell::new(handler)));
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every handler present at the start of this call, in reverse
    /// (most-recently-added-first) order, ignoring any handler appended
    /// by a callback invoked during the same pass.
    pub fn run(&self, event: OnUpdateEvent<'_>, now: StabilizationNum) {
        let len_at_start = self.0.borrow().len();
        for i in (0..len_at_start).rev() {
            let handler = self.0.borrow()[i].clone();
            handler.borrow_mut().call(event, now);
        }
    }
}

impl std::fmt::Debug for HandlerList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerList").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Kind, NodeArena};
    use crate::scope::StaticScope;
    use std::cell::Cell;
    use std::rc::Rc;

    fn dummy_node() -> (NodeArena, NodeRef) {
        let arena = NodeArena::new();
        let node = arena.create(&StaticScope::TOP, Kind::Const);
        (arena, node)
    }

    #[test]
    fn runs_in_reverse_insertion_order() {
        let list = HandlerList::default();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            list.push(OnUpdateHandler::new(move |_event, _now| {
                order.borrow_mut().push(i);
            }));
        }

        let (_arena, node) = dummy_node();
        list.run(OnUpdateEvent::Invalidated { node }, StabilizationNum::NONE);
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn handler_appended_mid_dispatch_does_not_run_in_same_pass() {
        let list = Rc::new(HandlerList::default());
        let ran_new_one = Rc::new(Cell::new(false));

        {
            let list = list.clone();
            let ran_new_one = ran_new_one.clone();
            list.push(OnUpdateHandler::new(move |_event, _now| {
                let ran_new_one = ran_new_one.clone();
                list.push(OnUpdateHandler::new(move |_event, _now| {
                    ran_new_one.set(true);
                }));
            }));
        }

        let (_arena, node) = dummy_node();
        list.run(OnUpdateEvent::Invalidated { node }, StabilizationNum::NONE);
        assert!(!ran_new_one.get());
        assert_eq!(list.len(), 2);
    }
}
