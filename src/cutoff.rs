//! Cutoff: the equality predicate deciding whether a freshly recomputed
//! value should be treated as unchanged, suppressing propagation to
//! parents. See `Node::get_cutoff`/`set_cutoff`.
//!
//! A node's value is stored type-erased (`Box<dyn Any>`, see `node::value`),
//! so the predicate itself has to take `&dyn Any` and downcast. Callers
//! build one with the typed constructors below; the downcast is infallible
//! as long as it's only ever invoked against the node it was installed on
//! (the node layer upholds that; see `Node::set_cutoff`).

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

type ErasedPredicate = dyn FnMut(&dyn Any, &dyn Any) -> bool;

pub struct Cutoff {
    f: RefCell<Box<ErasedPredicate>>,
    name: &'static str,
}

impl Cutoff {
    /// Build a cutoff from a typed predicate over `A`. Panics (a contract
    /// violation, not a user-facing error) if ever invoked against values
    /// that aren't actually `A`, which can only happen if this `Cutoff` is
    /// installed on the wrong node, a bug in the node layer itself.
    pub fn new<A: 'static>(
        name: &'static str,
        mut f: impl FnMut(&A, &A) -> bool + 'static,
    ) -> Self {
        Cutoff {
            f: RefCell::new(Box::new(move |old: &dyn Any, new: &dyn Any| {
                let old = old
                    .downcast_ref::<A>()
                    .expect("cutoff predicate invoked with mismatched value type");
                let new = new
                    .downcast_ref::<A>()
                    .expect("cutoff predicate invoked with mismatched value type");
                f(old, new)
            })),
            name,
        }
    }

    /// Never suppresses: every recomputation is treated as a change. This is
    /// the node layer's default, since a generic `Box<dyn Any>` can't assume
    /// `PartialEq` (see `Cutoff::equality` for the common opt-in).
    pub fn never() -> Self {
        Cutoff {
            f: RefCell::new(Box::new(|_old: &dyn Any, _new: &dyn Any| false)),
            name: "never",
        }
    }

    /// Structural equality. For plain-old-data `A` (the common case: small
    /// ints, enums, tuples of them) two freshly computed `3_i64`s really are
    /// indistinguishable, physically or structurally.
    pub fn equality<A: 'static + PartialEq>() -> Self {
        Self::new("equality", |old: &A, new: &A| old == new)
    }

    /// Pointer-identity on a reference-counted value. For nodes that store
    /// their output behind `Rc<A>` (as e.g. a `Var`-like leaf would, to make
    /// "did this input even change allocation" cheap to ask) this is the
    /// literal reading of physical-identity equality.
    pub fn ptr_eq<A: 'static>() -> Self {
        Self::new("ptr_eq", |old: &Rc<A>, new: &Rc<A>| Rc::ptr_eq(old, new))
    }

    /// Invoked by the engine after a recompute, with the node's previous and
    /// freshly computed values, to decide whether to advance `changed_at`.
    pub fn should_cutoff(&self, old: &dyn Any, new: &dyn Any) -> bool {
        (self.f.borrow_mut())(old, new)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for Cutoff {
    fn default() -> Self {
        Cutoff::never()
    }
}

impl std::fmt::Debug for Cutoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cutoff").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_cutoff_suppresses_equal_values() {
        let c = Cutoff::equality::<i32>();
        assert!(c.should_cutoff(&1i32, &1i32));
        assert!(!c.should_cutoff(&1i32, &2i32));
    }

    #[test]
    fn never_cutoff_never_suppresses() {
        let c = Cutoff::never();
        assert!(!c.should_cutoff(&1i32, &1i32));
    }

    #[test]
    fn ptr_eq_cutoff_checks_rc_identity() {
        let c = Cutoff::ptr_eq::<i32>();
        let a = Rc::new(1);
        let b = a.clone();
        let d = Rc::new(1);
        assert!(c.should_cutoff(&a, &b));
        assert!(!c.should_cutoff(&a, &d));
    }
}
