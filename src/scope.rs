//! The seam the node layer consumes from the (out-of-scope) `Scope` module.
//!
//! `Scope` itself, the dynamic context that owns a singly-linked list of
//! the nodes created within it and enforces that a `Bind` rhs's nodes don't
//! outlive the bind, lives outside this crate as an external collaborator.
//! All the node layer needs from it is a height lower bound, whether it's
//! the top scope, and a place to be registered on creation
//! (`next_node_in_same_scope`). That's `ScopeId` and `ScopeInfo` below.

use std::cell::Cell;

/// Opaque handle to a scope, supplied by the (external) `Scope` module.
/// `ScopeId::top()` is the distinguished top-level scope every node created
/// outside of a `bind`/`if_`/`join` lives in.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ScopeId(pub(crate) u64);

impl ScopeId {
    pub const fn top() -> ScopeId {
        ScopeId(0)
    }

    pub fn is_top(self) -> bool {
        self.0 == 0
    }
}

/// What the node layer needs to know about a scope when a node is created
/// in it: its height lower bound (a node's height must exceed
/// `height(created_in)`) and whether it's the top scope. A real `Scope`
/// module would track a lot more (the node list itself, the owning
/// `Bind`); this is only the read side the node layer is allowed to depend
/// on.
pub trait ScopeInfo {
    fn id(&self) -> ScopeId;
    fn height(&self) -> usize;
    fn is_top(&self) -> bool {
        self.id().is_top()
    }
}

/// Minimal concrete `ScopeInfo` good enough for anything that doesn't need
/// the full `Scope` module: the top scope, or a fixed-height scope (as a
/// stand-in for a `bind`/`if_`/`join`'s rhs scope, whose height is always
/// one more than its owning change-sentinel).
#[derive(Copy, Clone, Debug)]
pub struct StaticScope {
    id: ScopeId,
    height: usize,
}

impl StaticScope {
    pub const TOP: StaticScope = StaticScope {
        id: ScopeId::top(),
        height: 0,
    };

    pub fn nested(id: ScopeId, height: usize) -> StaticScope {
        StaticScope { id, height }
    }
}

impl ScopeInfo for StaticScope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn height(&self) -> usize {
        self.height
    }
}

thread_local! {
    static NEXT_SCOPE_ID: Cell<u64> = const { Cell::new(1) };
}

/// Allocates a fresh, process-unique non-top `ScopeId`. The (external)
/// `Scope` module would call this when it opens a new `bind`/`if_`/`join`
/// scope; exposed here only so tests can create distinct scopes without
/// depending on a real `Scope` implementation.
pub fn fresh_scope_id() -> ScopeId {
    NEXT_SCOPE_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        ScopeId(id)
    })
}
