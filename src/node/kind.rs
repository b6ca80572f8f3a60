//! The tagged variant enumerating every node shape.
//!
//! Kept as a single closed `enum` rather than dispatching through a trait
//! object: the engine interrogates kinds constantly in hot loops
//! (`is_stale`, `should_be_invalidated`, height computation), and the
//! variant set is closed, so a `match` beats a vtable call here every time.
//!
//! Children are referenced through `NodeRef`, the arena pointer also used
//! for parent/observer linkage. See the module-level docs on `super::Node`
//! for why values themselves don't appear here: `Kind` only records graph
//! shape. Computing an output from that shape is the out-of-scope engine's
//! job.

use std::cell::Cell;

use super::NodeRef;

#[derive(Debug)]
pub enum Kind {
    /// Transient placeholder while a `Node` is still under construction.
    /// Any behavioral query on this variant is a contract violation: it
    /// should never be observed by anything but `Node::create` itself,
    /// which immediately overwrites it via `set_kind`.
    Uninitialized,

    /// Absorbing terminal: the node has been structurally invalidated and
    /// will never be revalidated.
    Invalid,

    /// An immutable value, fixed for the node's whole life.
    Const,

    /// A value mutated from outside the recomputation graph. `set_at`
    /// tracks the stabilization number of the last `set`, used by
    /// `is_stale`: a `Var` is stale whenever `set_at > recomputed_at`.
    Var { set_at: Cell<super::StabilizationNum> },

    /// Sampled at a point in (external, Alarm-owned) time.
    At,
    /// Sampled at an Alarm-owned interval.
    AtIntervals,
    /// Captures the value of a child the moment some other signal fires.
    Snapshot,
    /// A value defined piecewise over (external, Alarm-owned) time.
    StepFunction,

    /// `Map`/`Map2`.../`Map9` collapsed into one arity-general variant. A
    /// `Vec`-backed child list satisfies each fixed named arity identically
    /// without nine near-duplicate variants.
    MapN { children: Vec<NodeRef> },

    /// A fold over a fixed array of children, recomputing from the whole
    /// array each time any child changes.
    ArrayFold { children: Vec<NodeRef> },

    /// A fold over a fixed array of children that, unlike `ArrayFold`, is
    /// driven by per-child diffs rather than a full pass.
    UnorderedArrayFold { children: Vec<NodeRef> },

    /// Passes its child through once, then never recomputes again.
    Freeze { child: NodeRef },

    /// `child` is the currently selected branch. `None` only between
    /// construction and the first time the owning `If_test_change` fires.
    IfThenElse {
        test_change: NodeRef,
        branch: Cell<Option<NodeRef>>,
    },

    /// `rhs` is the node currently produced by the bind function; `None`
    /// only before the first time `lhs_change` fires.
    BindMain {
        lhs_change: NodeRef,
        rhs: Cell<Option<NodeRef>>,
    },

    /// As `BindMain`, for `join`.
    JoinMain {
        lhs_change: NodeRef,
        rhs: Cell<Option<NodeRef>>,
    },

    /// Change-sentinel: observes `watched` and triggers `bind` restructuring
    /// when it changes.
    BindLhsChange { watched: NodeRef },
    /// As `BindLhsChange`, for `if_`.
    IfTestChange { watched: NodeRef },
    /// As `BindLhsChange`, for `join`.
    JoinLhsChange { watched: NodeRef },
}

impl Kind {
    /// Constructs a `Var` in one call, since its field isn't visible
    /// outside this module (enum struct-variant fields follow ordinary
    /// module privacy, same as struct fields).
    pub fn var(set_at: super::StabilizationNum) -> Kind {
        Kind::Var { set_at: Cell::new(set_at) }
    }

    pub fn bind_main(lhs_change: NodeRef, rhs: Option<NodeRef>) -> Kind {
        Kind::BindMain { lhs_change, rhs: Cell::new(rhs) }
    }

    pub fn join_main(lhs_change: NodeRef, rhs: Option<NodeRef>) -> Kind {
        Kind::JoinMain { lhs_change, rhs: Cell::new(rhs) }
    }

    pub fn if_then_else(test_change: NodeRef, branch: Option<NodeRef>) -> Kind {
        Kind::IfThenElse { test_change, branch: Cell::new(branch) }
    }

    /// Upper bound on child slots, used to size
    /// `my_index_in_child_at_index`.
    pub fn max_num_children(&self) -> usize {
        match self {
            Kind::Uninitialized
            | Kind::Invalid
            | Kind::Const
            | Kind::Var { .. }
            | Kind::At
            | Kind::AtIntervals
            | Kind::Snapshot
            | Kind::StepFunction => 0,
            Kind::MapN { children } => children.len(),
            Kind::ArrayFold { children } => children.len(),
            Kind::UnorderedArrayFold { children } => children.len(),
            Kind::Freeze { .. } => 1,
            Kind::IfThenElse { .. } => 2,
            Kind::BindMain { .. } => 2,
            Kind::JoinMain { .. } => 2,
            Kind::BindLhsChange { .. } => 1,
            Kind::IfTestChange { .. } => 1,
            Kind::JoinLhsChange { .. } => 1,
        }
    }

    /// Enumerates the node's *current* children in a stable index order.
    /// For `Bind_main`/`If_then_else`/`Join_main`, slot 0 is always the
    /// change-sentinel and slot 1 (if present) is the current rhs/branch,
    /// absent before the sentinel has first fired.
    pub fn iteri_children(&self, mut visit: impl FnMut(usize, NodeRef)) {
        match self {
            Kind::Uninitialized
            | Kind::Invalid
            | Kind::Const
            | Kind::Var { .. }
            | Kind::At
            | Kind::AtIntervals
            | Kind::Snapshot
            | Kind::StepFunction => {}
            Kind::MapN { children }
            | Kind::ArrayFold { children }
            | Kind::UnorderedArrayFold { children } => {
                for (i, child) in children.iter().enumerate() {
                    visit(i, *child);
                }
            }
            Kind::Freeze { child } => visit(0, *child),
            Kind::IfThenElse { test_change, branch }
            | Kind::BindMain {
                lhs_change: test_change,
                rhs: branch,
            }
            | Kind::JoinMain {
                lhs_change: test_change,
                rhs: branch,
            } => {
                visit(0, *test_change);
                if let Some(rhs) = branch.get() {
                    visit(1, rhs);
                }
            }
            Kind::BindLhsChange { watched }
            | Kind::IfTestChange { watched }
            | Kind::JoinLhsChange { watched } => visit(0, *watched),
        }
    }

    /// O(arity) retrieval by index; fails (contract violation) if `index`
    /// is out of range for the node's *current* children.
    pub fn slow_get_child(&self, index: usize) -> NodeRef {
        let mut found = None;
        self.iteri_children(|i, child| {
            if i == index {
                found = Some(child);
            }
        });
        found.unwrap_or_else(|| panic!("child index {index} out of bounds for {}", self.name()))
    }

    /// For diagnostics: DOT export labels and the like.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Uninitialized => "uninitialized",
            Kind::Invalid => "invalid",
            Kind::Const => "const",
            Kind::Var { .. } => "var",
            Kind::At => "at",
            Kind::AtIntervals => "at_intervals",
            Kind::Snapshot => "snapshot",
            Kind::StepFunction => "step_function",
            Kind::MapN { .. } => "map",
            Kind::ArrayFold { .. } => "array_fold",
            Kind::UnorderedArrayFold { .. } => "unordered_array_fold",
            Kind::Freeze { .. } => "freeze",
            Kind::IfThenElse { .. } => "if_then_else",
            Kind::BindMain { .. } => "bind_main",
            Kind::JoinMain { .. } => "join_main",
            Kind::BindLhsChange { .. } => "bind_lhs_change",
            Kind::IfTestChange { .. } => "if_test_change",
            Kind::JoinLhsChange { .. } => "join_lhs_change",
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Kind::Invalid)
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Kind::Const)
    }

    /// The `set_at` cell of a `Var`, if this is one.
    pub(crate) fn var_set_at(&self) -> Option<&Cell<super::StabilizationNum>> {
        match self {
            Kind::Var { set_at } => Some(set_at),
            _ => None,
        }
    }

    /// The shielding change-sentinel child, for kinds whose invalidation is
    /// gated on only that child.
    pub(crate) fn shielding_change_sentinel(&self) -> Option<NodeRef> {
        match self {
            Kind::IfThenElse { test_change, .. } => Some(*test_change),
            Kind::BindMain { lhs_change, .. } => Some(*lhs_change),
            Kind::JoinMain { lhs_change, .. } => Some(*lhs_change),
            _ => None,
        }
    }
}
