//! The two error shapes this crate produces.
//!
//! Contract violations (an `Uninitialized` kind observed at runtime, an
//! observer in `Created`/`Unlinked` appearing in a node's observer list,
//! and the like) are bugs in the engine, not things a caller can recover
//! from: they `panic!`.
//!
//! `value_exn` on an invalid node is the one user-facing failure the node
//! layer itself produces; it's represented as a real error type carrying a
//! snapshot of the node so the caller (or whatever converts it into a
//! program-visible failure, out of scope here) has something to report.

use std::fmt;

use crate::node::NodeId;

/// Returned by `Node::value_exn` when the node has no usable value: it is
/// invalid, or it simply hasn't been computed yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueError {
    pub node_id: NodeId,
    pub kind_name: &'static str,
    pub reason: ValueErrorReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueErrorReason {
    Invalid,
    NeverComputed,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ValueErrorReason::Invalid => write!(
                f,
                "node {:?} ({}) has no value: it was invalidated",
                self.node_id, self.kind_name
            ),
            ValueErrorReason::NeverComputed => write!(
                f,
                "node {:?} ({}) has no value: it has not yet been computed",
                self.node_id, self.kind_name
            ),
        }
    }
}

impl std::error::Error for ValueError {}
