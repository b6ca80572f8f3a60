//! Core graph data structure for an incremental computation engine.
//!
//! This crate provides the node: the arena-backed, doubly-linked graph
//! vertex that a push-based incremental engine recomputes in height order,
//! observes, and tears down through. It does not provide the engine itself
//! (`stabilize`, the public `bind`/`map`/`fold` combinator surface, or the
//! `Scope`/`Alarm` machinery that drives those); see each module's docs for
//! the exact seam.

mod arena;
pub mod config;
pub mod cutoff;
pub mod error;
pub mod node;
pub mod scope;
pub mod stabilization_num;

/// The crate's prelude.
pub mod prelude {
    pub use crate::cutoff::Cutoff;
    pub use crate::error::{ValueError, ValueErrorReason};
    pub use crate::node::{Kind, Node, NodeArena, NodeId, NodeRef, ObserverRecord};
    pub use crate::scope::{ScopeId, ScopeInfo, StaticScope};
    pub use crate::stabilization_num::StabilizationNum;
}
