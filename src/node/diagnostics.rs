//! Introspection: descendant traversal and Graphviz DOT export.
//!
//! Both walk the graph purely through `Kind::iteri_children`, so they see
//! exactly the edges the recomputation engine would. No separate "debug
//! view" of the graph to keep in sync.

use std::collections::HashSet;

use super::{NodeArena, NodeRef};

/// Depth-first, visited-by-id traversal of every node reachable from
/// `roots`, each visited exactly once regardless of how many paths reach
/// it (a node may be shared by more than one parent).
pub fn iter_descendants(arena: &NodeArena, roots: &[NodeRef]) -> Vec<NodeRef> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut stack: Vec<NodeRef> = roots.to_vec();

    while let Some(node) = stack.pop() {
        let id = arena.get(node).id();
        if !seen.insert(id) {
            continue;
        }
        order.push(node);
        arena.get(node).with_kind(|kind| {
            kind.iteri_children(|_, child| stack.push(child));
        });
    }

    order
}

/// Renders the subgraph reachable from `roots` as Graphviz DOT source.
/// Edges into a `Bind_main`/`If_then_else`/`Join_main`'s currently selected
/// rhs/branch are drawn dashed, to distinguish "structural" dependencies
/// that can be swapped out at runtime from the fixed ones a node is
/// created with.
///
/// This approximates the rhs/branch edge rather than drawing the dashed
/// edge from each `Bind_lhs_change` to every node created on its rhs: doing
/// that exactly needs the bind's own "nodes created on rhs" bookkeeping,
/// which lives outside this node layer.
pub fn to_dot(arena: &NodeArena, roots: &[NodeRef]) -> String {
    let nodes = iter_descendants(arena, roots);
    let mut out = String::from("digraph increcore {\n");

    for node in &nodes {
        let n = arena.get(*node);
        out.push_str(&format!(
            "  \"{}\" [label=\"{} {}\"];\n",
            n.id(),
            n.kind_name(),
            n.id()
        ));
    }

    for node in &nodes {
        let n = arena.get(*node);
        let dashed = n.with_kind(|k| k.shielding_change_sentinel().is_some());
        n.with_kind(|kind| {
            kind.iteri_children(|i, child| {
                let child_n = arena.get(child);
                let is_rhs_slot = dashed && i == 1;
                if is_rhs_slot {
                    out.push_str(&format!(
                        "  \"{}\" -> \"{}\" [style=dashed];\n",
                        child_n.id(),
                        n.id()
                    ));
                } else {
                    out.push_str(&format!("  \"{}\" -> \"{}\";\n", child_n.id(), n.id()));
                }
            });
        });
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Kind;
    use crate::scope::StaticScope;

    #[test]
    fn descendants_are_deduped_when_shared() {
        let arena = NodeArena::new();
        let shared = arena.create(&StaticScope::TOP, Kind::Const);
        let a = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![shared] });
        let b = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![shared] });
        let root = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![a, b] });

        let found = iter_descendants(&arena, &[root]);
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn dot_export_contains_every_node_once() {
        let arena = NodeArena::new();
        let leaf = arena.create(&StaticScope::TOP, Kind::Const);
        let root = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![leaf] });
        let dot = to_dot(&arena, &[root]);
        assert!(dot.starts_with("digraph"));
        assert_eq!(dot.matches("label=").count(), 2);
    }
}
