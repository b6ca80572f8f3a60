use std::cell::Cell;

thread_local! {
    static NEXT_NODE_ID: Cell<u64> = const { Cell::new(1) };
}

/// Process-unique identifier, monotonically assigned at creation. Usable as
/// a hash key independent of the node's arena address, and stable across
/// `Debug`/DOT output even if the backing arena slot is later recycled for
/// a different logical node.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn fresh() -> NodeId {
        NEXT_NODE_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            NodeId(id)
        })
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
