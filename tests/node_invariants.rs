//! Universal invariants and round-trip/idempotence laws, driven directly
//! against the public `Node`/`NodeArena` surface. No stabilization loop is
//! needed for these: they hold after any single graph-building operation,
//! which is exactly what each test performs.

use increcore::node::{Kind, Node, NodeArena, RecomputeHeap};
use increcore::scope::StaticScope;
use increcore::stabilization_num::StabilizationNum;

fn leaf(arena: &NodeArena) -> increcore::node::NodeRef {
    arena.create(&StaticScope::TOP, Kind::Const)
}

#[test]
fn add_parent_then_remove_parent_restores_num_parents() {
    let arena = NodeArena::new();
    let child = leaf(&arena);
    let parent = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![child] });

    Node::add_parent(&arena, child, parent, 0);
    assert_eq!(arena.get(child).num_parents(), 1);

    Node::remove_parent(&arena, child, parent, 0);
    assert_eq!(arena.get(child).num_parents(), 0);
}

#[test]
fn duplicate_parents_add_two_remove_one_leaves_one() {
    let arena = NodeArena::new();
    let n = arena.create(&StaticScope::TOP, Kind::var(StabilizationNum::NONE));
    // m = Map2(n, n, +): a single parent referencing the same child twice.
    let m = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![n, n] });

    Node::add_parent(&arena, n, m, 0);
    Node::add_parent(&arena, n, m, 1);
    assert_eq!(arena.get(n).num_parents(), 2);

    Node::remove_parent(&arena, n, m, 1);
    assert_eq!(arena.get(n).num_parents(), 1);
}

#[test]
fn set_kind_invalid_is_idempotent_for_validity_and_staleness() {
    let arena = NodeArena::new();
    let node = leaf(&arena);

    node_to_invalid(&arena, node);
    assert!(!arena.get(node).is_valid());
    assert!(!arena.get(node).is_stale_with(|_| StabilizationNum::NONE));

    // Invalidating an already-invalid node changes nothing observable.
    node_to_invalid(&arena, node);
    assert!(!arena.get(node).is_valid());
    assert!(!arena.get(node).is_stale_with(|_| StabilizationNum::NONE));
}

fn node_to_invalid(arena: &NodeArena, node: increcore::node::NodeRef) {
    arena.get(node).set_kind(Kind::Invalid);
}

#[test]
fn never_computed_invalid_node_is_not_stale() {
    // A node invalidated before ever being recomputed must still read
    // `is_stale == false`, not `true` from the "never computed" fallback.
    let arena = NodeArena::new();
    let node = leaf(&arena);
    assert!(arena.get(node).recomputed_at().is_none());
    arena.get(node).set_kind(Kind::Invalid);
    assert!(!arena.get(node).is_stale_with(|_| StabilizationNum::NONE));
}

#[test]
fn changed_at_never_exceeds_recomputed_at() {
    let arena = NodeArena::new();
    let node = arena.create(&StaticScope::TOP, Kind::var(StabilizationNum::NONE));
    let t1 = StabilizationNum::NONE.next();
    arena.get(node).set_recomputed_at(t1);
    arena.get(node).set_changed_at(t1);
    assert!(arena.get(node).changed_at() <= arena.get(node).recomputed_at());
}

#[test]
fn height_in_recompute_heap_is_unset_or_within_height_bound() {
    let arena = NodeArena::new();
    let node = leaf(&arena);
    arena.get(node).set_height(3);
    let mut heap = RecomputeHeap::new();

    assert_eq!(arena.get(node).height_in_recompute_heap(), -1);
    assert!(!RecomputeHeap::is_in_heap(arena.get(node)));

    heap.insert(&arena, node);
    let h = arena.get(node).height_in_recompute_heap();
    assert!(h == -1 || (0..=3).contains(&(h as usize)));
    assert!(RecomputeHeap::is_in_heap(arena.get(node)));

    heap.remove(&arena, node);
    assert_eq!(arena.get(node).height_in_recompute_heap(), -1);
}

#[test]
fn num_on_update_handlers_tracks_every_registration() {
    let arena = NodeArena::new();
    let node = leaf(&arena);
    assert_eq!(arena.get(node).num_on_update_handlers(), 0);

    arena
        .get(node)
        .add_on_update_handler(increcore::node::OnUpdateHandler::new(|_event, _now| {}));
    arena
        .get(node)
        .add_on_update_handler(increcore::node::OnUpdateHandler::new(|_event, _now| {}));
    assert_eq!(arena.get(node).num_on_update_handlers(), 2);
}

#[test]
fn num_on_update_handlers_includes_observer_handlers_and_drops_on_unobserve() {
    // num_on_update_handlers = len(own) + sum over observers of
    // len(observer.on_update_handlers). Both halves must stay in sync as
    // handlers and observers come and go.
    let arena = NodeArena::new();
    let node = leaf(&arena);

    arena
        .get(node)
        .add_on_update_handler(increcore::node::OnUpdateHandler::new(|_event, _now| {}));
    assert_eq!(arena.get(node).num_on_update_handlers(), 1);

    let observer = arena.observe(node);
    observer.add_on_update_handler(&arena, increcore::node::OnUpdateHandler::new(|_event, _now| {}));
    observer.add_on_update_handler(&arena, increcore::node::OnUpdateHandler::new(|_event, _now| {}));
    assert_eq!(arena.get(node).num_on_update_handlers(), 3);

    arena.unobserve(&observer);
    assert_eq!(
        arena.get(node).num_on_update_handlers(),
        1,
        "unobserving must drop the observer's handlers from the node's cached count"
    );
}

#[test]
fn check_invariant_accepts_a_well_formed_parent_child_pair() {
    let arena = NodeArena::new();
    let child = leaf(&arena);
    let parent = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![child] });
    Node::add_parent(&arena, child, parent, 0);

    arena.get(child).set_height(0);
    arena.get(parent).set_height(1);

    arena.get(parent).check_invariant(&arena, parent);
}

#[test]
#[should_panic(expected = "does not have greater height")]
fn check_invariant_rejects_a_parent_not_taller_than_its_child() {
    let arena = NodeArena::new();
    let child = leaf(&arena);
    let parent = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![child] });
    Node::add_parent(&arena, child, parent, 0);

    arena.get(child).set_height(2);
    arena.get(parent).set_height(1);

    arena.get(parent).check_invariant(&arena, parent);
}

#[test]
fn parent_and_child_accessors_agree_with_add_and_remove_parent() {
    let arena = NodeArena::new();
    let child = leaf(&arena);
    let parent = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![child] });

    assert!(!arena.get(child).has_parent(parent));
    assert!(arena.get(parent).has_child(child));
    assert!(!arena.get(parent).has_invalid_child(&arena));

    Node::add_parent(&arena, child, parent, 0);
    assert!(arena.get(child).has_parent(parent));
    assert_eq!(arena.get(child).get_parent(0), parent);
    assert_eq!(arena.get(child).max_num_parents(), 1);

    let mut seen = Vec::new();
    arena.get(child).iteri_parents(|i, p| seen.push((i, p)));
    assert_eq!(seen, vec![(0, parent)]);

    arena.get(child).invalidate();
    assert!(arena.get(parent).has_invalid_child(&arena));

    Node::remove_parent(&arena, child, parent, 0);
    assert!(!arena.get(child).has_parent(parent));
}

#[test]
#[should_panic(expected = "out of bounds")]
fn get_parent_out_of_bounds_panics() {
    let arena = NodeArena::new();
    let node = leaf(&arena);
    arena.get(node).get_parent(0);
}

#[test]
fn unsafe_value_reads_the_raw_slot_without_a_validity_check() {
    let arena = NodeArena::new();
    let node = leaf(&arena);
    assert!(arena.get(node).unsafe_value().is_none());

    arena.get(node).set_value(Box::new(7i64));
    assert_eq!(*arena.get(node).unsafe_value().unwrap().downcast_ref::<i64>().unwrap(), 7);
}

#[test]
fn same_is_identity_not_value_equality() {
    let arena = NodeArena::new();
    let a = leaf(&arena);
    let b = leaf(&arena);
    assert!(increcore::node::same(a, a));
    assert!(!increcore::node::same(a, b));
}

#[test]
fn needs_to_be_computed_matches_is_in_recompute_heap_across_a_stabilization() {
    let arena = NodeArena::new();
    let node = arena.create(&StaticScope::TOP, Kind::var(StabilizationNum::first()));
    let _observer = arena.observe(node);
    arena.get(node).set_height(0);

    let mut heap = RecomputeHeap::new();

    // Freshly created and stale: not yet in the heap until something
    // inserts it, but it does need to be computed.
    assert!(arena.get(node).needs_to_be_computed(|_| StabilizationNum::NONE));
    assert!(!arena.get(node).is_in_recompute_heap());

    heap.insert(&arena, node);
    assert!(arena.get(node).is_in_recompute_heap());

    arena.get(node).set_recomputed_at(StabilizationNum::first());
    heap.remove(&arena, node);
    assert_eq!(
        arena.get(node).needs_to_be_computed(|_| StabilizationNum::NONE),
        arena.get(node).is_in_recompute_heap()
    );
    assert!(!arena.get(node).needs_to_be_computed(|_| StabilizationNum::NONE));
    assert!(!arena.get(node).is_in_recompute_heap());
}

#[test]
fn check_graph_invariant_walks_every_reachable_node() {
    let arena = NodeArena::new();
    let child = leaf(&arena);
    let parent = arena.create(&StaticScope::TOP, Kind::MapN { children: vec![child] });
    Node::add_parent(&arena, child, parent, 0);
    arena.get(child).set_height(0);
    arena.get(parent).set_height(1);

    arena.check_graph_invariant(&[parent]);
}
