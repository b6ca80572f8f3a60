use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use increcore::node::{Kind, NodeArena, NodeRef};
use increcore::scope::StaticScope;
use increcore::stabilization_num::StabilizationNum;

/// Builds a `node_count`-deep chain of `MapN` nodes over a single `Var`
/// root. Parent/child back-edges and heights are engine-internal
/// (`pub(crate)`) bookkeeping a driving engine would set up on top of
/// `create`, so this measures `create`'s own allocation/recycling cost.
fn build_chain(arena: &NodeArena, node_count: usize) -> Vec<NodeRef> {
    let mut chain = vec![arena.create(&StaticScope::TOP, Kind::var(StabilizationNum::NONE))];
    for _ in 0..node_count {
        let prev = *chain.last().unwrap();
        chain.push(arena.create(&StaticScope::TOP, Kind::MapN { children: vec![prev] }));
    }
    chain
}

fn linear_chain_creation(c: &mut Criterion) {
    for node_count in &[10usize, 100, 1000] {
        c.bench_with_input(
            BenchmarkId::new("linear_chain_creation", node_count),
            node_count,
            |b, &node_count| {
                b.iter(|| {
                    let arena = NodeArena::new();
                    let chain = build_chain(&arena, node_count);
                    black_box(chain.len())
                });
            },
        );
    }
}

/// `free` pushes a slot onto the arena's free list; the next `create`
/// recycles it instead of growing the backing `typed_arena::Arena`. This
/// measures how much that recycling path saves over fresh allocation.
fn create_free_recreate(c: &mut Criterion) {
    for batch_size in &[10usize, 100, 1000] {
        c.bench_with_input(
            BenchmarkId::new("create_free_recreate", batch_size),
            batch_size,
            |b, &batch_size| {
                let arena = NodeArena::new();
                let nodes: Vec<NodeRef> = (0..batch_size)
                    .map(|_| arena.create(&StaticScope::TOP, Kind::Const))
                    .collect();
                for &node in &nodes {
                    arena.free(node);
                }
                b.iter(|| {
                    for _ in 0..batch_size {
                        let node = arena.create(&StaticScope::TOP, Kind::Const);
                        arena.free(node);
                    }
                });
            },
        );
    }
}

/// Churns observers on a single node: every benchmark iteration attaches
/// `observer_count` observers and tears them all down again, exercising
/// the doubly-linked `observers` list's link/unlink path.
fn observer_churn(c: &mut Criterion) {
    for observer_count in &[1usize, 10, 100] {
        c.bench_with_input(
            BenchmarkId::new("observer_churn", observer_count),
            observer_count,
            |b, &observer_count| {
                let arena = NodeArena::new();
                let node = arena.create(&StaticScope::TOP, Kind::Const);
                b.iter(|| {
                    let records: Vec<_> = (0..observer_count).map(|_| arena.observe(node)).collect();
                    for record in &records {
                        arena.unobserve(record);
                    }
                    black_box(records.len())
                });
            },
        );
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = linear_chain_creation, create_free_recreate, observer_churn
}
criterion_main!(benches);
