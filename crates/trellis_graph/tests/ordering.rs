//! Property tests for instantiation order.
//!
//! Generates random dependency forests over eight node types and registers
//! them in a random order. Whatever the registration order, every instance
//! must appear in `Graph::ordered()` after the instance it depends on, and
//! every factory must run exactly once.

use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use trellis_graph::prelude::*;

const NODES: usize = 8;

struct Node<const N: usize>;

/// Registers `Node<N>`, depending on `Node<parent>` when a parent is given.
fn register<const N: usize>(
    m: &mut ModuleBuilder,
    parent: Option<usize>,
    calls: &Arc<AtomicUsize>,
) -> Result<(), ModuleError> {
    macro_rules! with_parent {
        ($($p:literal),*) => {
            match parent {
                None => {
                    let calls = Arc::clone(calls);
                    m.provide(move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Node::<N>
                    })?;
                }
                $(Some($p) => {
                    let calls = Arc::clone(calls);
                    m.provide(move |_: Arc<Node<$p>>| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Node::<N>
                    })?;
                })*
                Some(other) => {
                    return Err(ModuleError::custom(format!("no node type {other}")));
                }
            }
        };
    }

    with_parent!(0, 1, 2, 3, 4, 5, 6, 7);
    Ok(())
}

fn register_index(
    m: &mut ModuleBuilder,
    index: usize,
    parent: Option<usize>,
    calls: &Arc<AtomicUsize>,
) -> Result<(), ModuleError> {
    match index {
        0 => register::<0>(m, parent, calls),
        1 => register::<1>(m, parent, calls),
        2 => register::<2>(m, parent, calls),
        3 => register::<3>(m, parent, calls),
        4 => register::<4>(m, parent, calls),
        5 => register::<5>(m, parent, calls),
        6 => register::<6>(m, parent, calls),
        7 => register::<7>(m, parent, calls),
        other => Err(ModuleError::custom(format!("no node type {other}"))),
    }
}

fn key_of(index: usize) -> TypeKey {
    match index {
        0 => TypeKey::of::<Node<0>>(),
        1 => TypeKey::of::<Node<1>>(),
        2 => TypeKey::of::<Node<2>>(),
        3 => TypeKey::of::<Node<3>>(),
        4 => TypeKey::of::<Node<4>>(),
        5 => TypeKey::of::<Node<5>>(),
        6 => TypeKey::of::<Node<6>>(),
        _ => TypeKey::of::<Node<7>>(),
    }
}

/// For each node, an optional parent with a smaller index, so the result is
/// always acyclic.
fn arb_parents() -> impl Strategy<Value = Vec<Option<usize>>> {
    (
        proptest::collection::vec(any::<bool>(), NODES),
        proptest::collection::vec(any::<proptest::sample::Index>(), NODES),
    )
        .prop_map(|(has_parent, picks)| {
            (0..NODES)
                .map(|i| (i > 0 && has_parent[i]).then(|| picks[i].index(i)))
                .collect()
        })
}

fn arb_order() -> impl Strategy<Value = Vec<usize>> {
    Just((0..NODES).collect::<Vec<_>>()).prop_shuffle()
}

proptest! {
    #[test]
    fn instantiation_order_is_topological(parents in arb_parents(), order in arb_order()) {
        let calls = Arc::new(AtomicUsize::new(0));
        let module_calls = Arc::clone(&calls);
        let module_parents = parents.clone();

        let graph = build_graph(module_fn("nodes", move |m| {
            for &index in &order {
                register_index(m, index, module_parents[index], &module_calls)?;
            }
            Ok(())
        }))
        .unwrap();

        prop_assert_eq!(graph.len(), NODES);
        prop_assert_eq!(calls.load(Ordering::SeqCst), NODES);

        let positions: Vec<usize> = (0..NODES)
            .map(|i| graph.keys().position(|k| k == key_of(i)).unwrap())
            .collect();

        for (child, parent) in parents.iter().enumerate() {
            if let Some(parent) = *parent {
                prop_assert!(
                    positions[parent] < positions[child],
                    "node {} built before its dependency {}",
                    child,
                    parent
                );
            }
        }
    }
}
