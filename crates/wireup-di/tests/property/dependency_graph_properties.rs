//! Property-based tests for the dependency graph
//!
//! Uses proptest over generated layered graphs to verify:
//! 1. Determinism - identical registrations run in identical order
//! 2. Singletons - every provider runs at most once, however many consumers it has
//! 3. Topological order - every provider runs after everything it depends on

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wireup_di::{DynamicProvider, Injector, ProviderOptions, TypeKey, Value};

/// Marker type per node: a layered graph needs one distinct `TypeKey` per node.
struct Node<const N: usize>;

macro_rules! node_keys {
	($($n:literal),*) => {
		fn node_key(index: usize) -> TypeKey {
			match index {
				$($n => TypeKey::of::<Node<$n>>(),)*
				_ => unreachable!("generated graphs stay within the declared node range"),
			}
		}

		fn node_value(index: usize) -> Value {
			match index {
				$($n => Value::new(Arc::new(Node::<$n>)),)*
				_ => unreachable!("generated graphs stay within the declared node range"),
			}
		}
	};
}

node_keys!(0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15);

const MAX_NODES: usize = 16;

/// For each node, the indices of earlier nodes it depends on. Edges only point
/// backwards, so generated graphs are acyclic.
fn layered_graph() -> impl Strategy<Value = Vec<Vec<usize>>> {
	(1..=MAX_NODES).prop_flat_map(|len| {
		(0..len)
			.map(|node| {
				if node == 0 {
					Just(Vec::new()).boxed()
				} else {
					proptest::collection::btree_set(0..node, 0..=node.min(3))
						.prop_map(|deps| deps.into_iter().collect::<Vec<_>>())
						.boxed()
				}
			})
			.collect::<Vec<_>>()
	})
}

struct Run {
	order: Vec<usize>,
	calls: Vec<usize>,
}

/// Registers `graph` with dynamic providers and builds every node as a root.
fn run(graph: &[Vec<usize>]) -> Run {
	let calls: Arc<Vec<AtomicUsize>> = Arc::new((0..graph.len()).map(|_| AtomicUsize::new(0)).collect());
	let log = Arc::new(Mutex::new(Vec::new()));
	let mut injector = Injector::new();
	let mut by_id = HashMap::new();

	for (index, deps) in graph.iter().enumerate() {
		let mut provider = DynamicProvider::new("node");
		for dep in deps {
			provider = with_input(provider, *dep);
		}
		let calls = calls.clone();
		let log = log.clone();
		let descriptor = with_output(provider, index)
			.body(move |_args| {
				calls[index].fetch_add(1, Ordering::SeqCst);
				log.lock().unwrap().push(index);
				Ok(vec![node_value(index)])
			})
			.build()
			.unwrap();
		let id = injector
			.provide_descriptor(descriptor, ProviderOptions::new())
			.unwrap();
		by_id.insert(id, index);
	}

	let roots: Vec<TypeKey> = (0..graph.len()).rev().map(node_key).collect();
	let container = injector.build(roots).unwrap();
	let order = container
		.executed_providers()
		.iter()
		.map(|id| by_id[id])
		.collect();
	assert_eq!(*log.lock().unwrap(), order);
	Run {
		order,
		calls: calls.iter().map(|c| c.load(Ordering::SeqCst)).collect(),
	}
}

macro_rules! signature_by_index {
	($name:ident, $method:ident, $($n:literal),*) => {
		fn $name(provider: DynamicProvider, index: usize) -> DynamicProvider {
			match index {
				$($n => provider.$method::<Node<$n>>(),)*
				_ => unreachable!("generated graphs stay within the declared node range"),
			}
		}
	};
}

signature_by_index!(with_input, input, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15);
signature_by_index!(with_output, output, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15);

proptest! {
	#[test]
	fn identical_registrations_run_in_identical_order(graph in layered_graph()) {
		let first = run(&graph);
		let second = run(&graph);
		prop_assert_eq!(first.order, second.order);
	}

	#[test]
	fn every_provider_runs_exactly_once(graph in layered_graph()) {
		let result = run(&graph);
		prop_assert!(result.calls.iter().all(|calls| *calls == 1));
		prop_assert_eq!(result.order.len(), graph.len());
	}

	#[test]
	fn dependencies_run_first(graph in layered_graph()) {
		let result = run(&graph);
		let position: HashMap<usize, usize> = result
			.order
			.iter()
			.enumerate()
			.map(|(position, node)| (*node, position))
			.collect();
		for (node, deps) in graph.iter().enumerate() {
			for dep in deps {
				prop_assert!(position[dep] < position[&node]);
			}
		}
	}
}
