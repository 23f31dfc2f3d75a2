//! Execution ordering and cycle detection
//!
//! Depth-first traversal from the roots, emitting each node after all of its
//! producers (post-order). Traversal follows input declaration order and
//! registration order only, so the same registrations always yield the same
//! order.

use crate::error::{CycleError, GraphError, Problem};
use crate::graph::{Edge, Graph, NodeId, Source};
use crate::provider::Registry;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
	Unvisited,
	InProgress,
	Done,
}

struct Frame {
	node: NodeId,
	/// Edge through which the parent reached this node; `None` for start nodes.
	via: Option<Edge>,
	deps: Vec<Edge>,
	next: usize,
}

/// Computes the invocation order for everything reachable from `roots`,
/// followed by `invokers`.
///
/// Nodes for which `settled` returns true already ran (or failed) in an
/// earlier pass and are neither traversed nor emitted again.
pub(crate) fn execution_order(
	graph: &Graph,
	registry: &Registry,
	roots: &[Source],
	invokers: &[NodeId],
	settled: impl Fn(NodeId) -> bool,
	max_depth: usize,
) -> Result<Vec<NodeId>, Vec<Problem>> {
	let mut marks: Vec<Mark> = (0..graph.len())
		.map(|node| if settled(node) { Mark::Done } else { Mark::Unvisited })
		.collect();

	let mut starts: Vec<(NodeId, Option<Edge>)> = Vec::new();
	for root in roots {
		let mut deps = Vec::new();
		root.dependencies(graph, registry, &mut deps);
		starts.extend(deps.into_iter().map(|edge| (edge.node, Some(edge))));
	}
	starts.extend(invokers.iter().map(|node| (*node, None)));

	let mut order = Vec::new();
	let mut problems = Vec::new();
	let mut seen_cycles: HashSet<Vec<NodeId>> = HashSet::new();

	for (start, via) in starts {
		if marks[start] != Mark::Unvisited {
			continue;
		}
		marks[start] = Mark::InProgress;
		let mut stack = vec![Frame {
			node: start,
			via,
			deps: graph.nodes[start].dependencies(graph, registry),
			next: 0,
		}];

		while let Some(frame) = stack.last_mut() {
			if frame.next >= frame.deps.len() {
				let node = frame.node;
				stack.pop();
				marks[node] = Mark::Done;
				order.push(node);
				continue;
			}

			let edge = frame.deps[frame.next].clone();
			frame.next += 1;
			let dep = edge.node;
			match marks[dep] {
				Mark::Done => {}
				Mark::InProgress => {
					if let Some(cycle) = cycle_at(&stack, edge, graph, registry)
						&& seen_cycles.insert(cycle.0)
					{
						tracing::debug!(cycle = %cycle.1.path_display(), "dependency cycle found");
						problems.push(Problem::Cycle(cycle.1));
					}
				}
				Mark::Unvisited => {
					if stack.len() >= max_depth {
						problems.push(Problem::Graph(GraphError::MaxDepthExceeded {
							key: edge.requested(registry),
							depth: max_depth,
						}));
						return Err(problems);
					}
					marks[dep] = Mark::InProgress;
					stack.push(Frame {
						node: dep,
						via: Some(edge),
						deps: graph.nodes[dep].dependencies(graph, registry),
						next: 0,
					});
				}
			}
		}
	}

	if problems.is_empty() {
		Ok(order)
	} else {
		Err(problems)
	}
}

/// Builds the cycle closed by `closing`, rotated so that it starts at the
/// earliest registered provider. Also returns the rotated node list, used to
/// report each cycle once.
///
/// The path lists each member's output followed by the interfaces its
/// consumer edge into the next member goes through.
fn cycle_at(
	stack: &[Frame],
	closing: Edge,
	graph: &Graph,
	registry: &Registry,
) -> Option<(Vec<NodeId>, CycleError)> {
	let start = stack.iter().position(|frame| frame.node == closing.node)?;
	let mut members: Vec<Edge> = vec![closing];
	for frame in &stack[start + 1..] {
		members.push(frame.via.clone()?);
	}

	let pivot = members
		.iter()
		.enumerate()
		.min_by_key(|(_, edge)| (graph.nodes[edge.node].provider, edge.node))
		.map(|(position, _)| position)
		.unwrap_or(0);
	members.rotate_left(pivot);

	let mut path = Vec::new();
	let mut locations = Vec::new();
	for (position, member) in members.iter().enumerate() {
		path.push(member.key);
		locations.push(registry.entry(graph.nodes[member.node].provider).node.location);
		let next = &members[(position + 1) % members.len()];
		for binding in &next.bindings {
			let binding = &registry.bindings[*binding];
			path.push(binding.interface);
			locations.push(binding.location);
		}
	}

	let nodes = members.iter().map(|edge| edge.node).collect();
	Some((nodes, CycleError { path, locations }))
}
