//! Dependency graph visualization for debugging
//!
//! Renders a resolved (or partially resolved) graph in DOT format for
//! Graphviz. Nodes are providers, coloured by what happened to them; edges
//! point from consumer to producer and are labelled with the type that flows
//! along them.
//!
//! ## Example
//!
//! ```rust
//! use wireup_di::visualization::{DependencyGraph, NodeStatus};
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("new_database", NodeStatus::Built);
//! graph.add_node("new_service", NodeStatus::NotRun);
//! graph.add_dependency("new_service", "new_database", "Database");
//!
//! let dot = graph.to_dot();
//! assert!(dot.contains("digraph"));
//! ```

use indexmap::{IndexMap, IndexSet};
use std::fmt;

/// What happened to a node during construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
	/// Invoked successfully; values are cached.
	Built,
	/// Invoked and failed, or skipped because a dependency failed.
	Failed,
	/// Part of the graph but never invoked.
	NotRun,
	/// A required type with no producer.
	Missing,
}

impl NodeStatus {
	fn color(self) -> &'static str {
		match self {
			NodeStatus::Built => "lightgreen",
			NodeStatus::Failed => "lightcoral",
			NodeStatus::NotRun => "lightgrey",
			NodeStatus::Missing => "lightyellow",
		}
	}
}

impl fmt::Display for NodeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			NodeStatus::Built => "built",
			NodeStatus::Failed => "failed",
			NodeStatus::NotRun => "not run",
			NodeStatus::Missing => "missing",
		})
	}
}

/// Represents a node in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
	pub name: String,
	pub status: NodeStatus,
	/// Module the node was built for, if any.
	pub module: Option<String>,
}

/// Dependency graph for visualization
///
/// Insertion order is preserved, so the same graph always renders to the same
/// text.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
	nodes: IndexMap<String, GraphNode>,
	edges: IndexSet<(String, String, String)>,
}

impl DependencyGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a node to the graph. Re-adding a node updates its status.
	pub fn add_node(&mut self, name: impl Into<String>, status: NodeStatus) {
		let name = name.into();
		self.nodes
			.entry(name.clone())
			.and_modify(|node| node.status = status)
			.or_insert(GraphNode {
				name,
				status,
				module: None,
			});
	}

	/// Add a node that was instantiated for a module.
	pub fn add_module_node(
		&mut self,
		name: impl Into<String>,
		status: NodeStatus,
		module: impl Into<String>,
	) {
		let name = name.into();
		self.nodes.insert(
			name.clone(),
			GraphNode {
				name,
				status,
				module: Some(module.into()),
			},
		);
	}

	/// Add a dependency edge from consumer `from` to producer `to`.
	pub fn add_dependency(
		&mut self,
		from: impl Into<String>,
		to: impl Into<String>,
		label: impl Into<String>,
	) {
		self.edges.insert((from.into(), to.into(), label.into()));
	}

	pub fn node(&self, name: &str) -> Option<&GraphNode> {
		self.nodes.get(name)
	}

	/// Generate DOT format output for Graphviz
	pub fn to_dot(&self) -> String {
		let mut output = String::from("digraph DependencyGraph {\n");
		output.push_str("  rankdir=LR;\n");
		output.push_str("  node [shape=box, style=rounded];\n\n");

		for node in self.nodes.values() {
			let mut label = escape(&node.name);
			if let Some(module) = &node.module {
				label.push_str(&format!("\\n[module {}]", escape(module)));
			}
			label.push_str(&format!("\\n({})", node.status));
			output.push_str(&format!(
				"  \"{}\" [label=\"{}\", fillcolor={}, style=\"rounded,filled\"];\n",
				escape(&node.name),
				label,
				node.status.color()
			));
		}

		output.push('\n');

		for (from, to, label) in &self.edges {
			output.push_str(&format!(
				"  \"{}\" -> \"{}\" [label=\"{}\"];\n",
				escape(from),
				escape(to),
				escape(label)
			));
		}

		output.push_str("}\n");
		output
	}

	/// Detect circular dependencies in the graph
	///
	/// Each cycle is reported once, as the list of node names along it.
	pub fn detect_cycles(&self) -> Vec<Vec<String>> {
		let mut cycles = Vec::new();
		let mut visited = IndexSet::new();
		let mut rec_stack = IndexSet::new();

		for node_name in self.nodes.keys() {
			if !visited.contains(node_name.as_str()) {
				let mut path = Vec::new();
				self.dfs_detect_cycles(
					node_name,
					&mut visited,
					&mut rec_stack,
					&mut path,
					&mut cycles,
				);
			}
		}

		cycles
	}

	fn dfs_detect_cycles(
		&self,
		node: &str,
		visited: &mut IndexSet<String>,
		rec_stack: &mut IndexSet<String>,
		path: &mut Vec<String>,
		cycles: &mut Vec<Vec<String>>,
	) {
		visited.insert(node.to_string());
		rec_stack.insert(node.to_string());
		path.push(node.to_string());

		let dependencies: Vec<&str> = self
			.edges
			.iter()
			.filter(|(from, _, _)| from == node)
			.map(|(_, to, _)| to.as_str())
			.collect();

		for dep in dependencies {
			if !visited.contains(dep) {
				self.dfs_detect_cycles(dep, visited, rec_stack, path, cycles);
			} else if rec_stack.contains(dep)
				&& let Some(cycle_start) = path.iter().position(|p| p == dep)
			{
				cycles.push(path[cycle_start..].to_vec());
			}
		}

		path.pop();
		rec_stack.shift_remove(node);
	}

	/// Get statistics about the dependency graph
	pub fn statistics(&self) -> GraphStatistics {
		let count = |status: NodeStatus| self.nodes.values().filter(|n| n.status == status).count();
		GraphStatistics {
			node_count: self.nodes.len(),
			edge_count: self.edges.len(),
			built_count: count(NodeStatus::Built),
			failed_count: count(NodeStatus::Failed),
			not_run_count: count(NodeStatus::NotRun),
			missing_count: count(NodeStatus::Missing),
		}
	}
}

fn escape(text: &str) -> String {
	text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Statistics about a dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStatistics {
	pub node_count: usize,
	pub edge_count: usize,
	pub built_count: usize,
	pub failed_count: usize,
	pub not_run_count: usize,
	pub missing_count: usize,
}
