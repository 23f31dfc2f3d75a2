//! Build diagnostics: graph rendering, dump files and callbacks

use crate::config::InjectorConfig;
use crate::container::Container;
use crate::descriptor::SlotKind;
use crate::error::DiError;
use crate::graph::{Graph, Source};
use crate::invoker::{Invoker, NodeState};
use crate::key::TypeKey;
use crate::provider::Registry;
use crate::visualization::{DependencyGraph, NodeStatus};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// File name of the DOT dump.
pub const GRAPH_FILE: &str = "wireup-graph.dot";

/// File name of the error report dump.
pub const REPORT_FILE: &str = "wireup-errors.txt";

type SuccessCallback = Box<dyn Fn(&Container) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&DiError) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Diagnostics {
	on_success: Vec<SuccessCallback>,
	on_error: Vec<ErrorCallback>,
}

impl Diagnostics {
	pub(crate) fn add_success(&mut self, callback: SuccessCallback) {
		self.on_success.push(callback);
	}

	pub(crate) fn add_error(&mut self, callback: ErrorCallback) {
		self.on_error.push(callback);
	}

	pub(crate) fn succeeded(&self, config: &InjectorConfig, container: &Container) {
		if config.dump_on_success
			&& let Some(dir) = &config.graphviz_dir
		{
			write_dump(dir, GRAPH_FILE, &container.to_dot());
		}
		for callback in &self.on_success {
			callback(container);
		}
	}

	pub(crate) fn failed(&self, config: &InjectorConfig, error: &DiError, dot: &str) {
		if config.dump_on_error
			&& let Some(dir) = &config.graphviz_dir
		{
			write_dump(dir, GRAPH_FILE, dot);
			write_dump(dir, REPORT_FILE, &format!("{}\n", error));
		}
		for callback in &self.on_error {
			callback(error);
		}
	}
}

impl fmt::Debug for Diagnostics {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Diagnostics")
			.field("on_success", &self.on_success.len())
			.field("on_error", &self.on_error.len())
			.finish()
	}
}

/// Dump failures are logged and otherwise ignored; they never change the
/// outcome of a build.
fn write_dump(dir: &Path, file: &str, contents: &str) {
	let path = dir.join(file);
	let result = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, contents));
	match result {
		Ok(()) => tracing::debug!(path = %path.display(), "wrote diagnostics dump"),
		Err(err) => tracing::warn!(path = %path.display(), error = %err, "failed to write diagnostics dump"),
	}
}

/// Renders the graph with each instance coloured by its state.
///
/// `states` is `None` when nothing ran (an invalid graph). Required inputs
/// whose type is in `missing` become edges to a "missing" node.
pub(crate) fn render(
	registry: &Registry,
	graph: &Graph,
	states: Option<&Invoker>,
	missing: &[TypeKey],
) -> DependencyGraph {
	let mut names = Vec::with_capacity(graph.len());
	let mut used = HashSet::new();
	for instance in &graph.nodes {
		let entry = registry.entry(instance.provider);
		let mut name = entry.node.display_name();
		if let Some(module) = &instance.module {
			name = format!("{} @{}", name, module);
		}
		if !used.insert(name.clone()) {
			name = format!("{} {}", name, entry.id);
			used.insert(name.clone());
		}
		names.push(name);
	}

	let mut rendered = DependencyGraph::new();
	for (node, instance) in graph.nodes.iter().enumerate() {
		let status = match states.map(|invoker| invoker.state(node)) {
			Some(NodeState::Succeeded(_)) => NodeStatus::Built,
			Some(NodeState::Failed(_)) => NodeStatus::Failed,
			_ => NodeStatus::NotRun,
		};
		match &instance.module {
			Some(module) => rendered.add_module_node(&names[node], status, module.name()),
			None => rendered.add_node(&names[node], status),
		}
	}

	for key in missing {
		rendered.add_node(missing_name(*key), NodeStatus::Missing);
	}

	for (node, instance) in graph.nodes.iter().enumerate() {
		for edge in instance.dependencies(graph, registry) {
			rendered.add_dependency(
				&names[node],
				&names[edge.node],
				edge.requested(registry).short_name(),
			);
		}
		let slots = &registry.entry(instance.provider).node.inputs;
		for (slot, source) in slots.iter().zip(&instance.inputs) {
			if matches!(source, Source::Absent)
				&& !slot.optional
				&& slot.kind == SlotKind::One
				&& missing.contains(&slot.key)
			{
				rendered.add_dependency(&names[node], missing_name(slot.key), slot.key.short_name());
			}
		}
	}
	rendered
}

fn missing_name(key: TypeKey) -> String {
	format!("missing {}", key.short_name())
}
