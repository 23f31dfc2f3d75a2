//! Provider execution
//!
//! Runs nodes in the order computed by the resolver, caching each output
//! exactly once. The first provider failure aborts the pass; every later node
//! that depends on the failed one is marked failed with the same error and is
//! never invoked.

use crate::descriptor::CallError;
use crate::error::{InternalInvariantError, InvocationError};
use crate::graph::{Graph, NodeId, Source};
use crate::key::{GraphKey, ModuleKey, TypeKey};
use crate::provider::Registry;
use crate::value::{Arg, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle of one provider instance.
#[derive(Debug, Clone, Default)]
pub(crate) enum NodeState {
	#[default]
	Unresolved,
	Scheduled,
	Succeeded(Vec<Value>),
	Failed(InvocationError),
}

impl NodeState {
	/// Whether the node reached a terminal state.
	pub(crate) fn is_settled(&self) -> bool {
		matches!(self, NodeState::Succeeded(_) | NodeState::Failed(_))
	}
}

/// Why a node (or a pass) stopped.
#[derive(Debug)]
pub(crate) enum Halt {
	Failed(InvocationError),
	Internal(InternalInvariantError),
}

impl From<InternalInvariantError> for Halt {
	fn from(err: InternalInvariantError) -> Self {
		Halt::Internal(err)
	}
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Invoker {
	states: Vec<NodeState>,
	casts: HashMap<GraphKey, Value>,
	executed: Vec<NodeId>,
}

impl Invoker {
	/// Makes room for nodes added by a graph extension.
	pub(crate) fn grow(&mut self, len: usize) {
		if self.states.len() < len {
			self.states.resize(len, NodeState::Unresolved);
		}
	}

	pub(crate) fn state(&self, node: NodeId) -> &NodeState {
		&self.states[node]
	}

	pub(crate) fn is_settled(&self, node: NodeId) -> bool {
		self.states
			.get(node)
			.is_some_and(NodeState::is_settled)
	}

	/// Nodes in the order they were successfully invoked.
	pub(crate) fn executed(&self) -> &[NodeId] {
		&self.executed
	}

	pub(crate) fn run(&mut self, graph: &Graph, registry: &Registry, order: &[NodeId]) -> Result<(), Halt> {
		self.grow(graph.len());
		for &node in order {
			if self.states[node].is_settled() {
				let provider = registry.entry(graph.nodes[node].provider);
				return Err(Halt::Internal(InternalInvariantError::DuplicateInvocation {
					provider: provider.node.display_name(),
				}));
			}
			self.states[node] = NodeState::Scheduled;
		}

		for (position, &node) in order.iter().enumerate() {
			match self.invoke_node(graph, registry, node) {
				Ok(values) => {
					self.states[node] = NodeState::Succeeded(values);
					self.executed.push(node);
				}
				Err(Halt::Failed(error)) => {
					self.states[node] = NodeState::Failed(error.clone());
					self.fail_dependents(graph, registry, &order[position + 1..]);
					self.unschedule();
					return Err(Halt::Failed(error));
				}
				Err(halt) => {
					self.unschedule();
					return Err(halt);
				}
			}
		}
		Ok(())
	}

	fn invoke_node(&mut self, graph: &Graph, registry: &Registry, node: NodeId) -> Result<Vec<Value>, Halt> {
		let instance = &graph.nodes[node];
		let entry = registry.entry(instance.provider);
		let provider = &entry.node;

		let mut args = Vec::with_capacity(instance.inputs.len());
		for source in &instance.inputs {
			args.push(self.eval(graph, registry, source, provider.name)?);
		}

		let module = instance.module.as_ref().map(ModuleKey::name);
		tracing::debug!(
			provider = %provider.display_name(),
			location = %provider.location,
			module,
			"invoking provider"
		);

		match (provider.call)(args) {
			Ok(values) if values.len() == provider.outputs.len() => Ok(values),
			Ok(values) => Err(Halt::Internal(InternalInvariantError::OutputCountMismatch {
				provider: provider.display_name(),
				expected: provider.outputs.len(),
				actual: values.len(),
			})),
			Err(CallError::Provider(source)) => {
				let error = InvocationError {
					provider: provider.display_name(),
					location: provider.location,
					outputs: provider.output_keys(),
					source: Arc::from(source),
				};
				tracing::debug!(
					provider = %provider.display_name(),
					location = %provider.location,
					module,
					error = %error.source,
					"provider failed"
				);
				Err(Halt::Failed(error))
			}
			Err(CallError::Internal(err)) => Err(Halt::Internal(err)),
		}
	}

	/// Produces the argument for one input, caching interface casts.
	pub(crate) fn eval(
		&mut self,
		graph: &Graph,
		registry: &Registry,
		source: &Source,
		consumer: &str,
	) -> Result<Arg, Halt> {
		Ok(match source {
			Source::Output { .. } => Arg::One(self.output(graph, registry, source, consumer)?),
			Source::Bound { binding, key, inner } => {
				if let Some(value) = self.casts.get(key) {
					return Ok(Arg::One(value.clone()));
				}
				let Arg::One(implementation) = self.eval(graph, registry, inner, consumer)? else {
					return Err(Halt::Internal(InternalInvariantError::MissingValue {
						key: key.ty,
						provider: consumer.to_string(),
					}));
				};
				let value = cast(registry, *binding, &implementation)?;
				self.casts.insert(key.clone(), value.clone());
				Arg::One(value)
			}
			Source::Many(sources) => {
				let mut values = Vec::with_capacity(sources.len());
				for source in sources {
					values.push(self.output(graph, registry, source, consumer)?);
				}
				Arg::Many(values)
			}
			Source::PerModule(entries) => {
				let mut values = Vec::with_capacity(entries.len());
				for (module, source) in entries {
					values.push((module.clone(), self.output(graph, registry, source, consumer)?));
				}
				Arg::PerModule(values)
			}
			Source::Module(module) => Arg::Module(module.clone()),
			Source::Absent => Arg::Absent,
		})
	}

	/// Reads a value without touching the cast cache. `Ok(None)` means the
	/// producing node has not run yet.
	pub(crate) fn peek(&self, graph: &Graph, registry: &Registry, source: &Source) -> Result<Option<Value>, Halt> {
		match source {
			Source::Output { node, index } => match &self.states[*node] {
				NodeState::Succeeded(values) => Ok(values.get(*index).cloned()),
				NodeState::Failed(error) => Err(Halt::Failed(error.clone())),
				NodeState::Unresolved | NodeState::Scheduled => Ok(None),
			},
			Source::Bound { binding, key, inner } => {
				if let Some(value) = self.casts.get(key) {
					return Ok(Some(value.clone()));
				}
				match self.peek(graph, registry, inner)? {
					Some(implementation) => cast(registry, *binding, &implementation).map(Some),
					None => Ok(None),
				}
			}
			_ => Ok(None),
		}
	}

	fn output(&self, graph: &Graph, registry: &Registry, source: &Source, consumer: &str) -> Result<Value, Halt> {
		let missing = || {
			let key = match source {
				Source::Output { node, index } => {
					registry.entry(graph.nodes[*node].provider).node.outputs[*index].key
				}
				_ => TypeKey::of::<()>(),
			};
			Halt::Internal(InternalInvariantError::MissingValue {
				key,
				provider: consumer.to_string(),
			})
		};
		self.peek(graph, registry, source)?.ok_or_else(missing)
	}

	/// Marks every node in `rest` that (transitively) depends on a failed node.
	fn fail_dependents(&mut self, graph: &Graph, registry: &Registry, rest: &[NodeId]) {
		for &node in rest {
			let failed = graph.nodes[node]
				.dependencies(graph, registry)
				.into_iter()
				.find_map(|edge| match &self.states[edge.node] {
					NodeState::Failed(error) => Some(error.clone()),
					_ => None,
				});
			if let Some(error) = failed {
				self.states[node] = NodeState::Failed(error);
			}
		}
	}

	fn unschedule(&mut self) {
		for state in &mut self.states {
			if matches!(state, NodeState::Scheduled) {
				*state = NodeState::Unresolved;
			}
		}
	}
}

fn cast(registry: &Registry, binding: usize, implementation: &Value) -> Result<Value, Halt> {
	let binding = &registry.bindings[binding];
	(binding.cast)(implementation).ok_or_else(|| {
		Halt::Internal(InternalInvariantError::TypeMismatch {
			expected: binding.implementation,
			found: implementation.key(),
		})
	})
}
