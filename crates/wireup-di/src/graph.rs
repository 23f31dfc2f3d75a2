//! Type graph builder
//!
//! Selects exactly one producer for every type reachable from the requested
//! roots, honouring module visibility, bindings and preferences. Problems are
//! collected into an [`ErrorReport`] instead of stopping at the first one.
//!
//! Lookups happen per (type, scope). A lookup inside module `M` first
//! considers providers registered in `M`, module-scoped global providers
//! instantiated for `M`, and bindings declared for `M`; only when that level
//! has no candidate does it fall back to the global scope, where module
//! providers are visible through their exports.

use crate::config::InjectorConfig;
use crate::descriptor::{InputSlot, SlotKind};
use crate::error::{BindingError, ErrorReport, GraphError, Problem};
use crate::key::{GraphKey, ModuleKey, Scope, TypeKey};
use crate::provider::{ProviderEntry, ProviderId, Registry};
use std::collections::{HashMap, VecDeque};

pub(crate) type NodeId = usize;

/// Where an input's value comes from.
#[derive(Debug, Clone)]
pub(crate) enum Source {
	/// Output `index` of an instantiated provider.
	Output { node: NodeId, index: usize },
	/// An interface value cast from its bound implementation.
	Bound {
		binding: usize,
		key: GraphKey,
		inner: Box<Source>,
	},
	Many(Vec<Source>),
	PerModule(Vec<(ModuleKey, Source)>),
	Module(ModuleKey),
	Absent,
}

impl Source {
	/// Producer nodes read by this source.
	pub(crate) fn dependencies(&self, graph: &Graph, registry: &Registry, out: &mut Vec<Edge>) {
		match self {
			Source::Output { node, index } => {
				let entry = registry.entry(graph.nodes[*node].provider);
				out.push(Edge {
					node: *node,
					key: entry.node.outputs[*index].key,
					bindings: Vec::new(),
				});
			}
			Source::Bound { binding, inner, .. } => {
				let from = out.len();
				inner.dependencies(graph, registry, out);
				for edge in &mut out[from..] {
					edge.bindings.insert(0, *binding);
				}
			}
			Source::Many(sources) => {
				for source in sources {
					source.dependencies(graph, registry, out);
				}
			}
			Source::PerModule(entries) => {
				for (_, source) in entries {
					source.dependencies(graph, registry, out);
				}
			}
			Source::Module(_) | Source::Absent => {}
		}
	}
}

/// A consumer reading one output of a producer node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edge {
	pub(crate) node: NodeId,
	/// Output read from `node`.
	pub(crate) key: TypeKey,
	/// Bindings crossed on the way, outermost interface first.
	pub(crate) bindings: Vec<usize>,
}

impl Edge {
	/// The type the consumer asked for.
	pub(crate) fn requested(&self, registry: &Registry) -> TypeKey {
		self.bindings
			.first()
			.map_or(self.key, |binding| registry.bindings[*binding].interface)
	}
}

/// One instantiation of a provider.
///
/// Ordinary providers have a single instance; module-scoped providers have
/// one per module that asks for their outputs.
#[derive(Debug, Clone)]
pub(crate) struct NodeInstance {
	pub(crate) provider: ProviderId,
	pub(crate) module: Option<ModuleKey>,
	pub(crate) inputs: Vec<Source>,
}

impl NodeInstance {
	pub(crate) fn dependencies(&self, graph: &Graph, registry: &Registry) -> Vec<Edge> {
		let mut out = Vec::new();
		for source in &self.inputs {
			source.dependencies(graph, registry, &mut out);
		}
		out
	}
}

/// Outcome of selecting a producer for one (type, scope).
#[derive(Debug, Clone)]
pub(crate) enum Choice {
	Found(Source),
	/// No candidate at all; fine for optional inputs.
	Missing,
	/// Selection failed and the problem was already reported.
	Failed,
}

/// Resolved provider instances and the selection made for every lookup.
#[derive(Debug, Clone, Default)]
pub(crate) struct Graph {
	pub(crate) nodes: Vec<NodeInstance>,
	instances: HashMap<(ProviderId, Option<ModuleKey>), NodeId>,
	selections: HashMap<(TypeKey, Scope), Choice>,
}

impl Graph {
	pub(crate) fn len(&self) -> usize {
		self.nodes.len()
	}

	pub(crate) fn selection(&self, key: TypeKey, scope: &Scope) -> Option<&Choice> {
		self.selections.get(&(key, scope.clone()))
	}
}

#[derive(Debug, Clone)]
enum Candidate {
	Provider {
		id: ProviderId,
		module: Option<ModuleKey>,
	},
	Binding(usize),
}

/// Grows a [`Graph`] from new requests.
///
/// Works on an owned copy, so a failed extension never touches a graph that
/// is already in use.
pub(crate) struct GraphBuilder<'a> {
	registry: &'a Registry,
	config: &'a InjectorConfig,
	graph: Graph,
	report: ErrorReport,
	reported: HashMap<TypeKey, usize>,
	pending: VecDeque<NodeId>,
}

impl<'a> GraphBuilder<'a> {
	pub(crate) fn new(registry: &'a Registry, config: &'a InjectorConfig, graph: Graph) -> Self {
		Self {
			registry,
			config,
			graph,
			report: ErrorReport::new(),
			reported: HashMap::new(),
			pending: VecDeque::new(),
		}
	}

	/// Resolves one input slot as seen from `module`.
	pub(crate) fn request(&mut self, slot: &InputSlot, module: Option<&ModuleKey>, requirer: &str) -> Source {
		match slot.kind {
			SlotKind::ModuleKey => match module {
				Some(module) => Source::Module(module.clone()),
				None => {
					self.report.push(GraphError::ModuleKeyUnavailable {
						required_by: requirer.to_string(),
					});
					Source::Absent
				}
			},
			SlotKind::Many => self.collect_many(slot.key),
			SlotKind::PerModule => self.collect_per_module(slot.key),
			SlotKind::One => {
				let scope = Scope::of(module);
				match self.select(slot.key, &scope, requirer, 0) {
					Choice::Found(source) => source,
					Choice::Missing => {
						if slot.optional {
							self.log(|| {
								tracing::trace!(
									key = %slot.key.short_name(),
									scope = %scope,
									requirer,
									"optional input left absent"
								)
							});
						} else {
							self.report_missing(slot.key, requirer);
						}
						Source::Absent
					}
					Choice::Failed => Source::Absent,
				}
			}
		}
	}

	/// Instance of `provider` for `module`, created on first use.
	pub(crate) fn instantiate(&mut self, provider: ProviderId, module: Option<ModuleKey>) -> NodeId {
		let instance_key = (provider, module);
		if let Some(&node) = self.graph.instances.get(&instance_key) {
			return node;
		}
		let node = self.graph.nodes.len();
		self.graph.nodes.push(NodeInstance {
			provider,
			module: instance_key.1.clone(),
			inputs: Vec::new(),
		});
		self.graph.instances.insert(instance_key, node);
		self.pending.push_back(node);
		node
	}

	/// Resolves the inputs of every instance created so far, then hands back
	/// the graph and whatever went wrong.
	pub(crate) fn finish(mut self) -> (Graph, ErrorReport) {
		let registry = self.registry;
		while let Some(node) = self.pending.pop_front() {
			let provider = self.graph.nodes[node].provider;
			let module = self.graph.nodes[node].module.clone();
			let entry = registry.entry(provider);
			let requirer = requirer_for(entry, module.as_ref());
			let inputs = entry
				.node
				.inputs
				.iter()
				.map(|slot| self.request(slot, module.as_ref(), &requirer))
				.collect();
			self.graph.nodes[node].inputs = inputs;
		}
		(self.graph, self.report)
	}

	fn select(&mut self, key: TypeKey, scope: &Scope, requirer: &str, depth: usize) -> Choice {
		if let Some(choice) = self.graph.selections.get(&(key, scope.clone())) {
			return choice.clone();
		}
		if depth > self.config.max_depth {
			self.report.push(GraphError::MaxDepthExceeded {
				key,
				depth: self.config.max_depth,
			});
			return Choice::Failed;
		}

		let candidates = self.candidates(key, scope);
		let choice = if candidates.is_empty() {
			match scope {
				Scope::Module(_) => self.select(key, &Scope::Global, requirer, depth),
				Scope::Global => Choice::Missing,
			}
		} else {
			self.choose(key, scope, candidates, depth)
		};
		self.graph
			.selections
			.insert((key, scope.clone()), choice.clone());
		choice
	}

	fn candidates(&self, key: TypeKey, scope: &Scope) -> Vec<Candidate> {
		let mut found = Vec::new();
		for entry in &self.registry.providers {
			if !entry.produces(key) {
				continue;
			}
			match scope {
				Scope::Module(module) => {
					if entry.module.as_ref() == Some(module) || entry.is_module_scoped() {
						found.push(Candidate::Provider {
							id: entry.id,
							module: Some(module.clone()),
						});
					}
				}
				Scope::Global => match &entry.module {
					None if !entry.is_module_scoped() => found.push(Candidate::Provider {
						id: entry.id,
						module: None,
					}),
					Some(module) if entry.exports(key) => found.push(Candidate::Provider {
						id: entry.id,
						module: Some(module.clone()),
					}),
					_ => {}
				},
			}
		}

		let level = match scope {
			Scope::Module(module) => Some(module),
			Scope::Global => None,
		};
		for (index, binding) in self.registry.bindings.iter().enumerate() {
			if binding.interface == key && binding.module.as_ref() == level {
				found.push(Candidate::Binding(index));
			}
		}
		found
	}

	fn choose(&mut self, key: TypeKey, scope: &Scope, candidates: Vec<Candidate>, depth: usize) -> Choice {
		let picked = if candidates.len() == 1 {
			candidates.first().cloned()
		} else {
			let mut preferred = candidates.iter().filter(|c| self.is_preferred(c));
			match (preferred.next(), preferred.next()) {
				(Some(only), None) => Some(only.clone()),
				_ => None,
			}
		};

		let Some(picked) = picked else {
			self.report_ambiguous(key, scope, &candidates);
			return Choice::Failed;
		};

		match picked {
			Candidate::Provider { id, module } => {
				let entry = self.registry.entry(id);
				let Some(index) = entry.node.output_index(key) else {
					return Choice::Failed;
				};
				self.log(|| {
					tracing::trace!(
						key = %key.short_name(),
						scope = %scope,
						provider = %entry.node.display_name(),
						"selected provider"
					)
				});
				let node = self.instantiate(id, module);
				Choice::Found(Source::Output { node, index })
			}
			Candidate::Binding(index) => {
				let registry = self.registry;
				let binding = &registry.bindings[index];
				let requirer = binding.describe();
				self.log(|| {
					tracing::trace!(
						interface = %key.short_name(),
						implementation = %binding.implementation.short_name(),
						scope = %scope,
						"following binding"
					)
				});
				match self.select(binding.implementation, scope, &requirer, depth + 1) {
					Choice::Found(inner) => Choice::Found(Source::Bound {
						binding: index,
						key: GraphKey::new(key, scope.clone()),
						inner: Box::new(inner),
					}),
					Choice::Missing => {
						self.report_missing(binding.implementation, &requirer);
						Choice::Failed
					}
					Choice::Failed => Choice::Failed,
				}
			}
		}
	}

	fn is_preferred(&self, candidate: &Candidate) -> bool {
		match candidate {
			Candidate::Provider { id, .. } => self.registry.entry(*id).preferred,
			Candidate::Binding(index) => self.registry.bindings[*index].is_default,
		}
	}

	fn describe(&self, candidate: &Candidate) -> String {
		match candidate {
			Candidate::Provider { id, module } => {
				requirer_for(self.registry.entry(*id), module.as_ref())
			}
			Candidate::Binding(index) => self.registry.bindings[*index].describe(),
		}
	}

	fn report_ambiguous(&mut self, key: TypeKey, scope: &Scope, candidates: &[Candidate]) {
		let descriptions: Vec<String> = candidates.iter().map(|c| self.describe(c)).collect();
		let via_binding = candidates
			.iter()
			.any(|c| matches!(c, Candidate::Binding(_)));
		if key.is_interface() || via_binding {
			self.report.push(BindingError::Ambiguous {
				interface: key,
				scope: scope.clone(),
				candidates: descriptions,
			});
		} else {
			self.report.push(GraphError::AmbiguousProvider {
				key,
				scope: scope.clone(),
				candidates: descriptions,
			});
		}
	}

	/// Records a missing producer once per type, accumulating every consumer
	/// that needed it.
	///
	/// A lookup only comes back empty after falling back to the global scope,
	/// so that is the scope every missing type is reported in.
	fn report_missing(&mut self, key: TypeKey, requirer: &str) {
		if let Some(&position) = self.reported.get(&key) {
			if let Some(
				Problem::Graph(GraphError::NoProvider { required_by, .. })
				| Problem::Binding(BindingError::Unbound { required_by, .. }),
			) = self.report.problems_mut().get_mut(position)
				&& !required_by.iter().any(|r| r == requirer)
			{
				required_by.push(requirer.to_string());
			}
			return;
		}

		let module_scoped = self
			.registry
			.providers
			.iter()
			.find(|entry| entry.produces(key) && entry.is_module_scoped());
		match module_scoped {
			Some(entry) => self.report.push(GraphError::ModuleScopedOutsideModule {
				key,
				location: entry.node.location,
				required_by: requirer.to_string(),
			}),
			None if key.is_interface() => self.report.push(BindingError::Unbound {
				interface: key,
				scope: Scope::Global,
				required_by: vec![requirer.to_string()],
			}),
			None => self.report.push(GraphError::NoProvider {
				key,
				scope: Scope::Global,
				required_by: vec![requirer.to_string()],
			}),
		}
		self.reported.insert(key, self.report.len() - 1);
	}

	/// Every non-module-scoped producer of `key`, in registration order.
	fn collect_many(&mut self, key: TypeKey) -> Source {
		let registry = self.registry;
		let sources: Vec<Source> = registry
			.providers
			.iter()
			.filter(|entry| entry.produces(key) && !entry.is_module_scoped())
			.filter_map(|entry| {
				let index = entry.node.output_index(key)?;
				let node = self.instantiate(entry.id, entry.module.clone());
				Some(Source::Output { node, index })
			})
			.collect();
		self.log(|| tracing::trace!(key = %key.short_name(), count = sources.len(), "collected many"));
		Source::Many(sources)
	}

	/// One producer of `key` per module, ordered by module name.
	fn collect_per_module(&mut self, key: TypeKey) -> Source {
		let registry = self.registry;
		let mut entries = Vec::new();
		for module in registry.modules() {
			let candidates: Vec<Candidate> = registry
				.providers
				.iter()
				.filter(|entry| entry.produces(key) && entry.module.as_ref() == Some(module))
				.map(|entry| Candidate::Provider {
					id: entry.id,
					module: Some(module.clone()),
				})
				.collect();
			if candidates.is_empty() {
				continue;
			}
			let scope = Scope::Module(module.clone());
			if let Choice::Found(source) = self.choose(key, &scope, candidates, 0) {
				entries.push((module.clone(), source));
			}
		}
		Source::PerModule(entries)
	}

	fn log(&self, emit: impl FnOnce()) {
		if self.config.log_resolution {
			emit();
		}
	}
}

/// How a provider instance is named in "required by" lists.
pub(crate) fn requirer_for(entry: &ProviderEntry, module: Option<&ModuleKey>) -> String {
	let mut text = entry.describe();
	if entry.module.is_none()
		&& let Some(module) = module
	{
		text.push_str(&format!(" for module `{}`", module));
	}
	text
}
