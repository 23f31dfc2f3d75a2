//! The built container
//!
//! Holds the resolved graph and every value produced for it. Reads take
//! `&self`; anything that may resolve or run more providers takes `&mut self`.

use crate::aggregate::flatten_params;
use crate::config::InjectorConfig;
use crate::descriptor::{Handler, InputSlot};
use crate::diagnostics::render;
use crate::error::{DiError, DiResult, GraphError, InvocationError};
use crate::graph::{Choice, Graph, GraphBuilder, NodeId, Source};
use crate::invoker::{Halt, Invoker, NodeState};
use crate::key::{Scope, TypeKey};
use crate::location::Location;
use crate::provider::{ProviderId, Registry};
use crate::resolver;
use crate::value::{downcast_value, ArgCursor, Value};
use crate::visualization::DependencyGraph;
use std::fmt;
use std::sync::Arc;

/// A fully resolved, memoized dependency graph.
///
/// Every type is constructed at most once; all consumers and every call to
/// [`get`](Self::get) observe the same `Arc`.
///
/// # Examples
///
/// ```
/// use wireup_di::{Injector, TypeKey};
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// struct Server { port: u16 }
///
/// let mut injector = Injector::new();
/// injector.provide(|| Arc::new(Config { port: 8080 })).unwrap();
/// injector.provide(|c: Arc<Config>| Arc::new(Server { port: c.port })).unwrap();
///
/// let container = injector.build([TypeKey::of::<Server>()]).unwrap();
/// assert_eq!(container.get::<Server>().unwrap().port, 8080);
/// ```
pub struct Container {
	registry: Registry,
	config: InjectorConfig,
	graph: Graph,
	invoker: Invoker,
}

impl Container {
	pub(crate) fn new(registry: Registry, config: InjectorConfig, graph: Graph) -> Self {
		let mut invoker = Invoker::default();
		invoker.grow(graph.len());
		Self {
			registry,
			config,
			graph,
			invoker,
		}
	}

	pub(crate) fn run(&mut self, order: &[NodeId]) -> Result<(), Halt> {
		self.invoker.run(&self.graph, &self.registry, order)
	}

	/// Value of `T` built for the global scope.
	///
	/// Fails with [`DiError::Unresolved`] if `T` was not part of any build or
	/// resolution so far; use [`resolve`](Self::resolve) for on-demand
	/// construction.
	pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
		let key = TypeKey::of::<T>();
		match self.graph.selection(key, &Scope::Global) {
			Some(Choice::Found(source)) => match self.read(source)? {
				Some(value) => Ok(downcast_value::<T>(&value)?),
				None => Err(DiError::Unresolved { key }),
			},
			Some(Choice::Missing) => Err(GraphError::NoProvider {
				key,
				scope: Scope::Global,
				required_by: vec!["Container::get".to_string()],
			}
			.into()),
			Some(Choice::Failed) | None => Err(DiError::Unresolved { key }),
		}
	}

	/// Value of `T`, resolving and running any providers it still needs.
	pub fn resolve<T: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Arc<T>> {
		match self.get::<T>() {
			Err(DiError::Unresolved { .. }) => {}
			resolved => return resolved,
		}
		let key = TypeKey::of::<T>();
		let sources = self.extend(&[InputSlot::required(key)], "Container::resolve")?;
		match sources.first() {
			Some(source) => match self.read(source)? {
				Some(value) => Ok(downcast_value::<T>(&value)?),
				None => Err(DiError::Unresolved { key }),
			},
			None => Err(DiError::Unresolved { key }),
		}
	}

	/// Calls `f` with its inputs resolved against this container.
	///
	/// Already-built values are reused; only newly required providers run.
	/// The first failure in `f`'s dependency subgraph is returned as is.
	#[track_caller]
	pub fn invoke<Args, H: Handler<Args>>(&mut self, f: H) -> DiResult<H::Output> {
		let location = Location::caller();
		let slots = flatten_params(H::params(), location)?;
		let requirer = format!(
			"invocation `{}` at {}",
			crate::key::shorten_type_name(f.name()),
			location
		);
		let sources = self.extend(&slots, &requirer)?;

		let mut args = Vec::with_capacity(sources.len());
		for source in &sources {
			let arg = self
				.invoker
				.eval(&self.graph, &self.registry, source, f.name())
				.map_err(halt_to_error)?;
			args.push(arg);
		}
		let mut cursor = ArgCursor::new(args, f.name());
		Ok(f.call(&mut cursor)?)
	}

	/// Registration sites of providers in the order they ran.
	pub fn execution_order(&self) -> Vec<Location> {
		self.invoker
			.executed()
			.iter()
			.map(|node| {
				let provider = self.graph.nodes[*node].provider;
				self.registry.entry(provider).node.location
			})
			.collect()
	}

	/// Providers in the order they ran. Module-scoped providers appear once
	/// per module they were built for.
	pub fn executed_providers(&self) -> Vec<ProviderId> {
		self.invoker
			.executed()
			.iter()
			.map(|node| self.graph.nodes[*node].provider)
			.collect()
	}

	/// The failure that stopped the last construction pass, if any.
	pub fn failure(&self) -> Option<&InvocationError> {
		(0..self.graph.len()).find_map(|node| match self.invoker.state(node) {
			NodeState::Failed(error) => Some(error),
			_ => None,
		})
	}

	pub fn config(&self) -> &InjectorConfig {
		&self.config
	}

	/// Visualization model of the resolved graph.
	pub fn dependency_graph(&self) -> DependencyGraph {
		render(&self.registry, &self.graph, Some(&self.invoker), &[])
	}

	/// Graphviz DOT rendering of the resolved graph.
	pub fn to_dot(&self) -> String {
		self.dependency_graph().to_dot()
	}

	fn read(&self, source: &Source) -> DiResult<Option<Value>> {
		self.invoker
			.peek(&self.graph, &self.registry, source)
			.map_err(halt_to_error)
	}

	/// Adds `slots` as new global requests, then orders and runs whatever
	/// became reachable. Structural problems leave the container untouched; a
	/// single one is returned as its own variant.
	fn extend(&mut self, slots: &[InputSlot], requirer: &str) -> DiResult<Vec<Source>> {
		let mut builder = GraphBuilder::new(&self.registry, &self.config, self.graph.clone());
		let sources: Vec<Source> = slots
			.iter()
			.map(|slot| builder.request(slot, None, requirer))
			.collect();
		let (graph, mut report) = builder.finish();

		let invoker = &self.invoker;
		let order = resolver::execution_order(
			&graph,
			&self.registry,
			&sources,
			&[],
			|node| invoker.is_settled(node),
			self.config.max_depth,
		);
		let order = match order {
			Ok(order) if report.is_empty() => order,
			Ok(_) => return Err(report.into_error()),
			Err(problems) => {
				report.extend(problems);
				return Err(report.into_error());
			}
		};

		tracing::debug!(requirer, new_nodes = order.len(), "extending container");
		self.graph = graph;
		self.invoker
			.run(&self.graph, &self.registry, &order)
			.map_err(halt_to_error)?;
		Ok(sources)
	}
}

pub(crate) fn halt_to_error(halt: Halt) -> DiError {
	match halt {
		Halt::Failed(error) => DiError::Invocation(error),
		Halt::Internal(error) => DiError::Internal(error),
	}
}

impl fmt::Debug for Container {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Container")
			.field("providers", &self.registry.providers.len())
			.field("nodes", &self.graph.len())
			.field("executed", &self.invoker.executed().len())
			.field("failed", &self.failure().is_some())
			.finish()
	}
}
