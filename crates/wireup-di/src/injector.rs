//! Registration surface and container construction

use crate::aggregate::expand;
use crate::binding::Binding;
use crate::config::InjectorConfig;
use crate::container::Container;
use crate::descriptor::{Handler, InputSlot, ProviderDescriptor};
use crate::diagnostics::{render, Diagnostics};
use crate::error::{BuildError, DiError, ExtractionError};
use crate::graph::{Graph, GraphBuilder, NodeId, Source};
use crate::invoker::Halt;
use crate::key::{ModuleKey, TypeKey};
use crate::location::Location;
use crate::provider::{ProviderEntry, ProviderId, ProviderOptions, Registry, Role};
use crate::resolver;
use std::fmt;
use std::sync::Arc;

const ROOT_REQUEST: &str = "root request";

/// Collects providers, bindings and invokers, then builds a [`Container`].
///
/// # Examples
///
/// ```
/// use wireup_di::{bind, Injector, TypeKey};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".to_string()
///     }
/// }
///
/// let mut injector = Injector::new();
/// injector.provide(|| Arc::new(English)).unwrap();
/// injector.bind(bind!(dyn Greeter => English));
///
/// let container = injector.build([TypeKey::of::<dyn Greeter>()]).unwrap();
/// assert_eq!(container.get::<dyn Greeter>().unwrap().greet(), "hello");
/// ```
#[derive(Default)]
pub struct Injector {
	registry: Registry,
	config: InjectorConfig,
	diagnostics: Diagnostics,
}

impl Injector {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_config(config: InjectorConfig) -> Self {
		Self {
			config,
			..Self::default()
		}
	}

	pub fn config(&self) -> &InjectorConfig {
		&self.config
	}

	/// Key of the module called `name`, created on first use.
	pub fn module(&mut self, name: &str) -> ModuleKey {
		if let Some(key) = self.registry.modules.get(name) {
			return key.clone();
		}
		let id = u32::try_from(self.registry.modules.len()).unwrap_or(u32::MAX);
		let key = ModuleKey::new(id, name);
		tracing::debug!(module = name, "registered module");
		self.registry.modules.insert(name.to_string(), key.clone());
		key
	}

	/// Registers a provider in the global scope.
	#[track_caller]
	pub fn provide<Args, H: Handler<Args>>(&mut self, f: H) -> Result<ProviderId, ExtractionError> {
		self.provide_with(f, ProviderOptions::default())
	}

	/// Registers a provider with a preference, module or exports.
	#[track_caller]
	pub fn provide_with<Args, H: Handler<Args>>(
		&mut self,
		f: H,
		options: ProviderOptions,
	) -> Result<ProviderId, ExtractionError> {
		let descriptor = ProviderDescriptor::from_handler(f, Location::caller())?;
		self.register(descriptor, options, Role::Provider)
	}

	/// Registers a provider described at runtime, see
	/// [`DynamicProvider`](crate::DynamicProvider).
	pub fn provide_descriptor(
		&mut self,
		descriptor: ProviderDescriptor,
		options: ProviderOptions,
	) -> Result<ProviderId, ExtractionError> {
		self.register(descriptor, options, Role::Provider)
	}

	/// Registers an already built value.
	#[track_caller]
	pub fn supply<T: Send + Sync + 'static>(&mut self, value: T) -> Result<ProviderId, ExtractionError> {
		self.supply_arc(Arc::new(value))
	}

	/// Registers an already shared value; consumers receive this very `Arc`.
	#[track_caller]
	pub fn supply_arc<T: ?Sized + Send + Sync + 'static>(
		&mut self,
		value: Arc<T>,
	) -> Result<ProviderId, ExtractionError> {
		self.provide_with(move || value.clone(), ProviderOptions::default())
	}

	/// Registers a function to run once all roots are built. Invokers run in
	/// registration order and their outputs are discarded.
	#[track_caller]
	pub fn invoke<Args, H: Handler<Args>>(&mut self, f: H) -> Result<ProviderId, ExtractionError> {
		let descriptor = ProviderDescriptor::from_handler(f, Location::caller())?;
		self.register(descriptor, ProviderOptions::default(), Role::Invoker)
	}

	/// Like [`invoke`](Self::invoke), with inputs resolved inside `module`.
	#[track_caller]
	pub fn invoke_in<Args, H: Handler<Args>>(
		&mut self,
		module: &ModuleKey,
		f: H,
	) -> Result<ProviderId, ExtractionError> {
		let descriptor = ProviderDescriptor::from_handler(f, Location::caller())?;
		self.register(
			descriptor,
			ProviderOptions::new().in_module(module),
			Role::Invoker,
		)
	}

	pub fn bind(&mut self, binding: Binding) -> &mut Self {
		tracing::debug!(
			interface = %binding.interface().short_name(),
			implementation = %binding.implementation().short_name(),
			module = binding.module().map(ModuleKey::name),
			default = binding.is_default(),
			location = %binding.location(),
			"registered binding"
		);
		self.registry.bindings.push(binding);
		self
	}

	/// Called with the container after every successful build.
	pub fn on_success<F>(&mut self, callback: F) -> &mut Self
	where
		F: Fn(&Container) + Send + Sync + 'static,
	{
		self.diagnostics.add_success(Box::new(callback));
		self
	}

	/// Called with the error after every failed build.
	pub fn on_error<F>(&mut self, callback: F) -> &mut Self
	where
		F: Fn(&DiError) + Send + Sync + 'static,
	{
		self.diagnostics.add_error(Box::new(callback));
		self
	}

	/// Resolves `roots` (looked up in the global scope), then runs every
	/// provider they need followed by the invokers.
	///
	/// Structural problems are all reported together and nothing runs. A
	/// provider failure stops the pass; the partially built container is
	/// returned inside the error.
	pub fn build<I>(self, roots: I) -> Result<Container, BuildError>
	where
		I: IntoIterator<Item = TypeKey>,
	{
		let Self {
			registry,
			config,
			diagnostics,
		} = self;
		let roots: Vec<TypeKey> = roots.into_iter().collect();
		tracing::debug!(
			providers = registry.providers.len(),
			bindings = registry.bindings.len(),
			roots = roots.len(),
			"building container"
		);

		let mut builder = GraphBuilder::new(&registry, &config, Graph::default());
		let sources: Vec<Source> = roots
			.iter()
			.map(|key| builder.request(&InputSlot::required(*key), None, ROOT_REQUEST))
			.collect();
		let invokers: Vec<NodeId> = registry
			.invokers()
			.map(|entry| builder.instantiate(entry.id, entry.module.clone()))
			.collect();
		let (graph, mut report) = builder.finish();

		let order = match resolver::execution_order(
			&graph,
			&registry,
			&sources,
			&invokers,
			|_| false,
			config.max_depth,
		) {
			Ok(order) => order,
			Err(problems) => {
				report.extend(problems);
				Vec::new()
			}
		};

		if !report.is_empty() {
			tracing::warn!(problems = report.len(), "dependency graph is invalid");
			let dot = render(&registry, &graph, None, &report.missing_keys()).to_dot();
			diagnostics.failed(&config, &DiError::Report(report.clone()), &dot);
			return Err(BuildError::Invalid(report));
		}

		let mut container = Container::new(registry, config, graph);
		match container.run(&order) {
			Ok(()) => {
				tracing::info!(
					invoked = order.len(),
					roots = roots.len(),
					"container built"
				);
				diagnostics.succeeded(container.config(), &container);
				Ok(container)
			}
			Err(Halt::Failed(error)) => {
				tracing::warn!(
					provider = %error.provider,
					location = %error.location,
					error = %error.source,
					"container build failed"
				);
				diagnostics.failed(
					container.config(),
					&DiError::Invocation(error.clone()),
					&container.to_dot(),
				);
				Err(BuildError::Invocation {
					error,
					partial: Box::new(container),
				})
			}
			Err(Halt::Internal(error)) => {
				tracing::warn!(error = %error, "container build hit an internal error");
				diagnostics.failed(
					container.config(),
					&DiError::Internal(error.clone()),
					&container.to_dot(),
				);
				Err(BuildError::Internal(error))
			}
		}
	}

	fn register(
		&mut self,
		descriptor: ProviderDescriptor,
		options: ProviderOptions,
		role: Role,
	) -> Result<ProviderId, ExtractionError> {
		let node = expand(descriptor)?;
		for key in &options.exports {
			if options.module.is_none() {
				return Err(ExtractionError::ExportWithoutModule {
					key: *key,
					location: node.location,
				});
			}
			if node.output_index(*key).is_none() {
				return Err(ExtractionError::UnknownExport {
					key: *key,
					location: node.location,
				});
			}
		}

		let id = ProviderId(self.registry.providers.len());
		tracing::debug!(
			provider = %node.display_name(),
			location = %node.location,
			module = options.module.as_ref().map(ModuleKey::name),
			inputs = node.inputs.len(),
			outputs = node.outputs.len(),
			invoker = role == Role::Invoker,
			"registered provider"
		);
		self.registry.providers.push(ProviderEntry {
			id,
			node,
			module: options.module,
			exports: options.exports,
			preferred: options.preferred,
			role,
		});
		Ok(id)
	}
}

impl fmt::Debug for Injector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Injector")
			.field("providers", &self.registry.providers.len())
			.field("bindings", &self.registry.bindings.len())
			.field("modules", &self.registry.modules.len())
			.field("config", &self.config)
			.field("diagnostics", &self.diagnostics)
			.finish()
	}
}
