//! Ambiguous producers and interface bindings

use rstest::rstest;
use std::sync::Arc;
use wireup_di::{
	BindingError, BuildError, GraphError, Injector, Problem, ProviderOptions, TypeKey, bind,
};

trait Store: Send + Sync {
	fn name(&self) -> &'static str;
}

struct MemoryStore;

impl Store for MemoryStore {
	fn name(&self) -> &'static str {
		"memory"
	}
}

struct DiskStore;

impl Store for DiskStore {
	fn name(&self) -> &'static str {
		"disk"
	}
}

struct Config {
	source: &'static str,
}

struct App {
	store: Arc<dyn Store>,
}

fn first_problem(result: Result<wireup_di::Container, BuildError>) -> Problem {
	match result {
		Err(BuildError::Invalid(report)) => report.problems()[0].clone(),
		Err(other) => panic!("expected an invalid graph, got {other}"),
		Ok(_) => panic!("expected an invalid graph"),
	}
}

#[rstest]
fn two_producers_are_ambiguous() {
	// Arrange
	let mut injector = Injector::new();
	injector.provide(|| Arc::new(Config { source: "a" })).unwrap();
	injector.provide(|| Arc::new(Config { source: "b" })).unwrap();

	// Act
	let problem = first_problem(injector.build([TypeKey::of::<Config>()]));

	// Assert
	match problem {
		Problem::Graph(GraphError::AmbiguousProvider { key, candidates, .. }) => {
			assert_eq!(key, TypeKey::of::<Config>());
			assert_eq!(candidates.len(), 2);
		}
		other => panic!("unexpected problem: {other}"),
	}
}

#[rstest]
fn preferred_producer_wins() {
	// Arrange
	let mut injector = Injector::new();
	injector.provide(|| Arc::new(Config { source: "a" })).unwrap();
	injector
		.provide_with(
			|| Arc::new(Config { source: "b" }),
			ProviderOptions::new().preferred(),
		)
		.unwrap();

	// Act
	let container = injector.build([TypeKey::of::<Config>()]).unwrap();

	// Assert
	assert_eq!(container.get::<Config>().unwrap().source, "b");
	assert_eq!(container.executed_providers().len(), 1);
}

#[rstest]
fn two_preferred_producers_are_still_ambiguous() {
	// Arrange
	let mut injector = Injector::new();
	for source in ["a", "b"] {
		injector
			.provide_with(
				move || Arc::new(Config { source }),
				ProviderOptions::new().preferred(),
			)
			.unwrap();
	}

	// Act
	let problem = first_problem(injector.build([TypeKey::of::<Config>()]));

	// Assert
	assert!(matches!(
		problem,
		Problem::Graph(GraphError::AmbiguousProvider { .. })
	));
}

#[rstest]
fn binding_satisfies_interface() {
	// Arrange
	let mut injector = Injector::new();
	injector.provide(|| Arc::new(MemoryStore)).unwrap();
	injector.bind(bind!(dyn Store => MemoryStore));
	injector
		.provide(|store: Arc<dyn Store>| Arc::new(App { store }))
		.unwrap();

	// Act
	let container = injector.build([TypeKey::of::<App>()]).unwrap();

	// Assert
	assert_eq!(container.get::<App>().unwrap().store.name(), "memory");
}

#[rstest]
fn interface_value_shares_the_implementation() {
	// Arrange
	let mut injector = Injector::new();
	injector.provide(|| Arc::new(MemoryStore)).unwrap();
	injector.bind(bind!(dyn Store => MemoryStore));

	// Act
	let container = injector
		.build([TypeKey::of::<dyn Store>(), TypeKey::of::<MemoryStore>()])
		.unwrap();

	// Assert
	let store = container.get::<dyn Store>().unwrap();
	let concrete = container.get::<MemoryStore>().unwrap();
	assert!(std::ptr::addr_eq(Arc::as_ptr(&store), Arc::as_ptr(&concrete)));
	assert!(Arc::ptr_eq(&store, &container.get::<dyn Store>().unwrap()));
}

#[rstest]
fn two_bindings_are_ambiguous() {
	// Arrange
	let mut injector = Injector::new();
	injector.provide(|| Arc::new(MemoryStore)).unwrap();
	injector.provide(|| Arc::new(DiskStore)).unwrap();
	injector
		.bind(bind!(dyn Store => MemoryStore))
		.bind(bind!(dyn Store => DiskStore));

	// Act
	let problem = first_problem(injector.build([TypeKey::of::<dyn Store>()]));

	// Assert
	match problem {
		Problem::Binding(BindingError::Ambiguous {
			interface,
			candidates,
			..
		}) => {
			assert_eq!(interface, TypeKey::of::<dyn Store>());
			assert_eq!(candidates.len(), 2);
		}
		other => panic!("unexpected problem: {other}"),
	}
}

#[rstest]
fn default_binding_wins() {
	// Arrange
	let mut injector = Injector::new();
	injector.provide(|| Arc::new(MemoryStore)).unwrap();
	injector.provide(|| Arc::new(DiskStore)).unwrap();
	injector
		.bind(bind!(dyn Store => MemoryStore))
		.bind(bind!(dyn Store => DiskStore).as_default());

	// Act
	let container = injector.build([TypeKey::of::<dyn Store>()]).unwrap();

	// Assert
	assert_eq!(container.get::<dyn Store>().unwrap().name(), "disk");
	let ran: Vec<usize> = container
		.executed_providers()
		.iter()
		.map(|id| id.index())
		.collect();
	assert_eq!(ran, vec![1]);
}

#[rstest]
fn unbound_interface_is_a_binding_error() {
	// Arrange
	let mut injector = Injector::new();
	injector
		.provide(|store: Arc<dyn Store>| Arc::new(App { store }))
		.unwrap();

	// Act
	let problem = first_problem(injector.build([TypeKey::of::<App>()]));

	// Assert
	assert!(matches!(
		problem,
		Problem::Binding(BindingError::Unbound { interface, .. }) if interface == TypeKey::of::<dyn Store>()
	));
}

#[rstest]
fn binding_to_missing_implementation_is_reported() {
	// Arrange
	let mut injector = Injector::new();
	injector.bind(bind!(dyn Store => DiskStore));

	// Act
	let problem = first_problem(injector.build([TypeKey::of::<dyn Store>()]));

	// Assert
	assert!(matches!(
		problem,
		Problem::Graph(GraphError::NoProvider { key, .. }) if key == TypeKey::of::<DiskStore>()
	));
}

#[rstest]
fn ambiguity_blocks_every_provider() {
	// Arrange
	let mut injector = Injector::new();
	injector.provide(|| Arc::new(MemoryStore)).unwrap();
	injector.provide(|| Arc::new(DiskStore)).unwrap();
	injector
		.bind(bind!(dyn Store => MemoryStore))
		.bind(bind!(dyn Store => DiskStore));
	injector.provide(|| Arc::new(Config { source: "x" })).unwrap();

	// Act
	let result = injector.build([TypeKey::of::<Config>(), TypeKey::of::<dyn Store>()]);

	// Assert
	assert!(matches!(result, Err(BuildError::Invalid(_))));
}
