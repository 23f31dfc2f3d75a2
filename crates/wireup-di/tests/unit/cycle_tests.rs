//! Dependency cycles

use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wireup_di::{BuildError, Injector, Problem, TypeKey, bind};

struct A;
struct B;
struct C;
struct D;

trait Store: Send + Sync {}

struct Memory;
impl Store for Memory {}

struct Cache;

/// A needs B, B needs C, C needs A. Every call bumps `calls`.
fn triangle(injector: &mut Injector, calls: &Arc<AtomicUsize>) {
	let counter = calls.clone();
	injector
		.provide(move |_b: Arc<B>| {
			counter.fetch_add(1, Ordering::SeqCst);
			Arc::new(A)
		})
		.unwrap();
	let counter = calls.clone();
	injector
		.provide(move |_c: Arc<C>| {
			counter.fetch_add(1, Ordering::SeqCst);
			Arc::new(B)
		})
		.unwrap();
	let counter = calls.clone();
	injector
		.provide(move |_a: Arc<A>| {
			counter.fetch_add(1, Ordering::SeqCst);
			Arc::new(C)
		})
		.unwrap();
}

#[rstest]
#[case::from_a(TypeKey::of::<A>())]
#[case::from_b(TypeKey::of::<B>())]
#[case::from_c(TypeKey::of::<C>())]
fn cycle_is_reported_from_the_earliest_provider(#[case] root: TypeKey) {
	// Arrange
	let calls = Arc::new(AtomicUsize::new(0));
	let mut injector = Injector::new();
	triangle(&mut injector, &calls);

	// Act
	let result = injector.build([root]);

	// Assert
	let Err(BuildError::Invalid(report)) = result else {
		panic!("expected a cycle");
	};
	let cycles = report.cycles();
	assert_eq!(cycles.len(), 1);
	assert_eq!(
		cycles[0].path,
		vec![TypeKey::of::<A>(), TypeKey::of::<B>(), TypeKey::of::<C>()]
	);
	assert_eq!(cycles[0].locations.len(), 3);
	assert_eq!(cycles[0].path_display(), "A -> B -> C -> A");
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[rstest]
fn cycle_is_reported_once_for_many_roots() {
	// Arrange
	let calls = Arc::new(AtomicUsize::new(0));
	let mut injector = Injector::new();
	triangle(&mut injector, &calls);

	// Act
	let result = injector.build([
		TypeKey::of::<C>(),
		TypeKey::of::<A>(),
		TypeKey::of::<B>(),
	]);

	// Assert
	let report = result.unwrap_err().report().cloned().unwrap();
	assert_eq!(report.cycles().len(), 1);
}

#[rstest]
fn self_dependency_is_a_cycle() {
	// Arrange
	let mut injector = Injector::new();
	injector
		.provide(|_d: Arc<D>| (Arc::new(D), Arc::new(A)))
		.unwrap();

	// Act
	let result = injector.build([TypeKey::of::<A>()]);

	// Assert
	let report = result.unwrap_err().report().cloned().unwrap();
	assert!(matches!(
		report.problems(),
		[Problem::Cycle(cycle)] if cycle.path == vec![TypeKey::of::<D>()]
	));
}

#[rstest]
fn cycle_and_missing_are_reported_together() {
	// Arrange
	let calls = Arc::new(AtomicUsize::new(0));
	let mut injector = Injector::new();
	triangle(&mut injector, &calls);
	injector.provide(|_missing: Arc<u64>| Arc::new(D)).unwrap();

	// Act
	let result = injector.build([TypeKey::of::<A>(), TypeKey::of::<D>()]);

	// Assert
	let report = result.unwrap_err().report().cloned().unwrap();
	assert_eq!(report.cycles().len(), 1);
	assert_eq!(report.missing_keys(), vec![TypeKey::of::<u64>()]);
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[rstest]
fn cycle_through_binding_names_the_interface() {
	// Arrange
	let mut injector = Injector::new();
	injector.provide(|_store: Arc<dyn Store>| Arc::new(Memory)).unwrap();
	injector.bind(bind!(dyn Store => Memory));

	// Act
	let result = injector.build([TypeKey::of::<dyn Store>()]);

	// Assert
	let report = result.unwrap_err().report().cloned().unwrap();
	let cycles = report.cycles();
	assert_eq!(cycles.len(), 1);
	assert_eq!(
		cycles[0].path,
		vec![TypeKey::of::<Memory>(), TypeKey::of::<dyn Store>()]
	);
	assert_eq!(cycles[0].locations.len(), 2);
	assert_eq!(cycles[0].path_display(), "Memory -> dyn Store -> Memory");
}

#[rstest]
fn binding_cycle_starts_at_the_earliest_provider() {
	// Arrange
	let mut injector = Injector::new();
	injector.provide(|_store: Arc<dyn Store>| Arc::new(Cache)).unwrap();
	injector.provide(|_cache: Arc<Cache>| Arc::new(Memory)).unwrap();
	injector.bind(bind!(dyn Store => Memory));

	// Act
	let result = injector.build([TypeKey::of::<Memory>()]);

	// Assert
	let report = result.unwrap_err().report().cloned().unwrap();
	let cycles = report.cycles();
	assert_eq!(cycles.len(), 1);
	assert_eq!(
		cycles[0].path,
		vec![
			TypeKey::of::<Cache>(),
			TypeKey::of::<dyn Store>(),
			TypeKey::of::<Memory>(),
		]
	);
	assert_eq!(cycles[0].path_display(), "Cache -> dyn Store -> Memory -> Cache");
}
