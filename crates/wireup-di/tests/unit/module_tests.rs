//! Modules, exports, module-scoped providers and collections

use rstest::rstest;
use std::sync::{Arc, Mutex};
use wireup_di::{
	BindingError, BuildError, GraphError, Injector, Many, ModuleKey, PerModule, Problem,
	ProviderOptions, Scope, TypeKey, bind,
};

struct Config {
	source: &'static str,
}

struct Token;

struct Secret;
struct Signer;
struct Ledger;

struct Logger {
	module: String,
}

struct AuthService {
	config: Arc<Config>,
	logger: Arc<Logger>,
}

struct BillingService {
	logger: Arc<Logger>,
}

struct Plugin(&'static str);

struct PluginHost {
	names: Vec<&'static str>,
}

struct Route(&'static str);

struct Router {
	routes: Vec<(String, &'static str)>,
}

trait Clock: Send + Sync {
	fn now(&self) -> u64;
}

struct FixedClock;

impl Clock for FixedClock {
	fn now(&self) -> u64 {
		42
	}
}

fn invalid_report(result: Result<wireup_di::Container, BuildError>) -> wireup_di::ErrorReport {
	match result {
		Err(BuildError::Invalid(report)) => report,
		Err(other) => panic!("expected an invalid graph, got {other}"),
		Ok(_) => panic!("expected an invalid graph"),
	}
}

#[rstest]
fn private_outputs_are_invisible_globally() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	injector
		.provide_with(|| Arc::new(Token), ProviderOptions::new().in_module(&auth))
		.unwrap();

	// Act
	let report = invalid_report(injector.build([TypeKey::of::<Token>()]));

	// Assert
	assert!(matches!(
		report.problems(),
		[Problem::Graph(GraphError::NoProvider { scope: Scope::Global, .. })]
	));
}

#[rstest]
fn exported_outputs_are_visible_globally() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	injector
		.provide_with(
			|| Arc::new(Token),
			ProviderOptions::new().in_module(&auth).export::<Token>(),
		)
		.unwrap();

	// Act
	let container = injector.build([TypeKey::of::<Token>()]).unwrap();

	// Assert
	assert!(container.get::<Token>().is_ok());
}

#[rstest]
fn module_provider_shadows_global_one() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	injector
		.provide(|| Arc::new(Config { source: "global" }))
		.unwrap();
	injector
		.provide(|| Arc::new(Logger { module: String::new() }))
		.unwrap();
	injector
		.provide_with(
			|| Arc::new(Config { source: "auth" }),
			ProviderOptions::new().in_module(&auth),
		)
		.unwrap();
	injector
		.provide_with(
			|config: Arc<Config>, logger: Arc<Logger>| Arc::new(AuthService { config, logger }),
			ProviderOptions::new()
				.in_module(&auth)
				.export::<AuthService>(),
		)
		.unwrap();

	// Act
	let container = injector
		.build([TypeKey::of::<AuthService>(), TypeKey::of::<Config>()])
		.unwrap();

	// Assert
	let service = container.get::<AuthService>().unwrap();
	assert_eq!(service.config.source, "auth");
	assert_eq!(container.get::<Config>().unwrap().source, "global");
}

#[rstest]
fn module_lookup_falls_back_to_global_values() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	injector
		.provide(|| Arc::new(Config { source: "global" }))
		.unwrap();
	injector
		.provide(|| Arc::new(Logger { module: String::new() }))
		.unwrap();
	injector
		.provide_with(
			|config: Arc<Config>, logger: Arc<Logger>| Arc::new(AuthService { config, logger }),
			ProviderOptions::new()
				.in_module(&auth)
				.export::<AuthService>(),
		)
		.unwrap();

	// Act
	let container = injector
		.build([TypeKey::of::<AuthService>(), TypeKey::of::<Config>()])
		.unwrap();

	// Assert
	let service = container.get::<AuthService>().unwrap();
	assert!(Arc::ptr_eq(&service.config, &container.get::<Config>().unwrap()));
}

#[rstest]
fn module_scoped_provider_builds_one_instance_per_module() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	let billing = injector.module("billing");
	let logger = injector
		.provide(|module: ModuleKey| {
			Arc::new(Logger {
				module: module.name().to_string(),
			})
		})
		.unwrap();
	injector
		.provide(|| Arc::new(Config { source: "global" }))
		.unwrap();
	injector
		.provide_with(
			|config: Arc<Config>, logger: Arc<Logger>| Arc::new(AuthService { config, logger }),
			ProviderOptions::new()
				.in_module(&auth)
				.export::<AuthService>(),
		)
		.unwrap();
	injector
		.provide_with(
			|logger: Arc<Logger>| Arc::new(BillingService { logger }),
			ProviderOptions::new()
				.in_module(&billing)
				.export::<BillingService>(),
		)
		.unwrap();

	// Act
	let container = injector
		.build([
			TypeKey::of::<AuthService>(),
			TypeKey::of::<BillingService>(),
		])
		.unwrap();

	// Assert
	assert_eq!(container.get::<AuthService>().unwrap().logger.module, "auth");
	assert_eq!(
		container.get::<BillingService>().unwrap().logger.module,
		"billing"
	);
	let logger_runs = container
		.executed_providers()
		.into_iter()
		.filter(|id| *id == logger)
		.count();
	assert_eq!(logger_runs, 2);
}

#[rstest]
fn module_scoped_output_is_unavailable_globally() {
	// Arrange
	let mut injector = Injector::new();
	injector
		.provide(|module: ModuleKey| {
			Arc::new(Logger {
				module: module.name().to_string(),
			})
		})
		.unwrap();

	// Act
	let report = invalid_report(injector.build([TypeKey::of::<Logger>()]));

	// Assert
	assert!(matches!(
		report.problems(),
		[Problem::Graph(GraphError::ModuleScopedOutsideModule { .. })]
	));
}

#[rstest]
fn module_key_outside_a_module_is_reported() {
	// Arrange
	let mut injector = Injector::new();
	injector.invoke(|_module: ModuleKey| ()).unwrap();

	// Act
	let report = invalid_report(injector.build(std::iter::empty()));

	// Assert
	assert!(matches!(
		report.problems(),
		[Problem::Graph(GraphError::ModuleKeyUnavailable { .. })]
	));
}

#[rstest]
fn module_binding_applies_only_inside_its_module() {
	// Arrange
	let seen = Arc::new(Mutex::new(Vec::new()));
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	injector.provide(|| Arc::new(FixedClock)).unwrap();
	injector.bind(bind!(dyn Clock => FixedClock).in_module(&auth));
	let sink = seen.clone();
	injector
		.invoke_in(&auth, move |clock: Arc<dyn Clock>| {
			sink.lock().unwrap().push(clock.now())
		})
		.unwrap();

	// Act
	injector.build(std::iter::empty()).unwrap();

	// Assert
	assert_eq!(*seen.lock().unwrap(), vec![42]);
}

#[rstest]
fn module_binding_is_not_visible_globally() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	injector.provide(|| Arc::new(FixedClock)).unwrap();
	injector.bind(bind!(dyn Clock => FixedClock).in_module(&auth));

	// Act
	let report = invalid_report(injector.build([TypeKey::of::<dyn Clock>()]));

	// Assert
	assert!(matches!(
		report.problems(),
		[Problem::Binding(BindingError::Unbound { scope: Scope::Global, .. })]
	));
}

#[rstest]
fn invoker_in_module_sees_module_values() {
	// Arrange
	let seen = Arc::new(Mutex::new(Vec::new()));
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	injector
		.provide(|| Arc::new(Config { source: "global" }))
		.unwrap();
	injector
		.provide_with(
			|| Arc::new(Config { source: "auth" }),
			ProviderOptions::new().in_module(&auth),
		)
		.unwrap();
	let global_sink = seen.clone();
	let module_sink = seen.clone();
	injector
		.invoke(move |config: Arc<Config>| global_sink.lock().unwrap().push(config.source))
		.unwrap();
	injector
		.invoke_in(&auth, move |config: Arc<Config>| {
			module_sink.lock().unwrap().push(config.source)
		})
		.unwrap();

	// Act
	injector.build(std::iter::empty()).unwrap();

	// Assert
	assert_eq!(*seen.lock().unwrap(), vec!["global", "auth"]);
}

#[rstest]
fn many_collects_every_producer_in_registration_order() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	injector.provide(|| Arc::new(Plugin("core"))).unwrap();
	injector
		.provide_with(
			|| Arc::new(Plugin("auth")),
			ProviderOptions::new().in_module(&auth),
		)
		.unwrap();
	injector.provide(|| Arc::new(Plugin("extra"))).unwrap();
	injector
		.provide(|plugins: Many<Plugin>| {
			Arc::new(PluginHost {
				names: plugins.iter().map(|plugin| plugin.0).collect(),
			})
		})
		.unwrap();

	// Act
	let container = injector.build([TypeKey::of::<PluginHost>()]).unwrap();

	// Assert
	assert_eq!(
		container.get::<PluginHost>().unwrap().names,
		vec!["core", "auth", "extra"]
	);
}

#[rstest]
fn many_without_producers_is_empty() {
	// Arrange
	let mut injector = Injector::new();
	injector
		.provide(|plugins: Many<Plugin>| {
			Arc::new(PluginHost {
				names: plugins.iter().map(|plugin| plugin.0).collect(),
			})
		})
		.unwrap();

	// Act
	let container = injector.build([TypeKey::of::<PluginHost>()]).unwrap();

	// Assert
	assert!(container.get::<PluginHost>().unwrap().names.is_empty());
}

#[rstest]
fn per_module_collects_one_value_per_module_by_name() {
	// Arrange
	let mut injector = Injector::new();
	let billing = injector.module("billing");
	let auth = injector.module("auth");
	injector.provide(|| Arc::new(Route("/"))).unwrap();
	injector
		.provide_with(
			|| Arc::new(Route("/pay")),
			ProviderOptions::new().in_module(&billing),
		)
		.unwrap();
	injector
		.provide_with(
			|| Arc::new(Route("/login")),
			ProviderOptions::new().in_module(&auth),
		)
		.unwrap();
	injector
		.provide(|routes: PerModule<Route>| {
			Arc::new(Router {
				routes: routes
					.iter()
					.map(|(module, route)| (module.clone(), route.0))
					.collect(),
			})
		})
		.unwrap();

	// Act
	let container = injector.build([TypeKey::of::<Router>()]).unwrap();

	// Assert
	assert_eq!(
		container.get::<Router>().unwrap().routes,
		vec![
			("auth".to_string(), "/login"),
			("billing".to_string(), "/pay")
		]
	);
}

#[rstest]
fn per_module_rejects_two_producers_in_one_module() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	for path in ["/login", "/logout"] {
		injector
			.provide_with(
				move || Arc::new(Route(path)),
				ProviderOptions::new().in_module(&auth),
			)
			.unwrap();
	}
	injector
		.provide(|routes: PerModule<Route>| {
			Arc::new(Router {
				routes: routes
					.iter()
					.map(|(module, route)| (module.clone(), route.0))
					.collect(),
			})
		})
		.unwrap();

	// Act
	let report = invalid_report(injector.build([TypeKey::of::<Router>()]));

	// Assert
	assert!(matches!(
		report.problems(),
		[Problem::Graph(GraphError::AmbiguousProvider { scope: Scope::Module(_), .. })]
	));
}

#[rstest]
fn per_module_uses_the_preferred_producer_of_a_module() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	injector
		.provide_with(
			|| Arc::new(Route("/login")),
			ProviderOptions::new().in_module(&auth).preferred(),
		)
		.unwrap();
	injector
		.provide_with(|| Arc::new(Route("/logout")), ProviderOptions::new().in_module(&auth))
		.unwrap();
	injector
		.provide(|routes: PerModule<Route>| {
			Arc::new(Router {
				routes: routes
					.iter()
					.map(|(module, route)| (module.clone(), route.0))
					.collect(),
			})
		})
		.unwrap();

	// Act
	let container = injector.build([TypeKey::of::<Router>()]).unwrap();

	// Assert
	assert_eq!(
		container.get::<Router>().unwrap().routes,
		vec![("auth".to_string(), "/login")]
	);
}

#[rstest]
fn type_missing_everywhere_is_reported_once_for_all_modules() {
	// Arrange
	let mut injector = Injector::new();
	let auth = injector.module("auth");
	let billing = injector.module("billing");
	injector
		.provide_with(
			|_secret: Arc<Secret>| Arc::new(Signer),
			ProviderOptions::new().in_module(&auth).export::<Signer>(),
		)
		.unwrap();
	injector
		.provide_with(
			|_secret: Arc<Secret>| Arc::new(Ledger),
			ProviderOptions::new().in_module(&billing).export::<Ledger>(),
		)
		.unwrap();

	// Act
	let result = injector.build([TypeKey::of::<Signer>(), TypeKey::of::<Ledger>()]);

	// Assert
	let Err(BuildError::Invalid(report)) = result else {
		panic!("expected a missing provider");
	};
	let [Problem::Graph(GraphError::NoProvider { key, scope, required_by })] = report.problems() else {
		panic!("expected exactly one problem, got {report}");
	};
	assert_eq!(*key, TypeKey::of::<Secret>());
	assert_eq!(*scope, Scope::Global);
	assert_eq!(required_by.len(), 2);
}
