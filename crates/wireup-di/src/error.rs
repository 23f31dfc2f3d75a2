//! Error taxonomy
//!
//! Structural problems (extraction, bindings, graph, cycles) are found before
//! any provider runs and are reported together in an [`ErrorReport`].
//! Invocation failures are detected at the first failing provider.

use crate::container::Container;
use crate::key::{Scope, TypeKey};
use crate::location::Location;
use std::fmt;
use std::sync::Arc;

/// Error type a provider body may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type DiResult<T> = Result<T, DiError>;

/// A provider could not be turned into a graph node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
	#[error("provider descriptor declared at {location} has no callable body")]
	NotAFunction { location: Location },

	#[error("variadic input `{key}` can't be used in a provider: {location}")]
	VariadicUnsupported { key: TypeKey, location: Location },

	#[error("output error parameter is not the last output of provider `{provider}` at {location}")]
	MisplacedErrorOutput {
		provider: String,
		location: Location,
	},

	#[error(
		"field `{field}` of aggregate `{aggregate}` is itself an aggregate; aggregates can't be nested ({location})"
	)]
	NestedAggregate {
		aggregate: TypeKey,
		field: &'static str,
		location: Location,
	},

	#[error("provider at {location} declares output `{key}` more than once")]
	DuplicateOutput { key: TypeKey, location: Location },

	#[error("provider at {location} exports `{key}`, which is not one of its outputs")]
	UnknownExport { key: TypeKey, location: Location },

	#[error("provider at {location} exports `{key}` but is not registered in a module")]
	ExportWithoutModule { key: TypeKey, location: Location },
}

/// Interface bindings could not select an implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
	#[error(
		"ambiguous binding for interface `{interface}` in {scope}; declare exactly one default. Candidates:\n{}",
		format_candidates(.candidates)
	)]
	Ambiguous {
		interface: TypeKey,
		scope: Scope,
		candidates: Vec<String>,
	},

	#[error(
		"no implementation bound for interface `{interface}` in {scope}, required by:\n{}",
		format_candidates(.required_by)
	)]
	Unbound {
		interface: TypeKey,
		scope: Scope,
		required_by: Vec<String>,
	},
}

/// Missing or ambiguous producers and other graph-shape problems.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
	#[error("no provider for `{key}` in {scope}, required by:\n{}", format_candidates(.required_by))]
	NoProvider {
		key: TypeKey,
		scope: Scope,
		required_by: Vec<String>,
	},

	#[error(
		"multiple providers for `{key}` in {scope}; mark exactly one as preferred. Candidates:\n{}",
		format_candidates(.candidates)
	)]
	AmbiguousProvider {
		key: TypeKey,
		scope: Scope,
		candidates: Vec<String>,
	},

	#[error(
		"`{key}` is produced by a module-scoped provider at {location} but was requested outside of any module by {required_by}"
	)]
	ModuleScopedOutsideModule {
		key: TypeKey,
		location: Location,
		required_by: String,
	},

	#[error("a module key was requested outside of any module by {required_by}")]
	ModuleKeyUnavailable { required_by: String },

	#[error("maximum resolution depth {depth} exceeded while resolving `{key}`")]
	MaxDepthExceeded { key: TypeKey, depth: usize },
}

/// A dependency cycle, with the full path of types forming it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
	"circular dependency detected: {}\n  providers: {}",
	cycle_path_display(.path),
	format_locations(.locations)
)]
pub struct CycleError {
	/// Types on the cycle, rotated to start at the earliest registered provider.
	/// Interfaces crossed through bindings appear between the provider outputs.
	pub path: Vec<TypeKey>,
	/// Registration sites of the providers and bindings on the cycle, aligned
	/// with `path`.
	pub locations: Vec<Location>,
}

impl CycleError {
	/// `A -> B -> C -> A` rendering of the cycle.
	pub fn path_display(&self) -> String {
		cycle_path_display(&self.path)
	}
}

/// A provider's own declared failure, wrapped with where it happened.
///
/// Cloning shares the underlying error, so every dependent that observes the
/// failure reports the same error instance.
#[derive(Debug, Clone, thiserror::Error)]
#[error("provider `{provider}` at {location} failed: {source}")]
pub struct InvocationError {
	pub provider: String,
	pub location: Location,
	/// Outputs that could not be produced.
	pub outputs: Vec<TypeKey>,
	#[source]
	pub source: Arc<dyn std::error::Error + Send + Sync + 'static>,
}

impl InvocationError {
	/// Whether `other` wraps the very same provider error.
	pub fn same_failure(&self, other: &InvocationError) -> bool {
		Arc::ptr_eq(&self.source, &other.source)
	}
}

/// Violations of the resolver's ordering guarantees. Seeing one of these is a
/// defect, not a usage error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalInvariantError {
	#[error("internal error: value for `{key}` was not available when `{provider}` ran")]
	MissingValue { key: TypeKey, provider: String },

	#[error("internal error: expected a value of `{expected}`, found `{found}`")]
	TypeMismatch { expected: TypeKey, found: TypeKey },

	#[error("internal error: `{provider}` received fewer arguments than it declares")]
	ArgumentUnderflow { provider: String },

	#[error("internal error: `{provider}` expected `{expected}` but received {found}")]
	UnexpectedArgument {
		provider: String,
		expected: TypeKey,
		found: &'static str,
	},

	#[error("internal error: `{provider}` returned {actual} values but declares {expected}")]
	OutputCountMismatch {
		provider: String,
		expected: usize,
		actual: usize,
	},

	#[error("internal error: `{provider}` was invoked twice")]
	DuplicateInvocation { provider: String },
}

/// One structural problem found while building the graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Problem {
	#[error(transparent)]
	Graph(#[from] GraphError),
	#[error(transparent)]
	Binding(#[from] BindingError),
	#[error(transparent)]
	Cycle(#[from] CycleError),
}

/// Every structural problem found in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
	problems: Vec<Problem>,
}

impl ErrorReport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, problem: impl Into<Problem>) {
		self.problems.push(problem.into());
	}

	pub fn problems(&self) -> &[Problem] {
		&self.problems
	}

	pub(crate) fn problems_mut(&mut self) -> &mut Vec<Problem> {
		&mut self.problems
	}

	pub fn is_empty(&self) -> bool {
		self.problems.is_empty()
	}

	pub fn len(&self) -> usize {
		self.problems.len()
	}

	/// Keys named by `NoProvider`/`Unbound` problems, in report order.
	pub fn missing_keys(&self) -> Vec<TypeKey> {
		self.problems
			.iter()
			.filter_map(|p| match p {
				Problem::Graph(GraphError::NoProvider { key, .. }) => Some(*key),
				Problem::Binding(BindingError::Unbound { interface, .. }) => Some(*interface),
				_ => None,
			})
			.collect()
	}

	/// Cycles in the report.
	pub fn cycles(&self) -> Vec<&CycleError> {
		self.problems
			.iter()
			.filter_map(|p| match p {
				Problem::Cycle(cycle) => Some(cycle),
				_ => None,
			})
			.collect()
	}

	/// A lone problem as its own [`DiError`] variant; anything else stays a
	/// [`DiError::Report`].
	pub fn into_error(mut self) -> DiError {
		if self.problems.len() != 1 {
			return DiError::Report(self);
		}
		match self.problems.pop() {
			Some(Problem::Graph(err)) => DiError::Graph(err),
			Some(Problem::Binding(err)) => DiError::Binding(err),
			Some(Problem::Cycle(err)) => DiError::Cycle(err),
			None => DiError::Report(self),
		}
	}
}

impl fmt::Display for ErrorReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{} problem(s) found:", self.problems.len())?;
		for (index, problem) in self.problems.iter().enumerate() {
			let text = problem.to_string().replace('\n', "\n   ");
			writeln!(f, "{:>2}. {}", index + 1, text)?;
		}
		Ok(())
	}
}

impl std::error::Error for ErrorReport {}

impl Extend<Problem> for ErrorReport {
	fn extend<I: IntoIterator<Item = Problem>>(&mut self, iter: I) {
		self.problems.extend(iter);
	}
}

impl FromIterator<Problem> for ErrorReport {
	fn from_iter<I: IntoIterator<Item = Problem>>(iter: I) -> Self {
		Self {
			problems: iter.into_iter().collect(),
		}
	}
}

/// Problems loading [`InjectorConfig`](crate::InjectorConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("invalid value `{value}` for environment variable {name}")]
	InvalidEnv { name: String, value: String },
}

/// Crate-wide error.
#[derive(Debug, thiserror::Error)]
pub enum DiError {
	#[error(transparent)]
	Extraction(#[from] ExtractionError),

	#[error(transparent)]
	Binding(#[from] BindingError),

	#[error(transparent)]
	Graph(#[from] GraphError),

	#[error(transparent)]
	Cycle(#[from] CycleError),

	#[error(transparent)]
	Invocation(#[from] InvocationError),

	#[error(transparent)]
	Internal(#[from] InternalInvariantError),

	#[error(transparent)]
	Report(#[from] ErrorReport),

	#[error("`{key}` has not been resolved by this container; use `Container::resolve`")]
	Unresolved { key: TypeKey },

	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Failure of [`Injector::build`](crate::Injector::build).
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
	/// The graph is invalid; no provider was invoked.
	#[error("dependency graph is invalid: {0}")]
	Invalid(ErrorReport),

	/// A provider failed. `partial` keeps every value built before the failure
	/// readable for diagnostics.
	#[error("{error}")]
	Invocation {
		error: InvocationError,
		partial: Box<Container>,
	},

	/// An ordering defect surfaced while executing.
	#[error(transparent)]
	Internal(InternalInvariantError),
}

impl BuildError {
	pub fn report(&self) -> Option<&ErrorReport> {
		match self {
			BuildError::Invalid(report) => Some(report),
			_ => None,
		}
	}
}

impl From<BuildError> for DiError {
	fn from(err: BuildError) -> Self {
		match err {
			BuildError::Invalid(report) => DiError::Report(report),
			BuildError::Invocation { error, .. } => DiError::Invocation(error),
			BuildError::Internal(err) => DiError::Internal(err),
		}
	}
}

fn format_candidates(items: &[String]) -> String {
	items
		.iter()
		.map(|item| format!("    {}", item))
		.collect::<Vec<_>>()
		.join("\n")
}

fn cycle_path_display(path: &[TypeKey]) -> String {
	let mut names: Vec<String> = path.iter().map(TypeKey::short_name).collect();
	if let Some(first) = names.first().cloned() {
		names.push(first);
	}
	names.join(" -> ")
}

fn format_locations(locations: &[Location]) -> String {
	locations
		.iter()
		.map(Location::to_string)
		.collect::<Vec<_>>()
		.join(", ")
}
