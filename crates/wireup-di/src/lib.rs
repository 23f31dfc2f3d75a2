//! # wireup-di
//!
//! Reflection-free dependency injection container.
//!
//! Providers are plain functions. Their parameter types are what they need
//! and their return types are what they produce. The container works out the
//! dependency graph from those signatures, validates it as a whole, and then
//! calls every provider at most once in a deterministic order.
//!
//! ## Features
//!
//! - **Singletons**: every type is built once and shared as the same `Arc`
//! - **Whole-graph validation**: missing providers, ambiguity and cycles are
//!   reported together before anything runs
//! - **Interfaces**: `dyn Trait` keys satisfied through [`Binding`]s
//! - **Modules**: private providers, explicit exports and per-module instances
//! - **Aggregates**: `#[derive(In)]` / `#[derive(Out)]` structs (via the
//!   `wireup` facade) stand for many inputs or outputs at once
//! - **Diagnostics**: Graphviz rendering of the resolved graph, optional dump
//!   files and build callbacks
//!
//! ## Example
//!
//! ```
//! use wireup_di::{Injector, TypeKey};
//! use std::sync::Arc;
//!
//! struct Settings {
//!     url: String,
//! }
//!
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("empty url")]
//! struct EmptyUrl;
//!
//! fn database(settings: Arc<Settings>) -> Result<Arc<Database>, EmptyUrl> {
//!     if settings.url.is_empty() {
//!         return Err(EmptyUrl);
//!     }
//!     Ok(Arc::new(Database {
//!         url: settings.url.clone(),
//!     }))
//! }
//!
//! let mut injector = Injector::new();
//! injector
//!     .supply(Settings {
//!         url: "postgres://localhost".to_string(),
//!     })
//!     .unwrap();
//! injector.provide(database).unwrap();
//!
//! let container = injector.build([TypeKey::of::<Database>()]).unwrap();
//! assert_eq!(container.get::<Database>().unwrap().url, "postgres://localhost");
//! ```

mod aggregate;
mod binding;
mod collection;
mod config;
mod container;
mod descriptor;
mod diagnostics;
mod error;
mod injector;
mod invoker;
mod key;
mod location;
mod provider;
mod value;

pub(crate) mod graph;
pub(crate) mod resolver;

pub mod visualization;

pub use aggregate::{AggregateSpec, InputAggregate, OutputAggregate, ProviderNode, expand, flatten_params};
pub use binding::Binding;
pub use collection::{Many, PerModule};
pub use config::{DEFAULT_MAX_DEPTH, ENV_PREFIX, InjectorConfig};
pub use container::Container;
pub use descriptor::{
	DynamicProvider, FromGraph, Handler, InputSlot, IntoOutputs, OutputShape, OutputSlot, Param,
	ProviderDescriptor, SlotKind,
};
pub use diagnostics::{GRAPH_FILE, REPORT_FILE};
pub use error::{
	BindingError, BoxError, BuildError, ConfigError, CycleError, DiError, DiResult, ErrorReport,
	ExtractionError, GraphError, InternalInvariantError, InvocationError, Problem,
};
pub use injector::Injector;
pub use key::{GraphKey, ModuleKey, Scope, TypeKey};
pub use location::Location;
pub use provider::{ProviderId, ProviderOptions};
pub use value::{Arg, ArgCursor, Value};
