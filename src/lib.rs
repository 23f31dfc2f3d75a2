//! # wireup
//!
//! Dependency injection where providers are plain functions.
//!
//! A provider's parameters are what it needs and its return type is what it
//! produces. [`Injector`] collects providers, interface bindings and
//! invokers; [`Injector::build`] validates the whole graph at once and then
//! runs each needed provider exactly once, in a deterministic order.
//!
//! ## Feature Flags
//!
//! - `macros` (default) - `#[derive(In)]` and `#[derive(Out)]` for structs that
//!   stand for several inputs or outputs at once
//!
//! ## Example
//!
//! ```
//! use wireup::{In, Injector, TypeKey};
//! use std::sync::Arc;
//!
//! struct Config {
//!     port: u16,
//! }
//!
//! struct Metrics;
//!
//! struct Server {
//!     port: u16,
//!     instrumented: bool,
//! }
//!
//! #[derive(In)]
//! struct ServerParams {
//!     config: Arc<Config>,
//!     metrics: Option<Arc<Metrics>>,
//! }
//!
//! let mut injector = Injector::new();
//! injector.supply(Config { port: 8080 }).unwrap();
//! injector
//!     .provide(|p: ServerParams| {
//!         Arc::new(Server {
//!             port: p.config.port,
//!             instrumented: p.metrics.is_some(),
//!         })
//!     })
//!     .unwrap();
//!
//! let container = injector.build([TypeKey::of::<Server>()]).unwrap();
//! let server = container.get::<Server>().unwrap();
//! assert_eq!(server.port, 8080);
//! assert!(!server.instrumented);
//! ```

pub use wireup_di::*;

#[cfg(feature = "macros")]
pub use wireup_macros::{In, Out};
