//! Injector configuration
//!
//! Settings can come from TOML (inline or from a file) and be overlaid with
//! `WIREUP_`-prefixed environment variables.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for every environment variable read by [`InjectorConfig::from_env`].
pub const ENV_PREFIX: &str = "WIREUP_";

/// Default for [`InjectorConfig::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Behaviour knobs for an [`Injector`](crate::Injector).
///
/// # Examples
///
/// ```
/// use wireup_di::InjectorConfig;
///
/// let config = InjectorConfig::from_toml_str("dump_on_error = true").unwrap();
/// assert!(config.dump_on_error);
/// assert!(config.log_resolution);
/// assert_eq!(config.max_depth, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorConfig {
	/// Emit a `trace!` event for every resolution decision.
	pub log_resolution: bool,
	/// Directory that graph and report dumps are written to.
	pub graphviz_dir: Option<PathBuf>,
	/// Write the DOT graph and the error report when a build fails.
	pub dump_on_error: bool,
	/// Write the DOT graph after a successful build.
	pub dump_on_success: bool,
	/// Longest dependency chain a build accepts, counted in providers from a
	/// root (or invoker) down to its deepest producer, and the longest binding
	/// chain followed for one interface.
	///
	/// This bounds valid acyclic graphs too: a chain of more than `max_depth`
	/// providers fails with
	/// [`GraphError::MaxDepthExceeded`](crate::GraphError::MaxDepthExceeded)
	/// even though it has no cycle. Raise it for unusually deep graphs.
	pub max_depth: usize,
}

impl Default for InjectorConfig {
	fn default() -> Self {
		Self {
			log_resolution: true,
			graphviz_dir: None,
			dump_on_error: false,
			dump_on_success: false,
			max_depth: DEFAULT_MAX_DEPTH,
		}
	}
}

impl InjectorConfig {
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.display().to_string(),
			source,
		})?;
		Self::from_toml_str(&source)
	}

	/// Defaults overlaid with the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::default().overlay_env()
	}

	/// Overlays `WIREUP_*` variables from the process environment.
	pub fn overlay_env(self) -> Result<Self, ConfigError> {
		self.overlay_with(|name| std::env::var(name).ok())
	}

	/// Overlays variables looked up through `lookup`, which receives full
	/// (prefixed) variable names.
	pub fn overlay_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |key: &str| {
			let name = format!("{}{}", ENV_PREFIX, key);
			lookup(&name).map(|value| (name, value))
		};

		if let Some((name, value)) = read("LOG_RESOLUTION") {
			self.log_resolution = parse_bool(&name, &value)?;
		}
		if let Some((_, value)) = read("GRAPHVIZ_DIR") {
			self.graphviz_dir = if value.trim().is_empty() {
				None
			} else {
				Some(PathBuf::from(value))
			};
		}
		if let Some((name, value)) = read("DUMP_ON_ERROR") {
			self.dump_on_error = parse_bool(&name, &value)?;
		}
		if let Some((name, value)) = read("DUMP_ON_SUCCESS") {
			self.dump_on_success = parse_bool(&name, &value)?;
		}
		if let Some((name, value)) = read("MAX_DEPTH") {
			self.max_depth = value
				.trim()
				.parse::<usize>()
				.ok()
				.filter(|depth| *depth > 0)
				.ok_or(ConfigError::InvalidEnv { name, value })?;
		}
		Ok(self)
	}

	pub fn with_graphviz_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.graphviz_dir = Some(dir.into());
		self
	}

	pub fn with_max_depth(mut self, depth: usize) -> Self {
		self.max_depth = depth;
		self
	}
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
	match value.trim().to_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Ok(true),
		"false" | "0" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::InvalidEnv {
			name: name.to_string(),
			value: value.to_string(),
		}),
	}
}
