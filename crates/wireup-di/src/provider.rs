//! Registered providers and bindings

use crate::aggregate::ProviderNode;
use crate::binding::Binding;
use crate::descriptor::SlotKind;
use crate::key::{ModuleKey, TypeKey};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque handle returned by provider registration.
///
/// Ids follow registration order, which is also the order used to break
/// ties in diagnostics and cycle reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(pub(crate) usize);

impl ProviderId {
	pub fn index(&self) -> usize {
		self.0
	}
}

impl fmt::Display for ProviderId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Optional metadata for [`Injector::provide_with`](crate::Injector::provide_with).
///
/// # Examples
///
/// ```
/// use wireup_di::{Injector, ProviderOptions};
/// use std::sync::Arc;
///
/// struct Token(&'static str);
///
/// let mut injector = Injector::new();
/// let auth = injector.module("auth");
/// injector
///     .provide_with(
///         || Arc::new(Token("secret")),
///         ProviderOptions::new().in_module(&auth).export::<Token>(),
///     )
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
	pub(crate) preferred: bool,
	pub(crate) module: Option<ModuleKey>,
	pub(crate) exports: Vec<TypeKey>,
}

impl ProviderOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Select this provider when several produce the same type in a scope.
	pub fn preferred(mut self) -> Self {
		self.preferred = true;
		self
	}

	pub fn in_module(mut self, module: &ModuleKey) -> Self {
		self.module = Some(module.clone());
		self
	}

	/// Make output `T` of a module provider visible to the global scope.
	pub fn export<T: ?Sized + 'static>(mut self) -> Self {
		self.exports.push(TypeKey::of::<T>());
		self
	}
}

/// What a registered callable is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
	Provider,
	/// Runs after the roots; outputs are discarded.
	Invoker,
}

#[derive(Debug, Clone)]
pub(crate) struct ProviderEntry {
	pub(crate) id: ProviderId,
	pub(crate) node: ProviderNode,
	pub(crate) module: Option<ModuleKey>,
	pub(crate) exports: Vec<TypeKey>,
	pub(crate) preferred: bool,
	pub(crate) role: Role,
}

impl ProviderEntry {
	/// A global provider that takes its `ModuleKey`: instantiated once per
	/// requesting module instead of once overall.
	pub(crate) fn is_module_scoped(&self) -> bool {
		self.role == Role::Provider
			&& self.module.is_none()
			&& self
				.node
				.inputs
				.iter()
				.any(|slot| slot.kind == SlotKind::ModuleKey)
	}

	pub(crate) fn produces(&self, key: TypeKey) -> bool {
		self.role == Role::Provider && self.node.output_index(key).is_some()
	}

	pub(crate) fn exports(&self, key: TypeKey) -> bool {
		self.exports.contains(&key)
	}

	/// `provider `name` at file:line:col`, plus the module when registered in one.
	pub(crate) fn describe(&self) -> String {
		let mut text = format!(
			"provider `{}` at {}",
			self.node.display_name(),
			self.node.location
		);
		if let Some(module) = &self.module {
			text.push_str(&format!(" in module `{}`", module));
		}
		if self.preferred {
			text.push_str(" (preferred)");
		}
		text
	}
}

/// Everything registered with an injector.
#[derive(Debug, Clone, Default)]
pub(crate) struct Registry {
	pub(crate) providers: Vec<ProviderEntry>,
	pub(crate) bindings: Vec<Binding>,
	pub(crate) modules: BTreeMap<String, ModuleKey>,
}

impl Registry {
	pub(crate) fn entry(&self, id: ProviderId) -> &ProviderEntry {
		&self.providers[id.0]
	}

	pub(crate) fn invokers(&self) -> impl Iterator<Item = &ProviderEntry> {
		self.providers
			.iter()
			.filter(|entry| entry.role == Role::Invoker)
	}

	/// Modules in name order.
	pub(crate) fn modules(&self) -> impl Iterator<Item = &ModuleKey> {
		self.modules.values()
	}
}
