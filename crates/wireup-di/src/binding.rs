//! Interface bindings
//!
//! A binding says "requests for interface `I` may be satisfied by the value
//! produced for implementation `C`". The cast from `Arc<C>` to `Arc<I>` is
//! captured when the binding is created, so no reflection is needed later.

use crate::key::{ModuleKey, TypeKey};
use crate::location::Location;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

pub(crate) type CastFn = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Maps an interface type onto an implementation type.
///
/// Usually created with the [`bind!`](crate::bind) macro.
#[derive(Clone)]
pub struct Binding {
	pub(crate) interface: TypeKey,
	pub(crate) implementation: TypeKey,
	pub(crate) module: Option<ModuleKey>,
	pub(crate) is_default: bool,
	pub(crate) location: Location,
	pub(crate) cast: CastFn,
}

impl Binding {
	/// Creates a binding from `C` to interface `I` using `cast`.
	#[track_caller]
	pub fn new<I, C>(cast: fn(Arc<C>) -> Arc<I>) -> Self
	where
		I: ?Sized + Send + Sync + 'static,
		C: ?Sized + Send + Sync + 'static,
	{
		Self {
			interface: TypeKey::of::<I>(),
			implementation: TypeKey::of::<C>(),
			module: None,
			is_default: false,
			location: Location::caller(),
			cast: Arc::new(move |value: &Value| value.downcast::<C>().map(|c| Value::new(cast(c)))),
		}
	}

	/// Marks this binding as the one to use when several match.
	pub fn as_default(mut self) -> Self {
		self.is_default = true;
		self
	}

	/// Restricts the binding to lookups made inside `module`.
	pub fn in_module(mut self, module: &ModuleKey) -> Self {
		self.module = Some(module.clone());
		self
	}

	pub fn interface(&self) -> TypeKey {
		self.interface
	}

	pub fn implementation(&self) -> TypeKey {
		self.implementation
	}

	pub fn module(&self) -> Option<&ModuleKey> {
		self.module.as_ref()
	}

	pub fn is_default(&self) -> bool {
		self.is_default
	}

	pub fn location(&self) -> Location {
		self.location
	}

	/// Description used in ambiguity reports.
	pub(crate) fn describe(&self) -> String {
		let mut text = format!(
			"binding {} => {} at {}",
			self.interface.short_name(),
			self.implementation.short_name(),
			self.location
		);
		if self.is_default {
			text.push_str(" (default)");
		}
		text
	}
}

impl fmt::Debug for Binding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Binding")
			.field("interface", &self.interface)
			.field("implementation", &self.implementation)
			.field("module", &self.module)
			.field("is_default", &self.is_default)
			.field("location", &self.location)
			.finish_non_exhaustive()
	}
}

/// Binds an interface to an implementation type.
///
/// # Examples
///
/// ```
/// use wireup_di::{bind, Binding};
///
/// trait Store: Send + Sync {}
/// struct Memory;
/// impl Store for Memory {}
///
/// let binding: Binding = bind!(dyn Store => Memory).as_default();
/// assert!(binding.is_default());
/// ```
#[macro_export]
macro_rules! bind {
	($iface:ty => $impl:ty) => {
		$crate::Binding::new::<$iface, $impl>(
			|value: ::std::sync::Arc<$impl>| -> ::std::sync::Arc<$iface> { value },
		)
	};
}
