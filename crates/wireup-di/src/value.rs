//! Type-erased values flowing between providers

use crate::error::InternalInvariantError;
use crate::key::{ModuleKey, TypeKey};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A produced value with its concrete type erased.
///
/// Wraps an `Arc<T>`; cloning a `Value` clones the inner `Arc`, so every
/// consumer of a type observes the same allocation.
///
/// # Examples
///
/// ```
/// use wireup_di::Value;
/// use std::sync::Arc;
///
/// let value = Value::new(Arc::new(42u32));
/// let back: Arc<u32> = value.downcast::<u32>().unwrap();
/// assert_eq!(*back, 42);
/// assert!(value.downcast::<i64>().is_none());
/// ```
#[derive(Clone)]
pub struct Value {
	inner: Arc<dyn Any + Send + Sync>,
	key: TypeKey,
}

impl Value {
	pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
		Self {
			inner: Arc::new(value),
			key: TypeKey::of::<T>(),
		}
	}

	/// Recovers the shared `Arc<T>`, or `None` if the value holds another type.
	pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
		self.inner.downcast_ref::<Arc<T>>().cloned()
	}

	/// Key of the type this value was created from.
	pub fn key(&self) -> TypeKey {
		self.key
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Value").field("type", &self.key).finish()
	}
}

/// One resolved input slot as handed to a provider body.
#[derive(Debug, Clone)]
pub enum Arg {
	/// A single value.
	One(Value),
	/// An optional input with no producer.
	Absent,
	/// Every value of a collected type, in registration order.
	Many(Vec<Value>),
	/// One value per module, ordered by module name.
	PerModule(Vec<(ModuleKey, Value)>),
	/// The module the provider is being built for.
	Module(ModuleKey),
}

impl Arg {
	pub(crate) fn kind(&self) -> &'static str {
		match self {
			Arg::One(_) => "a single value",
			Arg::Absent => "an absent optional value",
			Arg::Many(_) => "a collection",
			Arg::PerModule(_) => "a per-module map",
			Arg::Module(_) => "a module key",
		}
	}
}

/// Sequential reader over a provider's flattened arguments.
///
/// Aggregate inputs consume one argument per field, in declaration order.
pub struct ArgCursor {
	args: std::vec::IntoIter<Arg>,
	provider: &'static str,
}

impl ArgCursor {
	pub fn new(args: Vec<Arg>, provider: &'static str) -> Self {
		Self {
			args: args.into_iter(),
			provider,
		}
	}

	/// Next argument; running out is an ordering defect, not a user error.
	pub fn next_arg(&mut self) -> Result<Arg, InternalInvariantError> {
		self.args
			.next()
			.ok_or_else(|| InternalInvariantError::ArgumentUnderflow {
				provider: self.provider.to_string(),
			})
	}

	/// Next argument, which must be a single value of type `T`.
	pub fn next_one<T: ?Sized + Send + Sync + 'static>(
		&mut self,
	) -> Result<Arc<T>, InternalInvariantError> {
		match self.next_arg()? {
			Arg::One(value) => downcast_value(&value),
			other => Err(self.unexpected::<T>(&other)),
		}
	}

	pub(crate) fn unexpected<T: ?Sized + 'static>(&self, found: &Arg) -> InternalInvariantError {
		InternalInvariantError::UnexpectedArgument {
			provider: self.provider.to_string(),
			expected: TypeKey::of::<T>(),
			found: found.kind(),
		}
	}

	pub fn provider(&self) -> &'static str {
		self.provider
	}
}

pub(crate) fn downcast_value<T: ?Sized + Send + Sync + 'static>(
	value: &Value,
) -> Result<Arc<T>, InternalInvariantError> {
	value
		.downcast::<T>()
		.ok_or_else(|| InternalInvariantError::TypeMismatch {
			expected: TypeKey::of::<T>(),
			found: value.key(),
		})
}
