//! Graph identities: type keys, module keys and scopes

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stable identity of a logical dependency type.
///
/// Equality and hashing use only the [`TypeId`]; the type name is kept for
/// diagnostics. Generic types carry their resolved arguments in both.
///
/// # Examples
///
/// ```
/// use wireup_di::TypeKey;
///
/// let key = TypeKey::of::<Vec<u8>>();
/// assert_eq!(key, TypeKey::of::<Vec<u8>>());
/// assert_ne!(key, TypeKey::of::<Vec<u16>>());
/// assert_eq!(key.short_name(), "Vec<u8>");
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
	id: TypeId,
	name: &'static str,
}

impl TypeKey {
	/// Key of `T`. Works for unsized types such as `dyn Trait` and `str`.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	/// Fully qualified type name.
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Type name with every module path stripped (`alloc::sync::Arc<dyn app::Store>`
	/// becomes `Arc<dyn Store>`).
	pub fn short_name(&self) -> String {
		shorten_type_name(self.name)
	}

	/// Whether this key names a trait object, i.e. an interface that bindings can target.
	pub fn is_interface(&self) -> bool {
		self.name.starts_with("dyn ")
	}
}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl PartialOrd for TypeKey {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for TypeKey {
	fn cmp(&self, other: &Self) -> Ordering {
		self.name
			.cmp(other.name)
			.then_with(|| self.id.cmp(&other.id))
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeKey({})", self.name)
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// Strips module paths from every path segment of a type name.
pub(crate) fn shorten_type_name(name: &str) -> String {
	let mut out = String::with_capacity(name.len());
	let mut segment = String::new();
	for ch in name.chars() {
		if ch.is_alphanumeric() || ch == '_' || ch == ':' {
			segment.push(ch);
		} else {
			out.push_str(last_path_segment(&segment));
			segment.clear();
			out.push(ch);
		}
	}
	out.push_str(last_path_segment(&segment));
	out
}

fn last_path_segment(path: &str) -> &str {
	path.rsplit("::").next().unwrap_or(path)
}

/// Token identifying an isolated sub-graph.
///
/// Created by [`Injector::module`](crate::Injector::module); names are unique per
/// injector. A provider can take a `ModuleKey` parameter to learn which module
/// it is being built for.
#[derive(Clone)]
pub struct ModuleKey {
	id: u32,
	name: Arc<str>,
}

impl ModuleKey {
	pub(crate) fn new(id: u32, name: &str) -> Self {
		Self {
			id,
			name: Arc::from(name),
		}
	}

	/// Module name as registered.
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl PartialEq for ModuleKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for ModuleKey {}

impl Hash for ModuleKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl PartialOrd for ModuleKey {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ModuleKey {
	fn cmp(&self, other: &Self) -> Ordering {
		self.name
			.cmp(&other.name)
			.then_with(|| self.id.cmp(&other.id))
	}
}

impl fmt::Debug for ModuleKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ModuleKey({})", self.name)
	}
}

impl fmt::Display for ModuleKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

/// Visibility level a type is looked up in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
	Global,
	Module(ModuleKey),
}

impl Scope {
	pub(crate) fn of(module: Option<&ModuleKey>) -> Self {
		match module {
			Some(key) => Scope::Module(key.clone()),
			None => Scope::Global,
		}
	}
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Scope::Global => f.write_str("global scope"),
			Scope::Module(key) => write!(f, "module `{}`", key),
		}
	}
}

/// A graph node identity: a type as seen from one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphKey {
	pub ty: TypeKey,
	pub scope: Scope,
}

impl GraphKey {
	pub fn new(ty: TypeKey, scope: Scope) -> Self {
		Self { ty, scope }
	}
}

impl fmt::Display for GraphKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} in {}", self.ty, self.scope)
	}
}
