//! Collection inputs
//!
//! [`Many<T>`] gathers every producer of `T` and is never ambiguous.
//! [`PerModule<T>`] gathers one producer of `T` per module; two producers in
//! the same module are ambiguous unless exactly one is preferred.

use crate::descriptor::{FromGraph, InputSlot, Param, SlotKind};
use crate::error::InternalInvariantError;
use crate::key::{ModuleKey, TypeKey};
use crate::value::{downcast_value, Arg, ArgCursor};
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

/// Every value of `T` produced anywhere in the graph, in provider
/// registration order.
///
/// Module-scoped providers do not contribute: they have no single instance to
/// collect.
#[derive(Debug)]
pub struct Many<T: ?Sized>(Vec<Arc<T>>);

impl<T: ?Sized> Many<T> {
	pub fn into_inner(self) -> Vec<Arc<T>> {
		self.0
	}
}

impl<T: ?Sized> Clone for Many<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T: ?Sized> Deref for Many<T> {
	type Target = [Arc<T>];

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<'a, T: ?Sized> IntoIterator for &'a Many<T> {
	type Item = &'a Arc<T>;
	type IntoIter = std::slice::Iter<'a, Arc<T>>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

impl<T: ?Sized + Send + Sync + 'static> FromGraph for Many<T> {
	fn param() -> Param {
		Param::Slot(InputSlot::collection(TypeKey::of::<T>(), SlotKind::Many))
	}

	fn take(args: &mut ArgCursor) -> Result<Self, InternalInvariantError> {
		match args.next_arg()? {
			Arg::Many(values) => values
				.iter()
				.map(downcast_value::<T>)
				.collect::<Result<Vec<_>, _>>()
				.map(Many),
			other => Err(args.unexpected::<T>(&other)),
		}
	}
}

/// One value of `T` per module that produces it, keyed and ordered by module
/// name.
///
/// Only providers registered inside a module contribute; a module with more
/// than one producer of `T` is an ambiguity error unless exactly one of them
/// is preferred.
#[derive(Debug)]
pub struct PerModule<T: ?Sized>(BTreeMap<String, Arc<T>>);

impl<T: ?Sized> PerModule<T> {
	pub fn into_inner(self) -> BTreeMap<String, Arc<T>> {
		self.0
	}

	pub fn get(&self, module: &str) -> Option<&Arc<T>> {
		self.0.get(module)
	}
}

impl<T: ?Sized> Clone for PerModule<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T: ?Sized> Deref for PerModule<T> {
	type Target = BTreeMap<String, Arc<T>>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<T: ?Sized + Send + Sync + 'static> FromGraph for PerModule<T> {
	fn param() -> Param {
		Param::Slot(InputSlot::collection(TypeKey::of::<T>(), SlotKind::PerModule))
	}

	fn take(args: &mut ArgCursor) -> Result<Self, InternalInvariantError> {
		match args.next_arg()? {
			Arg::PerModule(entries) => {
				let mut map = BTreeMap::new();
				for (module, value) in entries {
					map.insert(module_name(&module), downcast_value::<T>(&value)?);
				}
				Ok(PerModule(map))
			}
			other => Err(args.unexpected::<T>(&other)),
		}
	}
}

fn module_name(module: &ModuleKey) -> String {
	module.name().to_string()
}
