//! Aggregate expansion
//!
//! A struct deriving `In` stands for "one input per field"; a struct deriving
//! `Out` stands for "one output per field". Expansion flattens both into plain
//! slots so the graph builder only ever sees single-type inputs and outputs.

use crate::descriptor::{ErasedFn, InputSlot, OutputShape, OutputSlot, Param, ProviderDescriptor};
use crate::error::ExtractionError;
use crate::key::TypeKey;
use crate::location::Location;
use std::collections::HashSet;
use std::fmt;

/// Field-by-field description of an aggregate struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec<F> {
	pub ty: TypeKey,
	pub fields: Vec<(&'static str, F)>,
}

/// An input aggregate: each field is one parameter.
pub type InputAggregate = AggregateSpec<Param>;

/// An output aggregate: each field contributes its own output shapes.
pub type OutputAggregate = AggregateSpec<Vec<OutputShape>>;

impl<F> AggregateSpec<F> {
	pub fn new<T: ?Sized + 'static>() -> Self {
		Self {
			ty: TypeKey::of::<T>(),
			fields: Vec::new(),
		}
	}

	pub fn field(mut self, name: &'static str, shape: F) -> Self {
		self.fields.push((name, shape));
		self
	}
}

/// A provider after aggregate expansion: flat inputs, flat outputs.
#[derive(Clone)]
pub struct ProviderNode {
	pub name: &'static str,
	pub inputs: Vec<InputSlot>,
	pub outputs: Vec<OutputSlot>,
	pub produces_error: bool,
	pub location: Location,
	pub(crate) call: ErasedFn,
}

impl ProviderNode {
	/// Output keys in declaration order.
	pub fn output_keys(&self) -> Vec<TypeKey> {
		self.outputs.iter().map(|slot| slot.key).collect()
	}

	/// Position of `key` among the outputs.
	pub fn output_index(&self, key: TypeKey) -> Option<usize> {
		self.outputs.iter().position(|slot| slot.key == key)
	}

	/// Short, human-readable name for logs and graph labels. Closures are
	/// named after their registration site.
	pub fn display_name(&self) -> String {
		if self.name.ends_with("{{closure}}") {
			let file = self
				.location
				.file()
				.rsplit(['/', '\\'])
				.next()
				.unwrap_or_default();
			return format!("<closure {}:{}>", file, self.location.line());
		}
		crate::key::shorten_type_name(self.name)
	}
}

impl fmt::Debug for ProviderNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProviderNode")
			.field("name", &self.name)
			.field("inputs", &self.inputs)
			.field("outputs", &self.outputs)
			.field("produces_error", &self.produces_error)
			.field("location", &self.location)
			.finish_non_exhaustive()
	}
}

/// Flattens declared parameters into input slots.
pub fn flatten_params(params: Vec<Param>, location: Location) -> Result<Vec<InputSlot>, ExtractionError> {
	let mut inputs = Vec::new();
	for param in params {
		match param {
			Param::Slot(slot) => inputs.push(slot),
			Param::Aggregate(spec) => {
				for (field, member) in spec.fields {
					match member {
						Param::Slot(slot) => inputs.push(slot.in_field(field)),
						Param::Aggregate(_) => {
							return Err(ExtractionError::NestedAggregate {
								aggregate: spec.ty,
								field,
								location,
							});
						}
					}
				}
			}
		}
	}
	Ok(inputs)
}

/// Flattens every aggregate input and output of `desc`.
pub fn expand(desc: ProviderDescriptor) -> Result<ProviderNode, ExtractionError> {
	let location = desc.location;
	let inputs = flatten_params(desc.params, location)?;

	let mut outputs = Vec::new();
	for shape in desc.outputs {
		match shape {
			OutputShape::Slot(slot) => outputs.push(slot),
			OutputShape::Aggregate(spec) => {
				for (field, shapes) in spec.fields {
					for member in shapes {
						match member {
							OutputShape::Slot(slot) => outputs.push(OutputSlot {
								key: slot.key,
								field: Some(field),
							}),
							OutputShape::Aggregate(_) => {
								return Err(ExtractionError::NestedAggregate {
									aggregate: spec.ty,
									field,
									location,
								});
							}
							OutputShape::Error => {
								return Err(ExtractionError::MisplacedErrorOutput {
									provider: desc.name.to_string(),
									location,
								});
							}
						}
					}
				}
			}
			OutputShape::Error => {
				return Err(ExtractionError::MisplacedErrorOutput {
					provider: desc.name.to_string(),
					location,
				});
			}
		}
	}

	let mut seen = HashSet::new();
	for slot in &outputs {
		if !seen.insert(slot.key) {
			return Err(ExtractionError::DuplicateOutput {
				key: slot.key,
				location,
			});
		}
	}

	Ok(ProviderNode {
		name: desc.name,
		inputs,
		outputs,
		produces_error: desc.produces_error,
		location,
		call: desc.call,
	})
}
