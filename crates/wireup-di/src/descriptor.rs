//! Provider descriptor extraction
//!
//! Turns a callable into a normalized [`ProviderDescriptor`]: ordered inputs,
//! ordered outputs, whether a trailing error output exists, the registration
//! site, and a uniform erased call surface. Nothing downstream of this module
//! looks at a concrete function signature again.
//!
//! Statically typed functions are described through the [`FromGraph`] and
//! [`IntoOutputs`] traits. Callables whose shape is only known at runtime are
//! described with [`DynamicProvider`].

use crate::aggregate::{InputAggregate, OutputAggregate};
use crate::error::{BoxError, ExtractionError, InternalInvariantError};
use crate::key::{ModuleKey, TypeKey};
use crate::location::Location;
use crate::value::{Arg, ArgCursor, Value};
use std::fmt;
use std::sync::Arc;

/// How an input slot is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
	/// Exactly one producer of the type.
	One,
	/// Every producer of the type, across all scopes.
	Many,
	/// One producer per module.
	PerModule,
	/// The module the consuming provider is built for.
	ModuleKey,
}

/// One flattened input of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSlot {
	pub key: TypeKey,
	pub optional: bool,
	pub kind: SlotKind,
	/// Set when the slot came from an aggregate field.
	pub field: Option<&'static str>,
}

impl InputSlot {
	pub fn required(key: TypeKey) -> Self {
		Self {
			key,
			optional: false,
			kind: SlotKind::One,
			field: None,
		}
	}

	pub fn optional(key: TypeKey) -> Self {
		Self {
			optional: true,
			..Self::required(key)
		}
	}

	pub fn collection(key: TypeKey, kind: SlotKind) -> Self {
		Self {
			key,
			optional: false,
			kind,
			field: None,
		}
	}

	pub(crate) fn in_field(mut self, field: &'static str) -> Self {
		self.field = Some(field);
		self
	}
}

/// Shape of one declared parameter before aggregate expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
	Slot(InputSlot),
	Aggregate(InputAggregate),
}

/// One flattened output of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSlot {
	pub key: TypeKey,
	pub field: Option<&'static str>,
}

impl OutputSlot {
	pub fn new(key: TypeKey) -> Self {
		Self { key, field: None }
	}
}

/// Shape of one declared output before aggregate expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputShape {
	Slot(OutputSlot),
	Aggregate(OutputAggregate),
	/// A failure channel. Only valid as the very last output.
	Error,
}

/// A parameter type a provider can take.
///
/// Implemented for `Arc<T>` (required), `Option<Arc<T>>` (optional),
/// [`ModuleKey`], [`Many<T>`](crate::Many), [`PerModule<T>`](crate::PerModule)
/// and for structs deriving `In`.
pub trait FromGraph: Sized + Send + 'static {
	fn param() -> Param;

	/// Consumes this parameter's arguments from the cursor.
	fn take(args: &mut ArgCursor) -> Result<Self, InternalInvariantError>;
}

impl<T: ?Sized + Send + Sync + 'static> FromGraph for Arc<T> {
	fn param() -> Param {
		Param::Slot(InputSlot::required(TypeKey::of::<T>()))
	}

	fn take(args: &mut ArgCursor) -> Result<Self, InternalInvariantError> {
		args.next_one::<T>()
	}
}

impl<T: ?Sized + Send + Sync + 'static> FromGraph for Option<Arc<T>> {
	fn param() -> Param {
		Param::Slot(InputSlot::optional(TypeKey::of::<T>()))
	}

	fn take(args: &mut ArgCursor) -> Result<Self, InternalInvariantError> {
		match args.next_arg()? {
			Arg::One(value) => crate::value::downcast_value::<T>(&value).map(Some),
			Arg::Absent => Ok(None),
			other => Err(args.unexpected::<T>(&other)),
		}
	}
}

impl FromGraph for ModuleKey {
	fn param() -> Param {
		Param::Slot(InputSlot::collection(
			TypeKey::of::<ModuleKey>(),
			SlotKind::ModuleKey,
		))
	}

	fn take(args: &mut ArgCursor) -> Result<Self, InternalInvariantError> {
		match args.next_arg()? {
			Arg::Module(key) => Ok(key),
			other => Err(args.unexpected::<ModuleKey>(&other)),
		}
	}
}

/// A return type a provider can have.
///
/// Implemented for `Arc<T>`, `()`, tuples of outputs, structs deriving `Out`,
/// and `Result<R, E>` where the error becomes the trailing error output.
pub trait IntoOutputs: Send + 'static {
	fn shapes() -> Vec<OutputShape>;

	/// Appends the produced values in declaration order.
	fn into_values(self, out: &mut Vec<Value>) -> Result<(), BoxError>;
}

impl<T: ?Sized + Send + Sync + 'static> IntoOutputs for Arc<T> {
	fn shapes() -> Vec<OutputShape> {
		vec![OutputShape::Slot(OutputSlot::new(TypeKey::of::<T>()))]
	}

	fn into_values(self, out: &mut Vec<Value>) -> Result<(), BoxError> {
		out.push(Value::new(self));
		Ok(())
	}
}

impl IntoOutputs for () {
	fn shapes() -> Vec<OutputShape> {
		Vec::new()
	}

	fn into_values(self, _out: &mut Vec<Value>) -> Result<(), BoxError> {
		Ok(())
	}
}

impl<R, E> IntoOutputs for Result<R, E>
where
	R: IntoOutputs,
	E: Into<BoxError> + Send + 'static,
{
	fn shapes() -> Vec<OutputShape> {
		let mut shapes = R::shapes();
		shapes.push(OutputShape::Error);
		shapes
	}

	fn into_values(self, out: &mut Vec<Value>) -> Result<(), BoxError> {
		match self {
			Ok(values) => values.into_values(out),
			Err(err) => Err(err.into()),
		}
	}
}

macro_rules! impl_into_outputs_for_tuple {
	($($part:ident),+) => {
		impl<$($part: IntoOutputs),+> IntoOutputs for ($($part,)+) {
			fn shapes() -> Vec<OutputShape> {
				let mut shapes = Vec::new();
				$(shapes.extend($part::shapes());)+
				shapes
			}

			#[allow(non_snake_case)]
			fn into_values(self, out: &mut Vec<Value>) -> Result<(), BoxError> {
				let ($($part,)+) = self;
				$($part.into_values(out)?;)+
				Ok(())
			}
		}
	};
}

impl_into_outputs_for_tuple!(O1);
impl_into_outputs_for_tuple!(O1, O2);
impl_into_outputs_for_tuple!(O1, O2, O3);
impl_into_outputs_for_tuple!(O1, O2, O3, O4);
impl_into_outputs_for_tuple!(O1, O2, O3, O4, O5);
impl_into_outputs_for_tuple!(O1, O2, O3, O4, O5, O6);
impl_into_outputs_for_tuple!(O1, O2, O3, O4, O5, O6, O7);
impl_into_outputs_for_tuple!(O1, O2, O3, O4, O5, O6, O7, O8);

/// A function usable as a provider, invoker or ad-hoc invocation.
///
/// Implemented for every `Fn(A1, ..., An) -> R` with up to twelve parameters
/// where each `Ai: FromGraph` and `R: IntoOutputs`.
pub trait Handler<Args>: Send + Sync + 'static {
	type Output: IntoOutputs;

	fn params() -> Vec<Param>;

	fn call(&self, args: &mut ArgCursor) -> Result<Self::Output, InternalInvariantError>;

	/// Name used in diagnostics.
	fn name(&self) -> &'static str {
		std::any::type_name::<Self>()
	}
}

macro_rules! impl_handler {
	($($arg:ident),*) => {
		impl<F, R, $($arg,)*> Handler<($($arg,)*)> for F
		where
			F: Fn($($arg),*) -> R + Send + Sync + 'static,
			R: IntoOutputs,
			$($arg: FromGraph,)*
		{
			type Output = R;

			fn params() -> Vec<Param> {
				vec![$(<$arg as FromGraph>::param()),*]
			}

			#[allow(non_snake_case, unused_variables)]
			fn call(&self, args: &mut ArgCursor) -> Result<R, InternalInvariantError> {
				$(let $arg = <$arg as FromGraph>::take(args)?;)*
				Ok((self)($($arg),*))
			}
		}
	};
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);

/// Why an erased call did not produce values.
#[derive(Debug)]
pub(crate) enum CallError {
	Provider(BoxError),
	Internal(InternalInvariantError),
}

pub(crate) type ErasedFn = Arc<dyn Fn(Vec<Arg>) -> Result<Vec<Value>, CallError> + Send + Sync>;

/// Normalized description of a provider, prior to aggregate expansion.
#[derive(Clone)]
pub struct ProviderDescriptor {
	pub name: &'static str,
	pub params: Vec<Param>,
	/// Declared outputs with the trailing error output removed.
	pub outputs: Vec<OutputShape>,
	pub produces_error: bool,
	pub location: Location,
	pub(crate) call: ErasedFn,
}

impl ProviderDescriptor {
	/// Describes a typed function.
	pub fn from_handler<Args, H: Handler<Args>>(
		handler: H,
		location: Location,
	) -> Result<Self, ExtractionError> {
		let name = handler.name();
		let (outputs, produces_error) = split_error_output(H::Output::shapes(), name, location)?;
		let call: ErasedFn = Arc::new(move |args: Vec<Arg>| {
			let mut cursor = ArgCursor::new(args, name);
			let output = handler.call(&mut cursor).map_err(CallError::Internal)?;
			let mut values = Vec::new();
			output
				.into_values(&mut values)
				.map_err(CallError::Provider)?;
			Ok(values)
		});
		Ok(Self {
			name,
			params: H::params(),
			outputs,
			produces_error,
			location,
			call,
		})
	}
}

impl fmt::Debug for ProviderDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProviderDescriptor")
			.field("name", &self.name)
			.field("params", &self.params)
			.field("outputs", &self.outputs)
			.field("produces_error", &self.produces_error)
			.field("location", &self.location)
			.finish_non_exhaustive()
	}
}

/// Strips a trailing error output; an error output anywhere else is rejected.
fn split_error_output(
	mut shapes: Vec<OutputShape>,
	name: &str,
	location: Location,
) -> Result<(Vec<OutputShape>, bool), ExtractionError> {
	let produces_error = matches!(shapes.last(), Some(OutputShape::Error));
	if produces_error {
		shapes.pop();
	}
	if shapes.iter().any(|shape| matches!(shape, OutputShape::Error)) {
		return Err(ExtractionError::MisplacedErrorOutput {
			provider: name.to_string(),
			location,
		});
	}
	Ok((shapes, produces_error))
}

enum SignatureItem {
	Input(InputSlot),
	Variadic(TypeKey),
	Output(TypeKey),
	Error,
}

type DynamicBody = Arc<dyn Fn(Vec<Arg>) -> Result<Vec<Value>, BoxError> + Send + Sync>;

/// Describes a provider whose shape is only known at runtime.
///
/// # Examples
///
/// ```
/// use wireup_di::{Arg, DynamicProvider, Value};
/// use std::sync::Arc;
///
/// let descriptor = DynamicProvider::new("port_label")
///     .input::<u16>()
///     .output::<String>()
///     .body(|args| {
///         let port = match &args[0] {
///             Arg::One(value) => value.downcast::<u16>().unwrap(),
///             _ => unreachable!(),
///         };
///         Ok(vec![Value::new(Arc::new(format!("port {}", port)))])
///     })
///     .build()
///     .unwrap();
/// assert_eq!(descriptor.params.len(), 1);
/// ```
pub struct DynamicProvider {
	name: &'static str,
	items: Vec<SignatureItem>,
	body: Option<DynamicBody>,
}

impl DynamicProvider {
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			items: Vec::new(),
			body: None,
		}
	}

	pub fn input<T: ?Sized + 'static>(mut self) -> Self {
		self.items
			.push(SignatureItem::Input(InputSlot::required(TypeKey::of::<T>())));
		self
	}

	pub fn optional_input<T: ?Sized + 'static>(mut self) -> Self {
		self.items
			.push(SignatureItem::Input(InputSlot::optional(TypeKey::of::<T>())));
		self
	}

	/// Declares a trailing "any number of `T`" input. Such signatures are
	/// rejected by [`build`](Self::build): cardinality must be known statically.
	pub fn variadic_input<T: ?Sized + 'static>(mut self) -> Self {
		self.items.push(SignatureItem::Variadic(TypeKey::of::<T>()));
		self
	}

	pub fn output<T: ?Sized + 'static>(mut self) -> Self {
		self.items
			.push(SignatureItem::Output(TypeKey::of::<T>()));
		self
	}

	pub fn error_output(mut self) -> Self {
		self.items.push(SignatureItem::Error);
		self
	}

	pub fn body<F>(mut self, body: F) -> Self
	where
		F: Fn(Vec<Arg>) -> Result<Vec<Value>, BoxError> + Send + Sync + 'static,
	{
		self.body = Some(Arc::new(body));
		self
	}

	/// Validates the signature and produces a descriptor.
	#[track_caller]
	pub fn build(self) -> Result<ProviderDescriptor, ExtractionError> {
		let location = Location::caller();
		let body = self
			.body
			.ok_or(ExtractionError::NotAFunction { location })?;

		let mut params = Vec::new();
		let mut shapes = Vec::new();
		for item in self.items {
			match item {
				SignatureItem::Input(slot) => params.push(Param::Slot(slot)),
				SignatureItem::Variadic(key) => {
					return Err(ExtractionError::VariadicUnsupported { key, location });
				}
				SignatureItem::Output(key) => {
					shapes.push(OutputShape::Slot(OutputSlot::new(key)));
				}
				SignatureItem::Error => shapes.push(OutputShape::Error),
			}
		}
		let (outputs, produces_error) = split_error_output(shapes, self.name, location)?;

		let call: ErasedFn = Arc::new(move |args: Vec<Arg>| body(args).map_err(CallError::Provider));
		Ok(ProviderDescriptor {
			name: self.name,
			params,
			outputs,
			produces_error,
			location,
			call,
		})
	}
}
