//! Procedural macros for wireup aggregate structs
//!
//! - `#[derive(In)]` - a struct whose fields are all injected as separate inputs
//! - `#[derive(Out)]` - a struct whose fields are all registered as separate outputs

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod aggregate;
mod crate_paths;

/// Declare a struct as an input aggregate
///
/// Each named field becomes one input of the provider taking the struct.
/// Field types follow the same rules as provider parameters: `Arc<T>`,
/// `Option<Arc<T>>`, `ModuleKey`, `Many<T>` or `PerModule<T>`.
///
/// # Example
///
/// ```ignore
/// use wireup::In;
/// use std::sync::Arc;
///
/// #[derive(In)]
/// struct ServerParams {
///     config: Arc<Config>,
///     metrics: Option<Arc<Metrics>>,
/// }
///
/// fn server(params: ServerParams) -> Arc<Server> {
///     Arc::new(Server::new(&params.config, params.metrics))
/// }
/// ```
#[proc_macro_derive(In)]
pub fn derive_in(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);

	aggregate::derive_in_impl(input)
		.unwrap_or_else(|e| e.to_compile_error())
		.into()
}

/// Declare a struct as an output aggregate
///
/// Each named field becomes one output of the provider returning the struct.
///
/// # Example
///
/// ```ignore
/// use wireup::Out;
/// use std::sync::Arc;
///
/// #[derive(Out)]
/// struct Stores {
///     users: Arc<UserStore>,
///     orders: Arc<OrderStore>,
/// }
/// ```
#[proc_macro_derive(Out)]
pub fn derive_out(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);

	aggregate::derive_out_impl(input)
		.unwrap_or_else(|e| e.to_compile_error())
		.into()
}
