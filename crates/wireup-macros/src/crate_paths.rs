//! Helper functions for dynamic crate path resolution using proc_macro_crate

use proc_macro2::TokenStream;
use quote::quote;

/// Resolves the path to the wireup runtime dynamically.
///
/// Prefers the `wireup` facade and falls back to `wireup-di`, so the derives
/// work for users of either crate (including renamed dependencies).
pub(crate) fn get_wireup_crate() -> syn::Result<TokenStream> {
	use proc_macro_crate::{FoundCrate, crate_name};

	let found = crate_name("wireup")
		.map(|found| (found, "wireup"))
		.or_else(|_| crate_name("wireup-di").map(|found| (found, "wireup_di")));

	match found {
		Ok((FoundCrate::Itself, own)) => {
			let ident = syn::Ident::new(own, proc_macro2::Span::call_site());
			Ok(quote!(::#ident))
		}
		Ok((FoundCrate::Name(name), _)) => {
			let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
			Ok(quote!(::#ident))
		}
		Err(e) => Err(syn::Error::new(
			proc_macro2::Span::call_site(),
			format!(
				"failed to resolve `wireup` crate: {}. Ensure `wireup` or `wireup-di` is listed in Cargo.toml dependencies.",
				e
			),
		)),
	}
}
