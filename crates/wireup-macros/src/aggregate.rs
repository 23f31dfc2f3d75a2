//! Implementation of `#[derive(In)]` and `#[derive(Out)]`

use crate::crate_paths::get_wireup_crate;
use proc_macro2::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Data, DeriveInput, Field, Fields, Result};

/// Named fields of the struct, or an error pointing at what is wrong with it.
fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<&'a Punctuated<Field, Comma>> {
	let name = &input.ident;
	match &input.data {
		Data::Struct(data) => match &data.fields {
			Fields::Named(fields) => Ok(&fields.named),
			Fields::Unnamed(_) => Err(syn::Error::new_spanned(
				name,
				format!("#[derive({})] cannot be applied to tuple structs", derive),
			)),
			Fields::Unit => Err(syn::Error::new_spanned(
				name,
				format!("#[derive({})] requires at least one named field", derive),
			)),
		},
		_ => Err(syn::Error::new_spanned(
			name,
			format!("#[derive({})] can only be applied to structs", derive),
		)),
	}
}

fn reject_lifetimes(input: &DeriveInput, derive: &str) -> Result<()> {
	if let Some(lifetime) = input.generics.lifetimes().next() {
		return Err(syn::Error::new_spanned(
			lifetime,
			format!("#[derive({})] structs must be 'static", derive),
		));
	}
	Ok(())
}

/// Implementation of `#[derive(In)]`
///
/// Generates a `FromGraph` impl that declares one input per field and reads
/// the fields back in declaration order.
pub(crate) fn derive_in_impl(input: DeriveInput) -> Result<TokenStream> {
	reject_lifetimes(&input, "In")?;
	let fields = named_fields(&input, "In")?;
	let wireup = get_wireup_crate()?;

	let struct_name = &input.ident;
	let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

	let mut declarations = Vec::new();
	let mut reads = Vec::new();
	for field in fields {
		let ident = &field.ident;
		let ty = &field.ty;
		let label = ident
			.as_ref()
			.map(|ident| ident.to_string())
			.unwrap_or_default();
		declarations.push(quote! {
			.field(#label, <#ty as #wireup::FromGraph>::param())
		});
		reads.push(quote! {
			#ident: <#ty as #wireup::FromGraph>::take(args)?
		});
	}

	Ok(quote! {
		impl #impl_generics #wireup::FromGraph for #struct_name #ty_generics #where_clause {
			fn param() -> #wireup::Param {
				#wireup::Param::Aggregate(
					#wireup::AggregateSpec::new::<Self>()
						#(#declarations)*
				)
			}

			fn take(
				args: &mut #wireup::ArgCursor,
			) -> ::core::result::Result<Self, #wireup::InternalInvariantError> {
				::core::result::Result::Ok(Self {
					#(#reads,)*
				})
			}
		}
	})
}

/// Implementation of `#[derive(Out)]`
///
/// Generates an `IntoOutputs` impl that declares one output group per field
/// and emits the field values in declaration order.
pub(crate) fn derive_out_impl(input: DeriveInput) -> Result<TokenStream> {
	reject_lifetimes(&input, "Out")?;
	let fields = named_fields(&input, "Out")?;
	let wireup = get_wireup_crate()?;

	let struct_name = &input.ident;
	let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

	let mut declarations = Vec::new();
	let mut writes = Vec::new();
	for field in fields {
		let ident = &field.ident;
		let ty = &field.ty;
		let label = ident
			.as_ref()
			.map(|ident| ident.to_string())
			.unwrap_or_default();
		declarations.push(quote! {
			.field(#label, <#ty as #wireup::IntoOutputs>::shapes())
		});
		writes.push(quote! {
			<#ty as #wireup::IntoOutputs>::into_values(self.#ident, out)?;
		});
	}

	Ok(quote! {
		impl #impl_generics #wireup::IntoOutputs for #struct_name #ty_generics #where_clause {
			fn shapes() -> ::std::vec::Vec<#wireup::OutputShape> {
				::std::vec![#wireup::OutputShape::Aggregate(
					#wireup::AggregateSpec::new::<Self>()
						#(#declarations)*
				)]
			}

			fn into_values(
				self,
				out: &mut ::std::vec::Vec<#wireup::Value>,
			) -> ::core::result::Result<(), #wireup::BoxError> {
				#(#writes)*
				::core::result::Result::Ok(())
			}
		}
	})
}
