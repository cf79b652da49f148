//! Derives for the arena syntax tree.
//!
//! - `WalkAst` generates `crate::walk::Walk`, visiting every field in declaration order.
//! - `SpanFields` generates `crate::ast::SpanFields`, handing every inline `Span`
//!   (including the ones nested in `IdentName`s) to a rewrite callback.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, quote_spanned};
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields, Index};

/// Per-derive knobs: how a field is borrowed and what is emitted for it.
struct FieldPass {
    derive: &'static str,
    borrow: fn(TokenStream2) -> TokenStream2,
    call: fn(TokenStream2) -> TokenStream2,
}

const WALK: FieldPass = FieldPass {
    derive: "WalkAst",
    borrow: |place| quote! { &#place },
    call: |field| quote! { crate::walk::Walk::walk(#field, a, v); },
};

const SPANS: FieldPass = FieldPass {
    derive: "SpanFields",
    borrow: |place| quote! { &mut #place },
    call: |field| quote! { crate::ast::SpanFields::for_each_span(#field, f); },
};

#[proc_macro_derive(WalkAst)]
pub fn derive_walk_ast(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let span = input.span();

    let body = match generate_body(&input.data, &WALK) {
        Ok(body) => body,
        Err(err) => return err.into_compile_error().into(),
    };

    quote_spanned! {span =>
        impl<'ast> crate::walk::Walk<'ast> for #name {
            #[inline(always)]
            fn walk<V: crate::walk::Visitor<'ast> + ?Sized>(
                &self,
                a: &'ast crate::ast::AstArena,
                v: &mut V
            ) {
                #body
            }
        }
    }
    .into()
}

#[proc_macro_derive(SpanFields)]
pub fn derive_span_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let span = input.span();

    let body = match generate_body(&input.data, &SPANS) {
        Ok(body) => body,
        Err(err) => return err.into_compile_error().into(),
    };

    quote_spanned! {span =>
        impl crate::ast::SpanFields for #name {
            #[allow(unused_variables)]
            fn for_each_span(&mut self, f: &mut dyn FnMut(&mut crate::ast::Span)) {
                #body
            }
        }
    }
    .into()
}

fn generate_body(data: &Data, pass: &FieldPass) -> syn::Result<TokenStream2> {
    match data {
        Data::Struct(data_struct) => Ok(struct_fields(&data_struct.fields, pass)),
        Data::Enum(data_enum) => {
            let arms = data_enum
                .variants
                .iter()
                .map(|variant| variant_arm(&variant.ident, &variant.fields, pass));

            Ok(quote! {
                match self {
                    #(#arms)*
                }
            })
        }
        Data::Union(u) => Err(syn::Error::new_spanned(
            u.union_token,
            format!("{} cannot be derived for unions", pass.derive),
        )),
    }
}

fn struct_fields(fields: &Fields, pass: &FieldPass) -> TokenStream2 {
    let calls = fields.iter().enumerate().map(|(i, field)| {
        let place = match &field.ident {
            Some(ident) => quote! { self.#ident },
            None => {
                let index = Index::from(i);
                quote! { self.#index }
            }
        };
        (pass.call)((pass.borrow)(place))
    });

    quote! { #(#calls)* }
}

fn variant_arm(variant: &syn::Ident, fields: &Fields, pass: &FieldPass) -> TokenStream2 {
    // Bindings come from match ergonomics, so they are already `&T` / `&mut T`.
    match fields {
        Fields::Unit => quote! { Self::#variant => {} },
        Fields::Named(named) => {
            let bindings: Vec<_> = named.named.iter().filter_map(|f| f.ident.as_ref()).collect();
            let calls = bindings.iter().map(|b| (pass.call)(quote! { #b }));
            quote! {
                Self::#variant { #(#bindings),* } => {
                    #(#calls)*
                }
            }
        }
        Fields::Unnamed(unnamed) => {
            let bindings: Vec<_> = (0..unnamed.unnamed.len())
                .map(|i| format_ident!("f{}", i))
                .collect();
            let calls = bindings.iter().map(|b| (pass.call)(quote! { #b }));
            quote! {
                Self::#variant(#(#bindings),*) => {
                    #(#calls)*
                }
            }
        }
    }
}
