//! Code generation for `#[derive(Bind)]`.

use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::{spanned::Spanned, DeriveInput, Ident};

use crate::parse::{BindField, BindStruct};

/// Expands `#[derive(Bind)]`.
pub fn expand_bind(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let parsed = BindStruct::from_derive_input(&input)?;

    let ident = &parsed.ident;
    let count = parsed.fields.len();
    let descriptors = parsed.fields.iter().map(generate_descriptor);
    let slots = generate_field_slots(&parsed.fields);
    let decode = generate_decode_json(&parsed.fields);

    Ok(quote! {
        #[automatically_derived]
        impl ::reqbind::Bind for #ident {
            fn fields() -> &'static [::reqbind::FieldDescriptor] {
                static FIELDS: [::reqbind::FieldDescriptor; #count] = [
                    #(#descriptors),*
                ];
                &FIELDS
            }

            #slots

            #decode
        }
    })
}

fn generate_descriptor(field: &BindField) -> TokenStream {
    let name = &field.name;
    let tags = field.tags.iter().map(|(tag, value)| {
        let source = tag.variant();
        quote!(.with(#source, #value))
    });

    quote! {
        ::reqbind::FieldDescriptor::new(#name, ::reqbind::FieldTags::new() #(#tags)*)
    }
}

fn generate_field_slots(fields: &[BindField]) -> TokenStream {
    let arms = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.is_settable())
        .map(|(index, field)| {
            let ident = &field.ident;
            quote_spanned! {field.ty.span()=>
                #index => ::core::option::Option::Some(&mut self.#ident),
            }
        });

    quote! {
        fn field_mut(
            &mut self,
            index: usize,
        ) -> ::core::option::Option<&mut dyn ::reqbind::FieldSlot> {
            match index {
                #(#arms)*
                _ => ::core::option::Option::None,
            }
        }
    }
}

fn generate_decode_json(fields: &[BindField]) -> TokenStream {
    let body_fields: Vec<_> = fields
        .iter()
        .filter_map(|field| field.json_key().map(|key| (field, key)))
        .enumerate()
        .map(|(index, (field, key))| {
            let shadow = Ident::new(&format!("__bind{index}"), Span::call_site());
            (field, key, shadow)
        })
        .collect();

    if body_fields.is_empty() {
        return TokenStream::new();
    }

    let declarations = body_fields.iter().map(|(field, key, shadow)| {
        let ty = &field.ty;
        quote! {
            #[serde(rename = #key, default)]
            #shadow: ::core::option::Option<#ty>,
        }
    });

    let assignments = body_fields.iter().map(|(field, _, shadow)| {
        let ident = &field.ident;
        quote! {
            if let ::core::option::Option::Some(value) = body.#shadow {
                self.#ident = value;
            }
        }
    });

    quote! {
        fn decode_json(
            &mut self,
            body: &[u8],
        ) -> ::core::result::Result<(), ::reqbind::__private::serde_json::Error> {
            #[derive(::reqbind::__private::serde::Deserialize)]
            #[serde(crate = "::reqbind::__private::serde")]
            struct __ReqbindBody {
                #(#declarations)*
            }

            let body: __ReqbindBody = ::reqbind::__private::decode_json(body)?;
            #(#assignments)*
            ::core::result::Result::Ok(())
        }
    }
}
