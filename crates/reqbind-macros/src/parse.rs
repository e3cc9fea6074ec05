//! Parsing of `#[derive(Bind)]` input.
//!
//! Turns a struct definition and its `#[bind(...)]` field attributes into
//! [`BindStruct`], rejecting shapes the binder cannot handle.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    ext::IdentExt, punctuated::Punctuated, spanned::Spanned, Data, DeriveInput, Expr, ExprLit,
    Fields, Ident, Lit, Meta, Token, Type,
};

/// Tag value that disables a source.
const SKIP: &str = "-";

/// A request source named in a `#[bind(...)]` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    Json,
    Form,
    File,
    Header,
    Query,
    Path,
}

impl SourceTag {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Self::Json),
            "form" => Some(Self::Form),
            "file" => Some(Self::File),
            "header" => Some(Self::Header),
            "query" => Some(Self::Query),
            "path" => Some(Self::Path),
            _ => None,
        }
    }

    /// Path of the matching runtime `Source` variant.
    pub fn variant(self) -> TokenStream {
        match self {
            Self::Json => quote!(::reqbind::Source::Json),
            Self::Form => quote!(::reqbind::Source::Form),
            Self::File => quote!(::reqbind::Source::File),
            Self::Header => quote!(::reqbind::Source::Header),
            Self::Query => quote!(::reqbind::Source::Query),
            Self::Path => quote!(::reqbind::Source::Path),
        }
    }
}

/// A parsed destination struct.
#[derive(Debug)]
pub struct BindStruct {
    /// The struct name.
    pub ident: Ident,
    /// Fields in declaration order.
    pub fields: Vec<BindField>,
}

/// A parsed struct field.
#[derive(Debug)]
pub struct BindField {
    /// The field identifier.
    pub ident: Ident,
    /// The field type.
    pub ty: Type,
    /// Field name without any raw identifier prefix.
    pub name: String,
    /// Declared source tags, in attribute order.
    pub tags: Vec<(SourceTag, String)>,
}

impl BindField {
    /// Returns the JSON key if the field takes part in the body pass.
    pub fn json_key(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|(tag, _)| *tag == SourceTag::Json)
            .map(|(_, value)| value.as_str())
            .filter(|value| *value != SKIP)
            .map(|value| if value.is_empty() { self.name.as_str() } else { value })
    }

    /// Returns true if a non-JSON source can bind the field.
    pub fn is_settable(&self) -> bool {
        self.tags
            .iter()
            .any(|(tag, value)| *tag != SourceTag::Json && !value.is_empty() && value != SKIP)
    }
}

impl BindStruct {
    /// Parses derive input.
    pub fn from_derive_input(input: &DeriveInput) -> syn::Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new(
                input.generics.span(),
                "Bind cannot be derived for generic structs",
            ));
        }

        let named = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named,
                _ => {
                    return Err(syn::Error::new(
                        input.ident.span(),
                        "Bind can only be derived for structs with named fields",
                    ))
                }
            },
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "Bind can only be derived for structs",
                ))
            }
        };

        let fields = named
            .named
            .iter()
            .map(parse_field)
            .collect::<syn::Result<Vec<_>>>()?;

        check_duplicate_json_keys(&fields)?;

        Ok(Self {
            ident: input.ident.clone(),
            fields,
        })
    }
}

fn parse_field(field: &syn::Field) -> syn::Result<BindField> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
    let name = ident.unraw().to_string();

    let mut tags: Vec<(SourceTag, String)> = Vec::new();
    let mut skip = false;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("bind")) {
        let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;

        for meta in metas {
            let (path, value) = match &meta {
                Meta::Path(path) => (path, None),
                Meta::NameValue(nv) => match &nv.value {
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(s), ..
                    }) => (&nv.path, Some(s.value())),
                    _ => {
                        return Err(syn::Error::new(
                            nv.value.span(),
                            "expected string literal",
                        ))
                    }
                },
                Meta::List(_) => {
                    return Err(syn::Error::new(meta.span(), "expected `source` or `source = \"key\"`"))
                }
            };

            let key = path
                .get_ident()
                .ok_or_else(|| syn::Error::new(path.span(), "expected identifier"))?
                .to_string();

            if key == "skip" {
                if value.is_some() {
                    return Err(syn::Error::new(meta.span(), "`skip` takes no value"));
                }
                skip = true;
                continue;
            }

            let tag = SourceTag::from_name(&key).ok_or_else(|| {
                syn::Error::new(path.span(), format!("unknown bind source: {key}"))
            })?;

            if tags.iter().any(|(existing, _)| *existing == tag) {
                return Err(syn::Error::new(
                    path.span(),
                    format!("duplicate bind source: {key}"),
                ));
            }

            tags.push((tag, value.unwrap_or_else(|| name.clone())));
        }
    }

    if skip && !tags.is_empty() {
        return Err(syn::Error::new(
            ident.span(),
            "`skip` cannot be combined with bind sources",
        ));
    }

    Ok(BindField {
        ident,
        ty: field.ty.clone(),
        name,
        tags,
    })
}

fn check_duplicate_json_keys(fields: &[BindField]) -> syn::Result<()> {
    for (index, field) in fields.iter().enumerate() {
        let Some(key) = field.json_key() else {
            continue;
        };
        if fields[..index].iter().any(|f| f.json_key() == Some(key)) {
            return Err(syn::Error::new(
                field.ident.span(),
                format!("duplicate json key: {key}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_tags() {
        let input: DeriveInput = parse_quote! {
            struct Request {
                #[bind(query = "page", header = "X-Page")]
                page: u32,
                #[bind(json)]
                name: String,
                #[bind(path)]
                r#type: String,
                untagged: u8,
            }
        };

        let parsed = BindStruct::from_derive_input(&input).unwrap();
        assert_eq!(parsed.ident, "Request");
        assert_eq!(parsed.fields.len(), 4);

        let page = &parsed.fields[0];
        assert_eq!(
            page.tags,
            [
                (SourceTag::Query, "page".to_string()),
                (SourceTag::Header, "X-Page".to_string()),
            ]
        );
        assert!(page.is_settable());
        assert_eq!(page.json_key(), None);

        let name = &parsed.fields[1];
        assert_eq!(name.json_key(), Some("name"));
        assert!(!name.is_settable());

        let kind = &parsed.fields[2];
        assert_eq!(kind.name, "type");
        assert_eq!(kind.tags, [(SourceTag::Path, "type".to_string())]);

        assert!(!parsed.fields[3].is_settable());
    }

    #[test]
    fn test_skip_marker_and_empty_values() {
        let input: DeriveInput = parse_quote! {
            struct Request {
                #[bind(json = "-", form = "")]
                a: String,
                #[bind(json = "")]
                b: String,
                #[bind(skip)]
                c: String,
            }
        };

        let parsed = BindStruct::from_derive_input(&input).unwrap();
        assert_eq!(parsed.fields[0].json_key(), None);
        assert!(!parsed.fields[0].is_settable());
        assert_eq!(parsed.fields[1].json_key(), Some("b"));
        assert!(parsed.fields[2].tags.is_empty());
    }

    #[test]
    fn test_rejects_non_structs() {
        let input: DeriveInput = parse_quote! {
            enum Request { A, B }
        };
        assert!(BindStruct::from_derive_input(&input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Request(u32);
        };
        assert!(BindStruct::from_derive_input(&input).is_err());
    }

    #[test]
    fn test_rejects_generics() {
        let input: DeriveInput = parse_quote! {
            struct Request<T> { #[bind(query)] value: T }
        };
        let err = BindStruct::from_derive_input(&input).unwrap_err();
        assert!(err.to_string().contains("generic"));
    }

    #[test]
    fn test_rejects_bad_attributes() {
        let cases: [DeriveInput; 5] = [
            parse_quote! { struct R { #[bind(cookie = "a")] a: String } },
            parse_quote! { struct R { #[bind(query = 1)] a: String } },
            parse_quote! { struct R { #[bind(query = "a", query = "b")] a: String } },
            parse_quote! { struct R { #[bind(skip, query = "a")] a: String } },
            parse_quote! {
                struct R {
                    #[bind(json = "a")] a: String,
                    #[bind(json = "a")] b: String,
                }
            },
        ];

        for input in &cases {
            assert!(BindStruct::from_derive_input(input).is_err());
        }
    }
}
