//! Derive macro for reqbind destinations.
//!
//! `#[derive(Bind)]` turns a struct with named fields into a binding
//! destination. It generates:
//!
//! 1. A static field table with each field's name and source tags
//! 2. `field_mut`, handing out typed slots for fields with a non-JSON source
//! 3. `decode_json`, when at least one field carries a `json` tag
//!
//! Use it through the `reqbind` crate, which re-exports it.

mod derive;
mod parse;

use proc_macro::TokenStream;

/// Derives `reqbind::Bind`.
///
/// # Attributes
///
/// - `json`, `form`, `file`, `header`, `query`, `path`: set the key for a
///   source, e.g. `#[bind(query = "page")]`. A bare source uses the field
///   name. `"-"` disables the source.
/// - `file = "binary"`: binds the raw request body.
/// - `skip`: the binder never touches the field.
///
/// # Example
///
/// ```rust,ignore
/// use reqbind::{Bind, File};
///
/// #[derive(Default, Bind)]
/// struct Upload {
///     #[bind(path = "id")]
///     id: u64,
///     #[bind(file = "avatar")]
///     avatar: Option<File>,
///     #[bind(form, query = "caption")]
///     caption: String,
/// }
/// ```
///
/// # Generated Code
///
/// The macro generates approximately:
///
/// ```rust,ignore
/// impl reqbind::Bind for Upload {
///     fn fields() -> &'static [FieldDescriptor] {
///         static FIELDS: [FieldDescriptor; 3] = [
///             FieldDescriptor::new("id", FieldTags::new().with(Source::Path, "id")),
///             // ...
///         ];
///         &FIELDS
///     }
///
///     fn field_mut(&mut self, index: usize) -> Option<&mut dyn FieldSlot> {
///         match index {
///             0 => Some(&mut self.id),
///             1 => Some(&mut self.avatar),
///             2 => Some(&mut self.caption),
///             _ => None,
///         }
///     }
/// }
/// ```
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    derive::expand_bind(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
