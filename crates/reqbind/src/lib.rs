//! # Reqbind
//!
//! Tag-driven binding of HTTP request data into typed structs.
//!
//! Each field of a destination struct names the request location its value
//! comes from. The binder reads every location, converts the raw strings
//! into the field types and stores them, so handlers stop hand-writing the
//! same extraction code per endpoint.
//!
//! ## Sources
//!
//! | Attribute | Source | Notes |
//! |-----------|--------|-------|
//! | `json = "key"` | JSON body | Decoded once for the whole struct; nested types supported |
//! | `form = "key"` | Form body | URL-encoded (`POST`/`PUT`/`PATCH`) or multipart |
//! | `file = "name"` | Multipart part | Field must be [`File`] or `Option<File>` |
//! | `file = "binary"` | Raw body | Filename from `Content-Disposition` |
//! | `header = "Name"` | Header | Case-insensitive |
//! | `query = "key"` | Query string | First value |
//! | `path = "name"` | Path parameter | Populated by the router |
//!
//! A field tagged with several non-JSON sources binds from the first one in
//! the order `form > file > header > query > path`. A value of `"-"` turns a
//! source off.
//!
//! ## Example
//!
//! ```rust
//! use reqbind::{bind, Bind, RequestContext};
//!
//! #[derive(Debug, Default, Bind)]
//! struct ListUsers {
//!     #[bind(query = "page")]
//!     page: i64,
//!     #[bind(header = "Authorization")]
//!     token: String,
//!     #[bind(query = "ids")]
//!     ids: Vec<u32>,
//!     #[bind(json = "name")]
//!     name: String,
//! }
//!
//! let mut request = RequestContext::builder()
//!     .method(http::Method::POST)
//!     .uri("/users?page=2&ids=1,2,3".parse().unwrap())
//!     .header("authorization", "Bearer x")
//!     .header("content-type", "application/json")
//!     .body(r#"{"name":"a"}"#)
//!     .build();
//!
//! let mut dest = ListUsers::default();
//! bind(&mut request, &mut dest).unwrap();
//!
//! assert_eq!(dest.page, 2);
//! assert_eq!(dest.token, "Bearer x");
//! assert_eq!(dest.ids, [1, 2, 3]);
//! assert_eq!(dest.name, "a");
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a [`BindError`]. Field-level failures name the field,
//! the source and the key; [`BindError::status_code`] maps the error to an
//! HTTP status.

#![forbid(unsafe_code)]

mod binder;
mod config;
mod context;
mod convert;
mod descriptor;
mod disposition;
mod error;
mod file;
mod form;
mod params;
mod target;

pub use binder::{bind, Binder};
pub use config::{BindConfig, ConfigError, ZeroPolicy, DEFAULT_MAX_MEMORY};
pub use context::{RequestContext, RequestContextBuilder};
pub use convert::{convert, parse_scalar, LIST_SEPARATOR};
pub use descriptor::{Bind, FieldDescriptor, FieldSlot, FieldTags, Source, BINARY, SKIP};
pub use error::{BindError, BindErrorKind, ConvertError};
pub use file::File;
pub use form::{FormData, FormPart};
pub use params::PathParams;
pub use target::{Assignment, BindTarget, ScalarKind, TypeKind, Value};

pub use num_complex::{Complex32, Complex64};

/// Derives [`Bind`](trait@Bind) for a struct with named fields.
///
/// Field attributes:
///
/// - `#[bind(query = "key", header = "Name", ...)]` sets source keys;
///   a bare source (`#[bind(query)]`) uses the field name as key.
/// - `#[bind(json)]` / `#[bind(json = "key")]` includes the field in the
///   JSON body pass. Its type must implement `Deserialize`.
/// - `#[bind(skip)]` excludes the field entirely.
///
/// Fields with a non-JSON source must implement [`BindTarget`].
pub use reqbind_macros::Bind;

/// Support items for generated code. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use serde_json;

    /// Decodes the first JSON value in `body`. Trailing bytes are ignored.
    pub fn decode_json<T: serde::de::DeserializeOwned>(
        body: &[u8],
    ) -> Result<T, serde_json::Error> {
        let mut deserializer = serde_json::Deserializer::from_slice(body);
        T::deserialize(&mut deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::__private::decode_json;

    #[test]
    fn test_decode_json_ignores_trailing_data() {
        let value: Vec<u8> = decode_json(b"[1,2] {\"next\":true}").unwrap();
        assert_eq!(value, [1, 2]);
    }

    #[test]
    fn test_decode_json_empty_body_fails() {
        assert!(decode_json::<Vec<u8>>(b"").is_err());
    }
}
