//! Field descriptors and the [`Bind`] trait.
//!
//! A destination type describes itself as an ordered table of
//! [`FieldDescriptor`]s, one per declared field. Each descriptor maps source
//! kinds to source keys through [`FieldTags`]. The table is normally produced
//! by `#[derive(Bind)]`.

use std::fmt;

use crate::target::{Assignment, BindTarget, TypeKind};
use crate::ConvertError;

/// Tag value that disables binding for a source on a field.
pub const SKIP: &str = "-";

/// Reserved `file` tag value selecting the raw request body.
pub const BINARY: &str = "binary";

/// Location in the request a field value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// JSON request body, decoded once for the whole destination.
    Json,
    /// URL-encoded or multipart form value.
    Form,
    /// Multipart file part, or the raw body when tagged `binary`.
    File,
    /// Request header.
    Header,
    /// URL query parameter.
    Query,
    /// Path parameter bound by the router.
    Path,
}

impl Source {
    /// Sources considered by the per-field loop, highest priority first.
    pub const PRECEDENCE: [Source; 5] = [
        Source::Form,
        Source::File,
        Source::Header,
        Source::Query,
        Source::Path,
    ];

    /// Returns the tag name for this source.
    #[must_use]
    pub const fn tag_name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Form => "form",
            Self::File => "file",
            Self::Header => "header",
            Self::Query => "query",
            Self::Path => "path",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// Per-field mapping from source kind to source key.
///
/// # Example
///
/// ```rust
/// use reqbind::{FieldTags, Source};
///
/// const TAGS: FieldTags = FieldTags::new()
///     .with(Source::Query, "page")
///     .with(Source::Header, "X-Page");
///
/// // Headers outrank query parameters.
/// assert_eq!(TAGS.resolve(), Some((Source::Header, "X-Page")));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldTags {
    json: Option<&'static str>,
    form: Option<&'static str>,
    file: Option<&'static str>,
    header: Option<&'static str>,
    query: Option<&'static str>,
    path: Option<&'static str>,
}

impl FieldTags {
    /// Creates an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            json: None,
            form: None,
            file: None,
            header: None,
            query: None,
            path: None,
        }
    }

    /// Returns a copy with the tag for `source` set to `value`.
    #[must_use]
    pub const fn with(self, source: Source, value: &'static str) -> Self {
        let mut tags = self;
        match source {
            Source::Json => tags.json = Some(value),
            Source::Form => tags.form = Some(value),
            Source::File => tags.file = Some(value),
            Source::Header => tags.header = Some(value),
            Source::Query => tags.query = Some(value),
            Source::Path => tags.path = Some(value),
        }
        tags
    }

    /// Returns the raw tag value for `source`, if declared.
    #[must_use]
    pub const fn get(&self, source: Source) -> Option<&'static str> {
        match source {
            Source::Json => self.json,
            Source::Form => self.form,
            Source::File => self.file,
            Source::Header => self.header,
            Source::Query => self.query,
            Source::Path => self.path,
        }
    }

    /// Returns the tag value for `source` when it is usable: declared,
    /// non-empty and not the skip marker.
    #[must_use]
    pub fn active(&self, source: Source) -> Option<&'static str> {
        self.get(source)
            .filter(|value| !value.is_empty() && *value != SKIP)
    }

    /// Returns true if the field takes part in JSON body decoding.
    #[must_use]
    pub fn has_body_tag(&self) -> bool {
        self.json.is_some_and(|value| value != SKIP)
    }

    /// Resolves the single non-JSON source that applies to the field.
    ///
    /// Precedence is `form > file > header > query > path`.
    #[must_use]
    pub fn resolve(&self) -> Option<(Source, &'static str)> {
        Source::PRECEDENCE
            .into_iter()
            .find_map(|source| self.active(source).map(|key| (source, key)))
    }
}

/// One declared field of a destination type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as declared in the struct.
    pub name: &'static str,
    /// Source tags attached to the field.
    pub tags: FieldTags,
}

impl FieldDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(name: &'static str, tags: FieldTags) -> Self {
        Self { name, tags }
    }
}

/// A mutable view of one destination field, independent of its type.
pub trait FieldSlot {
    /// Returns the conversion target kind of the field.
    fn slot_kind(&self) -> TypeKind;

    /// Resets the field to its zero value.
    fn reset(&mut self);

    /// Stores a converted value into the field.
    fn store(&mut self, value: Assignment) -> Result<(), ConvertError>;
}

impl<T: BindTarget> FieldSlot for T {
    fn slot_kind(&self) -> TypeKind {
        T::KIND
    }

    fn reset(&mut self) {
        *self = T::default();
    }

    fn store(&mut self, value: Assignment) -> Result<(), ConvertError> {
        BindTarget::assign(self, value)
    }
}

/// A destination record that request data can be bound into.
///
/// Implement with `#[derive(Bind)]`:
///
/// ```rust
/// use reqbind::{Bind, Source};
///
/// #[derive(Debug, Default, Bind)]
/// struct ListUsers {
///     #[bind(query = "page")]
///     page: u32,
///     #[bind(header = "Authorization")]
///     token: String,
///     #[bind(json = "name")]
///     name: String,
/// }
///
/// let fields = ListUsers::fields();
/// assert_eq!(fields.len(), 3);
/// assert_eq!(fields[0].tags.resolve(), Some((Source::Query, "page")));
/// assert!(fields[2].tags.has_body_tag());
/// ```
pub trait Bind {
    /// Returns the field table in declaration order.
    fn fields() -> &'static [FieldDescriptor];

    /// Returns the field at `index` if it can be bound from a non-JSON
    /// source.
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn FieldSlot>;

    /// Decodes a JSON body into the body-tagged fields.
    ///
    /// Fields missing from the document keep their current value.
    fn decode_json(&mut self, body: &[u8]) -> Result<(), serde_json::Error> {
        let _ = body;
        Ok(())
    }
}
