//! Binding error types.
//!
//! [`BindError`] is returned by every failed bind. Field-level failures carry
//! the field name, the source kind and the source key so a failure can be
//! diagnosed without re-running the request. [`ConvertError`] describes why
//! a raw string could not be turned into the target type.

use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::{ScalarKind, Source};

/// Error produced when a raw value cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// The value is present but does not parse into the target kind.
    #[error("failed to parse {input:?} as {}: {reason}", .kind.name())]
    Parse {
        /// Target kind.
        kind: ScalarKind,
        /// The offending input.
        input: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A list element failed to convert.
    #[error("failed to convert slice element for index {index}: {source}")]
    Element {
        /// Zero-based element index.
        index: usize,
        /// Element failure.
        #[source]
        source: Box<ConvertError>,
    },

    /// The target kind cannot be bound from a request value.
    #[error("kind {0:?} is not supported")]
    Unsupported(&'static str),
}

impl ConvertError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(kind: ScalarKind, input: &str, reason: impl fmt::Display) -> Self {
        Self::Parse {
            kind,
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Wraps an element failure with its index.
    #[must_use]
    pub fn element(index: usize, source: ConvertError) -> Self {
        Self::Element {
            index,
            source: Box::new(source),
        }
    }

    /// Returns the scalar kind that failed to parse, looking through list
    /// elements.
    #[must_use]
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Parse { kind, .. } => Some(*kind),
            Self::Element { source, .. } => source.kind(),
            Self::Unsupported(_) => None,
        }
    }

    /// Returns the bit width of the failed kind, if numeric.
    #[must_use]
    pub fn bits(&self) -> Option<u32> {
        self.kind().and_then(ScalarKind::bits)
    }

    /// Returns true if the failure is a static type problem rather than a
    /// bad value.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        match self {
            Self::Unsupported(_) => true,
            Self::Element { source, .. } => source.is_unsupported(),
            Self::Parse { .. } => false,
        }
    }
}

/// Category of a [`BindError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindErrorKind {
    /// The request is unusable (checked before any I/O).
    InvalidRequest,
    /// The destination type cannot be bound into.
    InvalidDestination,
    /// The JSON body failed to decode.
    BodyDecode,
    /// The form or multipart body failed to parse.
    FormParse,
    /// An uploaded file could not be read.
    FileRead,
    /// The field type cannot be bound from its source.
    UnsupportedType,
    /// A present value failed to convert to the field type.
    Conversion,
}

/// Error returned by a failed bind.
///
/// # Example
///
/// ```rust
/// use reqbind::{BindError, BindErrorKind};
/// use http::StatusCode;
///
/// let err = BindError::invalid_destination("destination declares no fields");
/// assert_eq!(err.kind(), BindErrorKind::InvalidDestination);
/// assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
/// assert!(err.to_string().contains("no fields"));
/// ```
#[derive(Debug)]
pub struct BindError {
    kind: BindErrorKind,
    field: Option<&'static str>,
    source_kind: Option<Source>,
    key: Option<String>,
    message: String,
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl BindError {
    fn new(kind: BindErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            source_kind: None,
            key: None,
            message: message.into(),
            cause: None,
        }
    }

    fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Creates an error for an unusable request.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(BindErrorKind::InvalidRequest, message)
    }

    /// Creates an error for an unusable destination.
    #[must_use]
    pub fn invalid_destination(message: impl Into<String>) -> Self {
        Self::new(BindErrorKind::InvalidDestination, message)
    }

    /// Creates an error for a JSON body that failed to decode.
    #[must_use]
    pub fn body_decode(error: serde_json::Error) -> Self {
        Self::new(
            BindErrorKind::BodyDecode,
            format!("failed to decode request body: {error}"),
        )
        .with_cause(error)
    }

    /// Creates an error for a form body that failed to parse.
    #[must_use]
    pub fn form_parse(message: impl Into<String>) -> Self {
        Self::new(BindErrorKind::FormParse, message)
    }

    /// Creates an error for an upload that could not be read.
    #[must_use]
    pub fn file_read(error: std::io::Error) -> Self {
        Self::new(BindErrorKind::FileRead, error.to_string()).with_cause(error)
    }

    /// Creates an error for a field type that its source cannot fill.
    #[must_use]
    pub fn unsupported_type(type_name: &str) -> Self {
        Self::new(
            BindErrorKind::UnsupportedType,
            format!("type {type_name:?} is not supported"),
        )
    }

    /// Creates an error from a failed conversion.
    #[must_use]
    pub fn conversion(error: ConvertError) -> Self {
        let kind = if error.is_unsupported() {
            BindErrorKind::UnsupportedType
        } else {
            BindErrorKind::Conversion
        };
        Self::new(kind, error.to_string()).with_cause(error)
    }

    /// Attaches the field, source and key the error occurred on.
    #[must_use]
    pub fn for_field(mut self, field: &'static str, source: Source, key: &str) -> Self {
        self.field = Some(field);
        self.source_kind = Some(source);
        self.key = Some(key.to_string());
        self
    }

    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> BindErrorKind {
        self.kind
    }

    /// Returns the field name if the error is field-specific.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field
    }

    /// Returns the source kind if the error is field-specific.
    #[must_use]
    pub fn source_kind(&self) -> Option<Source> {
        self.source_kind
    }

    /// Returns the source key if the error is field-specific.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Returns the conversion failure, if that is what caused the error.
    #[must_use]
    pub fn convert_error(&self) -> Option<&ConvertError> {
        self.cause.as_deref().and_then(|e| e.downcast_ref())
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            BindErrorKind::InvalidRequest
            | BindErrorKind::BodyDecode
            | BindErrorKind::FormParse
            | BindErrorKind::FileRead
            | BindErrorKind::Conversion => StatusCode::BAD_REQUEST,
            BindErrorKind::InvalidDestination | BindErrorKind::UnsupportedType => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            BindErrorKind::InvalidRequest => "INVALID_REQUEST",
            BindErrorKind::InvalidDestination => "INVALID_DESTINATION",
            BindErrorKind::BodyDecode => "BODY_DECODE_FAILED",
            BindErrorKind::FormParse => "FORM_PARSE_FAILED",
            BindErrorKind::FileRead => "FILE_READ_FAILED",
            BindErrorKind::UnsupportedType => "UNSUPPORTED_TYPE",
            BindErrorKind::Conversion => "CONVERSION_FAILED",
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.field, self.source_kind, &self.key) {
            (Some(field), Some(source), Some(key)) => write!(
                f,
                "failed to bind {key:?} {source} to {field:?} field: {}",
                self.message
            ),
            _ => f.write_str(&self.message),
        }
    }
}

impl StdError for BindError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_context() {
        let err = ConvertError::parse(ScalarKind::I8, "300", "number too large");
        assert_eq!(err.kind(), Some(ScalarKind::I8));
        assert_eq!(err.bits(), Some(8));
        assert!(err.to_string().contains("\"300\""));
        assert!(err.to_string().contains("i8"));
    }

    #[test]
    fn test_element_error_carries_index() {
        let inner = ConvertError::parse(ScalarKind::U32, "x", "invalid digit");
        let err = ConvertError::element(2, inner);
        assert_eq!(err.kind(), Some(ScalarKind::U32));
        assert!(err.to_string().contains("index 2"));
        assert!(!err.is_unsupported());
    }

    #[test]
    fn test_conversion_error_for_field() {
        let err = BindError::conversion(ConvertError::parse(ScalarKind::I32, "abc", "bad"))
            .for_field("page", Source::Query, "page");

        assert_eq!(err.kind(), BindErrorKind::Conversion);
        assert_eq!(err.field(), Some("page"));
        assert_eq!(err.source_kind(), Some(Source::Query));
        assert_eq!(err.key(), Some("page"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "CONVERSION_FAILED");
        assert!(err.to_string().starts_with("failed to bind \"page\" query to \"page\" field"));
        assert_eq!(err.convert_error().and_then(ConvertError::kind), Some(ScalarKind::I32));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unsupported_conversion_maps_to_unsupported_type() {
        let err = BindError::conversion(ConvertError::Unsupported("slice of slice"));
        assert_eq!(err.kind(), BindErrorKind::UnsupportedType);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("slice of slice"));
    }

    #[test]
    fn test_precondition_errors() {
        let err = BindError::invalid_request("bad content length");
        assert_eq!(err.kind(), BindErrorKind::InvalidRequest);
        assert_eq!(err.error_code(), "INVALID_REQUEST");
        assert_eq!(err.field(), None);
        assert_eq!(err.to_string(), "bad content length");
    }

    #[test]
    fn test_file_read_error() {
        let err = BindError::file_read(std::io::Error::other("disk gone"));
        assert_eq!(err.kind(), BindErrorKind::FileRead);
        assert!(err.to_string().contains("disk gone"));
    }
}
