//! Request data the binder reads from.
//!
//! [`RequestContext`] wraps a buffered HTTP request. Query parsing and form
//! parsing are lazy and happen at most once per context; reading the body,
//! directly or through form parsing, consumes it.

use std::cell::OnceCell;

use bytes::Bytes;
use http::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, Uri};

use crate::form::{self, FormData, FormPart};
use crate::{BindConfig, BindError, PathParams};

/// Buffered request data plus the path parameters matched by a router.
///
/// # Example
///
/// ```rust
/// use reqbind::RequestContext;
/// use http::Method;
///
/// let ctx = RequestContext::builder()
///     .method(Method::GET)
///     .uri("/users/42?tab=posts&tab=likes".parse().unwrap())
///     .header("authorization", "Bearer x")
///     .path_param("id", "42")
///     .build();
///
/// assert_eq!(ctx.query("tab"), Some("posts"));
/// assert_eq!(ctx.header("Authorization"), Some("Bearer x"));
/// assert_eq!(ctx.path_param("id"), Some("42"));
/// ```
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
    path_params: PathParams,
    query: OnceCell<Vec<(String, String)>>,
    form: Option<FormData>,
}

impl RequestContext {
    /// Creates a context.
    #[must_use]
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        path_params: PathParams,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body: Some(body),
            path_params,
            query: OnceCell::new(),
            form: None,
        }
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::new()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the path parameters.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Returns a mutable reference to path parameters.
    pub fn path_params_mut(&mut self) -> &mut PathParams {
        &mut self.path_params
    }

    /// Returns the first value of a header. Lookup is case-insensitive.
    ///
    /// Values are decoded as UTF-8; a value that is not valid UTF-8 reads
    /// as absent here. Use [`header_value`](Self::header_value) to tell the
    /// two apart.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_value(name).ok().flatten()
    }

    /// Returns the first value of a header, decoded as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRequest` error if the header is present but its
    /// value is not valid UTF-8.
    pub fn header_value(&self, name: &str) -> Result<Option<&str>, BindError> {
        let Some(value) = self.headers.get(name) else {
            return Ok(None);
        };
        std::str::from_utf8(value.as_bytes())
            .map(Some)
            .map_err(|_| BindError::invalid_request(format!("header {name} is not valid UTF-8")))
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// Returns true if the Content-Type essence equals `essence`, ignoring
    /// parameters and case.
    #[must_use]
    pub fn has_media_type(&self, essence: &str) -> bool {
        self.content_type().is_some_and(|value| {
            let base = value.split_once(';').map_or(value, |(base, _)| base);
            base.trim().eq_ignore_ascii_case(essence)
        })
    }

    /// Returns the declared body length.
    ///
    /// Falls back to the buffered body length when no `Content-Length`
    /// header is present.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRequest` error if the header is not a decimal
    /// integer.
    pub fn content_length(&self) -> Result<u64, BindError> {
        match self.headers.get(CONTENT_LENGTH) {
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .ok_or_else(|| {
                    BindError::invalid_request(format!("invalid content length {value:?}"))
                }),
            None => Ok(self.body.as_ref().map_or(0, |body| body.len() as u64)),
        }
    }

    /// Returns the first value of a query parameter, percent-decoded.
    ///
    /// Decoded bytes that are not valid UTF-8 are replaced with U+FFFD.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_pairs()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn query_pairs(&self) -> &[(String, String)] {
        self.query.get_or_init(|| {
            self.uri
                .query()
                .and_then(|q| serde_urlencoded::from_str(q).ok())
                .unwrap_or_default()
        })
    }

    /// Returns a path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Returns true if the body has not been consumed.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Takes the body. Later calls return `None`.
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Parses the form body on first use and returns it.
    ///
    /// URL-encoded bodies are read for `POST`, `PUT` and `PATCH` only;
    /// multipart bodies for any method. Other content types yield an empty
    /// form. Parsing consumes the body.
    ///
    /// # Errors
    ///
    /// Returns a `FormParse` error if the body is malformed.
    pub fn form(&mut self, config: &BindConfig) -> Result<&FormData, BindError> {
        if self.form.is_none() {
            let parsed = self.parse_form(config)?;
            self.form = Some(parsed);
        }
        Ok(self.form.get_or_insert_with(FormData::default))
    }

    fn parse_form(&mut self, config: &BindConfig) -> Result<FormData, BindError> {
        if self.has_media_type(mime::MULTIPART_FORM_DATA.essence_str()) {
            let content_type = self.content_type().unwrap_or_default().to_string();
            let body = self.take_body().unwrap_or_default();
            return form::parse_multipart(&content_type, body, config);
        }

        let reads_urlencoded = matches!(self.method, Method::POST | Method::PUT | Method::PATCH);
        if reads_urlencoded
            && self.has_media_type(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
        {
            let body = self.take_body().unwrap_or_default();
            return form::parse_urlencoded(&body);
        }

        Ok(FormData::default())
    }

    /// Returns the first form value under `key`, parsing the form if needed.
    ///
    /// # Errors
    ///
    /// Returns a `FormParse` error if the body is malformed.
    pub fn form_value(&mut self, key: &str, config: &BindConfig) -> Result<Option<&str>, BindError> {
        Ok(self.form(config)?.value(key))
    }

    /// Returns the first multipart file part under `name`, parsing the form
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns a `FormParse` error if the body is malformed.
    pub fn form_file(
        &mut self,
        name: &str,
        config: &BindConfig,
    ) -> Result<Option<&FormPart>, BindError> {
        Ok(self.form(config)?.file(name))
    }
}

impl<B: Into<Bytes>> From<http::Request<B>> for RequestContext {
    fn from(request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(
            parts.method,
            parts.uri,
            parts.headers,
            body.into(),
            PathParams::new(),
        )
    }
}

/// Builder for constructing a [`RequestContext`].
///
/// Method and URI default to `GET` and `/`.
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Bytes,
    path_params: PathParams,
}

impl RequestContextBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Sets the headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the path parameters.
    #[must_use]
    pub fn path_params(mut self, params: PathParams) -> Self {
        self.path_params = params;
        self
    }

    /// Adds a single path parameter.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name, value);
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext::new(
            self.method.unwrap_or(Method::GET),
            self.uri.unwrap_or_else(|| Uri::from_static("/")),
            self.headers,
            self.body,
            self.path_params,
        )
    }
}
