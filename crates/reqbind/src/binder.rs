//! The request binder.
//!
//! Binding runs in three steps:
//!
//! 1. Preconditions, checked before any body I/O.
//! 2. A single JSON decode of the body into the body-tagged fields, when the
//!    request declares a JSON body.
//! 3. A pass over the remaining fields in declaration order. Each field
//!    resolves to one source (`form > file > header > query > path`) and its
//!    raw value is converted into the field type.
//!
//! The first failure aborts the bind. Fields bound before the failure keep
//! their new values.

use std::io;

use http::header::CONTENT_DISPOSITION;
use tracing::{debug, trace};

use crate::convert::convert;
use crate::descriptor::{Bind, FieldDescriptor, FieldSlot, Source, BINARY};
use crate::disposition::ContentDisposition;
use crate::target::Assignment;
use crate::{BindConfig, BindError, ConfigError, File, RequestContext, ZeroPolicy};

/// Binds request data into [`Bind`] destinations.
///
/// # Example
///
/// ```rust
/// use reqbind::{Bind, Binder, BindConfig, RequestContext, ZeroPolicy};
///
/// #[derive(Debug, Default, Bind)]
/// struct Page {
///     #[bind(query = "page")]
///     page: u32,
///     #[bind(query = "size")]
///     size: u32,
/// }
///
/// let binder = Binder::new(BindConfig::default().with_zero_policy(ZeroPolicy::Preserve));
/// let mut request = RequestContext::builder()
///     .uri("/items?page=3".parse().unwrap())
///     .build();
///
/// let mut page = Page { page: 1, size: 20 };
/// binder.bind(&mut request, &mut page).unwrap();
///
/// assert_eq!(page.page, 3);
/// assert_eq!(page.size, 20);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Binder {
    config: BindConfig,
}

impl Binder {
    /// Creates a binder with the given configuration.
    #[must_use]
    pub fn new(config: BindConfig) -> Self {
        Self { config }
    }

    /// Creates a binder after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns the validation error if the configuration is unusable.
    pub fn try_new(config: BindConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    /// Binds `request` into `destination`.
    ///
    /// # Errors
    ///
    /// Returns the first failure. See [`BindErrorKind`](crate::BindErrorKind)
    /// for the categories.
    pub fn bind<T: Bind>(
        &self,
        request: &mut RequestContext,
        destination: &mut T,
    ) -> Result<(), BindError> {
        let type_name = std::any::type_name::<T>();
        let fields = T::fields();

        debug!(destination = type_name, fields = fields.len(), "binding request");

        match self.bind_fields(request, destination, fields) {
            Ok(()) => {
                debug!(destination = type_name, "bind complete");
                Ok(())
            }
            Err(err) => {
                debug!(destination = type_name, error = %err, "bind aborted");
                Err(err)
            }
        }
    }

    fn bind_fields<T: Bind>(
        &self,
        request: &mut RequestContext,
        destination: &mut T,
        fields: &'static [FieldDescriptor],
    ) -> Result<(), BindError> {
        if fields.is_empty() {
            return Err(BindError::invalid_destination(format!(
                "{} declares no fields",
                std::any::type_name::<T>()
            )));
        }
        let content_length = request.content_length()?;

        if content_length > 0
            && request.has_media_type(mime::APPLICATION_JSON.essence_str())
            && fields.iter().any(|field| field.tags.has_body_tag())
        {
            let body = request.take_body().unwrap_or_default();
            destination.decode_json(&body).map_err(BindError::body_decode)?;
        }

        for (index, field) in fields.iter().enumerate() {
            let Some((source, key)) = field.tags.resolve() else {
                continue;
            };
            let Some(slot) = destination.field_mut(index) else {
                continue;
            };

            trace!(field = field.name, source = %source, key, "resolving field");

            if self.config.zero_policy == ZeroPolicy::Reset {
                slot.reset();
            }

            self.bind_field(request, slot, source, key, content_length)
                .map_err(|err| err.for_field(field.name, source, key))?;
        }

        Ok(())
    }

    fn bind_field(
        &self,
        request: &mut RequestContext,
        slot: &mut dyn FieldSlot,
        source: Source,
        key: &str,
        content_length: u64,
    ) -> Result<(), BindError> {
        match source {
            Source::Form => {
                let raw = request.form_value(key, &self.config)?;
                assign(slot, raw.unwrap_or_default())
            }
            Source::File if key == BINARY => bind_binary(request, slot, content_length),
            Source::File => self.bind_part(request, slot, key),
            Source::Header => assign(slot, request.header_value(key)?.unwrap_or_default()),
            Source::Query => assign(slot, request.query(key).unwrap_or_default()),
            Source::Path => assign(slot, request.path_param(key).unwrap_or_default()),
            // decoded in one pass before the field loop
            Source::Json => Ok(()),
        }
    }

    fn bind_part(
        &self,
        request: &mut RequestContext,
        slot: &mut dyn FieldSlot,
        name: &str,
    ) -> Result<(), BindError> {
        ensure_file_kind(slot)?;

        if !request.has_media_type(mime::MULTIPART_FORM_DATA.essence_str()) {
            return Ok(());
        }

        let Some(part) = request.form_file(name, &self.config)? else {
            debug!(part = name, "multipart file not present, leaving field unset");
            return Ok(());
        };

        let content = part.read().map_err(BindError::file_read)?;
        let file = File::new(part.file_name(), part.size(), content)
            .with_content_type(part.content_type().map(str::to_string));

        slot.store(Assignment::File(file)).map_err(BindError::conversion)
    }
}

fn bind_binary(
    request: &mut RequestContext,
    slot: &mut dyn FieldSlot,
    content_length: u64,
) -> Result<(), BindError> {
    ensure_file_kind(slot)?;

    if content_length == 0 {
        debug!("empty request body, leaving binary field unset");
        return Ok(());
    }

    let disposition = request
        .header(CONTENT_DISPOSITION.as_str())
        .and_then(ContentDisposition::parse);
    let Some(file_name) = disposition.as_ref().and_then(ContentDisposition::filename) else {
        debug!("no usable Content-Disposition filename, leaving binary field unset");
        return Ok(());
    };
    trace!(
        disposition = disposition.as_ref().map_or("", ContentDisposition::kind),
        file_name = %file_name,
        "reading binary upload"
    );

    let content = request.take_body().ok_or_else(|| {
        BindError::file_read(io::Error::other("request body already consumed"))
    })?;
    let file = File::new(file_name, content_length, content);

    slot.store(Assignment::File(file)).map_err(BindError::conversion)
}

fn ensure_file_kind(slot: &dyn FieldSlot) -> Result<(), BindError> {
    let kind = slot.slot_kind();
    if kind.is_file() {
        Ok(())
    } else {
        Err(BindError::unsupported_type(kind.describe()))
    }
}

fn assign(slot: &mut dyn FieldSlot, raw: &str) -> Result<(), BindError> {
    match convert(raw, slot.slot_kind()).map_err(BindError::conversion)? {
        Some(value) => slot.store(value).map_err(BindError::conversion),
        None => Ok(()),
    }
}

/// Binds `request` into `destination` with the default configuration.
///
/// # Errors
///
/// See [`Binder::bind`].
pub fn bind<T: Bind>(request: &mut RequestContext, destination: &mut T) -> Result<(), BindError> {
    Binder::default().bind(request, destination)
}
