//! Uploaded file values.

use bytes::Bytes;

/// A file bound from a multipart part or from the raw request body.
///
/// The content is an owned copy; it never shares a buffer with the request
/// it came from.
///
/// # Example
///
/// ```rust
/// use reqbind::File;
///
/// let file = File::new("report.pdf", 4, &b"%PDF"[..]);
/// assert_eq!(file.name(), "report.pdf");
/// assert_eq!(file.extension(), Some("pdf"));
/// assert_eq!(file.size(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    name: String,
    size: u64,
    content: Bytes,
    content_type: Option<String>,
}

impl File {
    /// Creates a file value, copying `content` into a fresh buffer.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64, content: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.into(),
            size,
            content: Bytes::copy_from_slice(content.as_ref()),
            content_type: None,
        }
    }

    /// Sets the declared MIME type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    /// Returns the filename provided by the client.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared size in bytes.
    ///
    /// For multipart parts this is the part length; for binary uploads it
    /// is the request's declared content length.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the file content.
    #[must_use]
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Consumes the file and returns its content.
    #[must_use]
    pub fn into_content(self) -> Bytes {
        self.content
    }

    /// Returns the MIME type declared by the multipart part, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns true if no content was uploaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns the extension of the filename.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(_, ext)| ext)
    }
}
