//! URL-encoded and multipart form parsing.
//!
//! Both parsers run over a fully buffered body. Multipart parsing drives
//! `multer` to completion on the calling thread and reads each part in
//! chunks. File parts that outgrow the in-memory budget are spooled to
//! anonymous temporary files; in-memory parts are copied out of the request
//! buffer, so the parsed form never keeps the body alive.
//!
//! Values are decoded as UTF-8. Invalid sequences, raw or percent-encoded,
//! are replaced with U+FFFD.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};

use bytes::{Bytes, BytesMut};
use futures_executor::block_on;
use tracing::debug;

use crate::{BindConfig, BindError};

/// Parsed form body: repeated values per key plus named file parts.
///
/// Values that are not valid UTF-8 hold U+FFFD in place of the invalid
/// bytes.
#[derive(Debug, Default)]
pub struct FormData {
    values: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<FormPart>>,
}

impl FormData {
    /// Returns the first value submitted under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value submitted under `key`.
    #[must_use]
    pub fn values(&self, key: &str) -> &[String] {
        self.values.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns the first file part submitted under `name`.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FormPart> {
        self.files.get(name).and_then(|parts| parts.first())
    }

    /// Returns true if the form holds neither values nor files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.files.is_empty()
    }
}

#[derive(Debug)]
enum PartData {
    Memory(Bytes),
    Spooled(std::fs::File),
}

/// A file part of a multipart body.
#[derive(Debug)]
pub struct FormPart {
    file_name: String,
    size: u64,
    content_type: Option<String>,
    data: PartData,
}

impl FormPart {
    /// Returns the client filename.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the part length in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the part's `Content-Type`, if declared.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns true if the part was written to a temporary file.
    #[must_use]
    pub fn is_spooled(&self) -> bool {
        matches!(self.data, PartData::Spooled(_))
    }

    /// Reads the whole part.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a spooled part cannot be read back.
    pub fn read(&self) -> io::Result<Bytes> {
        match &self.data {
            PartData::Memory(bytes) => Ok(bytes.clone()),
            PartData::Spooled(file) => {
                let mut file = file;
                file.seek(SeekFrom::Start(0))?;
                let mut content = Vec::new();
                file.read_to_end(&mut content)?;
                Ok(Bytes::from(content))
            }
        }
    }
}

/// Parses an `application/x-www-form-urlencoded` body.
pub(crate) fn parse_urlencoded(body: &[u8]) -> Result<FormData, BindError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| BindError::form_parse(format!("failed to parse form body: {e}")))?;

    let mut form = FormData::default();
    for (key, value) in pairs {
        form.values.entry(key).or_default().push(value);
    }
    Ok(form)
}

/// Parses a `multipart/form-data` body.
pub(crate) fn parse_multipart(
    content_type: &str,
    body: Bytes,
    config: &BindConfig,
) -> Result<FormData, BindError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| BindError::form_parse(format!("invalid multipart content type: {e}")))?;

    let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
    let multipart = multer::Multipart::new(stream, boundary);

    block_on(collect_parts(multipart, config))
}

async fn collect_parts(
    mut multipart: multer::Multipart<'_>,
    config: &BindConfig,
) -> Result<FormData, BindError> {
    let mut form = FormData::default();
    let mut budget = Budget {
        files: config.max_memory,
        total: config.value_memory_limit(),
    };

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().filter(|n| !n.is_empty()).map(str::to_string) else {
            continue;
        };
        let file_name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let content_type = field.content_type().map(ToString::to_string);

        let Some(file_name) = file_name else {
            let content = read_value(&mut field, &mut budget.total).await?;
            let value = String::from_utf8_lossy(&content).into_owned();
            form.values.entry(name).or_default().push(value);
            continue;
        };

        let (data, size) = read_file(&mut field, &mut budget).await?;
        if matches!(data, PartData::Spooled(_)) {
            debug!(part = %name, file_name = %file_name, size, "spooled multipart file to disk");
        }

        form.files.entry(name).or_default().push(FormPart {
            file_name,
            size,
            content_type,
            data,
        });
    }

    Ok(form)
}

/// Remaining in-memory allowance while reading a multipart body.
///
/// `files` bounds file parts kept in memory. `total` bounds values plus
/// in-memory file parts.
struct Budget {
    files: u64,
    total: u64,
}

async fn read_value(
    field: &mut multer::Field<'_>,
    remaining: &mut u64,
) -> Result<Vec<u8>, BindError> {
    let mut content = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        let len = chunk.len() as u64;
        if len > *remaining {
            return Err(BindError::form_parse("multipart: message too large"));
        }
        *remaining -= len;
        content.extend_from_slice(&chunk);
    }
    Ok(content)
}

/// Reads a file part chunk by chunk, switching to a temporary file as soon
/// as the part outgrows the in-memory budget.
async fn read_file(
    field: &mut multer::Field<'_>,
    budget: &mut Budget,
) -> Result<(PartData, u64), BindError> {
    let limit = budget.files.min(budget.total);
    let mut buffer = BytesMut::new();
    let mut spooled: Option<std::fs::File> = None;
    let mut size = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        size += chunk.len() as u64;
        match spooled.as_mut() {
            Some(file) => write_spool(file, &chunk)?,
            None if size > limit => {
                let mut file = tempfile::tempfile().map_err(|e| {
                    BindError::form_parse(format!("failed to create temporary file: {e}"))
                })?;
                write_spool(&mut file, &buffer)?;
                write_spool(&mut file, &chunk)?;
                buffer = BytesMut::new();
                spooled = Some(file);
            }
            None => buffer.extend_from_slice(&chunk),
        }
    }

    match spooled {
        Some(file) => Ok((PartData::Spooled(file), size)),
        None => {
            budget.files -= size;
            budget.total -= size;
            Ok((PartData::Memory(buffer.freeze()), size))
        }
    }
}

fn write_spool(file: &mut std::fs::File, content: &[u8]) -> Result<(), BindError> {
    file.write_all(content)
        .map_err(|e| BindError::form_parse(format!("failed to spool multipart file: {e}")))
}

fn multipart_error(error: multer::Error) -> BindError {
    BindError::form_parse(format!("failed to parse multipart form: {error}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn create_multipart_body(
        boundary: &str,
        parts: &[(&str, &str, Option<&str>, &[u8])],
    ) -> Vec<u8> {
        let mut body = Vec::new();

        for (name, content_type, filename, data) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());

            if let Some(fname) = filename {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{fname}\"\r\n"
                    )
                    .as_bytes(),
                );
            } else {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
                );
            }

            body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    const BOUNDARY: &str = "----ReqbindBoundary";

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    #[test]
    fn test_urlencoded_repeated_keys() {
        let form = parse_urlencoded(b"tag=a&tag=b&name=J%C3%BCrgen+S").unwrap();
        assert_eq!(form.value("tag"), Some("a"));
        assert_eq!(form.values("tag"), ["a", "b"]);
        assert_eq!(form.value("name"), Some("Jürgen S"));
        assert_eq!(form.value("missing"), None);
        assert!(form.values("missing").is_empty());
    }

    #[test]
    fn test_urlencoded_empty_body() {
        let form = parse_urlencoded(b"").unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn test_multipart_values_and_files() {
        let body = create_multipart_body(
            BOUNDARY,
            &[
                ("title", "text/plain", None, b"Quarterly"),
                ("doc", "application/pdf", Some("q3.pdf"), b"%PDF-1.7"),
                ("title", "text/plain", None, b"ignored"),
            ],
        );

        let form = parse_multipart(&content_type(), Bytes::from(body), &BindConfig::default())
            .unwrap();

        assert_eq!(form.value("title"), Some("Quarterly"));
        assert_eq!(form.values("title").len(), 2);

        let part = form.file("doc").unwrap();
        assert_eq!(part.file_name(), "q3.pdf");
        assert_eq!(part.size(), 8);
        assert_eq!(part.content_type(), Some("application/pdf"));
        assert!(!part.is_spooled());
        assert_eq!(part.read().unwrap(), Bytes::from_static(b"%PDF-1.7"));

        assert!(form.file("title").is_none());
    }

    #[test]
    fn test_multipart_spools_parts_over_budget() {
        let body = create_multipart_body(
            BOUNDARY,
            &[
                ("small", "text/plain", Some("a.txt"), b"abcd"),
                ("large", "text/plain", Some("b.txt"), b"0123456789"),
            ],
        );
        let config = BindConfig::default().with_max_memory(8);

        let form = parse_multipart(&content_type(), Bytes::from(body), &config).unwrap();

        let small = form.file("small").unwrap();
        assert!(!small.is_spooled());

        let large = form.file("large").unwrap();
        assert!(large.is_spooled());
        assert_eq!(large.size(), 10);
        assert_eq!(large.read().unwrap(), Bytes::from_static(b"0123456789"));
        // reading twice starts over
        assert_eq!(large.read().unwrap().len(), 10);
    }

    #[test]
    fn test_multipart_values_over_budget() {
        let config = BindConfig::default().with_max_memory(1);
        let fits = vec![b'x'; 64];
        let body = create_multipart_body(BOUNDARY, &[("note", "text/plain", None, &fits)]);
        let form = parse_multipart(&content_type(), Bytes::from(body), &config).unwrap();
        assert_eq!(form.value("note").map(str::len), Some(64));

        let limit = usize::try_from(config.value_memory_limit()).unwrap();
        let too_big = vec![b'x'; limit + 1];
        let body = create_multipart_body(BOUNDARY, &[("note", "text/plain", None, &too_big)]);
        let err = parse_multipart(&content_type(), Bytes::from(body), &config).unwrap_err();
        assert_eq!(err.kind(), crate::BindErrorKind::FormParse);
        assert!(err.to_string().contains("message too large"));
    }

    #[test]
    fn test_multipart_memory_files_count_against_value_budget() {
        let config = BindConfig::default().with_max_memory(4);
        let limit = usize::try_from(config.value_memory_limit()).unwrap();
        let value = vec![b'x'; limit - 3];

        let body = create_multipart_body(BOUNDARY, &[("note", "text/plain", None, &value)]);
        assert!(parse_multipart(&content_type(), Bytes::from(body), &config).is_ok());

        let body = create_multipart_body(
            BOUNDARY,
            &[
                ("doc", "text/plain", Some("a.txt"), b"abcd"),
                ("note", "text/plain", None, &value),
            ],
        );
        let err = parse_multipart(&content_type(), Bytes::from(body), &config).unwrap_err();
        assert!(err.to_string().contains("message too large"));
    }

    #[test]
    fn test_multipart_memory_parts_do_not_borrow_the_body() {
        let body = Bytes::from(create_multipart_body(
            BOUNDARY,
            &[("doc", "text/plain", Some("a.txt"), b"abcd")],
        ));
        let body_range = body.as_ptr_range();

        let form = parse_multipart(&content_type(), body.clone(), &BindConfig::default()).unwrap();
        let content = form.file("doc").unwrap().read().unwrap();

        assert_eq!(content, Bytes::from_static(b"abcd"));
        assert!(!body_range.contains(&content.as_ptr()));
    }

    #[test]
    fn test_multipart_bad_boundary() {
        let err = parse_multipart("multipart/form-data", Bytes::new(), &BindConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::BindErrorKind::FormParse);
    }

    #[test]
    fn test_multipart_truncated_body() {
        let body = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nxyz");
        let err = parse_multipart(&content_type(), Bytes::from(body), &BindConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::BindErrorKind::FormParse);
    }
}
