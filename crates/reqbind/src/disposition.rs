//! `Content-Disposition` header parsing.
//!
//! Only what binary uploads need: the disposition type, its parameters, and
//! the client filename (RFC 6266), including the extended `filename*` form
//! (RFC 5987).

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// A parsed `Content-Disposition` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentDisposition {
    kind: String,
    params: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a header value. Returns `None` on any syntax error.
    pub(crate) fn parse(value: &str) -> Option<Self> {
        let (kind, mut rest) = match value.split_once(';') {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (value, None),
        };

        let kind = kind.trim();
        if !is_token(kind) {
            return None;
        }

        let mut params = HashMap::new();
        while let Some(input) = rest {
            let input = input.trim_start();
            if input.is_empty() {
                // trailing ';'
                break;
            }

            let (key, value, remainder) = parse_param(input)?;
            if params.insert(key, value).is_some() {
                return None;
            }
            rest = remainder;
        }

        Some(Self {
            kind: kind.to_ascii_lowercase(),
            params,
        })
    }

    /// Returns the lowercased disposition type, e.g. `attachment`.
    pub(crate) fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns a parameter by lowercase name.
    pub(crate) fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns the client filename, preferring `filename*` when it decodes.
    pub(crate) fn filename(&self) -> Option<String> {
        self.param("filename*")
            .and_then(decode_ext_value)
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.param("filename")
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
    }
}

/// Parses `key=value` at the start of `input`, returning the input after the
/// next `;` if there is one.
fn parse_param(input: &str) -> Option<(String, String, Option<&str>)> {
    let key_end = input.find(|c| !is_token_char(c)).unwrap_or(input.len());
    let key = &input[..key_end];
    if key.is_empty() {
        return None;
    }

    let after_key = input[key_end..].trim_start().strip_prefix('=')?.trim_start();

    let (value, after_value) = if let Some(quoted) = after_key.strip_prefix('"') {
        parse_quoted(quoted)?
    } else {
        let end = after_key
            .find(|c| !is_token_char(c))
            .unwrap_or(after_key.len());
        if end == 0 {
            return None;
        }
        (after_key[..end].to_string(), &after_key[end..])
    };

    let after_value = after_value.trim_start();
    let rest = if after_value.is_empty() {
        None
    } else {
        Some(after_value.strip_prefix(';')?)
    };

    Some((key.to_ascii_lowercase(), value, rest))
}

/// Reads a quoted-string body (after the opening quote).
fn parse_quoted(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Some((value, &input[index + 1..])),
            '\\' => value.push(chars.next()?.1),
            c => value.push(c),
        }
    }
    None
}

/// Decodes an RFC 5987 `charset'language'percent-encoded` value.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;

    if charset.eq_ignore_ascii_case("utf-8") {
        percent_decode_str(encoded)
            .decode_utf8()
            .ok()
            .map(|decoded| decoded.into_owned())
    } else if charset.eq_ignore_ascii_case("iso-8859-1") || charset.eq_ignore_ascii_case("us-ascii") {
        Some(percent_decode_str(encoded).map(char::from).collect())
    } else {
        None
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
}
