//! `Content-Disposition` sub-header parsing
//!
//! This is the single parser used for every part. It tokenizes on `;`
//! (quote-aware), matches parameter names exactly and case-insensitively,
//! and treats `filename*` (RFC 5987) as its own parameter that takes
//! priority over `filename` when it decodes.

use crate::params::{split_param, split_params, unquote};

/// Parsed `Content-Disposition` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lowercased (`form-data`, `attachment`, ...)
    disposition_type: String,
    /// Parameters in header order; names lowercased, values unquoted
    params: Vec<(String, String)>,
}

impl ContentDisposition {
    /// Parse a header value. Never fails: unknown tokens are ignored.
    pub fn parse(value: &str) -> Self {
        let mut disposition_type = String::new();
        let mut params = Vec::new();

        for (index, segment) in split_params(value).into_iter().enumerate() {
            match split_param(segment) {
                Some((key, raw)) if !key.is_empty() => {
                    params.push((key.to_ascii_lowercase(), unquote(raw)));
                }
                Some(_) => {}
                None if index == 0 => {
                    disposition_type = segment.trim().to_ascii_lowercase();
                }
                None => {
                    tracing::trace!(segment = %segment.trim(), "Ignoring bare disposition token");
                }
            }
        }

        Self {
            disposition_type,
            params,
        }
    }

    /// Disposition type (empty when the header starts with a parameter)
    pub fn disposition_type(&self) -> &str {
        &self.disposition_type
    }

    /// First value of a parameter (exact name, case-insensitive)
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Form field name
    pub fn name(&self) -> Option<&str> {
        self.param("name").filter(|name| !name.is_empty())
    }

    /// Client-declared filename.
    ///
    /// `filename*` wins when it decodes; otherwise plain `filename`.
    /// Empty values count as absent.
    pub fn filename(&self) -> Option<String> {
        if let Some(extended) = self.param("filename*") {
            match decode_extended_value(extended) {
                Some(decoded) if !decoded.is_empty() => return Some(decoded),
                _ => {
                    tracing::debug!(value = %extended, "Undecodable filename* parameter, using filename");
                }
            }
        }

        self.param("filename")
            .map(|name| name.trim_matches(|c: char| c == ';' || c.is_whitespace()))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Decode an RFC 5987 `charset'language'percent-encoded` value.
///
/// Supports UTF-8 and ISO-8859-1; anything else yields `None`.
fn decode_extended_value(value: &str) -> Option<String> {
    let mut pieces = value.splitn(3, '\'');
    let charset = pieces.next()?.trim();
    let _language = pieces.next()?;
    let encoded = pieces.next()?;

    let bytes = urlencoding::decode_binary(encoded.as_bytes());
    if charset.eq_ignore_ascii_case("utf-8") {
        String::from_utf8(bytes.into_owned()).ok()
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}
