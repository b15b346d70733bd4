//! `Content-Type` header parsing
//!
//! Only what extraction needs: the media type token and the `boundary`
//! parameter. Parsing never fails; a value that cannot be understood simply
//! has no boundary.

use std::fmt;

use crate::params::{split_param, split_params, unquote};

/// Multipart boundary declared by a `Content-Type` header.
///
/// Used verbatim to split the body. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    /// Create a boundary, rejecting the empty string
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Boundary value as declared
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Delimiter bytes as they appear in the body (`--` + boundary)
    pub fn delimiter(&self) -> Vec<u8> {
        let mut delimiter = Vec::with_capacity(self.0.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(self.0.as_bytes());
        delimiter
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed `Content-Type` header value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Lowercased media type, e.g. `multipart/form-data`
    media_type: String,
    /// Parameters in header order, values unquoted
    params: Vec<(String, String)>,
}

impl ContentType {
    /// Parse a header value of the form `<media-type>[; <param>=<value>]*`
    pub fn parse(value: &str) -> Self {
        let mut segments = split_params(value).into_iter();
        let media_type = segments
            .next()
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let params = segments
            .filter_map(split_param)
            .map(|(key, value)| (key.to_string(), unquote(value)))
            .collect();

        Self { media_type, params }
    }

    /// Media type token (lowercase)
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Check if the media type is any `multipart/*` type
    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }

    /// Check if the media type is exactly `multipart/form-data`
    pub fn is_form_data(&self) -> bool {
        self.media_type == "multipart/form-data"
    }

    /// Look up a parameter by exact (case-insensitive) name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Boundary parameter.
    ///
    /// The first parameter whose name contains `boundary` (any case) wins,
    /// so a malformed header with repeated boundaries resolves to the first
    /// one. The value keeps its case. An empty value yields `None`.
    pub fn boundary(&self) -> Option<Boundary> {
        self.params
            .iter()
            .find(|(key, _)| key.to_ascii_lowercase().contains("boundary"))
            .and_then(|(_, value)| Boundary::new(value.clone()))
    }
}
