//! Upload extraction entry points

use std::io::Read;
use std::ops::Deref;

use bytes::Bytes;

use crate::content_type::ContentType;
use crate::error::Result;
use crate::parser::MultipartParser;

/// One extracted upload: body bytes plus the declared filename, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub data: Bytes,
    pub filename: Option<String>,
}

impl UploadedPart {
    pub fn new(data: impl Into<Bytes>, filename: Option<String>) -> Self {
        Self {
            data: data.into(),
            filename,
        }
    }

    /// Anonymous upload (no declared filename)
    pub fn anonymous(data: impl Into<Bytes>) -> Self {
        Self::new(data, None)
    }
}

/// Ordered extraction result.
///
/// Order follows the physical order of parts in the body. Parts that share
/// a declared filename are all kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadResult {
    parts: Vec<UploadedPart>,
}

impl UploadResult {
    fn single(body: Bytes) -> Self {
        Self {
            parts: vec![UploadedPart::anonymous(body)],
        }
    }

    /// Total payload bytes across all parts
    pub fn total_bytes(&self) -> usize {
        self.parts.iter().map(|part| part.data.len()).sum()
    }

    /// Consume into `(bytes, filename)` pairs
    pub fn into_pairs(self) -> Vec<(Bytes, Option<String>)> {
        self.parts
            .into_iter()
            .map(|part| (part.data, part.filename))
            .collect()
    }

    pub fn into_parts(self) -> Vec<UploadedPart> {
        self.parts
    }
}

impl Deref for UploadResult {
    type Target = [UploadedPart];

    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}

impl IntoIterator for UploadResult {
    type Item = UploadedPart;
    type IntoIter = std::vec::IntoIter<UploadedPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

impl FromIterator<UploadedPart> for UploadResult {
    fn from_iter<I: IntoIterator<Item = UploadedPart>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

/// Extract uploads from a request body.
///
/// Falls back to a single anonymous part when:
/// - there is no `Content-Type`
/// - the media type is not `multipart/*`
/// - the boundary parameter is missing or empty
/// - the boundary never occurs in the body
///
/// A framed body with no parts (only the close delimiter) yields an empty
/// result.
pub fn extract(body: impl Into<Bytes>, content_type: Option<&str>) -> UploadResult {
    let body = body.into();

    let Some(content_type) = content_type.map(ContentType::parse) else {
        tracing::trace!(len = body.len(), "No Content-Type, treating body as a single file");
        return UploadResult::single(body);
    };

    if !content_type.is_multipart() {
        tracing::trace!(
            media_type = %content_type.media_type(),
            "Non-multipart body, treating as a single file"
        );
        return UploadResult::single(body);
    }

    let Some(boundary) = content_type.boundary() else {
        tracing::warn!(
            media_type = %content_type.media_type(),
            "Multipart Content-Type without a usable boundary, treating body as a single file"
        );
        return UploadResult::single(body);
    };

    let Some(parts) = MultipartParser::new(boundary).try_parts(&body) else {
        tracing::warn!(
            len = body.len(),
            "Declared multipart boundary not found in body, treating body as a single file"
        );
        return UploadResult::single(body);
    };

    tracing::debug!(parts = parts.len(), "Extracted multipart uploads");
    parts
        .into_iter()
        .map(|part| {
            let (data, filename) = part.into_upload();
            UploadedPart::new(data, filename)
        })
        .collect()
}

/// Drain `reader` and extract uploads from the collected body.
///
/// The only failure is an I/O error from the reader itself.
pub fn read_and_extract<R: Read>(mut reader: R, content_type: Option<&str>) -> Result<UploadResult> {
    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;
    Ok(extract(body, content_type))
}
