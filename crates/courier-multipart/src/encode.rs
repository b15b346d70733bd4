//! Multipart body encoding
//!
//! Produces bodies the extractor reads back unchanged. Non-ASCII filenames
//! are sent twice: raw in `filename` and percent-encoded in `filename*`.

use bytes::{Bytes, BytesMut};

use crate::content_type::Boundary;

/// Builder for `multipart/form-data` bodies
#[derive(Debug)]
pub struct MultipartEncoder {
    boundary: Boundary,
    buffer: BytesMut,
    fields: usize,
}

impl MultipartEncoder {
    /// Create an encoder using `boundary`
    pub fn new(boundary: Boundary) -> Self {
        Self {
            boundary,
            buffer: BytesMut::new(),
            fields: 0,
        }
    }

    /// Boundary used by this encoder
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// `Content-Type` header value for the encoded body
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Number of parts written so far
    pub fn len(&self) -> usize {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields == 0
    }

    /// Append a file part. Without a filename the part is a plain field.
    pub fn add_file(&mut self, name: &str, filename: Option<&str>, data: &[u8]) -> &mut Self {
        let mut disposition = format!("form-data; name=\"{}\"", escape_quoted(name));
        if let Some(filename) = filename {
            disposition.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
            if !filename.is_ascii() {
                disposition.push_str(&format!(
                    "; filename*=UTF-8''{}",
                    urlencoding::encode(filename)
                ));
            }
        }

        let content_type = filename.map(|_| "application/octet-stream");
        self.write_part(&disposition, content_type, data);
        self
    }

    /// Append a text field
    pub fn add_text(&mut self, name: &str, value: &str) -> &mut Self {
        let disposition = format!("form-data; name=\"{}\"", escape_quoted(name));
        self.write_part(&disposition, None, value.as_bytes());
        self
    }

    /// Write the close delimiter and return the body
    pub fn finish(mut self) -> Bytes {
        self.buffer.extend_from_slice(b"--");
        self.buffer.extend_from_slice(self.boundary.as_str().as_bytes());
        self.buffer.extend_from_slice(b"--\r\n");
        self.buffer.freeze()
    }

    fn write_part(&mut self, disposition: &str, content_type: Option<&str>, data: &[u8]) {
        self.buffer.extend_from_slice(b"--");
        self.buffer.extend_from_slice(self.boundary.as_str().as_bytes());
        self.buffer.extend_from_slice(b"\r\n");

        self.buffer.extend_from_slice(b"Content-Disposition: ");
        self.buffer.extend_from_slice(disposition.as_bytes());
        self.buffer.extend_from_slice(b"\r\n");

        if let Some(content_type) = content_type {
            self.buffer.extend_from_slice(b"Content-Type: ");
            self.buffer.extend_from_slice(content_type.as_bytes());
            self.buffer.extend_from_slice(b"\r\n");
        }

        self.buffer.extend_from_slice(b"\r\n");
        self.buffer.extend_from_slice(data);
        self.buffer.extend_from_slice(b"\r\n");
        self.fields += 1;
    }
}

/// Quoted-string body: control characters dropped, `\` and `"` escaped
fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars().filter(|c| !c.is_control()) {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
