//! Boundary-based multipart body splitting
//!
//! Framing follows RFC 2046 with a few permissive twists:
//! - a delimiter is `--boundary` at the start of the body or of a line,
//!   followed by optional transport padding and a line break, `--`, or the
//!   end of the body
//! - the line break before a delimiter belongs to the delimiter
//! - a missing close delimiter lets the last part run to the end of the body
//! - a bare LF is accepted wherever CRLF is expected

use bytes::Bytes;

use crate::content_type::Boundary;
use crate::headers::PartHeaders;

/// One part of a multipart body
#[derive(Debug, Clone)]
pub struct Part {
    headers: PartHeaders,
    data: Bytes,
    name: Option<String>,
    filename: Option<String>,
}

impl Part {
    fn new(headers: PartHeaders, data: Bytes) -> Self {
        let disposition = headers.content_disposition();
        let name = disposition
            .as_ref()
            .and_then(|cd| cd.name().map(str::to_string));
        let filename = disposition.as_ref().and_then(|cd| cd.filename());

        Self {
            headers,
            data,
            name,
            filename,
        }
    }

    /// Part headers
    pub fn headers(&self) -> &PartHeaders {
        &self.headers
    }

    /// Part body bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the part, returning its body bytes
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Form field name from `Content-Disposition`
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared filename from `Content-Disposition`
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Part `Content-Type`
    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }

    /// Check if the part declares a filename
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Consume the part into `(bytes, filename)`
    pub fn into_upload(self) -> (Bytes, Option<String>) {
        (self.data, self.filename)
    }
}

/// Multipart parser bound to one boundary
#[derive(Debug, Clone)]
pub struct MultipartParser {
    boundary: Boundary,
    delimiter: Vec<u8>,
}

impl MultipartParser {
    /// Create a parser for the given boundary
    pub fn new(boundary: Boundary) -> Self {
        let delimiter = boundary.delimiter();
        Self {
            boundary,
            delimiter,
        }
    }

    /// Boundary this parser splits on
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Split a body into parts in physical order.
    ///
    /// Returns an empty list both for a body with no delimiter and for a
    /// body holding only the close delimiter; see [`MultipartParser::try_parts`].
    pub fn parts(&self, body: &Bytes) -> Vec<Part> {
        self.try_parts(body).unwrap_or_default()
    }

    /// Like [`MultipartParser::parts`], but `None` when no delimiter occurs
    /// anywhere in the body. `Some(vec![])` means the body is framed but
    /// carries no parts.
    pub fn try_parts(&self, body: &Bytes) -> Option<Vec<Part>> {
        let mut parts = Vec::new();

        let Some(mut delimiter_at) = self.find_delimiter(body, 0) else {
            tracing::debug!(boundary = %self.boundary, "No multipart delimiter found in body");
            return None;
        };

        if delimiter_at > 0 {
            tracing::trace!(preamble_len = delimiter_at, "Discarding multipart preamble");
        }

        loop {
            let after_delimiter = delimiter_at + self.delimiter.len();
            if body[after_delimiter..].starts_with(b"--") {
                break;
            }

            let content_start = skip_line_break(body, skip_padding(body, after_delimiter));
            let next = self.find_delimiter(body, content_start);
            let content_end = match next {
                Some(at) => (at - line_break_before(body, at)).max(content_start),
                None => body.len(),
            };

            if content_start < content_end {
                parts.push(split_part(body.slice(content_start..content_end)));
            } else {
                tracing::trace!(offset = content_start, "Skipping empty multipart segment");
            }

            match next {
                Some(at) => delimiter_at = at,
                None => {
                    tracing::debug!(
                        parts = parts.len(),
                        "Multipart body ended without a close delimiter"
                    );
                    break;
                }
            }
        }

        Some(parts)
    }

    /// Find the next delimiter line starting at or after `from`
    fn find_delimiter(&self, body: &[u8], from: usize) -> Option<usize> {
        let mut search = from;
        while search + self.delimiter.len() <= body.len() {
            let offset = find_subslice(&body[search..], &self.delimiter)?;
            let at = search + offset;

            let at_line_start = at == 0 || body[at - 1] == b'\n';
            if at_line_start && ends_delimiter_line(&body[at + self.delimiter.len()..]) {
                return Some(at);
            }
            search = at + 1;
        }
        None
    }
}

/// Split a segment into its header block and body.
fn split_part(segment: Bytes) -> Part {
    if segment.starts_with(b"\r\n") {
        return Part::new(PartHeaders::default(), segment.slice(2..));
    }
    if segment.starts_with(b"\n") {
        return Part::new(PartHeaders::default(), segment.slice(1..));
    }

    let terminator = find_subslice(&segment, b"\r\n\r\n")
        .map(|at| (at, 4))
        .or_else(|| find_subslice(&segment, b"\n\n").map(|at| (at, 2)));

    match terminator {
        Some((at, len)) => {
            let headers = PartHeaders::parse(&segment[..at]);
            Part::new(headers, segment.slice(at + len..))
        }
        None => {
            tracing::debug!(len = segment.len(), "Part has no header terminator, treating as body");
            Part::new(PartHeaders::default(), segment)
        }
    }
}

/// A delimiter must be followed by `--`, padding then a line break, or EOF.
fn ends_delimiter_line(rest: &[u8]) -> bool {
    if rest.starts_with(b"--") {
        return true;
    }
    let rest = &rest[skip_padding(rest, 0)..];
    rest.is_empty() || rest[0] == b'\r' || rest[0] == b'\n'
}

fn skip_padding(body: &[u8], mut pos: usize) -> usize {
    while pos < body.len() && (body[pos] == b' ' || body[pos] == b'\t') {
        pos += 1;
    }
    pos
}

fn skip_line_break(body: &[u8], pos: usize) -> usize {
    if body[pos..].starts_with(b"\r\n") {
        pos + 2
    } else if body[pos..].starts_with(b"\n") {
        pos + 1
    } else {
        pos
    }
}

fn line_break_before(body: &[u8], at: usize) -> usize {
    if at >= 2 && &body[at - 2..at] == b"\r\n" {
        2
    } else if at >= 1 && body[at - 1] == b'\n' {
        1
    } else {
        0
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
