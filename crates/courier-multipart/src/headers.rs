//! Part header block parsing

use crate::disposition::ContentDisposition;

/// Headers of a single multipart part.
///
/// Keeps header order and original name casing; lookups are
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    entries: Vec<(String, String)>,
}

impl PartHeaders {
    /// Parse a header block (without the terminating blank line).
    ///
    /// Lines are split on CRLF (a bare LF is tolerated). Lines without a
    /// `:` are skipped. Lines starting with a space or tab continue the
    /// previous header value. Invalid UTF-8 is replaced, not rejected.
    pub fn parse(block: &[u8]) -> Self {
        let text = String::from_utf8_lossy(block);
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = entries.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            match line.split_once(':') {
                Some((name, value)) => {
                    entries.push((name.trim().to_string(), value.trim().to_string()));
                }
                None => {
                    tracing::trace!(line = %line, "Skipping part header line without ':'");
                }
            }
        }

        Self { entries }
    }

    /// First value of a header (case-insensitive name)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All values of a header in order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parsed `Content-Disposition` header, if present
    pub fn content_disposition(&self) -> Option<ContentDisposition> {
        self.get("content-disposition").map(ContentDisposition::parse)
    }

    /// Part `Content-Type` header, if present
    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    /// Iterate over `(name, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_block() {
        let headers = PartHeaders::parse(
            b"Content-Disposition: form-data; name=\"f\"; filename=\"a.txt\"\r\nContent-Type: text/plain",
        );
        assert_eq!(headers.len(), 2);
        assert_eq!(
            headers.get("content-disposition"),
            Some("form-data; name=\"f\"; filename=\"a.txt\"")
        );
        assert_eq!(headers.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let headers = PartHeaders::parse(b"CONTENT-TYPE: image/png");
        assert_eq!(headers.get("Content-Type"), Some("image/png"));
        assert_eq!(headers.get("content-type"), Some("image/png"));
    }

    #[test]
    fn test_multiple_values_keep_order() {
        let headers = PartHeaders::parse(b"X-Tag: one\r\nX-Tag: two");
        assert_eq!(headers.get("x-tag"), Some("one"));
        assert_eq!(headers.get_all("x-tag").collect::<Vec<_>>(), vec!["one", "two"]);
    }

    #[test]
    fn test_folded_line() {
        let headers =
            PartHeaders::parse(b"Content-Disposition: form-data;\r\n\tfilename=\"a.txt\"");
        assert_eq!(
            headers.get("content-disposition"),
            Some("form-data; filename=\"a.txt\"")
        );
    }

    #[test]
    fn test_garbage_lines_skipped() {
        let headers = PartHeaders::parse(b"not a header\r\nContent-Type: text/plain\r\n");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.iter().next(), Some(("Content-Type", "text/plain")));
    }

    #[test]
    fn test_bare_lf_tolerated() {
        let headers = PartHeaders::parse(b"A: 1\nB: 2");
        assert_eq!(headers.get("a"), Some("1"));
        assert_eq!(headers.get("b"), Some("2"));
    }

    #[test]
    fn test_empty_block() {
        let headers = PartHeaders::parse(b"");
        assert!(headers.is_empty());
        assert!(headers.content_disposition().is_none());
    }
}
