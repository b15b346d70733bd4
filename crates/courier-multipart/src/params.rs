//! Header parameter tokenization shared by `Content-Type` and
//! `Content-Disposition` parsing.

/// Split a header value on `;`, ignoring separators inside double quotes.
pub(crate) fn split_params(value: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&value[start..]);
    segments
}

/// Split one `key=value` segment. Segments without `=` yield `None`.
pub(crate) fn split_param(segment: &str) -> Option<(&str, &str)> {
    let (key, value) = segment.split_once('=')?;
    Some((key.trim(), value.trim()))
}

/// Strip surrounding quotes from a parameter value.
///
/// Quoted strings honour `\"` and `\\` escapes; any other backslash is kept
/// literally since clients send unescaped Windows paths. An unterminated
/// quote runs to the end of the value.
pub(crate) fn unquote(value: &str) -> String {
    let value = value.trim();
    match value.strip_prefix('"') {
        Some(rest) => {
            let mut out = String::with_capacity(rest.len());
            let mut chars = rest.chars().peekable();
            while let Some(c) = chars.next() {
                match c {
                    '\\' if matches!(chars.peek(), Some('"') | Some('\\')) => {
                        if let Some(next) = chars.next() {
                            out.push(next);
                        }
                    }
                    '"' => break,
                    _ => out.push(c),
                }
            }
            out
        }
        None => value
            .trim_matches(|c| c == '\'' || c == '"')
            .trim()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_params_plain() {
        assert_eq!(
            split_params("form-data; name=\"f\"; filename=\"a.txt\""),
            vec!["form-data", " name=\"f\"", " filename=\"a.txt\""]
        );
    }

    #[test]
    fn test_split_params_quoted_separator() {
        let segments = split_params("form-data; filename=\"a;b.txt\"; name=x");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], " filename=\"a;b.txt\"");
    }

    #[test]
    fn test_split_params_escaped_quote() {
        let segments = split_params(r#"form-data; filename="say \"hi\"; ok"; name=x"#);
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn test_split_param() {
        assert_eq!(split_param(" boundary = XYZ "), Some(("boundary", "XYZ")));
        assert_eq!(split_param("form-data"), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"a.txt\""), "a.txt");
        assert_eq!(unquote("a.txt"), "a.txt");
        assert_eq!(unquote("'a.txt'"), "a.txt");
        assert_eq!(unquote("\"a.txt"), "a.txt");
        assert_eq!(unquote(r#""say \"hi\"""#), "say \"hi\"");
        assert_eq!(unquote(r#""C:\dir\a.txt""#), r"C:\dir\a.txt");
    }
}
