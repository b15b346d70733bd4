//! HTTP request representation
//!
//! A `Request` is fully buffered: the server collects the body (bounded by
//! `ServerConfig::max_body_size`) before routing, so handlers never touch
//! the hyper body stream.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

/// HTTP request methods understood by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(format!("Invalid HTTP method: {}", s)),
        }
    }
}

impl TryFrom<&http::Method> for HttpMethod {
    type Error = String;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// Buffered HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpMethod,
    path: String,
    query_string: Option<String>,
    query_params: Vec<(String, String)>,
    path_params: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Create an empty request for `method` and `path`
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_string: None,
            query_params: Vec::new(),
            path_params: HashMap::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Set the raw query string (without the leading `?`)
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query_params = parse_query(&query);
        self.query_string = Some(query);
        self
    }

    /// Add a header. Names or values that are not valid HTTP are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!("Skipping invalid header {:?}", name),
        }
        self
    }

    /// Replace all headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, if the URI had one
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// First value of query parameter `name`
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Path parameter captured by the route pattern
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of header `name` (case-insensitive)
    ///
    /// Values that are not visible ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Every value of header `name`, in arrival order
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    /// The `Content-Type` header value
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// True when the request carries a non-empty body
    pub fn has_payload(&self) -> bool {
        !self.body.is_empty()
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Decode `a=1&b=x%20y` into ordered pairs. `+` decodes to a space.
fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

fn decode_component(component: &str) -> String {
    let component = component.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(component.as_bytes())).into_owned()
}
