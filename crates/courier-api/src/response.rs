//! HTTP response representation

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

/// Response body variants
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No body
    Empty,
    /// JSON body, serialized when the response is written
    Json(serde_json::Value),
    /// Plain text (UTF-8)
    Text(String),
}

/// HTTP response built by handlers
#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    /// Lowercase header names
    headers: HashMap<String, String>,
    body: ResponseBody,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Create a new response (200 OK, empty body)
    pub fn new() -> Self {
        Self::for_status(200)
    }

    /// Empty response with the given status
    pub fn for_status(status_code: u16) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body: ResponseBody::Empty,
        }
    }

    pub fn ok() -> Self {
        Self::for_status(200)
    }

    pub fn created() -> Self {
        Self::for_status(201)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::for_status(400).with_payload(message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::for_status(500).with_payload(message)
    }

    /// 200 response with a text body
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok().with_payload(body)
    }

    /// 200 response with a JSON body
    pub fn json(value: serde_json::Value) -> Self {
        Self::ok().with_json(value)
    }

    /// 200 response serializing `payload` as JSON
    pub fn for_payload<T: Serialize>(payload: &T) -> ApiResult<Self> {
        Ok(Self::json(serde_json::to_value(payload)?))
    }

    /// Create a response from an error
    pub fn error(err: &ApiError) -> Self {
        Self::for_status(err.status_code())
            .with_json(serde_json::json!({ "detail": err.to_string() }))
    }

    /// Set status code (builder pattern)
    pub fn status(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    /// Add header (builder pattern)
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Replace the body with text, keeping the status
    pub fn with_payload(mut self, body: impl Into<String>) -> Self {
        self.headers.insert(
            "content-type".to_string(),
            "text/plain; charset=utf-8".to_string(),
        );
        self.body = ResponseBody::Text(body.into());
        self
    }

    /// Set JSON body (builder pattern)
    pub fn with_json(mut self, value: serde_json::Value) -> Self {
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        self.body = ResponseBody::Json(value);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Header value by name (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_value("content-type")
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Serialize body to bytes
    pub fn body_bytes(&self) -> Bytes {
        match &self.body {
            ResponseBody::Empty => Bytes::new(),
            ResponseBody::Json(value) => Bytes::from(serde_json::to_vec(value).unwrap_or_default()),
            ResponseBody::Text(text) => Bytes::from(text.clone()),
        }
    }

    /// Body as UTF-8 text, lossy
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes()).into_owned()
    }
}
