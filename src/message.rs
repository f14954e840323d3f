//! HTTP message types
//!
//! This module defines the outgoing request handed to an engine and the
//! normalized response every engine returns.

use super::{Error, Result};
use bytes::Bytes;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Response headers: header name to every value received, in arrival order
pub type HeaderMap = BTreeMap<String, Vec<String>>;

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Method {
    /// Convert method to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }

    /// Whether a request with this method carries a body by convention
    pub fn expects_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            "PATCH" => Ok(Method::Patch),
            _ => Err(Error::Parse(format!("Invalid HTTP method: {}", s))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing HTTP request
///
/// Headers keep their insertion order and original case. Request filters may
/// rewrite any part of the request before an engine sends it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl HttpRequest {
    /// Create a request builder
    pub fn builder(method: Method, url: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, url)
    }

    /// Create a GET request
    pub fn get(url: &str) -> Result<Self> {
        Self::builder(Method::Get, url).build()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the first value for a header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace every value of a header with a single value
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove_header(&name);
        self.headers.push((name, value.into()));
    }

    /// Add a value without touching existing ones
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Remove all instances of a header, returning how many were removed
    pub fn remove_header(&mut self, name: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.headers.len()
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }
}

/// Builder for [`HttpRequest`]
#[derive(Debug, Clone)]
pub struct HttpRequestBuilder {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl HttpRequestBuilder {
    fn new(method: Method, url: impl Into<String>) -> Self {
        HttpRequestBuilder {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the request, parsing the URL
    pub fn build(self) -> Result<HttpRequest> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", self.url, e)))?;

        Ok(HttpRequest {
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
        })
    }
}

/// Normalized HTTP response
///
/// Produced fresh for every call regardless of the engine that executed it.
/// The body is never absent, only empty. Header names are stored exactly as
/// the engine reports them; the in-crate engines lowercase them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status_code: u16,
    body: Bytes,
    headers: HeaderMap,
}

impl HttpResponse {
    /// Status-only response with an empty body and no headers
    pub fn new(status_code: u16) -> Self {
        Self::with_headers(status_code, Bytes::new(), HeaderMap::new())
    }

    /// Response with a body and no headers
    pub fn with_body(status_code: u16, body: impl Into<Bytes>) -> Self {
        Self::with_headers(status_code, body, HeaderMap::new())
    }

    pub fn with_headers(status_code: u16, body: impl Into<Bytes>, headers: HeaderMap) -> Self {
        HttpResponse {
            status_code,
            body: body.into(),
            headers,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Raw body bytes, the canonical representation of the payload
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decode the body as UTF-8
    ///
    /// Lossy: invalid sequences are replaced with U+FFFD, so binary bodies
    /// do not survive the conversion. Use [`HttpResponse::body`] for those.
    pub fn body_as_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Consume the response, keeping only the body
    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_response() {
        let response = HttpResponse::new(404);
        assert_eq!(response.status_code(), 404);
        assert!(response.body().is_empty());
        assert!(response.headers().is_empty());
        assert_eq!(response.body_as_string(), "");
    }

    #[test]
    fn test_body_as_string() {
        let response = HttpResponse::with_body(200, &b"ok"[..]);
        assert_eq!(response.body_as_string(), "ok");
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_body_as_string_is_lossy() {
        let response = HttpResponse::with_body(200, vec![0x6f, 0xff, 0x6b]);
        assert_eq!(response.body_as_string(), "o\u{fffd}k");
        assert_eq!(response.body().as_ref(), &[0x6f, 0xff, 0x6b]);
    }

    #[test]
    fn test_multi_valued_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "set-cookie".to_string(),
            vec!["a=1".to_string(), "b=2".to_string()],
        );
        let response = HttpResponse::with_headers(201, Bytes::new(), headers);

        assert_eq!(response.headers()["set-cookie"], vec!["a=1", "b=2"]);
        assert_eq!(response.header("Set-Cookie"), Some("a=1"));
        assert_eq!(response.header("missing"), None);
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::builder(Method::Post, "http://localhost:8080/items?x=1")
            .header("Content-Type", "application/json")
            .body("{}")
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.url().path(), "/items");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body().as_ref(), b"{}");
    }

    #[test]
    fn test_request_invalid_url() {
        let result = HttpRequest::get("not a url");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_set_header_replaces_all_values() {
        let mut request = HttpRequest::builder(Method::Get, "http://localhost/")
            .header("X-Trace", "a")
            .header("x-trace", "b")
            .build()
            .unwrap();

        request.set_header("X-Trace", "c");
        assert_eq!(request.headers(), &[("X-Trace".to_string(), "c".to_string())]);

        request.append_header("X-Trace", "d");
        assert_eq!(request.remove_header("x-trace"), 2);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert!("get".parse::<Method>().is_err());
        assert!(Method::Put.expects_body());
        assert!(!Method::Get.expects_body());
    }
}
