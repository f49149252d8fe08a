//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::HOST;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};

use crate::context::Context;

/// An incoming HTTP request, body fully buffered.
///
/// Besides the HTTP message itself a request carries the connection facts the
/// server saw (`remote_addr`, whether it arrived over TLS) and a [`Context`]
/// that middleware uses to pass values down the chain.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: String,
    pub(crate) tls: bool,
    pub(crate) context: Context,
}

impl Request {
    /// Starts building a request by hand, for tests and in-process dispatch
    /// through [`Router::handle`](crate::Router::handle).
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub(crate) fn from_hyper(parts: http::request::Parts, body: Bytes, remote_addr: String) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            remote_addr,
            tls: false,
            context: Context::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn context(&self) -> &Context { &self.context }

    /// Peer address as `ip:port`, or whatever a proxy-aware middleware
    /// rewrote it to.
    pub fn remote_addr(&self) -> &str { &self.remote_addr }

    /// True if TLS was terminated by this server rather than upstream.
    pub fn is_tls(&self) -> bool { self.tls }

    /// Header lookup. `HeaderMap` names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Host the client addressed: the `Host` header for HTTP/1, the URI
    /// authority for HTTP/2, or `""` if neither is present.
    pub fn host(&self) -> &str {
        self.header(HOST.as_str())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    /// The request target as sent: path plus query string.
    pub fn request_uri(&self) -> &str {
        self.uri.path_and_query().map_or("/", |pq| pq.as_str())
    }

    /// Replaces the request's context. Middleware derives a child from
    /// [`context`](Self::context) and hands it back through here.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn set_remote_addr(&mut self, addr: impl Into<String>) {
        self.remote_addr = addr.into();
    }
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Fluent builder for [`Request`].
///
/// Defaults mirror a plain HTTP/1.1 `GET /` from `192.0.2.1:1234` to host
/// `example.com`.
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: String,
    tls: bool,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: "192.0.2.1:1234".to_owned(),
            tls: false,
        }
    }
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request target. An unparseable target falls back to `/`.
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.parse().unwrap_or_else(|_| Uri::from_static("/"));
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Appends a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) =
            (HeaderName::try_from(name), HeaderValue::try_from(value))
        {
            self.headers.append(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn build(mut self) -> Request {
        if !self.headers.contains_key(HOST) && self.uri.authority().is_none() {
            self.headers.insert(HOST, HeaderValue::from_static("example.com"));
        }
        Request {
            method: self.method,
            uri: self.uri,
            version: self.version,
            headers: self.headers,
            body: self.body,
            params: HashMap::new(),
            remote_addr: self.remote_addr,
            tls: self.tls,
            context: Context::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_example_host() {
        let req = Request::builder().uri("/42?x=1").build();
        assert_eq!(req.host(), "example.com");
        assert_eq!(req.path(), "/42");
        assert_eq!(req.request_uri(), "/42?x=1");
        assert!(!req.is_tls());
    }

    #[test]
    fn explicit_host_header_wins() {
        let req = Request::builder().header("Host", "api.local:8080").build();
        assert_eq!(req.host(), "api.local:8080");
        assert_eq!(req.header("host"), Some("api.local:8080"));
    }
}
