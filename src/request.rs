//! The request half of the transport boundary.
//!
//! A [`Request`] is built by whatever owns the connection (see
//! [`crate::server`]) and then handed by value down the handler tree.
//! Muxers consume the remaining [`path`](Request::path) one segment at a
//! time, and binders replace the [`Context`] with derived ones. The
//! original URI is never touched, so anything that needs the full request
//! target (redirects, logging) reads [`uri`](Request::uri).

use std::borrow::Cow;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, COOKIE, HOST};
use http::{HeaderMap, Method, Uri, Version};
use url::form_urlencoded;

use crate::context::Context;

/// An in-flight HTTP request.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    path: String,
    ctx: Context,
}

impl Request {
    /// Build a request from its parts with a fresh [`Context`].
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let path = decode_path(uri.path());
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers,
            body,
            path,
            ctx: Context::new(),
        }
    }

    /// Build a request from an `http::Request` whose body has been collected.
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let mut req = Self::new(parts.method, parts.uri, parts.headers, body);
        req.version = parts.version;
        req
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request target exactly as received.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The part of the (percent-decoded) path not yet consumed by a muxer.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn set_context(&mut self, ctx: Context) {
        self.ctx = ctx;
    }

    /// Replace the context, returning the updated request.
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// The `Host` header, falling back to the URI authority.
    pub fn host(&self) -> &str {
        self.headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    /// The declared `Content-Length`, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Decoded query string pairs, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let query = self.uri.query().unwrap_or("");
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// First value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Value of the cookie called `name`, across all `Cookie` headers.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.trim_matches('"'))
    }
}

fn decode_path(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => raw.to_string(),
    }
}
