use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode};
use tokio_util::sync::CancellationToken;

use super::ResponseWriter;

/// A sink that collects the whole response in memory.
///
/// Used by the axum binding, which turns it into an `http::Response` once
/// the handler tree returns, and by tests. Like a real connection, only
/// the first status written counts.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    disconnect: Option<CancellationToken>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise the close-notify capability, backed by `token`.
    pub fn with_close_notify(mut self, token: CancellationToken) -> Self {
        self.disconnect = Some(token);
        self
    }

    /// The status written so far; `200 OK` if nothing was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Whether a status line has been written.
    pub fn header_written(&self) -> bool {
        self.status.is_some()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as UTF-8, lossily.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body.freeze());
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close_notify(&self) -> Option<CancellationToken> {
        self.disconnect.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let sink = BufferedResponse::new();
        assert_eq!(sink.status(), StatusCode::OK);
        assert!(!sink.header_written());
        assert!(sink.body().is_empty());
    }

    #[test]
    fn test_first_status_wins() {
        let mut sink = BufferedResponse::new();
        sink.write_header(StatusCode::SEE_OTHER);
        sink.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sink.status(), StatusCode::SEE_OTHER);
    }

    #[test]
    fn test_into_response() {
        let mut sink = BufferedResponse::new();
        sink.headers_mut()
            .insert("content-type", "text/plain".parse().unwrap());
        sink.write_all(b"hi there").unwrap();

        let response = sink.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(response.body().as_ref(), b"hi there");
    }
}
