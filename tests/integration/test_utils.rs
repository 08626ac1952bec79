//! Shared helpers for integration tests.
//!
//! Trees are served through the real axum binding with
//! `tower::ServiceExt::oneshot`, so everything from body collection to the
//! `Base` fallback is on the path.

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use weft::handler::{boxed, handler_fn, Handler};
use weft::{create_router, ServerConfig};

/// Secret used for cookie sessions in tests.
pub const TEST_SECRET: &[u8] = b"integration test secret";

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Build a router for `h` with tracing off.
pub fn router<H: Handler + 'static>(h: H) -> Router {
    create_router(boxed(h), ServerConfig::new().with_tracing(false))
}

/// Send `request` through `router` and collect the response.
pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// `GET uri` against `router`.
pub async fn get(router: Router, uri: &str) -> TestResponse {
    send(router, request("GET", uri)).await
}

/// An empty-bodied request.
pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// A leaf that answers with `body`.
pub fn text(body: &'static str) -> impl Handler {
    handler_fn(move |w, _| {
        w.write_all(body.as_bytes()).unwrap();
        Ok(())
    })
}

/// A leaf that answers with the unconsumed path.
pub fn echo_path() -> impl Handler {
    handler_fn(|w, r| {
        w.write_all(r.path().as_bytes()).unwrap();
        Ok(())
    })
}

/// The `name=value` pair of a `Set-Cookie` header.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or("").to_string()
}
