//! The axum binding and the wrappers usually stacked on top of a tree.
//!
//! Tests verify:
//! - Request bodies reach the tree and oversized bodies are rejected
//! - CORS headers when configured
//! - Canonicalizing redirects (HTTPS, host, trailing slash)
//! - Basic auth challenges
//! - Request logging and request ids

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use weft::auth::{basic_auth_user, require_basic_auth};
use weft::handler::{boxed, handler_fn};
use weft::logging::{log_requests, request_id, request_ids};
use weft::mux::{exact, DirMux};
use weft::redirect::{require_host, require_https, require_trailing_slash};
use weft::{create_router, ServerConfig};

use super::test_utils::{get, router, send, text};

// =============================================================================
// Binding
// =============================================================================

fn echo_body() -> impl weft::Handler {
    handler_fn(|w, r| {
        let body = r.body().clone();
        w.write_all(&body).unwrap();
        Ok(())
    })
}

#[tokio::test]
async fn test_body_reaches_tree() {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from("hello tree"))
        .unwrap();
    let response = send(router(echo_body()), request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "hello tree");
}

#[tokio::test]
async fn test_body_limit() {
    let app = create_router(
        boxed(echo_body()),
        ServerConfig::new().with_body_limit(8).with_tracing(false),
    );
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from("far more than eight bytes"))
        .unwrap();
    let response = send(app, request).await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_cors_headers() {
    let app = create_router(
        boxed(text("shared")),
        ServerConfig::new()
            .with_cors_origins(vec!["https://viewer.example".to_string()])
            .with_tracing(false),
    );
    let request = Request::builder()
        .uri("/")
        .header("origin", "https://viewer.example")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("https://viewer.example")
    );
}

#[tokio::test]
async fn test_no_cors_by_default() {
    let request = Request::builder()
        .uri("/")
        .header("origin", "https://viewer.example")
        .body(Body::empty())
        .unwrap();
    let response = send(router(text("private")), request).await;
    assert_eq!(response.header("access-control-allow-origin"), None);
}

// =============================================================================
// Redirects
// =============================================================================

#[tokio::test]
async fn test_require_https() {
    let app = require_https(text("secure"));

    let request = Request::builder()
        .uri("/page?x=1")
        .header("host", "wiki.example")
        .body(Body::empty())
        .unwrap();
    let response = send(router(app), request).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.header("location"),
        Some("https://wiki.example/page?x=1")
    );

    let request = Request::builder()
        .uri("/page")
        .header("host", "wiki.example")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();
    let response = send(router(require_https(text("secure"))), request).await;
    assert_eq!(response.body, "secure");
}

#[tokio::test]
async fn test_require_host() {
    let request = Request::builder()
        .uri("/a%20b?q")
        .header("host", "www.wiki.example")
        .body(Body::empty())
        .unwrap();
    let app = require_host("wiki.example", text("canonical"));
    let response = send(router(app), request).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.header("location"),
        Some("http://wiki.example/a%20b?q")
    );
}

#[tokio::test]
async fn test_require_trailing_slash() {
    let app = DirMux::new().route("docs", require_trailing_slash(exact(text("docs"))));

    let response = get(router(app.clone()), "/docs?page=2").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), Some("/docs/?page=2"));

    let response = get(router(app), "/docs/").await;
    assert_eq!(response.body, "docs");
}

// =============================================================================
// Auth and logging
// =============================================================================

#[tokio::test]
async fn test_basic_auth() {
    let app = || {
        require_basic_auth(
            handler_fn(|w, r| {
                let user = basic_auth_user(r.context()).unwrap_or_default();
                w.write_all(user.as_bytes()).unwrap();
                Ok(())
            }),
            "staff",
            |user, password| user == "ada" && password == "secret",
        )
    };

    let response = get(router(app()), "/").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.header("www-authenticate"),
        Some("Basic realm=\"staff\"")
    );

    let request = Request::builder()
        .uri("/")
        .header("authorization", format!("Basic {}", STANDARD.encode("ada:secret")))
        .body(Body::empty())
        .unwrap();
    let response = send(router(app()), request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ada");
}

#[tokio::test]
async fn test_log_requests_answers_silent_handler() {
    let app = log_requests(handler_fn(|_, _| Ok(())));
    let response = get(router(app), "/quiet").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_request_ids_are_bound() {
    let app = || {
        request_ids(handler_fn(|w, r| {
            let id = request_id(r.context()).unwrap();
            w.write_all(id.to_string().as_bytes()).unwrap();
            Ok(())
        }))
    };

    let first: i64 = get(router(app()), "/").await.body.parse().unwrap();
    let second: i64 = get(router(app()), "/").await.body.parse().unwrap();
    assert!(first >= 0);
    assert!(second >= 0);
    assert_ne!(first, second);
}
