//! Cookie sessions over the axum binding.
//!
//! Tests verify:
//! - A saved session comes back on the next request
//! - Tampered or foreign cookies degrade to a new, empty session
//! - Clearing a session expires the cookie
//! - Loading without a store is an error the tree can render

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};

use weft::fatal::{self, catch};
use weft::handler::{Handler, Outcome};
use weft::mux::{exact, require_method, exact_path, DirMux};
use weft::request::Request as WeftRequest;
use weft::response::ResponseWriter;
use weft::session::{self, with_store, CookieOptions, CookieStore};

use super::test_utils::{cookie_pair, get, request, router, send, TestResponse, TEST_SECRET};

/// Bumps a counter in the `app` session and reports it.
struct Counter;

#[async_trait]
impl Handler for Counter {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: WeftRequest) -> Outcome {
        let session = session::load(&r, "app").await.map_err(fatal::error)?;
        let was_new = session.is_new();
        let count = session.get("count").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
        session.set("count", count);
        session.save(r.context(), w).await.map_err(fatal::error)?;

        let body = format!("count={} new={}", count, was_new);
        w.write_all(body.as_bytes()).unwrap();
        Ok(())
    }
}

/// Clears the `app` session.
struct Logout;

#[async_trait]
impl Handler for Logout {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: WeftRequest) -> Outcome {
        let session = session::load(&r, "app").await.map_err(fatal::error)?;
        session.clear(r.context(), w).await.map_err(fatal::error)?;
        Ok(())
    }
}

fn app(secret: &[u8]) -> impl Handler {
    let options = CookieOptions {
        http_only: true,
        ..Default::default()
    };
    with_store(
        CookieStore::new(secret.to_vec()).with_options(options),
        catch(
            DirMux::new()
                .route("count", exact(Counter))
                .route("logout", require_method(http::Method::POST, exact_path(Logout))),
        ),
    )
}

async fn with_cookie(secret: &[u8], uri: &str, cookie: &str) -> TestResponse {
    let request = Request::builder()
        .uri(uri)
        .header("cookie", cookie)
        .body(Body::empty())
        .unwrap();
    send(router(app(secret)), request).await
}

#[tokio::test]
async fn test_session_round_trip() {
    let first = get(router(app(TEST_SECRET)), "/count").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, "count=1 new=true");

    let set_cookie = first.header("set-cookie").unwrap();
    assert!(set_cookie.starts_with("app="));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=2592000"));
    assert!(set_cookie.contains("HttpOnly"));

    let second = with_cookie(TEST_SECRET, "/count", &cookie_pair(set_cookie)).await;
    assert_eq!(second.body, "count=2 new=false");
}

#[tokio::test]
async fn test_tampered_cookie_is_new_session() {
    let first = get(router(app(TEST_SECRET)), "/count").await;
    let pair = cookie_pair(first.header("set-cookie").unwrap());

    // Flip one character of the sealed value.
    let (name, value) = pair.split_once('=').unwrap();
    let mut bytes = value.as_bytes().to_vec();
    let i = bytes.len() / 2;
    bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
    let tampered = format!("{}={}", name, String::from_utf8(bytes).unwrap());

    let response = with_cookie(TEST_SECRET, "/count", &tampered).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "count=1 new=true");
}

#[tokio::test]
async fn test_other_secret_cannot_read_session() {
    let first = get(router(app(TEST_SECRET)), "/count").await;
    let pair = cookie_pair(first.header("set-cookie").unwrap());

    let response = with_cookie(b"a completely different secret", "/count", &pair).await;
    assert_eq!(response.body, "count=1 new=true");
}

#[tokio::test]
async fn test_default_cookie_is_not_http_only() {
    let h = with_store(CookieStore::new(TEST_SECRET.to_vec()), catch(exact(Counter)));
    let response = get(router(h), "/").await;

    let set_cookie = response.header("set-cookie").unwrap();
    assert!(set_cookie.contains("Path=/"));
    assert!(!set_cookie.contains("HttpOnly"));
    assert!(!set_cookie.contains("Secure"));
}

#[tokio::test]
async fn test_logout_expires_cookie() {
    let response = send(router(app(TEST_SECRET)), request("POST", "/logout")).await;
    assert_eq!(response.status, StatusCode::OK);

    let set_cookie = response.header("set-cookie").unwrap();
    assert!(set_cookie.starts_with("app=;"));
    assert!(set_cookie.contains("Max-Age=0"));
    assert!(set_cookie.contains("1970"));
}

#[tokio::test]
async fn test_short_secret_is_server_error() {
    let response = get(router(app(b"short")), "/count").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_missing_store_is_server_error() {
    let response = get(router(catch(exact(Counter))), "/").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}
