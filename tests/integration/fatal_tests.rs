//! Fatal short-circuits and error rendering, end to end.
//!
//! Tests verify:
//! - A deeply nested fatal redirect produces exactly one `303`
//! - Fatal errors are rendered by the nearest error handler
//! - A fatal with no catch becomes a bare `500` at the base
//! - JSON error rendering for a subtree

use axum::http::StatusCode;
use serde_json::Value;

use weft::error::ErrorClass;
use weft::fatal::{abort, catch, fatal, redirect};
use weft::handler::handler_fn;
use weft::json::JsonErrorHandler;
use weft::mux::{exact, DirMux, IntArg};
use weft::render::handle_with;

use super::test_utils::{get, router, text};

#[tokio::test]
async fn test_nested_fatal_redirect_is_single_response() {
    let id = IntArg::new();
    let leaf = handler_fn(move |w, r| {
        let id = id.must_get(r.context())?;
        if id == 0 {
            return Err(redirect("/login"));
        }
        w.write_all(b"ok").unwrap();
        Ok(())
    });
    let app = catch(DirMux::new().route(
        "a",
        DirMux::new().route("b", DirMux::new().route("c", id.shift(exact(leaf)))),
    ));

    let response = get(router(app), "/a/b/c/0").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), Some("/login"));
    assert_eq!(response.body, "<a href=\"/login\">See Other</a>.\n");
}

#[tokio::test]
async fn test_fatal_error_uses_class_status() {
    let app = catch(handler_fn(|_, _| {
        Err(ErrorClass::Forbidden.new("members only").into())
    }));

    let response = get(router(app), "/").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body, "members only\n");
}

#[tokio::test]
async fn test_fatal_behavior_writes_custom_response() {
    let app = catch(DirMux::new().route(
        "teapot",
        handler_fn(|_, _| {
            Err(fatal(|w, r| {
                w.write_header(StatusCode::IM_A_TEAPOT);
                let body = format!("short and stout at {}", r.path());
                w.write_all(body.as_bytes()).unwrap();
            }))
        }),
    ));

    let response = get(router(app), "/teapot").await;
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(response.body, "short and stout at /teapot");
}

#[tokio::test]
async fn test_abort_is_bare_500() {
    let app = catch(handler_fn(|_, _| Err(abort())));

    let response = get(router(app), "/").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_uncaught_fatal_becomes_500() {
    let app = DirMux::new().route("boom", handler_fn(|_, _| Err(redirect("/elsewhere"))));

    let response = get(router(app), "/boom").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.header("location"), None);
}

#[tokio::test]
async fn test_json_errors_for_subtree() {
    let app = DirMux::new()
        .route("page", exact(text("page")))
        .route(
            "api",
            handle_with(JsonErrorHandler, DirMux::new().route("v1", text("v1"))),
        );

    let response = get(router(app.clone()), "/api/v2").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.header("content-type"), Some("application/json"));
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["err"], "resource: \"v2\"");

    let response = get(router(app), "/missing").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.header("content-type"),
        Some("text/plain; charset=utf-8")
    );
}
