//! Dispatch through the muxers, end to end over the axum binding.
//!
//! Tests verify:
//! - Directory dispatch and the remaining path seen by children
//! - Method and host dispatch, including the `*` host
//! - Typed path arguments and their not-found fallbacks
//! - Overlay defaults

use axum::body::Body;
use axum::http::{Request, StatusCode};

use weft::handler::handler_fn;
use weft::mux::{exact, not_found, DirMux, HostMux, IntArg, MethodMux, OverlayMux, StringArg};

use super::test_utils::{echo_path, get, request, router, send, text};

// =============================================================================
// DirMux
// =============================================================================

#[tokio::test]
async fn test_dir_mux_passes_rest_of_path() {
    let app = DirMux::new().route("a", echo_path());

    let response = get(router(app.clone()), "/a/x/y").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "/x/y");

    let response = get(router(app), "/a").await;
    assert_eq!(response.body, "/");
}

#[tokio::test]
async fn test_dir_mux_miss_is_not_found() {
    let app = DirMux::new().route("a", text("a"));

    let response = get(router(app), "/b").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, "resource: \"b\"\n");
    assert_eq!(
        response.header("content-type"),
        Some("text/plain; charset=utf-8")
    );
}

#[tokio::test]
async fn test_nested_dir_mux() {
    let app = DirMux::new()
        .route("", exact(text("index")))
        .route(
            "wiki",
            DirMux::new()
                .route("", exact(text("wiki index")))
                .route("help", exact(text("help"))),
        );

    assert_eq!(get(router(app.clone()), "/").await.body, "index");
    assert_eq!(get(router(app.clone()), "/wiki").await.body, "wiki index");
    assert_eq!(get(router(app.clone()), "/wiki/").await.body, "wiki index");
    assert_eq!(get(router(app.clone()), "/wiki/help").await.body, "help");

    let response = get(router(app), "/wiki/help/more").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// MethodMux and HostMux
// =============================================================================

#[tokio::test]
async fn test_method_mux() {
    let app = MethodMux::new()
        .route(http::Method::GET, text("read"))
        .route(http::Method::PUT, text("write"));

    assert_eq!(get(router(app.clone()), "/").await.body, "read");

    let response = send(router(app.clone()), request("PUT", "/")).await;
    assert_eq!(response.body, "write");

    let response = send(router(app), request("POST", "/")).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.body, "bad method: \"POST\"\n");
}

#[tokio::test]
async fn test_host_mux_with_wildcard() {
    let app = HostMux::new()
        .route("a.example", text("a"))
        .route("*", text("anyone"));

    let request = Request::builder()
        .uri("/")
        .header("host", "a.example")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(router(app.clone()), request).await.body, "a");

    let request = Request::builder()
        .uri("/")
        .header("host", "b.example")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(router(app), request).await.body, "anyone");
}

#[tokio::test]
async fn test_host_mux_unknown_host() {
    let app = HostMux::new().route("a.example", text("a"));

    let request = Request::builder()
        .uri("/")
        .header("host", "b.example")
        .body(Body::empty())
        .unwrap();
    let response = send(router(app), request).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Argument binders
// =============================================================================

#[tokio::test]
async fn test_int_arg_binds_and_shifts() {
    let id = IntArg::new();
    let app = DirMux::new().route(
        "items",
        id.shift(handler_fn(move |w, r| {
            let body = format!("{:?} {}", id.get(r.context()), r.path());
            w.write_all(body.as_bytes()).unwrap();
            Ok(())
        })),
    );

    let response = get(router(app.clone()), "/items/42/rest").await;
    assert_eq!(response.body, "Some(42) /rest");

    let response = get(router(app), "/items/abc/rest").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_int_arg_not_found_handler_sees_original_path() {
    let id = IntArg::new();
    let app = id.shift_opt(
        handler_fn(|_, _| Ok(())),
        handler_fn(move |w, r| {
            let body = format!("{:?} {}", id.get(r.context()), r.path());
            w.write_all(body.as_bytes()).unwrap();
            Ok(())
        }),
    );

    let response = get(router(app), "/abc/rest").await;
    assert_eq!(response.body, "None /abc/rest");
}

#[tokio::test]
async fn test_string_arg_with_exact() {
    let page = StringArg::new();
    let app = DirMux::new().route(
        "wiki",
        page.shift(exact(handler_fn(move |w, r| {
            let name = page.must_get(r.context())?;
            w.write_all(name.as_bytes()).unwrap();
            Ok(())
        }))),
    );

    assert_eq!(get(router(app.clone()), "/wiki/Home").await.body, "Home");
    assert_eq!(get(router(app.clone()), "/wiki/Home/").await.body, "Home");
    assert_eq!(
        get(router(app.clone()), "/wiki/Home/extra").await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(get(router(app), "/wiki").await.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// OverlayMux
// =============================================================================

#[tokio::test]
async fn test_overlay_mux_default_sees_full_path() {
    let app = OverlayMux::new()
        .route("static", text("static"))
        .with_default(echo_path());

    assert_eq!(get(router(app.clone()), "/static/x").await.body, "static");
    assert_eq!(get(router(app), "/pages/x").await.body, "/pages/x");
}

#[tokio::test]
async fn test_overlay_mux_without_default() {
    let app = OverlayMux::new().route("static", text("static"));
    let response = get(router(app), "/pages").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = get(router(not_found()), "/anything").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, "resource: \"/anything\"\n");
}
