//! The axum handler that feeds requests into a weft handler tree.
//!
//! Each request's body is collected up to the configured limit, then the
//! tree is run in its own task against a [`BufferedResponse`]. The task is
//! given a close-notify token; a drop guard on the axum future cancels that
//! token if hyper drops the future because the client went away.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request as AxumRequest, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::base::Base;
use crate::handler::BoxHandler;
use crate::request::Request;
use crate::response::BufferedResponse;

// =============================================================================
// Application State
// =============================================================================

/// Shared state handed to [`dispatch`] through axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The handler tree, wrapped in its [`Base`]
    pub base: Arc<Base<BoxHandler>>,

    /// Largest request body accepted, in bytes
    pub body_limit: usize,
}

impl AppState {
    pub fn new(handler: BoxHandler, body_limit: usize) -> Self {
        Self {
            base: Arc::new(Base::new(handler)),
            body_limit,
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Serve any request through the handler tree.
pub async fn dispatch(State(state): State<AppState>, request: AxumRequest) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, state.body_limit).await {
        Ok(body) => body,
        Err(e) => {
            warn!(uri = %parts.uri, error = %e, "rejecting request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large\n").into_response();
        }
    };
    let request = Request::from_http(http::Request::from_parts(parts, body));

    let disconnect = CancellationToken::new();
    let guard = disconnect.clone().drop_guard();
    let base = Arc::clone(&state.base);
    let task = tokio::spawn(async move {
        let mut sink = BufferedResponse::new().with_close_notify(disconnect);
        base.dispatch(&mut sink, request).await;
        sink
    });

    let joined = task.await;
    // Completed normally: the client is still there.
    guard.disarm();

    match joined {
        Ok(sink) => {
            debug!(status = sink.status().as_u16(), "handler tree finished");
            sink.into_response().map(Body::from)
        }
        Err(e) => {
            error!(error = %e, "handler task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
