//! Router configuration for serving a weft handler tree with axum.
//!
//! The whole URL space is routed to a single fallback, [`dispatch`], which
//! hands every request to the tree; path, method and host dispatch all
//! happen inside weft's own muxers.
//!
//! # Example
//!
//! ```ignore
//! use weft::mux::{exact, DirMux};
//! use weft::server::{create_router, ServerConfig};
//!
//! let app = DirMux::new().route("", exact(index));
//! let router = create_router(weft::handler::boxed(app), ServerConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::io;
use std::time::Duration;

use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::{dispatch, AppState};
use crate::handler::BoxHandler;

/// Default request body limit: 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the axum binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Largest request body accepted, in bytes
    pub body_limit: usize,

    /// Allowed CORS origins (None = no CORS layer, `"*"` = any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            body_limit: DEFAULT_BODY_LIMIT,
            cors_origins: None,
            enable_tracing: true,
        }
    }
}

impl ServerConfig {
    /// Create a configuration with a 2 MiB body limit, no CORS and
    /// tracing enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request body limit in bytes.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Allow cross-origin requests from `origins`.
    ///
    /// An entry of `"*"` allows any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Build an axum router that serves every request with `handler`.
pub fn create_router(handler: BoxHandler, config: ServerConfig) -> Router {
    let state = AppState::new(handler, config.body_limit);
    let mut router = Router::new().fallback(dispatch).with_state(state);

    if let Some(cors) = build_cors_layer(&config) {
        router = router.layer(cors);
    }
    if config.enable_tracing {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

/// Build the CORS layer, if CORS is configured.
fn build_cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    let origins = config.cors_origins.as_ref()?;
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    if origins.iter().any(|o| o == "*") {
        return Some(cors.allow_origin(Any));
    }
    let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    Some(cors.allow_origin(parsed))
}

/// Serve `handler` on `listener` until the server fails.
pub async fn serve(
    listener: TcpListener,
    handler: BoxHandler,
    config: ServerConfig,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "listening");
    }
    axum::serve(listener, create_router(handler, config)).await
}

// =============================================================================
// Tests
// =============================================================================
