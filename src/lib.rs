//! # weft
//!
//! Composable HTTP request handlers.
//!
//! A weft application is a tree of small [`Handler`]s. Muxers consume the
//! request path one segment at a time and pick a child, wrappers derive a
//! new request [`Context`] and pass the request down, and leaves write the
//! response. Because every node can describe the routes below it, the whole
//! tree can be printed as a route table.
//!
//! ## Features
//!
//! - **Muxers**: directory, method, host and overlay dispatch ([`mux`])
//! - **Typed path arguments**: [`StringArg`] and [`IntArg`] bind segments
//!   into the context
//! - **Request context**: immutable layered values plus cancellation
//!   ([`context`])
//! - **Fatal short-circuits**: [`Fatal`] unwinds to the nearest [`catch`]
//! - **Error rendering**: swappable per subtree ([`render`], [`json`])
//! - **Sessions**: encrypted cookie sessions ([`session`])
//! - **Route introspection**: [`routes::print_routes`]
//!
//! ## Architecture
//!
//! - [`handler`] - The `Handler` trait and closures as handlers
//! - [`request`] / [`response`] - The request and the response sink
//! - [`mux`] - Path, method and host dispatch, typed arguments
//! - [`fatal`] / [`render`] - Short-circuits and error rendering
//! - [`cancel`] / [`base`] - Disconnect detection and the tree root
//! - [`session`] - Session stores and the cookie store
//! - [`server`] - Axum binding
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use weft::{boxed, exact, handler_fn, DirMux, ServerConfig, StringArg};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let page = StringArg::new();
//!     let app = DirMux::new().route(
//!         "wiki",
//!         page.shift(exact(handler_fn(move |w, r| {
//!             let name = page.must_get(r.context())?;
//!             w.write_all(name.as_bytes()).map_err(weft::fatal::error)?;
//!             Ok(())
//!         }))),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     weft::server::serve(listener, boxed(app), ServerConfig::new()).await
//! }
//! ```

pub mod auth;
pub mod base;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod fatal;
pub mod handler;
pub mod json;
pub mod logging;
pub mod mux;
pub mod parse;
pub mod redirect;
pub mod render;
pub mod request;
pub mod response;
pub mod routes;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use base::Base;
pub use config::{Cli, Command, ServeConfig};
pub use context::{Context, Store, Symbol};
pub use error::{ConfigError, ErrorClass, HttpError, SessionError};
pub use fatal::{abort, catch, fatal, Fatal};
pub use handler::{boxed, handler_fn, BoxHandler, Handler, Outcome};
pub use mux::{
    exact, exact_path, not_found, require_get, require_method, shift, DirMux, HostMux, IntArg,
    MethodMux, OverlayMux, StringArg,
};
pub use render::{handle_error, handle_with, DefaultErrorHandler, ErrorHandler};
pub use request::Request;
pub use response::{BufferedResponse, ResponseMonitor, ResponseWriter};
pub use routes::{print_routes, Route};
pub use server::{create_router, ServerConfig};
pub use session::{CookieStore, Session, SessionStore};
