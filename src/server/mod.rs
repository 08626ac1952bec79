//! HTTP transport binding for weft handler trees.
//!
//! weft handlers are transport-agnostic: they write to a
//! [`ResponseWriter`](crate::response::ResponseWriter). This module plugs a
//! tree into axum so it can be served over real connections.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     axum / hyper                             │
//! │   fallback route ─> dispatch (collect body, spawn task)      │
//! │                                                              │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌───────────────┐  │
//! │  │  handlers   │   │ BufferedResponse │   │    routes     │  │
//! │  │ (dispatch)  │   │  + close-notify  │   │ (ServerConfig)│  │
//! │  └─────────────┘   └──────────────────┘   └───────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                     Base ─> handler tree
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{dispatch, AppState};
pub use routes::{create_router, serve, ServerConfig, DEFAULT_BODY_LIMIT};
