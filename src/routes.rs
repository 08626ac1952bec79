//! Route introspection.
//!
//! Every handler can describe the requests it serves by reporting
//! [`Route`]s through [`Handler::routes`]. Muxers rewrite what their
//! children report (prefixing paths, substituting methods, adding
//! annotations) so walking the root yields the full route table of an
//! application without serving anything.

use std::collections::BTreeMap;
use std::io;

use async_trait::async_trait;

use crate::handler::{Handler, Outcome};
use crate::request::Request;
use crate::response::ResponseWriter;

/// Method placeholder matching any method.
pub const ALL_METHODS: &str = "ALL";

/// Path placeholder matching any remaining path.
pub const ALL_PATHS: &str = "[/<*>]";

/// One route a handler understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub annotations: BTreeMap<String, String>,
}

impl Route {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            annotations: BTreeMap::new(),
        }
    }

    /// Any method, any remaining path, no annotations.
    pub fn any() -> Self {
        Self::new(ALL_METHODS, ALL_PATHS)
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Add (or replace) an annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

/// Prefix a child's route path with `prefix`.
///
/// A child that only matches the exhausted path (`/`) adds nothing, so
/// `nest("/wiki", "/")` is `/wiki`.
pub fn nest(prefix: &str, path: &str) -> String {
    if path == "/" {
        prefix.to_string()
    } else {
        format!("{}{}", prefix, path)
    }
}

/// Collect every route `h` reports, in reporting order.
pub fn collect(h: &dyn Handler) -> Vec<Route> {
    let mut routes = Vec::new();
    h.routes(&mut |route| routes.push(route));
    routes
}

/// Write a human-readable route table for `h`.
///
/// Each route is a `METHOD<TAB>PATH` line; a `Host` annotation is folded
/// into the path, and every other annotation follows on its own indented
/// `key: value` line, sorted by key.
pub fn print_routes<W: io::Write>(out: &mut W, h: &dyn Handler) -> io::Result<()> {
    for route in collect(h) {
        match route.annotation("Host") {
            Some(host) => writeln!(out, "{}\t{}{}", route.method, host, route.path)?,
            None => writeln!(out, "{}\t{}", route.method, route.path)?,
        }
        for (key, value) in &route.annotations {
            if key == "Host" {
                continue;
            }
            writeln!(out, " {}: {}", key, value)?;
        }
    }
    Ok(())
}

// =============================================================================
// Route-aware function handlers
// =============================================================================

/// Serves with a function but reports another handler's routes.
///
/// Useful when a leaf is a plain function yet should advertise a specific
/// shape, e.g. `route_handler_fn(exact_path(not_found()), ...)`.
pub struct RouteHandlerFn<R, F> {
    routes: R,
    f: F,
}

pub fn route_handler_fn<R, F>(routes: R, f: F) -> RouteHandlerFn<R, F>
where
    R: Handler,
    F: Fn(&mut dyn ResponseWriter, &Request) -> Outcome + Send + Sync,
{
    RouteHandlerFn { routes, f }
}

#[async_trait]
impl<R, F> Handler for RouteHandlerFn<R, F>
where
    R: Handler,
    F: Fn(&mut dyn ResponseWriter, &Request) -> Outcome + Send + Sync,
{
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        (self.f)(w, &r)
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.routes.routes(cb)
    }
}
