//! Path, method and host dispatch.
//!
//! Muxers are plain maps from one piece of the request to a child handler.
//! [`DirMux`] consumes one path segment per level, so a URL tree is built
//! by nesting:
//!
//! ```text
//! DirMux
//!   ""      -> exact(index)           GET /
//!   "wiki"  -> page.shift(exact(view)) GET /wiki/<string>
//! ```
//!
//! Every muxer reports its children's routes rewritten to reflect the
//! dispatch it performs, in sorted key order.

mod args;

pub use args::{IntArg, IntShift, StringArg, StringShift};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use tracing::debug;

use crate::error::ErrorClass;
use crate::handler::{Handler, Outcome};
use crate::render::handle_error;
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::{nest, Route};

/// Split the first segment off `path`.
///
/// Leading slashes are skipped. The segment is everything up to the next
/// `/`; the rest keeps its leading slash. An empty path yields two empty
/// strings.
///
/// ```
/// use weft::mux::shift;
///
/// assert_eq!(shift("/wiki/home"), ("wiki", "/home"));
/// assert_eq!(shift("wiki"), ("wiki", ""));
/// assert_eq!(shift("/"), ("", ""));
/// ```
pub fn shift(path: &str) -> (&str, &str) {
    let path = path.trim_start_matches('/');
    match path.find('/') {
        Some(i) => (&path[..i], &path[i..]),
        None => (path, ""),
    }
}

fn shift_owned(path: &str) -> (String, String) {
    let (segment, rest) = shift(path);
    (segment.to_string(), rest.to_string())
}

// =============================================================================
// NotFound
// =============================================================================

/// Renders `404` for whatever reaches it. Reports no routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

pub fn not_found() -> NotFound {
    NotFound
}

#[async_trait]
impl Handler for NotFound {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let err = ErrorClass::NotFound.new(format!("resource: {:?}", r.path()));
        handle_error(w, &r, &err);
        Ok(())
    }

    fn routes(&self, _cb: &mut dyn FnMut(Route)) {}
}

// =============================================================================
// DirMux
// =============================================================================

/// Dispatches on the next path segment.
///
/// The empty segment `""` matches a request whose remaining path has been
/// fully consumed (`/` or nothing). Children see the rest of the path, or
/// `/` when nothing is left.
#[derive(Clone, Default)]
pub struct DirMux {
    entries: BTreeMap<String, Arc<dyn Handler>>,
}

impl DirMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child, builder style.
    pub fn route(mut self, segment: impl Into<String>, h: impl Handler + 'static) -> Self {
        self.insert(segment, h);
        self
    }

    pub fn insert(&mut self, segment: impl Into<String>, h: impl Handler + 'static) {
        self.entries.insert(segment.into(), Arc::new(h));
    }

    pub fn get(&self, segment: &str) -> Option<&Arc<dyn Handler>> {
        self.entries.get(segment)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Handler for DirMux {
    async fn serve(&self, w: &mut dyn ResponseWriter, mut r: Request) -> Outcome {
        let (segment, rest) = shift_owned(r.path());
        match self.entries.get(&segment) {
            Some(h) => {
                r.set_path(if rest.is_empty() { "/".to_string() } else { rest });
                h.serve(w, r).await
            }
            None => {
                debug!(segment = %segment, "no directory entry");
                let err = ErrorClass::NotFound.new(format!("resource: {:?}", segment));
                handle_error(w, &r, &err);
                Ok(())
            }
        }
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        for (segment, h) in &self.entries {
            h.routes(&mut |route: Route| {
                if segment.is_empty() {
                    cb(route.with_path("/"));
                } else {
                    let path = nest(&format!("/{}", segment), &route.path);
                    cb(route.with_path(path));
                }
            });
        }
    }
}

// =============================================================================
// MethodMux
// =============================================================================

/// Dispatches on the request method.
#[derive(Clone, Default)]
pub struct MethodMux {
    entries: BTreeMap<String, Arc<dyn Handler>>,
}

impl MethodMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: Method, h: impl Handler + 'static) -> Self {
        self.insert(method, h);
        self
    }

    pub fn insert(&mut self, method: Method, h: impl Handler + 'static) {
        self.entries.insert(method.as_str().to_string(), Arc::new(h));
    }
}

#[async_trait]
impl Handler for MethodMux {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        match self.entries.get(r.method().as_str()) {
            Some(h) => h.serve(w, r).await,
            None => {
                let err = ErrorClass::MethodNotAllowed
                    .new(format!("bad method: {:?}", r.method().as_str()));
                handle_error(w, &r, &err);
                Ok(())
            }
        }
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        for (method, h) in &self.entries {
            h.routes(&mut |route: Route| cb(route.with_method(method.clone())));
        }
    }
}

// =============================================================================
// HostMux
// =============================================================================

/// Dispatches on the `Host` header, with `"*"` as the fallback entry.
#[derive(Clone, Default)]
pub struct HostMux {
    entries: BTreeMap<String, Arc<dyn Handler>>,
}

impl HostMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, host: impl Into<String>, h: impl Handler + 'static) -> Self {
        self.insert(host, h);
        self
    }

    pub fn insert(&mut self, host: impl Into<String>, h: impl Handler + 'static) {
        self.entries.insert(host.into(), Arc::new(h));
    }
}

#[async_trait]
impl Handler for HostMux {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let h = self
            .entries
            .get(r.host())
            .or_else(|| self.entries.get("*"));
        match h {
            Some(h) => h.serve(w, r).await,
            None => {
                let err = ErrorClass::NotFound.new(format!("unknown host: {:?}", r.host()));
                handle_error(w, &r, &err);
                Ok(())
            }
        }
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        for (host, h) in &self.entries {
            h.routes(&mut |route: Route| cb(route.with_annotation("Host", host.clone())));
        }
    }
}

// =============================================================================
// OverlayMux
// =============================================================================

/// A [`DirMux`] with a fallback.
///
/// Segments found in the overlay dispatch exactly like a `DirMux`; anything
/// else goes to the default handler with the path left unconsumed.
#[derive(Clone, Default)]
pub struct OverlayMux {
    overlay: DirMux,
    default: Option<Arc<dyn Handler>>,
}

impl OverlayMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, segment: impl Into<String>, h: impl Handler + 'static) -> Self {
        self.overlay.insert(segment, h);
        self
    }

    pub fn with_default(mut self, h: impl Handler + 'static) -> Self {
        self.default = Some(Arc::new(h));
        self
    }
}

#[async_trait]
impl Handler for OverlayMux {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let (segment, _) = shift(r.path());
        if self.overlay.get(segment).is_some() {
            return self.overlay.serve(w, r).await;
        }
        match &self.default {
            Some(h) => h.serve(w, r).await,
            None => NotFound.serve(w, r).await,
        }
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.overlay.routes(cb);
        if let Some(h) = &self.default {
            h.routes(cb);
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Only serve `h` once the path is fully consumed.
pub fn exact_path(h: impl Handler + 'static) -> DirMux {
    DirMux::new().route("", h)
}

/// Only serve `h` for `method`.
pub fn require_method(method: Method, h: impl Handler + 'static) -> MethodMux {
    MethodMux::new().route(method, h)
}

/// Only serve `h` for `GET`.
pub fn require_get(h: impl Handler + 'static) -> MethodMux {
    require_method(Method::GET, h)
}

/// Only serve `h` for a `GET` on a fully consumed path.
pub fn exact(h: impl Handler + 'static) -> MethodMux {
    require_get(exact_path(h))
}
