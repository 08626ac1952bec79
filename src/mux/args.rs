//! Binding path segments to typed arguments.
//!
//! A binder owns a private [`Symbol`]. Its `shift` wraps a handler so the
//! next path segment is parsed and bound under that symbol; the wrapped
//! handler (or anything below it) reads the value back with `get` or
//! `must_get`. Binders are `Copy`, so one instance is typically created
//! next to the routing tree and handed to the leaves that need it.

use std::sync::Arc;

use async_trait::async_trait;

use super::{not_found, shift_owned};
use crate::context::{Context, Symbol};
use crate::error::ErrorClass;
use crate::fatal::Fatal;
use crate::handler::{Handler, Outcome};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::{nest, Route, ALL_PATHS};

// =============================================================================
// StringArg
// =============================================================================

/// Binds a path segment as a `String`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringArg(Symbol);

impl StringArg {
    pub fn new() -> Self {
        Self(Symbol::new())
    }

    /// Bind the next segment and serve `found`; a missing segment is `404`.
    pub fn shift(self, found: impl Handler + 'static) -> StringShift {
        self.shift_opt(found, not_found())
    }

    /// Bind the next segment and serve `found`; serve `not_found` if the
    /// path is exhausted.
    pub fn shift_opt(
        self,
        found: impl Handler + 'static,
        not_found: impl Handler + 'static,
    ) -> StringShift {
        StringShift {
            arg: self,
            found: Arc::new(found),
            not_found: Arc::new(not_found),
        }
    }

    /// The bound value, if a `shift` upstream bound one.
    pub fn get<'a>(&self, ctx: &'a Context) -> Option<&'a str> {
        ctx.value::<String>(self.0).map(String::as_str)
    }

    /// The bound value, short-circuiting with `404` when absent.
    pub fn must_get(&self, ctx: &Context) -> Result<String, Fatal> {
        self.get(ctx)
            .map(str::to_string)
            .ok_or_else(|| ErrorClass::NotFound.new("missing string argument").into())
    }
}

pub struct StringShift {
    arg: StringArg,
    found: Arc<dyn Handler>,
    not_found: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for StringShift {
    async fn serve(&self, w: &mut dyn ResponseWriter, mut r: Request) -> Outcome {
        let (segment, rest) = shift_owned(r.path());
        if segment.is_empty() {
            return self.not_found.serve(w, r).await;
        }
        r.set_path(rest);
        let ctx = r.context().with_value(self.arg.0, segment);
        self.found.serve(w, r.with_context(ctx)).await
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.found.routes(&mut |route: Route| {
            let path = nest("/<string>", &route.path);
            cb(route.with_path(path));
        });
        // Any other not-found path starts with a segment, which `found` takes.
        self.not_found.routes(&mut |route: Route| {
            if route.path == ALL_PATHS || route.path == "/" {
                cb(route.with_path("/"));
            }
        });
    }
}

// =============================================================================
// IntArg
// =============================================================================

/// Binds a path segment as an `i64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntArg(Symbol);

impl IntArg {
    pub fn new() -> Self {
        Self(Symbol::new())
    }

    /// Bind the next segment and serve `found`; a missing or non-integer
    /// segment is `404`.
    pub fn shift(self, found: impl Handler + 'static) -> IntShift {
        self.shift_opt(found, not_found())
    }

    pub fn shift_opt(
        self,
        found: impl Handler + 'static,
        not_found: impl Handler + 'static,
    ) -> IntShift {
        IntShift {
            arg: self,
            found: Arc::new(found),
            not_found: Arc::new(not_found),
        }
    }

    pub fn get(&self, ctx: &Context) -> Option<i64> {
        ctx.value::<i64>(self.0).copied()
    }

    pub fn must_get(&self, ctx: &Context) -> Result<i64, Fatal> {
        self.get(ctx)
            .ok_or_else(|| ErrorClass::NotFound.new("missing int argument").into())
    }
}

pub struct IntShift {
    arg: IntArg,
    found: Arc<dyn Handler>,
    not_found: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for IntShift {
    async fn serve(&self, w: &mut dyn ResponseWriter, mut r: Request) -> Outcome {
        let (segment, rest) = shift_owned(r.path());
        let value = match segment.parse::<i64>() {
            Ok(value) => value,
            Err(_) => return self.not_found.serve(w, r).await,
        };
        r.set_path(rest);
        let ctx = r.context().with_value(self.arg.0, value);
        self.found.serve(w, r.with_context(ctx)).await
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.found.routes(&mut |route: Route| {
            let path = nest("/<int>", &route.path);
            cb(route.with_path(path));
        });
        self.not_found.routes(cb);
    }
}
