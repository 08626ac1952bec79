//! The handler abstraction everything else composes.
//!
//! A [`Handler`] takes the response sink and the request by value and
//! returns an [`Outcome`]. Ordinary errors are *not* part of the outcome:
//! a handler that fails renders the failure itself through
//! [`handle_error`](crate::render::handle_error) and returns `Ok(())`. The
//! `Err` side is reserved for [`Fatal`] short-circuits, which every
//! composed handler forwards untouched until a [`Catch`](crate::fatal::Catch)
//! resolves them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::fatal::Fatal;
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::Route;

/// Result of serving a request: done, or short-circuited.
pub type Outcome = Result<(), Fatal>;

/// A shareable, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;

#[async_trait]
pub trait Handler: Send + Sync {
    /// Serve one request.
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome;

    /// Report every route this handler understands.
    ///
    /// Handlers that cannot describe themselves keep the default, which
    /// reports a single route matching any method and any remaining path.
    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        cb(Route::any());
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        (**self).serve(w, r).await
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        (**self).routes(cb)
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Box<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        (**self).serve(w, r).await
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        (**self).routes(cb)
    }
}

/// Erase a handler's type.
pub fn boxed<H: Handler + 'static>(h: H) -> BoxHandler {
    Arc::new(h)
}

// =============================================================================
// Function handlers
// =============================================================================

/// A handler backed by a synchronous function.
///
/// Handy for leaves that only write a response. Reports the default
/// wildcard route.
pub struct HandlerFn<F> {
    f: F,
}

/// Turn `f` into a [`Handler`].
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) -> Outcome + Send + Sync,
{
    HandlerFn { f }
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) -> Outcome + Send + Sync,
{
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        (self.f)(w, &r)
    }
}
