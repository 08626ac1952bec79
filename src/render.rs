//! Error rendering.
//!
//! Handlers that fail call [`handle_error`]. It renders with the nearest
//! [`ErrorHandler`] installed upstream by [`handle_with`], or with the
//! plain-text default when none is installed.

use std::error::Error as StdError;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, StatusCode};
use tracing::{error, warn};

use crate::context::{Context, Symbol};
use crate::error::{error_body, status_code};
use crate::handler::{Handler, Outcome};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::Route;

/// Renders errors to the client.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(
        &self,
        w: &mut dyn ResponseWriter,
        r: &Request,
        err: &(dyn StdError + Send + Sync + 'static),
    );
}

impl<E: ErrorHandler + ?Sized> ErrorHandler for Box<E> {
    fn handle_error(
        &self,
        w: &mut dyn ResponseWriter,
        r: &Request,
        err: &(dyn StdError + Send + Sync + 'static),
    ) {
        (**self).handle_error(w, r, err)
    }
}

fn error_handler_key() -> Symbol {
    static KEY: OnceLock<Symbol> = OnceLock::new();
    *KEY.get_or_init(Symbol::new)
}

/// The error handler installed nearest to `ctx`, if any.
pub fn handling_with(ctx: &Context) -> Option<Arc<dyn ErrorHandler>> {
    ctx.value::<Arc<dyn ErrorHandler>>(error_handler_key())
        .cloned()
}

/// Render `err` with the nearest installed error handler.
pub fn handle_error(
    w: &mut dyn ResponseWriter,
    r: &Request,
    err: &(dyn StdError + Send + Sync + 'static),
) {
    match handling_with(r.context()) {
        Some(handler) => handler.handle_error(w, r, err),
        None => DefaultErrorHandler.handle_error(w, r, err),
    }
}

// =============================================================================
// Default renderer
// =============================================================================

/// Plain-text renderer used when nothing else is installed.
///
/// Logs the error, then writes the class's status with the error message
/// (or the bare reason phrase for unclassed errors) as the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle_error(
        &self,
        w: &mut dyn ResponseWriter,
        r: &Request,
        err: &(dyn StdError + Send + Sync + 'static),
    ) {
        let status = status_code(err, StatusCode::INTERNAL_SERVER_ERROR);
        log_error(r, status, err);

        let headers = w.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        w.write_header(status);

        let mut body = error_body(err, StatusCode::INTERNAL_SERVER_ERROR);
        body.push('\n');
        if let Err(e) = w.write_all(body.as_bytes()) {
            warn!(error = %e, "failed writing error body");
        }
    }
}

/// Log a rendered error at a level matching its status.
pub(crate) fn log_error(r: &Request, status: StatusCode, err: &(dyn StdError + 'static)) {
    if status.is_server_error() {
        error!(
            method = %r.method(),
            uri = %r.uri(),
            status = status.as_u16(),
            error = %err,
            "request failed"
        );
    } else {
        warn!(
            method = %r.method(),
            uri = %r.uri(),
            status = status.as_u16(),
            error = %err,
            "request rejected"
        );
    }
}

// =============================================================================
// Installing handlers
// =============================================================================

/// Adapts a closure into an [`ErrorHandler`].
pub struct ErrorHandlerFn<F>(pub F);

impl<F> ErrorHandler for ErrorHandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request, &(dyn StdError + Send + Sync + 'static)) + Send + Sync,
{
    fn handle_error(
        &self,
        w: &mut dyn ResponseWriter,
        r: &Request,
        err: &(dyn StdError + Send + Sync + 'static),
    ) {
        (self.0)(w, r, err)
    }
}

/// Serves `inner` with `handler` installed for everything below it.
pub struct HandleWith<H> {
    handler: Arc<dyn ErrorHandler>,
    inner: H,
}

/// Install `eh` as the error handler for `h` and everything it calls.
pub fn handle_with<E, H>(eh: E, h: H) -> HandleWith<H>
where
    E: ErrorHandler + 'static,
    H: Handler,
{
    HandleWith {
        handler: Arc::new(eh),
        inner: h,
    }
}

#[async_trait]
impl<H: Handler> Handler for HandleWith<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let ctx = r
            .context()
            .with_value(error_handler_key(), Arc::clone(&self.handler));
        self.inner.serve(w, r.with_context(ctx)).await
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(cb)
    }
}
