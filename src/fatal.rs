//! Fatal short-circuits.
//!
//! Deep inside a handler tree it is sometimes clearer to stop *everything*
//! and decide the response in one place: redirect to a login page, bail
//! out with a 404 from a helper three calls down. A handler does that by
//! returning `Err(Fatal)`. Every composed handler forwards the `Err`
//! untouched (the `?` operator does this for free) until the nearest
//! [`Catch`] resolves it:
//!
//! - [`Fatal::Behavior`] carries a response-writing closure; `Catch` runs
//!   it against the response sink and the request as it was when `Catch`
//!   saw it.
//! - [`Fatal::Error`] carries an [`HttpError`]; `Catch` renders it with
//!   [`handle_error`].
//!
//! If the catch-up leaves the response without a header, `Catch` sends a
//! bare `500`.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use http::StatusCode;
use tracing::debug;

use crate::error::HttpError;
use crate::handler::{Handler, Outcome};
use crate::redirect::redirect as send_redirect;
use crate::render::handle_error;
use crate::request::Request;
use crate::response::{ResponseMonitor, ResponseWriter};
use crate::routes::Route;

/// A deferred response, run by [`Catch`].
pub type Behavior = Box<dyn FnOnce(&mut dyn ResponseWriter, &Request) + Send>;

/// A short-circuit travelling up to the nearest [`Catch`].
pub enum Fatal {
    /// Run the behavior; `None` means respond with a bare `500`.
    Behavior(Option<Behavior>),
    /// Render the error.
    Error(HttpError),
}

impl fmt::Debug for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fatal::Behavior(Some(_)) => f.write_str("Fatal::Behavior(..)"),
            Fatal::Behavior(None) => f.write_str("Fatal::Behavior(None)"),
            Fatal::Error(err) => f.debug_tuple("Fatal::Error").field(err).finish(),
        }
    }
}

impl From<HttpError> for Fatal {
    fn from(err: HttpError) -> Self {
        Fatal::Error(err)
    }
}

/// Short-circuit with a custom response.
pub fn fatal<F>(behavior: F) -> Fatal
where
    F: FnOnce(&mut dyn ResponseWriter, &Request) + Send + 'static,
{
    Fatal::Behavior(Some(Box::new(behavior)))
}

/// Short-circuit with a bare `500`.
pub fn abort() -> Fatal {
    Fatal::Behavior(None)
}

/// Short-circuit with a `303 See Other` to `to`.
pub fn redirect(to: impl Into<String>) -> Fatal {
    let to = to.into();
    fatal(move |w, r| send_redirect(w, r, &to))
}

/// Short-circuit by rendering an arbitrary error.
///
/// [`HttpError`]s can skip this and use `?` directly.
pub fn error<E>(err: E) -> Fatal
where
    E: StdError + Send + Sync + 'static,
{
    fatal(move |w, r| handle_error(w, r, &err))
}

// =============================================================================
// Catch
// =============================================================================

/// Resolves [`Fatal`] short-circuits coming out of `inner`.
pub struct Catch<H> {
    inner: H,
}

pub fn catch<H: Handler>(h: H) -> Catch<H> {
    Catch { inner: h }
}

#[async_trait]
impl<H: Handler> Handler for Catch<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let snapshot = r.clone();
        let mut rw = ResponseMonitor::new(w);

        let behavior = match self.inner.serve(&mut rw, r).await {
            Ok(()) => return Ok(()),
            Err(Fatal::Behavior(behavior)) => behavior,
            Err(Fatal::Error(err)) => {
                debug!(error = %err, "caught fatal error");
                handle_error(&mut rw, &snapshot, &err);
                None
            }
        };

        if let Some(behavior) = behavior {
            debug!(uri = %snapshot.uri(), "running fatal behavior");
            let sink: &mut dyn ResponseWriter = &mut rw;
            behavior(sink, &snapshot);
        }
        if !rw.header_sent() {
            rw.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Ok(())
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(cb)
    }
}
