//! Request logging and request ids.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use async_trait::async_trait;
use http::StatusCode;
use rand::Rng;
use tracing::{error, info, warn};

use crate::context::{Context, Symbol};
use crate::handler::{Handler, Outcome};
use crate::request::Request;
use crate::response::{ResponseMonitor, ResponseWriter};
use crate::routes::Route;

// =============================================================================
// Request logging
// =============================================================================

/// Logs every request and the status it was answered with.
pub struct LogRequests<H> {
    inner: H,
}

pub fn log_requests<H: Handler>(h: H) -> LogRequests<H> {
    LogRequests { inner: h }
}

#[async_trait]
impl<H: Handler> Handler for LogRequests<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let method = r.method().clone();
        let uri = r.uri().clone();
        let content_length = r.content_length();
        let id = request_id(r.context());
        let start = Instant::now();
        info!(method = %method, uri = %uri, request_id = ?id, "request started");

        let mut rw = ResponseMonitor::new(w);
        let outcome = self.inner.serve(&mut rw, r).await;
        if outcome.is_err() {
            warn!(method = %method, uri = %uri, request_id = ?id, "request short-circuited");
            return outcome;
        }
        if !rw.header_sent() {
            rw.write_header(StatusCode::OK);
        }

        let status = rw.status();
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if status.is_client_error() || status.is_server_error() {
            error!(
                method = %method,
                uri = %uri,
                request_id = ?id,
                status = status.as_u16(),
                content_length = ?content_length,
                bytes = rw.bytes_written(),
                elapsed_ms,
                "request failed"
            );
        } else {
            info!(
                method = %method,
                uri = %uri,
                request_id = ?id,
                status = status.as_u16(),
                content_length = ?content_length,
                bytes = rw.bytes_written(),
                elapsed_ms,
                "request finished"
            );
        }
        outcome
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(cb)
    }
}

// =============================================================================
// Request ids
// =============================================================================

struct IdSource {
    counter: AtomicU64,
    increment: u64,
}

fn id_source() -> &'static IdSource {
    static SOURCE: OnceLock<IdSource> = OnceLock::new();
    SOURCE.get_or_init(|| {
        let mut rng = rand::thread_rng();
        IdSource {
            counter: AtomicU64::new(rng.gen::<u64>() >> 1),
            // Odd: full period over u64.
            increment: rng.gen::<u64>() | 3,
        }
    })
}

fn next_id() -> i64 {
    let source = id_source();
    let previous = source.counter.fetch_add(source.increment, Ordering::Relaxed);
    (previous.wrapping_add(source.increment) >> 1) as i64
}

fn request_id_key() -> Symbol {
    static KEY: OnceLock<Symbol> = OnceLock::new();
    *KEY.get_or_init(Symbol::new)
}

/// The id [`request_ids`] assigned to this request.
pub fn request_id(ctx: &Context) -> Option<i64> {
    ctx.value::<i64>(request_id_key()).copied()
}

/// Assigns every request a process-unique, hard-to-guess id.
///
/// A request that already carries an id keeps it.
pub struct RequestIds<H> {
    inner: H,
}

pub fn request_ids<H: Handler>(h: H) -> RequestIds<H> {
    RequestIds { inner: h }
}

#[async_trait]
impl<H: Handler> Handler for RequestIds<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        if request_id(r.context()).is_some() {
            return self.inner.serve(w, r).await;
        }
        let ctx = r.context().with_value(request_id_key(), next_id());
        self.inner.serve(w, r.with_context(ctx)).await
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(cb)
    }
}
