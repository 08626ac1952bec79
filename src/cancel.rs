//! Client-disconnect propagation.
//!
//! When the response sink can report that the client went away
//! ([`ResponseWriter::close_notify`]), [`CloseNotify`] derives a child
//! cancellation token for the request and spawns a watcher task. The
//! watcher waits for whichever comes first:
//!
//! - the client disconnects: the request token is cancelled, so every
//!   handler below observes it through [`Context::cancelled`];
//! - the handler finishes: the watcher exits quietly.
//!
//! The wrapper does not return until the watcher has exited, so no task
//! outlives the request.
//!
//! [`Context::cancelled`]: crate::context::Context::cancelled

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::handler::{Handler, Outcome};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::Route;

/// Watches one request for a client disconnect.
#[derive(Debug)]
pub struct Watcher {
    done: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Watcher {
    /// Cancel `request` if `disconnect` fires before [`finish`](Self::finish).
    pub fn spawn(disconnect: CancellationToken, request: CancellationToken) -> Self {
        let (done, finished) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = disconnect.cancelled() => {
                    debug!("client disconnected, cancelling request");
                    request.cancel();
                }
                _ = finished => {}
            }
        });
        Self { done, task }
    }

    /// Signal completion and wait for the watcher task to exit.
    pub async fn finish(self) {
        let _ = self.done.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "disconnect watcher failed");
        }
    }
}

/// Propagates client disconnects into the request's cancellation token.
///
/// Sinks without the close-notify capability are served directly.
pub struct CloseNotify<H> {
    inner: H,
}

pub fn close_notify<H: Handler>(h: H) -> CloseNotify<H> {
    CloseNotify { inner: h }
}

#[async_trait]
impl<H: Handler> Handler for CloseNotify<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let disconnect = match w.close_notify() {
            Some(token) => token,
            None => return self.inner.serve(w, r).await,
        };

        let token = r.context().cancellation().child_token();
        let ctx = r.context().with_cancellation(token.clone());
        let watcher = Watcher::spawn(disconnect, token);

        let outcome = self.inner.serve(w, r.with_context(ctx)).await;
        watcher.finish().await;
        outcome
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(cb)
    }
}
