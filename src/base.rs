//! The outermost handler.
//!
//! [`Base`] is what a transport calls for every request. It sets up
//! disconnect propagation (see [`crate::cancel`]) and makes sure a client
//! always gets a response: a [`Fatal`](crate::fatal::Fatal) that escapes
//! the tree because nobody installed a [`Catch`](crate::fatal::Catch) is
//! logged and answered with a bare `500` if nothing was written yet.

use async_trait::async_trait;
use http::StatusCode;
use tracing::error;

use crate::cancel::{close_notify, CloseNotify};
use crate::handler::{Handler, Outcome};
use crate::request::Request;
use crate::response::{ResponseMonitor, ResponseWriter};
use crate::routes::Route;

pub struct Base<H> {
    root: CloseNotify<H>,
}

impl<H: Handler> Base<H> {
    pub fn new(root: H) -> Self {
        Self {
            root: close_notify(root),
        }
    }

    /// Serve one request to completion.
    pub async fn dispatch(&self, w: &mut dyn ResponseWriter, r: Request) {
        let method = r.method().clone();
        let uri = r.uri().clone();
        let mut rw = ResponseMonitor::new(w);

        if let Err(fatal) = self.root.serve(&mut rw, r).await {
            error!(
                method = %method,
                uri = %uri,
                fatal = ?fatal,
                "fatal short-circuit reached the base handler without a catch"
            );
            if !rw.header_sent() {
                rw.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }
}

#[async_trait]
impl<H: Handler> Handler for Base<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        self.dispatch(w, r).await;
        Ok(())
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.root.routes(cb)
    }
}
