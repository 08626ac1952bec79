use std::io;

use http::{HeaderMap, StatusCode};
use tokio_util::sync::CancellationToken;

use super::{Flush, Hijack, ResponseWriter, Upgrade};

/// A [`ResponseWriter`] wrapper that records what went out.
///
/// The first header-affecting call latches the status: either an explicit
/// [`write_header`](ResponseWriter::write_header) or the first body
/// [`write`](ResponseWriter::write), which implies `200 OK`. Later
/// `write_header` calls are still passed to the wrapped sink but do not
/// change the recorded status.
///
/// Capability probes are forwarded, so the monitor offers exactly the
/// capabilities of the sink it wraps.
#[derive(Debug)]
pub struct ResponseMonitor<W> {
    inner: W,
    header_sent: bool,
    status: StatusCode,
    written: u64,
}

impl<W: ResponseWriter> ResponseMonitor<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            header_sent: false,
            status: StatusCode::OK,
            written: 0,
        }
    }

    /// Whether the header has been sent, explicitly or by a body write.
    pub fn header_sent(&self) -> bool {
        self.header_sent
    }

    /// The status that was sent; `200 OK` if no header was sent yet.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Body bytes accepted by the wrapped sink.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: ResponseWriter> ResponseWriter for ResponseMonitor<W> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        if !self.header_sent {
            self.header_sent = true;
            self.status = status;
        }
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.header_sent {
            self.header_sent = true;
            self.status = StatusCode::OK;
        }
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        self.inner.flusher()
    }

    fn upgrader(&mut self) -> Option<&mut dyn Upgrade> {
        self.inner.upgrader()
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        self.inner.hijacker()
    }

    fn close_notify(&self) -> Option<CancellationToken> {
        self.inner.close_notify()
    }
}
