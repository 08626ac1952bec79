//! The response half of the transport boundary.
//!
//! Handlers write to a `&mut dyn` [`ResponseWriter`]: a header map, a
//! one-shot status line and a byte sink. Anything beyond that (flushing a
//! partial body, switching protocols, taking over the raw connection,
//! learning that the client went away) is an optional *capability* that a
//! sink may or may not have. Capabilities are discovered by probing:
//!
//! ```text
//! if let Some(flusher) = w.flusher() {
//!     flusher.flush()?;
//! }
//! ```
//!
//! Wrappers such as [`ResponseMonitor`] forward every probe to the sink
//! they wrap, so a wrapped sink exposes exactly the capabilities of the
//! original one and no wrapper type has to be written per combination.

mod buffered;
mod monitor;

pub use buffered::BufferedResponse;
pub use monitor::ResponseMonitor;

use std::future::Future;
use std::io;
use std::pin::Pin;

use http::{HeaderMap, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

// =============================================================================
// Capabilities
// =============================================================================

/// A raw, bidirectional client connection.
pub trait RawConnection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> RawConnection for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Resolves to the upgraded connection once the protocol switch completes.
pub type OnUpgrade = Pin<Box<dyn Future<Output = io::Result<Box<dyn RawConnection>>> + Send>>;

/// Send buffered response data to the client now.
pub trait Flush: Send {
    fn flush(&mut self) -> io::Result<()>;
}

/// Switch the connection to another protocol (`101 Switching Protocols`).
pub trait Upgrade: Send {
    fn upgrade(&mut self, protocol: &str) -> io::Result<OnUpgrade>;
}

/// Take over the underlying connection; the sink is unusable afterwards.
pub trait Hijack: Send {
    fn hijack(&mut self) -> io::Result<Box<dyn RawConnection>>;
}

// =============================================================================
// ResponseWriter
// =============================================================================

/// A response sink.
pub trait ResponseWriter: Send {
    /// Headers to be sent. Changes after the header is written are ignored
    /// by the transport.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Send the status line and headers.
    fn write_header(&mut self, status: StatusCode);

    /// Append body bytes, sending a `200 OK` header first if none was sent.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Append all of `buf`.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        None
    }

    fn upgrader(&mut self) -> Option<&mut dyn Upgrade> {
        None
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        None
    }

    /// A token the transport cancels when the client disconnects.
    fn close_notify(&self) -> Option<CancellationToken> {
        None
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        (**self).write_header(status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        (**self).flusher()
    }

    fn upgrader(&mut self) -> Option<&mut dyn Upgrade> {
        (**self).upgrader()
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        (**self).hijacker()
    }

    fn close_notify(&self) -> Option<CancellationToken> {
        (**self).close_notify()
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for Box<W> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        (**self).write_header(status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        (**self).flusher()
    }

    fn upgrader(&mut self) -> Option<&mut dyn Upgrade> {
        (**self).upgrader()
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        (**self).hijacker()
    }

    fn close_notify(&self) -> Option<CancellationToken> {
        (**self).close_notify()
    }
}
