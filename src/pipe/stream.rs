//! Stream adapter over a duplex pipe end
//!
//! Bridges the push-style pipe to blocking-stream consumers. The TLS layer
//! needs an `AsyncRead + AsyncWrite` transport; wrapping the socket-side
//! pipe end in a [`PipeStream`] lets `tokio_openssl::SslStream` run its
//! handshake and record I/O directly against the pipe.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::DuplexPipe;

/// `AsyncRead + AsyncWrite` view of one duplex pipe end.
///
/// Reads consume directly (no advance step); a `cancel_pending_read` on the
/// underlying input surfaces as `io::ErrorKind::Interrupted`. Writes publish
/// immediately, with backpressure expressed as `Poll::Pending`. Shutdown
/// completes the write side.
#[derive(Debug)]
pub struct PipeStream {
    end: DuplexPipe,
}

impl PipeStream {
    pub fn new(end: DuplexPipe) -> Self {
        Self { end }
    }
}

impl AsyncRead for PipeStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.end.input.poll_stream_read(cx, buf)
    }
}

impl AsyncWrite for PipeStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        if data.is_empty() {
            return Poll::Ready(Ok(0));
        }
        self.end.output.poll_stream_write(cx, data)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // Writes publish directly; nothing buffered at this layer.
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.end.output.complete();
        Poll::Ready(Ok(()))
    }
}
