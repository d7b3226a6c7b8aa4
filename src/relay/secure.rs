//! TLS relay strategy
//!
//! Wraps the socket-side pipe in a server-mode TLS session and bridges the
//! resulting blocking-shaped stream to the connection-side pipe in both
//! directions. A handshake failure is fatal to the cycle; I/O failures in
//! the copy loops mean the peer is gone and end that direction quietly.

use log::debug;
use openssl::ssl::SslAcceptor;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::Result;
use crate::pipe::{DuplexPipe, PipeReader, PipeStream, PipeWriter};
use crate::tls;

use super::copy::race_pair;
use super::CancelScope;

/// Run one TLS relay cycle.
pub(crate) async fn run(
    socket: &DuplexPipe,
    connection: &DuplexPipe,
    acceptor: &SslAcceptor,
    buffer_size: usize,
    scope: &CancelScope,
) -> Result<()> {
    let transport = PipeStream::new(socket.clone());
    let stream = tokio::select! {
        handshake = tls::wrap(acceptor, transport) => handshake?,
        _ = scope.cancelled() => {
            debug!("cancelled before TLS handshake completed");
            return Ok(());
        }
    };

    let (read_half, write_half) = tokio::io::split(stream);
    let inbound = tokio::spawn(stream_to_pipe(
        read_half,
        connection.output.clone(),
        buffer_size,
        scope.clone(),
    ));
    let outbound = tokio::spawn(pipe_to_stream(
        connection.input.clone(),
        write_half,
        scope.clone(),
    ));

    let socket_input = socket.input.clone();
    let connection_input = connection.input.clone();
    let ((to_connection, read_half), (to_socket, write_half)) =
        race_pair(inbound, outbound, scope, move || {
            socket_input.cancel_pending_read();
            connection_input.cancel_pending_read();
        })
        .await?;

    debug!(
        "TLS cycle done: {} bytes decrypted to connection, {} bytes encrypted to socket",
        to_connection, to_socket
    );

    // Always shut the session down, even on a cancelled cycle, so handshake
    // resources are released and the peer sees a close notify.
    let mut stream = read_half.unsplit(write_half);
    tls::close(&mut stream).await;
    Ok(())
}

/// Decrypt: fixed-size reads against the TLS stream, published to the pipe.
///
/// The stream read has no native cancellation, so it is raced against the
/// scope; a zero-length read is an orderly end of stream, a read error is a
/// closed peer. Returns the byte total and the read half for the final
/// session shutdown.
async fn stream_to_pipe<R>(mut src: R, dst: PipeWriter, buffer_size: usize, scope: CancelScope) -> (u64, R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let immune = CancelScope::never();
    let mut buf = vec![0u8; buffer_size];
    let mut total = 0u64;

    loop {
        let n = tokio::select! {
            biased;
            read = src.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!("TLS read ended: {}", e);
                    break;
                }
            },
            _ = scope.cancelled() => break,
        };

        if dst.write(&buf[..n]).is_completed {
            break;
        }
        let flush = dst.flush(&immune).await;
        total += n as u64;
        if flush.is_completed {
            break;
        }
    }

    debug!("socket to connection transferred {} bytes total", total);
    (total, src)
}

/// Encrypt: pipe chunks written through the TLS stream.
///
/// Writes are cancellation-immune so bytes already pulled out of the pipe
/// are never dropped. After the loop, any bytes left buffered in the pipe
/// are flushed to the stream best-effort; errors there mean the peer is
/// already gone and are swallowed.
async fn pipe_to_stream<W>(src: PipeReader, mut dst: W, scope: CancelScope) -> (u64, W)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut total = 0u64;

    loop {
        let read = src.read(&scope).await;
        if !read.data.is_empty() {
            if dst.write_all(&read.data).await.is_err() {
                debug!("TLS write ended, peer closed");
                break;
            }
            src.advance(read.data.len());
            total += read.data.len() as u64;
        }
        if read.is_canceled || read.is_completed {
            break;
        }
    }

    // Final drain: covers cancellation landing between a read and its write.
    let leftover = src.try_read();
    if !leftover.data.is_empty() && dst.write_all(&leftover.data).await.is_ok() {
        src.advance(leftover.data.len());
        total += leftover.data.len() as u64;
    }
    let _ = dst.flush().await;

    debug!("connection to socket transferred {} bytes total", total);
    (total, dst)
}
