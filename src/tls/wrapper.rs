//! Server-side TLS session establishment and shutdown

use std::pin::Pin;

use log::{debug, error};
use openssl::ssl::{Ssl, SslAcceptor};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_openssl::SslStream;

use crate::common::{RelayError, Result};

/// Wrap a raw stream in a server-mode TLS session.
///
/// Performs the handshake with the acceptor's certificate; a handshake
/// failure is returned to the caller and is fatal to the relay cycle.
pub async fn wrap<S>(acceptor: &SslAcceptor, stream: S) -> Result<SslStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ssl = Ssl::new(acceptor.context()).map_err(RelayError::Ssl)?;
    let mut stream = SslStream::new(ssl, stream).map_err(RelayError::Ssl)?;

    if let Err(e) = Pin::new(&mut stream).accept().await {
        error!("TLS handshake failed: {}", e);
        return Err(RelayError::TlsHandshake(e.to_string()));
    }

    debug!("TLS handshake successful");
    Ok(stream)
}

/// Best-effort graceful shutdown of an established TLS session.
pub async fn close<S>(stream: &mut SslStream<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = stream.shutdown().await {
        debug!("TLS shutdown incomplete: {}", e);
    }
}
