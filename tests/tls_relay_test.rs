//! TLS relay integration tests
//!
//! The test side plays the remote peer: it holds the far end of the
//! socket-side pipe and runs a real client handshake over it.

mod common;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use common::{read_exactly, self_signed_identity, wait_for_status};
use control_relay::tls::acceptor_from_identity;
use control_relay::{
    duplex, CancelScope, ConnectionStatus, DuplexPipe, PipeStream, RelayService,
};

fn make_tls_service() -> (RelayService, DuplexPipe, DuplexPipe, CancellationToken) {
    let (cert, key) = self_signed_identity();
    let acceptor = acceptor_from_identity(&cert, &key).unwrap();

    let (socket_near, socket_far) = duplex(1 << 20);
    let (conn_near, conn_far) = duplex(1 << 20);
    let closed = CancellationToken::new();
    let service = RelayService::new(socket_near, conn_near, closed.clone(), Some(Arc::new(acceptor)));
    (service, socket_far, conn_far, closed)
}

/// Run a client-side handshake over the far end of the socket pipe.
async fn tls_client(socket_far: &DuplexPipe) -> tokio_openssl::SslStream<PipeStream> {
    let mut builder = SslConnector::builder(SslMethod::tls()).unwrap();
    builder.set_verify(SslVerifyMode::NONE);
    let connector = builder.build();

    let mut config = connector.configure().unwrap();
    config.set_verify_hostname(false);
    let ssl = config.into_ssl("localhost").unwrap();

    let mut stream =
        tokio_openssl::SslStream::new(ssl, PipeStream::new(socket_far.clone())).unwrap();
    tokio::time::timeout(Duration::from_secs(5), Pin::new(&mut stream).connect())
        .await
        .expect("handshake timed out")
        .expect("client handshake failed");
    stream
}

#[tokio::test]
async fn test_tls_upgrade_round_trip() {
    let (service, socket_far, conn_far, _closed) = make_tls_service();
    let never = CancelScope::never();

    service.set_encryption_enabled(true).unwrap();
    assert!(service.encryption_enabled());
    service.start().await.unwrap();

    let mut client = tls_client(&socket_far).await;

    // Client plaintext decrypts onto the connection-side pipe.
    client.write_all(b"USER demo\r\n").await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(read_exactly(&conn_far.input, 11).await, b"USER demo\r\n");

    // Connection-side plaintext reaches the socket side as TLS records.
    let reply = b"230 logged in\r\n";
    conn_far.output.write(reply);
    conn_far.output.flush(&never).await;

    let raw = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = socket_far.input.try_read();
            if !snapshot.data.is_empty() {
                break snapshot.data;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("no record bytes reached the socket side");
    assert!(
        !raw.windows(reply.len()).any(|window| window == reply),
        "socket side must carry ciphertext, not the plaintext reply"
    );

    let mut decrypted = vec![0u8; reply.len()];
    client.read_exact(&mut decrypted).await.unwrap();
    assert_eq!(decrypted, reply);

    service.stop().await.unwrap();
    assert_eq!(service.status(), ConnectionStatus::Stopped);
}

#[tokio::test]
async fn test_handshake_failure_tears_down_the_connection() {
    let (service, socket_far, conn_far, closed) = make_tls_service();
    let never = CancelScope::never();

    service.set_encryption_enabled(true).unwrap();
    service.start().await.unwrap();

    // Not a TLS ClientHello; the server-side handshake must fail.
    socket_far.output.write(b"USER demo\r\n");
    socket_far.output.flush(&never).await;

    wait_for_status(&service, ConnectionStatus::Stopped).await;
    assert!(closed.is_cancelled(), "handshake failure must escalate");
    assert!(conn_far.input.read(&never).await.is_completed);
}

#[tokio::test]
async fn test_encryption_toggle_between_pause_and_resume() {
    let (service, socket_far, conn_far, _closed) = make_tls_service();
    let never = CancelScope::never();

    // First cycle: plain pass-through.
    service.start().await.unwrap();
    socket_far.output.write(b"AUTH TLS\r\n");
    socket_far.output.flush(&never).await;
    assert_eq!(read_exactly(&conn_far.input, 10).await, b"AUTH TLS\r\n");

    conn_far.output.write(b"234 proceed\r\n");
    conn_far.output.flush(&never).await;
    assert_eq!(read_exactly(&socket_far.input, 13).await, b"234 proceed\r\n");

    // Swap strategy between cycles, same pipe instances throughout.
    service.pause().await.unwrap();
    service.set_encryption_enabled(true).unwrap();
    service.resume().await.unwrap();

    let mut client = tls_client(&socket_far).await;
    client.write_all(b"PASS secret\r\n").await.unwrap();
    client.flush().await.unwrap();
    assert_eq!(read_exactly(&conn_far.input, 13).await, b"PASS secret\r\n");

    conn_far.output.write(b"230 ok\r\n");
    conn_far.output.flush(&never).await;
    let mut decrypted = vec![0u8; 8];
    client.read_exact(&mut decrypted).await.unwrap();
    assert_eq!(&decrypted, b"230 ok\r\n");

    service.stop().await.unwrap();
    assert_eq!(service.status(), ConnectionStatus::Stopped);
}
