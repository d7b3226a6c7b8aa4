//! Pass-through relay strategy
//!
//! Bidirectional raw copy with no protocol awareness: two directional loops
//! (socket to connection, connection to socket) raced under the cycle's
//! composed cancellation signal.

use log::debug;

use crate::common::Result;
use crate::pipe::DuplexPipe;

use super::copy::{copy_pipe, race_pair};
use super::CancelScope;

/// Run one pass-through relay cycle.
pub(crate) async fn run(
    socket: &DuplexPipe,
    connection: &DuplexPipe,
    scope: &CancelScope,
) -> Result<()> {
    let inbound = tokio::spawn({
        let src = socket.input.clone();
        let dst = connection.output.clone();
        let scope = scope.clone();
        async move { copy_pipe(&src, &dst, &scope).await }
    });
    let outbound = tokio::spawn({
        let src = connection.input.clone();
        let dst = socket.output.clone();
        let scope = scope.clone();
        async move { copy_pipe(&src, &dst, &scope).await }
    });

    let socket_input = socket.input.clone();
    let connection_input = connection.input.clone();
    let (to_connection, to_socket) = race_pair(inbound, outbound, scope, move || {
        socket_input.cancel_pending_read();
        connection_input.cancel_pending_read();
    })
    .await?;

    debug!(
        "pass-through cycle done: {} bytes to connection, {} bytes to socket",
        to_connection, to_socket
    );
    Ok(())
}
