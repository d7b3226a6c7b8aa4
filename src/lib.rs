//! Control Relay: pausable, TLS-upgradable transport relay core
//!
//! This library implements the byte-moving core of a control-channel server
//! for line-oriented protocols (an FTP-style control connection). It relays
//! bytes between a socket-side duplex pipe and a connection-side duplex
//! pipe, can interpose a server-mode TLS session mid-connection (protocol
//! level "upgrade to TLS"), and supports pausing and resuming the relay
//! without losing buffered data or tearing down the underlying connection.
//!
//! # Main features
//!
//! - Start / pause / continue / stop state machine over one relay instance
//! - Three-way cancellation composition (connection closed, stop, pause)
//! - Pass-through and TLS relay strategies, swappable between cycles
//! - Cancellation-immune forwarding: bytes accepted by a copy loop are
//!   never dropped at a pause boundary
//!
//! # Example
//!
//! ```no_run
//! use control_relay::{duplex, CancelScope, RelayService, Result};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Socket side is fed by the transport; connection side by the
//!     // command processor. Each holds the far end of its pipe.
//!     let (socket_end, _socket_far) = duplex(65536);
//!     let (connection_end, connection_far) = duplex(65536);
//!
//!     let closed = CancellationToken::new();
//!     let service = RelayService::new(socket_end, connection_end, closed, None);
//!
//!     service.start().await?;
//!
//!     // The command processor reads decoded bytes from its pipe end.
//!     let read = connection_far.input.read(&CancelScope::never()).await;
//!     connection_far.input.advance(read.data.len());
//!
//!     service.stop().await?;
//!     Ok(())
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod hooks;
pub mod pipe;
pub mod relay;
pub mod tls;

// Re-export commonly used structures and functions for convenience
pub use common::{init_logger, RelayError, Result};
pub use config::RelayConfig;
pub use pipe::{duplex, DuplexPipe, PipeReader, PipeStream, PipeWriter};
pub use relay::{CancelScope, ConnectionStatus, RelayService};
pub use tls::create_tls_acceptor;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
