//! Relay module
//!
//! This module implements the transport relay core: the connection status
//! state machine, cancellation composition, the two relay strategies and the
//! communication service that orchestrates them.

mod cancel;
mod copy;
mod passthrough;
mod secure;
pub mod service;
mod status;

pub use cancel::CancelScope;
pub use service::{RelayService, DEFAULT_BUFFER_SIZE};
pub use status::ConnectionStatus;
