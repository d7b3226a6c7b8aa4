//! TLS handling module
//!
//! This module handles TLS session establishment and acceptor construction.

mod acceptor;
mod wrapper;

pub use acceptor::{acceptor_from_identity, create_tls_acceptor};
pub use wrapper::{close, wrap};
