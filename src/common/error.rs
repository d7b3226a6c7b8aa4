//! Error handling module
//!
//! This module defines the error types and result type aliases used in the crate.

use std::io;

use thiserror::Error;

use crate::relay::ConnectionStatus;

/// Control-relay error type
#[derive(Error, Debug)]
pub enum RelayError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// OpenSSL error
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    /// TLS handshake error
    #[error("TLS handshake error: {0}")]
    TlsHandshake(String),

    /// A control call issued against a status that does not allow it
    #[error("invalid state transition: cannot {call} while {from}")]
    InvalidStateTransition {
        /// The control call that was rejected
        call: &'static str,
        /// Status at the time of the call
        from: ConnectionStatus,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `RelayError`.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let relay_err: RelayError = io_err.into();

        match relay_err {
            RelayError::Io(_) => {}
            _ => panic!("Should convert to IO error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = RelayError::Config("Invalid configuration".to_string());
        let err_str = format!("{}", err);
        assert!(err_str.contains("Invalid configuration"));

        let err = RelayError::InvalidStateTransition {
            call: "pause",
            from: ConnectionStatus::Stopped,
        };
        assert_eq!(
            err.to_string(),
            "invalid state transition: cannot pause while stopped"
        );
    }
}
