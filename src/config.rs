//! Relay configuration
//!
//! Slim configuration surface for the relay core: optional server identity
//! for the TLS strategy, buffer sizing and logging defaults. Loaded from a
//! JSON file or built in code; validation happens eagerly so misconfiguration
//! never turns into a deferred runtime failure.

use std::fs;
use std::path::{Path, PathBuf};

use openssl::ssl::SslAcceptor;
use serde::{Deserialize, Serialize};

use crate::common::{RelayError, Result};
use crate::tls::create_tls_acceptor;

/// Configuration for a relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// PEM server certificate; required only when encryption will be enabled.
    pub server_cert: Option<PathBuf>,
    /// PEM private key matching `server_cert`.
    pub server_key: Option<PathBuf>,
    /// TLS relay stream read buffer size in bytes.
    pub buffer_size: usize,
    /// Backpressure capacity of each pipe direction in bytes.
    pub pipe_capacity: usize,
    /// Default log level.
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server_cert: None,
            server_key: None,
            buffer_size: 8192,
            pipe_capacity: 65536,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| RelayError::Config(format!("invalid configuration file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field combinations.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(RelayError::Config("buffer_size must be non-zero".to_string()));
        }
        if self.pipe_capacity == 0 {
            return Err(RelayError::Config(
                "pipe_capacity must be non-zero".to_string(),
            ));
        }
        if self.server_cert.is_some() != self.server_key.is_some() {
            return Err(RelayError::Config(
                "server_cert and server_key must be configured together".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the TLS acceptor for the configured identity, if any.
    pub fn build_acceptor(&self) -> Result<Option<SslAcceptor>> {
        match (&self.server_cert, &self.server_key) {
            (Some(cert), Some(key)) => Ok(Some(create_tls_acceptor(cert, key)?)),
            _ => Ok(None),
        }
    }
}
