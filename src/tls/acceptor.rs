//! TLS acceptor creation

use std::path::Path;

use log::info;
use openssl::pkey::{PKeyRef, Private};
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod, SslVerifyMode};
use openssl::x509::X509Ref;

use crate::common::Result;

/// Create a TLS acceptor from PEM certificate and key files.
///
/// # Example
///
/// ```no_run
/// # use std::path::Path;
/// # use control_relay::tls::create_tls_acceptor;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let acceptor = create_tls_acceptor(
///     Path::new("certs/server.crt"),
///     Path::new("certs/server.key"),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn create_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<SslAcceptor> {
    info!(
        "Loading server certificate from {}",
        cert_path.display()
    );

    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;
    acceptor.set_certificate_file(cert_path, SslFiletype::PEM)?;
    acceptor.set_private_key_file(key_path, SslFiletype::PEM)?;
    acceptor.check_private_key()?;
    acceptor.set_verify(SslVerifyMode::NONE);

    Ok(acceptor.build())
}

/// Create a TLS acceptor from an in-memory certificate and key.
pub fn acceptor_from_identity(
    cert: &X509Ref,
    key: &PKeyRef<Private>,
) -> Result<SslAcceptor> {
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;
    acceptor.set_certificate(cert)?;
    acceptor.set_private_key(key)?;
    acceptor.check_private_key()?;
    acceptor.set_verify(SslVerifyMode::NONE);

    Ok(acceptor.build())
}
