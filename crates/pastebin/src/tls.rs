//! TLS material loading.
//!
//! Runs once, after the certificate lifecycle check, to prove the pair on
//! disk is loadable and matching before anything is served.

use std::fs;
use std::sync::Arc;

use paste_pki::{CertificateRecord, KeyRecord, PairPaths};
use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use crate::error::{AppError, Result};

/// Reads the certificate/key pair and builds a server TLS configuration.
///
/// # Errors
///
/// Returns `AppError::Io` if a file cannot be read and `AppError::Tls` if the
/// PEM blocks are malformed, the key does not belong to the certificate, or
/// rustls rejects the pair.
pub fn load_server_config(paths: &PairPaths) -> Result<Arc<ServerConfig>> {
    let cert_pem = fs::read(&paths.cert)?;
    let key_pem = fs::read_to_string(&paths.key)?;

    let record = CertificateRecord::from_pem(&cert_pem)?;
    let key = KeyRecord::new(key_pem);
    if !key.matches(&record)? {
        return Err(AppError::Tls(format!(
            "{} does not hold the key of {}",
            paths.key.display(),
            paths.cert.display()
        )));
    }

    let chain = vec![
        CertificateDer::from_pem_slice(&cert_pem)
            .map_err(|e| AppError::Tls(format!("failed to parse certificate PEM: {e}")))?,
    ];
    let private_key = PrivateKeyDer::from_pem_slice(key.pem().as_bytes())
        .map_err(|e| AppError::Tls(format!("failed to parse private key PEM: {e}")))?;

    let config = ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| AppError::Tls(e.to_string()))?
    .with_no_client_auth()
    .with_single_cert(chain, private_key)
    .map_err(|e| AppError::Tls(e.to_string()))?;

    debug!(serial = %record.serial(), "TLS server configuration ready");
    Ok(Arc::new(config))
}
