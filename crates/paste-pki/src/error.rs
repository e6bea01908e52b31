//! PKI error types.

use thiserror::Error;

/// Result type for PKI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// PKI error variants.
///
/// `NotFound`, `Read`, `Decode`, `Parse` and `InvalidCert` are routine
/// verification outcomes that lead to regeneration. `Crypto` and `Write`
/// come from generation and are fatal for the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Certificate file does not exist.
    #[error("certificate not found: {0}")]
    NotFound(String),

    /// Certificate or key file could not be read.
    #[error("read error: {0}")]
    Read(String),

    /// Certificate file is not a PEM `CERTIFICATE` block.
    #[error("failed to decode PEM block containing certificate: {0}")]
    Decode(String),

    /// Certificate DER payload is not a valid X.509 certificate.
    #[error("certificate parsing failed: {0}")]
    Parse(String),

    /// Certificate is well formed but rejected by the identity/validity policy.
    #[error("invalid certificate: {0}")]
    InvalidCert(String),

    /// Key, serial number or signing failure during generation.
    #[error("certificate generation failed: {0}")]
    Crypto(String),

    /// Filesystem failure while persisting the certificate/key pair.
    #[error("write error: {0}")]
    Write(String),

    /// Invalid identity configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for errors that only mean "regenerate".
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Read(_) | Self::Decode(_) | Self::Parse(_) | Self::InvalidCert(_)
        )
    }
}
