//! Error types for interface discovery.

use thiserror::Error;

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, NetError>;

/// Errors that can occur while discovering interfaces.
#[derive(Debug, Error)]
pub enum NetError {
    /// The operating system refused to list interfaces.
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[from] std::io::Error),

    /// No usable IPv4 interface was found.
    #[error("no non-virtual IPv4 interface found")]
    NoInterfaces,
}
