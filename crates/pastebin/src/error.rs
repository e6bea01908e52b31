//! Error types for the pastebin binary.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result type for startup operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors that can abort server startup.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration file or flag combination.
    #[error("configuration error: {0}")]
    Config(String),

    /// Interface discovery failed.
    #[error(transparent)]
    Net(#[from] paste_net::NetError),

    /// Certificate could not be prepared.
    #[error(transparent)]
    Pki(#[from] paste_pki::Error),

    /// Certificate/key pair could not be turned into a TLS configuration.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// The interface menu could not be shown.
    #[error("interface selection failed: {0}")]
    Prompt(String),

    /// A listener could not be bound.
    #[error("failed to bind to {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    /// A QR code could not be produced.
    #[error("QR encoding failed: {0}")]
    Encoding(String),

    /// Terminal or filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum HttpError {
    /// No paste under the requested key.
    #[error("content not found")]
    NotFound,

    /// The page could not be rendered.
    #[error("{0}")]
    Internal(String),
}

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
