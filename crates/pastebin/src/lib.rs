//! LAN pastebin server over self-signed HTTPS.
#![forbid(unsafe_code)]
//!
//! Discovers the host's LAN interfaces, settles on the address the server is
//! advertised at, makes sure the self-signed certificate covers it, loads the
//! resulting pair into a rustls server configuration and serves the paste
//! pages on loopback and on that address.
//!
//! # Modules
//!
//! - [`cli`] - Command-line arguments
//! - [`config`] - Layered settings
//! - [`select`] - Primary address selection
//! - [`tls`] - TLS material loading
//! - [`server`] - Routes, handlers and TLS listeners
//! - [`pastes`] - In-memory paste storage
//! - [`pages`] - HTML pages
//! - [`qr`] - QR codes for URLs
//! - [`urls`] - Server URLs
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod pages;
pub mod pastes;
pub mod qr;
pub mod select;
pub mod server;
pub mod tls;
pub mod urls;

use std::io::Write;
use std::net::IpAddr;
use std::sync::Arc;

use paste_net::{InterfaceSource, candidate_addresses, real_interfaces};
use paste_pki::{Outcome, ensure_certificate};
use rustls::ServerConfig;
use tracing::info;

pub use error::{AppError, Result};

use crate::config::Settings;
use crate::urls::{local_url, server_url};

/// Everything the listeners need once startup checks have passed.
#[derive(Debug)]
pub struct Prepared {
    /// Address the server is advertised at.
    pub primary: IpAddr,
    /// Whether the certificate was reused or rewritten.
    pub outcome: Outcome,
    /// TLS configuration built from the on-disk pair.
    pub tls: Arc<ServerConfig>,
}

/// Runs the startup sequence: discovery, selection, certificate check, TLS load.
///
/// The interface listing goes to `output`; the selection menu, when shown,
/// uses the terminal directly.
///
/// # Errors
///
/// Returns an error if no interface is usable, the selection is invalid, or
/// the certificate cannot be produced or loaded.
pub fn prepare(
    settings: &Settings,
    source: &impl InterfaceSource,
    output: &mut impl Write,
) -> Result<Prepared> {
    let interfaces = real_interfaces(source)?;
    writeln!(output, "Network interfaces found:")?;
    for iface in &interfaces {
        writeln!(output, "{iface}")?;
    }
    writeln!(output)?;

    let primary = select::select_primary(&interfaces, settings.ip, settings.interactive)?;
    let candidates = candidate_addresses(&interfaces);

    let outcome = ensure_certificate(&settings.paths, &settings.identity, &candidates, primary)?;
    if let Outcome::Regenerated { sans, .. } = &outcome {
        info!(sans = ?sans, "Certificate regenerated");
    }

    let tls = tls::load_server_config(&settings.paths)?;

    Ok(Prepared {
        primary,
        outcome,
        tls,
    })
}

/// Prints the server address, both URLs and a QR code of the LAN URL.
///
/// # Errors
///
/// Returns `AppError::Io` if `output` fails and `AppError::Encoding` if the
/// URL cannot be encoded.
pub fn print_banner(primary: IpAddr, port: u16, output: &mut impl Write) -> Result<()> {
    let remote = server_url(primary, port);
    writeln!(output, "Server ip: {primary}")?;
    writeln!(output)?;
    writeln!(output, "Local server url: {}", local_url(port))?;
    writeln!(output)?;
    writeln!(output, "Server url for remote clients (QR code below): {remote}")?;
    writeln!(output, "{}", qr::terminal(&remote)?)?;
    Ok(())
}
