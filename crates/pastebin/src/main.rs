//! pastebin - LAN pastebin server over self-signed HTTPS.
//!
//! Prepares the TLS material for the advertised address, prints the URLs
//! clients use to reach the server and serves pastes until interrupted.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use paste_net::SystemInterfaces;
use pastebin::cli::Cli;
use pastebin::config::{FileConfig, Settings, default_data_dir};
use pastebin::server::{self, AppState};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let file =
        FileConfig::discover(cli.config.as_deref()).context("failed to load configuration")?;
    let mut settings = Settings::resolve(cli, file, default_data_dir())?;

    std::fs::create_dir_all(&settings.data_dir).with_context(|| {
        format!("failed to create data directory {}", settings.data_dir.display())
    })?;
    if settings.interactive && !io::stderr().is_terminal() {
        info!("No terminal attached, interface menu disabled");
        settings.interactive = false;
    }
    info!(data_dir = %settings.data_dir.display(), port = settings.port, "Starting pastebin");

    let prepared = {
        let mut stdout = io::stdout().lock();
        let prepared = pastebin::prepare(&settings, &SystemInterfaces, &mut stdout)
            .context("failed to prepare TLS material")?;
        pastebin::print_banner(prepared.primary, settings.port, &mut stdout)?;
        prepared
    };
    info!(
        cert = %settings.paths.cert.display(),
        key = %settings.paths.key.display(),
        reused = !prepared.outcome.regenerated(),
        "TLS material ready"
    );

    let listeners = server::bind(&server::listen_addrs(prepared.primary, settings.port)).await?;
    let router = server::router(Arc::new(AppState::new(prepared.primary, settings.port)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for Ctrl-C, serving until killed");
                // Dropping the sender would stop the listeners.
                std::future::pending::<()>().await;
            }
        }
    });

    server::serve(listeners, prepared.tls, router, shutdown_rx).await?;
    Ok(())
}
