//! Command-line argument parsing with clap.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

/// LAN pastebin server over self-signed HTTPS.
///
/// Every flag left unset falls back to the configuration file, then to the
/// built-in default.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "pastebin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Server listening port [default: 8443].
    #[arg(short, long, env = "PASTEBIN_PORT")]
    pub port: Option<u16>,

    /// Address to serve on, skipping the interface menu.
    #[arg(long, env = "PASTEBIN_IP")]
    pub ip: Option<IpAddr>,

    /// Certificate PEM path [default: <data-dir>/cert.pem].
    #[arg(long, env = "PASTEBIN_CERT")]
    pub cert: Option<PathBuf>,

    /// Private key PEM path [default: <data-dir>/key.pem].
    #[arg(long, env = "PASTEBIN_KEY")]
    pub key: Option<PathBuf>,

    /// Application data directory.
    #[arg(long, env = "PASTEBIN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to a TOML configuration file.
    #[arg(short, long, env = "PASTEBIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Certificate subject common name.
    #[arg(long, env = "PASTEBIN_COMMON_NAME")]
    pub common_name: Option<String>,

    /// Certificate subject organization.
    #[arg(long, env = "PASTEBIN_ORGANIZATION")]
    pub organization: Option<String>,

    /// Never show the menu; pick the first interface when several are found.
    #[arg(long, env = "PASTEBIN_NON_INTERACTIVE")]
    pub non_interactive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_flags_leaves_everything_unset() {
        let cli = Cli::try_parse_from(["pastebin"]).unwrap();
        assert!(cli.port.is_none());
        assert!(cli.ip.is_none());
        assert!(!cli.non_interactive);
    }

    #[test]
    fn flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "pastebin",
            "--port",
            "9443",
            "--ip",
            "192.168.1.10",
            "--cert",
            "/tmp/c.pem",
            "--common-name",
            "Office Paste",
            "--non-interactive",
        ])
        .unwrap();

        assert_eq!(cli.port, Some(9443));
        assert_eq!(cli.ip, Some("192.168.1.10".parse().unwrap()));
        assert_eq!(cli.cert, Some(PathBuf::from("/tmp/c.pem")));
        assert_eq!(cli.common_name.as_deref(), Some("Office Paste"));
        assert!(cli.non_interactive);
    }

    #[test]
    fn invalid_ip_is_rejected() {
        assert!(Cli::try_parse_from(["pastebin", "--ip", "not-an-ip"]).is_err());
    }
}
