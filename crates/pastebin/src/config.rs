//! Server configuration.
//!
//! Settings come from three layers, highest precedence first:
//! - Command-line flags and their `PASTEBIN_*` environment fallbacks
//! - An optional TOML file
//! - Built-in defaults

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use paste_pki::{CertIdentity, PairPaths};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{AppError, Result};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8443;

/// Application directory name under the platform data/config directories.
pub const APP_DIR: &str = "pastebin";

/// Configuration file name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Contents of the TOML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Listening port.
    pub port: Option<u16>,
    /// Address to serve on.
    pub ip: Option<IpAddr>,
    /// Application data directory.
    pub data_dir: Option<PathBuf>,
    /// Certificate PEM path.
    pub cert_path: Option<PathBuf>,
    /// Private key PEM path.
    pub key_path: Option<PathBuf>,
    /// Certificate identity.
    pub identity: CertIdentity,
}

impl FileConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AppError::Config(format!(
                "failed to read config file '{}': {e}",
                path.as_ref().display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("invalid TOML: {e}")))
    }

    /// Loads the file named on the command line, or the default one if present.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing or any file is invalid.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }
}

/// Fully resolved startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Listening port.
    pub port: u16,
    /// Operator-pinned address, if any.
    pub ip: Option<IpAddr>,
    /// Application data directory.
    pub data_dir: PathBuf,
    /// Certificate and key locations.
    pub paths: PairPaths,
    /// Identity the certificate must carry.
    pub identity: CertIdentity,
    /// Whether the interface menu may be shown.
    pub interactive: bool,
}

impl Settings {
    /// Merges flags over the file over defaults.
    ///
    /// `default_data_dir` is used when neither layer names a data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory can be determined or the
    /// resulting identity is invalid.
    pub fn resolve(
        cli: &Cli,
        file: FileConfig,
        default_data_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let data_dir = cli
            .data_dir
            .clone()
            .or(file.data_dir)
            .or(default_data_dir)
            .ok_or_else(|| {
                AppError::Config("cannot determine the application data directory".into())
            })?;

        let defaults = PairPaths::in_dir(&data_dir);
        let paths = PairPaths::new(
            cli.cert.clone().or(file.cert_path).unwrap_or(defaults.cert),
            cli.key.clone().or(file.key_path).unwrap_or(defaults.key),
        );

        let mut identity = file.identity;
        if let Some(cn) = &cli.common_name {
            identity.common_name.clone_from(cn);
        }
        if let Some(org) = &cli.organization {
            identity.organization.clone_from(org);
        }
        identity.validate()?;

        Ok(Self {
            port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
            ip: cli.ip.or(file.ip),
            data_dir,
            paths,
            identity,
            interactive: !cli.non_interactive,
        })
    }
}

/// Per-user data directory: `$XDG_DATA_HOME/pastebin` or the platform equivalent.
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR))
}

/// Per-user configuration file location.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
}
