//! Certificate/key pair persistence.
//!
//! The filesystem is the only owner of the PKI material. A pair is always
//! written as a unit: both files are staged next to their targets and only
//! renamed into place once both stagings succeeded. Files being replaced are
//! set aside first and put back if the swap fails half way.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::issue::IssuedPair;

/// Default certificate file name.
pub const CERT_FILE_NAME: &str = "cert.pem";

/// Default key file name.
pub const KEY_FILE_NAME: &str = "key.pem";

/// Locations of the certificate and key files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairPaths {
    /// Certificate PEM path.
    pub cert: PathBuf,
    /// Private key PEM path.
    pub key: PathBuf,
}

impl PairPaths {
    /// Creates a pair from explicit paths.
    #[must_use]
    pub fn new(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }

    /// Uses the default file names inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CERT_FILE_NAME), dir.join(KEY_FILE_NAME))
    }
}

/// Writes a freshly issued pair, replacing any existing files.
///
/// The old certificate is moved out of the way before the new key lands, so
/// an interrupted run leaves no certificate behind rather than an old
/// certificate next to a new key. If a rename fails, the previous pair is put
/// back.
///
/// # Errors
///
/// Returns `Error::Write` if any directory, staging or rename step fails.
/// Staged files are removed on failure.
pub fn write_pair(paths: &PairPaths, pair: &IssuedPair) -> Result<()> {
    for path in [&paths.cert, &paths.key] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Write(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
    }

    let cert_tmp = staging_path(&paths.cert);
    let key_tmp = staging_path(&paths.key);

    let result = stage(&cert_tmp, pair.cert_pem.as_bytes())
        .and_then(|()| stage(&key_tmp, pair.key.pem().as_bytes()))
        .and_then(|()| swap_in(&[(&key_tmp, &paths.key), (&cert_tmp, &paths.cert)]));

    if result.is_err() {
        discard(&cert_tmp);
        discard(&key_tmp);
        return result;
    }

    info!(path = %paths.cert.display(), "Certificate written");
    info!(path = %paths.key.display(), "Private key written");
    Ok(())
}

/// Renames each staged file over its target, in order.
///
/// Existing targets are set aside in reverse order beforehand. On success the
/// set-aside copies are dropped; on failure they are renamed back.
fn swap_in(moves: &[(&Path, &Path)]) -> Result<()> {
    let mut backups = Vec::new();
    let result = swap_steps(moves, &mut backups);

    if result.is_ok() {
        for (backup, _) in &backups {
            discard(backup);
        }
    } else {
        for (backup, target) in backups.iter().rev() {
            restore(backup, target);
        }
    }
    result
}

fn swap_steps<'a>(
    moves: &[(&Path, &'a Path)],
    backups: &mut Vec<(PathBuf, &'a Path)>,
) -> Result<()> {
    for &(_, target) in moves.iter().rev() {
        if let Some(backup) = set_aside(target)? {
            backups.push((backup, target));
        }
    }
    for &(tmp, target) in moves {
        commit(tmp, target)?;
    }
    Ok(())
}

/// Sibling path used while staging `path`.
fn staging_path(path: &Path) -> PathBuf {
    sibling(path, ".tmp")
}

/// Sibling path holding the previous file while `path` is replaced.
fn backup_path(path: &Path) -> PathBuf {
    sibling(path, ".old")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn stage(tmp: &Path, contents: &[u8]) -> Result<()> {
    debug!(path = %tmp.display(), "Staging PEM file");
    fs::write(tmp, contents)
        .map_err(|e| Error::Write(format!("failed to write {}: {e}", tmp.display())))
}

fn commit(tmp: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp, target).map_err(|e| {
        Error::Write(format!(
            "failed to replace {} with {}: {e}",
            target.display(),
            tmp.display()
        ))
    })
}

/// Moves an existing regular file at `target` to its backup path.
///
/// Returns `None` when there is no file to protect.
fn set_aside(target: &Path) -> Result<Option<PathBuf>> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Write(format!("failed to inspect {}: {e}", target.display())));
        }
    }

    let backup = backup_path(target);
    fs::rename(target, &backup).map_err(|e| {
        Error::Write(format!(
            "failed to move {} aside to {}: {e}",
            target.display(),
            backup.display()
        ))
    })?;
    debug!(path = %target.display(), backup = %backup.display(), "Previous file set aside");
    Ok(Some(backup))
}

fn restore(backup: &Path, target: &Path) {
    match fs::rename(backup, target) {
        Ok(()) => warn!(path = %target.display(), "Previous file restored"),
        Err(e) => warn!(
            path = %target.display(),
            backup = %backup.display(),
            error = %e,
            "Failed to restore previous file"
        ),
    }
}

fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %tmp.display(), error = %e, "Failed to remove staged file");
        }
    }
}
