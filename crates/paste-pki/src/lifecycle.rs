//! Startup-time certificate lifecycle: `Check -> {Reuse | Regenerate}`.
//!
//! The decision is made exactly once per call. Verification failures only
//! ever lead to regeneration; generation failures are returned to the caller.
//! A certificate that verifies is only reused together with its own key.

use std::fs;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::addresses;
use crate::error::{Error, Result};
use crate::identity::CertIdentity;
use crate::issue::issue_at;
use crate::store::{PairPaths, write_pair};
use crate::types::{CertificateRecord, KeyRecord};
use crate::verify::{Verdict, verify_at};

/// What [`ensure_certificate`] did with the on-disk material.
#[derive(Debug)]
pub enum Outcome {
    /// The existing pair was kept untouched.
    Reused,
    /// A new pair was written.
    Regenerated {
        /// Why the previous certificate was rejected.
        reason: Error,
        /// SAN IP addresses of the new certificate.
        sans: Vec<IpAddr>,
    },
}

impl Outcome {
    /// Returns true if new material was written.
    #[must_use]
    pub const fn regenerated(&self) -> bool {
        matches!(self, Self::Regenerated { .. })
    }
}

/// Makes sure `paths` hold a usable pair covering `primary`.
///
/// See [`ensure_certificate_at`].
///
/// # Errors
///
/// Returns `Error::Config`, `Error::Crypto` or `Error::Write` if a replacement
/// could not be produced.
pub fn ensure_certificate(
    paths: &PairPaths,
    identity: &CertIdentity,
    candidates: &[IpAddr],
    primary: IpAddr,
) -> Result<Outcome> {
    ensure_certificate_at(paths, identity, candidates, primary, Utc::now())
}

/// Makes sure `paths` hold a pair for `identity` covering `primary` at `now`.
///
/// An existing pair that passes verification and whose key belongs to the
/// certificate is reused as is. Otherwise a new pair is issued for `candidates`, the primary address and whatever SAN
/// addresses the rejected certificate still carried, and written over the old
/// files.
///
/// # Errors
///
/// Returns `Error::Config`, `Error::Crypto` or `Error::Write` if a replacement
/// could not be produced.
pub fn ensure_certificate_at(
    paths: &PairPaths,
    identity: &CertIdentity,
    candidates: &[IpAddr],
    primary: IpAddr,
    now: DateTime<Utc>,
) -> Result<Outcome> {
    let (error, prior_sans) = match verify_at(paths, identity, primary, now) {
        Verdict::Valid(record) => match check_key(paths, &record) {
            Ok(()) => {
                info!(path = %paths.cert.display(), "Reusing existing certificate");
                return Ok(Outcome::Reused);
            }
            Err(error) => (error, record.san_ips().to_vec()),
        },
        Verdict::Invalid { error, prior_sans } => (error, prior_sans),
    };

    info!(reason = %error, "A new certificate has to be issued");

    let mut inputs = candidates.to_vec();
    if !addresses::contains(&inputs, primary) {
        inputs.push(primary);
    }

    let pair = issue_at(identity, &inputs, &prior_sans, now)?;
    write_pair(paths, &pair)?;

    Ok(Outcome::Regenerated {
        reason: error,
        sans: pair.certificate.san_ips().to_vec(),
    })
}

/// Confirms the key file holds the private half of `record`.
fn check_key(paths: &PairPaths, record: &CertificateRecord) -> Result<()> {
    let pem = fs::read_to_string(&paths.key).map_err(|e| {
        Error::Read(format!("failed to read {}: {e}", paths.key.display()))
    })?;
    if KeyRecord::new(pem).matches(record)? {
        Ok(())
    } else {
        Err(Error::InvalidCert(format!(
            "{} does not hold the key of {}",
            paths.key.display(),
            paths.cert.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::verify;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn first_run_generates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = PairPaths::in_dir(dir.path());

        let outcome = ensure_certificate(
            &paths,
            &CertIdentity::default(),
            &[ip("10.0.0.5"), ip("127.0.0.1")],
            ip("10.0.0.5"),
        )
        .unwrap();

        match outcome {
            Outcome::Regenerated { reason, sans } => {
                assert!(matches!(reason, Error::NotFound(_)));
                assert_eq!(sans, vec![ip("10.0.0.5"), ip("127.0.0.1")]);
            }
            Outcome::Reused => unreachable!("nothing to reuse"),
        }
    }

    #[test]
    fn second_run_reuses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = PairPaths::in_dir(dir.path());
        let identity = CertIdentity::default();
        let candidates = [ip("10.0.0.5"), ip("127.0.0.1")];

        let first = ensure_certificate(&paths, &identity, &candidates, ip("10.0.0.5")).unwrap();
        let second = ensure_certificate(&paths, &identity, &candidates, ip("10.0.0.5")).unwrap();

        assert!(first.regenerated());
        assert!(!second.regenerated());
    }

    #[test]
    fn primary_missing_from_candidates_is_still_covered() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = PairPaths::in_dir(dir.path());
        let identity = CertIdentity::default();

        ensure_certificate(&paths, &identity, &[ip("127.0.0.1")], ip("172.16.0.9")).unwrap();

        assert!(verify(&paths, &identity, ip("172.16.0.9")).is_valid());
    }

    #[test]
    fn changed_identity_regenerates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = PairPaths::in_dir(dir.path());
        let candidates = [ip("10.0.0.5")];

        ensure_certificate(&paths, &CertIdentity::default(), &candidates, ip("10.0.0.5")).unwrap();
        let renamed = CertIdentity::new("Other Cert", "eng.vitor");
        let outcome = ensure_certificate(&paths, &renamed, &candidates, ip("10.0.0.5")).unwrap();

        assert!(matches!(
            outcome,
            Outcome::Regenerated { reason: Error::InvalidCert(_), .. }
        ));
        assert!(verify(&paths, &renamed, ip("10.0.0.5")).is_valid());
    }

    #[test]
    fn foreign_key_regenerates_with_same_addresses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = PairPaths::in_dir(dir.path());
        let identity = CertIdentity::default();
        let candidates = [ip("10.0.0.5"), ip("127.0.0.1")];
        ensure_certificate(&paths, &identity, &candidates, ip("10.0.0.5")).unwrap();

        let other = PairPaths::in_dir(&dir.path().join("other"));
        ensure_certificate(&other, &identity, &[ip("127.0.0.1")], ip("127.0.0.1")).unwrap();
        fs::copy(&other.key, &paths.key).unwrap();

        let outcome = ensure_certificate(&paths, &identity, &candidates, ip("10.0.0.5")).unwrap();
        let Outcome::Regenerated { reason, sans } = outcome else {
            unreachable!("a foreign key cannot be reused");
        };
        assert!(matches!(reason, Error::InvalidCert(_)));
        assert_eq!(sans, vec![ip("10.0.0.5"), ip("127.0.0.1")]);

        let cert = CertificateRecord::from_pem(&fs::read(&paths.cert).unwrap()).unwrap();
        let key = KeyRecord::new(fs::read_to_string(&paths.key).unwrap());
        assert!(key.matches(&cert).unwrap());

        let again = ensure_certificate(&paths, &identity, &candidates, ip("10.0.0.5")).unwrap();
        assert!(!again.regenerated());
    }

    #[test]
    fn unparseable_key_regenerates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = PairPaths::in_dir(dir.path());
        let identity = CertIdentity::default();
        ensure_certificate(&paths, &identity, &[ip("127.0.0.1")], ip("127.0.0.1")).unwrap();
        fs::write(&paths.key, "not a key").unwrap();

        let outcome = ensure_certificate(&paths, &identity, &[ip("127.0.0.1")], ip("127.0.0.1"))
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::Regenerated { reason: Error::Parse(_), .. }
        ));
    }

    #[test]
    fn write_failure_is_returned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        // Parent of both targets is a regular file.
        let paths = PairPaths::in_dir(&blocker.join("pki"));

        let result = ensure_certificate(
            &paths,
            &CertIdentity::default(),
            &[ip("127.0.0.1")],
            ip("127.0.0.1"),
        );

        assert!(matches!(result, Err(Error::Write(_))));
    }
}
