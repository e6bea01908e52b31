//! Verification of the on-disk certificate.
//!
//! Verification never mutates anything and never aborts: every failure is
//! reported as a [`Verdict::Invalid`] for the caller to act on.

use std::fs;
use std::io::ErrorKind;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::Error;
use crate::identity::CertIdentity;
use crate::policy::PolicyReport;
use crate::store::PairPaths;
use crate::types::CertificateRecord;

/// Result of checking the existing certificate.
#[derive(Debug)]
pub enum Verdict {
    /// The certificate can be reused as is.
    Valid(CertificateRecord),
    /// The certificate must be replaced.
    Invalid {
        /// Why the certificate was rejected.
        error: Error,
        /// SAN addresses recovered from a parseable certificate.
        prior_sans: Vec<IpAddr>,
    },
}

impl Verdict {
    /// Returns true if the certificate can be reused.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns the rejection error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid { error, .. } => Some(error),
        }
    }

    /// Returns the SAN addresses worth carrying over into a replacement.
    #[must_use]
    pub fn prior_sans(&self) -> &[IpAddr] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid { prior_sans, .. } => prior_sans,
        }
    }

    fn rejected(error: Error) -> Self {
        Self::Invalid {
            error,
            prior_sans: Vec::new(),
        }
    }
}

/// Checks the certificate at `paths` against the identity and `required` address now.
#[must_use]
pub fn verify(paths: &PairPaths, identity: &CertIdentity, required: IpAddr) -> Verdict {
    verify_at(paths, identity, required, Utc::now())
}

/// Checks the certificate at `paths` against the identity and `required` address.
///
/// The key file is only checked for existence.
#[must_use]
pub fn verify_at(
    paths: &PairPaths,
    identity: &CertIdentity,
    required: IpAddr,
    now: DateTime<Utc>,
) -> Verdict {
    let cert_bytes = match fs::read(&paths.cert) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Verdict::rejected(Error::NotFound(paths.cert.display().to_string()));
        }
        Err(e) => {
            return Verdict::rejected(Error::Read(format!(
                "failed to read {}: {e}",
                paths.cert.display()
            )));
        }
    };

    if let Err(e) = fs::metadata(&paths.key) {
        return Verdict::rejected(Error::Read(format!(
            "failed to stat {}: {e}",
            paths.key.display()
        )));
    }

    let record = match CertificateRecord::from_pem(&cert_bytes) {
        Ok(record) => record,
        Err(error) => return Verdict::rejected(error),
    };

    debug!(
        common_name = ?record.common_name(),
        organization = ?record.organization(),
        sans = ?record.san_ips(),
        not_after = %record.not_after(),
        "Existing certificate"
    );

    let report = PolicyReport::evaluate(&record, identity, required, now);
    if report.passed() {
        return Verdict::Valid(record);
    }

    Verdict::Invalid {
        error: Error::InvalidCert(report.to_string()),
        prior_sans: record.san_ips().to_vec(),
    }
}
