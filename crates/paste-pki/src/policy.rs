//! Reuse policy for an existing certificate.
//!
//! Each check is an independent pure predicate; a certificate is reused only
//! when all of them hold.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::addresses;
use crate::identity::CertIdentity;
use crate::types::CertificateRecord;

/// Checks if the subject common name matches the expected identity.
#[must_use]
pub fn common_name_matches(cert: &CertificateRecord, identity: &CertIdentity) -> bool {
    cert.common_name() == Some(identity.common_name.as_str())
}

/// Checks if the first subject organization matches the expected identity.
#[must_use]
pub fn organization_matches(cert: &CertificateRecord, identity: &CertIdentity) -> bool {
    cert.organization() == Some(identity.organization.as_str())
}

/// Checks if the address the server is reached at is a SAN entry.
#[must_use]
pub fn covers_address(cert: &CertificateRecord, required: IpAddr) -> bool {
    addresses::contains(cert.san_ips(), required)
}

/// Checks if `now` lies within `[not_before, not_after)`.
#[must_use]
pub fn is_live_at(cert: &CertificateRecord, now: DateTime<Utc>) -> bool {
    cert.not_before() <= now && now < cert.not_after()
}

/// A failed policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Subject common name differs.
    CommonName {
        /// Expected value.
        expected: String,
        /// Value found in the certificate.
        found: Option<String>,
    },
    /// First subject organization differs.
    Organization {
        /// Expected value.
        expected: String,
        /// Value found in the certificate.
        found: Option<String>,
    },
    /// Required address is not a SAN entry.
    AddressNotCovered(IpAddr),
    /// Certificate is expired or not yet valid.
    OutsideValidity {
        /// Certificate validity start time.
        not_before: DateTime<Utc>,
        /// Certificate validity end time.
        not_after: DateTime<Utc>,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommonName { expected, found } => write!(
                f,
                "common name {} does not match '{expected}'",
                found.as_deref().map_or_else(|| "<missing>".to_string(), |cn| format!("'{cn}'"))
            ),
            Self::Organization { expected, found } => write!(
                f,
                "organization {} does not match '{expected}'",
                found.as_deref().map_or_else(|| "<missing>".to_string(), |o| format!("'{o}'"))
            ),
            Self::AddressNotCovered(ip) => write!(f, "address {ip} not covered"),
            Self::OutsideValidity {
                not_before,
                not_after,
            } => write!(f, "expired or not yet valid ({not_before} .. {not_after})"),
        }
    }
}

/// Outcome of every reuse predicate for one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyReport {
    violations: Vec<Violation>,
}

impl PolicyReport {
    /// Evaluates all predicates against the certificate.
    #[must_use]
    pub fn evaluate(
        cert: &CertificateRecord,
        identity: &CertIdentity,
        required: IpAddr,
        now: DateTime<Utc>,
    ) -> Self {
        let mut violations = Vec::new();

        if !common_name_matches(cert, identity) {
            violations.push(Violation::CommonName {
                expected: identity.common_name.clone(),
                found: cert.common_name().map(String::from),
            });
        }
        if !organization_matches(cert, identity) {
            violations.push(Violation::Organization {
                expected: identity.organization.clone(),
                found: cert.organization().map(String::from),
            });
        }
        if !covers_address(cert, required) {
            violations.push(Violation::AddressNotCovered(required));
        }
        if !is_live_at(cert, now) {
            violations.push(Violation::OutsideValidity {
                not_before: cert.not_before(),
                not_after: cert.not_after(),
            });
        }

        Self { violations }
    }

    /// Returns true if every predicate held.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns the failed predicates.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for PolicyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return write!(f, "ok");
        }
        let parts: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}
