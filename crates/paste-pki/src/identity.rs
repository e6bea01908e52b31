//! Certificate identity configuration.
//!
//! The subject fields that mark a certificate as "ours" are plain values
//! handed to verification and generation, never process-wide constants.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default subject common name.
pub const DEFAULT_COMMON_NAME: &str = "Pastebin Cert";

/// Default subject organization.
pub const DEFAULT_ORGANIZATION: &str = "eng.vitor";

/// Default validity period of a generated certificate.
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

/// Identity a certificate must carry to be reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertIdentity {
    /// Expected subject common name.
    pub common_name: String,
    /// Expected first subject organization.
    pub organization: String,
    /// Validity period for newly generated certificates.
    pub validity_days: u32,
    /// DNS names added to every generated certificate.
    pub dns_names: Vec<String>,
}

impl CertIdentity {
    /// Creates an identity with the given subject fields and default validity.
    #[must_use]
    pub fn new(common_name: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            organization: organization.into(),
            ..Self::default()
        }
    }

    /// Sets the validity period in days.
    #[must_use]
    pub const fn with_validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Replaces the DNS names.
    #[must_use]
    pub fn with_dns_names(mut self, names: Vec<String>) -> Self {
        self.dns_names = names;
        self
    }

    /// Validates the identity.
    ///
    /// # Errors
    ///
    /// Returns an error if a subject field is empty or the validity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.common_name.is_empty() {
            return Err(Error::Config("common name cannot be empty".into()));
        }
        if self.organization.is_empty() {
            return Err(Error::Config("organization cannot be empty".into()));
        }
        if self.validity_days == 0 {
            return Err(Error::Config("validity_days must be greater than 0".into()));
        }
        Ok(())
    }
}

impl Default for CertIdentity {
    fn default() -> Self {
        Self {
            common_name: DEFAULT_COMMON_NAME.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            validity_days: DEFAULT_VALIDITY_DAYS,
            dns_names: vec!["localhost".to_string()],
        }
    }
}
