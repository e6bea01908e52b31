//! Certificate and key records.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// PEM label of the certificate file.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// PEM label of the key file.
pub const EC_PRIVATE_KEY_LABEL: &str = "EC PRIVATE KEY";

/// Parsed view of an on-disk X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    /// DER-encoded certificate bytes.
    der: Vec<u8>,
    /// Subject common name, if present.
    common_name: Option<String>,
    /// Subject organizations in order.
    organizations: Vec<String>,
    /// SAN IP addresses.
    san_ips: Vec<IpAddr>,
    /// SAN DNS names.
    san_dns: Vec<String>,
    /// Certificate validity start time.
    not_before: DateTime<Utc>,
    /// Certificate validity end time.
    not_after: DateTime<Utc>,
    /// Serial number, lowercase hex.
    serial: String,
    /// Basic constraints CA flag.
    is_ca: bool,
    /// Subject public key as an uncompressed EC point (empty for other key types).
    public_key: Vec<u8>,
}

impl CertificateRecord {
    /// Decodes a PEM `CERTIFICATE` block and parses its payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the bytes are not a PEM certificate block and
    /// `Error::Parse` if the DER payload is not a valid certificate.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let (_, block) = x509_parser::pem::parse_x509_pem(pem)
            .map_err(|e| Error::Decode(e.to_string()))?;

        if block.label != CERTIFICATE_LABEL {
            return Err(Error::Decode(format!(
                "unexpected PEM block type '{}'",
                block.label
            )));
        }

        Self::from_der(&block.contents)
    }

    /// Parses a certificate from DER-encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::Parse(format!("failed to parse certificate: {e}")))?;

        let not_before = DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)
            .ok_or_else(|| Error::Parse("invalid not_before timestamp".into()))?;
        let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .ok_or_else(|| Error::Parse("invalid not_after timestamp".into()))?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .map(String::from);
        let organizations = cert
            .subject()
            .iter_organization()
            .filter_map(|attr| attr.as_str().ok())
            .map(String::from)
            .collect();
        let (san_ips, san_dns) = extract_san(&cert);

        let serial = cert
            .tbs_certificate
            .raw_serial()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        let public_key = match cert.public_key().parsed() {
            Ok(PublicKey::EC(point)) => point.data().to_vec(),
            _ => Vec::new(),
        };

        Ok(Self {
            der: der.to_vec(),
            common_name,
            organizations,
            san_ips,
            san_dns,
            not_before,
            not_after,
            serial,
            is_ca: cert.is_ca(),
            public_key,
        })
    }

    /// Returns the DER-encoded certificate bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the subject common name.
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// Returns the first subject organization.
    #[must_use]
    pub fn organization(&self) -> Option<&str> {
        self.organizations.first().map(String::as_str)
    }

    /// Returns all subject organizations.
    #[must_use]
    pub fn organizations(&self) -> &[String] {
        &self.organizations
    }

    /// Returns the SAN IP addresses.
    #[must_use]
    pub fn san_ips(&self) -> &[IpAddr] {
        &self.san_ips
    }

    /// Returns the SAN DNS names.
    #[must_use]
    pub fn san_dns(&self) -> &[String] {
        &self.san_dns
    }

    /// Returns the certificate validity start time.
    #[must_use]
    pub const fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// Returns the certificate validity end time.
    #[must_use]
    pub const fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Returns the serial number as lowercase hex.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Returns the basic constraints CA flag.
    #[must_use]
    pub const fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// Returns the subject public key bytes.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

/// Extracts SAN IP addresses and DNS names from a certificate.
fn extract_san(cert: &X509Certificate<'_>) -> (Vec<IpAddr>, Vec<String>) {
    let mut ips = Vec::new();
    let mut dns = Vec::new();

    if let Ok(Some(san_ext)) = cert.subject_alternative_name() {
        for name in &san_ext.value.general_names {
            match name {
                GeneralName::IPAddress(ip_bytes) => {
                    if let Some(ip) = parse_ip_bytes(ip_bytes) {
                        ips.push(ip);
                    }
                }
                GeneralName::DNSName(name) => dns.push((*name).to_string()),
                _ => {}
            }
        }
    }

    (ips, dns)
}

/// Parses IP address bytes into an `IpAddr`.
fn parse_ip_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        _ => None,
    }
}

/// A P-256 private key in SEC1 PEM form, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyRecord {
    pem: String,
}

impl KeyRecord {
    /// Wraps an `EC PRIVATE KEY` PEM document.
    #[must_use]
    pub const fn new(pem: String) -> Self {
        Self { pem }
    }

    /// Returns the PEM text.
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Returns true if this key is the private half of the certificate's public key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` if the PEM is not a SEC1 P-256 key.
    pub fn matches(&self, certificate: &CertificateRecord) -> Result<bool> {
        let secret = p256::SecretKey::from_sec1_pem(&self.pem)
            .map_err(|e| Error::Parse(format!("failed to parse private key: {e}")))?;
        let point = secret.public_key().to_encoded_point(false);
        Ok(point.as_bytes() == certificate.public_key())
    }
}

impl std::fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRecord")
            .field("pem", &"[REDACTED]")
            .finish()
    }
}
