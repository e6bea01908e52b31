//! Self-signed certificate generation.

use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use p256::pkcs8::{DecodePrivateKey, LineEnding};
use rand::RngCore;
use rand::rngs::OsRng;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    Ia5String, IsCa, KeyPair, KeyUsagePurpose, PKCS_ECDSA_P256_SHA256, SanType, SerialNumber,
};
use tracing::{debug, info};

use crate::addresses;
use crate::error::{Error, Result};
use crate::identity::CertIdentity;
use crate::types::{CertificateRecord, KeyRecord};

/// Length of the random serial number in bytes.
const SERIAL_LEN: usize = 16;

/// A freshly generated certificate and its private key.
#[derive(Debug, Clone)]
pub struct IssuedPair {
    /// Parsed view of the new certificate.
    pub certificate: CertificateRecord,
    /// PEM `CERTIFICATE` block.
    pub cert_pem: String,
    /// PEM `EC PRIVATE KEY` block.
    pub key: KeyRecord,
}

/// Generates a self-signed certificate valid from now.
///
/// See [`issue_at`].
pub fn issue(
    identity: &CertIdentity,
    candidates: &[IpAddr],
    prior_sans: &[IpAddr],
) -> Result<IssuedPair> {
    issue_at(identity, candidates, prior_sans, Utc::now())
}

/// Generates a self-signed certificate whose validity starts at `now`.
///
/// The SAN IP list is the reconciliation of `candidates` and `prior_sans`,
/// followed by the identity's DNS names.
///
/// # Errors
///
/// Returns `Error::Config` for an invalid identity and `Error::Crypto` if key,
/// serial or signature generation fails.
pub fn issue_at(
    identity: &CertIdentity,
    candidates: &[IpAddr],
    prior_sans: &[IpAddr],
    now: DateTime<Utc>,
) -> Result<IssuedPair> {
    identity.validate()?;

    let sans = addresses::reconcile(candidates, prior_sans);
    info!(
        common_name = %identity.common_name,
        sans = ?sans,
        "Issuing self-signed certificate"
    );

    let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
        .map_err(|e| Error::Crypto(format!("failed to generate key pair: {e}")))?;

    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, &identity.common_name);
    params
        .distinguished_name
        .push(DnType::OrganizationName, &identity.organization);
    params.serial_number = Some(random_serial()?);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let not_after = now + Duration::days(i64::from(identity.validity_days));
    params.not_before = to_rcgen_time(now)?;
    params.not_after = to_rcgen_time(not_after)?;

    params.subject_alt_names = subject_alt_names(&sans, &identity.dns_names)?;

    // Issuer == subject: signed with its own key.
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| Error::Crypto(format!("failed to sign certificate: {e}")))?;

    let certificate = CertificateRecord::from_der(cert.der())?;
    let key = sec1_key(&key_pair)?;

    debug!(serial = %certificate.serial(), "Certificate issued successfully");

    Ok(IssuedPair {
        certificate,
        cert_pem: cert.pem(),
        key,
    })
}

/// Draws a 128-bit serial number from the OS random source.
fn random_serial() -> Result<SerialNumber> {
    let mut bytes = [0u8; SERIAL_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Crypto(format!("failed to generate serial number: {e}")))?;
    Ok(SerialNumber::from_slice(&bytes))
}

/// Re-encodes the rcgen PKCS#8 key as a SEC1 `EC PRIVATE KEY` document.
fn sec1_key(key_pair: &KeyPair) -> Result<KeyRecord> {
    let secret = p256::SecretKey::from_pkcs8_der(&key_pair.serialize_der())
        .map_err(|e| Error::Crypto(format!("failed to decode generated key: {e}")))?;
    let pem = secret
        .to_sec1_pem(LineEnding::LF)
        .map_err(|e| Error::Crypto(format!("failed to encode private key: {e}")))?;
    Ok(KeyRecord::new(pem.to_string()))
}

/// Converts SAN IPs and DNS names to rcgen `SanTypes`.
fn subject_alt_names(ips: &[IpAddr], dns_names: &[String]) -> Result<Vec<SanType>> {
    let mut sans: Vec<SanType> = ips.iter().map(|ip| SanType::IpAddress(*ip)).collect();
    for dns in dns_names {
        let ia5 = Ia5String::try_from(dns.clone())
            .map_err(|e| Error::Config(format!("invalid DNS name '{dns}': {e}")))?;
        sans.push(SanType::DnsName(ia5));
    }
    Ok(sans)
}

/// Converts a chrono `DateTime` to rcgen `OffsetDateTime`.
fn to_rcgen_time(dt: DateTime<Utc>) -> Result<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .map_err(|e| Error::Crypto(format!("invalid timestamp: {e}")))
}
