//! Self-signed TLS material for the pastebin LAN server.
#![forbid(unsafe_code)]
//!
//! The server's network identity is only known at startup, so its
//! certificate is checked once per process start and replaced when it no
//! longer fits.
//!
//! # Overview
//!
//! The `paste-pki` crate provides:
//! - Verification of an on-disk certificate against the expected identity,
//!   the address the server is reached at, and the current time
//! - Generation of a self-signed P-256 certificate whose SAN list keeps every
//!   address a previous certificate already covered
//! - Atomic persistence of the certificate/key pair
//!
//! # Example
//!
//! ```no_run
//! use std::net::IpAddr;
//! use std::path::Path;
//!
//! use paste_pki::{CertIdentity, Outcome, PairPaths, ensure_certificate};
//!
//! let paths = PairPaths::in_dir(Path::new("/var/lib/pastebin"));
//! let primary: IpAddr = "192.168.1.10".parse().unwrap();
//! let candidates = [primary, "127.0.0.1".parse().unwrap()];
//!
//! match ensure_certificate(&paths, &CertIdentity::default(), &candidates, primary).unwrap() {
//!     Outcome::Reused => println!("existing certificate still valid"),
//!     Outcome::Regenerated { sans, .. } => println!("new certificate for {sans:?}"),
//! }
//! ```
//!
//! # Modules
//!
//! - [`lifecycle`] - Check-or-regenerate entry point
//! - [`verify`] - Verification of the existing certificate
//! - [`policy`] - Reuse predicates
//! - [`issue`] - Certificate generation
//! - [`store`] - Pair persistence
//! - [`addresses`] - SAN address reconciliation
//! - [`identity`] - Expected subject identity
//! - [`types`] - Certificate and key records
//! - [`error`] - Error types

pub mod addresses;
pub mod error;
pub mod identity;
pub mod issue;
pub mod lifecycle;
pub mod policy;
pub mod store;
pub mod types;
pub mod verify;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use identity::CertIdentity;
pub use issue::{IssuedPair, issue, issue_at};
pub use lifecycle::{Outcome, ensure_certificate, ensure_certificate_at};
pub use policy::{PolicyReport, Violation};
pub use store::{PairPaths, write_pair};
pub use types::{CertificateRecord, KeyRecord};
pub use verify::{Verdict, verify, verify_at};

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn full_workflow_test() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = PairPaths::in_dir(dir.path());
        let identity = CertIdentity::default();
        let lan = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));
        let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);

        // 1. Nothing on disk yet
        assert!(!verify(&paths, &identity, lan).is_valid());

        // 2. Ensure issues a pair
        let outcome = ensure_certificate(&paths, &identity, &[lan, loopback], lan).unwrap();
        assert!(outcome.regenerated());

        // 3. Every SAN address verifies
        for ip in [lan, loopback] {
            assert!(verify(&paths, &identity, ip).is_valid());
        }

        // 4. The key on disk belongs to the certificate
        let cert = CertificateRecord::from_pem(&std::fs::read(&paths.cert).unwrap()).unwrap();
        let key = KeyRecord::new(std::fs::read_to_string(&paths.key).unwrap());
        assert!(key.matches(&cert).unwrap());

        // 5. A second start reuses it
        let outcome = ensure_certificate(&paths, &identity, &[lan, loopback], lan).unwrap();
        assert!(matches!(outcome, Outcome::Reused));
    }
}
