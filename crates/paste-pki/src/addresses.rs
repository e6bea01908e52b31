//! Address canonicalization and SAN reconciliation.

use std::net::IpAddr;

/// Returns the canonical form of an address.
///
/// IPv4-mapped IPv6 addresses collapse to plain IPv4 so that `::ffff:10.0.0.5`
/// and `10.0.0.5` compare equal.
#[must_use]
pub fn canonical(ip: IpAddr) -> IpAddr {
    ip.to_canonical()
}

/// Returns true if `required` is one of `sans`, comparing canonical forms.
#[must_use]
pub fn contains(sans: &[IpAddr], required: IpAddr) -> bool {
    let required = canonical(required);
    sans.iter().any(|ip| canonical(*ip) == required)
}

/// Builds the SAN list for a new certificate.
///
/// The result holds every candidate and every previously certified address
/// exactly once, sorted by textual form.
#[must_use]
pub fn reconcile(candidates: &[IpAddr], prior: &[IpAddr]) -> Vec<IpAddr> {
    let mut keyed: Vec<(String, IpAddr)> = candidates
        .iter()
        .chain(prior)
        .map(|ip| {
            let ip = canonical(*ip);
            (ip.to_string(), ip)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.dedup_by(|a, b| a.0 == b.0);
    keyed.into_iter().map(|(_, ip)| ip).collect()
}
