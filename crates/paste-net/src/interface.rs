//! Interface enumeration and filtering.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use if_addrs::IfAddr;
use ipnet::Ipv4Net;
use tracing::{debug, warn};

use crate::error::{NetError, Result};

/// Name prefixes of software-defined interfaces.
const VIRTUAL_PREFIXES: &[&str] = &[
    "docker", "br-", "vmnet", "vboxnet", "lo", "tun", "tap", "zt", "wg", "vir",
];

/// One address assigned to one interface, as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    /// Interface name (e.g., "eth0").
    pub name: String,
    /// Assigned address.
    pub ip: IpAddr,
    /// Netmask of the assigned address.
    pub netmask: IpAddr,
    /// Whether the address is a loopback address.
    ///
    /// The OS listing reports addresses, not interface flags, so this is
    /// derived from `ip` (127.0.0.0/8, `::1`) rather than from the interface
    /// being flagged loopback.
    pub loopback: bool,
    /// Whether the interface is operationally up.
    pub up: bool,
}

impl InterfaceAddr {
    /// Creates a non-loopback IPv4 entry on an interface that is up.
    #[must_use]
    pub fn v4(name: impl Into<String>, ip: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            ip: IpAddr::V4(ip),
            netmask: IpAddr::V4(netmask),
            loopback: false,
            up: true,
        }
    }

    /// Marks the interface as down.
    #[must_use]
    pub fn down(mut self) -> Self {
        self.up = false;
        self
    }
}

/// Source of interface addresses.
///
/// Allows swapping the OS listing for a fixed one in tests.
pub trait InterfaceSource {
    /// Lists every address of every interface.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be obtained.
    fn addresses(&self) -> Result<Vec<InterfaceAddr>>;
}

/// Interfaces of the running host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn addresses(&self) -> Result<Vec<InterfaceAddr>> {
        let interfaces = if_addrs::get_if_addrs()?;
        Ok(interfaces
            .into_iter()
            .map(|iface| {
                let loopback = iface.is_loopback();
                let up = iface.is_oper_up();
                let (ip, netmask) = match iface.addr {
                    IfAddr::V4(v4) => (IpAddr::V4(v4.ip), IpAddr::V4(v4.netmask)),
                    IfAddr::V6(v6) => (IpAddr::V6(v6.ip), IpAddr::V6(v6.netmask)),
                };
                InterfaceAddr {
                    name: iface.name,
                    ip,
                    netmask,
                    loopback,
                    up,
                }
            })
            .collect())
    }
}

/// A fixed interface listing.
#[derive(Debug, Default, Clone)]
pub struct StaticInterfaces {
    addrs: Vec<InterfaceAddr>,
}

impl StaticInterfaces {
    /// Creates an empty listing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, addr: InterfaceAddr) -> Self {
        self.addrs.push(addr);
        self
    }
}

impl InterfaceSource for StaticInterfaces {
    fn addresses(&self) -> Result<Vec<InterfaceAddr>> {
        Ok(self.addrs.clone())
    }
}

/// A usable LAN interface address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInterface {
    /// Interface name.
    pub name: String,
    /// IPv4 address of the interface.
    pub ip: Ipv4Addr,
    /// Network the address belongs to.
    pub network: Ipv4Net,
}

impl fmt::Display for NetInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Interface: {:>10} | IP: {:<15} | Network: {}",
            self.name,
            self.ip.to_string(),
            self.network
        )
    }
}

/// Returns true if `name` looks like a bridge, tunnel, container or VPN link.
#[must_use]
pub fn is_virtual(name: &str) -> bool {
    VIRTUAL_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Lists the IPv4 addresses of `source` on interfaces that are up and are
/// neither loopback nor virtual.
///
/// # Errors
///
/// Returns `NetError::Enumerate` if the listing fails and
/// `NetError::NoInterfaces` if nothing usable remains after filtering.
pub fn real_interfaces(source: &impl InterfaceSource) -> Result<Vec<NetInterface>> {
    let mut result = Vec::new();

    for addr in source.addresses()? {
        if !addr.up {
            debug!(name = %addr.name, ip = %addr.ip, "Skipping interface that is down");
            continue;
        }
        if addr.loopback || addr.ip.is_loopback() || is_virtual(&addr.name) {
            debug!(name = %addr.name, ip = %addr.ip, "Skipping interface");
            continue;
        }
        let (IpAddr::V4(ip), IpAddr::V4(netmask)) = (addr.ip, addr.netmask) else {
            continue;
        };
        match Ipv4Net::with_netmask(ip, netmask) {
            Ok(net) => result.push(NetInterface {
                name: addr.name,
                ip,
                network: net.trunc(),
            }),
            Err(e) => warn!(name = %addr.name, %netmask, error = %e, "Ignoring invalid netmask"),
        }
    }

    if result.is_empty() {
        return Err(NetError::NoInterfaces);
    }
    Ok(result)
}

/// Addresses every new certificate must cover: each interface IP plus loopback.
#[must_use]
pub fn candidate_addresses(interfaces: &[NetInterface]) -> Vec<IpAddr> {
    let mut ips: Vec<IpAddr> = interfaces.iter().map(|iface| IpAddr::V4(iface.ip)).collect();
    let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
    if !ips.contains(&loopback) {
        ips.push(loopback);
    }
    ips
}
