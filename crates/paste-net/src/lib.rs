//! LAN interface discovery for the pastebin server.
#![forbid(unsafe_code)]
//!
//! Finds the IPv4 addresses the server can be reached at on the local
//! network. Interfaces that are down, loopback addresses and software-defined
//! interfaces (bridges, tunnels, container and VPN links) are skipped.
//!
//! # Example
//!
//! ```no_run
//! use paste_net::{SystemInterfaces, candidate_addresses, real_interfaces};
//!
//! let interfaces = real_interfaces(&SystemInterfaces).unwrap();
//! for iface in &interfaces {
//!     println!("{iface}");
//! }
//! let sans = candidate_addresses(&interfaces);
//! ```

pub mod error;
pub mod interface;

pub use error::{NetError, Result};
pub use interface::{
    InterfaceAddr, InterfaceSource, NetInterface, StaticInterfaces, SystemInterfaces,
    candidate_addresses, is_virtual, real_interfaces,
};
