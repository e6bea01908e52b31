//! Server URLs shown to the operator and linked from pages.

use std::net::{IpAddr, SocketAddr};

/// Host name used for clients on the server machine itself.
pub const LOCALHOST: &str = "localhost";

/// URL of the server root at `ip`.
#[must_use]
pub fn server_url(ip: IpAddr, port: u16) -> String {
    format!("https://{}/", SocketAddr::new(ip, port))
}

/// URL of the server root for clients on the server machine.
#[must_use]
pub fn local_url(port: u16) -> String {
    format!("https://{LOCALHOST}:{port}/")
}

/// Link to the paste `id` as reached from the LAN.
#[must_use]
pub fn content_url(ip: IpAddr, port: u16, id: &str) -> String {
    format!("{}c#{id}", server_url(ip, port))
}

/// Home URL for a client, given its `Host` header and peer address.
///
/// Clients that reached the server as `localhost` or connect from the server
/// machine get the local URL; everyone else gets the LAN address.
#[must_use]
pub fn home_url(client_host: &str, peer: IpAddr, server_ip: IpAddr, port: u16) -> String {
    if host_part(client_host) == LOCALHOST || is_local_peer(peer, server_ip) {
        local_url(port)
    } else {
        server_url(server_ip, port)
    }
}

/// Strips the port from a `Host` header value.
fn host_part(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

fn is_local_peer(peer: IpAddr, server_ip: IpAddr) -> bool {
    let peer = peer.to_canonical();
    peer == server_ip || peer.is_loopback()
}
