//! Primary address selection.

use std::net::{IpAddr, Ipv4Addr};

use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use paste_net::NetInterface;
use tracing::{info, warn};

use crate::error::{AppError, Result};

/// Picks the address the server is advertised at.
///
/// An explicit address wins if it belongs to a discovered interface or is
/// loopback; IPv4-mapped IPv6 forms are accepted and returned as IPv4.
/// Otherwise a single interface is taken as is, and several are offered in an
/// interactive menu unless `interactive` is false, in which case the first
/// one is used.
///
/// # Errors
///
/// Returns `AppError::Config` for an explicit address no interface carries,
/// and `AppError::Prompt` if the menu cannot be shown.
pub fn select_primary(
    interfaces: &[NetInterface],
    explicit: Option<IpAddr>,
    interactive: bool,
) -> Result<IpAddr> {
    select_with(interfaces, explicit, interactive, prompt)
}

/// [`select_primary`] with the menu replaced by `pick`, which receives the
/// interface labels and returns the chosen index.
fn select_with(
    interfaces: &[NetInterface],
    explicit: Option<IpAddr>,
    interactive: bool,
    pick: impl FnOnce(&[String]) -> Result<usize>,
) -> Result<IpAddr> {
    if let Some(ip) = explicit {
        let ip = ip.to_canonical();
        let known = interfaces.iter().any(|iface| IpAddr::V4(iface.ip) == ip);
        if !known && ip != IpAddr::V4(Ipv4Addr::LOCALHOST) {
            return Err(AppError::Config(format!(
                "address {ip} does not belong to any usable interface"
            )));
        }
        return Ok(ip);
    }

    let Some(first) = interfaces.first() else {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    };

    let index = if interfaces.len() > 1 && interactive {
        let labels: Vec<String> = interfaces.iter().map(ToString::to_string).collect();
        pick(&labels)?
    } else {
        0
    };
    let chosen = interfaces.get(index).unwrap_or_else(|| {
        warn!(index, "Selection out of range, using the first interface");
        first
    });

    info!(interface = %chosen.name, ip = %chosen.ip, "Selected interface");
    Ok(IpAddr::V4(chosen.ip))
}

/// Shows the interface menu on the terminal. Escape keeps the first entry.
fn prompt(labels: &[String]) -> Result<usize> {
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the network interface to serve on")
        .items(labels)
        .default(0)
        .interact_opt()
        .map_err(|e| AppError::Prompt(e.to_string()))?;
    Ok(choice.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn iface(name: &str, ip: [u8; 4]) -> NetInterface {
        NetInterface {
            name: name.into(),
            ip: Ipv4Addr::from(ip),
            network: format!("{}.{}.{}.0/24", ip[0], ip[1], ip[2]).parse().unwrap(),
        }
    }

    fn two() -> Vec<NetInterface> {
        vec![iface("eth0", [192, 168, 1, 10]), iface("wlan0", [10, 0, 0, 5])]
    }

    fn unused(_: &[String]) -> Result<usize> {
        unreachable!("menu must not be shown")
    }

    #[test_case(0, "192.168.1.10" ; "first entry")]
    #[test_case(1, "10.0.0.5" ; "second entry")]
    #[test_case(7, "192.168.1.10" ; "out of range falls back")]
    fn menu_choice(index: usize, expected: &str) {
        let ip = select_with(&two(), None, true, |_| Ok(index)).unwrap();
        assert_eq!(ip, expected.parse::<IpAddr>().unwrap());
    }

    #[test]
    fn menu_lists_interface_lines() {
        let mut seen = Vec::new();
        select_with(&two(), None, true, |labels| {
            seen = labels.to_vec();
            Ok(0)
        })
        .unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("Interface:       eth0"));
        assert!(seen[1].starts_with("Interface:      wlan0"));
    }

    #[test]
    fn menu_failure_is_returned() {
        let result = select_with(&two(), None, true, |_| {
            Err(AppError::Prompt("not a terminal".into()))
        });
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn single_interface_skips_menu() {
        let ip = select_with(&[iface("eth0", [192, 168, 1, 10])], None, true, unused).unwrap();
        assert_eq!(ip, "192.168.1.10".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn non_interactive_takes_first() {
        let ip = select_primary(&two(), None, false).unwrap();
        assert_eq!(ip, "192.168.1.10".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn no_interfaces_falls_back_to_loopback() {
        let ip = select_with(&[], None, true, unused).unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test_case("10.0.0.5", Some("10.0.0.5") ; "discovered address")]
    #[test_case("127.0.0.1", Some("127.0.0.1") ; "loopback")]
    #[test_case("::ffff:192.168.1.10", Some("192.168.1.10") ; "mapped ipv6 form")]
    #[test_case("::ffff:127.0.0.1", Some("127.0.0.1") ; "mapped loopback")]
    #[test_case("172.16.0.1", None ; "foreign address")]
    fn explicit_address(ip: &str, expected: Option<&str>) {
        let result = select_with(&two(), Some(ip.parse().unwrap()), true, unused);
        assert_eq!(
            result.ok(),
            expected.map(|e| e.parse::<IpAddr>().unwrap())
        );
    }
}
