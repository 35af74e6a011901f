//! Local interface enumeration.
//!
//! Used twice: to derive the /24 the subnet prober sweeps, and to pick the
//! host name written into the script URL when the operator did not supply
//! `--advertise-host`.

use std::net::{IpAddr, Ipv4Addr};

use devportal_core::network::subnet::is_scannable_local;
use tracing::{debug, warn};

/// Non-loopback IPv4 addresses of every interface, in OS order.
///
/// An enumeration failure is logged and yields an empty list; the callers
/// already have a fallback for "no interface".
pub fn local_ipv4_addrs() -> Vec<Ipv4Addr> {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            warn!("failed to enumerate network interfaces: {e}");
            return Vec::new();
        }
    };

    let addrs: Vec<Ipv4Addr> = interfaces
        .iter()
        .filter(|iface| !iface.is_loopback())
        .filter_map(|iface| match iface.ip() {
            IpAddr::V4(ip) if is_scannable_local(ip) => Some(ip),
            _ => None,
        })
        .collect();
    debug!(?addrs, "local IPv4 addresses");
    addrs
}

/// Host name the device should use to reach this machine.
///
/// An explicit override wins, then the first local IPv4 address, then
/// `localhost` (which only works when the device runs on this machine).
pub fn advertise_host(explicit: Option<&str>, local: &[Ipv4Addr]) -> String {
    if let Some(host) = explicit.map(str::trim).filter(|h| !h.is_empty()) {
        return host.to_string();
    }
    local
        .first()
        .map(Ipv4Addr::to_string)
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_advertise_host_wins() {
        let local = [Ipv4Addr::new(192, 168, 1, 10)];
        assert_eq!(advertise_host(Some("laptop.lan"), &local), "laptop.lan");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let local = [Ipv4Addr::new(192, 168, 1, 10)];
        assert_eq!(advertise_host(Some("  "), &local), "192.168.1.10");
    }

    #[test]
    fn test_first_local_address_is_used() {
        let local = [Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(192, 168, 1, 10)];
        assert_eq!(advertise_host(None, &local), "10.0.0.2");
    }

    #[test]
    fn test_falls_back_to_localhost() {
        assert_eq!(advertise_host(None, &[]), "localhost");
    }

    #[test]
    fn test_enumeration_never_returns_loopback() {
        assert!(local_ipv4_addrs().iter().all(|ip| !ip.is_loopback()));
    }
}
