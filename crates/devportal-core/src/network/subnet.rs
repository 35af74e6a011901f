//! /24 subnet arithmetic for the fallback scanner.
//!
//! The scanner never touches the network address (`.0`) or the broadcast
//! address (`.255`); every other host of the /24 is probed exactly once.

use std::fmt;
use std::net::Ipv4Addr;

/// The /24 network that contains a local IPv4 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet24 {
    prefix: [u8; 3],
}

impl Subnet24 {
    /// The /24 formed by the first three octets of `addr`.
    pub fn containing(addr: Ipv4Addr) -> Self {
        let [a, b, c, _] = addr.octets();
        Self { prefix: [a, b, c] }
    }

    /// Derives the subnet from the first non-loopback address in `local`.
    /// Returns `None` when every address is loopback or unspecified.
    pub fn from_local_addrs(local: &[Ipv4Addr]) -> Option<Self> {
        local
            .iter()
            .copied()
            .find(|ip| is_scannable_local(*ip))
            .map(Self::containing)
    }

    /// Every host address `.1 ..= .254`, in ascending order.
    pub fn hosts(&self) -> Vec<Ipv4Addr> {
        let [a, b, c] = self.prefix;
        (1..=254u8).map(|d| Ipv4Addr::new(a, b, c, d)).collect()
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let [a, b, c, _] = addr.octets();
        self.prefix == [a, b, c]
    }
}

impl fmt::Display for Subnet24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.prefix;
        write!(f, "{a}.{b}.{c}.0/24")
    }
}

/// Whether `ip` is a usable local address for deriving a subnet.
pub fn is_scannable_local(ip: Ipv4Addr) -> bool {
    !ip.is_loopback() && !ip.is_unspecified()
}

/// Hosts probed before the full scan: loopback names, well-known default
/// device addresses, then this machine's own addresses.  Duplicates are
/// removed, first occurrence wins.
pub fn priority_hosts(local: &[Ipv4Addr], well_known: &[String]) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::new();
    let candidates = ["localhost".to_string(), "127.0.0.1".to_string()]
        .into_iter()
        .chain(well_known.iter().cloned())
        .chain(local.iter().map(ToString::to_string));

    for host in candidates {
        if !host.is_empty() && !hosts.contains(&host) {
            hosts.push(host);
        }
    }
    hosts
}

/// Number of sequential batches needed to probe `hosts` addresses in groups
/// of `batch_size`.  A zero batch size is treated as one.
pub fn batch_count(hosts: usize, batch_size: usize) -> usize {
    hosts.div_ceil(batch_size.max(1))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
