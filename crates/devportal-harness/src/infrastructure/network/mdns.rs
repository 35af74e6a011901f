//! Multicast DNS discovery of plugin hosts.
//!
//! Plugin hosts advertise a sync service (`_gsync._tcp.local.` by default)
//! on the multicast group.  The developer control plane is not advertised,
//! but it runs on the same machine, so the advertiser's address paired with
//! the configured control port is a strong hint.
//!
//! The browse window is fixed: every advertisement resolved before the
//! deadline is collected, in arrival order, then the daemon is stopped.
//! Anything that goes wrong with the multicast facility (no daemon, browse
//! refused) is logged and yields an empty list so the caller falls back to
//! the subnet scan.

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use devportal_core::{DiscoveredDevice, DiscoveryConfig};
use mdns_sd::{ServiceDaemon, ServiceEvent};
use tracing::{debug, info, warn};

use crate::application::discover_device::MulticastBrowser;

/// How long one blocking receive waits before the deadline is re-checked.
const RECV_POLL: Duration = Duration::from_millis(200);

/// Browses for the configured service type with `mdns-sd`.
pub struct MdnsBrowser {
    service_type: String,
    window: Duration,
    control_port: u16,
}

impl MdnsBrowser {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            service_type: config.service_type.clone(),
            window: config.multicast_window,
            control_port: config.control_port,
        }
    }
}

#[async_trait]
impl MulticastBrowser for MdnsBrowser {
    async fn browse(&self) -> Vec<DiscoveredDevice> {
        match ServiceDaemon::new() {
            Ok(daemon) => self.browse_with(daemon).await,
            Err(e) => {
                warn!("multicast discovery unavailable: {e}");
                Vec::new()
            }
        }
    }
}

impl MdnsBrowser {
    /// Browses on `daemon` for one window.  The daemon is stopped on every
    /// exit, including when this future is dropped before the window closes.
    pub async fn browse_with(&self, daemon: ServiceDaemon) -> Vec<DiscoveredDevice> {
        info!(
            "browsing for {} advertisements ({:?} window)",
            self.service_type, self.window
        );

        let guard = DaemonGuard {
            daemon,
            service_type: self.service_type.clone(),
        };
        let receiver = match guard.daemon.browse(&self.service_type) {
            Ok(receiver) => receiver,
            Err(e) => {
                warn!("multicast browse failed: {e}");
                return Vec::new();
            }
        };

        let mut devices: Vec<DiscoveredDevice> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let deadline = tokio::time::sleep(self.window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = tokio::task::spawn_blocking({
                    let receiver = receiver.clone();
                    move || receiver.recv_timeout(RECV_POLL)
                }) => {
                    match event {
                        Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                            let addresses: Vec<IpAddr> =
                                info.get_addresses().iter().copied().collect();
                            let device = device_from_advertisement(
                                info.get_fullname(),
                                info.get_hostname(),
                                &addresses,
                                info.get_port(),
                                self.control_port,
                            );
                            match device {
                                Some(device) if seen.insert(device.host().to_string()) => {
                                    info!(
                                        "found {} at {}:{}",
                                        device.name().unwrap_or("plugin host"),
                                        device.host(),
                                        info.get_port()
                                    );
                                    devices.push(device);
                                }
                                Some(device) => debug!(host = device.host(), "duplicate advertisement"),
                                None => debug!(name = info.get_fullname(), "advertisement without address"),
                            }
                        }
                        Ok(Ok(ServiceEvent::SearchStopped(_))) => break,
                        Ok(Ok(_)) => {}
                        Ok(Err(_)) if receiver.is_disconnected() => break,
                        Ok(Err(_)) | Err(_) => {}
                    }
                }
            }
        }

        drop(guard);

        if devices.is_empty() {
            info!("no device is advertising {}", self.service_type);
        } else {
            info!("found {} device(s) via multicast", devices.len());
        }
        devices
    }
}

/// Owns the daemon for the length of one browse.
struct DaemonGuard {
    daemon: ServiceDaemon,
    service_type: String,
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            debug!("stop_browse: {e}");
        }
        if let Err(e) = self.daemon.shutdown() {
            debug!("daemon shutdown: {e}");
        }
    }
}

/// Builds a device from one resolved advertisement.
///
/// The host is the first advertised address, IPv4 preferred.  Advertisements
/// that carry no address fall back to the host name (without its trailing
/// dot); `None` only when neither is present.
pub fn device_from_advertisement(
    fullname: &str,
    hostname: &str,
    addresses: &[IpAddr],
    advertised_port: u16,
    control_port: u16,
) -> Option<DiscoveredDevice> {
    let mut sorted = addresses.to_vec();
    sorted.sort_by_key(|ip| (ip.is_ipv6(), *ip));

    let host = match sorted.first() {
        Some(ip) => ip.to_string(),
        None => hostname.trim_end_matches('.').to_string(),
    };
    let name = instance_name(fullname);
    DiscoveredDevice::advertised(name, &host, control_port, advertised_port)
}

/// The instance label of a full service name
/// (`"Pixel 7._gsync._tcp.local."` → `"Pixel 7"`).
fn instance_name(fullname: &str) -> Option<String> {
    let label = match fullname.find("._") {
        Some(end) => &fullname[..end],
        None => fullname.trim_end_matches('.'),
    };
    Some(label.to_string()).filter(|l| !l.is_empty())
}
