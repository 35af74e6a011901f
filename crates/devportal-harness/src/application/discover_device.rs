//! Discovery orchestrator: resolves the one device a session will target.
//!
//! Resolution order:
//!
//! 1. A manual address short-circuits everything and is trusted as-is.
//! 2. Multicast discovery (unless skipped).  The first advertiser wins and is
//!    treated as available without a probe, unless `verify_multicast` is on.
//! 3. The subnet scan against the control port.
//!
//! If all of that yields nothing the session cannot continue and
//! [`HarnessError::NoDeviceFound`] is returned.
//!
//! The two discovery paths are injected as traits so this module has no
//! socket code of its own.

use async_trait::async_trait;
use devportal_core::{DiscoveredDevice, DiscoveryConfig, HarnessError, ProbeResult};
use tracing::{debug, info, warn};

/// Collects multicast service advertisements for one discovery window.
///
/// Implementations never fail: an unavailable multicast facility yields an
/// empty list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MulticastBrowser: Send + Sync {
    async fn browse(&self) -> Vec<DiscoveredDevice>;
}

/// Actively probes hosts for the control-plane marker endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostScanner: Send + Sync {
    /// Priority hosts first, then the whole local /24.  Returns every
    /// available host.
    ///
    /// # Errors
    ///
    /// [`HarnessError::NoNetworkInterface`] when no subnet can be derived.
    async fn scan(&self, port: u16) -> Result<Vec<ProbeResult>, HarnessError>;

    /// Probes a single host with the short priority timeout.
    async fn probe(&self, host: &str, port: u16) -> ProbeResult;
}

/// Anything that can hand the session driver a device.
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn locate(&self) -> Result<DiscoveredDevice, HarnessError>;
}

/// Composes manual override, multicast discovery, and the subnet scan.
pub struct DiscoveryOrchestrator<M, S> {
    config: DiscoveryConfig,
    multicast: M,
    scanner: S,
}

impl<M: MulticastBrowser, S: HostScanner> DiscoveryOrchestrator<M, S> {
    pub fn new(config: DiscoveryConfig, multicast: M, scanner: S) -> Self {
        Self {
            config,
            multicast,
            scanner,
        }
    }

    /// Every reachable device, ranked in discovery order.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidAddress`] for a blank manual address,
    /// [`HarnessError::NoDeviceFound`] when every path comes up empty.
    pub async fn discover_all(&self) -> Result<Vec<DiscoveredDevice>, HarnessError> {
        let port = self.config.control_port;

        if let Some(host) = &self.config.manual_host {
            info!("using manually specified device {host}:{port}");
            return Ok(vec![DiscoveredDevice::manual(host, port)?]);
        }

        if self.config.skip_multicast {
            info!("multicast discovery skipped; scanning the network");
        } else {
            let advertised = self.multicast.browse().await;
            if !advertised.is_empty() {
                let devices = self.accept_advertised(advertised).await;
                if !devices.is_empty() {
                    return Ok(devices);
                }
                info!("no advertised device answered on port {port}; scanning the network");
            } else {
                info!("no multicast advertisements; scanning the network");
            }
        }

        let results = match self.scanner.scan(port).await {
            Ok(results) => results,
            Err(HarnessError::NoNetworkInterface) => {
                warn!("no network interface to derive a subnet from");
                Vec::new()
            }
            Err(e) => {
                warn!("subnet scan failed: {e}");
                Vec::new()
            }
        };

        let devices: Vec<DiscoveredDevice> =
            results.iter().filter_map(DiscoveredDevice::probed).collect();
        if devices.is_empty() {
            return Err(HarnessError::NoDeviceFound);
        }
        for (rank, device) in devices.iter().enumerate() {
            debug!(rank, host = device.host(), "scan candidate");
        }
        Ok(devices)
    }

    /// Multicast hits, either trusted outright or filtered by a probe of the
    /// control port.
    async fn accept_advertised(&self, advertised: Vec<DiscoveredDevice>) -> Vec<DiscoveredDevice> {
        if !self.config.verify_multicast {
            return advertised
                .into_iter()
                .map(DiscoveredDevice::into_available)
                .collect();
        }

        let mut verified = Vec::new();
        for device in advertised {
            let probe = self
                .scanner
                .probe(device.host(), device.control_port())
                .await;
            if probe.is_available() {
                verified.push(device.into_available());
            } else {
                warn!(
                    "advertised device {} does not answer on port {}",
                    device.host(),
                    device.control_port()
                );
            }
        }
        verified
    }
}

#[async_trait]
impl<M: MulticastBrowser, S: HostScanner> DeviceLocator for DiscoveryOrchestrator<M, S> {
    async fn locate(&self) -> Result<DiscoveredDevice, HarnessError> {
        let devices = self.discover_all().await?;
        if devices.len() > 1 {
            info!(
                "{} devices found; using the first ({})",
                devices.len(),
                devices[0].host()
            );
        }
        devices
            .into_iter()
            .next()
            .ok_or(HarnessError::NoDeviceFound)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> DiscoveryConfig {
        DiscoveryConfig::default()
    }

    fn advertised(host: &str) -> DiscoveredDevice {
        DiscoveredDevice::advertised(Some(format!("dev-{host}")), host, 11337, 12315).unwrap()
    }

    fn hit(host: &str) -> ProbeResult {
        ProbeResult::available(host, 11337, Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_manual_host_bypasses_both_discovery_paths() {
        // Arrange: neither mock may be called
        let mut multicast = MockMulticastBrowser::new();
        multicast.expect_browse().never();
        let mut scanner = MockHostScanner::new();
        scanner.expect_scan().never();
        scanner.expect_probe().never();

        let mut cfg = config();
        cfg.manual_host = Some("10.0.0.5".to_string());
        let orchestrator = DiscoveryOrchestrator::new(cfg, multicast, scanner);

        // Act: twice, to show the override is idempotent
        let first = orchestrator.locate().await.expect("manual device");
        let second = orchestrator.locate().await.expect("manual device");

        // Assert
        assert_eq!(first, second);
        assert_eq!(first.host(), "10.0.0.5");
        assert_eq!(first.control_port(), 11337);
        assert!(first.is_available());
    }

    #[tokio::test]
    async fn test_blank_manual_host_is_rejected() {
        let mut cfg = config();
        cfg.manual_host = Some(" ".to_string());
        let orchestrator =
            DiscoveryOrchestrator::new(cfg, MockMulticastBrowser::new(), MockHostScanner::new());

        let result = orchestrator.locate().await;

        assert!(matches!(result, Err(HarnessError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_multicast_hit_is_used_without_probing() {
        // Arrange
        let mut multicast = MockMulticastBrowser::new();
        multicast
            .expect_browse()
            .times(1)
            .returning(|| vec![advertised("192.168.1.20"), advertised("192.168.1.21")]);
        let mut scanner = MockHostScanner::new();
        scanner.expect_scan().never();
        scanner.expect_probe().never();

        let orchestrator = DiscoveryOrchestrator::new(config(), multicast, scanner);

        // Act
        let all = orchestrator.discover_all().await.unwrap();

        // Assert: discovery order kept, all optimistically available
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].host(), "192.168.1.20");
        assert!(all.iter().all(DiscoveredDevice::is_available));
        assert_eq!(all[0].service_advertised_port(), Some(12315));
    }

    #[tokio::test]
    async fn test_locate_returns_first_multicast_device() {
        let mut multicast = MockMulticastBrowser::new();
        multicast
            .expect_browse()
            .returning(|| vec![advertised("192.168.1.30"), advertised("192.168.1.31")]);
        let orchestrator =
            DiscoveryOrchestrator::new(config(), multicast, MockHostScanner::new());

        let device = orchestrator.locate().await.unwrap();

        assert_eq!(device.host(), "192.168.1.30");
    }

    #[tokio::test]
    async fn test_empty_multicast_falls_back_to_scan() {
        // Arrange
        let mut multicast = MockMulticastBrowser::new();
        multicast.expect_browse().times(1).returning(Vec::new);
        let mut scanner = MockHostScanner::new();
        scanner
            .expect_scan()
            .withf(|port| *port == 11337)
            .times(1)
            .returning(|_| Ok(vec![hit("192.168.1.40")]));

        let orchestrator = DiscoveryOrchestrator::new(config(), multicast, scanner);

        // Act
        let device = orchestrator.locate().await.unwrap();

        // Assert
        assert_eq!(device.host(), "192.168.1.40");
        assert!(device.is_available());
    }

    #[tokio::test]
    async fn test_skip_multicast_goes_straight_to_scan() {
        let mut multicast = MockMulticastBrowser::new();
        multicast.expect_browse().never();
        let mut scanner = MockHostScanner::new();
        scanner
            .expect_scan()
            .times(1)
            .returning(|_| Ok(vec![hit("127.0.0.1")]));

        let mut cfg = config();
        cfg.skip_multicast = true;
        let orchestrator = DiscoveryOrchestrator::new(cfg, multicast, scanner);

        assert_eq!(orchestrator.locate().await.unwrap().host(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_nothing_found_is_no_device_found() {
        let mut multicast = MockMulticastBrowser::new();
        multicast.expect_browse().returning(Vec::new);
        let mut scanner = MockHostScanner::new();
        scanner.expect_scan().returning(|_| Ok(Vec::new()));

        let orchestrator = DiscoveryOrchestrator::new(config(), multicast, scanner);

        assert!(matches!(
            orchestrator.locate().await,
            Err(HarnessError::NoDeviceFound)
        ));
    }

    #[tokio::test]
    async fn test_no_network_interface_is_treated_as_empty_scan() {
        let mut multicast = MockMulticastBrowser::new();
        multicast.expect_browse().returning(Vec::new);
        let mut scanner = MockHostScanner::new();
        scanner
            .expect_scan()
            .returning(|_| Err(HarnessError::NoNetworkInterface));

        let orchestrator = DiscoveryOrchestrator::new(config(), multicast, scanner);

        assert!(matches!(
            orchestrator.locate().await,
            Err(HarnessError::NoDeviceFound)
        ));
    }

    #[tokio::test]
    async fn test_unavailable_scan_results_are_ignored() {
        let mut scanner = MockHostScanner::new();
        scanner.expect_scan().returning(|_| {
            Ok(vec![
                ProbeResult::unavailable("192.168.1.2", 11337),
                hit("192.168.1.3"),
            ])
        });
        let mut cfg = config();
        cfg.skip_multicast = true;
        let orchestrator = DiscoveryOrchestrator::new(cfg, MockMulticastBrowser::new(), scanner);

        let all = orchestrator.discover_all().await.unwrap();

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].host(), "192.168.1.3");
    }

    #[tokio::test]
    async fn test_verify_multicast_filters_silent_devices() {
        // Arrange
        let mut multicast = MockMulticastBrowser::new();
        multicast
            .expect_browse()
            .returning(|| vec![advertised("192.168.1.50"), advertised("192.168.1.51")]);
        let mut scanner = MockHostScanner::new();
        scanner.expect_probe().times(2).returning(|host, port| {
            if host == "192.168.1.51" {
                ProbeResult::available(host, port, Duration::from_millis(3))
            } else {
                ProbeResult::unavailable(host, port)
            }
        });
        scanner.expect_scan().never();

        let mut cfg = config();
        cfg.verify_multicast = true;
        let orchestrator = DiscoveryOrchestrator::new(cfg, multicast, scanner);

        // Act
        let device = orchestrator.locate().await.unwrap();

        // Assert: name from the advertisement survives verification
        assert_eq!(device.host(), "192.168.1.51");
        assert_eq!(device.name(), Some("dev-192.168.1.51"));
    }

    #[tokio::test]
    async fn test_verify_multicast_falls_back_to_scan_when_none_answer() {
        let mut multicast = MockMulticastBrowser::new();
        multicast
            .expect_browse()
            .returning(|| vec![advertised("192.168.1.60")]);
        let mut scanner = MockHostScanner::new();
        scanner
            .expect_probe()
            .returning(|host, port| ProbeResult::unavailable(host, port));
        scanner
            .expect_scan()
            .times(1)
            .returning(|_| Ok(vec![hit("192.168.1.61")]));

        let mut cfg = config();
        cfg.verify_multicast = true;
        let orchestrator = DiscoveryOrchestrator::new(cfg, multicast, scanner);

        assert_eq!(orchestrator.locate().await.unwrap().host(), "192.168.1.61");
    }
}
