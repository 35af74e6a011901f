//! Subnet prober and orchestrator wiring over loopback.

mod common;

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use common::{closed_port, MockControlPlane};
use devportal_core::{DiscoveredDevice, DiscoveryConfig, HarnessError, ProbeResult};
use devportal_harness::application::discover_device::{
    DeviceLocator, DiscoveryOrchestrator, HostScanner, MulticastBrowser,
};
use devportal_harness::infrastructure::network::mdns::MdnsBrowser;
use devportal_harness::infrastructure::network::subnet_probe::SubnetProber;

fn loopback_config(port: u16) -> DiscoveryConfig {
    DiscoveryConfig {
        control_port: port,
        priority_probe_timeout: Duration::from_millis(300),
        scan_probe_timeout: Duration::from_millis(100),
        well_known_hosts: Vec::new(),
        ..DiscoveryConfig::default()
    }
}

#[tokio::test]
async fn test_any_http_response_counts_as_available() {
    // Arrange: no route for this marker path, so the mock answers 404
    let mock = MockControlPlane::start().await;
    let config = DiscoveryConfig {
        marker_path: "/not-routed".to_string(),
        ..loopback_config(mock.port())
    };
    let prober = SubnetProber::new(config, Vec::new()).unwrap();

    // Act
    let result = prober.probe("127.0.0.1", mock.port()).await;

    // Assert
    assert!(result.is_available());
    assert!(result.response_time_ms().is_some());
}

#[tokio::test]
async fn test_refused_connection_is_unavailable() {
    let port = closed_port().port();
    let prober = SubnetProber::new(loopback_config(port), Vec::new()).unwrap();

    let result = prober.probe("127.0.0.1", port).await;

    assert!(!result.is_available());
    assert_eq!(result.response_time_ms(), None);
}

#[tokio::test]
async fn test_priority_hit_ends_scan() {
    // Arrange: a documentation-range local address so the /24 sweep would
    // find nothing; the loopback priority hosts answer first
    let mock = MockControlPlane::start().await;
    let local = vec![Ipv4Addr::new(192, 0, 2, 10)];
    let prober = SubnetProber::new(loopback_config(mock.port()), local).unwrap();

    // Act
    let found = prober.scan(mock.port()).await.unwrap();

    // Assert
    assert!(found.iter().any(|r| r.host == "127.0.0.1"));
    assert!(found.iter().all(ProbeResult::is_available));
    assert!(found.iter().all(|r| !r.host.starts_with("192.0.2.")));
}

#[tokio::test]
async fn test_manual_host_bypasses_real_discovery() {
    // Arrange: real adapters; neither may be touched
    let config = DiscoveryConfig {
        manual_host: Some("10.0.0.5".to_string()),
        ..DiscoveryConfig::default()
    };
    let orchestrator = DiscoveryOrchestrator::new(
        config.clone(),
        MdnsBrowser::new(&config),
        SubnetProber::new(config.clone(), Vec::new()).unwrap(),
    );

    // Act
    let first = orchestrator.locate().await.unwrap();
    let second = orchestrator.locate().await.unwrap();

    // Assert
    assert_eq!(first, second);
    assert_eq!(first.host(), "10.0.0.5");
    assert_eq!(first.control_port(), 11337);
    assert!(first.is_available());
}

// ── Fallback with stand-in adapters ───────────────────────────────────────────

struct SilentMulticast;

#[async_trait]
impl MulticastBrowser for SilentMulticast {
    async fn browse(&self) -> Vec<DiscoveredDevice> {
        Vec::new()
    }
}

#[tokio::test]
async fn test_empty_multicast_falls_back_to_real_prober() {
    // Arrange
    let mock = MockControlPlane::start().await;
    let config = loopback_config(mock.port());
    let local = vec![Ipv4Addr::new(192, 0, 2, 10)];
    let orchestrator = DiscoveryOrchestrator::new(
        config.clone(),
        SilentMulticast,
        SubnetProber::new(config, local).unwrap(),
    );

    // Act
    let devices = orchestrator.discover_all().await.unwrap();

    // Assert
    assert!(devices.iter().any(|d| d.host() == "127.0.0.1"));
    assert!(devices.iter().all(|d| d.control_port() == mock.port()));
}

#[tokio::test]
async fn test_no_interface_and_no_multicast_is_no_device_found() {
    let config = DiscoveryConfig {
        skip_multicast: true,
        ..loopback_config(closed_port().port())
    };
    let orchestrator = DiscoveryOrchestrator::new(
        config.clone(),
        SilentMulticast,
        SubnetProber::new(config, Vec::new()).unwrap(),
    );

    let result = orchestrator.locate().await;

    assert!(matches!(result, Err(HarnessError::NoDeviceFound)));
}
