//! Runtime configuration.
//!
//! [`HarnessConfig`] is the single source of truth for every port, timeout,
//! and path the harness uses.  It is built once in `main` (defaults, then the
//! optional TOML file, then CLI flags) and handed to each component's
//! constructor.  Nothing reads configuration from globals or the
//! environment after startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Control port of the host app's developer server.
pub const DEFAULT_CONTROL_PORT: u16 = 11337;

/// mDNS service type advertised by the host app's sync service.
pub const DEFAULT_SERVICE_TYPE: &str = "_gsync._tcp.local.";

/// Port the local asset server listens on.
pub const DEFAULT_ASSET_PORT: u16 = 3000;

/// All runtime settings, grouped by component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarnessConfig {
    pub discovery: DiscoveryConfig,
    pub assets: AssetConfig,
    pub session: SessionConfig,
}

/// Settings for the discovery orchestrator, multicast browser, and subnet
/// prober.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    /// Operator-supplied device address; bypasses discovery when set.
    pub manual_host: Option<String>,
    /// Control-plane port on the device.
    pub control_port: u16,
    /// Skip multicast discovery and go straight to the subnet scan.
    pub skip_multicast: bool,
    /// Probe a multicast-discovered device before trusting it.  Off by
    /// default: an advertisement is taken as proof of availability.
    pub verify_multicast: bool,
    /// mDNS service type to browse.
    pub service_type: String,
    /// How long to collect multicast advertisements.
    pub multicast_window: Duration,
    /// HTTP path whose response marks a device as present.
    pub marker_path: String,
    /// Per-probe timeout for the priority host set.
    pub priority_probe_timeout: Duration,
    /// Per-probe timeout during the full subnet scan.
    pub scan_probe_timeout: Duration,
    /// Hosts probed concurrently per batch during the subnet scan.
    pub scan_batch_size: usize,
    /// Extra addresses added to the priority set (known default device IPs).
    pub well_known_hosts: Vec<String>,
}

impl Default for DiscoveryConfig {
    /// | Field                  | Default               |
    /// |------------------------|-----------------------|
    /// | control_port           | `11337`               |
    /// | service_type           | `_gsync._tcp.local.`  |
    /// | multicast_window       | 3 s                   |
    /// | marker_path            | `/dev`                |
    /// | priority_probe_timeout | 1000 ms               |
    /// | scan_probe_timeout     | 500 ms                |
    /// | scan_batch_size        | 25                    |
    /// | well_known_hosts       | `100.100.1.57`        |
    fn default() -> Self {
        Self {
            manual_host: None,
            control_port: DEFAULT_CONTROL_PORT,
            skip_multicast: false,
            verify_multicast: false,
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            multicast_window: Duration::from_millis(3000),
            marker_path: "/dev".to_string(),
            priority_probe_timeout: Duration::from_millis(1000),
            scan_probe_timeout: Duration::from_millis(500),
            scan_batch_size: 25,
            well_known_hosts: vec!["100.100.1.57".to_string()],
        }
    }
}

/// Settings for the local asset server.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    /// Build output directory (`dist/`).
    pub artifact_dir: PathBuf,
    /// Listening address; port 0 picks a free port.
    pub bind_addr: SocketAddr,
    /// Host name or IP the device should use to reach this machine.  When
    /// unset, the first local IPv4 address is used.
    pub advertise_host: Option<String>,
    /// File served for `GET /` and sent as the injection manifest.
    pub manifest_file: String,
    /// Plugin script referenced by the injection payload.
    pub script_file: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("dist"),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_ASSET_PORT)),
            advertise_host: None,
            manifest_file: "config.json".to_string(),
            script_file: "script.js".to_string(),
        }
    }
}

/// Settings for the test session driver and control-plane client.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Timeout for the one-shot `GET /dev` portal fetch.
    pub portal_timeout: Duration,
    /// Pause after the portal answers, giving its client-side code time to
    /// initialise.  There is no readiness signal to wait on instead.
    pub portal_settle: Duration,
    /// Timeout for the injection request.
    pub inject_timeout: Duration,
    /// Timeout for each remote method call.
    pub call_timeout: Duration,
    /// Smoke-test methods invoked in order after injection.
    pub smoke_methods: Vec<String>,
    /// Method whose result is summarised as a home listing.
    pub home_method: String,
    /// Open the control portal in the default browser once injected.
    pub open_portal: bool,
    /// Keep serving assets after the smoke test until interrupted.
    pub keep_serving: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            portal_timeout: Duration::from_millis(10_000),
            portal_settle: Duration::from_millis(10_000),
            inject_timeout: Duration::from_millis(10_000),
            call_timeout: Duration::from_secs(30),
            smoke_methods: vec!["enable".to_string(), "getHome".to_string()],
            home_method: "getHome".to_string(),
            open_portal: true,
            keep_serving: true,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_control_port_is_11337() {
        assert_eq!(DiscoveryConfig::default().control_port, 11337);
    }

    #[test]
    fn test_default_discovery_timings() {
        // Arrange / Act
        let cfg = DiscoveryConfig::default();

        // Assert
        assert_eq!(cfg.multicast_window, Duration::from_millis(3000));
        assert_eq!(cfg.priority_probe_timeout, Duration::from_millis(1000));
        assert_eq!(cfg.scan_probe_timeout, Duration::from_millis(500));
        assert_eq!(cfg.scan_batch_size, 25);
    }

    #[test]
    fn test_default_discovery_is_automatic() {
        let cfg = DiscoveryConfig::default();
        assert!(cfg.manual_host.is_none());
        assert!(!cfg.skip_multicast);
        assert!(!cfg.verify_multicast);
        assert_eq!(cfg.service_type, "_gsync._tcp.local.");
        assert_eq!(cfg.marker_path, "/dev");
    }

    #[test]
    fn test_default_asset_server_listens_on_3000_all_interfaces() {
        let cfg = AssetConfig::default();
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert!(cfg.bind_addr.ip().is_unspecified());
        assert_eq!(cfg.artifact_dir, PathBuf::from("dist"));
        assert_eq!(cfg.manifest_file, "config.json");
        assert_eq!(cfg.script_file, "script.js");
    }

    #[test]
    fn test_default_session_runs_enable_then_get_home() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.smoke_methods, vec!["enable", "getHome"]);
        assert_eq!(cfg.portal_settle, Duration::from_secs(10));
        assert_eq!(cfg.inject_timeout, Duration::from_secs(10));
        assert!(cfg.keep_serving);
        assert!(cfg.open_portal);
    }

    #[test]
    fn test_config_can_be_cloned() {
        let cfg = HarnessConfig::default();
        assert_eq!(cfg.clone(), cfg);
    }
}
