//! Optional TOML configuration file (`devportal.toml` by default).
//!
//! Every key is optional.  A missing file, a missing section, or a missing
//! key all fall back to the built-in defaults, so the file only needs the
//! settings a project actually changes:
//!
//! ```toml
//! [discovery]
//! control_port = 11337
//! well_known_hosts = ["100.100.1.57", "192.168.1.50"]
//!
//! [assets]
//! artifact_dir = "build"
//! port = 3100
//!
//! [session]
//! portal_settle_ms = 5000
//! smoke_methods = ["enable", "getHome", "getChannel"]
//! ```
//!
//! Durations are whole milliseconds (`*_ms` keys).  Command-line flags are
//! applied on top of the loaded values in `main`.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use devportal_core::config::{DEFAULT_ASSET_PORT, DEFAULT_CONTROL_PORT, DEFAULT_SERVICE_TYPE};
use devportal_core::{AssetConfig, DiscoveryConfig, HarnessConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error other than "not found".
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub assets: AssetSection,
    #[serde(default)]
    pub session: SessionSection,
}

/// `[discovery]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySection {
    /// Fixed device address; skips discovery entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_host: Option<String>,
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    #[serde(default)]
    pub skip_multicast: bool,
    /// Probe multicast hits before trusting them.
    #[serde(default)]
    pub verify_multicast: bool,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default = "default_multicast_window_ms")]
    pub multicast_window_ms: u64,
    #[serde(default = "default_marker_path")]
    pub marker_path: String,
    #[serde(default = "default_priority_probe_timeout_ms")]
    pub priority_probe_timeout_ms: u64,
    #[serde(default = "default_scan_probe_timeout_ms")]
    pub scan_probe_timeout_ms: u64,
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
    #[serde(default = "default_well_known_hosts")]
    pub well_known_hosts: Vec<String>,
}

/// `[assets]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetSection {
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_asset_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise_host: Option<String>,
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,
    #[serde(default = "default_script_file")]
    pub script_file: String,
}

/// `[session]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSection {
    #[serde(default = "default_request_timeout_ms")]
    pub portal_timeout_ms: u64,
    #[serde(default = "default_portal_settle_ms")]
    pub portal_settle_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub inject_timeout_ms: u64,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_smoke_methods")]
    pub smoke_methods: Vec<String>,
    #[serde(default = "default_home_method")]
    pub home_method: String,
    #[serde(default = "default_true")]
    pub open_portal: bool,
    #[serde(default = "default_true")]
    pub keep_serving: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_control_port() -> u16 {
    DEFAULT_CONTROL_PORT
}
fn default_service_type() -> String {
    DEFAULT_SERVICE_TYPE.to_string()
}
fn default_multicast_window_ms() -> u64 {
    3000
}
fn default_marker_path() -> String {
    "/dev".to_string()
}
fn default_priority_probe_timeout_ms() -> u64 {
    1000
}
fn default_scan_probe_timeout_ms() -> u64 {
    500
}
fn default_scan_batch_size() -> usize {
    25
}
fn default_well_known_hosts() -> Vec<String> {
    vec!["100.100.1.57".to_string()]
}
fn default_artifact_dir() -> PathBuf {
    PathBuf::from("dist")
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_asset_port() -> u16 {
    DEFAULT_ASSET_PORT
}
fn default_manifest_file() -> String {
    "config.json".to_string()
}
fn default_script_file() -> String {
    "script.js".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_portal_settle_ms() -> u64 {
    10_000
}
fn default_call_timeout_ms() -> u64 {
    30_000
}
fn default_smoke_methods() -> Vec<String> {
    vec!["enable".to_string(), "getHome".to_string()]
}
fn default_home_method() -> String {
    "getHome".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            manual_host: None,
            control_port: default_control_port(),
            skip_multicast: false,
            verify_multicast: false,
            service_type: default_service_type(),
            multicast_window_ms: default_multicast_window_ms(),
            marker_path: default_marker_path(),
            priority_probe_timeout_ms: default_priority_probe_timeout_ms(),
            scan_probe_timeout_ms: default_scan_probe_timeout_ms(),
            scan_batch_size: default_scan_batch_size(),
            well_known_hosts: default_well_known_hosts(),
        }
    }
}

impl Default for AssetSection {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            bind_address: default_bind_address(),
            port: default_asset_port(),
            advertise_host: None,
            manifest_file: default_manifest_file(),
            script_file: default_script_file(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            portal_timeout_ms: default_request_timeout_ms(),
            portal_settle_ms: default_portal_settle_ms(),
            inject_timeout_ms: default_request_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            smoke_methods: default_smoke_methods(),
            home_method: default_home_method(),
            open_portal: default_true(),
            keep_serving: default_true(),
        }
    }
}

// ── Conversion ────────────────────────────────────────────────────────────────

impl FileConfig {
    /// Converts the file representation into the runtime configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for an unparsable bind address, a zero batch
    /// size, or an empty smoke-method list.
    pub fn into_harness_config(self) -> Result<HarnessConfig, ConfigError> {
        let FileConfig {
            discovery,
            assets,
            session,
        } = self;

        if discovery.scan_batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "discovery.scan_batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !discovery.marker_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "discovery.marker_path",
                reason: format!("'{}' must start with '/'", discovery.marker_path),
            });
        }
        let bind_ip: IpAddr = assets.bind_address.parse().map_err(|e| ConfigError::Invalid {
            key: "assets.bind_address",
            reason: format!("'{}': {e}", assets.bind_address),
        })?;

        Ok(HarnessConfig {
            discovery: DiscoveryConfig {
                manual_host: discovery.manual_host,
                control_port: discovery.control_port,
                skip_multicast: discovery.skip_multicast,
                verify_multicast: discovery.verify_multicast,
                service_type: discovery.service_type,
                multicast_window: Duration::from_millis(discovery.multicast_window_ms),
                marker_path: discovery.marker_path,
                priority_probe_timeout: Duration::from_millis(discovery.priority_probe_timeout_ms),
                scan_probe_timeout: Duration::from_millis(discovery.scan_probe_timeout_ms),
                scan_batch_size: discovery.scan_batch_size,
                well_known_hosts: discovery.well_known_hosts,
            },
            assets: AssetConfig {
                artifact_dir: assets.artifact_dir,
                bind_addr: SocketAddr::new(bind_ip, assets.port),
                advertise_host: assets.advertise_host,
                manifest_file: assets.manifest_file,
                script_file: assets.script_file,
            },
            session: SessionConfig {
                portal_timeout: Duration::from_millis(session.portal_timeout_ms),
                portal_settle: Duration::from_millis(session.portal_settle_ms),
                inject_timeout: Duration::from_millis(session.inject_timeout_ms),
                call_timeout: Duration::from_millis(session.call_timeout_ms),
                smoke_methods: session.smoke_methods,
                home_method: session.home_method,
                open_portal: session.open_portal,
                keep_serving: session.keep_serving,
            },
        })
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads `path`, returning `FileConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
