//! Discovered plugin-host devices and subnet probe outcomes.
//!
//! A [`DiscoveredDevice`] is created by exactly one discovery path (manual
//! override, multicast advertisement, or subnet probe) and is never mutated
//! afterwards.  Changing a property such as availability produces a fresh
//! value.

use std::time::Duration;

use crate::error::HarnessError;

/// A plugin host that the harness may target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    name: Option<String>,
    host: String,
    control_port: u16,
    service_advertised_port: Option<u16>,
    available: bool,
}

impl DiscoveredDevice {
    /// A device supplied by the operator (`--dev-ip`).  Manual input is
    /// trusted, so the device is marked available without probing.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidAddress`] when `host` is blank.
    pub fn manual(host: &str, control_port: u16) -> Result<Self, HarnessError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(HarnessError::InvalidAddress(host.to_string()));
        }
        Ok(Self {
            name: None,
            host: host.to_string(),
            control_port,
            service_advertised_port: None,
            available: true,
        })
    }

    /// A device seen in a multicast advertisement.
    ///
    /// Presence on the multicast group says nothing about the control plane,
    /// so the device starts out unavailable.  Returns `None` for a blank host.
    pub fn advertised(
        name: Option<String>,
        host: &str,
        control_port: u16,
        advertised_port: u16,
    ) -> Option<Self> {
        let host = host.trim();
        if host.is_empty() {
            return None;
        }
        Some(Self {
            name: name.filter(|n| !n.is_empty()),
            host: host.to_string(),
            control_port,
            service_advertised_port: Some(advertised_port),
            available: false,
        })
    }

    /// A device that answered a subnet probe.  Returns `None` if the probe
    /// did not succeed.
    pub fn probed(result: &ProbeResult) -> Option<Self> {
        if !result.is_available() || result.host.is_empty() {
            return None;
        }
        Some(Self {
            name: None,
            host: result.host.clone(),
            control_port: result.port,
            service_advertised_port: None,
            available: true,
        })
    }

    /// Returns a copy of this device marked available.
    #[must_use]
    pub fn into_available(self) -> Self {
        Self {
            available: true,
            ..self
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// IP address or host name; never empty.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn control_port(&self) -> u16 {
        self.control_port
    }

    /// Port carried by the multicast advertisement (the host's sync service),
    /// if this device came from multicast discovery.
    pub fn service_advertised_port(&self) -> Option<u16> {
        self.service_advertised_port
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// `http://host:port` for the device's control plane.  IPv6 literals are
    /// bracketed.
    pub fn control_base_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.control_port)
        } else {
            format!("http://{}:{}", self.host, self.control_port)
        }
    }

    /// URL of the control portal page served by the device.
    pub fn portal_url(&self) -> String {
        format!("{}/dev", self.control_base_url())
    }
}

/// Outcome of a single marker-endpoint probe.
///
/// Constructed only through [`ProbeResult::available`] and
/// [`ProbeResult::unavailable`], so an available result always carries a
/// response time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub host: String,
    pub port: u16,
    response_time_ms: Option<u64>,
}

impl ProbeResult {
    /// The host answered after `elapsed`.
    pub fn available(host: impl Into<String>, port: u16, elapsed: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            response_time_ms: Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    /// Refused, timed out, or otherwise silent.  The causes are not
    /// distinguished.
    pub fn unavailable(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            response_time_ms: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.response_time_ms.is_some()
    }

    pub fn response_time_ms(&self) -> Option<u64> {
        self.response_time_ms
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
