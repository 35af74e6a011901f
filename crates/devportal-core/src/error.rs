//! Failure taxonomy for the harness.
//!
//! Fatal conditions end the session and the process exits non-zero after
//! printing [`HarnessError::remediation`] hints.  Soft conditions are recorded
//! in a step report and never escape the step that produced them.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Every failure the harness distinguishes.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No non-loopback IPv4 address exists to derive a subnet from.
    /// Callers treat this exactly like an empty scan.
    #[error("no non-loopback IPv4 network interface found")]
    NoNetworkInterface,

    /// Neither the manual address, multicast discovery, nor the subnet scan
    /// produced a device.
    #[error("no plugin host with an open developer control plane was found")]
    NoDeviceFound,

    /// The build output directory or manifest is absent or unreadable.
    #[error("build output not usable at {path}: {reason}")]
    MissingArtifacts { path: PathBuf, reason: String },

    /// A manually supplied device address was blank.
    #[error("invalid device address: '{0}'")]
    InvalidAddress(String),

    /// The local asset server could not bind its listening socket.
    #[error("failed to bind asset server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A single request failed at the connection level (reset, refused,
    /// timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The control plane answered with a non-2xx status or an unusable body.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl HarnessError {
    /// Whether this condition must abort the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            HarnessError::Transport(_) | HarnessError::Protocol(_) | HarnessError::NoNetworkInterface
        )
    }

    /// Operator-facing hints printed before exiting on a fatal error.
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            HarnessError::NoDeviceFound | HarnessError::NoNetworkInterface => &[
                "Is the plugin host app running on the device?",
                "Is developer mode enabled in the app settings?",
                "Is this machine on the same network segment as the device?",
                "Pass --dev-ip <address> to skip discovery entirely.",
            ],
            HarnessError::MissingArtifacts { .. } => &[
                "Build the plugin first so the output directory contains config.json and script.js.",
                "Pass --dist <dir> if the build output lives elsewhere.",
            ],
            HarnessError::InvalidAddress(_) => &["Pass a reachable IP address or host name to --dev-ip."],
            HarnessError::Bind { .. } => &[
                "Another process may be using the port; pick a free one with --port <port>.",
            ],
            HarnessError::Transport(_) | HarnessError::Protocol(_) => &[],
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
