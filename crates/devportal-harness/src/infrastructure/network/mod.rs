//! Network infrastructure for the harness.
//!
//! # Sub-modules
//!
//! - **`interfaces`** – Enumerates local IPv4 addresses for subnet derivation
//!   and the advertised script URL.
//!
//! - **`mdns`** – Browses for the plugin host's multicast service
//!   advertisement for a fixed window.
//!
//! - **`subnet_probe`** – Probes priority hosts and then the local /24 for
//!   the control-plane marker endpoint, in bounded concurrent batches.
//!
//! - **`control_plane`** – HTTP client for the device's developer control
//!   plane: portal fetch, plugin injection, remote method calls.

pub mod control_plane;
pub mod interfaces;
pub mod mdns;
pub mod subnet_probe;
