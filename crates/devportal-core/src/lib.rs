//! # devportal-core
//!
//! Shared foundation for the plugin dev-portal harness: the data model,
//! error taxonomy, runtime configuration, and the pure pieces of network and
//! file-serving logic that do not need a socket to be tested.
//!
//! The harness finds a running plugin host (for example the GrayJay app) on
//! the LAN, serves a freshly built plugin bundle to it, and drives the host's
//! developer control plane to load and exercise the plugin.
//!
//! # Modules
//!
//! - **`domain`** – Devices, probe results, the injection payload, remote call
//!   results, and the test-session state machine.
//! - **`network`** – /24 subnet arithmetic and probe batching for the subnet
//!   scanner.
//! - **`assets`** – Lexical path resolution (traversal rejection) and the
//!   extension → content-type table used by the local asset server.
//! - **`config`** – [`HarnessConfig`], built once at startup and threaded
//!   through every component.
//! - **`error`** – [`HarnessError`], the fatal/soft failure taxonomy.
//!
//! Nothing in this crate performs I/O.

pub mod assets;
pub mod config;
pub mod domain;
pub mod error;
pub mod network;

pub use config::{AssetConfig, DiscoveryConfig, HarnessConfig, SessionConfig};
pub use domain::device::{DiscoveredDevice, ProbeResult};
pub use domain::payload::{InjectionPayload, PluginManifest};
pub use domain::remote_call::{HomeListing, RemoteCallResult};
pub use domain::session::{
    MethodCall, SessionReport, SessionState, SessionTrail, StepOutcome, StepReport,
};
pub use error::HarnessError;
