//! Infrastructure layer for the harness.
//!
//! Contains the OS-facing adapters behind the application traits: sockets
//! (HTTP client, mDNS, asset server), the configuration file, and the
//! desktop browser launcher.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `devportal_core`, but MUST NOT be imported by the `application` layer.

pub mod asset_server;
pub mod browser;
pub mod network;
pub mod storage;
