//! Storage infrastructure: the optional TOML configuration file.
//!
//! The harness never writes configuration; it only reads `devportal.toml`
//! when present and falls back to defaults otherwise.

pub mod config;
