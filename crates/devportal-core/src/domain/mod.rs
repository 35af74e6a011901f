//! Domain entities for the dev-portal harness.
//!
//! Plain data with no I/O. Infrastructure adapters produce these values and
//! the application layer consumes them.

/// Discovered devices and individual probe outcomes.
pub mod device;

/// The injection payload and the manifest summary read from the build output.
pub mod payload;

/// Remote method invocation results and home-listing normalisation.
pub mod remote_call;

/// Test-session states, step reports, and the final session report.
pub mod session;
