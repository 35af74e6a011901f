//! Pure network helpers for discovery.
//!
//! - **`subnet`** – /24 host generation, priority host list, batch arithmetic.

pub mod subnet;

pub use subnet::{batch_count, priority_hosts, Subnet24};
