//! Application layer use cases for the harness.
//!
//! Use cases orchestrate `devportal_core` types through traits and contain no
//! socket, file-system or process calls of their own; the infrastructure
//! layer supplies the implementations.
//!
//! # Sub-modules
//!
//! - **`discover_device`** – Resolves the target device from a manual
//!   address, multicast advertisements, or a subnet scan, in that order.
//!
//! - **`run_session`** – Drives one test session from discovery to the smoke
//!   test and records every state it passes through.

pub mod discover_device;
pub mod run_session;
