//! # refuge-shared
//!
//! Typed identifiers and small shared enums used across the Refuge
//! workspace, plus the tracing bootstrap for binaries and examples.

pub mod telemetry;
pub mod types;

pub use types::*;
