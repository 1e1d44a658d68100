//! Foreman SDK
//!
//! Shared error taxonomy for Foreman components.
//! This crate is used by the engine library, its binary and its tests.

/// Error types and handling
pub mod errors;

// Re-export commonly used types
pub use errors::{EngineError, ForemanErrorExt};
