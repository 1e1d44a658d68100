//! Foreman Engine Library
//!
//! This library provides the core functionality of Foreman: turning a
//! request into a plan of agent steps and executing it.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Planning and execution
pub mod conductor;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

/// Interactive console
pub mod console;
