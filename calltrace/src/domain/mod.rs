//! Domain model for calltrace
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time separation of code addresses from plain integers
//! - Self-formatting durations for trace lines
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{Address, Elapsed};

pub use errors::{ConfigError, ResolveError};
