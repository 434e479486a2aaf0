//! Structured error types for calltrace
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::Address;
use thiserror::Error;

/// Why an address could not be turned into a raw symbol name.
///
/// The tracker treats every variant as "do not trace"; none of them reach
/// the traced program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Address {addr} is not inside any loaded module")]
    NoModule { addr: Address },

    #[error("No symbol covers {addr} in {module}")]
    NoSymbol { addr: Address, module: String },

    #[error("Symbol name at {addr} is not valid UTF-8")]
    InvalidName { addr: Address },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid maximum call depth: {0:?}")]
    InvalidMaxDepth(String),

    #[error("Maximum call depth must be at least 1")]
    ZeroMaxDepth,

    #[error("Tracer configuration already installed for this process")]
    AlreadyInstalled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_display() {
        let err = ResolveError::NoSymbol { addr: Address(0x1234), module: "/usr/bin/app".to_string() };
        assert_eq!(err.to_string(), "No symbol covers 0x1234 in /usr/bin/app");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidMaxDepth("deep".to_string());
        assert!(err.to_string().contains("\"deep\""));
        assert!(ConfigError::AlreadyInstalled.to_string().contains("already installed"));
    }
}
