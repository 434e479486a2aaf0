//! Command-line interface for calltrace
//!
//! This module contains CLI argument parsing and the text reports printed by
//! the `check` subcommand.

pub mod args;
pub mod report;

pub use args::{Args, Command, FilterArgs};
