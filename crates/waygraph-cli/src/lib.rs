//! Waygraph CLI library.
//!
//! Subcommand handlers and output formatting live here so integration tests
//! and the binary share one implementation.

pub mod commands;
pub mod output;
