// Module exports for CLI subcommands
//
// Each module handles one subcommand; main.rs only parses arguments and dispatches.

pub mod build;
pub mod permits;
pub mod route;
