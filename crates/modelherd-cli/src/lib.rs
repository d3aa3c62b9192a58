//! CLI interface for modelherd.
//!
//! The binary wires configuration, the command registry, and the runtime
//! together in `bootstrap`, then dispatches subcommands to `handlers`.

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod sink;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
pub use sink::ConsoleOutputSink;

// Silence unused dev-dependency warnings until we add filesystem-based tests
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
