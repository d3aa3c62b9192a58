//! Subcommand definitions.

use clap::Subcommand;

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Start the model server and supervise it until Ctrl+C
    Serve,

    /// Open an interactive chat session with a model
    Chat {
        /// Model name to chat with (e.g. "1.5b")
        model: String,
    },

    /// List the models known to the runtime
    ListModels,

    /// Run a model interactively
    RunModel {
        /// Model name to run
        name: String,
    },

    /// Pull a model through the runtime
    Pull {
        /// Model name to pull (e.g. "deepseek-r1:7b")
        model: String,
    },
}
