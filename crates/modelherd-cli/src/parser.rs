//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface definition for the model-runtime supervisor.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "modelherd")]
#[command(about = "Supervise a local model runtime and its interactive clients")]
#[command(version)]
pub struct Cli {
    /// Override the runtime binary for this invocation
    #[arg(long = "runtime", global = true)]
    pub runtime: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_args_parse() {
        let cli = Cli::parse_from(["modelherd", "--verbose", "--runtime", "/opt/ollama/ollama", "serve"]);
        assert!(cli.verbose);
        assert_eq!(cli.runtime, Some("/opt/ollama/ollama".to_string()));
    }

    #[test]
    fn chat_takes_a_model_argument() {
        let cli = Cli::parse_from(["modelherd", "chat", "1.5b"]);
        match cli.command {
            Some(Commands::Chat { model }) => assert_eq!(model, "1.5b"),
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn run_model_uses_kebab_case() {
        let cli = Cli::parse_from(["modelherd", "run-model", "7b"]);
        assert!(matches!(cli.command, Some(Commands::RunModel { .. })));
    }
}
