//! CLI entry point - the composition root.
//!
//! Command dispatch routes to handlers which delegate to the supervisor and
//! session controller composed in `bootstrap`. Exit codes come from the
//! error classification in `error.rs`: 0 on clean shutdown, category codes
//! for launch, readiness, and termination failures.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use modelherd_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    match run(cli).await {
        Ok(()) => {}
        Err(e) => {
            let cli_error = CliError::classify(&e);
            eprintln!("error: {cli_error}");
            std::process::exit(cli_error.exit_code());
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = CliConfig::with_defaults()?;
    if let Some(runtime) = cli.runtime {
        config.runtime_bin = runtime;
    }

    // Bootstrap the CLI context (composition root)
    let ctx = bootstrap(config)?;

    // Dispatch to appropriate handler
    let Some(command) = cli.command else {
        // No command provided - show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Serve => handlers::serve::execute(&ctx).await,
        Commands::Chat { model } => handlers::chat::execute(&ctx, &model).await,
        Commands::ListModels => handlers::list::execute(&ctx).await,
        Commands::RunModel { name } => handlers::run::execute(&ctx, &name).await,
        Commands::Pull { model } => handlers::pull::execute(&ctx, &model).await,
    }
}
