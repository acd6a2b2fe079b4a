//! EventPulse CLI entry point.

use clap::Parser;

use eventpulse::cli::{Cli, Commands};
use eventpulse::infrastructure::config::ConfigLoader;
use eventpulse::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => eventpulse::cli::handle_error(&err, cli.json),
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => eventpulse::cli::handle_error(&err, cli.json),
    };

    let result = match cli.command {
        Commands::Init(args) => eventpulse::cli::commands::init::execute(args, cli.json).await,
        Commands::Event(args) => eventpulse::cli::commands::event::execute(args, &config, cli.json).await,
        Commands::Reconcile(args) => {
            eventpulse::cli::commands::reconcile::execute(args, &config, cli.json).await
        }
    };

    if let Err(err) = result {
        eventpulse::cli::handle_error(&err, cli.json);
    }
}
