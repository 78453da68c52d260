//! Meshward CLI entry point.

use clap::Parser;

use meshward::cli::commands::{self, load_config};
use meshward::cli::{handle_error, Cli, Commands};
use meshward::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Apply(args) => commands::apply::execute(args, &config, cli.json).await,
        Commands::Remove(args) => commands::remove::execute(args, &config, cli.json).await,
        Commands::Trust(args) => commands::trust::execute(args, &config, cli.json).await,
        Commands::Resources(args) => commands::resources::execute(args, &config, cli.json).await,
        Commands::CheckConfig(args) => {
            commands::check_config::execute(args, &config, cli.json).await
        }
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
