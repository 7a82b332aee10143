mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use coursefetch::app::App;
use coursefetch::config::Config;
use coursefetch::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    init_tracing(&config.telemetry.log_filter);

    let app = App::new(config)?;

    match cli.command {
        Commands::Sync(args) => commands::sync(&app, args).await?,
        Commands::Intro(args) => commands::intro(&app, args).await?,
        Commands::Invalidate(args) => commands::invalidate(&app, args).await?,
        Commands::Refresh(args) => commands::refresh(&app, args).await?,
        Commands::Handlers => commands::handlers(&app).await?,
        Commands::Prune => commands::prune(&app)?,
        Commands::Config => commands::show_config(&app)?,
    }

    Ok(())
}
