use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use bookshelf_kernel::settings::Settings;

/// Book catalog REST API
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP server
    Run {
        /// Directory holding base.toml and {env}.toml (default: $BOOKSHELF_CONFIG_DIR or ./config)
        #[arg(long)]
        config_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config_dir } => {
            let settings = match config_dir {
                Some(dir) => Settings::load_from(&dir),
                None => Settings::load(),
            }
            .context("failed to load bookshelf settings")?;

            bookshelf_telemetry::init(&settings.telemetry)?;

            tracing::info!(
                env = ?settings.environment,
                host = %settings.server.host,
                port = settings.server.port,
                "bookshelf starting"
            );

            bookshelf::run(settings).await
        }
    }
}
