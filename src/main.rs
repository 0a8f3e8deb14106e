use clap::Parser;
use manual_rag::{cli::Cli, config::Config, utils::init_logger};
use tracing::debug;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_logger();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    debug!(database = ?config.database.host, embeddings = ?config.embeddings, "Configuration loaded");

    manual_rag::cli::run(cli, config).await?;

    Ok(())
}
