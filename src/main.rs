//! Collective Memory - Main Entry Point

use clap::Parser;
use collective_memory::cli::{
    cmd_generate, cmd_history, cmd_list, cmd_predict, cmd_promote, cmd_retrain, cmd_run, cmd_upload, Cli,
    Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collective_memory=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match &cli.command {
        Commands::Upload { files } => cmd_upload(config, files).await?,
        Commands::List => cmd_list(config)?,
        Commands::Retrain => cmd_retrain(config)?,
        Commands::History => cmd_history(config)?,
        Commands::Promote { version } => cmd_promote(config, *version)?,
        Commands::Run { run_id } => cmd_run(config, run_id)?,
        Commands::Predict { features } => cmd_predict(config, features)?,
        Commands::Generate { output, rows, seed } => cmd_generate(output, *rows, *seed)?,
    }

    Ok(())
}
