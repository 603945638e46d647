use anyhow::Context;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() {
    designdiff_observability::init();

    if let Err(error) = run().await {
        eprintln!("designdiff error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = designdiff_infra::AppConfig::from_env().context("invalid configuration")?;

    match cli.command {
        cli::Commands::Compare(args) => commands::compare(args, config).await,
        cli::Commands::Fallback => commands::fallback(&config),
    }
}
