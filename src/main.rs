use anyhow::Context;
use clap::Parser;
use outrider::cli::Cli;
use outrider::output;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("outrider={}", cli.log_level())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match &cli.command {
        outrider::cli::Commands::Scan(_) => "scan",
        outrider::cli::Commands::Profiles(_) => "profiles",
        outrider::cli::Commands::Import(_) => "import",
        outrider::cli::Commands::Analyze(_) => "analyze",
    };

    cli.run()
        .await
        .with_context(|| format!("{} failed", command))
}
