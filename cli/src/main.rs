use clap::Parser;
use fundwatch_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    fundwatch_cli::init_tracing(cli.quiet);

    tracing::info!("Starting Fundwatch v{}", env!("CARGO_PKG_VERSION"));
    fundwatch_cli::run(cli).await
}
