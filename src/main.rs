use clap::Parser;
use outlook_sync::cli::Cli;
use outlook_sync::{shutdown, startup};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    startup::init_logging(cli.verbose)?;

    info!("Starting outlook-sync");

    // Load configuration
    let config = startup::load_config(&cli)?;

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(shutdown::handle_signals(cancel.clone()));

    let result = startup::run(&cli, &config, cancel.clone()).await;

    // Let the signal task finish
    cancel.cancel();
    let _ = signal_task.await;

    result
}
