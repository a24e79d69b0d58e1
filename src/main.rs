use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    let cli = quickadd::cli::Cli::parse();
    quickadd::init_tracing(cli.log_filter.as_deref())?;

    let config = quickadd::config::from_cli(&cli)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let stdout = std::io::stdout();
    let handle = stdout.lock();
    runtime.block_on(quickadd::commands::execute(config, cli.command, handle))
}
