mod app;
mod cli;

use anyhow::Result;
use clap::Parser;
use podlingo::config::Settings;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let cli = cli::Cli::parse();
    let settings = Settings::from_env();
    app::run(cli, &settings)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("podlingo=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
