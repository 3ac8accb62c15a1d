use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dns_probe::{
    app,
    config::{Cli, ProbeConfig},
    transport::UdpTransport,
};

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("'{log_level}' is not a valid log filter"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    let config = ProbeConfig::try_from(&cli).context("Invalid probe configuration")?;

    let response = app::run(&config, UdpTransport::default()).await?;
    println!("{}", response.summary());
    print!("{response}");
    Ok(())
}
