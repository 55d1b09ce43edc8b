mod cli;
mod commands;
mod config;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use asa_driver::NetworkDriver;

use crate::cli::Cli;

const DEFAULT_LOG_FILTER: &str = "asa_cli=info,asa_driver=info,asa_session=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut driver = cli.device.build_driver();
    driver
        .open()
        .await
        .with_context(|| format!("Failed to open session to {}", cli.device.host))?;

    let result = commands::execute(&mut driver, &cli.command).await;

    if let Err(e) = driver.close().await {
        tracing::warn!(error = %e, "Failed to close session cleanly");
    }

    println!("{}", result?);
    Ok(())
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
