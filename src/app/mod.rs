mod cli;
mod client;
mod data_io;
mod error;
mod label_form;
mod pagination;
mod queue;
mod resources;
mod runtime;
mod selection;
mod session;
mod tui;
mod types;
mod ui_utils;
mod view;

#[cfg(test)]
mod test_support;

use std::fs::File;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use client::QueryClient;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reviewq=info"))
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    if cli.no_tui {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init();
    } else if let Some(path) = &cli.log_file {
        let file = File::create(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let timeout = cli.timeout_ms.map(Duration::from_millis);
    let client = QueryClient::new(&cli.api_base, timeout)?;
    tracing::info!(api_base = %client.base(), no_tui = cli.no_tui, "starting review session");

    if cli.no_tui {
        runtime::run_headless(&cli, client).await
    } else {
        runtime::run_tui(&cli, client)
    }
}
