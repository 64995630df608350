// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ippscope: console browser for IPP systems and printers.
//
// Entry point. Parses arguments, initialises logging and configuration, then
// hands over to the service layer.

mod cli;
mod console;
mod services;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ippscope_core::AppConfig;
use ippscope_core::error::Result;
use ippscope_core::human_errors::humanize_error;

use cli::Cli;
use services::app_services::AppServices;
use services::config_dir;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "ippscope stopped");
            let human = humanize_error(&e);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = config_dir::config_path(cli.config.as_deref());
    let mut config = AppConfig::load(&path)?;
    cli.apply(&mut config);
    config.validate()?;

    if cli.write_default_config {
        config.save(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    tracing::info!(config = %path.display(), "ippscope starting");
    AppServices::init(config)?.run().await
}
