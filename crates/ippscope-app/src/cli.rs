// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use ippscope_core::AppConfig;

#[derive(Debug, Parser)]
#[command(
    name = "ippscope",
    version,
    about = "Browse IPP systems and their printers announced on the local network"
)]
pub struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/ippscope/config.json).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// DNS-SD service type to browse for.
    #[arg(long, value_name = "TYPE")]
    pub service_type: Option<String>,

    /// Seconds to wait for each IPP request.
    #[arg(long, value_name = "SECS")]
    pub fetch_timeout: Option<u64>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, value_name = "FILTER", default_value = "info")]
    pub log_level: String,

    /// Write the effective configuration to the config file and exit.
    #[arg(long)]
    pub write_default_config: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(service_type) = &self.service_type {
            config.service_type = service_type.clone();
        }
        if let Some(secs) = self.fetch_timeout {
            config.fetch_timeout_secs = secs;
        }
    }
}
