// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: owns the mDNS browser and runs the lifecycle
// service against the console until the user quits or presses Ctrl-C.

use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ippscope_core::AppConfig;
use ippscope_core::error::{IppScopeError, Result};
use ippscope_discovery::discovery::SystemDiscovery;
use ippscope_discovery::ipp_client::IppGateway;
use ippscope_discovery::service::{LifecycleService, ServiceHandle};

use crate::console::{self, ConsoleCommand, ConsoleView, SharedRows};

pub struct AppServices {
    config: AppConfig,
    discovery: SystemDiscovery,
}

impl AppServices {
    /// Prepare discovery. Fails when no mDNS daemon can be started.
    pub fn init(config: AppConfig) -> Result<Self> {
        let discovery = SystemDiscovery::new(&config.service_type)?;
        info!(service_type = %config.service_type, "app services initialised");
        Ok(Self { config, discovery })
    }

    /// Browse until interrupted, then tear everything down.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            mut discovery,
        } = self;

        let (events_tx, events_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        discovery.start(events_tx)?;

        let rows = SharedRows::default();
        let view = ConsoleView::new(rows.clone(), std::io::stdout());
        let gateway = Arc::new(IppGateway::new(&config));
        let (service, handle) = LifecycleService::new(config, view, gateway);

        let service_task = tokio::spawn(service.run(events_rx));
        let input_task = tokio::spawn(read_commands(handle.clone(), rows, spawn_stdin_reader()?));

        println!("Browsing. Type 'help' for commands.");
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "could not listen for Ctrl-C");
                }
                info!("interrupted");
            }
            _ = input_task => {}
        }

        if handle.shutdown().await.is_err() {
            debug!("lifecycle service already stopped");
        }
        let reducer = service_task
            .await
            .map_err(|e| IppScopeError::Discovery(format!("lifecycle task failed: {e}")))?;
        debug!(remaining = reducer.model().len(), "lifecycle service joined");

        discovery.stop()?;
        discovery.shutdown()?;
        Ok(())
    }
}

/// Forward stdin lines from a detached thread, off the runtime, so that
/// shutdown never waits for a newline.
fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "console input failed");
                        return;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Run console commands until `quit`. End of input leaves the browser
/// running until Ctrl-C.
async fn read_commands(handle: ServiceHandle, rows: SharedRows, mut lines: mpsc::Receiver<String>) {
    loop {
        let Some(line) = lines.recv().await else {
            debug!("console input closed");
            std::future::pending::<()>().await;
            return;
        };

        let command = match console::parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        let sent = match command {
            ConsoleCommand::Select(node) => handle.select(Some(node)).await,
            ConsoleCommand::Clear => handle.select(None).await,
            ConsoleCommand::Tree => {
                print!("{}", console::render_tree(&rows));
                Ok(())
            }
            ConsoleCommand::Help => {
                println!("{}", console::HELP);
                Ok(())
            }
            ConsoleCommand::Quit => return,
        };
        if sent.is_err() {
            return;
        }
    }
}
