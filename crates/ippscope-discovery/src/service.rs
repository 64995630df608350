// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The lifecycle service: one task that owns the reducer.
//
// Discovery events, commands from the presentation side, and finished
// fetches are multiplexed with `tokio::select!` onto this task, which is the
// only place the model changes.  Fetches run as separate tasks on a bounded
// pool and hand their outcome back through a `JoinSet`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use ippscope_core::AppConfig;
use ippscope_core::error::{IppScopeError, Result};
use ippscope_core::types::NodeId;

use crate::discovery::DiscoveryEvent;
use crate::fetch::{self, AttributeGateway, FetchOutcome, FetchRequest};
use crate::presentation::TreeView;
use crate::reducer::Reducer;

/// Requests from the presentation side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(Option<NodeId>),
    Shutdown,
}

/// Cheap, cloneable handle for talking to a running service.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    commands: mpsc::Sender<Command>,
}

impl ServiceHandle {
    pub async fn select(&self, node: Option<NodeId>) -> Result<()> {
        self.send(Command::Select(node)).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| IppScopeError::Discovery("lifecycle service has stopped".into()))
    }
}

pub struct LifecycleService<V> {
    reducer: Reducer<V>,
    gateway: Arc<dyn AttributeGateway>,
    timeout: Duration,
    workers: Arc<Semaphore>,
    fetches: JoinSet<FetchOutcome>,
    commands: mpsc::Receiver<Command>,
}

impl<V: TreeView> LifecycleService<V> {
    pub fn new(config: AppConfig, view: V, gateway: Arc<dyn AttributeGateway>) -> (Self, ServiceHandle) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let service = Self {
            timeout: config.fetch_timeout(),
            workers: Arc::new(Semaphore::new(config.fetch_workers.max(1))),
            reducer: Reducer::new(config, view),
            gateway,
            fetches: JoinSet::new(),
            commands: rx,
        };
        (service, ServiceHandle { commands: tx })
    }

    /// Process input until shutdown.
    ///
    /// Stops on `Command::Shutdown`, or once every handle and the event
    /// sender are dropped and no fetch is left.  Outstanding fetches are
    /// aborted without waiting, the model is torn down, and the reducer is
    /// returned for inspection.
    pub async fn run(mut self, mut events: mpsc::Receiver<DiscoveryEvent>) -> Reducer<V> {
        let mut events_open = true;
        let mut commands_open = true;

        info!("lifecycle service running");
        loop {
            tokio::select! {
                Some(joined) = self.fetches.join_next(), if !self.fetches.is_empty() => {
                    match joined {
                        Ok(outcome) => {
                            if let Some(retry) = self.reducer.apply_fetch(outcome) {
                                self.spawn_fetch(retry);
                            }
                        }
                        Err(e) => error!(error = %e, "fetch task failed"),
                    }
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        if let Some(request) = self.reducer.handle(event) {
                            self.spawn_fetch(request);
                        }
                    }
                    None => {
                        debug!("discovery event stream closed");
                        events_open = false;
                    }
                },
                command = self.commands.recv(), if commands_open => match command {
                    Some(Command::Select(node)) => {
                        self.reducer.select(node);
                    }
                    Some(Command::Shutdown) => {
                        info!("shutdown requested");
                        break;
                    }
                    None => commands_open = false,
                },
                else => break,
            }
        }

        if !self.fetches.is_empty() {
            debug!(count = self.fetches.len(), "abandoning in-flight fetches");
        }
        self.fetches.abort_all();
        self.reducer.teardown();
        info!("lifecycle service stopped");
        self.reducer
    }

    fn spawn_fetch(&mut self, request: FetchRequest) {
        let gateway = Arc::clone(&self.gateway);
        let workers = Arc::clone(&self.workers);
        let timeout = self.timeout;

        debug!(system = %request.system, uri = %request.uri, "fetch queued");
        self.fetches.spawn(async move {
            let _permit = workers.acquire_owned().await.ok();
            let system = request.system.clone();
            let incarnation = request.incarnation;
            // A panicking gateway must still hand back an outcome, or the
            // system stays marked in flight.
            AssertUnwindSafe(fetch::execute(request, gateway.as_ref(), timeout))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(system = %system, "fetch panicked");
                    FetchOutcome::failed(system, incarnation, "The request failed unexpectedly.")
                })
        });
    }
}
