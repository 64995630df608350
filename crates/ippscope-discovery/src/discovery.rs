// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mDNS service discovery for IPP systems on the local network.
//
// We browse for `_ipps-system._tcp.local.` using the `mdns-sd` crate and turn
// its callbacks into `DiscoveryEvent`s on a tokio channel.  The daemon reports
// one resolution per instance and a removal by name only, so the listener
// remembers which sources it reported for each instance.  That lets it emit a
// matching `Remove` for every `New`, and report address changes on
// re-resolution as a difference.

use std::collections::HashMap;
use std::net::IpAddr;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ippscope_core::error::{IppScopeError, Result};
use ippscope_core::types::{ProtocolFamily, SourceRecord, SystemId, dns_key};

/// Browse domain. mDNS only ever answers for `local`.
const DOMAIN: &str = "local";

/// What the discovery substrate tells the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// An instance resolved to a network path.
    New { id: SystemId, source: SourceRecord },
    /// A network path for an instance went away.
    Remove { id: SystemId, source: SourceRecord },
    /// An instance was seen but could not be resolved.
    ResolveFailed { id: SystemId, detail: String },
}

/// Instance name from a DNS-SD full name.
///
/// `PrintLab._ipps-system._tcp.local.` becomes `PrintLab`.  Names that don't
/// end in the service type are returned unchanged.
pub fn instance_name<'a>(fullname: &'a str, service_type: &str) -> &'a str {
    let trimmed = fullname.strip_suffix(service_type).unwrap_or(fullname);
    if trimmed.len() == fullname.len() {
        return fullname;
    }
    trimmed.strip_suffix('.').unwrap_or(trimmed)
}

/// One source per address family the host was resolved on.
///
/// A resolution with no addresses yields a single unspecified-family source.
pub fn sources_from(host: &str, port: u16, addresses: &[IpAddr]) -> Vec<SourceRecord> {
    let mut families = Vec::new();
    for addr in addresses {
        let family = if addr.is_ipv4() {
            ProtocolFamily::Ipv4
        } else {
            ProtocolFamily::Ipv6
        };
        if !families.contains(&family) {
            families.push(family);
        }
    }
    if families.is_empty() {
        families.push(ProtocolFamily::Unspecified);
    }
    families.sort_by_key(|f| *f != ProtocolFamily::Ipv4);

    families
        .into_iter()
        .map(|family| SourceRecord::new(family, DOMAIN, host, port))
        .collect()
}

/// Sources reported so far, per instance.
#[derive(Debug, Default)]
pub struct SourceTracker {
    reported: HashMap<String, (SystemId, Vec<SourceRecord>)>,
}

impl SourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events for a (re-)resolution of `instance` to `current`.
    ///
    /// New sources are reported before stale ones are withdrawn so that an
    /// address change never empties the system's source set.
    pub fn resolved(&mut self, instance: &str, current: Vec<SourceRecord>) -> Vec<DiscoveryEvent> {
        let (id, reported) = self
            .reported
            .entry(dns_key(instance))
            .or_insert_with(|| (SystemId::new(instance), Vec::new()));

        let mut events = Vec::new();
        for source in &current {
            if !reported.contains(source) {
                events.push(DiscoveryEvent::New {
                    id: id.clone(),
                    source: source.clone(),
                });
            }
        }
        for source in reported.iter() {
            if !current.contains(source) {
                events.push(DiscoveryEvent::Remove {
                    id: id.clone(),
                    source: source.clone(),
                });
            }
        }

        *reported = current;
        events
    }

    /// Withdraw every source reported for `instance`.
    pub fn removed(&mut self, instance: &str) -> Vec<DiscoveryEvent> {
        match self.reported.remove(&dns_key(instance)) {
            Some((id, sources)) => sources
                .into_iter()
                .map(|source| DiscoveryEvent::Remove {
                    id: id.clone(),
                    source,
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Translate one resolved service into events.
fn on_resolved(
    tracker: &mut SourceTracker,
    service_type: &str,
    info: &ServiceInfo,
) -> Vec<DiscoveryEvent> {
    let instance = instance_name(info.get_fullname(), service_type);
    let host = info.get_hostname();
    let port = info.get_port();

    if host.trim_end_matches('.').is_empty() || port == 0 {
        return vec![DiscoveryEvent::ResolveFailed {
            id: SystemId::new(instance),
            detail: IppScopeError::Resolve(format!("host '{host}', port {port}")).to_string(),
        }];
    }

    let addresses: Vec<IpAddr> = info.get_addresses().iter().copied().collect();
    tracker.resolved(instance, sources_from(host, port, &addresses))
}

/// IPP system discovery using mDNS-SD.
pub struct SystemDiscovery {
    daemon: ServiceDaemon,
    service_type: String,
    browsing: bool,
}

impl SystemDiscovery {
    /// Spawn the mDNS daemon. Browsing starts with [`start`](Self::start).
    pub fn new(service_type: &str) -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| IppScopeError::Discovery(format!("failed to start mDNS daemon: {e}")))?;
        Ok(Self {
            daemon,
            service_type: service_type.to_string(),
            browsing: false,
        })
    }

    /// Start browsing and forward events to `events` until it is closed or
    /// browsing stops.
    pub fn start(&mut self, events: mpsc::Sender<DiscoveryEvent>) -> Result<()> {
        if self.browsing {
            debug!("system discovery already running");
            return Ok(());
        }

        let receiver = self.daemon.browse(&self.service_type).map_err(|e| {
            IppScopeError::Discovery(format!("browse {}: {e}", self.service_type))
        })?;

        spawn_listener(self.service_type.clone(), receiver, events)?;

        self.browsing = true;
        info!(service_type = %self.service_type, "mDNS system discovery started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.browsing {
            return Ok(());
        }
        self.daemon.stop_browse(&self.service_type).map_err(|e| {
            IppScopeError::Discovery(format!("stop browse {}: {e}", self.service_type))
        })?;
        self.browsing = false;
        info!("mDNS system discovery stopped");
        Ok(())
    }

    /// Shut down the daemon. The instance cannot be reused afterwards.
    pub fn shutdown(self) -> Result<()> {
        let _status_rx = self
            .daemon
            .shutdown()
            .map_err(|e| IppScopeError::Discovery(format!("daemon shutdown: {e}")))?;
        info!("mDNS daemon shut down");
        Ok(())
    }
}

/// Drain the daemon's receiver on a dedicated thread.
fn spawn_listener(
    service_type: String,
    receiver: mdns_sd::Receiver<ServiceEvent>,
    events: mpsc::Sender<DiscoveryEvent>,
) -> Result<()> {
    std::thread::Builder::new()
        .name(format!("mdns-{service_type}"))
        .spawn(move || {
            let mut tracker = SourceTracker::new();

            while let Ok(event) = receiver.recv() {
                let out = match event {
                    ServiceEvent::SearchStarted(stype) => {
                        debug!(service_type = %stype, "mDNS search started");
                        continue;
                    }
                    ServiceEvent::ServiceFound(stype, fullname) => {
                        debug!(service_type = %stype, name = %fullname, "service found");
                        continue;
                    }
                    ServiceEvent::ServiceResolved(info) => {
                        debug!(name = %info.get_fullname(), host = %info.get_hostname(), "service resolved");
                        on_resolved(&mut tracker, &service_type, &info)
                    }
                    ServiceEvent::ServiceRemoved(stype, fullname) => {
                        debug!(service_type = %stype, name = %fullname, "service removed");
                        tracker.removed(instance_name(&fullname, &service_type))
                    }
                    ServiceEvent::SearchStopped(stype) => {
                        debug!(service_type = %stype, "mDNS search stopped");
                        break;
                    }
                };

                for event in out {
                    if events.blocking_send(event).is_err() {
                        warn!("event channel closed, mDNS listener exiting");
                        return;
                    }
                }
            }
        })
        .map_err(|e| IppScopeError::Discovery(format!("failed to spawn mDNS listener: {e}")))?;
    Ok(())
}
