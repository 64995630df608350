// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Discovery event reducer.
//
// The reducer owns the object model and the presentation bridge and is the
// only code that mutates either.  It is synchronous: network work leaves as a
// `FetchRequest` and comes back as a `FetchOutcome`, so the caller decides
// where fetches run.
//
// Per identity the lifecycle is
//
//   Unknown --New--> Pending (no usable endpoint yet) --New--> Active
//         \--New (endpoint ok)---------------------------------^
//   Pending/Active --Remove of last source--> Unknown
//
// Duplicate sources, removals of unknown sources or systems, and resolution
// failures leave the model untouched.

use tracing::{debug, error, info, warn};

use ippscope_core::AppConfig;
use ippscope_core::types::{NodeId, SourceRecord, SystemId};

use crate::discovery::DiscoveryEvent;
use crate::endpoint::build_endpoint;
use crate::fetch::{self, FetchOutcome, FetchRequest};
use crate::model::ObjectModel;
use crate::presentation::{PresentationBridge, TreeView};
use crate::source::{AddOutcome, RemoveOutcome};

/// Lifecycle state of one system identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    /// No object exists.
    Unknown,
    /// Shown, but no source has produced a usable endpoint.
    Pending,
    /// Endpoint set; attributes and printers fetched or being fetched.
    Active,
}

pub struct Reducer<V> {
    config: AppConfig,
    model: ObjectModel,
    bridge: PresentationBridge<V>,
}

impl<V: TreeView> Reducer<V> {
    pub fn new(config: AppConfig, view: V) -> Self {
        Self {
            config,
            model: ObjectModel::new(),
            bridge: PresentationBridge::new(view),
        }
    }

    pub fn model(&self) -> &ObjectModel {
        &self.model
    }

    pub fn bridge(&self) -> &PresentationBridge<V> {
        &self.bridge
    }

    pub fn state(&self, id: &SystemId) -> SystemState {
        match self.model.lookup_system(id) {
            None => SystemState::Unknown,
            Some(system) if system.endpoint().is_none() => SystemState::Pending,
            Some(_) => SystemState::Active,
        }
    }

    /// Apply one discovery event. Returns a fetch to start, if any.
    pub fn handle(&mut self, event: DiscoveryEvent) -> Option<FetchRequest> {
        match event {
            DiscoveryEvent::New { id, source } => self.handle_new(id, source),
            DiscoveryEvent::Remove { id, source } => {
                self.handle_remove(&id, &source);
                None
            }
            DiscoveryEvent::ResolveFailed { id, detail } => {
                warn!(system = %id, detail = %detail, "resolution failed, announcement dropped");
                None
            }
        }
    }

    fn handle_new(&mut self, id: SystemId, source: SourceRecord) -> Option<FetchRequest> {
        let via = match build_endpoint(&self.config, &source) {
            Ok(uri) => Some(uri),
            Err(e) => {
                warn!(system = %id, source = %source, error = %e, "source has no usable endpoint");
                None
            }
        };

        if self.model.lookup_system(&id).is_none() {
            if let Err(e) = self.model.create_system(id.clone(), &mut self.bridge) {
                error!(system = %id, error = %e, "create after failed lookup");
                debug_assert!(false, "create after failed lookup: {e}");
                return None;
            }
            info!(system = %id, source = %source, "system discovered");
        }

        let system = self.model.lookup_system_mut(&id)?;
        if system.sources_mut().add(source) == AddOutcome::AlreadyPresent {
            debug!(system = %id, "source already known");
            return None;
        }

        if let Some(uri) = &via
            && system.set_endpoint(uri.clone())
        {
            info!(system = %id, uri = %uri, "endpoint set");
        }

        let request = fetch::plan(system, via);
        self.refresh_if_selected(&id);
        request
    }

    fn handle_remove(&mut self, id: &SystemId, source: &SourceRecord) {
        let Some(system) = self.model.lookup_system_mut(id) else {
            debug!(system = %id, "remove for unknown system ignored");
            return;
        };

        match system.sources_mut().remove(source) {
            RemoveOutcome::NotFound => {
                debug!(system = %id, source = %source, "remove for unknown source ignored");
            }
            RemoveOutcome::Removed { remaining: 0 } => {
                if let Err(e) = self.model.destroy_system(id, &mut self.bridge) {
                    error!(system = %id, error = %e, "destroy after successful lookup");
                    debug_assert!(false, "destroy after successful lookup: {e}");
                    return;
                }
                info!(system = %id, "system gone");
            }
            RemoveOutcome::Removed { remaining } => {
                debug!(system = %id, source = %source, remaining, "source withdrawn");
                self.refresh_if_selected(id);
            }
        }
    }

    /// Fold a finished fetch into the model. May return a deferred retry.
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> Option<FetchRequest> {
        let id = outcome.system.clone();
        let retry = fetch::apply(outcome, &mut self.model, &mut self.bridge);
        self.refresh_if_selected(&id);
        retry
    }

    /// Change the selection and redraw the details pane.
    pub fn select(&mut self, node: Option<NodeId>) -> bool {
        if !self.bridge.select(node) {
            return false;
        }
        self.bridge.refresh_details(&self.model);
        true
    }

    pub fn query_selected_id(&self) -> Option<&NodeId> {
        self.bridge.query_selected_id()
    }

    /// Destroy everything, e.g. on shutdown.
    pub fn teardown(&mut self) {
        let count = self.model.len();
        self.model.teardown(&mut self.bridge);
        info!(count, "all systems torn down");
    }

    fn refresh_if_selected(&mut self, id: &SystemId) {
        if self
            .bridge
            .query_selected_id()
            .is_some_and(|node| node.system() == id)
        {
            self.bridge.refresh_details(&self.model);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{RecordingView, ScriptedGateway};
    use ippscope_core::types::ProtocolFamily;

    const HOST1: &str = "ipp://host1:631/ipp/system";
    const HOST2: &str = "ipp://host2:631/ipp/system";

    fn src(host: &str) -> SourceRecord {
        SourceRecord::new(ProtocolFamily::Ipv4, "local", host, 631)
    }

    fn new(id: &str, host: &str) -> DiscoveryEvent {
        DiscoveryEvent::New {
            id: id.into(),
            source: src(host),
        }
    }

    fn remove(id: &str, host: &str) -> DiscoveryEvent {
        DiscoveryEvent::Remove {
            id: id.into(),
            source: src(host),
        }
    }

    fn reducer() -> Reducer<RecordingView> {
        Reducer::new(AppConfig::default(), RecordingView::default())
    }

    fn gateway() -> ScriptedGateway {
        ScriptedGateway::new()
            .with_attributes(HOST1, "system-state = idle")
            .with_children(
                HOST1,
                &[
                    ("office", "ipp://host1:631/ipp/print/office"),
                    ("lab", "ipp://host1:631/ipp/print/lab"),
                ],
            )
            .with_attributes("ipp://host1:631/ipp/print/office", "printer-state = idle")
            .with_attributes("ipp://host1:631/ipp/print/lab", "printer-state = stopped")
    }

    /// Run a request and every retry it leads to.
    async fn settle(
        reducer: &mut Reducer<RecordingView>,
        gateway: &ScriptedGateway,
        mut request: Option<FetchRequest>,
    ) {
        while let Some(next) = request {
            let outcome = fetch::execute(next, gateway, Duration::from_secs(1)).await;
            request = reducer.apply_fetch(outcome);
        }
    }

    fn removals(view: &RecordingView) -> Vec<&str> {
        view.log
            .iter()
            .filter_map(|line| line.strip_prefix("remove "))
            .collect()
    }

    #[tokio::test]
    async fn print_lab_lifecycle() {
        let mut reducer = reducer();
        let gateway = gateway();
        let id = SystemId::new("PrintLab");

        let request = reducer.handle(new("PrintLab", "host1"));
        assert_eq!(request.as_ref().map(|r| r.uri.as_str()), Some(HOST1));
        settle(&mut reducer, &gateway, request).await;

        let system = reducer.model().lookup_system(&id).unwrap();
        assert_eq!(system.endpoint(), Some(HOST1));
        assert_eq!(system.attributes(), Some("system-state = idle"));
        assert_eq!(system.children().count(), 2);
        assert_eq!(gateway.calls_to("attributes"), 1);

        assert!(reducer.handle(new("PrintLab", "host2")).is_none());
        let system = reducer.model().lookup_system(&id).unwrap();
        assert_eq!(system.sources().len(), 2);
        assert_eq!(system.endpoint(), Some(HOST1));
        assert_eq!(gateway.calls_to("attributes"), 1);

        reducer.handle(remove("PrintLab", "host1"));
        let system = reducer.model().lookup_system(&id).unwrap();
        assert_eq!(system.sources().len(), 1);
        assert_eq!(system.attributes(), Some("system-state = idle"));

        reducer.handle(remove("PrintLab", "host2"));
        assert!(reducer.model().lookup_system(&id).is_none());
        assert_eq!(reducer.state(&id), SystemState::Unknown);
        assert_eq!(
            removals(reducer.bridge().view()),
            ["office", "lab", "PrintLab"]
        );
    }

    #[tokio::test]
    async fn duplicate_source_triggers_no_second_fetch() {
        let mut reducer = reducer();
        let gateway = gateway();

        let request = reducer.handle(new("PrintLab", "host1"));
        settle(&mut reducer, &gateway, request).await;
        assert!(reducer.handle(new("PrintLab", "HOST1.")).is_none());

        let system = reducer.model().lookup_system(&"PrintLab".into()).unwrap();
        assert_eq!(system.sources().len(), 1);
        assert_eq!(gateway.calls_to("attributes"), 1);
    }

    #[test]
    fn first_resolved_source_wins_the_endpoint() {
        let mut reducer = reducer();
        reducer.handle(new("PrintLab", "host1"));
        reducer.handle(new("PrintLab", "host2"));

        let system = reducer.model().lookup_system(&"PrintLab".into()).unwrap();
        assert_eq!(system.endpoint(), Some(HOST1));
        assert_eq!(system.sources().len(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_is_retried_through_the_next_source() {
        let mut reducer = reducer();
        let gateway = ScriptedGateway::new().with_attributes(HOST2, "system-state = idle");

        let request = reducer.handle(new("PrintLab", "host1"));
        settle(&mut reducer, &gateway, request).await;
        let id = SystemId::new("PrintLab");
        assert!(reducer.model().lookup_system(&id).unwrap().attributes().is_none());

        let request = reducer.handle(new("PrintLab", "host2"));
        assert_eq!(request.as_ref().map(|r| r.uri.as_str()), Some(HOST2));
        settle(&mut reducer, &gateway, request).await;

        let system = reducer.model().lookup_system(&id).unwrap();
        assert_eq!(system.attributes(), Some("system-state = idle"));
        assert_eq!(system.endpoint(), Some(HOST1));
    }

    #[tokio::test]
    async fn source_arriving_mid_fetch_is_retried_afterwards() {
        let mut reducer = reducer();
        let gateway = ScriptedGateway::new().with_attributes(HOST2, "system-state = idle");

        let first = reducer.handle(new("PrintLab", "host1")).unwrap();
        assert!(reducer.handle(new("PrintLab", "host2")).is_none());

        settle(&mut reducer, &gateway, Some(first)).await;

        let system = reducer.model().lookup_system(&"PrintLab".into()).unwrap();
        assert_eq!(system.attributes(), Some("system-state = idle"));
        assert_eq!(gateway.calls_to("attributes"), 2);
    }

    #[test]
    fn unusable_first_source_leaves_system_pending() {
        let mut reducer = reducer();
        let id = SystemId::new("PrintLab");

        assert!(reducer.handle(new("PrintLab", "bad host")).is_none());
        assert_eq!(reducer.state(&id), SystemState::Pending);
        assert_eq!(reducer.bridge().view().names(), ["PrintLab"]);

        let request = reducer.handle(new("PrintLab", "host2")).unwrap();
        assert_eq!(request.uri, HOST2);
        assert_eq!(reducer.state(&id), SystemState::Active);
    }

    #[test]
    fn idempotent_removes_change_nothing() {
        let mut reducer = reducer();
        reducer.handle(new("PrintLab", "host1"));
        let log_len = reducer.bridge().view().log.len();

        reducer.handle(remove("Ghost", "host1"));
        reducer.handle(remove("PrintLab", "host9"));

        let system = reducer.model().lookup_system(&"PrintLab".into()).unwrap();
        assert_eq!(system.sources().len(), 1);
        assert_eq!(reducer.bridge().view().log.len(), log_len);
    }

    #[test]
    fn resolve_failure_creates_nothing() {
        let mut reducer = reducer();
        let request = reducer.handle(DiscoveryEvent::ResolveFailed {
            id: "PrintLab".into(),
            detail: "timed out".into(),
        });
        assert!(request.is_none());
        assert!(reducer.model().is_empty());
        assert!(reducer.bridge().view().log.is_empty());
    }

    #[tokio::test]
    async fn late_outcome_after_removal_is_dropped() {
        let mut reducer = reducer();
        let gateway = gateway();

        let request = reducer.handle(new("PrintLab", "host1")).unwrap();
        reducer.handle(remove("PrintLab", "host1"));
        let outcome = fetch::execute(request, &gateway, Duration::from_secs(1)).await;
        let log_len = reducer.bridge().view().log.len();

        assert!(reducer.apply_fetch(outcome).is_none());
        assert!(reducer.model().is_empty());
        assert_eq!(reducer.bridge().view().log.len(), log_len);
    }

    #[tokio::test]
    async fn late_outcome_for_old_incarnation_is_dropped() {
        let mut reducer = reducer();
        let gateway = gateway();

        let stale = reducer.handle(new("PrintLab", "host1")).unwrap();
        reducer.handle(remove("PrintLab", "host1"));
        let fresh = reducer.handle(new("PrintLab", "host1")).unwrap();
        assert_ne!(stale.incarnation, fresh.incarnation);

        let outcome = fetch::execute(stale, &gateway, Duration::from_secs(1)).await;
        reducer.apply_fetch(outcome);

        let system = reducer.model().lookup_system(&"PrintLab".into()).unwrap();
        assert!(system.attributes().is_none());
        assert!(system.fetch_in_flight());
    }

    #[tokio::test]
    async fn selection_follows_model_changes() {
        let mut reducer = reducer();
        let gateway = gateway();

        let request = reducer.handle(new("PrintLab", "host1"));
        assert!(reducer.select(Some(NodeId::System("PrintLab".into()))));
        assert!(
            reducer.bridge().view().details.as_deref().unwrap().starts_with("FETCHING ATTRIBUTES")
        );

        settle(&mut reducer, &gateway, request).await;
        assert!(reducer.bridge().view().details.as_deref().unwrap().contains("system-state = idle"));

        reducer.handle(remove("PrintLab", "host1"));
        assert!(reducer.query_selected_id().is_none());
        assert!(reducer.bridge().view().details.is_none());
    }

    #[tokio::test]
    async fn teardown_removes_every_row() {
        let mut reducer = reducer();
        let gateway = gateway();
        let request = reducer.handle(new("PrintLab", "host1"));
        settle(&mut reducer, &gateway, request).await;
        reducer.handle(new("Annex", "host2"));

        reducer.teardown();

        assert!(reducer.model().is_empty());
        assert!(reducer.bridge().view().rows.is_empty());
        assert_eq!(
            removals(reducer.bridge().view()),
            ["office", "lab", "PrintLab", "Annex"]
        );
    }
}
