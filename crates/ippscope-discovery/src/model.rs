// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The system/printer object graph.
//
// Systems live in a single identity index keyed by instance name; printers
// are owned by their system and reachable only through it.  Every structural
// change is reported to a `TreeSink` within the same call, before the object
// is forgotten, so tree consumers never see a dangling parent.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use ippscope_core::error::{IppScopeError, Result};
use ippscope_core::types::{Incarnation, NodeId, ObjectKind, SystemId};

use crate::presentation::TreeSink;
use crate::source::SourceSet;

/// A printer enumerated from its parent system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterObject {
    pub name: String,
    pub uri: String,
    /// Rendered attribute text; `None` when the fetch failed.
    pub attributes: Option<String>,
    /// Why the attribute fetch failed, in plain English.
    pub attribute_error: Option<String>,
}

/// A discovered IPP system and everything known about it.
#[derive(Debug)]
pub struct SystemObject {
    id: SystemId,
    incarnation: Incarnation,
    first_seen: DateTime<Utc>,
    endpoint: Option<String>,
    attributes: Option<String>,
    attribute_error: Option<String>,
    sources: SourceSet,
    children: IndexMap<String, PrinterObject>,
    shown: bool,
    fetch_in_flight: bool,
    /// Endpoints of sources that resolved while a fetch was in flight, oldest
    /// first.
    retry_via: IndexSet<String>,
}

impl SystemObject {
    fn new(id: SystemId) -> Self {
        Self {
            id,
            incarnation: Incarnation::new(),
            first_seen: Utc::now(),
            endpoint: None,
            attributes: None,
            attribute_error: None,
            sources: SourceSet::new(),
            children: IndexMap::new(),
            shown: false,
            fetch_in_flight: false,
            retry_via: IndexSet::new(),
        }
    }

    /// Identity of the system, as announced.
    pub fn id(&self) -> &SystemId {
        &self.id
    }

    /// Token for this lifetime of the system. A system that disappears and is
    /// announced again gets a fresh one.
    pub fn incarnation(&self) -> Incarnation {
        self.incarnation
    }

    /// When this incarnation was created.
    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    /// URI derived from the first usable source. Never changes once set.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Rendered system attributes, once a fetch has succeeded.
    pub fn attributes(&self) -> Option<&str> {
        self.attributes.as_deref()
    }

    /// Plain-English reason the last attribute fetch failed.
    pub fn attribute_error(&self) -> Option<&str> {
        self.attribute_error.as_deref()
    }

    /// Network paths the system is currently reachable through.
    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub(crate) fn sources_mut(&mut self) -> &mut SourceSet {
        &mut self.sources
    }

    /// Printers hosted by the system, in enumeration order.
    pub fn children(&self) -> impl Iterator<Item = &PrinterObject> {
        self.children.values()
    }

    /// Printer by name.
    pub fn child(&self, name: &str) -> Option<&PrinterObject> {
        self.children.get(name)
    }

    /// Whether printers have been enumerated.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Whether a tree row has been created for the system.
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Whether a fetch for this incarnation is outstanding.
    pub fn fetch_in_flight(&self) -> bool {
        self.fetch_in_flight
    }

    pub(crate) fn set_fetch_in_flight(&mut self, in_flight: bool) {
        self.fetch_in_flight = in_flight;
    }

    /// Park a retry through `via`. Parking the same endpoint twice is a no-op.
    pub(crate) fn defer_retry(&mut self, via: String) {
        self.retry_via.insert(via);
    }

    /// Oldest parked retry, if any.
    pub(crate) fn take_retry(&mut self) -> Option<String> {
        self.retry_via.shift_remove_index(0)
    }

    pub(crate) fn clear_retries(&mut self) {
        self.retry_via.clear();
    }

    /// Set the endpoint unless one is already set. Returns whether it was set.
    pub(crate) fn set_endpoint(&mut self, uri: String) -> bool {
        if self.endpoint.is_some() {
            return false;
        }
        self.endpoint = Some(uri);
        true
    }

    pub(crate) fn set_attribute_error(&mut self, reason: String) {
        self.attribute_error = Some(reason);
    }
}

/// Identity index of live systems, in creation order.
#[derive(Debug, Default)]
pub struct ObjectModel {
    systems: IndexMap<SystemId, SystemObject>,
}

impl ObjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live system by identity. Lookups compare names as DNS names.
    pub fn lookup_system(&self, id: &SystemId) -> Option<&SystemObject> {
        self.systems.get(id)
    }

    pub(crate) fn lookup_system_mut(&mut self, id: &SystemId) -> Option<&mut SystemObject> {
        self.systems.get_mut(id)
    }

    /// Live systems in creation order.
    pub fn systems(&self) -> impl Iterator<Item = &SystemObject> {
        self.systems.values()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Create a system and show it in the tree.
    ///
    /// Callers look up before creating; an existing id is `DuplicateId`.
    pub fn create_system(
        &mut self,
        id: SystemId,
        sink: &mut dyn TreeSink,
    ) -> Result<&mut SystemObject> {
        if self.systems.contains_key(&id) {
            return Err(IppScopeError::DuplicateId(id.to_string()));
        }

        sink.node_added(None, NodeId::System(id.clone()), id.to_string(), ObjectKind::System.label());

        let mut system = SystemObject::new(id.clone());
        system.shown = true;
        debug!(system = %id, incarnation = %system.incarnation, "system created");

        Ok(self.systems.entry(id).or_insert(system))
    }

    /// Destroy a system and all of its printers.
    ///
    /// Children are reported removed first, in enumeration order, then the
    /// system itself; the identity is freed last.
    pub fn destroy_system(&mut self, id: &SystemId, sink: &mut dyn TreeSink) -> Result<()> {
        let system = self
            .systems
            .get(id)
            .ok_or_else(|| IppScopeError::UnknownSystem(id.to_string()))?;

        for printer in system.children.keys() {
            sink.node_removed(NodeId::Printer {
                system: id.clone(),
                printer: printer.clone(),
            });
        }
        if system.shown {
            sink.node_removed(NodeId::System(id.clone()));
        }

        self.systems.shift_remove(id);
        debug!(system = %id, "system destroyed");
        Ok(())
    }

    /// Attach enumerated printers to a system.
    ///
    /// Enumeration happens once: if the system already has printers this is
    /// a no-op. Returns the number of printers added.
    pub fn append_children(
        &mut self,
        id: &SystemId,
        printers: Vec<PrinterObject>,
        sink: &mut dyn TreeSink,
    ) -> Result<usize> {
        let system = self
            .systems
            .get_mut(id)
            .ok_or_else(|| IppScopeError::UnknownSystem(id.to_string()))?;

        if !system.children.is_empty() {
            debug!(system = %id, "printers already enumerated");
            return Ok(0);
        }

        let parent = NodeId::System(id.clone());
        let mut added = 0;
        for printer in printers {
            if system.children.contains_key(&printer.name) {
                warn!(system = %id, printer = %printer.name, "duplicate printer name in enumeration");
                continue;
            }
            sink.node_added(
                Some(parent.clone()),
                NodeId::Printer {
                    system: id.clone(),
                    printer: printer.name.clone(),
                },
                printer.name.clone(),
                ObjectKind::Printer.label(),
            );
            system.children.insert(printer.name.clone(), printer);
            added += 1;
        }
        Ok(added)
    }

    /// Store fetched system attributes. Set once; later calls are ignored.
    pub fn record_attributes(
        &mut self,
        id: &SystemId,
        text: String,
        sink: &mut dyn TreeSink,
    ) -> Result<bool> {
        let system = self
            .systems
            .get_mut(id)
            .ok_or_else(|| IppScopeError::UnknownSystem(id.to_string()))?;

        if system.attributes.is_some() {
            return Ok(false);
        }

        system.attribute_error = None;
        system.attributes = Some(text.clone());
        sink.node_updated(NodeId::System(id.clone()), text);
        Ok(true)
    }

    /// Destroy every system, e.g. on shutdown.
    pub fn teardown(&mut self, sink: &mut dyn TreeSink) {
        let ids: Vec<SystemId> = self.systems.keys().cloned().collect();
        for id in ids {
            // Ids come straight from the index.
            let _ = self.destroy_system(&id, sink);
        }
    }
}
