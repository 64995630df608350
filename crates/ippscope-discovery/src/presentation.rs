// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Presentation bridge between the object model and an external tree view.
//
// The model reports mutations through `TreeSink`.  The bridge translates them
// into row operations on a `TreeView`, keeping the node-to-row map and the
// current selection so that entities never hold UI handles.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::{debug, warn};

use ippscope_core::types::{NodeId, ObjectKind, SystemId, TreeEvent};

use crate::model::{ObjectModel, PrinterObject, SystemObject};

/// Receiver of ordered tree mutations.
pub trait TreeSink {
    fn node_added(
        &mut self,
        parent: Option<NodeId>,
        id: NodeId,
        display_name: String,
        type_label: &'static str,
    );

    fn node_updated(&mut self, id: NodeId, display_text: String);

    /// Removing a parent is always preceded by the removal of its children.
    fn node_removed(&mut self, id: NodeId);
}

/// Records events in order. Used by tests and benchmarks.
impl TreeSink for Vec<TreeEvent> {
    fn node_added(
        &mut self,
        parent: Option<NodeId>,
        id: NodeId,
        display_name: String,
        type_label: &'static str,
    ) {
        self.push(TreeEvent::NodeAdded {
            parent,
            id,
            display_name,
            type_label,
        });
    }

    fn node_updated(&mut self, id: NodeId, display_text: String) {
        self.push(TreeEvent::NodeUpdated { id, display_text });
    }

    fn node_removed(&mut self, id: NodeId) {
        self.push(TreeEvent::NodeRemoved { id });
    }
}

/// Opaque reference to a row in the external tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle(pub u64);

/// The widget side of the tree: whatever actually draws rows.
pub trait TreeView {
    fn insert_row(
        &mut self,
        parent: Option<RowHandle>,
        display_name: &str,
        type_label: &str,
    ) -> RowHandle;

    fn update_row(&mut self, row: RowHandle, display_text: &str);

    fn remove_row(&mut self, row: RowHandle);

    /// Replace the details pane. `None` clears it.
    fn show_details(&mut self, text: Option<&str>);
}

/// Routes model mutations to a `TreeView` and tracks the selection.
pub struct PresentationBridge<V> {
    view: V,
    rows: HashMap<NodeId, RowHandle>,
    selected: Option<NodeId>,
}

impl<V: TreeView> PresentationBridge<V> {
    pub fn new(view: V) -> Self {
        Self {
            view,
            rows: HashMap::new(),
            selected: None,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn row(&self, id: &NodeId) -> Option<RowHandle> {
        self.rows.get(id).copied()
    }

    pub fn query_selected_id(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    /// Apply a selection change from the view. Unknown nodes are ignored.
    pub fn select(&mut self, id: Option<NodeId>) -> bool {
        let id = id.map(|id| self.resolve_slashed_system(id));
        match id {
            Some(id) if !self.rows.contains_key(&id) => {
                warn!(node = %id, "selection of unknown node ignored");
                false
            }
            id => {
                self.selected = id;
                true
            }
        }
    }

    /// `a/b` parses as printer `b` of system `a`; fall back to a system
    /// literally named `a/b` when no such printer is shown.
    fn resolve_slashed_system(&self, id: NodeId) -> NodeId {
        if let NodeId::Printer { system, printer } = &id
            && !self.rows.contains_key(&id)
        {
            let whole = NodeId::System(SystemId::new(format!("{system}/{printer}")));
            if self.rows.contains_key(&whole) {
                return whole;
            }
        }
        id
    }

    /// Re-render the details pane for the current selection.
    pub fn refresh_details(&mut self, model: &ObjectModel) {
        let text = self
            .selected
            .as_ref()
            .and_then(|id| render_details(model, id));
        self.view.show_details(text.as_deref());
    }
}

impl<V: TreeView> TreeSink for PresentationBridge<V> {
    fn node_added(
        &mut self,
        parent: Option<NodeId>,
        id: NodeId,
        display_name: String,
        type_label: &'static str,
    ) {
        let parent_row = match &parent {
            Some(parent) => match self.rows.get(parent) {
                Some(row) => Some(*row),
                None => {
                    warn!(node = %id, parent = %parent, "parent row missing, adding at top level");
                    None
                }
            },
            None => None,
        };
        let row = self.view.insert_row(parent_row, &display_name, type_label);
        self.rows.insert(id, row);
    }

    fn node_updated(&mut self, id: NodeId, display_text: String) {
        match self.rows.get(&id) {
            Some(row) => self.view.update_row(*row, &display_text),
            None => debug!(node = %id, "update for node without a row"),
        }
    }

    fn node_removed(&mut self, id: NodeId) {
        if let Some(row) = self.rows.remove(&id) {
            self.view.remove_row(row);
        }
        if self.selected.as_ref() == Some(&id) {
            self.selected = None;
            self.view.show_details(None);
        }
    }
}

/// Text for the details pane of a node, or `None` if the node is gone.
pub fn render_details(model: &ObjectModel, id: &NodeId) -> Option<String> {
    let system = model.lookup_system(id.system())?;
    match id {
        NodeId::System(_) => Some(render_system(system)),
        NodeId::Printer { printer, .. } => system.child(printer).map(render_printer),
    }
}

fn render_system(system: &SystemObject) -> String {
    let mut text = String::new();

    if let Some(attributes) = system.attributes() {
        let _ = writeln!(text, "{}: {}", ObjectKind::System.label(), system.id());
        if let Some(uri) = system.endpoint() {
            let _ = writeln!(text, "Endpoint: {uri}");
        }
        text.push_str(attributes);
        return text;
    }

    if system.fetch_in_flight() {
        text.push_str("FETCHING ATTRIBUTES\n\n");
    } else {
        text.push_str("ATTRIBUTES UNAVAILABLE\n\n");
    }
    let _ = writeln!(text, "{}: {}", ObjectKind::System.label(), system.id());
    match system.endpoint() {
        Some(uri) => {
            let _ = writeln!(text, "Endpoint: {uri}");
        }
        None => text.push_str("Endpoint: none usable yet\n"),
    }
    if let Some(reason) = system.attribute_error() {
        let _ = writeln!(text, "Reason: {reason}");
    }
    let _ = writeln!(
        text,
        "First seen: {}",
        system.first_seen().format("%Y-%m-%d %H:%M:%S UTC")
    );
    text.push_str("Sources:\n");
    for source in system.sources().iter() {
        let _ = writeln!(
            text,
            "\tDomain name: {}\n\tHost: {}\n\tPort: {}\n\tFamily: {}\n",
            source.domain, source.host, source.port, source.family
        );
    }
    text
}

fn render_printer(printer: &PrinterObject) -> String {
    let mut text = String::new();
    if printer.attributes.is_none() {
        text.push_str("ATTRIBUTES UNAVAILABLE\n\n");
    }
    let _ = writeln!(text, "{}: {}", ObjectKind::Printer.label(), printer.name);
    let _ = writeln!(text, "URI: {}", printer.uri);
    match (&printer.attributes, &printer.attribute_error) {
        (Some(attributes), _) => text.push_str(attributes),
        (None, Some(reason)) => {
            let _ = writeln!(text, "Reason: {reason}");
        }
        (None, None) => {}
    }
    text
}
