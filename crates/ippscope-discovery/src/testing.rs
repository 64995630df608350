// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test doubles: a scripted gateway and an in-memory tree view.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use ippscope_core::error::{IppScopeError, Result};
use ippscope_core::types::{ChildDescriptor, ObjectKind};

use crate::fetch::AttributeGateway;
use crate::presentation::{RowHandle, TreeView};

/// Answers from a fixed script keyed by URI.
///
/// URIs with no script entry fail with "connection refused"; hanging URIs
/// never answer and panicking URIs panic.  Every call is recorded as
/// `"<op> <uri>"`.
#[derive(Default)]
pub struct ScriptedGateway {
    attributes: HashMap<String, String>,
    children: HashMap<String, Vec<ChildDescriptor>>,
    hanging: HashSet<String>,
    panicking: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attributes(mut self, uri: &str, text: &str) -> Self {
        self.attributes.insert(uri.into(), text.into());
        self
    }

    pub fn with_children(mut self, uri: &str, printers: &[(&str, &str)]) -> Self {
        let descriptors = printers
            .iter()
            .map(|(name, uri)| ChildDescriptor {
                name: (*name).into(),
                uri: (*uri).into(),
            })
            .collect();
        self.children.insert(uri.into(), descriptors);
        self
    }

    pub fn hanging(mut self, uri: &str) -> Self {
        self.hanging.insert(uri.into());
        self
    }

    pub fn panicking(mut self, uri: &str) -> Self {
        self.panicking.insert(uri.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(op)).count()
    }

    async fn record(&self, op: &str, uri: &str) {
        self.calls.lock().unwrap().push(format!("{op} {uri}"));
        if self.hanging.contains(uri) {
            std::future::pending::<()>().await;
        }
        if self.panicking.contains(uri) {
            panic!("gateway blew up on {uri}");
        }
    }
}

fn refused(uri: &str) -> IppScopeError {
    IppScopeError::IppRequest(format!("{uri}: connection refused"))
}

#[async_trait]
impl AttributeGateway for ScriptedGateway {
    async fn fetch_attributes(&self, kind: ObjectKind, uri: &str) -> Result<String> {
        let op = match kind {
            ObjectKind::System => "attributes",
            ObjectKind::Printer => "printer",
        };
        self.record(op, uri).await;
        self.attributes.get(uri).cloned().ok_or_else(|| refused(uri))
    }

    async fn enumerate_children(&self, uri: &str) -> Result<Vec<ChildDescriptor>> {
        self.record("children", uri).await;
        self.children.get(uri).cloned().ok_or_else(|| refused(uri))
    }
}

/// Tree view that keeps rows in memory and logs every call.
#[derive(Debug, Default)]
pub struct RecordingView {
    next: u64,
    pub rows: HashMap<RowHandle, (Option<RowHandle>, String)>,
    pub log: Vec<String>,
    pub details: Option<String>,
}

impl RecordingView {
    /// Display names of the rows currently shown, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rows.values().map(|(_, name)| name.clone()).collect();
        names.sort();
        names
    }
}

impl TreeView for RecordingView {
    fn insert_row(
        &mut self,
        parent: Option<RowHandle>,
        display_name: &str,
        type_label: &str,
    ) -> RowHandle {
        self.next += 1;
        let row = RowHandle(self.next);
        self.rows.insert(row, (parent, display_name.to_string()));
        self.log.push(format!("insert {display_name} ({type_label})"));
        row
    }

    fn update_row(&mut self, row: RowHandle, _display_text: &str) {
        let name = self.rows.get(&row).map(|(_, n)| n.clone()).unwrap_or_default();
        self.log.push(format!("update {name}"));
    }

    fn remove_row(&mut self, row: RowHandle) {
        if let Some((_, name)) = self.rows.remove(&row) {
            self.log.push(format!("remove {name}"));
        }
    }

    fn show_details(&mut self, text: Option<&str>) {
        self.details = text.map(String::from);
    }
}
