// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the ippscope system browser.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalise a DNS-SD name for comparison: ASCII case-insensitive, one
/// trailing dot ignored.
pub fn dns_key(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}

/// Identity of a system: the announced service instance name.
///
/// Equality and hashing use the normalised form; the announced spelling is
/// kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SystemId {
    display: String,
    key: String,
}

impl SystemId {
    pub fn new(name: impl Into<String>) -> Self {
        let display = name.into();
        let key = dns_key(&display);
        Self { display, key }
    }

    /// The name as it was announced.
    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl PartialEq for SystemId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for SystemId {}

impl Hash for SystemId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<String> for SystemId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SystemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<SystemId> for String {
    fn from(value: SystemId) -> Self {
        value.display
    }
}

/// Per-creation tag for a system object.
///
/// A system destroyed and re-announced under the same name gets a new
/// incarnation, so fetch results started for the old one can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Incarnation(pub Uuid);

impl Incarnation {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Incarnation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Incarnation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of object shown in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    System,
    Printer,
}

impl ObjectKind {
    /// Label shown in the "Object Type" column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "System Object",
            Self::Printer => "Printer Object",
        }
    }
}

/// Address family a source was discovered over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolFamily {
    Ipv4,
    Ipv6,
    Unspecified,
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ipv4 => "IPv4",
            Self::Ipv6 => "IPv6",
            Self::Unspecified => "UNSPEC",
        })
    }
}

/// One discovered network path to a system.
///
/// Two records are the same source iff family, domain, host, and port all
/// match; host and domain compare as DNS names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub family: ProtocolFamily,
    pub domain: String,
    pub host: String,
    pub port: u16,
}

impl SourceRecord {
    pub fn new(
        family: ProtocolFamily,
        domain: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            family,
            domain: domain.into(),
            host: host.into(),
            port,
        }
    }
}

impl PartialEq for SourceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.family == other.family
            && self.port == other.port
            && dns_key(&self.host) == dns_key(&other.host)
            && dns_key(&self.domain) == dns_key(&other.domain)
    }
}

impl Eq for SourceRecord {}

impl Hash for SourceRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family.hash(state);
        self.port.hash(state);
        dns_key(&self.host).hash(state);
        dns_key(&self.domain).hash(state);
    }
}

impl fmt::Display for SourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({}, {})", self.host, self.port, self.domain, self.family)
    }
}

/// A child entry returned by enumeration (Get-Printers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildDescriptor {
    pub name: String,
    pub uri: String,
}

/// Identity of a node in the presentation tree.
///
/// Printer names are only unique within their parent, so a printer node is
/// addressed through its system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeId {
    System(SystemId),
    Printer { system: SystemId, printer: String },
}

impl NodeId {
    pub fn system(&self) -> &SystemId {
        match self {
            Self::System(id) => id,
            Self::Printer { system, .. } => system,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System(id) => write!(f, "{id}"),
            Self::Printer { system, printer } => write!(f, "{system}/{printer}"),
        }
    }
}

impl FromStr for NodeId {
    type Err = String;

    /// Parse `system` or `system/printer`.
    ///
    /// The printer name is taken after the last `/`, since instance names may
    /// contain slashes but IPP printer names do not.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty node name".into());
        }
        match s.rsplit_once('/') {
            Some((system, printer)) if !system.is_empty() && !printer.is_empty() => {
                Ok(Self::Printer {
                    system: SystemId::new(system),
                    printer: printer.to_string(),
                })
            }
            Some(_) => Err(format!("malformed node name '{s}'")),
            None => Ok(Self::System(SystemId::new(s))),
        }
    }
}

/// One ordered mutation of the presentation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    NodeAdded {
        parent: Option<NodeId>,
        id: NodeId,
        display_name: String,
        type_label: &'static str,
    },
    NodeUpdated {
        id: NodeId,
        display_text: String,
    },
    NodeRemoved {
        id: NodeId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn system_id_compares_as_dns_name() {
        assert_eq!(SystemId::new("PrintLab"), SystemId::new("printlab."));
        assert_ne!(SystemId::new("PrintLab"), SystemId::new("PrintLab2"));
        // The announced spelling survives normalisation.
        assert_eq!(SystemId::new("PrintLab.").to_string(), "PrintLab.");
    }

    #[test]
    fn source_equality_uses_all_four_fields() {
        let a = SourceRecord::new(ProtocolFamily::Ipv4, "local", "host1", 631);
        let same = SourceRecord::new(ProtocolFamily::Ipv4, "Local.", "HOST1.", 631);
        let other_port = SourceRecord::new(ProtocolFamily::Ipv4, "local", "host1", 8631);
        let other_family = SourceRecord::new(ProtocolFamily::Ipv6, "local", "host1", 631);

        assert_eq!(a, same);
        assert_ne!(a, other_port);
        assert_ne!(a, other_family);

        let set: HashSet<_> = [a, same].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn node_id_parses_system_and_printer_forms() {
        assert_eq!(
            "PrintLab".parse::<NodeId>().unwrap(),
            NodeId::System(SystemId::new("PrintLab"))
        );
        assert_eq!(
            "PrintLab/office".parse::<NodeId>().unwrap(),
            NodeId::Printer {
                system: SystemId::new("PrintLab"),
                printer: "office".into()
            }
        );
        assert!("".parse::<NodeId>().is_err());
        assert!("PrintLab/".parse::<NodeId>().is_err());
    }

    #[test]
    fn node_id_printer_follows_last_slash() {
        assert_eq!(
            "Floor 2/East/office".parse::<NodeId>().unwrap(),
            NodeId::Printer {
                system: SystemId::new("Floor 2/East"),
                printer: "office".into()
            }
        );
    }

    #[test]
    fn kind_labels_match_tree_columns() {
        assert_eq!(ObjectKind::System.label(), "System Object");
        assert_eq!(ObjectKind::Printer.label(), "Printer Object");
    }
}
