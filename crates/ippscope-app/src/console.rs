// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Console tree view and the commands typed at it.
//
// Rows are kept in a shared table so the input task can print the whole tree
// on request while the lifecycle service keeps mutating it.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;

use ippscope_core::types::NodeId;
use ippscope_discovery::presentation::{RowHandle, TreeView};

#[derive(Debug, Clone)]
struct Row {
    parent: Option<RowHandle>,
    name: String,
    type_label: String,
    status: Option<String>,
}

/// Rows currently on screen, in insertion order.
#[derive(Debug, Default)]
pub struct RowTable {
    next: u64,
    rows: IndexMap<RowHandle, Row>,
}

pub type SharedRows = Arc<Mutex<RowTable>>;

impl RowTable {
    /// The tree as indented text, children under their parent.
    pub fn render(&self) -> String {
        let mut text = String::new();
        if self.rows.is_empty() {
            text.push_str("(no systems discovered yet)\n");
            return text;
        }
        for (handle, row) in &self.rows {
            if row.parent.is_none() {
                self.render_row(&mut text, *handle, row, 0);
            }
        }
        text
    }

    fn render_row(&self, text: &mut String, handle: RowHandle, row: &Row, depth: usize) {
        // Printers arrive with their attributes; only systems are updated later.
        let marker = if row.parent.is_some() || row.status.is_some() {
            ""
        } else {
            "  (attributes pending or unavailable)"
        };
        let _ = writeln!(
            text,
            "{:indent$}{}  [{}]{}",
            "",
            row.name,
            row.type_label,
            marker,
            indent = depth * 2
        );
        for (child, child_row) in &self.rows {
            if child_row.parent == Some(handle) {
                self.render_row(text, *child, child_row, depth + 1);
            }
        }
    }
}

fn lock(rows: &SharedRows) -> MutexGuard<'_, RowTable> {
    rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Render the shared table.
pub fn render_tree(rows: &SharedRows) -> String {
    lock(rows).render()
}

/// [`TreeView`] that logs every change as a line of text.
pub struct ConsoleView<W> {
    rows: SharedRows,
    out: W,
}

impl<W: Write> ConsoleView<W> {
    pub fn new(rows: SharedRows, out: W) -> Self {
        Self { rows, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn path(table: &RowTable, row: RowHandle) -> String {
        match table.rows.get(&row) {
            Some(Row {
                parent: Some(parent),
                name,
                ..
            }) => format!("{}/{name}", Self::path(table, *parent)),
            Some(row) => row.name.clone(),
            None => String::from("?"),
        }
    }
}

impl<W: Write> TreeView for ConsoleView<W> {
    fn insert_row(
        &mut self,
        parent: Option<RowHandle>,
        display_name: &str,
        type_label: &str,
    ) -> RowHandle {
        let mut table = lock(&self.rows);
        table.next += 1;
        let handle = RowHandle(table.next);
        table.rows.insert(
            handle,
            Row {
                parent,
                name: display_name.to_string(),
                type_label: type_label.to_string(),
                status: None,
            },
        );
        let path = Self::path(&table, handle);
        let _ = writeln!(self.out, "+ {path}  [{type_label}]");
        handle
    }

    fn update_row(&mut self, row: RowHandle, display_text: &str) {
        let mut table = lock(&self.rows);
        if let Some(entry) = table.rows.get_mut(&row) {
            entry.status = Some(display_text.to_string());
        }
        let path = Self::path(&table, row);
        let _ = writeln!(self.out, "* {path}  attributes received");
    }

    fn remove_row(&mut self, row: RowHandle) {
        let mut table = lock(&self.rows);
        let path = Self::path(&table, row);
        table.rows.shift_remove(&row);
        let _ = writeln!(self.out, "- {path}");
    }

    fn show_details(&mut self, text: Option<&str>) {
        let _ = match text {
            Some(text) => writeln!(self.out, "\n{text}"),
            None => writeln!(self.out, "(nothing selected)"),
        };
        let _ = self.out.flush();
    }
}

/// A line typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Select(NodeId),
    Clear,
    Tree,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  select <system>[/<printer>]  show details for a node
  clear                        clear the selection
  tree                         print the current tree
  help                         show this help
  quit                         stop browsing and exit";

/// Parse one input line. Blank lines are `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "select" | "s" => {
            if rest.is_empty() {
                return Err("usage: select <system>[/<printer>]".into());
            }
            ConsoleCommand::Select(rest.parse()?)
        }
        "clear" => ConsoleCommand::Clear,
        "tree" | "ls" => ConsoleCommand::Tree,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ippscope_core::types::SystemId;

    fn view() -> (ConsoleView<Vec<u8>>, SharedRows) {
        let rows = SharedRows::default();
        (ConsoleView::new(rows.clone(), Vec::new()), rows)
    }

    fn output(view: ConsoleView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn logs_mutations_with_paths() {
        let (mut view, rows) = view();
        let system = view.insert_row(None, "PrintLab", "System Object");
        let printer = view.insert_row(Some(system), "office", "Printer Object");
        view.update_row(system, "system-state = idle");
        view.remove_row(printer);
        view.remove_row(system);

        assert!(lock(&rows).rows.is_empty());
        assert_eq!(
            output(view),
            "+ PrintLab  [System Object]\n\
             + PrintLab/office  [Printer Object]\n\
             * PrintLab  attributes received\n\
             - PrintLab/office\n\
             - PrintLab\n"
        );
    }

    #[test]
    fn tree_nests_children_and_flags_unavailable() {
        let (mut view, rows) = view();
        let lab = view.insert_row(None, "PrintLab", "System Object");
        view.insert_row(None, "Annex", "System Object");
        view.insert_row(Some(lab), "office", "Printer Object");
        view.update_row(lab, "system-state = idle");

        assert_eq!(
            render_tree(&rows),
            "PrintLab  [System Object]\n\
             \x20 office  [Printer Object]\n\
             Annex  [System Object]  (attributes pending or unavailable)\n"
        );
    }

    #[test]
    fn empty_tree_says_so() {
        assert_eq!(render_tree(&SharedRows::default()), "(no systems discovered yet)\n");
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("  "), Ok(None));
        assert_eq!(parse_command("tree"), Ok(Some(ConsoleCommand::Tree)));
        assert_eq!(parse_command("QUIT"), Ok(Some(ConsoleCommand::Quit)));
        assert_eq!(
            parse_command("select PrintLab"),
            Ok(Some(ConsoleCommand::Select(NodeId::System(SystemId::new("PrintLab")))))
        );
        assert_eq!(
            parse_command("select Print Lab/office"),
            Ok(Some(ConsoleCommand::Select(NodeId::Printer {
                system: SystemId::new("Print Lab"),
                printer: "office".into(),
            })))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("select").is_err());
        assert!(parse_command("select /office").is_err());
        assert!(parse_command("frobnicate").is_err());
    }
}
