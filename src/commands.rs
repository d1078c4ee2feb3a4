//! Command Definitions
//!
//! The user-triggerable actions, their static menu properties and the
//! per-command mutable state (shortcut label, menu registration).

use serde::{Deserialize, Serialize};

/// Command IDs for keyboard shortcuts and context menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    DoQuotedSearch,
    PutQuotes,
}

impl CommandKind {
    pub const ALL: [CommandKind; 2] = [CommandKind::DoQuotedSearch, CommandKind::PutQuotes];

    /// Stable string id, used as the menu-item id and the shortcut name.
    pub fn id(&self) -> &'static str {
        match self {
            CommandKind::DoQuotedSearch => "do_quoted_search",
            CommandKind::PutQuotes => "put_quotes",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "do_quoted_search" => Some(CommandKind::DoQuotedSearch),
            "put_quotes" => Some(CommandKind::PutQuotes),
            _ => None,
        }
    }
}

/// One user-triggerable action.
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandKind,
    /// Base context-menu title.
    pub title: &'static str,
    /// Requires an editable selection to be visible.
    pub only_editable: bool,
    /// Title gains the auto-enter supplement in a searchable field.
    pub title_changes_in_searchable: bool,
    /// Current keyboard shortcut label; empty when unassigned.
    pub shortcut: String,
    /// Whether a menu entry currently exists for this command.
    pub menu_registered: bool,
}

/// The full command table, iterated as a whole on every menu evaluation.
#[derive(Debug)]
pub struct CommandSet {
    commands: Vec<Command>,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSet {
    pub fn new() -> Self {
        Self {
            commands: vec![
                Command {
                    kind: CommandKind::DoQuotedSearch,
                    title: "Do quoted search",
                    only_editable: false,
                    title_changes_in_searchable: false,
                    shortcut: String::new(),
                    menu_registered: false,
                },
                Command {
                    kind: CommandKind::PutQuotes,
                    title: "Put quotes around selection",
                    only_editable: true,
                    title_changes_in_searchable: true,
                    shortcut: String::new(),
                    menu_registered: false,
                },
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Command> {
        self.commands.iter_mut()
    }

    pub fn get(&self, kind: CommandKind) -> &Command {
        self.commands
            .iter()
            .find(|command| command.kind == kind)
            .expect("command table covers every kind")
    }

    pub fn get_mut(&mut self, kind: CommandKind) -> &mut Command {
        self.commands
            .iter_mut()
            .find(|command| command.kind == kind)
            .expect("command table covers every kind")
    }

    /// Refreshes shortcut labels from the platform's current assignments.
    pub fn set_shortcuts(&mut self, shortcuts: &[(CommandKind, String)]) {
        for (kind, label) in shortcuts {
            self.get_mut(*kind).shortcut = label.clone();
        }
    }
}
