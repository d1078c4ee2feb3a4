//! Context Menu Controller
//!
//! Derives desired menu-item visibility and titles from the current
//! selection and settings, and reconciles the platform's menu registrations
//! against them.

use std::sync::Arc;

use tracing::debug;

use crate::commands::CommandSet;
use crate::config::Settings;
use crate::core::{is_normalized_text_valid, normalize_selection_text};
use crate::error::QsResult;
use crate::platform::MenuHost;
use crate::registry::CurrentSelection;

/// Appended to the put-quotes title when submitting the surrounding search
/// form is part of the action.
const AUTO_ENTER_TITLE_SUPPLEMENT: &str = " and search";

pub struct MenuController {
    host: Arc<dyn MenuHost>,
}

impl MenuController {
    pub fn new(host: Arc<dyn MenuHost>) -> Self {
        Self { host }
    }

    /// Reconciles every command's menu entry with the current state.
    ///
    /// Called on every selection update and every settings change; an entry
    /// that stays visible gets its title updated even when unchanged
    /// (idempotent).
    pub fn sync(
        &self,
        commands: &mut CommandSet,
        selection: &CurrentSelection,
        settings: &Settings,
    ) -> QsResult<()> {
        let text_valid = is_normalized_text_valid(&normalize_selection_text(&selection.text));

        for command in commands.iter_mut() {
            let visible = settings.context_menu
                && !selection.blur
                && text_valid
                && (!command.only_editable || selection.editable);
            debug!(id = command.kind.id(), visible, "Update context menu visibility");

            if visible {
                let mut title = command.title.to_string();
                if settings.auto_enter && selection.searchable && command.title_changes_in_searchable
                {
                    title.push_str(AUTO_ENTER_TITLE_SUPPLEMENT);
                }
                if !command.shortcut.is_empty() {
                    title.push_str(&format!("   [{}]", command.shortcut));
                }

                if !command.menu_registered {
                    self.host.create_item(command.kind.id(), &title)?;
                    command.menu_registered = true;
                } else {
                    self.host.update_item(command.kind.id(), &title)?;
                }
            } else if command.menu_registered {
                self.host.remove_item(command.kind.id())?;
                command.menu_registered = false;
            }
        }
        Ok(())
    }
}
