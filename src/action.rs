//! Action Panel
//!
//! Popup-side glue: pulls the current selection for its parent tab, keeps
//! the latest modifier-key state, and forwards searches and settings links
//! to the coordinator.

use tracing::{debug, info};

use crate::channel::{ChannelEvent, ChannelManager, Message};
use crate::core::{filter_selection_text, is_normalized_text_valid, normalize_selection_text};
use crate::dispatch::{HowToOpen, KeyState};

pub struct ActionPanel {
    channel: ChannelManager,
    parent_tab: u32,
    key_state: KeyState,
    search_text: Option<String>,
}

impl ActionPanel {
    /// `parent_tab` is the active tab the popup was opened over; searches
    /// and links are dispatched relative to it.
    pub fn new(channel: ChannelManager, parent_tab: u32) -> Self {
        Self {
            channel,
            parent_tab,
            key_state: KeyState::CURRENT_TAB,
            search_text: None,
        }
    }

    /// Connects and requests the parent tab's selection.
    pub fn open(&mut self) {
        self.channel.connect();
        if self.channel.is_connected() {
            self.channel.post_message(Message::GetSelection {
                tab: self.parent_tab,
            });
        }
    }

    /// The normalized selection pre-filled into the search box, if any.
    pub fn search_text(&self) -> Option<&str> {
        self.search_text.as_deref()
    }

    /// Records the modifier-key state from the latest keystroke or click.
    pub fn record_key_state(&mut self, key_state: KeyState) {
        self.key_state = key_state;
    }

    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        let Some(message) = self.channel.handle_event(event) else {
            return;
        };
        match message {
            Message::NotifySelection { selection } => {
                // Absent when the parent tab does not own the current
                // selection; the search box then stays empty.
                let Some(selection) = selection else {
                    debug!("No selection available for the parent tab");
                    return;
                };
                let normalized = normalize_selection_text(&selection.text);
                if is_normalized_text_valid(&normalized) {
                    self.search_text = Some(normalized);
                }
            }
            other => {
                info!(?other, "Ignore message not addressed to the action panel");
            }
        }
    }

    /// Submits a search for the given text with the recorded key state.
    pub fn submit_search(&mut self, text: &str) {
        self.channel.post_message(Message::DoQuotedSearch {
            selection_text: filter_selection_text(Some(text)),
            key_state: Some(self.key_state),
        });
    }

    /// Opens the options page; without modifiers it lands in a new active
    /// tab.
    pub fn open_options_page(&mut self) {
        self.channel.post_message(Message::OpenOptionsPage {
            key_state: Some(self.key_state),
            default_how_to_open: Some(HowToOpen::NEW_TAB_ACTIVE),
        });
    }
}
