//! Selection Tracker
//!
//! Page-side observer that turns local focus/selection signals into
//! normalized selection-change notifications over a channel, and applies
//! remote-triggered quote commands to the focused editable field.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::channel::{
    ChannelEvent, ChannelManager, Message, SelectionSnapshot, UpdateReason,
};
use crate::config::Settings;
use crate::core::{apply_quotes, filter_selection_text, QuoteSplice};
use crate::dispatch::{HowToOpen, KeyState};

/// Focus/selection signals observed in the page context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    FocusGained,
    FocusLost,
    SelectionChanged,
    EditableInitial,
    EditableFocus,
    EditableBlur,
    EditableSelect,
}

impl PageSignal {
    fn reason(&self) -> UpdateReason {
        match self {
            PageSignal::FocusGained => UpdateReason::WindowFocus,
            PageSignal::FocusLost => UpdateReason::WindowBlur,
            PageSignal::SelectionChanged => UpdateReason::SelectionChange,
            PageSignal::EditableInitial => UpdateReason::EditableInitial,
            PageSignal::EditableFocus => UpdateReason::EditableFocus,
            PageSignal::EditableBlur => UpdateReason::EditableBlur,
            PageSignal::EditableSelect => UpdateReason::EditableSelect,
        }
    }
}

/// State of the focused editable field whose selection matches the page
/// selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableFieldState {
    pub text: String,
    /// Selection range, in character offsets.
    pub sel_start: usize,
    pub sel_end: usize,
    /// The field belongs to a recognized search-engine form.
    pub searchable: bool,
}

/// Capability interface onto the hosting page.
pub trait PageContext: Send {
    fn has_focus(&self) -> bool;
    fn selection_text(&self) -> Option<String>;
    /// The focused editable field, when its selection is the page selection.
    fn editable_field(&self) -> Option<EditableFieldState>;
    fn replace_editable_field(&mut self, splice: &QuoteSplice);
    /// Submits the form surrounding the editable field.
    fn submit_editable_form(&mut self);
    fn write_clipboard(&mut self, text: &str);
}

struct SearchEngine {
    hostname_pattern: &'static str,
    input_name: &'static str,
    form_action_pattern: &'static str,
}

// Search-engine inputs whose contents feed an exact-match search directly.
const SEARCH_ENGINES: [SearchEngine; 6] = [
    SearchEngine {
        hostname_pattern: r"(?i)^www\.google\.[a-z]+(\.[a-z]+)?$",
        input_name: "q",
        form_action_pattern: r"^/search$",
    },
    SearchEngine {
        hostname_pattern: r"(?i)^scholar\.google\.[a-z]+(\.[a-z]+)?$",
        input_name: "q",
        form_action_pattern: r"^/scholar$",
    },
    SearchEngine {
        hostname_pattern: r"(?i)^www\.bing\.com$",
        input_name: "q",
        form_action_pattern: r"^/search$",
    },
    SearchEngine {
        hostname_pattern: r"(?i)^(www|[a-z]+|([a-z]+\.)?search)\.yahoo\.com$",
        input_name: "p",
        form_action_pattern: r"^(https://[^/]+)?/search(;.+)?$",
    },
    SearchEngine {
        hostname_pattern: r"(?i)^(www|search)\.yahoo\.co\.jp$",
        input_name: "p",
        form_action_pattern: r"^(https://[^/]+)?/search$",
    },
    SearchEngine {
        hostname_pattern: r"(?i)^duckduckgo\.com$",
        input_name: "q",
        form_action_pattern: r"^/$",
    },
];

lazy_static! {
    static ref SEARCH_ENGINE_PATTERNS: Vec<(Regex, &'static str, Regex)> = SEARCH_ENGINES
        .iter()
        .map(|engine| {
            (
                Regex::new(engine.hostname_pattern).expect("static pattern"),
                engine.input_name,
                Regex::new(engine.form_action_pattern).expect("static pattern"),
            )
        })
        .collect();
}

/// Whether an input field is a recognized search-engine input.
pub fn is_searchable_input(hostname: &str, input_name: &str, form_action: &str) -> bool {
    SEARCH_ENGINE_PATTERNS
        .iter()
        .any(|(hostname_pattern, name, action_pattern)| {
            hostname_pattern.is_match(hostname)
                && *name == input_name
                && action_pattern.is_match(form_action)
        })
}

/// Tracks the page's selection and keeps the coordinator informed.
pub struct SelectionTracker<P: PageContext> {
    channel: ChannelManager,
    page: P,
    settings: Settings,
    surface_id: Option<u32>,
    frame_id: Option<u32>,
    /// Latched when the coordinator closed the channel; the page must be
    /// reloaded before it can connect again.
    remote_gone: bool,
}

impl<P: PageContext> SelectionTracker<P> {
    pub fn new(channel: ChannelManager, page: P, settings: Settings) -> Self {
        Self {
            channel,
            page,
            settings,
            surface_id: None,
            frame_id: None,
            remote_gone: false,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn identity_assigned(&self) -> bool {
        self.surface_id.is_some() && self.frame_id.is_some()
    }

    /// Establishes the initial connection and announces presence.
    pub fn start(&mut self) {
        self.connect_to_coordinator();
    }

    /// Feeds a local page signal into the tracker.
    pub fn handle_signal(&mut self, signal: PageSignal) {
        if signal == PageSignal::FocusGained {
            // Reconnect to refresh the channel; the coordinator may have
            // restarted while this page was in the background.
            self.connect_to_coordinator();
        }
        self.notify_selection_updated(signal.reason());
    }

    /// Feeds one channel event in; processes any inbound message.
    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        let was_connected = self.channel.is_connected();
        let Some(message) = self.channel.handle_event(event) else {
            if was_connected && !self.channel.is_connected() {
                self.remote_gone = true;
            }
            return;
        };
        self.handle_message(message);
    }

    /// A literal quote keystroke in an editable field; returns whether the
    /// keystroke was consumed by auto-surround.
    pub fn on_quote_key(&mut self) -> bool {
        if !self.settings.auto_surround {
            return false;
        }
        self.put_quotes()
    }

    /// Triggers a quoted search for the page's current selection.
    pub fn request_quoted_search(&mut self, key_state: KeyState) {
        if !self.channel.is_connected() {
            return;
        }
        let selection_text = filter_selection_text(self.page.selection_text().as_deref());
        self.channel.post_message(Message::DoQuotedSearch {
            selection_text,
            key_state: Some(key_state),
        });
    }

    /// Asks the coordinator to open the options page.
    pub fn request_open_options(&mut self, key_state: KeyState) {
        if !self.channel.is_connected() {
            return;
        }
        self.channel.post_message(Message::OpenOptionsPage {
            key_state: Some(key_state),
            default_how_to_open: Some(HowToOpen::NEW_TAB_ACTIVE),
        });
    }

    fn connect_to_coordinator(&mut self) {
        if self.remote_gone {
            return;
        }

        self.channel.reconnect();
        if self.channel.is_connected() {
            self.channel.post_message(Message::Hello);
        }
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Welcome { identity } => {
                self.surface_id = Some(identity.surface_id);
                self.frame_id = Some(identity.frame_id);
                debug!(?identity, "Update content identity");
                self.notify_selection_updated(UpdateReason::IdentityAssigned);
            }
            Message::PutQuotes => {
                self.put_quotes();
            }
            other => {
                info!(?other, "Ignore message not addressed to a page context");
            }
        }
    }

    /// Pushes the current selection state, unless this context has no
    /// identity yet or reports a non-blur change while unfocused.
    fn notify_selection_updated(&mut self, reason: UpdateReason) {
        if !self.identity_assigned() {
            return;
        }

        let blur = reason.is_blur();
        if !blur && !self.page.has_focus() {
            return;
        }

        let field = self.page.editable_field();
        let selection = SelectionSnapshot {
            text: filter_selection_text(self.page.selection_text().as_deref()),
            editable: field.is_some(),
            searchable: field.map_or(false, |field| field.searchable),
            blur,
        };
        self.channel.post_message(Message::NotifySelectionUpdated { reason, selection });
    }

    fn put_quotes(&mut self) -> bool {
        let Some(field) = self.page.editable_field() else {
            debug!("Ignore put-quotes command due to no editable node selected");
            return false;
        };

        let Some(splice) = apply_quotes(&field.text, field.sel_start, field.sel_end) else {
            debug!("Ignore put-quotes command due to unexpected selection text");
            return false;
        };

        self.page.replace_editable_field(&splice);

        if self.settings.auto_enter && field.searchable {
            if self.settings.auto_copy {
                self.page.write_clipboard(&splice.normalized);
            }
            self.page.submit_editable_form();
        }
        true
    }
}
