//! Command Dispatch
//!
//! Decides where a triggered action's result should open, based on modifier
//! keys and configuration, and executes searches and link openings through
//! the platform capability traits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Settings;
use crate::core::{is_normalized_text_valid, normalize_selection_text, quote_text};
use crate::error::QsResult;
use crate::platform::{
    Clipboard, CreateTabParams, CreateWindowParams, SearchQuery, Surface, SurfaceHost,
};

/// The browser settings page for search engines.
pub const SEARCH_ENGINE_SETTINGS_URL: &str = "chrome://settings/search";

/// The browser settings page for keyboard shortcuts.
pub const SHORTCUTS_SETTINGS_URL: &str = "chrome://extensions/shortcuts";

/// Which physical key acts as the primary modifier, resolved once at
/// startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryModifier {
    Ctrl,
    Meta,
}

impl PrimaryModifier {
    /// Meta is the convention on macOS, Ctrl everywhere else.
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            PrimaryModifier::Meta
        } else {
            PrimaryModifier::Ctrl
        }
    }
}

/// Captured state of the modifier keys at trigger time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    pub primary: bool,
    pub shift: bool,
}

impl KeyState {
    pub const CURRENT_TAB: KeyState = KeyState { primary: false, shift: false };
    pub const NEW_TAB_ACTIVE: KeyState = KeyState { primary: true, shift: true };
    pub const NEW_TAB_INACTIVE: KeyState = KeyState { primary: true, shift: false };
    pub const NEW_WINDOW: KeyState = KeyState { primary: false, shift: true };

    /// Builds a key state from raw modifier flags, taking the platform's
    /// primary-modifier convention into account.
    pub fn from_modifiers(ctrl: bool, shift: bool, meta: bool, primary: PrimaryModifier) -> Self {
        Self {
            primary: match primary {
                PrimaryModifier::Ctrl => ctrl,
                PrimaryModifier::Meta => meta,
            },
            shift,
        }
    }
}

/// Location where a triggered action's result should appear.
///
/// The serialized names match the platform search API so values can be
/// passed through as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    CurrentTab,
    NewTab,
    NewWindow,
}

/// Full disposition of a triggered action: where it opens and, for a new
/// tab, whether it ends up focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HowToOpen {
    pub disposition: Disposition,
    /// Meaningful only when `disposition` is `NewTab`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl HowToOpen {
    pub const CURRENT_TAB: HowToOpen = HowToOpen {
        disposition: Disposition::CurrentTab,
        active: None,
    };
    pub const NEW_TAB_ACTIVE: HowToOpen = HowToOpen {
        disposition: Disposition::NewTab,
        active: Some(true),
    };
    pub const NEW_TAB_INACTIVE: HowToOpen = HowToOpen {
        disposition: Disposition::NewTab,
        active: Some(false),
    };
    pub const NEW_WINDOW: HowToOpen = HowToOpen {
        disposition: Disposition::NewWindow,
        active: None,
    };

    pub fn new(disposition: Disposition, active: bool) -> Self {
        Self {
            disposition,
            active: Some(active),
        }
    }

    /// Resolves the disposition from the modifier-key state.
    ///
    /// Primary+Shift opens an active new tab, Primary alone a background new
    /// tab, Shift alone a new window; with no modifiers the supplied default
    /// applies (current tab when there is none).
    pub fn decide(key_state: Option<KeyState>, default: Option<HowToOpen>) -> HowToOpen {
        match key_state {
            Some(KeyState::NEW_TAB_ACTIVE) => HowToOpen::NEW_TAB_ACTIVE,
            Some(KeyState::NEW_TAB_INACTIVE) => HowToOpen::NEW_TAB_INACTIVE,
            Some(KeyState::NEW_WINDOW) => HowToOpen::NEW_WINDOW,
            _ => default.unwrap_or(HowToOpen::CURRENT_TAB),
        }
    }
}

/// Executes quoted searches and link openings against the platform.
pub struct CommandDispatcher {
    surfaces: Arc<dyn SurfaceHost>,
    clipboard: Arc<dyn Clipboard>,
    options_page_url: String,
}

impl CommandDispatcher {
    pub fn new(
        surfaces: Arc<dyn SurfaceHost>,
        clipboard: Arc<dyn Clipboard>,
        options_page_url: impl Into<String>,
    ) -> Self {
        Self {
            surfaces,
            clipboard,
            options_page_url: options_page_url.into(),
        }
    }

    /// Performs a quoted search for the given selection text.
    ///
    /// Invalid selection text makes this a silent no-op. For a new tab the
    /// search runs against the freshly created background tab and the tab is
    /// activated only after the search call returns, so the address bar
    /// never steals focus from the result.
    pub async fn do_quoted_search(
        &self,
        surface: &Surface,
        selection_text: &str,
        key_state: Option<KeyState>,
        settings: &Settings,
    ) -> QsResult<()> {
        let normalized = normalize_selection_text(selection_text);
        if !is_normalized_text_valid(&normalized) {
            debug!(selection_text, "Ignore quoted search due to unexpected selection text");
            return Ok(());
        }

        if settings.auto_copy {
            self.clipboard.write_text(surface.id, &normalized).await?;
        }

        let how = HowToOpen::decide(
            key_state,
            Some(HowToOpen::new(settings.disposition, true)),
        );
        let query_text = quote_text(&normalized);

        if how.disposition == Disposition::NewTab {
            let new_tab = self
                .surfaces
                .create_tab(CreateTabParams {
                    window_id: surface.window_id,
                    opener_id: surface.id,
                    index: surface.index + 1,
                    url: None,
                    active: false,
                })
                .await?;
            self.surfaces
                .search(SearchQuery {
                    text: query_text,
                    tab_id: Some(new_tab.id),
                    disposition: None,
                })
                .await?;
            if how.active.unwrap_or(true) {
                self.surfaces.activate_tab(new_tab.id).await?;
            }
        } else {
            self.surfaces
                .search(SearchQuery {
                    text: query_text,
                    tab_id: None,
                    disposition: Some(how.disposition),
                })
                .await?;
        }
        Ok(())
    }

    /// Opens a URL according to the resolved disposition.
    pub async fn open_link(
        &self,
        surface: &Surface,
        url: &str,
        key_state: Option<KeyState>,
        default: Option<HowToOpen>,
    ) -> QsResult<()> {
        let how = HowToOpen::decide(key_state, default);
        match how.disposition {
            Disposition::CurrentTab => {
                self.surfaces.navigate(surface.id, url).await?;
            }
            Disposition::NewWindow => {
                // The new window inherits the triggering window's visual
                // state.
                self.surfaces
                    .create_window(CreateWindowParams {
                        state: surface.state,
                        url: Some(url.to_string()),
                    })
                    .await?;
            }
            Disposition::NewTab => {
                self.surfaces
                    .create_tab(CreateTabParams {
                        window_id: surface.window_id,
                        opener_id: surface.id,
                        index: surface.index + 1,
                        url: Some(url.to_string()),
                        active: how.active.unwrap_or(true),
                    })
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn open_options_page(
        &self,
        surface: &Surface,
        key_state: Option<KeyState>,
        default: Option<HowToOpen>,
    ) -> QsResult<()> {
        let url = self.options_page_url.clone();
        self.open_link(surface, &url, key_state, default).await
    }

    /// Opens the browser's search-engine settings page.
    pub async fn open_search_engine_settings(
        &self,
        surface: &Surface,
        key_state: Option<KeyState>,
        default: Option<HowToOpen>,
    ) -> QsResult<()> {
        self.open_link(surface, SEARCH_ENGINE_SETTINGS_URL, key_state, default)
            .await
    }

    /// Opens the browser's keyboard-shortcut settings page.
    pub async fn open_shortcuts_settings(
        &self,
        surface: &Surface,
        key_state: Option<KeyState>,
        default: Option<HowToOpen>,
    ) -> QsResult<()> {
        self.open_link(surface, SHORTCUTS_SETTINGS_URL, key_state, default)
            .await
    }
}
