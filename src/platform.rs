//! Platform Capability Interfaces
//!
//! The browser-platform boundary, expressed as small capability traits that
//! production code depends on and test doubles implement directly. Nothing
//! in the core registers with the platform itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::commands::CommandKind;
use crate::dispatch::Disposition;
use crate::error::QsResult;

/// Visual state of a window, mirrored onto new windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    Normal,
    Minimized,
    Maximized,
    Fullscreen,
}

/// An addressable UI container (tab) that can host content or receive
/// focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub id: u32,
    pub window_id: u32,
    /// Position within the window's tab strip.
    pub index: u32,
    /// Visual state of the hosting window.
    pub state: WindowState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTabParams {
    pub window_id: u32,
    /// The tab that caused this one to open.
    pub opener_id: u32,
    pub index: u32,
    pub url: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWindowParams {
    pub state: WindowState,
    pub url: Option<String>,
}

/// One search invocation; either targeted at a specific tab or resolved by
/// disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub tab_id: Option<u32>,
    pub disposition: Option<Disposition>,
}

/// Tab and window operations supplied by the platform.
#[async_trait]
pub trait SurfaceHost: Send + Sync {
    /// The focused surface of the current window, if any.
    async fn active_surface(&self) -> QsResult<Option<Surface>>;

    /// Looks up a surface by id.
    async fn surface(&self, id: u32) -> QsResult<Option<Surface>>;

    async fn create_tab(&self, params: CreateTabParams) -> QsResult<Surface>;

    async fn create_window(&self, params: CreateWindowParams) -> QsResult<Surface>;

    /// Switches focus to the given tab.
    async fn activate_tab(&self, tab_id: u32) -> QsResult<()>;

    /// Points the given tab at a new URL.
    async fn navigate(&self, tab_id: u32, url: &str) -> QsResult<()>;

    /// Runs the user's default search engine.
    async fn search(&self, query: SearchQuery) -> QsResult<()>;
}

/// Clipboard access, executed in the context of a tab.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, tab_id: u32, text: &str) -> QsResult<()>;
}

/// Context-menu registration supplied by the platform.
pub trait MenuHost: Send + Sync {
    fn create_item(&self, id: &str, title: &str) -> QsResult<()>;
    fn update_item(&self, id: &str, title: &str) -> QsResult<()>;
    fn remove_item(&self, id: &str) -> QsResult<()>;
}

/// Current keyboard-shortcut assignments, queried whenever a channel first
/// connects so reconfigured shortcuts are picked up.
#[async_trait]
pub trait ShortcutProvider: Send + Sync {
    async fn shortcuts(&self) -> QsResult<Vec<(CommandKind, String)>>;
}
