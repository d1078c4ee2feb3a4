//! Shared test doubles for the platform capability boundary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use quoted_search::commands::CommandKind;
use quoted_search::config::{SettingsService, SettingsStore};
use quoted_search::core::QuoteSplice;
use quoted_search::error::QsResult;
use quoted_search::platform::{
    Clipboard, CreateTabParams, CreateWindowParams, MenuHost, SearchQuery, ShortcutProvider,
    Surface, SurfaceHost, WindowState,
};
use quoted_search::tracker::{EditableFieldState, PageContext};

/// Surface host recording every operation in call order.
#[derive(Default)]
pub struct FakeSurfaceHost {
    pub ops: Mutex<Vec<String>>,
    pub surfaces: Mutex<HashMap<u32, Surface>>,
    pub active: Mutex<Option<Surface>>,
    next_id: AtomicU32,
}

impl FakeSurfaceHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU32::new(100),
            ..Self::default()
        })
    }

    pub fn add_surface(&self, surface: Surface) {
        self.surfaces.lock().unwrap().insert(surface.id, surface);
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }
}

#[async_trait]
impl SurfaceHost for FakeSurfaceHost {
    async fn active_surface(&self) -> QsResult<Option<Surface>> {
        Ok(*self.active.lock().unwrap())
    }

    async fn surface(&self, id: u32) -> QsResult<Option<Surface>> {
        Ok(self.surfaces.lock().unwrap().get(&id).copied())
    }

    async fn create_tab(&self, params: CreateTabParams) -> QsResult<Surface> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let surface = Surface {
            id,
            window_id: params.window_id,
            index: params.index,
            state: WindowState::Normal,
        };
        self.surfaces.lock().unwrap().insert(id, surface);
        self.ops.lock().unwrap().push(format!(
            "create_tab id={id} index={} opener={} active={} url={}",
            params.index,
            params.opener_id,
            params.active,
            params.url.as_deref().unwrap_or("-")
        ));
        Ok(surface)
    }

    async fn create_window(&self, params: CreateWindowParams) -> QsResult<Surface> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let surface = Surface {
            id,
            window_id: id,
            index: 0,
            state: params.state,
        };
        self.ops.lock().unwrap().push(format!(
            "create_window id={id} state={:?} url={}",
            params.state,
            params.url.as_deref().unwrap_or("-")
        ));
        Ok(surface)
    }

    async fn activate_tab(&self, tab_id: u32) -> QsResult<()> {
        self.ops.lock().unwrap().push(format!("activate id={tab_id}"));
        Ok(())
    }

    async fn navigate(&self, tab_id: u32, url: &str) -> QsResult<()> {
        self.ops.lock().unwrap().push(format!("navigate id={tab_id} url={url}"));
        Ok(())
    }

    async fn search(&self, query: SearchQuery) -> QsResult<()> {
        self.ops.lock().unwrap().push(format!(
            "search text={} tab={} disposition={}",
            query.text,
            query.tab_id.map_or("-".to_string(), |id| id.to_string()),
            query
                .disposition
                .map_or("-".to_string(), |d| format!("{d:?}")),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeClipboard {
    pub writes: Mutex<Vec<String>>,
}

#[async_trait]
impl Clipboard for FakeClipboard {
    async fn write_text(&self, _tab_id: u32, text: &str) -> QsResult<()> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Menu host tracking currently registered items by id.
#[derive(Default)]
pub struct FakeMenuHost {
    pub items: Mutex<HashMap<String, String>>,
}

impl MenuHost for FakeMenuHost {
    fn create_item(&self, id: &str, title: &str) -> QsResult<()> {
        self.items.lock().unwrap().insert(id.to_string(), title.to_string());
        Ok(())
    }

    fn update_item(&self, id: &str, title: &str) -> QsResult<()> {
        self.items.lock().unwrap().insert(id.to_string(), title.to_string());
        Ok(())
    }

    fn remove_item(&self, id: &str) -> QsResult<()> {
        self.items.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeShortcutProvider {
    pub assignments: Mutex<Vec<(CommandKind, String)>>,
}

#[async_trait]
impl ShortcutProvider for FakeShortcutProvider {
    async fn shortcuts(&self) -> QsResult<Vec<(CommandKind, String)>> {
        Ok(self.assignments.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    pub values: Mutex<Option<Value>>,
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self) -> QsResult<Option<Value>> {
        Ok(self.values.lock().unwrap().clone())
    }

    fn set(&self, values: &Value) -> QsResult<()> {
        *self.values.lock().unwrap() = Some(values.clone());
        Ok(())
    }
}

pub fn settings_service() -> SettingsService {
    SettingsService::init(Arc::new(MemorySettingsStore::default())).expect("in-memory settings")
}

/// Minimal page double for tracker-driven flows.
#[derive(Default)]
pub struct FakePage {
    pub focused: bool,
    pub selection: Option<String>,
    pub field: Option<EditableFieldState>,
    pub replaced: Option<QuoteSplice>,
    pub submitted: bool,
    pub clipboard: Option<String>,
}

impl PageContext for FakePage {
    fn has_focus(&self) -> bool {
        self.focused
    }

    fn selection_text(&self) -> Option<String> {
        self.selection.clone()
    }

    fn editable_field(&self) -> Option<EditableFieldState> {
        self.field.clone()
    }

    fn replace_editable_field(&mut self, splice: &QuoteSplice) {
        self.replaced = Some(splice.clone());
        if let Some(field) = &mut self.field {
            field.text = splice.text.clone();
            field.sel_start = splice.sel_start;
            field.sel_end = splice.sel_end;
        }
    }

    fn submit_editable_form(&mut self) {
        self.submitted = true;
    }

    fn write_clipboard(&mut self, text: &str) {
        self.clipboard = Some(text.to_string());
    }
}
