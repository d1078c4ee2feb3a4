//! Settings
//!
//! User-customizable settings shared by every context through an external
//! store. Writes are validated per field before anything is mutated, and an
//! `updated_at` timestamp rejects stale external changes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dispatch::Disposition;
use crate::error::{QsError, QsResult};

pub const ICON_SIZE_MIN: u8 = 1;
pub const ICON_SIZE_MAX: u8 = 5;

/// The settings values, with their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub popup_icon: bool,
    pub icon_size: u8,
    pub avoid_selection: bool,
    pub options_button: bool,
    pub context_menu: bool,
    pub disposition: Disposition,
    pub auto_copy: bool,
    pub auto_enter: bool,
    pub auto_surround: bool,
    /// Milliseconds since the epoch of the last save; used to reject stale
    /// external writes.
    #[serde(default)]
    pub updated_at: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            popup_icon: true,
            icon_size: 3,
            avoid_selection: false,
            options_button: true,
            context_menu: true,
            disposition: Disposition::NewTab,
            auto_copy: true,
            auto_enter: true,
            auto_surround: false,
            updated_at: 0,
        }
    }
}

/// One settable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    PopupIcon,
    IconSize,
    AvoidSelection,
    OptionsButton,
    ContextMenu,
    Disposition,
    AutoCopy,
    AutoEnter,
    AutoSurround,
}

/// Validates a prospective value for a field without mutating anything.
pub fn validate(field: SettingField, value: &Value) -> QsResult<()> {
    let valid = match field {
        SettingField::IconSize => value
            .as_u64()
            .is_some_and(|size| size >= ICON_SIZE_MIN as u64 && size <= ICON_SIZE_MAX as u64),
        SettingField::Disposition => {
            serde_json::from_value::<Disposition>(value.clone()).is_ok()
        }
        _ => value.is_boolean(),
    };
    if valid {
        Ok(())
    } else {
        Err(QsError::Settings(format!(
            "invalid value for {field:?}: {value}"
        )))
    }
}

/// Merges stored values onto the defaults, so missing fields never leave a
/// hole in the settings.
pub fn apply_defaults(stored: &Value) -> Settings {
    merge_onto(&Settings::default(), stored)
}

fn merge_onto(base: &Settings, stored: &Value) -> Settings {
    let mut merged = match serde_json::to_value(base) {
        Ok(value) => value,
        Err(_) => return base.clone(),
    };
    if let (Some(target), Some(source)) = (merged.as_object_mut(), stored.as_object()) {
        for (key, value) in source {
            if target.contains_key(key) && !value.is_null() {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    serde_json::from_value(merged).unwrap_or_else(|error| {
        warn!(%error, "⚠️ Stored settings invalid, using defaults");
        base.clone()
    })
}

/// External storage contract: get/set plus external-change notification
/// delivered by the embedder through
/// [`SettingsService::handle_external_change`].
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> QsResult<Option<Value>>;
    fn set(&self, values: &Value) -> QsResult<()>;
}

type ChangeListener = Box<dyn Fn(&Settings) + Send>;

/// Caches settings over a [`SettingsStore`] and arbitrates between local
/// writes and external changes.
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
    cache: Settings,
    listeners: Vec<ChangeListener>,
}

impl SettingsService {
    /// Loads current values from the store, merged onto defaults.
    pub fn init(store: Arc<dyn SettingsStore>) -> QsResult<Self> {
        let cache = match store.get()? {
            Some(stored) => apply_defaults(&stored),
            None => Settings::default(),
        };
        debug!(?cache, "Settings initialized");
        Ok(Self {
            store,
            cache,
            listeners: Vec::new(),
        })
    }

    pub fn values(&self) -> &Settings {
        &self.cache
    }

    /// Registers a listener fired on every applied external change.
    pub fn on_changed(&mut self, listener: impl Fn(&Settings) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Validates and applies one field, then persists.
    ///
    /// An invalid value fails before anything is mutated; callers are
    /// expected to catch the error and revert any dependent UI state.
    pub fn set(&mut self, field: SettingField, value: Value) -> QsResult<()> {
        validate(field, &value)?;

        let mut updated = self.cache.clone();
        apply_field(&mut updated, field, &value)?;
        if updated == self.cache {
            return Ok(());
        }
        self.cache = updated;
        self.save()
    }

    /// Resets every value to its default and persists.
    pub fn reset(&mut self) -> QsResult<()> {
        self.cache = Settings::default();
        self.save()
    }

    fn save(&mut self) -> QsResult<()> {
        self.cache.updated_at = chrono::Utc::now().timestamp_millis();
        let values = serde_json::to_value(&self.cache)?;
        debug!(?values, "Settings: update storage");
        self.store.set(&values)
    }

    /// Applies a change observed from the store.
    ///
    /// `None` means the store was cleared: the cache resets to defaults. A
    /// stored value is applied only when its `updated_at` exceeds the cached
    /// one; otherwise the local cache is already up to date and the change
    /// is ignored.
    pub fn handle_external_change(&mut self, new_value: Option<&Value>) {
        match new_value {
            Some(stored) => {
                let incoming_updated_at = stored
                    .get("updated_at")
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                if incoming_updated_at <= self.cache.updated_at {
                    info!("Settings cache not overwritten because it is up to date");
                    return;
                }
                self.cache = merge_onto(&self.cache, stored);
                debug!(cache = ?self.cache, "Settings cache overwritten by external change");
            }
            None => {
                self.cache = Settings::default();
                debug!("Settings cache reset to defaults because the store was cleared");
            }
        }

        for listener in &self.listeners {
            listener(&self.cache);
        }
    }
}

fn apply_field(settings: &mut Settings, field: SettingField, value: &Value) -> QsResult<()> {
    let type_error = || QsError::Settings(format!("invalid value for {field:?}: {value}"));
    match field {
        SettingField::PopupIcon => settings.popup_icon = value.as_bool().ok_or_else(type_error)?,
        SettingField::IconSize => {
            settings.icon_size = value.as_u64().ok_or_else(type_error)? as u8
        }
        SettingField::AvoidSelection => {
            settings.avoid_selection = value.as_bool().ok_or_else(type_error)?
        }
        SettingField::OptionsButton => {
            settings.options_button = value.as_bool().ok_or_else(type_error)?
        }
        SettingField::ContextMenu => {
            settings.context_menu = value.as_bool().ok_or_else(type_error)?
        }
        SettingField::Disposition => {
            settings.disposition =
                serde_json::from_value(value.clone()).map_err(|_| type_error())?
        }
        SettingField::AutoCopy => settings.auto_copy = value.as_bool().ok_or_else(type_error)?,
        SettingField::AutoEnter => settings.auto_enter = value.as_bool().ok_or_else(type_error)?,
        SettingField::AutoSurround => {
            settings.auto_surround = value.as_bool().ok_or_else(type_error)?
        }
    }
    Ok(())
}

/// JSON-file-backed store for deployments without a platform sync store.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quoted-search")
            .join("settings.json")
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self) -> QsResult<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(values) => Ok(Some(values)),
            Err(error) => {
                // Graceful degradation: keep the corrupt file for debugging
                // and fall back to defaults.
                warn!(%error, "⚠️ Settings file corrupted or invalid, using defaults");
                let backup_path = self.path.with_extension("json.corrupt");
                let _ = std::fs::rename(&self.path, &backup_path);
                Ok(None)
            }
        }
    }

    fn set(&self, values: &Value) -> QsResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Convenience loader used by embedders without their own store wiring.
pub fn load_default() -> Result<SettingsService> {
    let store = Arc::new(FileSettingsStore::new(FileSettingsStore::default_path()));
    Ok(SettingsService::init(store)?)
}
