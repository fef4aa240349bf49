// markstore Settings Engine
// Loads, saves and edits StoreSettings as pretty JSON on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::StoreSettings;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<StoreSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn settings(&self) -> &StoreSettings;
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn config_path(&self) -> &Path;
}

pub struct SettingsEngine {
    config_path: PathBuf,
    settings: StoreSettings,
}

/// Walks a dotted key path to the slot it names. Every segment must already
/// exist; new keys are never created.
fn slot_mut<'a>(root: &'a mut Value, key: &str) -> Result<&'a mut Value, SettingsError> {
    let mut current = root;
    for part in key.split('.') {
        if part.is_empty() {
            return Err(SettingsError::InvalidKey(format!("Empty segment in '{}'", key)));
        }
        current = match current {
            Value::Object(map) => map
                .get_mut(part)
                .ok_or_else(|| SettingsError::InvalidKey(format!("Unknown settings key '{}'", key)))?,
            _ => {
                return Err(SettingsError::InvalidKey(format!(
                    "'{}' descends into a non-object value",
                    key
                )))
            }
        };
    }
    Ok(current)
}

/// Rejects values that deserialize but cannot work.
fn check_ranges(settings: &StoreSettings) -> Result<(), SettingsError> {
    let positive = [
        ("limits.folder_name", settings.limits.folder_name),
        ("limits.bookmark_name", settings.limits.bookmark_name),
        ("limits.id", settings.limits.id),
        ("cache.max_search_cache_size", settings.cache.max_search_cache_size),
        ("cache.max_path_cache_size", settings.cache.max_path_cache_size),
        ("cache.max_bookmark_cache_size", settings.cache.max_bookmark_cache_size),
        ("search.max_results", settings.search.max_results),
        ("link_check.batch_size", settings.link_check.batch_size),
    ];
    for (name, value) in positive {
        if value == 0 {
            return Err(SettingsError::InvalidValue(format!("{} must be positive", name)));
        }
    }
    if settings.link_check.timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "link_check.timeout_ms must be positive".to_string(),
        ));
    }
    Ok(())
}

impl SettingsEngine {
    /// Uses `path_override` if given, else `settings.json` in the platform
    /// config directory.
    pub fn new(path_override: Option<PathBuf>) -> Self {
        Self {
            config_path: path_override.unwrap_or_else(platform::default_settings_path),
            settings: StoreSettings::default(),
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// A missing file yields defaults; a malformed one is an error.
    fn load(&mut self) -> Result<StoreSettings, SettingsError> {
        if !self.config_path.exists() {
            self.settings = StoreSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;
        let settings: StoreSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        check_ranges(&settings)?;

        tracing::debug!(path = %self.config_path.display(), "settings loaded");
        self.settings = settings;
        Ok(self.settings.clone())
    }

    fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        fs::write(&self.config_path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))
    }

    fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Sets one value by dotted key, e.g. `"search.debounce_ms"`, then saves.
    /// The edited tree must still deserialize into `StoreSettings`.
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut tree = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        *slot_mut(&mut tree, key)? = value;

        let updated: StoreSettings = serde_json::from_value(tree).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        check_ranges(&updated)?;

        self.settings = updated;
        self.save()
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = StoreSettings::default();
        self.save()
    }

    fn config_path(&self) -> &Path {
        &self.config_path
    }
}
