// markstore platform paths
// Resolves where settings and snapshot databases live on each OS.
//
// Per-OS lookups are selected with `cfg(target_os)` at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// File name of the persisted settings inside [`config_dir`].
pub const SETTINGS_FILE: &str = "settings.json";

/// File name of the snapshot database inside [`data_dir`].
pub const SNAPSHOT_DB_FILE: &str = "snapshots.db";

/// Directory holding `settings.json`.
///
/// - **Linux**: `$XDG_CONFIG_HOME/markstore` or `~/.config/markstore`
/// - **macOS**: `~/Library/Application Support/markstore`
/// - **Windows**: `%APPDATA%/markstore`
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::config_dir()
    }
}

/// Directory holding the snapshot database.
///
/// - **Linux**: `$XDG_DATA_HOME/markstore` or `~/.local/share/markstore`
/// - **macOS**: `~/Library/Application Support/markstore`
/// - **Windows**: `%LOCALAPPDATA%/markstore`
pub fn data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::data_dir()
    }
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILE)
}

pub fn default_snapshot_db_path() -> PathBuf {
    data_dir().join(SNAPSHOT_DB_FILE)
}
