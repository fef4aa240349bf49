// Linux follows the XDG base directory layout.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "markstore";

fn home() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

fn xdg_or(var: &str, fallback: &[&str]) -> PathBuf {
    match env::var(var) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join(APP_DIR),
        _ => fallback
            .iter()
            .fold(home(), |path, part| path.join(part))
            .join(APP_DIR),
    }
}

pub fn config_dir() -> PathBuf {
    xdg_or("XDG_CONFIG_HOME", &[".config"])
}

pub fn data_dir() -> PathBuf {
    xdg_or("XDG_DATA_HOME", &[".local", "share"])
}
