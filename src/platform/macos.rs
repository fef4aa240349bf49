// macOS keeps both settings and snapshots under Application Support.

use std::env;
use std::path::PathBuf;

fn app_support() -> PathBuf {
    let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
    PathBuf::from(home)
        .join("Library")
        .join("Application Support")
        .join("markstore")
}

pub fn config_dir() -> PathBuf {
    app_support()
}

pub fn data_dir() -> PathBuf {
    app_support()
}
