//! markstore RPC server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line.
//! Request:  {"id":1, "method":"bookmark.add", "params":{"name":"...","url":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Logs go to stderr so stdout carries only protocol lines.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use markstore::app::App;
use markstore::database::Database;
use markstore::platform;
use markstore::rpc_handler::handle_method;
use markstore::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use markstore::types::errors::PersistenceError;

#[cfg(feature = "network")]
use markstore::app::check_invalid_bookmarks;
#[cfg(feature = "network")]
use markstore::services::link_checker::{HttpProbe, LinkChecker};

/// Snapshot restored at startup and written back on exit.
const SESSION_SNAPSHOT: &str = "default";

/// Fixed one-second window request limiter.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_second,
        }
    }

    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn emit(message: &Value) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if writeln!(out, "{}", message).and_then(|_| out.flush()).is_err() {
        tracing::error!("stdout closed; dropping response");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("markstore=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn snapshot_db_path() -> PathBuf {
    match std::env::var("MARKSTORE_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir).join(platform::SNAPSHOT_DB_FILE),
        Err(_) => platform::default_snapshot_db_path(),
    }
}

fn build_app() -> App {
    let mut engine = SettingsEngine::new(std::env::var("MARKSTORE_SETTINGS").ok().map(PathBuf::from));
    let settings = engine.load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "using default settings");
        Default::default()
    });

    let mut app = App::new(settings);
    let db_path = snapshot_db_path();
    match Database::open(&db_path) {
        Ok(db) => app = app.with_database(db),
        Err(e) => tracing::warn!(path = %db_path.display(), error = %e, "snapshots disabled"),
    }
    match app.load_snapshot(SESSION_SNAPSHOT) {
        Ok(()) | Err(PersistenceError::NotFound(_)) => {}
        Err(e) => tracing::warn!(error = %e, "could not restore last session"),
    }
    app
}

#[tokio::main]
async fn main() {
    init_tracing();

    let app = Mutex::new(build_app());
    #[cfg(feature = "network")]
    let checker = {
        let settings = match app.lock() {
            Ok(a) => a.settings().link_check.clone(),
            Err(poisoned) => poisoned.into_inner().settings().link_check.clone(),
        };
        LinkChecker::new(HttpProbe::new(), settings)
    };

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    let mut rate_limiter = RateLimiter::new(200);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };
        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            emit(&json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));
        tracing::debug!(method, "rpc request");

        let result = match method {
            #[cfg(feature = "network")]
            "links.check" => Ok(json!(check_invalid_bookmarks(&app, &checker).await)),
            _ => handle_method(&app, method, &params),
        };

        let response = match result {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(&response);
    }

    match app.lock() {
        Ok(mut a) => {
            a.cleanup();
            if let Err(e) = a.save_snapshot(SESSION_SNAPSHOT) {
                tracing::warn!(error = %e, "session not saved");
            }
        }
        Err(_) => tracing::error!("store lock poisoned; session not saved"),
    };
}
