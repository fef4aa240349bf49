//! markstore: a hierarchical bookmark store with undo/redo history,
//! staleness-aware derived-view caching and debounced search.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
