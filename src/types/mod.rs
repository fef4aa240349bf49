// markstore shared type definitions
// Each submodule defines plain data used across managers and services.

pub mod bookmark;
pub mod errors;
pub mod history;
pub mod settings;
