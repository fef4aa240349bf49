// markstore services
// Self-contained services used by the managers and the App context:
// validation, caching, search, link liveness and settings.

pub mod cache_manager;
pub mod link_checker;
pub mod search_service;
pub mod settings_engine;
pub mod validation;
