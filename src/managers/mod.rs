// markstore state managers
// Managers own mutable state: the bookmark tree and its undo/redo history.

pub mod operation_handlers;
pub mod operation_history;
pub mod tree_store;
