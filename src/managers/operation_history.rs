//! Operation History for markstore.
//!
//! Implements `OperationHistoryTrait`, a linear undo/redo log over
//! `(entries, current_index, undone)`. Recording after an undo discards the
//! redo branch. Undo and redo dispatch to the handler registered for the
//! operation's type and only move the cursor once the handler succeeded, so
//! a protocol error never leaves the cursor half-updated.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use uuid::Uuid;

use crate::managers::operation_handlers::HandlerRegistry;
use crate::managers::tree_store::TreeStore;
use crate::types::errors::HistoryError;
use crate::types::history::{Operation, UndoneSet};

/// Trait defining history operations.
pub trait OperationHistoryTrait {
    /// Appends a new operation and returns it with its generated id.
    fn record(&mut self, op_type: &str, description: &str, data: Value) -> Operation;
    fn undo(&mut self, tree: &mut TreeStore) -> Result<Operation, HistoryError>;
    fn redo(&mut self, tree: &mut TreeStore) -> Result<Operation, HistoryError>;
    fn reset(&mut self);
}

pub struct OperationHistory {
    entries: Vec<Operation>,
    current_index: i64,
    undone: UndoneSet,
    last_operation: Option<Operation>,
    registry: HandlerRegistry,
}

impl OperationHistory {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            entries: Vec::new(),
            current_index: -1,
            undone: UndoneSet::new(),
            last_operation: None,
            registry,
        }
    }

    /// Returns the current UNIX timestamp in milliseconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    pub fn entries(&self) -> &[Operation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the most recently applied operation; `-1` when none is.
    pub fn current_index(&self) -> i64 {
        self.current_index
    }

    pub fn can_undo(&self) -> bool {
        self.current_index >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index < self.entries.len() as i64 - 1
    }

    /// The operation last recorded or redone. Cleared by undo.
    pub fn last_operation(&self) -> Option<&Operation> {
        self.last_operation.as_ref()
    }

    pub fn undone_ids(&self) -> &UndoneSet {
        &self.undone
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Adopts persisted history. An out-of-range cursor is clamped and undone
    /// ids that are not positioned after the cursor are dropped.
    pub fn restore(&mut self, entries: Vec<Operation>, current_index: i64, undone: UndoneSet) {
        let max_index = entries.len() as i64 - 1;
        let clamped = current_index.clamp(-1, max_index);
        if clamped != current_index {
            tracing::warn!(
                persisted = current_index,
                clamped,
                "persisted history index out of range"
            );
        }

        let mut undone = undone;
        let before = undone.len();
        let redoable: Vec<&str> = entries
            .iter()
            .skip((clamped + 1) as usize)
            .map(|op| op.id.as_str())
            .collect();
        undone.retain(|id| redoable.contains(&id.as_str()));
        if undone.len() != before {
            tracing::warn!(
                dropped = before - undone.len(),
                "dropping undone ids that do not match the redo branch"
            );
        }

        self.entries = entries;
        self.current_index = clamped;
        self.undone = undone;
        self.last_operation = None;
    }
}

impl Default for OperationHistory {
    fn default() -> Self {
        Self::new(HandlerRegistry::with_defaults())
    }
}

impl OperationHistoryTrait for OperationHistory {
    fn record(&mut self, op_type: &str, description: &str, data: Value) -> Operation {
        if self.can_redo() {
            let keep = (self.current_index + 1) as usize;
            for discarded in self.entries.drain(keep..) {
                self.undone.remove(&discarded.id);
            }
        }
        if !self.registry.contains(op_type) {
            tracing::debug!(op_type, "recording operation without an undo handler");
        }

        let op = Operation {
            id: Uuid::new_v4().to_string(),
            op_type: op_type.to_string(),
            description: description.to_string(),
            data,
            timestamp: Self::now(),
        };
        self.entries.push(op.clone());
        self.current_index = self.entries.len() as i64 - 1;
        self.last_operation = Some(op.clone());
        op
    }

    fn undo(&mut self, tree: &mut TreeStore) -> Result<Operation, HistoryError> {
        if self.current_index < 0 {
            return Err(HistoryError::NothingToUndo);
        }
        let op = self.entries[self.current_index as usize].clone();
        if self.undone.contains(&op.id) {
            tracing::warn!(operation = %op.id, "operation already undone; refusing to apply inverse twice");
            return Err(HistoryError::AlreadyUndone(op.id));
        }

        let handler = self.registry.get(&op.op_type).ok_or_else(|| {
            tracing::warn!(op_type = %op.op_type, "no undo handler registered");
            HistoryError::UnregisteredType(op.op_type.clone())
        })?;
        handler.undo(&op.data, tree).map_err(|err| {
            tracing::warn!(operation = %op.id, error = %err, "undo handler failed");
            err
        })?;

        self.undone.insert(op.id.clone());
        self.current_index -= 1;
        self.last_operation = None;
        tracing::debug!(operation = %op.id, op_type = %op.op_type, "undone");
        Ok(op)
    }

    fn redo(&mut self, tree: &mut TreeStore) -> Result<Operation, HistoryError> {
        if !self.can_redo() {
            return Err(HistoryError::NothingToRedo);
        }
        let next = (self.current_index + 1) as usize;
        let op = self.entries[next].clone();

        let handler = self.registry.get(&op.op_type).ok_or_else(|| {
            tracing::warn!(op_type = %op.op_type, "no redo handler registered");
            HistoryError::UnregisteredType(op.op_type.clone())
        })?;
        handler.redo(&op.data, tree).map_err(|err| {
            tracing::warn!(operation = %op.id, error = %err, "redo handler failed");
            err
        })?;

        self.current_index = next as i64;
        self.undone.remove(&op.id);
        self.last_operation = Some(op.clone());
        tracing::debug!(operation = %op.id, op_type = %op.op_type, "redone");
        Ok(op)
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.current_index = -1;
        self.undone.clear();
        self.last_operation = None;
    }
}
