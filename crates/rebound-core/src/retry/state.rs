use serde_json::Value;
use std::collections::HashMap;

/// Flag set once a logical request has spent its single reauthorization.
pub const HAS_DONE_REAUTH: &str = "has_done_reauth";

/// Scratch storage scoped to one logical request.
///
/// Created fresh when a caller starts a logical request, threaded by mutable
/// reference through every attempt's [`RetryContext`](super::RetryContext),
/// and dropped when the request finishes. It is never shared between logical
/// requests, so it needs no locking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryState {
    entries: HashMap<String, Value>,
}

impl RetryState {
    /// Create an empty state for a new logical request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Whether `key` holds a JSON `true`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Value::Bool(true)))
    }

    /// Set `key` to `true`. Setting an already-set flag is a no-op.
    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.entries.insert(key.into(), Value::Bool(true));
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
