//! Cache key derivation.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::tasks::{Task, TaskType};

/// Default key for a task: `"{task_type}:{sha256(payload)}"`.
///
/// The payload is hashed in its serialized JSON form; `serde_json` keeps map
/// keys sorted, so equal payloads give equal keys.
pub fn cache_key(task_type: TaskType, payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    format!("{task_type}:{}", hex::encode(hasher.finalize()))
}

/// Explicit `options.cache_key` if set, otherwise [`cache_key`].
pub fn task_cache_key(task: &Task) -> String {
    match &task.options.cache_key {
        Some(key) => key.clone(),
        None => cache_key(task.task_type, &task.payload),
    }
}
