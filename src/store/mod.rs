//! Key-value store abstraction.
//!
//! The services depend only on this trait: hash-per-key records, set
//! membership and ordered lists, with per-operation atomicity. Multi-key
//! sequences are not atomic; callers own the resulting hazards.

#[cfg(test)]
pub mod memory;
pub mod redis;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation timed out")]
    Timeout,

    #[error("store i/o failure: {0}")]
    Io(String),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;
    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError>;
    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    async fn list_append(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Inclusive range with Redis index semantics (`-1` is the last entry).
    async fn list_range(&self, key: &str, start: isize, end: isize)
        -> Result<Vec<String>, StoreError>;
    async fn list_index(&self, key: &str, index: isize) -> Result<Option<String>, StoreError>;
    /// Removes the first occurrence of `value`; returns the removed count.
    async fn list_remove_first_match(&self, key: &str, value: &str) -> Result<u64, StoreError>;

    /// Enumerates keys starting with `prefix` (sensor/user scans).
    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

pub type SharedStore = Arc<dyn KvStore>;

/// Key scheme. One record per key so prefix scans enumerate records; the
/// series lists live under their own prefix to keep `sensor:*` scans clean.
pub mod keys {
    pub const REVOKED_TOKENS: &str = "revoked_tokens";
    pub const USER_PREFIX: &str = "user:";
    pub const INSTITUTION_PREFIX: &str = "institution:";
    pub const SENSOR_PREFIX: &str = "sensor:";

    pub fn user(email: &str) -> String {
        format!("{USER_PREFIX}{email}")
    }

    pub fn institution(name: &str) -> String {
        format!("{INSTITUTION_PREFIX}{name}")
    }

    pub fn sensor(serial_num: &str) -> String {
        format!("{SENSOR_PREFIX}{serial_num}")
    }

    pub fn series(serial_num: &str, column: &str) -> String {
        format!("series:{serial_num}:{column}")
    }

}
