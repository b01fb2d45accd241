//! Redis-backed [`KvStore`]. Each trait method maps onto a single Redis
//! command, so every operation inherits Redis' per-command atomicity.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client, RedisError,
};
use tracing::info;

use super::{KvStore, StoreError};

pub struct RedisStore {
    conn: ConnectionManager,
    command_timeout: Duration,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, command_timeout: Duration) -> Result<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(command_timeout);

        let client = Client::open(redis_url).context("invalid REDIS_URL")?;
        let conn = client
            .get_connection_manager_with_config(config)
            .await
            .context("failed to connect to Redis")?;

        info!(timeout_secs = command_timeout.as_secs(), "Redis connection ready");

        Ok(Self { conn, command_timeout })
    }

    /// Bounds a single command by the connection-level timeout. Timeouts and
    /// I/O failures both surface as transient store errors, never retried
    /// here.
    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.command_timeout, op).await {
            Err(_) => Err(StoreError::Timeout),
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Io(e.to_string())),
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.hget(key, field).await }).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.hgetall(key).await }).await
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.hset_multiple(key, fields).await })
            .await
    }

    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.hexists(key, field).await }).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.del(key).await }).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.sadd(key, member).await }).await
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.sismember(key, member).await })
            .await
    }

    async fn list_append(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.rpush(key, value).await }).await
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        end: isize,
    ) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.lrange(key, start, end).await })
            .await
    }

    async fn list_index(&self, key: &str, index: isize) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.lindex(key, index).await }).await
    }

    async fn list_remove_first_match(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        self.run(async move { conn.lrem(key, 1, value).await }).await
    }

    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let pattern = format!("{prefix}*");
        let mut conn = self.conn.clone();
        self.run(async move { conn.keys(&pattern).await }).await
    }
}
