//! In-memory [`KvStore`] test double mirroring the per-operation semantics
//! of the Redis implementation (including wrong-type errors and Redis list
//! index conventions).

use std::collections::{HashMap, HashSet};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;

use super::{KvStore, StoreError};

enum Entry {
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
    List(Vec<String>),
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Entry>>,
    fail_all: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation fails with an injected I/O error. Used to
    /// exercise the transient-failure paths.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(StoreError::Io("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

fn wrong_type() -> StoreError {
    StoreError::Io("WRONGTYPE operation against a key holding the wrong kind of value".into())
}

/// Redis LRANGE index normalisation: negative indices count from the tail,
/// the range is inclusive on both ends.
fn normalize_range(len: usize, start: isize, end: isize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let n = len as isize;
    let start = if start < 0 { (n + start).max(0) } else { start };
    let end = if end < 0 { n + end } else { end.min(n - 1) };
    if start > end || start >= n || end < 0 {
        return None;
    }
    Some((start as usize, end as usize))
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.check_failure()?;
        match self.inner.lock().unwrap().get(key) {
            None => Ok(None),
            Some(Entry::Hash(map)) => Ok(map.get(field).cloned()),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        self.check_failure()?;
        match self.inner.lock().unwrap().get(key) {
            None => Ok(HashMap::new()),
            Some(Entry::Hash(map)) => Ok(map.clone()),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        match inner
            .entry(key.to_owned())
            .or_insert_with(|| Entry::Hash(HashMap::new()))
        {
            Entry::Hash(map) => {
                for (field, value) in fields {
                    map.insert(field.clone(), value.clone());
                }
                Ok(())
            }
            _ => Err(wrong_type()),
        }
    }

    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        self.check_failure()?;
        match self.inner.lock().unwrap().get(key) {
            None => Ok(false),
            Some(Entry::Hash(map)) => Ok(map.contains_key(field)),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_failure()?;
        self.inner.lock().unwrap().remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        match inner
            .entry(key.to_owned())
            .or_insert_with(|| Entry::Set(HashSet::new()))
        {
            Entry::Set(set) => {
                set.insert(member.to_owned());
                Ok(())
            }
            _ => Err(wrong_type()),
        }
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.check_failure()?;
        match self.inner.lock().unwrap().get(key) {
            None => Ok(false),
            Some(Entry::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn list_append(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        match inner
            .entry(key.to_owned())
            .or_insert_with(|| Entry::List(Vec::new()))
        {
            Entry::List(list) => {
                list.push(value.to_owned());
                Ok(())
            }
            _ => Err(wrong_type()),
        }
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        end: isize,
    ) -> Result<Vec<String>, StoreError> {
        self.check_failure()?;
        match self.inner.lock().unwrap().get(key) {
            None => Ok(Vec::new()),
            Some(Entry::List(list)) => Ok(match normalize_range(list.len(), start, end) {
                None => Vec::new(),
                Some((s, e)) => list[s..=e].to_vec(),
            }),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn list_index(&self, key: &str, index: isize) -> Result<Option<String>, StoreError> {
        self.check_failure()?;
        match self.inner.lock().unwrap().get(key) {
            None => Ok(None),
            Some(Entry::List(list)) => {
                let n = list.len() as isize;
                let i = if index < 0 { n + index } else { index };
                if i < 0 || i >= n {
                    Ok(None)
                } else {
                    Ok(Some(list[i as usize].clone()))
                }
            }
            Some(_) => Err(wrong_type()),
        }
    }

    async fn list_remove_first_match(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        self.check_failure()?;
        let mut inner = self.inner.lock().unwrap();
        match inner.get_mut(key) {
            None => Ok(0),
            Some(Entry::List(list)) => match list.iter().position(|v| v == value) {
                Some(pos) => {
                    list.remove(pos);
                    Ok(1)
                }
                None => Ok(0),
            },
            Some(_) => Err(wrong_type()),
        }
    }

    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.check_failure()?;
        let mut keys: Vec<String> = self
            .inner
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_set_get_exists() {
        let store = MemoryStore::new();
        store
            .hash_set("h", &[("a".into(), "1".into()), ("b".into(), "2".into())])
            .await
            .unwrap();

        assert_eq!(store.hash_get("h", "a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.hash_get("h", "z").await.unwrap(), None);
        assert!(store.hash_exists("h", "b").await.unwrap());
        assert!(!store.hash_exists("missing", "b").await.unwrap());
        assert_eq!(store.hash_get_all("h").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn set_membership() {
        let store = MemoryStore::new();
        assert!(!store.set_is_member("s", "x").await.unwrap());
        store.set_add("s", "x").await.unwrap();
        store.set_add("s", "x").await.unwrap();
        assert!(store.set_is_member("s", "x").await.unwrap());
        assert!(!store.set_is_member("s", "y").await.unwrap());
    }

    #[tokio::test]
    async fn list_append_range_index() {
        let store = MemoryStore::new();
        for v in ["a", "b", "c"] {
            store.list_append("l", v).await.unwrap();
        }

        assert_eq!(store.list_range("l", 0, -1).await.unwrap(), ["a", "b", "c"]);
        assert_eq!(store.list_range("l", 1, 1).await.unwrap(), ["b"]);
        assert_eq!(store.list_range("l", -2, -1).await.unwrap(), ["b", "c"]);
        assert!(store.list_range("l", 5, 9).await.unwrap().is_empty());
        assert!(store.list_range("missing", 0, -1).await.unwrap().is_empty());

        assert_eq!(store.list_index("l", 0).await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.list_index("l", -1).await.unwrap().as_deref(), Some("c"));
        assert_eq!(store.list_index("l", 9).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_remove_first_match_only_removes_one() {
        let store = MemoryStore::new();
        for v in ["x", "y", "x"] {
            store.list_append("l", v).await.unwrap();
        }

        assert_eq!(store.list_remove_first_match("l", "x").await.unwrap(), 1);
        assert_eq!(store.list_range("l", 0, -1).await.unwrap(), ["y", "x"]);
        assert_eq!(store.list_remove_first_match("l", "z").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn keys_by_prefix_filters() {
        let store = MemoryStore::new();
        store.hash_set("sensor:a", &[("f".into(), "1".into())]).await.unwrap();
        store.hash_set("sensor:b", &[("f".into(), "1".into())]).await.unwrap();
        store.hash_set("user:a", &[("f".into(), "1".into())]).await.unwrap();

        let keys = store.keys_by_prefix("sensor:").await.unwrap();
        assert_eq!(keys, ["sensor:a", "sensor:b"]);
    }

    #[tokio::test]
    async fn delete_removes_any_entry_kind() {
        let store = MemoryStore::new();
        store.list_append("l", "a").await.unwrap();
        store.delete("l").await.unwrap();
        assert!(store.list_range("l", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_type_is_an_error() {
        let store = MemoryStore::new();
        store.list_append("l", "a").await.unwrap();
        assert!(store.hash_get("l", "f").await.is_err());
        assert!(store.set_add("l", "m").await.is_err());
    }

    #[tokio::test]
    async fn injected_failure_fails_every_op() {
        let store = MemoryStore::new();
        store.fail_all(true);
        assert!(store.hash_get("h", "f").await.is_err());
        assert!(store.list_append("l", "v").await.is_err());
        store.fail_all(false);
        assert!(store.hash_get("h", "f").await.is_ok());
    }
}
