//! Shared store primitives
//!
//! The shared coordinator only needs atomic set and hash operations. Every
//! call here is a single store round-trip; `set_pop` in particular must be
//! one atomic destructive pop so two workers never receive the same member.

use crate::coordination::traits::CoordinationResult;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[async_trait]
pub trait SetStore: Send + Sync {
    /// Adds `members` to the set at `key`, returning how many were new
    async fn set_add(&self, key: &str, members: &[String]) -> CoordinationResult<usize>;

    /// Atomically removes and returns one arbitrary member
    async fn set_pop(&self, key: &str) -> CoordinationResult<Option<String>>;

    /// Removes `member`, returning whether it was present
    async fn set_remove(&self, key: &str, member: &str) -> CoordinationResult<bool>;

    async fn set_members(&self, key: &str) -> CoordinationResult<Vec<String>>;

    async fn set_len(&self, key: &str) -> CoordinationResult<usize>;

    /// Sets `key` only if it does not exist, returning whether it was set
    async fn set_if_absent(&self, key: &str, value: &str) -> CoordinationResult<bool>;

    async fn get(&self, key: &str) -> CoordinationResult<Option<String>>;

    async fn delete(&self, keys: &[String]) -> CoordinationResult<()>;

    async fn hash_incr(&self, key: &str, field: &str, by: i64) -> CoordinationResult<i64>;

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> CoordinationResult<()>;

    async fn hash_get_all(&self, key: &str) -> CoordinationResult<HashMap<String, String>>;
}

/// Redis-backed store over a multiplexed connection
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> CoordinationResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to coordination store at {}", url);
        Ok(Self { conn })
    }

    // Multiplexed connections are cheap handles onto one socket
    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

#[async_trait]
impl SetStore for RedisStore {
    async fn set_add(&self, key: &str, members: &[String]) -> CoordinationResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let added: usize = self.conn().sadd(key, members).await?;
        Ok(added)
    }

    async fn set_pop(&self, key: &str) -> CoordinationResult<Option<String>> {
        let member: Option<String> = self.conn().spop(key).await?;
        Ok(member)
    }

    async fn set_remove(&self, key: &str, member: &str) -> CoordinationResult<bool> {
        let removed: usize = self.conn().srem(key, member).await?;
        Ok(removed > 0)
    }

    async fn set_members(&self, key: &str) -> CoordinationResult<Vec<String>> {
        let members: Vec<String> = self.conn().smembers(key).await?;
        Ok(members)
    }

    async fn set_len(&self, key: &str) -> CoordinationResult<usize> {
        let len: usize = self.conn().scard(key).await?;
        Ok(len)
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> CoordinationResult<bool> {
        let set: bool = self.conn().set_nx(key, value).await?;
        Ok(set)
    }

    async fn get(&self, key: &str) -> CoordinationResult<Option<String>> {
        let value: Option<String> = self.conn().get(key).await?;
        Ok(value)
    }

    async fn delete(&self, keys: &[String]) -> CoordinationResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let _: usize = self.conn().del(keys).await?;
        Ok(())
    }

    async fn hash_incr(&self, key: &str, field: &str, by: i64) -> CoordinationResult<i64> {
        let value: i64 = self.conn().hincr(key, field, by).await?;
        Ok(value)
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> CoordinationResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let _: () = self.conn().hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> CoordinationResult<HashMap<String, String>> {
        let map: HashMap<String, String> = self.conn().hgetall(key).await?;
        Ok(map)
    }
}

#[derive(Debug, Default)]
struct MemoryData {
    sets: HashMap<String, HashSet<String>>,
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// In-process store with the same atomicity as the Redis commands
///
/// Used by tests and for running several workers inside one process against
/// the shared-store coordinator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryData> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SetStore for MemoryStore {
    async fn set_add(&self, key: &str, members: &[String]) -> CoordinationResult<usize> {
        let mut data = self.lock();
        let set = data.sets.entry(key.to_string()).or_default();
        Ok(members.iter().filter(|m| set.insert((*m).clone())).count())
    }

    async fn set_pop(&self, key: &str) -> CoordinationResult<Option<String>> {
        let mut data = self.lock();
        let Some(set) = data.sets.get_mut(key) else {
            return Ok(None);
        };
        let member = set.iter().next().cloned();
        if let Some(member) = &member {
            set.remove(member);
        }
        Ok(member)
    }

    async fn set_remove(&self, key: &str, member: &str) -> CoordinationResult<bool> {
        let mut data = self.lock();
        Ok(data
            .sets
            .get_mut(key)
            .map_or(false, |set| set.remove(member)))
    }

    async fn set_members(&self, key: &str) -> CoordinationResult<Vec<String>> {
        let data = self.lock();
        Ok(data
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_len(&self, key: &str) -> CoordinationResult<usize> {
        Ok(self.lock().sets.get(key).map_or(0, HashSet::len))
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> CoordinationResult<bool> {
        let mut data = self.lock();
        if data.strings.contains_key(key) {
            return Ok(false);
        }
        data.strings.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn get(&self, key: &str) -> CoordinationResult<Option<String>> {
        Ok(self.lock().strings.get(key).cloned())
    }

    async fn delete(&self, keys: &[String]) -> CoordinationResult<()> {
        let mut data = self.lock();
        for key in keys {
            data.sets.remove(key);
            data.strings.remove(key);
            data.hashes.remove(key);
        }
        Ok(())
    }

    async fn hash_incr(&self, key: &str, field: &str, by: i64) -> CoordinationResult<i64> {
        let mut data = self.lock();
        let hash = data.hashes.entry(key.to_string()).or_default();
        let current = hash
            .get(field)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + by;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> CoordinationResult<()> {
        let mut data = self.lock();
        let hash = data.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> CoordinationResult<HashMap<String, String>> {
        Ok(self.lock().hashes.get(key).cloned().unwrap_or_default())
    }
}
