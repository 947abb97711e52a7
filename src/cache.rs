// =============================================================================
// CACHE MODULE
// =============================================================================
// Optional read-through cache for single-ticket lookups.
//
// LEARNING NOTES:
// - The cache is best-effort: a backend failure is logged and the request
//   falls back to the store. It never turns a good request into an error.
// - Every entry carries a version (the ticket's `updated_at` in microseconds)
//   and a write only lands if the key does not already hold the same or a
//   newer version. A Get that read the store before a concurrent reserve
//   therefore cannot put its older copy back over the fresh one.
// - Delete leaves a tombstone versioned "now", which outranks any copy of the
//   ticket a slow Get may still try to store.
// - Two backends: Redis (check-and-set runs as one Lua script) and an
//   in-process map (`memory://`) for single-instance runs and tests.
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use redis::{aio::ConnectionManager, RedisResult, Script};
use uuid::Uuid;

use crate::metrics;
use crate::models::Ticket;

// =============================================================================
// ENTRY FORMAT
// =============================================================================
// "<version>|<ticket json>" for a ticket, "<version>|" for a tombstone.

enum CacheEntry {
    Ticket(Ticket),
    Deleted,
}

fn encode_entry(version: i64, ticket: Option<&Ticket>) -> serde_json::Result<String> {
    let body = match ticket {
        Some(ticket) => serde_json::to_string(ticket)?,
        None => String::new(),
    };
    Ok(format!("{}|{}", version, body))
}

fn decode_entry(raw: &str) -> Option<CacheEntry> {
    let (_, body) = raw.split_once('|')?;
    if body.is_empty() {
        return Some(CacheEntry::Deleted);
    }
    serde_json::from_str(body).ok().map(CacheEntry::Ticket)
}

fn entry_version(raw: &str) -> Option<i64> {
    raw.split_once('|')?.0.parse().ok()
}

// =============================================================================
// BACKENDS
// =============================================================================

#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> RedisResult<Option<String>>;

    /// Store `entry` unless `key` holds a live entry of `version` or newer.
    /// Returns whether the entry was written.
    async fn put_if_newer(
        &self,
        key: &str,
        version: i64,
        entry: &str,
        ttl_secs: u64,
    ) -> RedisResult<bool>;

    async fn ping(&self) -> RedisResult<()>;
}

// -----------------------------------------------------------------------------
// REDIS
// -----------------------------------------------------------------------------

/// KEYS[1] = key, ARGV[1] = version, ARGV[2] = entry, ARGV[3] = ttl seconds
const PUT_IF_NEWER_LUA: &str = r#"
local current = redis.call('GET', KEYS[1])
if current then
    local version = tonumber(string.match(current, '^(%-?%d+)|'))
    if version and version >= tonumber(ARGV[1]) then
        return 0
    end
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
"#;

pub struct RedisCache {
    /// ConnectionManager reconnects automatically
    conn: ConnectionManager,
    put_if_newer: Script,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            put_if_newer: Script::new(PUT_IF_NEWER_LUA),
        })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        let start = Instant::now();
        let result = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.conn.clone())
            .await;
        metrics::record_redis_operation("get", start.elapsed().as_secs_f64());
        result
    }

    async fn put_if_newer(
        &self,
        key: &str,
        version: i64,
        entry: &str,
        ttl_secs: u64,
    ) -> RedisResult<bool> {
        let start = Instant::now();
        let written: i32 = self
            .put_if_newer
            .key(key)
            .arg(version)
            .arg(entry)
            .arg(ttl_secs)
            .invoke_async(&mut self.conn.clone())
            .await?;
        metrics::record_redis_operation("set", start.elapsed().as_secs_f64());
        Ok(written == 1)
    }

    async fn ping(&self) -> RedisResult<()> {
        let _: String = redis::cmd("PING")
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// IN-PROCESS
// -----------------------------------------------------------------------------

/// Map-backed cache. The entry guard makes check-and-set atomic per key.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.1 > now)
            .map(|entry| entry.0.clone()))
    }

    async fn put_if_newer(
        &self,
        key: &str,
        version: i64,
        entry: &str,
        ttl_secs: u64,
    ) -> RedisResult<bool> {
        let now = Instant::now();
        let value = (entry.to_string(), now + Duration::from_secs(ttl_secs));

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let (current, expires) = occupied.get();
                let newer_exists =
                    *expires > now && entry_version(current).map_or(false, |v| v >= version);
                if newer_exists {
                    return Ok(false);
                }
                occupied.insert(value);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(value);
            }
        }
        Ok(true)
    }

    async fn ping(&self) -> RedisResult<()> {
        Ok(())
    }
}

// =============================================================================
// TICKET CACHE
// =============================================================================

#[derive(Clone)]
pub struct TicketCache {
    /// `None` when REDIS_URL is not configured
    backend: Option<Arc<dyn CacheBackend>>,
    ttl_secs: u64,
}

impl TicketCache {
    /// `memory://` selects the in-process cache, anything else is a Redis URL.
    pub async fn connect(url: &str, ttl_secs: u64) -> anyhow::Result<Self> {
        if url.starts_with("memory://") {
            return Ok(Self::in_memory(ttl_secs));
        }
        let redis = RedisCache::connect(url).await?;
        Ok(Self {
            backend: Some(Arc::new(redis)),
            ttl_secs,
        })
    }

    pub fn in_memory(ttl_secs: u64) -> Self {
        Self {
            backend: Some(Arc::new(MemoryCache::default())),
            ttl_secs,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttl_secs: 0,
        }
    }

    /// Backend name for logs, `None` when disabled.
    pub fn backend(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    fn key(id: Uuid) -> String {
        format!("ticket:{}", id)
    }

    /// Cached copy of a ticket. Misses, tombstones and read failures are all
    /// `None`; the caller then goes to the store.
    pub async fn get(&self, id: Uuid) -> Option<Ticket> {
        let backend = self.backend.as_ref()?;

        match backend.get(&Self::key(id)).await {
            Ok(Some(raw)) => match decode_entry(&raw)? {
                CacheEntry::Ticket(ticket) => Some(ticket),
                CacheEntry::Deleted => None,
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(ticket_id = %id, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Store a ticket unless the cache already holds this or a later version.
    ///
    /// Used both to fill after a store read and to refresh after a mutation.
    pub async fn put(&self, ticket: &Ticket) {
        let version = ticket.updated_at.timestamp_micros();
        let Ok(entry) = encode_entry(version, Some(ticket)) else {
            return;
        };
        self.write(ticket.id, version, &entry).await;
    }

    /// Replace a deleted ticket's entry with a tombstone.
    pub async fn mark_deleted(&self, id: Uuid) {
        let version = Utc::now().timestamp_micros();
        let Ok(entry) = encode_entry(version, None) else {
            return;
        };
        self.write(id, version, &entry).await;
    }

    async fn write(&self, id: Uuid, version: i64, entry: &str) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };

        match backend
            .put_if_newer(&Self::key(id), version, entry, self.ttl_secs)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!(ticket_id = %id, version, "Cache already holds a newer entry"),
            Err(e) => tracing::warn!(ticket_id = %id, error = %e, "Cache write failed"),
        }
    }

    /// `None` when disabled, otherwise whether the backend answers.
    pub async fn health_check(&self) -> Option<bool> {
        let backend = self.backend.as_ref()?;
        Some(backend.ping().await.is_ok())
    }
}
