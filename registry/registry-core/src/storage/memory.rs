//! MemoryBackend - In-Process Storage
//!
//! TigerStyle: one reader/writer lock over the whole record set.
//!
//! Any number of reads proceed together; a write excludes everything else.
//! The duplicate check in `create` runs under the write lock, so concurrent
//! creates of one id cannot both succeed.
//!
//! Ordering: `get_all` and `search` return records in ascending `id` order.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};
use super::record::{validate_server, ServerCount, ServerRecord};
use crate::clock::{SharedClock, SystemClock};

/// In-memory storage backend.
#[derive(Debug)]
pub struct MemoryBackend {
    servers: RwLock<BTreeMap<String, ServerRecord>>,
    clock: SharedClock,
}

impl MemoryBackend {
    /// Create an empty store on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping records from `clock`.
    #[must_use]
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            servers: RwLock::new(BTreeMap::new()),
            clock,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get_all(&self) -> StorageResult<Vec<ServerRecord>> {
        let servers = self.servers.read().await;
        Ok(servers.values().cloned().collect())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<ServerRecord> {
        if id.is_empty() {
            return Err(StorageError::InvalidId);
        }

        let servers = self.servers.read().await;
        servers
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn create(&self, mut server: ServerRecord) -> StorageResult<ServerRecord> {
        validate_server(&server)?;

        let mut servers = self.servers.write().await;
        if servers.contains_key(&server.id) {
            return Err(StorageError::AlreadyExists(server.id));
        }

        if server.created_at.is_empty() {
            server.created_at = self.clock.timestamp();
        }

        servers.insert(server.id.clone(), server.clone());

        // Postcondition
        debug_assert!(servers.contains_key(&server.id), "created record must be stored");

        tracing::debug!(id = %server.id, name = %server.name, "server created");
        Ok(server)
    }

    async fn update(&self, mut server: ServerRecord) -> StorageResult<ServerRecord> {
        validate_server(&server)?;

        let mut servers = self.servers.write().await;
        let Some(existing) = servers.get_mut(&server.id) else {
            return Err(StorageError::NotFound(server.id));
        };

        server.created_at = existing.created_at.clone();
        *existing = server.clone();

        tracing::debug!(id = %server.id, "server updated");
        Ok(server)
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        if id.is_empty() {
            return Err(StorageError::InvalidId);
        }

        let mut servers = self.servers.write().await;
        if servers.remove(id).is_none() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        tracing::debug!(id, "server deleted");
        Ok(())
    }

    async fn search(&self, query: &str) -> StorageResult<Vec<ServerRecord>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let query_lower = query.to_lowercase();
        let servers = self.servers.read().await;
        Ok(servers
            .values()
            .filter(|s| s.name_matches(&query_lower))
            .cloned()
            .collect())
    }

    async fn count(&self) -> StorageResult<ServerCount> {
        let servers = self.servers.read().await;
        let total = servers.len();
        let active = servers.values().filter(|s| s.is_active).count();

        // Postcondition
        assert!(active <= total, "active {active} exceeds total {total}");

        Ok(ServerCount { total, active })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// Tests
// =============================================================================
