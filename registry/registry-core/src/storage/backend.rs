//! StorageBackend - the contract every store fulfils.

use async_trait::async_trait;

use super::error::StorageResult;
use super::record::{ServerCount, ServerRecord};

/// Storage contract for server records.
///
/// TigerStyle: every implementation must agree on
/// - validation before any state is touched
/// - `InvalidId` for empty ids, `NotFound` for absent ones
/// - atomic duplicate detection on create
/// - `created_at` stamped once, never changed by update
/// - owned copies out, so callers cannot mutate stored state
///
/// Only the ordering of multi-record results may differ; each backend
/// documents its own.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Every live record.
    async fn get_all(&self) -> StorageResult<Vec<ServerRecord>>;

    /// One record by id.
    async fn get_by_id(&self, id: &str) -> StorageResult<ServerRecord>;

    /// Insert a new record, returning it as stored.
    async fn create(&self, server: ServerRecord) -> StorageResult<ServerRecord>;

    /// Replace an existing record, keeping its `created_at`.
    async fn update(&self, server: ServerRecord) -> StorageResult<ServerRecord>;

    /// Remove a record.
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Records whose name contains `query`, ignoring case.
    ///
    /// An empty query matches nothing.
    async fn search(&self, query: &str) -> StorageResult<Vec<ServerRecord>>;

    /// Total and active record counts.
    async fn count(&self) -> StorageResult<ServerCount>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Release any held resources. Default is a no-op.
    async fn close(&self) {}
}
