//! SqliteBackend - Durable Storage
//!
//! TigerStyle: Real database storage behind the same contract as memory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SqliteBackend                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pool: sqlx::SqlitePool (max open, min idle, max lifetime)   │
//! │  Table: servers (id PK, name UNIQUE, tags as JSON text, ...) │
//! │  Table: schema_migrations (version PK, applied_at)           │
//! │  Every operation bounded by tokio::time::timeout             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Schema (migration 1)
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS servers (
//!     id TEXT PRIMARY KEY,
//!     name TEXT NOT NULL UNIQUE,
//!     name_lower TEXT NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     version TEXT NOT NULL,
//!     repository TEXT NOT NULL DEFAULT '',
//!     author TEXT NOT NULL DEFAULT '',
//!     tags TEXT NOT NULL DEFAULT '[]',
//!     is_active INTEGER NOT NULL DEFAULT 1,
//!     created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
//!     updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
//! );
//! ```
//!
//! Ordering: `get_all` and `search` return newest first (`created_at`
//! descending, later inserts first on ties).
//!
//! `name_lower` holds the Unicode lowercase of `name`; SQLite's own `LOWER`
//! only folds ASCII. Search is a plain substring test against it.
//!
//! The primary key and the unique name constraint are the final word on
//! duplicates; the lookup before insert only short-circuits the common case.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::Row;

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};
use super::record::{validate_server, ServerCount, ServerRecord};
use crate::clock::{SharedClock, SystemClock};
use crate::constants::{
    SCHEMA_VERSION_CURRENT, SQLITE_CONNECTIONS_IDLE_DEFAULT, SQLITE_CONNECTIONS_OPEN_MAX_DEFAULT,
    SQLITE_CONNECTION_LIFETIME_MINUTES_DEFAULT, SQLITE_OPERATION_TIMEOUT_MS_DEFAULT,
};

// =============================================================================
// Schema
// =============================================================================

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

const CREATE_SERVERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS servers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        name_lower TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        version TEXT NOT NULL,
        repository TEXT NOT NULL DEFAULT '',
        author TEXT NOT NULL DEFAULT '',
        tags TEXT NOT NULL DEFAULT '[]',
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

const CREATE_INDEX_CREATED: &str =
    "CREATE INDEX IF NOT EXISTS idx_servers_created ON servers(created_at DESC)";

const CREATE_INDEX_ACTIVE: &str =
    "CREATE INDEX IF NOT EXISTS idx_servers_active ON servers(is_active)";

const SELECT_COLUMNS: &str =
    "SELECT id, name, description, version, repository, author, tags, is_active, created_at FROM servers";

struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: SCHEMA_VERSION_CURRENT,
    statements: &[CREATE_SERVERS_TABLE, CREATE_INDEX_CREATED, CREATE_INDEX_ACTIVE],
}];

// =============================================================================
// SqliteConfig
// =============================================================================

/// Connection settings for [`SqliteBackend`].
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file; parent directories are created on open
    pub path: PathBuf,
    /// Upper bound on pooled connections
    pub max_open_connections: u32,
    /// Connections kept open while idle
    pub max_idle_connections: u32,
    /// Age after which a connection is recycled
    pub connection_max_lifetime: Duration,
    /// Deadline for each storage operation, measured from call entry
    pub operation_timeout: Duration,
}

impl SqliteConfig {
    /// Defaults for everything except the file location.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_open_connections: SQLITE_CONNECTIONS_OPEN_MAX_DEFAULT,
            max_idle_connections: SQLITE_CONNECTIONS_IDLE_DEFAULT,
            connection_max_lifetime: Duration::from_secs(
                SQLITE_CONNECTION_LIFETIME_MINUTES_DEFAULT * 60,
            ),
            operation_timeout: Duration::from_millis(SQLITE_OPERATION_TIMEOUT_MS_DEFAULT),
        }
    }

    /// Set pool sizes.
    #[must_use]
    pub fn with_pool(mut self, max_open: u32, max_idle: u32) -> Self {
        self.max_open_connections = max_open;
        self.max_idle_connections = max_idle;
        self
    }

    /// Set connection lifetime.
    #[must_use]
    pub fn with_connection_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.connection_max_lifetime = lifetime;
        self
    }

    /// Set per-operation timeout.
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

// =============================================================================
// SqliteBackend
// =============================================================================

/// SQLite storage backend for durable use.
///
/// TigerStyle: Connection pooling, explicit schema, bounded operations.
#[derive(Debug)]
pub struct SqliteBackend {
    pool: SqlitePool,
    clock: SharedClock,
    operation_timeout: Duration,
}

impl SqliteBackend {
    /// Open (or create) the database described by `config` and migrate it.
    ///
    /// # Errors
    /// Returns error if the directory, pool or migrations fail.
    ///
    /// # Example
    /// ```ignore
    /// let backend = SqliteBackend::open(SqliteConfig::new("./data/registry.db")).await?;
    /// ```
    pub async fn open(config: SqliteConfig) -> StorageResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Open with an explicit clock for `created_at` stamping.
    ///
    /// # Errors
    /// Returns error if the directory, pool or migrations fail.
    pub async fn open_with_clock(config: SqliteConfig, clock: SharedClock) -> StorageResult<Self> {
        // Preconditions
        assert!(
            !config.path.as_os_str().is_empty(),
            "database path cannot be empty"
        );
        assert!(
            config.max_open_connections > 0,
            "max_open_connections must be positive"
        );

        ensure_parent_dir(&config.path).await?;

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(config.operation_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_open_connections)
            .min_connections(config.max_idle_connections.min(config.max_open_connections))
            .max_lifetime(config.connection_max_lifetime)
            .acquire_timeout(config.operation_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                StorageError::connection(format!(
                    "failed to open {}: {e}",
                    config.path.display()
                ))
            })?;

        let backend = Self {
            pool,
            clock,
            operation_timeout: config.operation_timeout,
        };

        backend.run_migrations().await?;

        tracing::info!(
            path = %config.path.display(),
            max_open = config.max_open_connections,
            max_idle = config.max_idle_connections,
            "sqlite storage ready"
        );

        Ok(backend)
    }

    /// Apply every migration not yet recorded in `schema_migrations`.
    async fn run_migrations(&self) -> StorageResult<()> {
        sqlx::query(CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::write("migrate", e.to_string()))?;

        let applied = self.schema_versions().await?;

        for migration in MIGRATIONS {
            if applied.contains(&migration.version) {
                continue;
            }

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| StorageError::write("migrate", e.to_string()))?;

            for statement in migration.statements {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        StorageError::write(
                            "migrate",
                            format!("migration {} failed: {e}", migration.version),
                        )
                    })?;
            }

            sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
                .bind(migration.version)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::write("migrate", e.to_string()))?;

            tx.commit()
                .await
                .map_err(|e| StorageError::write("migrate", e.to_string()))?;

            tracing::info!(version = migration.version, "applied schema migration");
        }

        Ok(())
    }

    /// Migration versions recorded in the database, ascending.
    ///
    /// # Errors
    /// Returns error if the table cannot be read.
    pub async fn schema_versions(&self) -> StorageResult<Vec<i64>> {
        sqlx::query_scalar("SELECT version FROM schema_migrations ORDER BY version")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::read("schema_versions", e.to_string()))
    }

    /// Run `fut` under the per-operation deadline.
    async fn timed<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(self.operation_timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(operation, timeout_ms, "storage operation timed out");
                Err(StorageError::Timeout {
                    operation,
                    timeout_ms,
                })
            }
        }
    }

    async fn fetch_by_id(
        &self,
        operation: &'static str,
        id: &str,
    ) -> StorageResult<Option<ServerRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::read(operation, e.to_string()))?;

        row.as_ref().map(row_to_server).transpose()
    }

    async fn fetch_many<'q>(
        &self,
        operation: &'static str,
        query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    ) -> StorageResult<Vec<ServerRecord>> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::read(operation, e.to_string()))?;

        rows.iter().map(row_to_server).collect()
    }
}

async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| {
                StorageError::connection(format!(
                    "failed to create data directory {}: {e}",
                    dir.display()
                ))
            }),
        _ => Ok(()),
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Parse a database row into a ServerRecord.
fn row_to_server(row: &SqliteRow) -> StorageResult<ServerRecord> {
    let column_err = |e: sqlx::Error| StorageError::internal(e.to_string());

    let tags_json: String = row.try_get("tags").map_err(column_err)?;
    let tags: Vec<String> = if tags_json.is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&tags_json)
            .map_err(|e| StorageError::internal(format!("failed to parse tags: {e}")))?
    };

    Ok(ServerRecord {
        id: row.try_get("id").map_err(column_err)?,
        name: row.try_get("name").map_err(column_err)?,
        description: row.try_get("description").map_err(column_err)?,
        version: row.try_get("version").map_err(column_err)?,
        repository: row.try_get("repository").map_err(column_err)?,
        author: row.try_get("author").map_err(column_err)?,
        tags,
        is_active: row.try_get("is_active").map_err(column_err)?,
        created_at: row.try_get("created_at").map_err(column_err)?,
    })
}

fn encode_tags(tags: &[String]) -> StorageResult<String> {
    serde_json::to_string(tags)
        .map_err(|e| StorageError::internal(format!("failed to serialize tags: {e}")))
}

/// Map a write failure, turning constraint violations into `AlreadyExists`.
fn map_write_error(operation: &'static str, id: &str, e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::AlreadyExists(id.to_string());
        }
    }
    StorageError::write(operation, e.to_string())
}

// =============================================================================
// StorageBackend Implementation
// =============================================================================

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn get_all(&self) -> StorageResult<Vec<ServerRecord>> {
        self.timed("get_all", async {
            let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC");
            self.fetch_many("get_all", sqlx::query(&sql)).await
        })
        .await
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<ServerRecord> {
        if id.is_empty() {
            return Err(StorageError::InvalidId);
        }

        self.timed("get_by_id", async {
            let server = self
                .fetch_by_id("get_by_id", id)
                .await?
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

            // Postcondition
            assert_eq!(server.id, id, "returned server must match requested id");
            Ok(server)
        })
        .await
    }

    async fn create(&self, mut server: ServerRecord) -> StorageResult<ServerRecord> {
        validate_server(&server)?;

        self.timed("create", async move {
            if self.fetch_by_id("create", &server.id).await?.is_some() {
                return Err(StorageError::AlreadyExists(server.id));
            }

            let tags_json = encode_tags(&server.tags)?;
            if server.created_at.is_empty() {
                server.created_at = self.clock.timestamp();
            }

            sqlx::query(
                r#"
                INSERT INTO servers (id, name, name_lower, description, version, repository, author, tags, is_active, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&server.id)
            .bind(&server.name)
            .bind(server.name.to_lowercase())
            .bind(&server.description)
            .bind(&server.version)
            .bind(&server.repository)
            .bind(&server.author)
            .bind(&tags_json)
            .bind(server.is_active)
            .bind(&server.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("create", &server.id, e))?;

            tracing::debug!(id = %server.id, name = %server.name, "server created");
            Ok(server)
        })
        .await
    }

    async fn update(&self, mut server: ServerRecord) -> StorageResult<ServerRecord> {
        validate_server(&server)?;

        self.timed("update", async move {
            let existing = self
                .fetch_by_id("update", &server.id)
                .await?
                .ok_or_else(|| StorageError::NotFound(server.id.clone()))?;

            server.created_at = existing.created_at;
            let tags_json = encode_tags(&server.tags)?;

            let result = sqlx::query(
                r#"
                UPDATE servers
                SET name = ?, name_lower = ?, description = ?, version = ?, repository = ?, author = ?,
                    tags = ?, is_active = ?, updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(&server.name)
            .bind(server.name.to_lowercase())
            .bind(&server.description)
            .bind(&server.version)
            .bind(&server.repository)
            .bind(&server.author)
            .bind(&tags_json)
            .bind(server.is_active)
            .bind(&server.id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("update", &server.id, e))?;

            if result.rows_affected() == 0 {
                return Err(StorageError::NotFound(server.id));
            }

            tracing::debug!(id = %server.id, "server updated");
            Ok(server)
        })
        .await
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        if id.is_empty() {
            return Err(StorageError::InvalidId);
        }

        self.timed("delete", async {
            let result = sqlx::query("DELETE FROM servers WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::write("delete", e.to_string()))?;

            if result.rows_affected() == 0 {
                return Err(StorageError::NotFound(id.to_string()));
            }

            tracing::debug!(id, "server deleted");
            Ok(())
        })
        .await
    }

    async fn search(&self, query: &str) -> StorageResult<Vec<ServerRecord>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let query_lower = query.to_lowercase();
        self.timed("search", async {
            let sql = format!(
                "{SELECT_COLUMNS} WHERE instr(name_lower, ?) > 0 ORDER BY created_at DESC, rowid DESC"
            );
            self.fetch_many("search", sqlx::query(&sql).bind(query_lower.as_str()))
                .await
        })
        .await
    }

    async fn count(&self) -> StorageResult<ServerCount> {
        self.timed("count", async {
            let (total, active): (i64, i64) = sqlx::query_as(
                r#"
                SELECT
                    COUNT(*) AS total,
                    COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0) AS active
                FROM servers
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::read("count", e.to_string()))?;

            let to_usize = |n: i64| {
                usize::try_from(n).map_err(|_| StorageError::internal(format!("negative count {n}")))
            };
            let count = ServerCount {
                total: to_usize(total)?,
                active: to_usize(active)?,
            };

            // Postcondition
            assert!(count.active <= count.total, "active exceeds total");
            Ok(count)
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> SqliteConfig {
        SqliteConfig::new(dir.path().join("data").join("registry.db")).with_pool(4, 1)
    }

    async fn open_temp() -> (TempDir, SqliteBackend) {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::open(test_config(&dir)).await.unwrap();
        (dir, backend)
    }

    fn test_server(id: &str, name: &str) -> ServerRecord {
        ServerRecord::new(id, name, "1.0.0")
            .with_description("Test server")
            .with_repository("https://github.com/test/server")
            .with_author("Test Author")
            .with_tags(["alpha", "beta"])
    }

    #[tokio::test]
    async fn test_open_creates_directory_and_single_migration_row() {
        let (dir, backend) = open_temp().await;

        assert!(dir.path().join("data").join("registry.db").exists());
        assert_eq!(backend.schema_versions().await.unwrap(), vec![1]);

        backend.close().await;
    }

    #[tokio::test]
    async fn test_reopen_keeps_data_and_does_not_reapply_migration() {
        let dir = TempDir::new().unwrap();

        let backend = SqliteBackend::open(test_config(&dir)).await.unwrap();
        backend.create(test_server("1", "persisted")).await.unwrap();
        backend.close().await;

        let reopened = SqliteBackend::open(test_config(&dir)).await.unwrap();
        assert_eq!(reopened.schema_versions().await.unwrap(), vec![1]);
        assert_eq!(reopened.get_by_id("1").await.unwrap().name, "persisted");
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let (_dir, backend) = open_temp().await;

        let server = test_server("1", "filesystem-server").with_active(false);
        let stored = backend.create(server.clone()).await.unwrap();
        assert!(!stored.created_at.is_empty());

        let found = backend.get_by_id("1").await.unwrap();
        assert_eq!(found.clone().with_created_at(""), server);
        assert_eq!(found.tags, vec!["alpha", "beta"], "tag order preserved");

        backend.delete("1").await.unwrap();
        assert!(backend.get_by_id("1").await.unwrap_err().is_not_found());
        assert!(backend.delete("1").await.unwrap_err().is_not_found());

        backend.close().await;
    }

    #[tokio::test]
    async fn test_invalid_ids_and_validation() {
        let (_dir, backend) = open_temp().await;

        assert!(matches!(backend.get_by_id("").await, Err(StorageError::InvalidId)));
        assert!(matches!(backend.delete("").await, Err(StorageError::InvalidId)));

        let err = backend.create(ServerRecord::new("", "", "")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation failed: id: is required, name: is required, version: is required"
        );

        backend.close().await;
    }

    #[tokio::test]
    async fn test_duplicate_id_and_name() {
        let (_dir, backend) = open_temp().await;
        backend.create(test_server("1", "a")).await.unwrap();

        assert!(backend
            .create(test_server("1", "other"))
            .await
            .unwrap_err()
            .is_already_exists());
        assert!(backend
            .create(test_server("2", "a"))
            .await
            .unwrap_err()
            .is_already_exists());

        assert_eq!(backend.count().await.unwrap().total, 1);
        backend.close().await;
    }

    #[tokio::test]
    async fn test_update_preserves_created_at() {
        let (_dir, backend) = open_temp().await;
        backend
            .create(test_server("1", "a").with_created_at("2024-01-01T00:00:00Z"))
            .await
            .unwrap();

        let stored = backend
            .update(
                test_server("1", "renamed")
                    .with_tags(["gamma"])
                    .with_created_at("1999-01-01T00:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(stored.created_at, "2024-01-01T00:00:00Z");

        let found = backend.get_by_id("1").await.unwrap();
        assert_eq!(found.name, "renamed");
        assert_eq!(found.tags, vec!["gamma"]);
        assert_eq!(found.created_at, "2024-01-01T00:00:00Z");

        assert!(backend
            .update(test_server("ghost", "g"))
            .await
            .unwrap_err()
            .is_not_found());

        backend.close().await;
    }

    #[tokio::test]
    async fn test_get_all_newest_first() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(SimClock::at_ms(1_700_000_000_000));
        let backend = SqliteBackend::open_with_clock(test_config(&dir), clock.clone())
            .await
            .unwrap();

        backend.create(test_server("a", "first")).await.unwrap();
        clock.advance_secs(10);
        backend.create(test_server("b", "second")).await.unwrap();
        clock.advance_secs(10);
        backend.create(test_server("c", "third")).await.unwrap();

        let names: Vec<String> = backend
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["third", "second", "first"]);

        backend.close().await;
    }

    #[tokio::test]
    async fn test_search() {
        let (_dir, backend) = open_temp().await;
        for (id, name) in [
            ("1", "filesystem-server"),
            ("2", "web-server"),
            ("3", "database-server"),
            ("4", "file-processor"),
            ("5", "100%_coverage"),
        ] {
            backend.create(test_server(id, name)).await.unwrap();
        }

        assert!(backend.search("").await.unwrap().is_empty());
        assert_eq!(backend.search("serv").await.unwrap().len(), 3);
        assert_eq!(backend.search("FILE").await.unwrap().len(), 2);

        let mut names: Vec<String> = backend
            .search("file")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["file-processor", "filesystem-server"]);

        let literal = backend.search("%_").await.unwrap();
        assert_eq!(literal.len(), 1, "wildcards match literally");
        assert_eq!(literal[0].name, "100%_coverage");

        backend.close().await;
    }

    #[tokio::test]
    async fn test_search_folds_unicode_case() {
        let (_dir, backend) = open_temp().await;
        backend.create(test_server("1", "Ärzte-Server")).await.unwrap();
        backend.create(test_server("2", "ÉCOLE-tools")).await.unwrap();

        let found = backend.search("ärzte").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Ärzte-Server", "stored name keeps its case");
        assert_eq!(backend.search("école").await.unwrap().len(), 1);

        backend
            .update(test_server("1", "Übersetzer"))
            .await
            .unwrap();
        assert!(backend.search("ärzte").await.unwrap().is_empty());
        assert_eq!(backend.search("ÜBERS").await.unwrap().len(), 1);

        backend.close().await;
    }

    #[tokio::test]
    async fn test_search_newest_first() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(SimClock::at_ms(1_700_000_000_000));
        let backend = SqliteBackend::open_with_clock(test_config(&dir), clock.clone())
            .await
            .unwrap();

        backend.create(test_server("a", "file-alpha")).await.unwrap();
        clock.advance_secs(10);
        backend.create(test_server("b", "web-beta")).await.unwrap();
        clock.advance_secs(10);
        backend.create(test_server("c", "file-gamma")).await.unwrap();
        // Same second as file-gamma; the later insert comes first.
        backend.create(test_server("d", "file-delta")).await.unwrap();

        let names: Vec<String> = backend
            .search("file")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["file-delta", "file-gamma", "file-alpha"]);

        backend.close().await;
    }

    #[tokio::test]
    async fn test_count() {
        let (_dir, backend) = open_temp().await;
        assert_eq!(backend.count().await.unwrap(), ServerCount::default());

        backend.create(test_server("1", "a")).await.unwrap();
        backend
            .create(test_server("2", "b").with_active(false))
            .await
            .unwrap();

        assert_eq!(
            backend.count().await.unwrap(),
            ServerCount { total: 2, active: 1 }
        );
        backend.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_same_id() {
        const ATTEMPTS: usize = 16;
        let (_dir, backend) = open_temp().await;
        let backend = Arc::new(backend);

        let handles: Vec<_> = (0..ATTEMPTS)
            .map(|i| {
                let backend = backend.clone();
                tokio::spawn(async move {
                    backend
                        .create(test_server("contested", &format!("name-{i}")))
                        .await
                })
            })
            .collect();

        let results = futures::future::join_all(handles).await;
        let successes = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(e)) if e.is_already_exists()))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(duplicates, ATTEMPTS - 1);
        assert_eq!(backend.count().await.unwrap().total, 1);
        backend.close().await;
    }

    #[tokio::test]
    async fn test_operation_timeout() {
        let (_dir, mut backend) = open_temp().await;
        backend.operation_timeout = Duration::from_millis(20);

        let result: StorageResult<()> = backend
            .timed("probe", std::future::pending::<StorageResult<()>>())
            .await;

        assert!(matches!(
            result,
            Err(StorageError::Timeout {
                operation: "probe",
                timeout_ms: 20
            })
        ));
        backend.close().await;
    }
}
