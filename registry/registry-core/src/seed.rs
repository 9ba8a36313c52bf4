//! Seed Loader - Bootstrap an Empty Registry
//!
//! TigerStyle: Tolerant input, explicit report.
//!
//! The dataset is a JSON array of externally-authored descriptors with a
//! nested shape (`repository.url`, `version_detail.version`, `packages[]`).
//! Each entry is flattened into a [`ServerRecord`]. A missing or malformed
//! dataset never fails startup: three built-in records are loaded instead.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::constants::{
    SEED_AUTHOR_HOST_MARKER, SEED_AUTHOR_UNKNOWN, SEED_REGISTRY_NAME_UNKNOWN, SEED_TAGS_FIXED,
};
use crate::storage::{ServerRecord, StorageBackend, StorageResult};

// =============================================================================
// Dataset Shape
// =============================================================================

// Fields may be absent or explicitly `null`; both read as the empty value.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeedServer {
    #[serde(deserialize_with = "null_as_default")]
    id: String,
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    description: String,
    #[serde(deserialize_with = "null_as_default")]
    repository: SeedRepository,
    #[serde(deserialize_with = "null_as_default")]
    version_detail: SeedVersionDetail,
    #[serde(deserialize_with = "null_as_default")]
    packages: Vec<Option<SeedPackage>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeedRepository {
    #[serde(deserialize_with = "null_as_default")]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeedVersionDetail {
    #[serde(deserialize_with = "null_as_default")]
    version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeedPackage {
    #[serde(deserialize_with = "null_as_default")]
    registry_name: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Report
// =============================================================================

/// Where the seeded records came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    /// Parsed from the dataset at this path
    File(PathBuf),
    /// Dataset unusable; built-in records loaded
    Fallback,
    /// Store already populated; nothing loaded
    Skipped,
}

impl fmt::Display for SeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Fallback => write!(f, "fallback"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Outcome of one seeding pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// Origin of the records
    pub source: SeedSource,
    /// Records created
    pub loaded: usize,
    /// Dataset entries that could not be decoded or were rejected by the store
    pub skipped: usize,
}

// =============================================================================
// Transformation
// =============================================================================

/// Owner segment of a GitHub repository URL.
///
/// `https://github.com/acme/tool` yields `acme`; anything without a
/// non-empty segment after `github.com/` yields `Unknown`.
#[must_use]
pub fn extract_author(repository_url: &str) -> String {
    repository_url
        .find(SEED_AUTHOR_HOST_MARKER)
        .map(|at| &repository_url[at + SEED_AUTHOR_HOST_MARKER.len()..])
        .and_then(|rest| rest.split('/').next())
        .filter(|owner| !owner.is_empty())
        .map_or_else(|| SEED_AUTHOR_UNKNOWN.to_string(), str::to_string)
}

fn seed_record(seed: SeedServer) -> ServerRecord {
    let tags = seed
        .packages
        .into_iter()
        .flatten()
        .map(|p| p.registry_name)
        .filter(|name| !name.is_empty() && name != SEED_REGISTRY_NAME_UNKNOWN)
        .chain(SEED_TAGS_FIXED.iter().map(|t| (*t).to_string()));

    let author = extract_author(&seed.repository.url);

    ServerRecord::new(seed.id, seed.name, seed.version_detail.version)
        .with_description(seed.description)
        .with_repository(seed.repository.url)
        .with_author(author)
        .with_tags(tags)
}

fn fallback_servers() -> Vec<ServerRecord> {
    vec![
        ServerRecord::new("1", "filesystem-server", "1.0.0")
            .with_description("A server for accessing local filesystem")
            .with_repository("https://github.com/example/filesystem-server")
            .with_author("Jane Doe")
            .with_tags(["filesystem", "local", "files"]),
        ServerRecord::new("2", "web-scraper-server", "2.1.0")
            .with_description("A server for web scraping operations")
            .with_repository("https://github.com/example/web-scraper")
            .with_author("John Smith")
            .with_tags(["web", "scraping", "http"]),
        ServerRecord::new("3", "database-server", "1.5.2")
            .with_description("A server for database operations")
            .with_repository("https://github.com/example/database-server")
            .with_author("Alice Johnson")
            .with_tags(["database", "sql", "storage"])
            .with_active(false),
    ]
}

/// Read the dataset as an array, decoding each entry on its own.
///
/// The outer `Err` means the file is unusable; an inner `Err` describes one
/// entry that could not be decoded.
async fn read_dataset(path: &Path) -> Result<Vec<Result<ServerRecord, String>>, String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

    let entries: Vec<Value> = serde_json::from_slice(&bytes)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value::<SeedServer>(entry)
                .map(seed_record)
                .map_err(|e| format!("entry {index}: {e}"))
        })
        .collect())
}

// =============================================================================
// Loader
// =============================================================================

/// Populate `store` from the dataset at `path` if the store is empty.
///
/// # Errors
/// Only fails if the store cannot report its size. An unreadable file or a
/// non-array document falls back to built-in records; undecodable entries
/// and per-record create failures are logged and counted in `skipped`.
pub async fn seed_store(store: &dyn StorageBackend, path: &Path) -> StorageResult<SeedReport> {
    let existing = store.count().await?;
    if existing.total > 0 {
        tracing::info!(
            existing = existing.total,
            backend = store.backend_name(),
            "store already populated, skipping seed"
        );
        return Ok(SeedReport {
            source: SeedSource::Skipped,
            loaded: 0,
            skipped: 0,
        });
    }

    let (source, entries) = match read_dataset(path).await {
        Ok(entries) => (SeedSource::File(path.to_path_buf()), entries),
        Err(reason) => {
            tracing::warn!(%reason, "seed dataset unusable, loading fallback records");
            (
                SeedSource::Fallback,
                fallback_servers().into_iter().map(Ok).collect(),
            )
        }
    };

    let mut loaded = 0;
    let mut skipped = 0;
    for entry in entries {
        let record = match entry {
            Ok(record) => record,
            Err(reason) => {
                tracing::warn!(%reason, "skipping malformed seed entry");
                skipped += 1;
                continue;
            }
        };
        let name = record.name.clone();
        match store.create(record).await {
            Ok(_) => loaded += 1,
            Err(e) => {
                tracing::warn!(%name, error = %e, "skipping seed record");
                skipped += 1;
            }
        }
    }

    tracing::info!(%source, loaded, skipped, backend = store.backend_name(), "seed complete");

    Ok(SeedReport {
        source,
        loaded,
        skipped,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use tempfile::TempDir;

    const DATASET: &str = r#"[
        {
            "id": "a1",
            "name": "github-tools",
            "description": "GitHub integration",
            "repository": {"url": "https://github.com/acme/github-tools", "source": "github", "id": "x"},
            "version_detail": {"version": "0.3.1", "release_date": "2025-05-16", "is_latest": true},
            "packages": [
                {"registry_name": "npm", "name": "@acme/github-tools", "version": "0.3.1"},
                {"registry_name": "unknown", "name": "x", "version": "0"},
                {"registry_name": "", "name": "y", "version": "0"},
                {"registry_name": "docker", "name": "acme/tools", "version": "0.3.1"}
            ]
        },
        {
            "id": "b2",
            "name": "gitlab-only",
            "repository": {"url": "https://gitlab.com/acme/thing"},
            "version_detail": {"version": "1.0.0"}
        },
        {
            "id": "c3",
            "name": "unversioned"
        }
    ]"#;

    fn write_dataset(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("seed.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_extract_author() {
        assert_eq!(extract_author("https://github.com/acme/tool"), "acme");
        assert_eq!(extract_author("github.com/solo"), "solo");
        assert_eq!(extract_author("https://gitlab.com/acme/tool"), "Unknown");
        assert_eq!(extract_author("https://github.com/"), "Unknown");
        assert_eq!(extract_author(""), "Unknown");
    }

    #[test]
    fn test_seed_record_transformation() {
        let seeds: Vec<SeedServer> = serde_json::from_str(DATASET).unwrap();
        let record = seed_record(seeds.into_iter().next().unwrap());

        assert_eq!(record.id, "a1");
        assert_eq!(record.version, "0.3.1");
        assert_eq!(record.repository, "https://github.com/acme/github-tools");
        assert_eq!(record.author, "acme");
        assert_eq!(record.tags, vec!["npm", "docker", "mcp", "server"]);
        assert!(record.is_active);
        assert!(record.created_at.is_empty(), "store stamps created_at");
    }

    #[tokio::test]
    async fn test_seed_from_file_skips_invalid_records() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, DATASET);
        let store = MemoryBackend::new();

        let report = seed_store(&store, &path).await.unwrap();

        assert_eq!(report.source, SeedSource::File(path));
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped, 1, "entry without version fails validation");
        assert_eq!(store.get_by_id("b2").await.unwrap().author, "Unknown");
        assert_eq!(
            store.get_by_id("b2").await.unwrap().tags,
            vec!["mcp", "server"]
        );
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let store = MemoryBackend::new();

        let report = seed_store(&store, &dir.path().join("absent.json"))
            .await
            .unwrap();

        assert_eq!(report.source, SeedSource::Fallback);
        assert_eq!(report.loaded, 3);
        let count = store.count().await.unwrap();
        assert_eq!((count.total, count.active), (3, 2));
        assert!(!store.get_by_id("3").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_malformed_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, "{ not json");
        let store = MemoryBackend::new();

        let report = seed_store(&store, &path).await.unwrap();

        assert_eq!(report.source, SeedSource::Fallback);
        assert_eq!(store.get_by_id("2").await.unwrap().name, "web-scraper-server");
    }

    #[tokio::test]
    async fn test_null_fields_and_bad_entries_do_not_drop_dataset() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            r#"[
                {"id": "a", "name": "alpha", "version_detail": {"version": "1.0.0"},
                 "repository": {"url": "https://github.com/acme/alpha"}},
                {"id": "b", "name": "beta", "version_detail": {"version": "2.0.0"},
                 "packages": null, "repository": null, "description": null},
                {"id": "c", "name": "gamma", "version_detail": {"version": "3.0.0"},
                 "packages": [null, {"registry_name": null}, {"registry_name": "pypi"}]},
                {"id": "d", "name": 42, "version_detail": {"version": "1"}},
                "not an object"
            ]"#,
        );
        let store = MemoryBackend::new();

        let report = seed_store(&store, &path).await.unwrap();

        assert_eq!(report.source, SeedSource::File(path));
        assert_eq!(report.loaded, 3);
        assert_eq!(report.skipped, 2, "wrongly typed entries are skipped");

        assert_eq!(store.get_by_id("a").await.unwrap().author, "acme");
        let beta = store.get_by_id("b").await.unwrap();
        assert_eq!(beta.author, "Unknown");
        assert!(beta.description.is_empty());
        assert_eq!(beta.tags, vec!["mcp", "server"]);
        assert_eq!(
            store.get_by_id("c").await.unwrap().tags,
            vec!["pypi", "mcp", "server"]
        );
        assert!(store.get_by_id("1").await.unwrap_err().is_not_found(), "no fallback");
    }

    #[tokio::test]
    async fn test_populated_store_is_not_reseeded() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, DATASET);
        let store = MemoryBackend::new();
        store
            .create(ServerRecord::new("existing", "existing", "1"))
            .await
            .unwrap();

        let report = seed_store(&store, &path).await.unwrap();

        assert_eq!(report.source, SeedSource::Skipped);
        assert_eq!(report.loaded, 0);
        assert_eq!(store.count().await.unwrap().total, 1);
    }
}
