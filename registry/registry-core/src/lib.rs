//! Registry Core - Storage Engine for the MCP Server Registry
//!
//! TigerStyle: one storage contract, many backends, identical behavior.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Registry Core                  │
//! ├─────────────────────────────────────────────┤
//! │  Validator            │ Aggregated errors   │
//! │  StorageBackend       │ CRUD/search/count   │
//! │    MemoryBackend      │ RwLock<BTreeMap>    │
//! │    SqliteBackend      │ sqlx pool + timeout │
//! │  Seed Loader          │ Best-effort import  │
//! ├─────────────────────────────────────────────┤
//! │  Clock                │ System / simulated  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use registry_core::{MemoryBackend, ServerRecord, StorageBackend};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> registry_core::StorageResult<()> {
//! let store = MemoryBackend::new();
//! store.create(ServerRecord::new("1", "filesystem-server", "1.0.0")).await?;
//!
//! let found = store.get_by_id("1").await?;
//! assert!(!found.created_at.is_empty());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod constants;
pub mod seed;
pub mod storage;

// Re-export common types
pub use clock::{Clock, SharedClock, SimClock, SystemClock};
pub use constants::*;
pub use seed::{seed_store, SeedReport, SeedSource};
pub use storage::{
    validate_server, MemoryBackend, ServerCount, ServerRecord, StorageBackend, StorageError,
    StorageResult, ValidationError, ValidationErrors,
};

#[cfg(feature = "sqlite")]
pub use storage::{SqliteBackend, SqliteConfig};
