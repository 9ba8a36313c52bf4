//! Storage - Backend Trait and Implementations
//!
//! TigerStyle: one contract, identical behavior across backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageBackend Trait                      │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                              ↑
//!          │                              │
//! ┌────────┴────────┐           ┌────────┴────────┐
//! │  MemoryBackend  │           │  SqliteBackend  │
//! │ (RwLock<map>)   │           │    (durable)    │
//! └─────────────────┘           └─────────────────┘
//! ```
//!
//! Both backends validate before touching state, return owned copies, and
//! report the same [`StorageError`] variants for the same situations.

mod backend;
mod error;
mod memory;
mod record;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use record::{validate_server, ServerCount, ServerRecord, ValidationError, ValidationErrors};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteBackend, SqliteConfig};
