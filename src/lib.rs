//! MCP Registry - JSON HTTP API over pluggable storage
//!
//! Serves create/read/update/delete, search and count over server records
//! kept by a [`registry_core::StorageBackend`].
//!
//! Routes:
//! - `GET /health`
//! - `GET|POST /servers`
//! - `GET|PUT|DELETE /servers/:id`
//! - `GET /servers/count`
//! - `GET /servers/search?name=`
//! - `GET /debug/config` (development only)

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

pub use config::Config;
pub use error::ApiError;
pub use server::{build_app, open_store, seed, serve, AppState};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Application name
pub const APP_NAME: &str = "mcp-registry";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
