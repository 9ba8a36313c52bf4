//! TigerStyle Constants
//!
//! Every limit and default lives here, named `THING_UNIT_MAX` / `_DEFAULT`.

// =============================================================================
// Time
// =============================================================================

/// Milliseconds per second
pub const TIME_MS_PER_SEC: u64 = 1_000;

/// Largest single step a simulated clock may take (one day)
pub const SIM_TIME_ADVANCE_MS_MAX: u64 = 24 * 60 * 60 * TIME_MS_PER_SEC;

// =============================================================================
// SQLite Backend
// =============================================================================

/// Default per-operation timeout for the durable backend
pub const SQLITE_OPERATION_TIMEOUT_MS_DEFAULT: u64 = 5_000;

/// Default maximum number of open pool connections
pub const SQLITE_CONNECTIONS_OPEN_MAX_DEFAULT: u32 = 25;

/// Default number of idle connections the pool keeps warm
pub const SQLITE_CONNECTIONS_IDLE_DEFAULT: u32 = 25;

/// Default connection lifetime before recycling, in minutes
pub const SQLITE_CONNECTION_LIFETIME_MINUTES_DEFAULT: u64 = 5;

/// Schema version written by the single migration
pub const SCHEMA_VERSION_CURRENT: i64 = 1;

// =============================================================================
// Seeding
// =============================================================================

/// Default location of the bundled seed dataset
pub const SEED_FILE_PATH_DEFAULT: &str = "data/seed_2025_05_16.json";

/// Tags appended to every imported record
pub const SEED_TAGS_FIXED: [&str; 2] = ["mcp", "server"];

/// Package registry name that carries no information
pub const SEED_REGISTRY_NAME_UNKNOWN: &str = "unknown";

/// Author used when the repository URL has no GitHub owner segment
pub const SEED_AUTHOR_UNKNOWN: &str = "Unknown";

/// Host marker preceding the owner segment in repository URLs
pub const SEED_AUTHOR_HOST_MARKER: &str = "github.com/";
