//! Clock - Injectable Time Source
//!
//! TigerStyle: the store never calls `Utc::now()` directly.
//!
//! Backends stamp `created_at` through a [`Clock`]. Production code uses
//! [`SystemClock`]; tests use [`SimClock`], which only moves when told to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::constants::{SIM_TIME_ADVANCE_MS_MAX, TIME_MS_PER_SEC};

/// Source of "now" for timestamping records.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current instant rendered the way records store it.
    fn timestamp(&self) -> String {
        format_timestamp(self.now())
    }
}

/// Clock shared between a backend and its callers.
pub type SharedClock = Arc<dyn Clock>;

/// Render an instant as RFC 3339 with second precision and a `Z` suffix.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// =============================================================================
// SystemClock
// =============================================================================

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// SimClock
// =============================================================================

/// A simulated clock for deterministic testing.
///
/// TigerStyle:
/// - Time only moves forward
/// - All time operations are explicit
/// - No reliance on system time
///
/// Interior atomics let one clock be shared by a backend and the test
/// driving it.
#[derive(Debug, Default)]
pub struct SimClock {
    /// Current time in milliseconds since the Unix epoch
    current_ms: AtomicU64,
}

impl SimClock {
    /// Create a clock starting at the epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::at_ms(0)
    }

    /// Create a clock starting at the given time.
    ///
    /// # Example
    /// ```
    /// use registry_core::{Clock, SimClock};
    /// let clock = SimClock::at_ms(1_700_000_000_000);
    /// assert_eq!(clock.timestamp(), "2023-11-14T22:13:20Z");
    /// ```
    #[must_use]
    pub fn at_ms(start_ms: u64) -> Self {
        Self {
            current_ms: AtomicU64::new(start_ms),
        }
    }

    /// Get current time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    /// Get current time in seconds (truncated).
    #[must_use]
    pub fn now_secs(&self) -> u64 {
        self.now_ms() / TIME_MS_PER_SEC
    }

    /// Advance time by the given milliseconds.
    ///
    /// # Panics
    /// Panics if ms exceeds `SIM_TIME_ADVANCE_MS_MAX`.
    ///
    /// # Returns
    /// The new current time.
    pub fn advance_ms(&self, ms: u64) -> u64 {
        // Precondition
        assert!(
            ms <= SIM_TIME_ADVANCE_MS_MAX,
            "advance_ms({}) exceeds max ({})",
            ms,
            SIM_TIME_ADVANCE_MS_MAX
        );

        let old_time = self.current_ms.fetch_add(ms, Ordering::SeqCst);
        let new_time = old_time.saturating_add(ms);

        // Postcondition
        assert!(new_time >= old_time, "time must not go backwards");

        new_time
    }

    /// Advance time by whole seconds.
    pub fn advance_secs(&self, secs: u64) -> u64 {
        self.advance_ms(secs * TIME_MS_PER_SEC)
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = i64::try_from(self.now_ms()).unwrap_or(i64::MAX);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or_default()
    }
}
