//! Time source for schedule windows and feature expiry.
//!
//! Evaluators read "now" through a [`Clock`] so that window boundaries can be
//! exercised exactly in tests. Production code uses [`SystemClock`].

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// Supplies the current UTC instant.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a settable instant.
///
/// Clones share the same instant, so a test can hand one clone to an engine
/// and move time forward through another.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use flagwise::clock::{Clock, FixedClock};
///
/// let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
/// clock.advance(chrono::Duration::hours(1));
/// assert_eq!(clock.now(), Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    instant: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(RwLock::new(instant)),
        }
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.instant.write().unwrap_or_else(|e| e.into_inner());
        *guard = instant;
    }

    /// Moves the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.instant.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared handle to the default clock.
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
