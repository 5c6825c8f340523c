//! Time source abstraction for session expiry.
//!
//! Session issuance and validation read the clock through `TimeSource` so
//! tests can move time past a token's expiry without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Abstraction over the wall clock.
pub trait TimeSource: Send + Sync {
    /// Get the current time in whole seconds since Unix epoch.
    fn now_secs(&self) -> u64;
}

/// Real time source using the system clock.
///
/// This is the default implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_secs(&self) -> u64 {
        // duration_since(UNIX_EPOCH) only fails if system time is before 1970.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }
}

/// A manually driven time source.
///
/// Time only moves when `advance` or `set` is called. Backed by an atomic so
/// it can be shared with a `SessionIssuer` behind an `Arc` while the test
/// keeps its own handle.
///
/// # Example
///
/// ```
/// use login_server::time::{ManualTimeSource, TimeSource};
///
/// let time = ManualTimeSource::new(1000);
/// assert_eq!(time.now_secs(), 1000);
///
/// time.advance(60);
/// assert_eq!(time.now_secs(), 1060);
/// ```
#[derive(Debug)]
pub struct ManualTimeSource {
    current_secs: AtomicU64,
}

impl ManualTimeSource {
    /// Create a time source frozen at `initial_secs`.
    #[must_use]
    pub const fn new(initial_secs: u64) -> Self {
        Self {
            current_secs: AtomicU64::new(initial_secs),
        }
    }

    /// Create a time source starting at `1_700_000_000` (November 2023).
    #[must_use]
    pub const fn default_start() -> Self {
        Self::new(1_700_000_000)
    }

    /// Advance time by `secs`, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let current = self.current_secs.load(Ordering::SeqCst);
        self.current_secs
            .store(current.saturating_add(secs), Ordering::SeqCst);
    }

    /// Set the current time. May move time backwards.
    pub fn set(&self, secs: u64) {
        self.current_secs.store(secs, Ordering::SeqCst);
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::default_start()
    }
}

impl TimeSource for ManualTimeSource {
    fn now_secs(&self) -> u64 {
        self.current_secs.load(Ordering::SeqCst)
    }
}
