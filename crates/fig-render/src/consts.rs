//! Default tuning for the orchestrator.

use std::time::Duration;

/// Default per-attempt HTTP timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default attempts per transport strategy.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default base backoff delay between retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Default cache capacity (entries).
pub const DEFAULT_CACHE_ENTRIES: usize = 100;

/// Default cache entry age bound.
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(3600);
