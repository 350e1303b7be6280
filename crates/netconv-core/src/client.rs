//! HTTP client policies.
//!
//! The retry and pagination policies are plain `Copy` records. The client
//! facade applies them in one place instead of every call site repeating its
//! own loop.

use std::time::Duration;

/// Default total time budget for one facade call, retries included (seconds)
pub const DEFAULT_RETRY_TIMEOUT: u64 = 120;

/// Default number of re-issues after the first attempt
pub const DEFAULT_RETRIES: u32 = 3;

/// Default pause between attempts (seconds)
pub const DEFAULT_RETRY_INTERVAL: u64 = 10;

/// Default per-request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Default list page size
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Default safety bound for draining one paginated listing (seconds)
pub const DEFAULT_PAGINATION_MAX_TIMEOUT: u64 = 600;

/// Default number of pools submitted per create batch
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Retry policy bounded by both an attempt count and a wall-clock budget.
///
/// A call is re-issued while both budgets have quota left; whichever runs
/// out first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total time budget across all attempts
    pub timeout: Duration,

    /// Number of re-issues after the first attempt
    pub retries: u32,

    /// Pause between attempts
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_RETRY_TIMEOUT),
            retries: DEFAULT_RETRIES,
            interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL),
        }
    }

    /// Set the total time budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retries.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the pause between attempts.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Decide whether another attempt may be issued.
    ///
    /// `attempts_made` counts every attempt so far, the first one included.
    /// `elapsed` is the time spent since the first attempt started. The next
    /// attempt must start (after `interval`) before the time budget expires.
    #[must_use]
    pub fn allows_another(&self, attempts_made: u32, elapsed: Duration) -> bool {
        if attempts_made > self.retries {
            return false;
        }
        elapsed.saturating_add(self.interval) < self.timeout
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// How list endpoints are drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    /// Requested page size; a shorter page ends the listing
    pub page_size: u32,

    /// Safety bound for the whole drain
    pub max_timeout: Duration,
}

impl PaginationPolicy {
    /// Create a pagination policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_timeout: Duration::from_secs(DEFAULT_PAGINATION_MAX_TIMEOUT),
        }
    }

    /// Set the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the safety bound.
    #[must_use]
    pub const fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings for the underlying HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout
    pub timeout: Duration,

    /// Idle timeout of pooled connections
    pub pool_idle_timeout: Duration,

    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,

    /// Verify the controller's TLS certificate
    pub tls_verify: bool,
}

impl ClientConfig {
    /// Defaults: 30 s per request, TLS verified.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            tls_verify: true,
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the idle timeout of pooled connections.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set the idle connections kept per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
