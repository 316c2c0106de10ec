use std::time::Duration;

use settings_core::{SettingsError, SettingsResult};

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Expiration policy for the cached overlay entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheTtl {
    /// Entry never expires; invalidation is explicit.
    Forever,
    Ttl(Duration),
}

impl CacheTtl {
    pub fn from_secs(secs: u64) -> Self {
        CacheTtl::Ttl(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            CacheTtl::Forever => None,
            CacheTtl::Ttl(duration) => Some(*duration),
        }
    }
}

/// Cache key, TTL, and backend-call timeout for one overlay.
///
/// The key implicitly versions the serialized entry format: rename the key
/// when the cached shape changes so stale entries are never misread.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    key: String,
    ttl: CacheTtl,
    op_timeout: Duration,
}

impl CachePolicy {
    pub fn new(key: impl Into<String>, ttl: CacheTtl) -> SettingsResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(SettingsError::Configuration(
                "Cache key must not be empty".to_string(),
            ));
        }
        if let CacheTtl::Ttl(duration) = &ttl {
            if duration.is_zero() {
                return Err(SettingsError::Configuration(
                    "Cache TTL must be positive; use CacheTtl::Forever for no expiry".to_string(),
                ));
            }
        }

        Ok(Self {
            key,
            ttl,
            op_timeout: DEFAULT_OP_TIMEOUT,
        })
    }

    /// Bound on each individual storage/cache call made by the overlay.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> &CacheTtl {
        &self.ttl
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }
}
