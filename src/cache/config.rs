//! Entity cache configuration.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ENTRY_LIMIT: usize = 500;
const DEFAULT_TTL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum documents kept before the least recently read is evicted.
    pub entry_limit: usize,
    /// Age after which a non-forced lookup goes back to the network.
    pub ttl: Duration,
    /// Where the liked set is persisted; `None` keeps it in memory only.
    pub liked_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_limit: DEFAULT_ENTRY_LIMIT,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            liked_path: None,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            entry_limit: settings.entry_limit.get(),
            ttl: settings.ttl,
            liked_path: settings.liked_path.clone(),
        }
    }
}

impl CacheConfig {
    /// Entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
