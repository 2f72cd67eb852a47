//! Process-wide bearer token cache for the gateway.
//!
//! One [`TokenCache`] is created per process and shared (`Arc`) by every
//! gateway provider. A token is fetched on first use and reused until its
//! fixed lifetime runs out; there is no revoke path. Concurrent misses are
//! collapsed so only one authentication exchange runs at a time.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

/// A cached token and when it stops being served.
#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// TTL cache of the gateway bearer token.
#[derive(Debug)]
pub struct TokenCache {
    /// Lifetime of a cached token.
    ttl: Duration,
    /// Cache state (`RwLock` for read-heavy workload).
    state: RwLock<Option<CachedToken>>,
    /// Held while authenticating.
    refresh: Mutex<()>,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    /// Lifetime of a cached token (60 minutes).
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

    /// Creates an empty cache with [`Self::DEFAULT_TTL`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Self::DEFAULT_TTL)
    }

    /// Creates an empty cache with a custom TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Returns the cached token if it has not expired.
    pub async fn get(&self) -> Option<String> {
        let guard = self.state.read().await;
        let cached = guard.as_ref()?;
        if Instant::now() < cached.expires_at {
            Some(cached.value.clone())
        } else {
            None
        }
    }

    /// Stores a token with the configured TTL.
    pub async fn set(&self, value: String) {
        let mut guard = self.state.write().await;
        *guard = Some(CachedToken {
            value,
            expires_at: Instant::now() + self.ttl,
        });
    }

    /// Returns the cached token, running `authenticate` on a miss.
    ///
    /// Callers racing on a miss wait for the first one's result instead of
    /// authenticating again.
    ///
    /// # Errors
    ///
    /// Returns whatever `authenticate` fails with; nothing is cached then.
    pub async fn get_or_authenticate<F, Fut, E>(&self, authenticate: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(token) = self.get().await {
            return Ok(token);
        }
        let _refreshing = self.refresh.lock().await;
        if let Some(token) = self.get().await {
            return Ok(token);
        }
        tracing::info!("bankgate.token_cache_miss");
        let token = authenticate().await?;
        self.set(token.clone()).await;
        Ok(token)
    }
}
