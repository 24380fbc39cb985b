//! Access Token Cache
//!
//! WeCom access tokens live for two hours. The cache reuses a token while
//! its expiry is more than a safety margin away and otherwise refreshes and
//! replaces it. Refreshing is idempotent, so concurrent refreshes are allowed.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// A bearer credential and the instant it stops being valid.
#[derive(Clone)]
pub struct CachedToken {
    pub credential: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Token issued at `now` that lives for `expires_in_secs`.
    pub fn issued_at(credential: String, now: DateTime<Utc>, expires_in_secs: i64) -> Self {
        Self {
            credential,
            expires_at: now + TimeDelta::seconds(expires_in_secs),
        }
    }

    /// Whether the token can still be used at `now` with `margin` to spare.
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: TimeDelta) -> bool {
        self.expires_at > now + margin
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("credential", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Single-slot cache for the application access token.
pub struct AccessTokenCache {
    slot: RwLock<Option<CachedToken>>,
    margin: TimeDelta,
}

impl AccessTokenCache {
    pub fn new(margin: TimeDelta) -> Self {
        Self {
            slot: RwLock::new(None),
            margin,
        }
    }

    /// Return the cached credential, refreshing it first if it is stale.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedToken, E>>,
    {
        self.get_or_refresh_at(Utc::now(), refresh).await
    }

    /// [`Self::get_or_refresh`] evaluated at a given instant.
    pub async fn get_or_refresh_at<F, Fut, E>(
        &self,
        now: DateTime<Utc>,
        refresh: F,
    ) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedToken, E>>,
    {
        if let Some(token) = self
            .slot
            .read()
            .await
            .as_ref()
            .filter(|t| t.is_fresh(now, self.margin))
        {
            debug!("Using cached access token");
            return Ok(token.credential.clone());
        }

        let fresh = refresh().await?;
        debug!(expires_at = %fresh.expires_at, "Access token refreshed");
        let credential = fresh.credential.clone();
        *self.slot.write().await = Some(fresh);
        Ok(credential)
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }
}

impl fmt::Debug for AccessTokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenCache")
            .field("margin", &self.margin)
            .finish_non_exhaustive()
    }
}
