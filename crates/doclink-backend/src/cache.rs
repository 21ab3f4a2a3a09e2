//! Accessible-items cache with TTL
//!
//! The listing is fetched lazily on first use and re-fetched when it has
//! expired or when the caller asks for a refresh.

use crate::backend::AccessibleItems;
use crate::error::BackendError;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Why a listing is fetched again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchReason {
    /// Nothing fetched yet
    Unpopulated,

    /// Populated, but older than the TTL
    Stale,

    /// Caller asked for a refresh
    Forced,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    items: AccessibleItems,
    created_at: Instant,
}

pub struct AccessibleItemsCache {
    entry: Mutex<Option<CacheEntry>>,
    ttl: Duration,
}

impl AccessibleItemsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Mutex::new(None),
            ttl,
        }
    }

    /// Why the next lookup would fetch, or `None` when the cached listing is used
    pub async fn refetch_reason(&self, refresh: bool) -> Option<RefetchReason> {
        let entry = self.entry.lock().await;
        Self::reason(entry.as_ref(), refresh, self.ttl)
    }

    fn reason(entry: Option<&CacheEntry>, refresh: bool, ttl: Duration) -> Option<RefetchReason> {
        match entry {
            None => Some(RefetchReason::Unpopulated),
            Some(_) if refresh => Some(RefetchReason::Forced),
            Some(e) if e.created_at.elapsed() >= ttl => Some(RefetchReason::Stale),
            Some(_) => None,
        }
    }

    /// Return the cached listing, fetching it with `fetch` when needed
    ///
    /// A failed fetch leaves the previous listing in place.
    pub async fn get_or_fetch<F, Fut>(&self, refresh: bool, fetch: F) -> Result<AccessibleItems, BackendError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<AccessibleItems, BackendError>> + Send,
    {
        let mut entry = self.entry.lock().await;

        match Self::reason(entry.as_ref(), refresh, self.ttl) {
            None => {
                if let Some(cached) = entry.as_ref() {
                    return Ok(cached.items.clone());
                }
            }
            Some(reason) => tracing::debug!(?reason, "fetching accessible items"),
        }

        let items = fetch().await?;
        *entry = Some(CacheEntry {
            items: items.clone(),
            created_at: Instant::now(),
        });
        Ok(items)
    }

    pub async fn invalidate(&self) {
        *self.entry.lock().await = None;
    }
}
