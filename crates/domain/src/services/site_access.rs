//! Tenant check for construction sites with an injectable validation cache.
//!
//! The cache only remembers positive answers (site belongs to company), so a
//! stale entry can at worst admit a site that was soft-deleted within the TTL.
//! Negative answers always go to the directory.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Source of truth for site ownership.
#[async_trait]
pub trait SiteDirectory: Send + Sync {
    /// True when the site exists, is not deleted and belongs to the company.
    async fn site_belongs_to(&self, site_id: Uuid, company_id: Uuid) -> DomainResult<bool>;
}

#[async_trait]
impl<T: SiteDirectory + ?Sized> SiteDirectory for Arc<T> {
    async fn site_belongs_to(&self, site_id: Uuid, company_id: Uuid) -> DomainResult<bool> {
        (**self).site_belongs_to(site_id, company_id).await
    }
}

/// Cache of confirmed (site, company) pairs.
pub trait SiteAccessCache: Send + Sync {
    fn contains(&self, site_id: Uuid, company_id: Uuid) -> bool;
    fn insert(&self, site_id: Uuid, company_id: Uuid);
}

/// Cache that never remembers anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSiteCache;

impl SiteAccessCache for NoopSiteCache {
    fn contains(&self, _site_id: Uuid, _company_id: Uuid) -> bool {
        false
    }

    fn insert(&self, _site_id: Uuid, _company_id: Uuid) {}
}

/// Bounded in-process cache with a fixed time-to-live per entry.
#[derive(Debug)]
pub struct TtlSiteCache {
    entries: DashMap<(Uuid, Uuid), Instant>,
    ttl: Duration,
    capacity: usize,
}

impl TtlSiteCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, inserted| inserted.elapsed() < ttl);
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| *entry.value())
            .map(|entry| *entry.key());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl SiteAccessCache for TtlSiteCache {
    fn contains(&self, site_id: Uuid, company_id: Uuid) -> bool {
        let key = (site_id, company_id);
        let fresh = match self.entries.get(&key) {
            Some(inserted) => inserted.elapsed() < self.ttl,
            None => return false,
        };
        if !fresh {
            self.entries.remove(&key);
        }
        fresh
    }

    fn insert(&self, site_id: Uuid, company_id: Uuid) {
        if self.ttl.is_zero() {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.purge_expired();
            while self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
        }
        self.entries.insert((site_id, company_id), Instant::now());
    }
}

/// Verifies that a site belongs to the caller's company.
pub struct SiteAccessGuard<D> {
    directory: D,
    cache: Arc<dyn SiteAccessCache>,
}

impl<D: SiteDirectory> SiteAccessGuard<D> {
    pub fn new(directory: D, cache: Arc<dyn SiteAccessCache>) -> Self {
        Self { directory, cache }
    }

    /// Foreign and missing sites are both reported as `NotFound`.
    pub async fn ensure_site(&self, company_id: Uuid, site_id: Uuid) -> DomainResult<()> {
        if self.cache.contains(site_id, company_id) {
            debug!(site_id = %site_id, company_id = %company_id, "Site access cache hit");
            return Ok(());
        }

        if self.directory.site_belongs_to(site_id, company_id).await? {
            self.cache.insert(site_id, company_id);
            Ok(())
        } else {
            Err(DomainError::NotFound("Construction site not found".to_string()))
        }
    }
}
