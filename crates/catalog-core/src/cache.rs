//! Per-connection caches
//!
//! [`CacheContext`] hands out one [`AuxCache`] per connection id, created
//! empty on first access. Cached values expire lazily: a read past the TTL
//! refetches before returning, and concurrent readers of one connection wait
//! for a single fetch instead of issuing their own.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{self, Clock, SystemClock};
use crate::collab::{CatalogError, Principal, PrincipalSource};
use crate::model::Owner;

/// Default time-to-live for cached values
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
struct Cached<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

/// Cached auxiliary data for one connection
#[derive(Debug)]
pub struct AuxCache {
    connection_id: String,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    principals: tokio::sync::Mutex<Option<Cached<Arc<PrincipalDirectory>>>>,
}

impl AuxCache {
    fn new(connection_id: &str, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            connection_id: connection_id.to_string(),
            clock,
            ttl,
            principals: tokio::sync::Mutex::new(None),
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The principal directory, fetched from `source` when missing or expired.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error. An expired value is discarded before the
    /// fetch, so a failed refresh never serves stale data.
    pub async fn principals(
        &self,
        source: &dyn PrincipalSource,
    ) -> Result<Arc<PrincipalDirectory>, CatalogError> {
        let mut slot = self.principals.lock().await;
        let now = self.clock.now();
        if let Some(cached) = slot.as_ref()
            && !clock::has_elapsed(cached.fetched_at, now, self.ttl)
        {
            return Ok(Arc::clone(&cached.value));
        }

        *slot = None;
        tracing::debug!(connection_id = %self.connection_id, "fetching principal directory");
        let principals = source.fetch_principals(&self.connection_id).await?;
        let directory = Arc::new(PrincipalDirectory::new(principals));
        *slot = Some(Cached {
            value: Arc::clone(&directory),
            fetched_at: self.clock.now(),
        });
        Ok(directory)
    }

    /// Drop cached values without touching the cache itself.
    pub async fn clear(&self) {
        *self.principals.lock().await = None;
    }
}

/// Registry of per-connection caches
#[derive(Debug)]
pub struct CacheContext {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    caches: Mutex<HashMap<String, Arc<AuxCache>>>,
}

impl Default for CacheContext {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), DEFAULT_TTL)
    }
}

impl CacheContext {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            caches: Mutex::new(HashMap::new()),
        }
    }

    /// The cache for `connection_id`, created empty on first access.
    pub fn get(&self, connection_id: &str) -> Arc<AuxCache> {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        let cache = caches
            .entry(connection_id.to_string())
            .or_insert_with(|| {
                Arc::new(AuxCache::new(
                    connection_id,
                    Arc::clone(&self.clock),
                    self.ttl,
                ))
            });
        Arc::clone(cache)
    }

    /// Drop the cache for `connection_id`; returns whether one existed.
    ///
    /// Holders of the old [`AuxCache`] keep it; the next [`get`] creates a
    /// new one.
    ///
    /// [`get`]: CacheContext::get
    pub fn invalidate(&self, connection_id: &str) -> bool {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(connection_id)
            .is_some()
    }

    /// Connection ids with a live cache, sorted
    pub fn connection_ids(&self) -> Vec<String> {
        let caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = caches.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Principals by key, for rendering ownership
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalDirectory {
    by_key: BTreeMap<String, Principal>,
}

impl PrincipalDirectory {
    pub fn new(principals: Vec<Principal>) -> Self {
        Self {
            by_key: principals.into_iter().map(|p| (p.key.clone(), p)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Principal> {
        self.by_key.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Display name for one owner, falling back to the key's last segment.
    pub fn display_name<'a>(&'a self, owner: &'a Owner) -> &'a str {
        match self.get(&owner.principal_key) {
            Some(p) if !p.display_name.trim().is_empty() => &p.display_name,
            _ => owner
                .principal_key
                .rsplit(':')
                .next()
                .unwrap_or(&owner.principal_key),
        }
    }

    /// `Name (OWNERSHIP_TYPE)` for each owner, in order.
    pub fn describe(&self, owners: &[Owner]) -> Vec<String> {
        owners
            .iter()
            .map(|o| format!("{} ({})", self.display_name(o), o.ownership_type))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::collab::memory::MemoryDirectory;
    use pretty_assertions::assert_eq;

    fn context(clock: Arc<ManualClock>) -> CacheContext {
        CacheContext::new(clock, DEFAULT_TTL)
    }

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new(vec![Principal::new("urn:li:corpuser:ann", "Ann Lee")])
    }

    #[test]
    fn caches_are_per_connection() {
        let ctx = context(Arc::new(ManualClock::default()));
        let a = ctx.get("prod");
        let again = ctx.get("prod");
        let b = ctx.get("staging");

        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(ctx.connection_ids(), vec!["prod".to_string(), "staging".to_string()]);
    }

    #[test]
    fn invalidate_replaces_cache() {
        let ctx = context(Arc::new(ManualClock::default()));
        let before = ctx.get("prod");
        assert!(ctx.invalidate("prod"));
        assert!(!ctx.invalidate("prod"));
        assert!(!Arc::ptr_eq(&before, &ctx.get("prod")));
    }

    #[tokio::test]
    async fn value_is_reused_until_expiry() {
        let clock = Arc::new(ManualClock::default());
        let ctx = context(clock.clone());
        let source = directory();
        let cache = ctx.get("prod");

        cache.principals(&source).await.unwrap();
        clock.advance(Duration::from_secs(299));
        cache.principals(&source).await.unwrap();
        assert_eq!(source.fetch_count(), 1);

        clock.advance(Duration::from_secs(1));
        cache.principals(&source).await.unwrap();
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_does_not_serve_stale() {
        let clock = Arc::new(ManualClock::default());
        let ctx = context(clock.clone());
        let source = directory();
        let cache = ctx.get("prod");

        cache.principals(&source).await.unwrap();
        clock.advance(DEFAULT_TTL);
        source.set_failing(true);
        assert!(cache.principals(&source).await.is_err());

        source.set_failing(false);
        assert!(cache.principals(&source).await.is_ok());
        assert_eq!(source.fetch_count(), 3);
    }

    #[test]
    fn describe_falls_back_to_key_segment() {
        let dir = PrincipalDirectory::new(vec![Principal::new("urn:li:corpuser:ann", "Ann Lee")]);
        let owners = vec![
            Owner::new("urn:li:corpuser:ann", "TECHNICAL_OWNER"),
            Owner::new("urn:li:corpGroup:data-eng", "BUSINESS_OWNER"),
        ];
        assert_eq!(
            dir.describe(&owners),
            vec![
                "Ann Lee (TECHNICAL_OWNER)".to_string(),
                "data-eng (BUSINESS_OWNER)".to_string(),
            ]
        );
    }
}
