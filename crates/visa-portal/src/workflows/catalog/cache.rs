use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::resource::ResourceKind;

/// Read models that can be served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    AdminList(ResourceKind),
    PublicCountries,
    PopularDestinations,
    CountryDetails(Uuid),
    CountryPricing(Uuid),
}

/// A write that may change what cached reads return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub kind: ResourceKind,
    pub country_id: Option<Uuid>,
}

impl Mutation {
    pub fn new(kind: ResourceKind, country_id: Option<Uuid>) -> Self {
        Self { kind, country_id }
    }

    /// Whether a cached entry may display data touched by this write.
    pub fn affects(&self, key: &QueryKey) -> bool {
        let same_country = |id: &Uuid| self.country_id.map_or(true, |country| country == *id);

        match (self.kind, key) {
            (kind, QueryKey::AdminList(listed)) if kind == *listed => true,
            (ResourceKind::Countries | ResourceKind::VisaPackages, QueryKey::AdminList(listed)) => {
                *listed == ResourceKind::Countries || *listed == ResourceKind::VisaPackages
            }
            (
                ResourceKind::Countries | ResourceKind::VisaPackages,
                QueryKey::PublicCountries | QueryKey::PopularDestinations,
            ) => true,
            (
                ResourceKind::Countries | ResourceKind::VisaPackages,
                QueryKey::CountryDetails(id) | QueryKey::CountryPricing(id),
            ) => same_country(id),
            (
                ResourceKind::VisaTypes | ResourceKind::DocumentChecklist | ResourceKind::PricingTiers,
                QueryKey::CountryDetails(id),
            ) => same_country(id),
            _ => false,
        }
    }
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    /// Bumped by every invalidation; loads started under an older value are not stored.
    generation: u64,
}

/// Time-bounded cache of serialized read models, invalidated by writes.
pub struct QueryCache {
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let mut state = self.state();
        let entries = &mut state.entries;
        let fresh = entries
            .get(key)
            .map(|entry| entry.stored_at.elapsed() < self.ttl)?;
        if !fresh {
            entries.remove(key);
            return None;
        }
        entries
            .get(key)
            .and_then(|entry| serde_json::from_value(entry.value.clone()).ok())
    }

    pub fn put<T: Serialize>(&self, key: QueryKey, value: &T) {
        self.store(key, value, None);
    }

    /// Store unless an invalidation ran since `loaded_at` was read.
    fn store<T: Serialize>(&self, key: QueryKey, value: &T, loaded_at: Option<u64>) {
        if self.ttl.is_zero() {
            return;
        }
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        let mut state = self.state();
        if loaded_at.is_some_and(|generation| generation != state.generation) {
            debug!(?key, "discarding load that raced an invalidation");
            return;
        }
        state.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Return the cached value or load, store, and return a fresh one.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: QueryKey, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(&key) {
            debug!(?key, "cache hit");
            return Ok(cached);
        }
        let generation = self.generation();
        let value = load().await?;
        self.store(key, &value, Some(generation));
        Ok(value)
    }

    /// Drop every entry the mutation may have made stale. Returns the dropped keys.
    pub fn invalidate(&self, mutation: Mutation) -> Vec<QueryKey> {
        let mut state = self.state();
        state.generation = state.generation.wrapping_add(1);
        let entries = &mut state.entries;
        let stale: Vec<QueryKey> = entries
            .keys()
            .filter(|key| mutation.affects(key))
            .copied()
            .collect();
        for key in &stale {
            entries.remove(key);
        }
        if !stale.is_empty() {
            debug!(?mutation, dropped = stale.len(), "invalidated cached queries");
        }
        stale
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.state().entries.contains_key(key)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
