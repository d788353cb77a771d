//! Route-level analysis cache.
//!
//! Entries are keyed by route key and expire purely by age; a changed
//! waypoint file under the same key is served from cache until the TTL runs
//! out.

use dashmap::DashMap;
use hazard_core::RouteAnalysis;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;
}

pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration)
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    let now = Instant::now();
    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();

    for (key, fetched_at) in &entries {
        if now.duration_since(*fetched_at) > max_age {
            cache.remove(key);
        }
    }

    if cache.len() <= max_entries {
        return;
    }

    entries.sort_by_key(|(_, fetched_at)| *fetched_at);
    for (key, _) in entries {
        if cache.len() <= max_entries {
            break;
        }
        cache.remove(&key);
    }
}

#[derive(Debug, Clone)]
struct CachedAnalysis {
    fetched_at: Instant,
    analysis: RouteAnalysis,
}

impl CacheEntry for CachedAnalysis {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

pub struct AnalysisCache {
    entries: DashMap<String, CachedAnalysis>,
    ttl: Duration,
    max_entries: usize,
}

impl AnalysisCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// A fresh entry for `route_key` produced with the same `enhanced` flag.
    pub fn get(&self, route_key: &str, enhanced: bool) -> Option<RouteAnalysis> {
        let entry = self.entries.get(route_key)?;
        if entry.fetched_at.elapsed() > self.ttl || entry.analysis.enhanced != enhanced {
            return None;
        }
        Some(entry.analysis.clone())
    }

    pub fn insert(&self, analysis: RouteAnalysis) {
        self.entries.insert(
            analysis.route.route_key.clone(),
            CachedAnalysis {
                fetched_at: Instant::now(),
                analysis,
            },
        );
        if self.entries.len() > self.max_entries {
            self.prune();
        }
    }

    pub fn invalidate(&self, route_key: &str) {
        self.entries.remove(route_key);
    }

    pub fn prune(&self) {
        prune_cache(&self.entries, self.max_entries, self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hazard_core::{Route, RouteMetadata, Waypoint};

    fn analysis(key: &str, enhanced: bool) -> RouteAnalysis {
        let route = Route::build(
            RouteMetadata {
                file_name: Some(format!("{key}.json")),
                ..Default::default()
            },
            vec![Waypoint::new(12.0, 77.0), Waypoint::new(12.1, 77.0)],
        )
        .unwrap();
        let mut analysis = RouteAnalysis::empty("run", route, Utc::now());
        analysis.enhanced = enhanced;
        analysis
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_by_age_only() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        cache.insert(analysis("north", false));
        assert!(cache.get("north", false).is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get("north", false).is_none());
        cache.prune();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn enhanced_flag_must_match() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        cache.insert(analysis("north", false));
        assert!(cache.get("north", true).is_none());
        cache.insert(analysis("north", true));
        assert!(cache.get("north", true).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn oldest_entries_are_trimmed_first() {
        let cache = AnalysisCache::new(Duration::from_secs(600), 2);
        for key in ["a", "b", "c"] {
            cache.insert(analysis(key, false));
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", false).is_none());
        assert!(cache.get("c", false).is_some());
    }
}
