//! Query cache for backend reads
//!
//! Holds the last fetched workflow list, individual workflows and the
//! recent-executions list. Writes never update entries in place; they mark
//! the affected keys stale and the next read refetches.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use flow_graph::WorkflowId;

use crate::dto::{ExecutionSummary, WorkflowDocument, WorkflowSummary};

/// Identity of a cached query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    WorkflowList,
    Workflow(WorkflowId),
    RecentExecutions,
}

/// Result of a cached query
#[derive(Debug, Clone, PartialEq)]
pub enum CachedQuery {
    WorkflowList(Vec<WorkflowSummary>),
    Workflow(WorkflowDocument),
    RecentExecutions(Vec<ExecutionSummary>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedQuery,
    fetched_at: DateTime<Utc>,
    stale: bool,
}

/// Shared query cache; clones see the same entries
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<RwLock<HashMap<QueryKey, CacheEntry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, unless missing or stale
    pub fn get_fresh(&self, key: &QueryKey) -> Option<CachedQuery> {
        self.entries
            .read()
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.value.clone())
    }

    pub fn put(&self, key: QueryKey, value: CachedQuery) {
        log::trace!("Cache fill {:?}", key);
        self.entries.write().insert(
            key,
            CacheEntry {
                value,
                fetched_at: Utc::now(),
                stale: false,
            },
        );
    }

    /// Mark `key` stale so the next read refetches
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.entries.write().get_mut(key) {
            log::debug!("Cache invalidate {:?}", key);
            entry.stale = true;
        }
    }

    pub fn invalidate_all<'a>(&self, keys: impl IntoIterator<Item = &'a QueryKey>) {
        for key in keys {
            self.invalidate(key);
        }
    }

    /// Whether `key` holds a value that must be refetched
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.read().get(key).is_some_and(|entry| entry.stale)
    }

    pub fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries.read().get(key).map(|entry| entry.fetched_at)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let cache = QueryCache::new();
        cache.put(QueryKey::WorkflowList, CachedQuery::WorkflowList(vec![]));

        assert_eq!(
            cache.get_fresh(&QueryKey::WorkflowList),
            Some(CachedQuery::WorkflowList(vec![]))
        );
        assert!(cache.fetched_at(&QueryKey::WorkflowList).is_some());
        assert_eq!(cache.get_fresh(&QueryKey::RecentExecutions), None);
    }

    #[test]
    fn test_invalidate_marks_stale() {
        let cache = QueryCache::new();
        cache.put(QueryKey::WorkflowList, CachedQuery::WorkflowList(vec![]));
        cache.put(
            QueryKey::RecentExecutions,
            CachedQuery::RecentExecutions(vec![]),
        );

        cache.invalidate(&QueryKey::WorkflowList);

        assert!(cache.is_stale(&QueryKey::WorkflowList));
        assert!(cache.contains(&QueryKey::WorkflowList));
        assert_eq!(cache.get_fresh(&QueryKey::WorkflowList), None);
        assert!(cache.get_fresh(&QueryKey::RecentExecutions).is_some());
    }

    #[test]
    fn test_invalidate_missing_key_is_noop() {
        let cache = QueryCache::new();
        cache.invalidate(&QueryKey::Workflow("wf-1".to_string()));
        assert!(!cache.is_stale(&QueryKey::Workflow("wf-1".to_string())));
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = QueryCache::new();
        let other = cache.clone();
        other.put(QueryKey::WorkflowList, CachedQuery::WorkflowList(vec![]));

        cache.invalidate_all(&[QueryKey::WorkflowList]);

        assert!(other.is_stale(&QueryKey::WorkflowList));
    }
}
