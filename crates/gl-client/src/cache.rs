//! Keyed query cache with staleness and mutation-driven invalidation.
//!
//! Lists are keyed by `(search, limit)`, with no search meaning the
//! "latest" page; single records are keyed by id. An entry is fresh until
//! its stale time elapses or a mutation invalidates it. Stale entries stay
//! readable so callers can keep showing them while a refetch is in flight
//! or after one fails.

use std::collections::HashMap;
use std::time::Duration;

use gl_core::{ImageId, ImageList, ImageRecord};
use tokio::time::Instant;

/// How long lists and records stay fresh.
pub const LIST_STALE_TIME: Duration = Duration::from_secs(60);

/// How long server search results stay fresh.
pub const SEARCH_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Size of the latest-images page and cap for optimistic prepends.
pub const PAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub list_stale_time: Duration,
    pub search_stale_time: Duration,
    pub record_stale_time: Duration,
    pub page_limit: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            list_stale_time: LIST_STALE_TIME,
            search_stale_time: SEARCH_STALE_TIME,
            record_stale_time: LIST_STALE_TIME,
            page_limit: PAGE_LIMIT,
        }
    }
}

/// Identity of a cached list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    search: Option<String>,
    limit: usize,
}

impl ListKey {
    /// An empty search is the same key as no search.
    pub fn new(search: Option<&str>, limit: usize) -> Self {
        Self {
            search: search.filter(|s| !s.is_empty()).map(str::to_string),
            limit,
        }
    }

    pub fn latest(limit: usize) -> Self {
        Self::new(None, limit)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_search(&self) -> bool {
        self.search.is_some()
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    updated_at: Instant,
    invalidated: bool,
}

impl<T> Entry<T> {
    fn new(value: T, now: Instant) -> Self {
        Self {
            value,
            updated_at: now,
            invalidated: false,
        }
    }

    fn is_fresh(&self, stale_time: Duration, now: Instant) -> bool {
        !self.invalidated && now.saturating_duration_since(self.updated_at) < stale_time
    }
}

#[derive(Debug, Default)]
pub struct QueryCache {
    policy: CachePolicy,
    lists: HashMap<ListKey, Entry<ImageList>>,
    records: HashMap<ImageId, Entry<ImageRecord>>,
}

impl QueryCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            lists: HashMap::new(),
            records: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn latest_key(&self) -> ListKey {
        ListKey::latest(self.policy.page_limit)
    }

    fn list_stale_time(&self, key: &ListKey) -> Duration {
        if key.is_search() {
            self.policy.search_stale_time
        } else {
            self.policy.list_stale_time
        }
    }

    /// Cached list, fresh or stale.
    pub fn list(&self, key: &ListKey) -> Option<&ImageList> {
        self.lists.get(key).map(|e| &e.value)
    }

    /// Cached list only if it is still fresh.
    pub fn fresh_list(&self, key: &ListKey, now: Instant) -> Option<&ImageList> {
        let stale_time = self.list_stale_time(key);
        self.lists
            .get(key)
            .filter(|e| e.is_fresh(stale_time, now))
            .map(|e| &e.value)
    }

    pub fn store_list(&mut self, key: ListKey, list: ImageList, now: Instant) {
        self.lists.insert(key, Entry::new(list, now));
    }

    /// Cached record, fresh or stale.
    pub fn record(&self, id: ImageId) -> Option<&ImageRecord> {
        self.records.get(&id).map(|e| &e.value)
    }

    pub fn fresh_record(&self, id: ImageId, now: Instant) -> Option<&ImageRecord> {
        self.records
            .get(&id)
            .filter(|e| e.is_fresh(self.policy.record_stale_time, now))
            .map(|e| &e.value)
    }

    pub fn store_record(&mut self, record: ImageRecord, now: Instant) {
        self.records.insert(record.id, Entry::new(record, now));
    }

    /// A new upload succeeded.
    ///
    /// The record is prepended to the latest page (capped at the page limit,
    /// with `total` bumped by one), then every image query is invalidated.
    pub fn apply_upload(&mut self, record: ImageRecord, now: Instant) {
        let key = self.latest_key();
        let limit = self.policy.page_limit;

        let updated = match self.lists.get(&key) {
            Some(entry) => {
                let mut images = Vec::with_capacity(limit);
                images.push(record);
                images.extend(entry.value.images.iter().cloned());
                images.truncate(limit);
                ImageList {
                    images,
                    total: entry.value.total + 1,
                    search: entry.value.search.clone(),
                }
            }
            None => ImageList {
                images: vec![record],
                total: 1,
                search: None,
            },
        };
        self.lists.insert(key, Entry::new(updated, now));
        self.invalidate_all();
    }

    /// A rename succeeded: replace the record and invalidate every list.
    pub fn apply_update(&mut self, record: ImageRecord, now: Instant) {
        self.store_record(record, now);
        self.invalidate_lists();
    }

    /// A delete succeeded: drop the record and invalidate every list.
    pub fn apply_delete(&mut self, id: ImageId) {
        self.records.remove(&id);
        self.invalidate_lists();
    }

    pub fn invalidate_lists(&mut self) {
        for entry in self.lists.values_mut() {
            entry.invalidated = true;
        }
    }

    pub fn invalidate_all(&mut self) {
        self.invalidate_lists();
        for entry in self.records.values_mut() {
            entry.invalidated = true;
        }
    }
}
