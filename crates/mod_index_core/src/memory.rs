//! In-memory stores for tests and local runs.
//!
//! Both stores page in key order with a configurable page size and use the
//! last key of a page as the continuation cursor. Individual keys can be
//! marked as failing to exercise the error paths.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Mutex;

use serde_json::Value;

use crate::store::{BlobObject, BlobStore, KvStore, Page, StoreError};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().expect("poisoned mutex")
}

fn page_after<T: Clone>(
    entries: &BTreeMap<String, T>,
    prefix: &str,
    cursor: Option<&str>,
    page_size: usize,
) -> Page<(String, T)> {
    let lower = match cursor {
        Some(cursor) => Bound::Excluded(cursor.to_string()),
        None => Bound::Included(prefix.to_string()),
    };
    let mut matching = entries
        .range((lower, Bound::Unbounded))
        .filter(|(key, _)| key.starts_with(prefix))
        .map(|(key, value)| (key.clone(), value.clone()));

    let items: Vec<_> = matching.by_ref().take(page_size.max(1)).collect();
    let has_more = matching.next().is_some();
    let cursor = if has_more {
        items.last().map(|(key, _)| key.clone())
    } else {
        None
    };
    match cursor {
        Some(cursor) => Page::more(items, cursor),
        None => Page::last(items),
    }
}

pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_keys: Mutex<BTreeSet<String>>,
    fail_listing: Mutex<bool>,
    page_size: usize,
    list_calls: Mutex<usize>,
    get_calls: Mutex<Vec<String>>,
}

impl MemoryKvStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            failing_keys: Mutex::new(BTreeSet::new()),
            fail_listing: Mutex::new(false),
            page_size,
            list_calls: Mutex::new(0),
            get_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn insert_json(&self, key: &str, value: &Value) {
        let bytes = serde_json::to_vec(value).expect("json value should serialize");
        self.insert_raw(key, &bytes);
    }

    pub fn insert_raw(&self, key: &str, bytes: &[u8]) {
        lock(&self.entries).insert(key.to_string(), bytes.to_vec());
    }

    pub fn fail_get(&self, key: &str) {
        lock(&self.failing_keys).insert(key.to_string());
    }

    pub fn fail_listing(&self) {
        *lock(&self.fail_listing) = true;
    }

    pub fn list_calls(&self) -> usize {
        *lock(&self.list_calls)
    }

    pub fn get_calls(&self) -> Vec<String> {
        lock(&self.get_calls).clone()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        lock(&self.get_calls).push(key.to_string());
        if lock(&self.failing_keys).contains(key) {
            return Err(StoreError::unavailable(
                "kv get",
                format!("simulated read failure for key: {key}"),
            ));
        }
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn list(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Page<String>, StoreError> {
        *lock(&self.list_calls) += 1;
        if *lock(&self.fail_listing) {
            return Err(StoreError::unavailable(
                "kv list",
                format!("simulated listing failure for prefix: {prefix}"),
            ));
        }
        let entries = lock(&self.entries);
        let page = page_after(&entries, prefix, cursor, limit.min(self.page_size));
        Ok(Page {
            items: page.items.into_iter().map(|(key, _)| key).collect(),
            cursor: page.cursor,
            complete: page.complete,
        })
    }
}

pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    failing_deletes: Mutex<BTreeSet<String>>,
    fail_listing_after: Mutex<Option<usize>>,
    page_size: usize,
    list_calls: Mutex<usize>,
    delete_calls: Mutex<Vec<String>>,
}

impl MemoryBlobStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            failing_deletes: Mutex::new(BTreeSet::new()),
            fail_listing_after: Mutex::new(None),
            page_size,
            list_calls: Mutex::new(0),
            delete_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn insert_live(&self, key: &str) {
        self.insert_with_metadata(key, &[]);
    }

    pub fn insert_marked(&self, key: &str, deleted_at_ms: i64) {
        let deleted_at = deleted_at_ms.to_string();
        self.insert_with_metadata(
            key,
            &[
                ("marked-for-deletion", "true"),
                ("deleted-at", deleted_at.as_str()),
            ],
        );
    }

    pub fn insert_with_metadata(&self, key: &str, metadata: &[(&str, &str)]) {
        let metadata = metadata
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        lock(&self.objects).insert(key.to_string(), metadata);
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.objects).contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    pub fn fail_delete(&self, key: &str) {
        lock(&self.failing_deletes).insert(key.to_string());
    }

    /// Listing calls after the first `pages` succeed fail as unreachable.
    pub fn fail_listing_after(&self, pages: usize) {
        *lock(&self.fail_listing_after) = Some(pages);
    }

    pub fn list_calls(&self) -> usize {
        *lock(&self.list_calls)
    }

    pub fn delete_calls(&self) -> Vec<String> {
        lock(&self.delete_calls).clone()
    }
}

impl BlobStore for MemoryBlobStore {
    fn list(&self, cursor: Option<&str>, limit: usize) -> Result<Page<BlobObject>, StoreError> {
        let call = {
            let mut calls = lock(&self.list_calls);
            *calls += 1;
            *calls
        };
        if let Some(allowed) = *lock(&self.fail_listing_after) {
            if call > allowed {
                return Err(StoreError::unavailable(
                    "blob list",
                    "simulated listing failure",
                ));
            }
        }

        let objects = lock(&self.objects);
        let page = page_after(&objects, "", cursor, limit.min(self.page_size));
        Ok(Page {
            items: page
                .items
                .into_iter()
                .map(|(key, metadata)| BlobObject { key, metadata })
                .collect(),
            cursor: page.cursor,
            complete: page.complete,
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        lock(&self.delete_calls).push(key.to_string());
        if lock(&self.failing_deletes).contains(key) {
            return Err(StoreError::unavailable(
                "blob delete",
                format!("simulated delete failure for key: {key}"),
            ));
        }
        lock(&self.objects).remove(key);
        Ok(())
    }
}
