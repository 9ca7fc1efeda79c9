//! Materializes records from identifiers.
//!
//! Lookup order is global scope, then the hinted tenant, then a full scan of
//! tenant record keys. The first attempt that yields a decodable document
//! wins; a stale or missing hint only costs the scan.

use std::ops::ControlFlow;

use crate::keys::{
    global_record_key, normalize_identifier, tenant_from_record_key, tenant_record_key,
    TENANT_PREFIX,
};
use crate::pagination::walk_pages;
use crate::reconcile::PARTITION_PAGE_SIZE;
use crate::record::{decode_record, Record};
use crate::store::{KvStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    Global,
    Hinted,
    Scanned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub record: Record,
    pub tier: ResolutionTier,
    /// Tenant whose scoped key held the record, `None` for global scope.
    pub tenant_id: Option<String>,
}

pub struct Resolver<'a, K: ?Sized> {
    kv: &'a K,
    scan_page_size: usize,
}

impl<'a, K> Resolver<'a, K>
where
    K: KvStore + ?Sized,
{
    pub fn new(kv: &'a K) -> Self {
        Self {
            kv,
            scan_page_size: PARTITION_PAGE_SIZE,
        }
    }

    pub fn with_scan_page_size(mut self, scan_page_size: usize) -> Self {
        self.scan_page_size = scan_page_size.max(1);
        self
    }

    pub fn resolve(
        &self,
        identifier: &str,
        source_hint: Option<&str>,
    ) -> Result<Option<Resolved>, StoreError> {
        let normalized = normalize_identifier(identifier);
        if normalized.is_empty() {
            return Ok(None);
        }

        if let Some(record) = self.fetch(&global_record_key(&normalized))? {
            return Ok(Some(Resolved {
                record,
                tier: ResolutionTier::Global,
                tenant_id: None,
            }));
        }

        let hinted_key = source_hint.map(|tenant_id| tenant_record_key(tenant_id, &normalized));
        if let (Some(tenant_id), Some(key)) = (source_hint, hinted_key.as_deref()) {
            if let Some(record) = self.fetch(key)? {
                return Ok(Some(Resolved {
                    record,
                    tier: ResolutionTier::Hinted,
                    tenant_id: Some(tenant_id.to_string()),
                }));
            }
            tracing::debug!(id = %normalized, tenant_id, "source hint was stale");
        }

        let scanned = self.scan_tenants(&normalized, hinted_key.as_deref())?;
        if scanned.is_none() {
            tracing::debug!(id = %normalized, "identifier did not resolve in any partition");
        }
        Ok(scanned.map(|(tenant_id, record)| Resolved {
            record,
            tier: ResolutionTier::Scanned,
            tenant_id: Some(tenant_id),
        }))
    }

    /// Global scope only; used by the published listing.
    pub fn resolve_global(&self, identifier: &str) -> Result<Option<Record>, StoreError> {
        let normalized = normalize_identifier(identifier);
        if normalized.is_empty() {
            return Ok(None);
        }
        self.fetch(&global_record_key(&normalized))
    }

    fn fetch(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let Some(bytes) = self.kv.get(key)? else {
            return Ok(None);
        };
        match decode_record(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(error) => {
                tracing::warn!(key, %error, "skipping undecodable record document");
                Ok(None)
            }
        }
    }

    fn scan_tenants(
        &self,
        normalized: &str,
        already_tried: Option<&str>,
    ) -> Result<Option<(String, Record)>, StoreError> {
        let mut found = None;
        walk_pages(
            |cursor| self.kv.list(TENANT_PREFIX, cursor, self.scan_page_size),
            |keys| {
                for key in keys {
                    if already_tried == Some(key.as_str()) {
                        continue;
                    }
                    let Some(tenant_id) = tenant_from_record_key(&key, normalized) else {
                        continue;
                    };
                    if let Some(record) = self.fetch(&key)? {
                        found = Some((tenant_id.to_string(), record));
                        return Ok(ControlFlow::Break(()));
                    }
                }
                Ok(ControlFlow::Continue(()))
            },
        )?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::memory::MemoryKvStore;

    fn record_json(id: &str, title: &str) -> Value {
        json!({
            "id": id,
            "status": "pending",
            "title": title,
            "authorId": "author-1",
            "updatedAt": "2026-02-14T10:00:00Z",
        })
    }

    #[test]
    fn prefers_global_scope() {
        let kv = MemoryKvStore::new(10);
        kv.insert_json("record:m1", &record_json("m1", "global"));
        kv.insert_json("tenant:t1:record:m1", &record_json("m1", "tenant"));

        let resolved = Resolver::new(&kv)
            .resolve("record:m1", Some("t1"))
            .expect("resolve should succeed")
            .expect("m1 should resolve");

        assert_eq!(resolved.tier, ResolutionTier::Global);
        assert_eq!(resolved.record.title, "global");
        assert_eq!(kv.get_calls(), vec!["record:m1"]);
    }

    #[test]
    fn uses_hint_before_scanning() {
        let kv = MemoryKvStore::new(10);
        kv.insert_json("tenant:t1:record:m2", &record_json("m2", "hinted"));

        let resolved = Resolver::new(&kv)
            .resolve("m2", Some("t1"))
            .expect("resolve should succeed")
            .expect("m2 should resolve");

        assert_eq!(resolved.tier, ResolutionTier::Hinted);
        assert_eq!(resolved.tenant_id.as_deref(), Some("t1"));
        assert_eq!(kv.list_calls(), 0);
    }

    #[test]
    fn stale_hint_falls_back_to_scan() {
        let kv = MemoryKvStore::new(1);
        kv.insert_json("tenant:t1:mods_list", &json!(["m2"]));
        kv.insert_json("tenant:t2:record:m20", &record_json("m20", "decoy"));
        kv.insert_json("tenant:t3:record:m2", &record_json("m2", "moved"));

        let resolved = Resolver::new(&kv)
            .resolve("m2", Some("t1"))
            .expect("resolve should succeed")
            .expect("m2 should resolve");

        assert_eq!(resolved.tier, ResolutionTier::Scanned);
        assert_eq!(resolved.tenant_id.as_deref(), Some("t3"));
        assert_eq!(resolved.record.title, "moved");
    }

    #[test]
    fn scan_stops_at_first_decodable_match() {
        let kv = MemoryKvStore::new(1);
        kv.insert_raw("tenant:a:record:m5", b"not json");
        kv.insert_json("tenant:b:record:m5", &record_json("m5", "first good"));
        kv.insert_json("tenant:c:record:m5", &record_json("m5", "second good"));

        let resolved = Resolver::new(&kv)
            .with_scan_page_size(1)
            .resolve("m5", None)
            .expect("resolve should succeed")
            .expect("m5 should resolve");

        assert_eq!(resolved.tenant_id.as_deref(), Some("b"));
        assert!(!kv.get_calls().contains(&"tenant:c:record:m5".to_string()));
    }

    #[test]
    fn unresolvable_identifier_yields_none() {
        let kv = MemoryKvStore::new(10);
        kv.insert_raw("record:m7", b"{\"id\":\"m7\"}");

        let resolved = Resolver::new(&kv)
            .resolve("m7", None)
            .expect("resolve should succeed");
        assert!(resolved.is_none());
    }

    #[test]
    fn store_failure_propagates() {
        let kv = MemoryKvStore::new(10);
        kv.fail_get("record:m1");

        let error = Resolver::new(&kv)
            .resolve("m1", None)
            .expect_err("failure should propagate");
        assert!(matches!(error, StoreError::Unavailable { .. }));
    }
}
