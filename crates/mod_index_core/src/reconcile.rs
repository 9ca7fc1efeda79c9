//! Merges the global identifier list with every tenant partition's list.
//!
//! The global partition is authoritative: an identifier that has been promoted
//! there is never collected again from a tenant list. Identifiers only known
//! to tenants keep the tenant they were first seen in as a source hint.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;

use crate::keys::{normalize_identifier, tenant_from_list_key, GLOBAL_LIST_KEY, TENANT_PREFIX};
use crate::pagination::walk_pages;
use crate::record::decode_identifier_list;
use crate::store::{KvStore, StoreError};

pub const PARTITION_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantEntry {
    /// Identifier exactly as the tenant list spelled it.
    pub original_id: String,
    pub source_hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub id: &'a str,
    pub source_hint: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Normalized identifiers from the global list.
    pub global: BTreeSet<String>,
    /// Tenant-only identifiers keyed by normalized id.
    pub tenant_only: BTreeMap<String, TenantEntry>,
    pub tenants_scanned: usize,
    pub tenant_lists_skipped: usize,
    pub pages: usize,
}

impl Reconciliation {
    pub fn len(&self) -> usize {
        self.global.len() + self.tenant_only.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Global identifiers first, then tenant-only identifiers with their hints.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate<'_>> {
        let global = self.global.iter().map(|id| Candidate {
            id: id.as_str(),
            source_hint: None,
        });
        let tenant = self.tenant_only.values().map(|entry| Candidate {
            id: entry.original_id.as_str(),
            source_hint: Some(entry.source_hint.as_str()),
        });
        global.chain(tenant)
    }

    pub fn source_hint(&self, normalized_id: &str) -> Option<&str> {
        self.tenant_only
            .get(normalized_id)
            .map(|entry| entry.source_hint.as_str())
    }
}

/// Reads the single global list document. Missing or malformed lists yield an
/// empty set; only store failures are returned as errors.
pub fn read_global_identifiers<K>(kv: &K) -> Result<BTreeSet<String>, StoreError>
where
    K: KvStore + ?Sized,
{
    let Some(bytes) = kv.get(GLOBAL_LIST_KEY)? else {
        tracing::debug!(key = GLOBAL_LIST_KEY, "global list missing; treating as empty");
        return Ok(BTreeSet::new());
    };

    match decode_identifier_list(&bytes) {
        Ok(ids) => Ok(ids
            .iter()
            .map(|id| normalize_identifier(id))
            .filter(|id| !id.is_empty())
            .collect()),
        Err(error) => {
            tracing::warn!(key = GLOBAL_LIST_KEY, %error, "skipping malformed global list");
            Ok(BTreeSet::new())
        }
    }
}

pub fn reconcile_partitions<K>(kv: &K) -> Result<Reconciliation, StoreError>
where
    K: KvStore + ?Sized,
{
    let mut reconciliation = Reconciliation {
        global: read_global_identifiers(kv)?,
        ..Reconciliation::default()
    };

    let stats = walk_pages(
        |cursor| kv.list(TENANT_PREFIX, cursor, PARTITION_PAGE_SIZE),
        |keys| {
            for key in keys {
                let Some(tenant_id) = tenant_from_list_key(&key) else {
                    continue;
                };
                merge_tenant_list(kv, &key, tenant_id, &mut reconciliation)?;
            }
            Ok(ControlFlow::Continue(()))
        },
    )?;
    reconciliation.pages = stats.pages;

    tracing::info!(
        component = "reconciler",
        global = reconciliation.global.len(),
        tenant_only = reconciliation.tenant_only.len(),
        tenants_scanned = reconciliation.tenants_scanned,
        tenant_lists_skipped = reconciliation.tenant_lists_skipped,
        pages = reconciliation.pages,
        "partitions reconciled"
    );
    Ok(reconciliation)
}

fn merge_tenant_list<K>(
    kv: &K,
    key: &str,
    tenant_id: &str,
    reconciliation: &mut Reconciliation,
) -> Result<(), StoreError>
where
    K: KvStore + ?Sized,
{
    reconciliation.tenants_scanned += 1;

    // Listed keys can vanish before the read on an eventually consistent store.
    let Some(bytes) = kv.get(key)? else {
        tracing::debug!(key, tenant_id, "tenant list disappeared after listing");
        return Ok(());
    };

    let ids = match decode_identifier_list(&bytes) {
        Ok(ids) => ids,
        Err(error) => {
            reconciliation.tenant_lists_skipped += 1;
            tracing::warn!(key, tenant_id, %error, "skipping malformed tenant list");
            return Ok(());
        }
    };

    for original_id in ids {
        let normalized = normalize_identifier(&original_id);
        if normalized.is_empty() || reconciliation.global.contains(&normalized) {
            continue;
        }
        reconciliation
            .tenant_only
            .entry(normalized)
            .or_insert_with(|| TenantEntry {
                original_id,
                source_hint: tenant_id.to_string(),
            });
    }
    Ok(())
}
