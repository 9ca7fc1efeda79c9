use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::reconcile::{read_global_identifiers, reconcile_partitions};
use crate::record::{Record, RecordStatus};
use crate::resolve::Resolver;
use crate::store::{KvStore, StoreError};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingScope {
    /// Global partition only.
    Published,
    /// Global partition reconciled with every tenant partition.
    AllPartitions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<RecordStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub records: Vec<Record>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Best-effort tenant display names. Missing entries are expected.
pub trait DisplayNameLookup {
    fn display_names(
        &self,
        tenant_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, String>, String>;
}

pub struct NoDisplayNames;

impl DisplayNameLookup for NoDisplayNames {
    fn display_names(
        &self,
        _tenant_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, String>, String> {
        Ok(HashMap::new())
    }
}

/// Returns `(page, page_size)` with defaults applied and page size capped.
pub fn clamp_paging(page: Option<usize>, page_size: Option<usize>) -> (usize, usize) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}

pub fn matches_filters(record: &Record, query: &ListQuery) -> bool {
    if query.status.is_some_and(|status| record.status != status) {
        return false;
    }
    if query
        .category
        .as_deref()
        .is_some_and(|category| record.category != category)
    {
        return false;
    }

    let Some(needle) = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|needle| !needle.is_empty())
    else {
        return true;
    };
    let needle = needle.to_lowercase();
    record.title.to_lowercase().contains(&needle)
        || record.description.to_lowercase().contains(&needle)
        || record
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Filters, sorts newest first and slices one page.
///
/// The sort is stable, so records with equal timestamps keep the order in
/// which they were resolved.
pub fn apply_query(records: Vec<Record>, query: &ListQuery) -> ListingPage {
    let (page, page_size) = clamp_paging(query.page, query.page_size);

    let mut matching: Vec<Record> = records
        .into_iter()
        .filter(|record| matches_filters(record, query))
        .collect();
    matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let total = matching.len();
    let start = (page - 1).saturating_mul(page_size);
    let records = matching.into_iter().skip(start).take(page_size).collect();

    ListingPage {
        records,
        total,
        page,
        page_size,
    }
}

pub fn resolve_records<K>(kv: &K, scope: ListingScope) -> Result<Vec<Record>, StoreError>
where
    K: KvStore + ?Sized,
{
    let resolver = Resolver::new(kv);
    let mut records = Vec::new();

    match scope {
        ListingScope::Published => {
            for id in read_global_identifiers(kv)? {
                match resolver.resolve_global(&id)? {
                    Some(record) => records.push(record),
                    None => tracing::debug!(id = %id, "published identifier has no record"),
                }
            }
        }
        ListingScope::AllPartitions => {
            let reconciliation = reconcile_partitions(kv)?;
            records.reserve(reconciliation.len());
            for candidate in reconciliation.candidates() {
                if let Some(resolved) = resolver.resolve(candidate.id, candidate.source_hint)? {
                    records.push(resolved.record);
                }
            }
        }
    }
    Ok(records)
}

/// Reconcile, resolve, filter and page, then attach tenant display names to
/// the returned page.
pub fn list_records<K, N>(
    kv: &K,
    scope: ListingScope,
    query: &ListQuery,
    names: &N,
) -> Result<ListingPage, StoreError>
where
    K: KvStore + ?Sized,
    N: DisplayNameLookup + ?Sized,
{
    let records = resolve_records(kv, scope)?;
    let resolved = records.len();
    let mut page = apply_query(records, query);
    apply_display_names(&mut page, names);

    tracing::info!(
        component = "listing",
        scope = ?scope,
        resolved,
        total = page.total,
        page = page.page,
        page_size = page.page_size,
        returned = page.records.len(),
        "listing page built"
    );
    Ok(page)
}

/// Lookup failures keep each record's stored display name.
pub fn apply_display_names<N>(page: &mut ListingPage, names: &N)
where
    N: DisplayNameLookup + ?Sized,
{
    let tenant_ids: BTreeSet<String> = page
        .records
        .iter()
        .filter_map(|record| record.customer_id.clone())
        .collect();
    if tenant_ids.is_empty() {
        return;
    }

    let resolved = match names.display_names(&tenant_ids) {
        Ok(resolved) => resolved,
        Err(error) => {
            tracing::warn!(%error, tenants = tenant_ids.len(), "display name lookup failed");
            return;
        }
    };

    for record in &mut page.records {
        let name = record
            .customer_id
            .as_ref()
            .and_then(|tenant_id| resolved.get(tenant_id));
        if let Some(name) = name {
            record.customer_display_name = Some(name.clone());
        }
    }
}
