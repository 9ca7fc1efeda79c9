mod support;

use std::collections::{BTreeSet, HashMap};

use mod_index_core::listing::{
    list_records, resolve_records, DisplayNameLookup, ListQuery, ListingScope, NoDisplayNames,
};
use mod_index_core::reconcile::reconcile_partitions;
use mod_index_core::record::RecordStatus;
use mod_index_core::resolve::{ResolutionTier, Resolver};
use serde_json::json;
use support::{record_doc, IndexFixture};

#[test]
fn promoted_record_resolves_globally_and_pending_one_via_hint() {
    let fixture = IndexFixture::new(10)
        .global(&["m1"])
        .global_record(record_doc("m1", "approved", "maps", "2026-02-10T00:00:00Z"))
        .tenant("t1", &["m1", "m2"])
        .tenant_record("t1", record_doc("m2", "pending", "maps", "2026-02-11T00:00:00Z"));

    let reconciliation = reconcile_partitions(&fixture.kv).expect("reconcile should succeed");
    assert_eq!(
        reconciliation.tenant_only.keys().collect::<Vec<_>>(),
        vec!["m2"]
    );
    assert_eq!(reconciliation.source_hint("m2"), Some("t1"));

    let resolver = Resolver::new(&fixture.kv);
    let m1 = resolver
        .resolve("m1", None)
        .expect("resolve should succeed")
        .expect("m1 should resolve");
    assert_eq!(m1.tier, ResolutionTier::Global);

    let m2 = resolver
        .resolve("m2", reconciliation.source_hint("m2"))
        .expect("resolve should succeed")
        .expect("m2 should resolve");
    assert_eq!(m2.tier, ResolutionTier::Hinted);
    assert_eq!(m2.record.status, RecordStatus::Pending);
}

#[test]
fn reconciliation_is_independent_of_page_boundaries() {
    let tenants: Vec<String> = (0..7).map(|i| format!("t{i}")).collect();

    let mut baseline = None;
    for page_size in [1, 2, 3, 5, 50] {
        let mut fixture = IndexFixture::new(page_size).global(&["g1", "shared"]);
        for (index, tenant) in tenants.iter().enumerate() {
            let own = format!("only-{index}");
            fixture = fixture.tenant(tenant, &["shared", own.as_str(), "common"]);
            fixture.kv.insert_json(
                &format!("tenant:{tenant}:record:{own}"),
                &json!({"irrelevant": true}),
            );
        }

        let reconciliation = reconcile_partitions(&fixture.kv).expect("reconcile should succeed");
        let ids: BTreeSet<String> = reconciliation.tenant_only.keys().cloned().collect();

        assert_eq!(reconciliation.tenants_scanned, tenants.len());
        assert!(!ids.contains("shared"));
        assert_eq!(ids.len(), tenants.len() + 1, "page size {page_size}");
        match &baseline {
            None => baseline = Some(ids),
            Some(expected) => assert_eq!(&ids, expected, "page size {page_size}"),
        }
    }
}

#[test]
fn listing_pages_are_counted_exactly() {
    let mut fixture = IndexFixture::new(4);
    for i in 0..10 {
        fixture = fixture.tenant(&format!("t{i:02}"), &[]);
    }

    let reconciliation = reconcile_partitions(&fixture.kv).expect("reconcile should succeed");

    assert_eq!(reconciliation.pages, 3);
    assert_eq!(fixture.kv.list_calls(), 3);
}

#[test]
fn all_partitions_listing_filters_sorts_and_pages() {
    let fixture = IndexFixture::new(2)
        .global(&["a1", "a2"])
        .global_record(record_doc("a1", "approved", "maps", "2026-02-01T00:00:00Z"))
        .global_record(record_doc("a2", "approved", "skins", "2026-02-05T00:00:00Z"))
        .tenant("t1", &["p1", "a1"])
        .tenant_record("t1", record_doc("p1", "pending", "maps", "2026-02-07T00:00:00Z"))
        .tenant("t2", &["p2", "lost"])
        .tenant_record("t9", record_doc("p2", "pending", "maps", "2026-02-03T00:00:00Z"));

    let everything = list_records(
        &fixture.kv,
        ListingScope::AllPartitions,
        &ListQuery::default(),
        &NoDisplayNames,
    )
    .expect("listing should succeed");
    let ids: Vec<_> = everything.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "a2", "p2", "a1"]);
    assert_eq!(everything.total, 4);

    let maps_page_two = list_records(
        &fixture.kv,
        ListingScope::AllPartitions,
        &ListQuery {
            category: Some("maps".to_string()),
            page: Some(2),
            page_size: Some(2),
            ..ListQuery::default()
        },
        &NoDisplayNames,
    )
    .expect("listing should succeed");
    let ids: Vec<_> = maps_page_two.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a1"]);
    assert_eq!(maps_page_two.total, 3);
    assert_eq!(maps_page_two.page, 2);
    assert_eq!(maps_page_two.page_size, 2);
}

#[test]
fn published_listing_reads_only_the_global_partition() {
    let fixture = IndexFixture::new(10)
        .global(&["a1", "missing"])
        .global_record(record_doc("a1", "approved", "maps", "2026-02-01T00:00:00Z"))
        .tenant("t1", &["p1"])
        .tenant_record("t1", record_doc("p1", "pending", "maps", "2026-02-07T00:00:00Z"));

    let records =
        resolve_records(&fixture.kv, ListingScope::Published).expect("resolve should succeed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "a1");
    assert_eq!(fixture.kv.list_calls(), 0);
}

#[test]
fn malformed_records_are_skipped_not_fatal() {
    let fixture = IndexFixture::new(10)
        .global(&["good", "broken"])
        .global_record(record_doc("good", "approved", "maps", "2026-02-01T00:00:00Z"));
    fixture.kv.insert_raw("record:broken", b"{\"id\": \"broken\"");

    let page = list_records(
        &fixture.kv,
        ListingScope::AllPartitions,
        &ListQuery::default(),
        &NoDisplayNames,
    )
    .expect("listing should succeed");

    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].id, "good");
}

#[test]
fn store_failure_fails_the_listing() {
    let fixture = IndexFixture::new(10).global(&["a1"]);
    fixture.kv.fail_listing();

    let error = list_records(
        &fixture.kv,
        ListingScope::AllPartitions,
        &ListQuery::default(),
        &NoDisplayNames,
    )
    .expect_err("listing failure should propagate");
    assert!(error.to_string().contains("simulated listing failure"));
}

struct CountingNames {
    seen: std::sync::Mutex<Vec<BTreeSet<String>>>,
}

impl DisplayNameLookup for CountingNames {
    fn display_names(
        &self,
        tenant_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, String>, String> {
        self.seen
            .lock()
            .expect("poisoned mutex")
            .push(tenant_ids.clone());
        Ok(tenant_ids
            .iter()
            .map(|id| (id.clone(), format!("Studio {id}")))
            .collect())
    }
}

#[test]
fn display_names_are_looked_up_for_the_returned_page_only() {
    let mut newer = record_doc("p1", "pending", "maps", "2026-02-07T00:00:00Z");
    newer["customerId"] = json!("t1");
    let mut older = record_doc("p2", "pending", "maps", "2026-02-01T00:00:00Z");
    older["customerId"] = json!("t2");

    let fixture = IndexFixture::new(10)
        .tenant("t1", &["p1"])
        .tenant_record("t1", newer)
        .tenant("t2", &["p2"])
        .tenant_record("t2", older);

    let names = CountingNames {
        seen: std::sync::Mutex::new(Vec::new()),
    };
    let page = list_records(
        &fixture.kv,
        ListingScope::AllPartitions,
        &ListQuery {
            page_size: Some(1),
            ..ListQuery::default()
        },
        &names,
    )
    .expect("listing should succeed");

    assert_eq!(page.records.len(), 1);
    assert_eq!(
        page.records[0].customer_display_name.as_deref(),
        Some("Studio t1")
    );
    let seen = names.seen.lock().expect("poisoned mutex").clone();
    assert_eq!(seen, vec![BTreeSet::from(["t1".to_string()])]);
}
