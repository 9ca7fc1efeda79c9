#![allow(dead_code)]

use mod_index_core::keys::{global_record_key, tenant_list_key, tenant_record_key, GLOBAL_LIST_KEY};
use mod_index_core::memory::MemoryKvStore;
use serde_json::{json, Value};

pub const NOW_MS: i64 = 1_771_000_000_000;
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Stored record document with sensible defaults.
pub fn record_doc(id: &str, status: &str, category: &str, updated_at: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "category": category,
        "title": format!("Mod {id}"),
        "description": "",
        "tags": [],
        "authorId": "author-1",
        "customerId": null,
        "updatedAt": updated_at,
    })
}

/// Builder for a KV index spread across a global and several tenant partitions.
pub struct IndexFixture {
    pub kv: MemoryKvStore,
}

impl IndexFixture {
    pub fn new(page_size: usize) -> Self {
        Self {
            kv: MemoryKvStore::new(page_size),
        }
    }

    pub fn global(self, ids: &[&str]) -> Self {
        self.kv.insert_json(GLOBAL_LIST_KEY, &json!(ids));
        self
    }

    pub fn global_record(self, doc: Value) -> Self {
        let id = doc["id"].as_str().expect("fixture id").to_string();
        self.kv.insert_json(&global_record_key(&id), &doc);
        self
    }

    pub fn tenant(self, tenant_id: &str, ids: &[&str]) -> Self {
        self.kv.insert_json(&tenant_list_key(tenant_id), &json!(ids));
        self
    }

    pub fn tenant_record(self, tenant_id: &str, doc: Value) -> Self {
        let id = doc["id"].as_str().expect("fixture id").to_string();
        self.kv.insert_json(&tenant_record_key(tenant_id, &id), &doc);
        self
    }

    pub fn tenant_profile(self, tenant_id: &str, display_name: &str) -> Self {
        self.kv.insert_json(
            &mod_index_core::keys::tenant_profile_key(tenant_id),
            &json!({ "displayName": display_name }),
        );
        self
    }
}
