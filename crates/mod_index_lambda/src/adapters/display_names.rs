use std::collections::{BTreeSet, HashMap};

use mod_index_core::keys::tenant_profile_key;
use mod_index_core::listing::DisplayNameLookup;
use mod_index_core::store::KvStore;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantProfile {
    #[serde(default)]
    display_name: Option<String>,
}

/// Reads `tenant:<id>:profile` documents from the index store.
///
/// Each tenant is looked up independently. Missing, unreadable or failed
/// profiles are left out of the result; the lookup only fails when every
/// profile read failed.
pub struct KvDisplayNameLookup<'a, K: ?Sized> {
    kv: &'a K,
}

impl<'a, K> KvDisplayNameLookup<'a, K>
where
    K: KvStore + ?Sized,
{
    pub fn new(kv: &'a K) -> Self {
        Self { kv }
    }
}

impl<K> DisplayNameLookup for KvDisplayNameLookup<'_, K>
where
    K: KvStore + ?Sized,
{
    fn display_names(
        &self,
        tenant_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, String>, String> {
        let mut names = HashMap::with_capacity(tenant_ids.len());
        let mut last_failure = None;
        let mut failed = 0;

        for tenant_id in tenant_ids {
            let key = tenant_profile_key(tenant_id);
            let bytes = match self.kv.get(&key) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!(key = %key, %error, "tenant profile read failed");
                    failed += 1;
                    last_failure = Some(error);
                    continue;
                }
            };
            match serde_json::from_slice::<TenantProfile>(&bytes) {
                Ok(TenantProfile {
                    display_name: Some(name),
                }) if !name.trim().is_empty() => {
                    names.insert(tenant_id.clone(), name);
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(key = %key, %error, "skipping malformed tenant profile");
                }
            }
        }

        match last_failure {
            Some(error) if failed == tenant_ids.len() => Err(error.to_string()),
            _ => Ok(names),
        }
    }
}
