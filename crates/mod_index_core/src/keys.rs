pub const GLOBAL_LIST_KEY: &str = "mods_list";
pub const RECORD_PREFIX: &str = "record:";
pub const TENANT_PREFIX: &str = "tenant:";
pub const TENANT_LIST_SUFFIX: &str = ":mods_list";

const TENANT_RECORD_INFIX: &str = ":record:";
const TENANT_PROFILE_SUFFIX: &str = ":profile";

/// Canonical form of a record identifier.
///
/// Strips surrounding whitespace and every leading `record:` prefix, so
/// `normalize_identifier(normalize_identifier(x)) == normalize_identifier(x)`.
pub fn normalize_identifier(raw: &str) -> String {
    let mut current = raw.trim();
    while let Some(rest) = current.strip_prefix(RECORD_PREFIX) {
        current = rest.trim();
    }
    current.to_string()
}

pub fn global_record_key(normalized_id: &str) -> String {
    format!("{RECORD_PREFIX}{normalized_id}")
}

pub fn tenant_list_key(tenant_id: &str) -> String {
    format!("{TENANT_PREFIX}{tenant_id}{TENANT_LIST_SUFFIX}")
}

pub fn tenant_record_key(tenant_id: &str, normalized_id: &str) -> String {
    format!("{TENANT_PREFIX}{tenant_id}{TENANT_RECORD_INFIX}{normalized_id}")
}

pub fn tenant_profile_key(tenant_id: &str) -> String {
    format!("{TENANT_PREFIX}{tenant_id}{TENANT_PROFILE_SUFFIX}")
}

/// Tenant id for a `tenant:<id>:mods_list` key, `None` for any other key.
pub fn tenant_from_list_key(key: &str) -> Option<&str> {
    let tenant_id = key
        .strip_prefix(TENANT_PREFIX)?
        .strip_suffix(TENANT_LIST_SUFFIX)?;
    valid_tenant_segment(tenant_id).then_some(tenant_id)
}

/// Tenant id for a `tenant:<id>:record:<normalized_id>` key.
pub fn tenant_from_record_key<'a>(key: &'a str, normalized_id: &str) -> Option<&'a str> {
    let tenant_id = key
        .strip_prefix(TENANT_PREFIX)?
        .strip_suffix(normalized_id)?
        .strip_suffix(TENANT_RECORD_INFIX)?;
    valid_tenant_segment(tenant_id).then_some(tenant_id)
}

fn valid_tenant_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_repeated_prefixes_and_is_idempotent() {
        for raw in ["m1", " record:m1 ", "record:record:m1", "record: m1"] {
            let once = normalize_identifier(raw);
            assert_eq!(once, "m1", "raw input {raw:?}");
            assert_eq!(normalize_identifier(&once), once);
        }
        assert_eq!(normalize_identifier("record:"), "");
    }

    #[test]
    fn builds_partition_keys() {
        assert_eq!(global_record_key("m1"), "record:m1");
        assert_eq!(tenant_list_key("t1"), "tenant:t1:mods_list");
        assert_eq!(tenant_record_key("t1", "m2"), "tenant:t1:record:m2");
        assert_eq!(tenant_profile_key("t1"), "tenant:t1:profile");
    }

    #[test]
    fn extracts_tenant_from_list_keys_only() {
        assert_eq!(tenant_from_list_key("tenant:t1:mods_list"), Some("t1"));
        assert_eq!(tenant_from_list_key("tenant::mods_list"), None);
        assert_eq!(tenant_from_list_key("tenant:t1:record:mods_list"), None);
        assert_eq!(tenant_from_list_key("tenant:t1:profile"), None);
        assert_eq!(tenant_from_list_key("mods_list"), None);
    }

    #[test]
    fn extracts_tenant_from_record_keys_matching_the_identifier() {
        assert_eq!(tenant_from_record_key("tenant:t9:record:m2", "m2"), Some("t9"));
        assert_eq!(tenant_from_record_key("tenant:t9:record:xm2", "m2"), None);
        assert_eq!(tenant_from_record_key("tenant:t9:record:m2", "m3"), None);
        assert_eq!(tenant_from_record_key("tenant:a:b:record:m2", "m2"), None);
    }
}
