use clinisync_types::{ExternalId, StorageId};
use proptest::prelude::*;
use std::collections::HashSet;
use std::str::FromStr;

// ── ExternalId ────────────────────────────────────────────────────

#[test]
fn external_id_display_and_parse() {
    let id = ExternalId::new(826_332_652_180_085_831);
    let s = id.to_string();
    assert_eq!(s, "826332652180085831");
    assert_eq!(ExternalId::from_str(&s).unwrap(), id);
}

#[test]
fn external_id_parse_invalid() {
    assert!(ExternalId::from_str("abc").is_err());
    assert!(ExternalId::from_str("-4").is_err());
}

#[test]
fn external_id_serializes_as_number() {
    let json = serde_json::to_string(&ExternalId::new(42)).unwrap();
    assert_eq!(json, "42");
    let back: ExternalId = serde_json::from_str(&json).unwrap();
    assert_eq!(back.get(), 42);
}

#[test]
fn external_id_from_link() {
    let id = ExternalId::from_link("https://api.au1.example.com/v1/patients/1234");
    assert_eq!(id, Some(ExternalId::new(1234)));
}

#[test]
fn external_id_from_link_trailing_slash_and_query() {
    assert_eq!(
        ExternalId::from_link("https://host/v1/practitioners/77/"),
        Some(ExternalId::new(77))
    );
    assert_eq!(
        ExternalId::from_link("https://host/v1/users/9?expand=true"),
        Some(ExternalId::new(9))
    );
}

#[test]
fn external_id_from_link_without_id() {
    assert_eq!(ExternalId::from_link("https://host/v1/patients"), None);
    assert_eq!(ExternalId::from_link(""), None);
}

#[test]
fn external_id_ordering() {
    assert!(ExternalId::new(1) < ExternalId::new(2));
}

// ── StorageId ─────────────────────────────────────────────────────

#[test]
fn storage_id_new_is_unique() {
    let a = StorageId::new();
    let b = StorageId::new();
    assert_ne!(a, b);
}

#[test]
fn storage_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = StorageId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn storage_id_display_and_parse() {
    let id = StorageId::new();
    let parsed = StorageId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn storage_id_parse_invalid() {
    assert!(StorageId::parse("not-a-uuid").is_err());
    assert!(StorageId::from_str("garbage").is_err());
}

#[test]
fn storage_id_hash_and_eq() {
    let id = StorageId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

proptest! {
    #[test]
    fn external_id_link_roundtrip(raw in any::<u64>()) {
        let link = format!("https://host/v1/appointments/{raw}");
        prop_assert_eq!(ExternalId::from_link(&link), Some(ExternalId::new(raw)));
    }
}
