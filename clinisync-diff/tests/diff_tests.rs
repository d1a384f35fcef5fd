use clinisync_diff::{
    diff, diffable_object, diffable_scalar, DiffError, Keyed, NodeKind, Patch, PatchOp,
};
use pretty_assertions::assert_eq;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Active,
    Archived,
}
diffable_scalar!(Status);

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Name {
    first: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    middle: Option<String>,
    last: String,
}
diffable_object!(Name { first, middle, last });

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Visit {
    id: u64,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}
diffable_object!(Visit { id, status, note });

impl Keyed for Visit {
    fn diff_key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Record {
    name: Name,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    phones: BTreeMap<String, String>,
    visits: Vec<Visit>,
}
diffable_object!(Record { name, email, phones, visits });

fn visit(id: u64) -> Visit {
    Visit {
        id,
        status: Status::Active,
        note: None,
    }
}

fn record() -> Record {
    Record {
        name: Name {
            first: "Ada".into(),
            middle: None,
            last: "Byron".into(),
        },
        email: Some("ada@example.com".into()),
        phones: BTreeMap::from([("0400000000".to_string(), "mobile".to_string())]),
        visits: vec![visit(1), visit(2)],
    }
}

fn set(value: serde_json::Value) -> PatchOp {
    PatchOp::Set(value)
}

// ── Identity and null handling ──────────────────────────────────

#[test]
fn identical_values_produce_empty_patch() {
    let r = record();
    let patch = diff(Some(&r), Some(&r)).unwrap();
    assert!(patch.is_empty());
    assert!(!patch.is_delete());
}

#[test]
fn two_nulls_produce_empty_patch() {
    let patch = diff::<Record>(None, None).unwrap();
    assert!(patch.is_empty());
}

#[test]
fn removing_whole_value_is_a_delete() {
    let r = record();
    let patch = diff(Some(&r), None).unwrap();
    assert!(patch.is_delete());
    assert_eq!(patch.get(""), Some(&PatchOp::Unset));
}

#[test]
fn empty_patch_is_not_a_delete() {
    assert!(!Patch::new().is_delete());
}

#[test]
fn inserting_object_emits_every_present_field() {
    let r = record();
    let patch = diff(None, Some(&r)).unwrap();

    assert_eq!(patch.get("name.first"), Some(&set(json!("Ada"))));
    assert_eq!(patch.get("name.last"), Some(&set(json!("Byron"))));
    assert_eq!(patch.get("email"), Some(&set(json!("ada@example.com"))));
    assert_eq!(
        patch.get("phones"),
        Some(&set(json!({ "0400000000": "mobile" })))
    );
    assert_eq!(
        patch.get("visits"),
        Some(&set(json!([
            { "id": 1, "status": "active" },
            { "id": 2, "status": "active" },
        ])))
    );
    assert!(!patch.contains("name.middle"));
    assert_eq!(patch.len(), 5);
}

#[test]
fn inserting_scalar_assigns_root() {
    let patch = diff(None, Some(&"x".to_string())).unwrap();
    assert_eq!(patch.get(""), Some(&set(json!("x"))));
}

// ── Scalars and objects ─────────────────────────────────────────

#[test]
fn changed_scalar_assigns_leaf() {
    let old = record();
    let mut new = record();
    new.name.last = "Lovelace".into();

    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert_eq!(patch.len(), 1);
    assert_eq!(patch.get("name.last"), Some(&set(json!("Lovelace"))));
}

#[test]
fn cleared_optional_field_is_unset() {
    let old = record();
    let mut new = record();
    new.email = None;

    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert_eq!(patch.unsets().collect::<Vec<_>>(), vec!["email"]);
    assert_eq!(patch.len(), 1);
}

#[test]
fn enum_scalar_change_is_serialized() {
    let old = visit(1);
    let mut new = visit(1);
    new.status = Status::Archived;

    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert_eq!(patch.get("status"), Some(&set(json!("archived"))));
}

// ── Keyed maps ──────────────────────────────────────────────────

#[test]
fn map_changes_are_per_key() {
    let old = record();
    let mut new = record();
    new.phones.insert("0400000000".into(), "home".into());
    new.phones.insert("0299999999".into(), "work".into());

    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert_eq!(patch.get("phones.0400000000"), Some(&set(json!("home"))));
    assert_eq!(patch.get("phones.0299999999"), Some(&set(json!("work"))));
    assert_eq!(patch.len(), 2);
}

#[test]
fn removed_map_key_is_unset() {
    let old = record();
    let mut new = record();
    new.phones.clear();

    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert_eq!(patch.get("phones.0400000000"), Some(&PatchOp::Unset));
    assert_eq!(patch.len(), 1);
}

#[test]
fn empty_maps_produce_nothing() {
    let old: BTreeMap<String, String> = BTreeMap::new();
    let patch = diff(Some(&old), Some(&old.clone())).unwrap();
    assert!(patch.is_empty());
}

#[test]
fn map_inserted_against_absent_is_whole() {
    let new = HashMap::from([("a".to_string(), 1_u32), ("b".to_string(), 2)]);
    let patch = diff(None, Some(&new)).unwrap();
    assert_eq!(patch.get(""), Some(&set(json!({ "a": 1, "b": 2 }))));
    assert_eq!(patch.len(), 1);
}

#[test]
fn dotted_map_key_is_rejected() {
    let old: BTreeMap<String, u32> = BTreeMap::new();
    let new = BTreeMap::from([("a.b".to_string(), 1_u32)]);
    let err = diff(Some(&old), Some(&new)).unwrap_err();
    assert!(matches!(err, DiffError::InvalidKey { key, .. } if key == "a.b"));
}

// ── Identity lists ──────────────────────────────────────────────

#[test]
fn list_append_touches_only_new_index() {
    let old = record();
    let mut new = record();
    new.visits.push(visit(3));

    let patch = diff(Some(&old), Some(&new)).unwrap();
    let mut expected = Patch::new();
    expected.set(
        &clinisync_diff::FieldPath::parse("visits.2"),
        json!({ "id": 3, "status": "active" }),
    );
    assert_eq!(patch, expected);
}

#[test]
fn list_element_matched_by_key_regardless_of_position() {
    let old = vec![visit(1), visit(2)];
    let mut moved = visit(2);
    moved.note = Some("late".into());
    let new = vec![moved, visit(1)];

    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert_eq!(patch.get("1.note"), Some(&set(json!("late"))));
    assert_eq!(patch.len(), 1);
}

#[test]
fn list_removal_is_not_emitted() {
    let old = vec![visit(1), visit(2)];
    let new = vec![visit(2)];
    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert!(patch.is_empty());
}

#[test]
fn several_appends_get_consecutive_indices() {
    let old = vec![visit(1)];
    let new = vec![visit(5), visit(1), visit(6)];
    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert_eq!(patch.paths().collect::<Vec<_>>(), vec!["1", "2"]);
    assert_eq!(patch.get("1"), Some(&set(json!({ "id": 5, "status": "active" }))));
    assert_eq!(patch.get("2"), Some(&set(json!({ "id": 6, "status": "active" }))));
}

#[test]
fn duplicate_keys_in_new_list_are_rejected() {
    let old = vec![visit(1)];
    let new = vec![visit(2), visit(2)];
    let err = diff(Some(&old), Some(&new)).unwrap_err();
    assert!(matches!(err, DiffError::DuplicateKey { key, .. } if key == "2"));
}

// ── Dynamic JSON ────────────────────────────────────────────────

#[test]
fn json_objects_diff_per_key() {
    let old = json!({ "a": 1, "b": { "c": true }, "gone": "x" });
    let new = json!({ "a": 1, "b": { "c": false }, "added": [1, 2] });

    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert_eq!(patch.get("b.c"), Some(&set(json!(false))));
    assert_eq!(patch.get("added"), Some(&set(json!([1, 2]))));
    assert_eq!(patch.get("gone"), Some(&PatchOp::Unset));
    assert_eq!(patch.len(), 3);
}

#[test]
fn json_null_counts_as_absent() {
    let old = json!({ "a": null });
    let new = json!({});
    assert!(diff(Some(&old), Some(&new)).unwrap().is_empty());
}

#[test]
fn json_arrays_are_replaced_whole() {
    let old = json!({ "tags": [1, 2, 3] });
    let new = json!({ "tags": [1, 2] });
    let patch = diff(Some(&old), Some(&new)).unwrap();
    assert_eq!(patch.get("tags"), Some(&set(json!([1, 2]))));
}

#[test]
fn kind_mismatch_fails_loudly() {
    let old = json!({ "a": { "b": 1 } });
    let new = json!({ "a": "flat" });
    let err = diff(Some(&old), Some(&new)).unwrap_err();
    match err {
        DiffError::KindMismatch { path, old, new } => {
            assert_eq!(path, "a");
            assert_eq!(old, NodeKind::Map);
            assert_eq!(new, NodeKind::Scalar);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn patch_serializes_as_tagged_entries() {
    let mut patch = Patch::new();
    patch.set(&clinisync_diff::FieldPath::parse("a.b"), json!(1));
    patch.unset(&clinisync_diff::FieldPath::parse("c"));

    let encoded = serde_json::to_value(&patch).unwrap();
    assert_eq!(
        encoded,
        json!({
            "a.b": { "op": "set", "value": 1 },
            "c": { "op": "unset" },
        })
    );
    let decoded: Patch = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, patch);
}
