use chrono::{TimeZone, Utc};
use lectio_delta::{
    manifest_file_name, ChangeDescriptor, ColumnMap, ManifestFile, SqlValue, UpdateManifest,
};
use proptest::prelude::*;

fn manifest(from: i64, latest: i64) -> UpdateManifest {
    UpdateManifest {
        from_version: from,
        latest_version: latest,
        changes: Vec::new(),
        size_hint: None,
        description: None,
    }
}

// ── Derived flag ────────────────────────────────────────────────

#[test]
fn equal_versions_have_no_updates() {
    assert!(!manifest(7, 7).has_updates());
    assert!(!UpdateManifest::up_to_date(7).has_updates());
}

#[test]
fn newer_latest_has_updates() {
    assert!(manifest(6, 7).has_updates());
}

#[test]
fn older_latest_has_no_updates() {
    assert!(!manifest(8, 7).has_updates());
}

#[test]
fn wire_has_updates_is_ignored_on_read() {
    let m: UpdateManifest = serde_json::from_str(
        r#"{"fromVersion": 7, "latestVersion": 7, "hasUpdates": true, "changes": []}"#,
    )
    .unwrap();
    assert!(!m.has_updates());
}

#[test]
fn wire_has_updates_is_written_from_versions() {
    let json = serde_json::to_value(manifest(3, 5)).unwrap();
    assert_eq!(json["hasUpdates"], serde_json::json!(true));
    assert_eq!(json["fromVersion"], serde_json::json!(3));
    assert_eq!(json["latestVersion"], serde_json::json!(5));
    assert!(json.get("sizeHint").is_none());
}

#[test]
fn missing_changes_defaults_to_empty() {
    let m: UpdateManifest =
        serde_json::from_str(r#"{"fromVersion": 7, "latestVersion": 7}"#).unwrap();
    assert!(m.changes.is_empty());
}

#[test]
fn structured_value_fails_to_parse() {
    let result = serde_json::from_str::<UpdateManifest>(
        r#"{"fromVersion": 1, "latestVersion": 2, "changes": [
            {"table": "bible_verses", "operation": "insert", "data": {"text": {"nested": 1}}}
        ]}"#,
    );
    assert!(result.is_err());
}

proptest! {
    #[test]
    fn has_updates_matches_version_order(from in -1000i64..1000, latest in -1000i64..1000) {
        let m = manifest(from, latest);
        prop_assert_eq!(m.has_updates(), latest > from);

        let roundtrip: serde_json::Value = serde_json::to_value(&m).unwrap();
        prop_assert_eq!(roundtrip["hasUpdates"].as_bool(), Some(latest > from));
    }
}

// ── Manifest files ──────────────────────────────────────────────

fn file() -> ManifestFile {
    ManifestFile {
        version: 7,
        description: "Fix John 3:16".into(),
        created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        created_by: "editor".into(),
        changes: vec![ChangeDescriptor::update(
            "bible_verses",
            ColumnMap::from([("id".to_string(), SqlValue::Integer(1))]),
            ColumnMap::from([("text".to_string(), SqlValue::from("For God so loved"))]),
        )],
    }
}

#[test]
fn file_name_encodes_version() {
    assert_eq!(manifest_file_name(12), "update_v12.json");
    assert_eq!(file().file_name(), "update_v7.json");
}

#[test]
fn file_uses_snake_case_fields() {
    let json = serde_json::to_value(file()).unwrap();
    assert_eq!(json["version"], serde_json::json!(7));
    assert_eq!(json["created_by"], serde_json::json!("editor"));
    assert_eq!(json["changes"][0]["where"]["id"], serde_json::json!(1));
    assert_eq!(json["changes"][0]["data"]["text"], serde_json::json!("For God so loved"));
}

#[test]
fn file_serves_as_update() {
    let update = file().into_update(6);
    assert!(update.has_updates());
    assert_eq!(update.latest_version, 7);
    assert_eq!(update.changes.len(), 1);
    assert_eq!(update.description.as_deref(), Some("Fix John 3:16"));
    assert!(update.size_hint.unwrap_or(0) > 0);
}
