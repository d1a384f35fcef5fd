use clinisync_model::SyncMetadata;
use clinisync_runner::{load_config, run_once, RunnerConfig};
use clinisync_store::DocumentStore;
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESOURCES: [&str; 8] = [
    "appointment_types",
    "patients",
    "patient_cases",
    "individual_appointments",
    "attendees",
    "practitioners",
    "users",
    "practitioner_reference_numbers",
];

fn write_config(dir: &Path, value: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("clinisync.json");
    std::fs::write(&path, value.to_string()).unwrap();
    path
}

#[test]
fn loads_partial_config_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        json!({
            "database": "/var/lib/clinisync/store.db",
            "source": { "base_url": "https://api.example.com/v1", "api_key": "from-file" },
            "sync": { "incremental": true }
        }),
    );

    let config = load_config(&path).unwrap();
    assert_eq!(config.database, Path::new("/var/lib/clinisync/store.db"));
    assert_eq!(config.source.api_key, "from-file");
    assert_eq!(config.source.per_page, 100);
    assert!(config.sync.incremental);
    assert_eq!(config.sync.merge_concurrency, 8);
}

#[test]
fn api_key_override() {
    let config: RunnerConfig = serde_json::from_value(json!({
        "database": "store.db",
        "source": { "api_key": "from-file" }
    }))
    .unwrap();

    let kept = config.clone().with_api_key(None);
    assert_eq!(kept.source.api_key, "from-file");

    let blank = config.clone().with_api_key(Some("  ".into()));
    assert_eq!(blank.source.api_key, "from-file");

    let replaced = config.with_api_key(Some("from-env".into()));
    assert_eq!(replaced.source.api_key, "from-env");
}

#[test]
fn missing_or_invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config"));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));

    let path = write_config(dir.path(), json!({ "sync": {} }));
    assert!(load_config(&path).is_err());
}

#[tokio::test]
async fn run_once_against_empty_upstream() {
    let server = MockServer::start().await;
    for resource in RESOURCES {
        let mut body = serde_json::Map::new();
        body.insert("total_entries".into(), json!(0));
        body.insert(resource.into(), json!([]));
        Mock::given(method("GET"))
            .and(path(format!("/v1/{resource}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("store.db");
    let config: RunnerConfig = serde_json::from_value(json!({
        "database": database,
        "source": { "base_url": format!("{}/v1", server.uri()), "api_key": "secret" }
    }))
    .unwrap();

    let report = run_once(config).await.unwrap();
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.resources.len(), 8);
    assert_eq!(report.applied(), 0);

    let store = DocumentStore::open(&database).unwrap();
    let metadata = store
        .get_singleton::<SyncMetadata>(SyncMetadata::NAME)
        .unwrap()
        .unwrap();
    assert_eq!(metadata.last_sync, Some(report.started_at));
}

#[tokio::test]
async fn run_once_rejects_missing_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let config: RunnerConfig = serde_json::from_value(json!({
        "database": dir.path().join("store.db"),
        "source": { "base_url": "https://api.example.com/v1" }
    }))
    .unwrap();

    let err = run_once(config).await.unwrap_err();
    assert!(err.to_string().contains("Invalid source configuration"));
}
