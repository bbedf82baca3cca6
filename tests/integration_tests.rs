//! Integration tests using a mock HTTP server
//!
//! Tests the full end-to-end flow: config file → credential refresh →
//! paginated extraction → RECORD/STATE output.

use serde_json::json;
use square_tap::auth::CredentialManager;
use square_tap::config::TapConfig;
use square_tap::state::StateStore;
use square_tap::sync::{Message, MessageWriter, SyncEngine, VecWriter};
use square_tap::SquareClient;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &tempfile::TempDir, value: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join("config.json");
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

// ============================================================================
// Credential + sync end-to-end
// ============================================================================

#[tokio::test]
async fn test_refresh_then_sync_locations() {
    let mock_server = MockServer::start().await;

    // No cached access token, so the run starts with a refresh
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_json(json!({
            "client_id": "ci",
            "client_secret": "cs",
            "grant_type": "refresh_token",
            "refresh_token": "rt-0",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-new",
            "refresh_token": "rt-1",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/locations"))
        .and(header("authorization", "Bearer at-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "locations": [{"id": "L1", "name": "Downtown"}, {"id": "L2", "name": "Uptown"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(
        &dir,
        &json!({
            "refresh_token": "rt-0",
            "client_id": "ci",
            "client_secret": "cs",
            "start_date": "2023-01-01T00:00:00Z",
        }),
    );

    let mut config = TapConfig::load(&config_path).unwrap();
    let manager = CredentialManager::with_base_url(mock_server.uri());
    let token = manager
        .ensure_valid_credential(&mut config, &config_path)
        .await
        .unwrap();
    assert_eq!(token, "at-new");

    // The rotated pair is on disk before any extraction starts
    let persisted = TapConfig::load(&config_path).unwrap();
    assert_eq!(persisted.access_token.as_deref(), Some("at-new"));
    assert_eq!(persisted.refresh_token, "rt-1");

    let client = SquareClient::with_base_url(mock_server.uri(), token);
    let mut engine = SyncEngine::new(&client, StateStore::in_memory(), "2023-01-01T00:00:00Z");
    let mut out = VecWriter::default();
    engine
        .sync(&["locations".to_string()], &mut out)
        .await
        .unwrap();

    let records: Vec<_> = out
        .messages
        .iter()
        .filter_map(|m| match m {
            Message::Record { stream, record } => Some((stream.clone(), record.clone())),
            Message::State { .. } => None,
        })
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].0, "locations");
    assert_eq!(records[0].1["id"], "L1");

    let states = out
        .messages
        .iter()
        .filter(|m| matches!(m, Message::State { .. }))
        .count();
    assert!(states >= 1);
}

// ============================================================================
// State persistence across separate runs
// ============================================================================

#[tokio::test]
async fn test_interrupted_run_resumes_then_clears_bookmark() {
    let mock_server = MockServer::start().await;

    let shifts_body_resumed = json!({
        "query": {"sort": {"field": "UPDATED_AT", "order": "ASC"}},
        "cursor": "c1",
    });

    // Only the resumed request is mounted: a run picking up a bookmark must
    // go straight to the saved cursor, never probe from the start.
    Mock::given(method("POST"))
        .and(path("/v2/labor/shifts/search"))
        .and(body_json(&shifts_body_resumed))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "shifts": [{"id": "s2"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    {
        // Bookmark left behind by an interrupted run
        let mut seed = StateStore::from_file(&state_path).unwrap();
        seed.set_cursor("shifts", "c1".to_string()).unwrap();
    }

    let client = SquareClient::with_base_url(mock_server.uri(), "at");
    let store = StateStore::from_file(&state_path).unwrap();
    let mut engine = SyncEngine::new(&client, store, "2023-01-01T00:00:00Z");
    let mut out = VecWriter::default();
    engine
        .sync(&["shifts".to_string()], &mut out)
        .await
        .unwrap();

    let records = out
        .messages
        .iter()
        .filter(|m| matches!(m, Message::Record { .. }))
        .count();
    assert_eq!(records, 1);

    // The sequence completed, so the bookmark is gone and the next run
    // starts fresh instead of replaying the final page
    let reloaded = StateStore::from_file(&state_path).unwrap();
    assert_eq!(reloaded.get_cursor("shifts"), None);
}

// ============================================================================
// Retry behavior under a live sync
// ============================================================================

#[tokio::test]
async fn test_sync_survives_transient_503() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/locations"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "locations": [{"id": "L1"}]
        })))
        .mount(&mock_server)
        .await;

    let client = SquareClient::with_base_url(mock_server.uri(), "at");
    let mut engine = SyncEngine::new(&client, StateStore::in_memory(), "2023-01-01T00:00:00Z");
    let mut out = VecWriter::default();
    engine
        .sync(&["locations".to_string()], &mut out)
        .await
        .unwrap();

    let record_count = out
        .messages
        .iter()
        .filter(|m| matches!(m, Message::Record { .. }))
        .count();
    assert_eq!(record_count, 1);
}

// ============================================================================
// Output framing
// ============================================================================

#[test]
fn test_json_lines_framing() {
    let mut buf = Vec::new();
    {
        let mut writer = square_tap::sync::JsonLinesWriter::new(&mut buf);
        writer
            .write(Message::record("locations", json!({"id": "L1"})))
            .unwrap();
        writer
            .write(Message::state(json!({"bookmarks": {"shifts": "c1"}})))
            .unwrap();
    }

    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);

    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["type"], "RECORD");
    assert_eq!(record["stream"], "locations");
    assert_eq!(record["record"]["id"], "L1");

    let state: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(state["type"], "STATE");
    assert_eq!(state["value"]["bookmarks"]["shifts"], "c1");
}
