//! End-to-end tests for the export pipeline

use std::path::PathBuf;

use serde_json::Value;
use telegram_exporter::client::PeerKind;
use telegram_exporter::commands::export::{export_options, merge_config, ExportArgs};
use telegram_exporter::config::Config;
use telegram_exporter::error::Error;
use telegram_exporter::export::{export_with_client, ExportOptions};
use telegram_exporter::message::FormattedMessage;
use telegram_exporter::resolver::ChatIdentifier;

use crate::support::{entity, message, Call, FakeClient};

fn options(dir: &tempfile::TempDir, limit: Option<usize>) -> ExportOptions {
    ExportOptions {
        limit,
        batch_size: 100,
        output_dir: dir.path().to_path_buf(),
    }
}

fn rust_chat_client() -> FakeClient {
    FakeClient::new().with_username(
        "rustchat",
        entity(9001, PeerKind::Channel, Some("Rust Chat"), Some("rustchat")),
    )
}

fn read_export(path: &PathBuf) -> Vec<FormattedMessage> {
    let bytes = std::fs::read(path).expect("export file");
    serde_json::from_slice(&bytes).expect("valid json")
}

#[tokio::test]
async fn media_only_messages_are_left_out() {
    let dir = tempfile::tempdir().unwrap();
    let client = rust_chat_client().with_history(vec![
        message(1, Some("first")),
        message(2, None),
        message(3, Some("second")),
        message(4, Some("третье")),
    ]);

    let path = export_with_client(
        &client,
        &ChatIdentifier::from("rustchat"),
        &options(&dir, None),
        &mut |_: usize| {},
    )
    .await
    .unwrap();

    let exported = read_export(&path);
    assert_eq!(exported.len(), 3);
    assert_eq!(exported[0].text, "третье");
    assert!(exported.iter().all(|m| !m.text.is_empty()));
    assert!(client.is_disconnected());
}

#[tokio::test]
async fn limit_keeps_the_earliest_fetched_messages() {
    let dir = tempfile::tempdir().unwrap();
    let history = (1..=5).map(|id| message(id, Some("text"))).collect();
    let client = rust_chat_client().with_history(history);

    let path = export_with_client(
        &client,
        &ChatIdentifier::from("rustchat"),
        &options(&dir, Some(2)),
        &mut |_: usize| {},
    )
    .await
    .unwrap();

    let ids: Vec<i32> = read_export(&path).iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![5, 4]);
}

#[tokio::test]
async fn output_file_is_named_after_chat_title() {
    let dir = tempfile::tempdir().unwrap();
    let client = rust_chat_client();

    let path = export_with_client(
        &client,
        &ChatIdentifier::from("rustchat"),
        &options(&dir, None),
        &mut |_: usize| {},
    )
    .await
    .unwrap();

    assert_eq!(path.parent(), Some(dir.path()));
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("Rust_Chat_"), "{}", name);
    assert!(name.ends_with(".json"));
    // Rust_Chat_ + YYYYMMDD_HHMMSS + .json
    assert_eq!(name.len(), "Rust_Chat_".len() + 15 + ".json".len());

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
}

#[tokio::test]
async fn json_keys_keep_record_order_and_unicode() {
    let dir = tempfile::tempdir().unwrap();
    let client = rust_chat_client().with_history(vec![message(1, Some("Привет 👋"))]);

    let path = export_with_client(
        &client,
        &ChatIdentifier::from("rustchat"),
        &options(&dir, None),
        &mut |_: usize| {},
    )
    .await
    .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("Привет 👋"));
    assert!(!text.contains("\\u"));

    let keys = ["\"id\"", "\"date\"", "\"sender_id\"", "\"sender_name\"", "\"text\""];
    let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value[0]["sender_name"], "Ada Lovelace");
    assert_eq!(value[0]["sender_id"], "1001");
    assert_eq!(value[0]["date"], "2024-06-01 10:01:00");
}

#[tokio::test]
async fn unresolved_chat_fails_before_fetching_and_disconnects() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::new();

    let err = export_with_client(
        &client,
        &ChatIdentifier::from("-100123456"),
        &options(&dir, None),
        &mut |_: usize| {},
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::ChatNotFound(_)));
    assert!(client.history_offsets().is_empty());
    assert_eq!(client.calls().last(), Some(&Call::Disconnect));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn fetch_failure_disconnects_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let history = (1..=5).map(|id| message(id, Some("text"))).collect();
    let client = rust_chat_client().with_history(history).fail_history_at(0);

    let err = export_with_client(
        &client,
        &ChatIdentifier::from("rustchat"),
        &options(&dir, None),
        &mut |_: usize| {},
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::ConnectionError(_)));
    assert!(client.is_disconnected());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn save_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let client = rust_chat_client().with_history(vec![message(1, Some("hi"))]);
    let missing = ExportOptions {
        output_dir: dir.path().join("does").join("not").join("exist"),
        ..options(&dir, None)
    };

    let err = export_with_client(
        &client,
        &ChatIdentifier::from("rustchat"),
        &missing,
        &mut |_: usize| {},
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::IoError(_)));
    assert!(client.is_disconnected());
}

#[test]
fn cli_limit_overrides_config_limit() {
    let config = Config {
        limit: Some(100),
        ..Config::default()
    };
    let args = ExportArgs {
        chat_id: "rustchat".to_string(),
        limit: Some(-1),
        ..ExportArgs::default()
    };

    let options = export_options(&merge_config(config, &args));
    assert_eq!(options.limit, None);
}
