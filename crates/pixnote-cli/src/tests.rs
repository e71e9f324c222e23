use std::sync::Arc;

use pixnote_core::config::ClientConfig;
use pixnote_core::db::Database;
use pixnote_core::models::{Note, Photo, RecordId, RemoteId};
use pixnote_core::remote::{MemoryRemote, RemoteRecord};
use pixnote_core::Error;
use pretty_assertions::assert_eq;

use crate::app::Collection;
use crate::cli::{CompletionShell, ExportFormat, Toggle};
use crate::commands::common::{
    format_relative_time, format_timestamp, normalize_content, normalize_search_query,
    parse_label, parse_record_id, record_preview,
};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config_set;
use crate::commands::export::run_export;
use crate::commands::favorite::run_favorite;
use crate::commands::list::select_records;
use crate::commands::note::{create_note, run_note_edit};
use crate::commands::photo::{build_photo, PhotoInput};
use crate::commands::search::run_search_remote;
use crate::commands::sync::{run_fetch, run_load_more, run_push, run_refresh};
use crate::error::CliError;

type NoteCollection = Collection<Note, MemoryRemote<Note>>;

fn config_with_page_size(page_size: usize) -> ClientConfig {
    ClientConfig {
        page_size,
        ..ClientConfig::default()
    }
}

async fn online_notes(page_size: usize) -> (NoteCollection, Arc<MemoryRemote<Note>>) {
    let db = Database::open_in_memory().unwrap().into_shared();
    let remote = Arc::new(MemoryRemote::new());
    let collection = Collection::open(
        db,
        Some(Arc::clone(&remote)),
        &config_with_page_size(page_size),
    )
    .await
    .unwrap();
    (collection, remote)
}

async fn offline_notes() -> NoteCollection {
    let db = Database::open_in_memory().unwrap().into_shared();
    Collection::open(db, None, &ClientConfig::default())
        .await
        .unwrap()
}

fn seeded(remote: &MemoryRemote<Note>, count: i64) -> Vec<RemoteId> {
    remote.seed((1..=count).map(|i| (Note::new(format!("note {i}"), format!("body {i}")), i * 1_000)))
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_content_keeps_multiline_text() {
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn normalize_search_query_rejects_blank() {
    assert_eq!(normalize_search_query("  cat ").unwrap(), "cat");
    assert!(matches!(
        normalize_search_query("   "),
        Err(CliError::EmptySearchQuery)
    ));
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn format_relative_time_long_ranges() {
    let day = 24 * 60 * 60_000;
    let now = 1_000 * day;
    assert_eq!(format_relative_time(now - 3 * day, now), "3d ago");
    assert_eq!(format_relative_time(now - 14 * day, now), "2w ago");
    assert_eq!(format_relative_time(now - 60 * day, now), "2mo ago");
    assert_eq!(format_relative_time(now - 800 * day, now), "2y ago");
}

#[test]
fn format_timestamp_renders_utc() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13:20 UTC");
}

#[test]
fn parse_label_accepts_optional_confidence() {
    let label = parse_label("dog:0.92").unwrap();
    assert_eq!(label.text, "dog");
    assert!((label.confidence - 0.92).abs() < f32::EPSILON);

    let bare = parse_label(" receipt ").unwrap();
    assert_eq!(bare.text, "receipt");
    assert!((bare.confidence - 1.0).abs() < f32::EPSILON);
}

#[test]
fn parse_label_rejects_bad_input() {
    for raw in ["", ":0.5", "dog:high", "dog:1.5"] {
        assert!(
            matches!(parse_label(raw), Err(CliError::InvalidLabel(_))),
            "{raw} should be rejected"
        );
    }
}

#[test]
fn parse_record_id_requires_positive_integer() {
    assert_eq!(parse_record_id(" 42 ").unwrap(), RecordId::new(42));
    assert!(matches!(
        parse_record_id("abc"),
        Err(CliError::InvalidRecordId(id)) if id == "abc"
    ));
    assert!(parse_record_id("0").is_err());
}

#[test]
fn build_photo_normalizes_detection_output() {
    let photo = build_photo(PhotoInput {
        media_ref: " media/7.jpg ".into(),
        title: " Lunch ".into(),
        text: Some("   ".into()),
        labels: vec!["food:0.8".into(), "plate".into()],
        description: Some("A bowl of ramen".into()),
    })
    .unwrap();

    assert_eq!(photo.media_ref, "media/7.jpg");
    assert_eq!(photo.title, "Lunch");
    assert_eq!(photo.recognized_text, None);
    assert_eq!(photo.labels.len(), 2);
    assert_eq!(photo.description.as_deref(), Some("A bowl of ramen"));
}

#[tokio::test]
async fn record_preview_truncates_long_summaries() {
    let collection = offline_notes().await;
    let long = "word ".repeat(30);
    let record = collection.create(Note::new("", long)).await.unwrap();

    let preview = record_preview(&record, 20);
    assert_eq!(preview.chars().count(), 20);
    assert!(preview.ends_with("..."));
}

#[tokio::test]
async fn select_records_filters_favorites_then_limits() {
    let (collection, remote) = online_notes(10).await;
    seeded(&remote, 4);
    run_refresh(&collection, true).await.unwrap();
    let state = collection.coordinator().unwrap().state();
    run_favorite(&collection, &state.records[1].id.to_string(), Some(Toggle::On))
        .await
        .unwrap();
    run_favorite(&collection, &state.records[3].id.to_string(), Some(Toggle::On))
        .await
        .unwrap();

    let favorites = select_records(collection.mirror.list_all(), 1, true);
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, state.records[1].id);
    assert_eq!(select_records(collection.mirror.list_all(), 10, false).len(), 4);
}

#[tokio::test]
async fn offline_create_stores_pending_record() {
    let collection = offline_notes().await;
    create_note(&collection, "Idea", "write it down".into(), None)
        .await
        .unwrap();

    let records = collection.mirror.list_all();
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_synced());
    assert_eq!(records[0].payload.title, "Idea");
}

#[tokio::test]
async fn offline_create_rejects_invalid_payload() {
    let collection = offline_notes().await;
    let result = collection.create(Note::new(" ", " ")).await;
    assert!(matches!(
        result,
        Err(CliError::Core(Error::InvalidInput(_)))
    ));
    assert!(collection.mirror.list_all().is_empty());
}

#[tokio::test]
async fn offline_delete_only_removes_pending_records() {
    let collection = offline_notes().await;
    let pending = collection.create(Note::new("", "draft")).await.unwrap();
    let synced = collection
        .mirror
        .upsert_remote(&[RemoteRecord {
            remote_id: RemoteId::new("n-1"),
            payload: Note::new("", "from server"),
            created_at: 1,
            favorite: false,
        }])
        .await
        .unwrap();

    collection.delete(pending.id).await.unwrap();
    assert!(matches!(
        collection.delete(synced[0].id).await,
        Err(CliError::RemoteNotConfigured)
    ));
    assert!(matches!(
        collection.delete(pending.id).await,
        Err(CliError::Core(Error::NotFound(_)))
    ));
    assert_eq!(collection.mirror.list_all().len(), 1);
}

#[tokio::test]
async fn remote_commands_require_configuration() {
    let collection = offline_notes().await;
    assert!(matches!(
        run_refresh(&collection, false).await,
        Err(CliError::RemoteNotConfigured)
    ));
    assert!(matches!(
        run_search_remote(&collection, "title", "cat", false).await,
        Err(CliError::RemoteNotConfigured)
    ));
    assert!(matches!(
        run_push(&collection).await,
        Err(CliError::RemoteNotConfigured)
    ));
}

#[tokio::test]
async fn refresh_mirrors_first_page() {
    let (collection, remote) = online_notes(3).await;
    seeded(&remote, 5);

    let count = run_refresh(&collection, false).await.unwrap();

    assert_eq!(count, 3);
    let titles = collection
        .mirror
        .list_all()
        .into_iter()
        .map(|record| record.payload.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["note 5", "note 4", "note 3"]);
}

#[tokio::test]
async fn load_more_stops_at_end_of_list() {
    let (collection, remote) = online_notes(2).await;
    seeded(&remote, 5);

    let loaded = run_load_more(&collection, 10, false).await.unwrap();

    assert_eq!(loaded, 5);
    let state = collection.coordinator().unwrap().state();
    assert!(state.status.is_exhausted());
    assert_eq!(remote.page_requests(), 3);
}

#[tokio::test]
async fn fetch_returns_continuation_until_final_page() {
    let (collection, remote) = online_notes(10).await;
    seeded(&remote, 3);

    let next = run_fetch(&collection, None, Some(2), true)
        .await
        .unwrap()
        .expect("first page has a continuation");
    let last = run_fetch(&collection, Some(next.as_str()), Some(2), true)
        .await
        .unwrap();

    assert_eq!(last, None);
    assert_eq!(collection.mirror.list_all().len(), 3);
}

#[tokio::test]
async fn fetch_rejects_zero_page_size() {
    let (collection, _remote) = online_notes(10).await;
    assert!(matches!(
        run_fetch(&collection, None, Some(0), false).await,
        Err(CliError::Core(Error::InvalidInput(_)))
    ));
}

#[tokio::test]
async fn favorite_toggles_and_sets() {
    let (collection, remote) = online_notes(10).await;
    let ids = seeded(&remote, 1);
    run_refresh(&collection, false).await.unwrap();
    let id = collection.mirror.list_all()[0].id.to_string();

    assert!(run_favorite(&collection, &id, None).await.unwrap());
    assert!(remote.get(&ids[0]).unwrap().favorite);
    assert!(!run_favorite(&collection, &id, Some(Toggle::Off)).await.unwrap());
    assert!(!remote.get(&ids[0]).unwrap().favorite);
}

#[tokio::test]
async fn favorite_failure_is_reported_and_rolled_back() {
    let (collection, remote) = online_notes(10).await;
    seeded(&remote, 1);
    run_refresh(&collection, false).await.unwrap();
    let id = collection.mirror.list_all()[0].id.to_string();

    remote.set_offline(true);
    let result = run_favorite(&collection, &id, Some(Toggle::On)).await;

    assert!(matches!(result, Err(CliError::Core(Error::Network(_)))));
    assert!(!collection.mirror.list_all()[0].favorite);
}

#[tokio::test]
async fn note_edit_updates_remote_document() {
    let (collection, remote) = online_notes(10).await;
    let ids = seeded(&remote, 1);
    run_refresh(&collection, false).await.unwrap();
    let id = collection.mirror.list_all()[0].id.to_string();

    run_note_edit(&collection, &id, Some(" Renamed ".into()), None)
        .await
        .unwrap();

    assert_eq!(remote.get(&ids[0]).unwrap().payload.title, "Renamed");
    assert_eq!(collection.mirror.list_all()[0].payload.content, "body 1");
}

#[tokio::test]
async fn note_edit_requires_a_change() {
    let (collection, _remote) = online_notes(10).await;
    assert!(matches!(
        run_note_edit(&collection, "1", None, Some("  ".into())).await,
        Err(CliError::NothingToEdit)
    ));
}

#[tokio::test]
async fn note_attached_to_photo_keeps_reference() {
    let (collection, remote) = online_notes(10).await;
    create_note(&collection, "", "nice light".into(), Some("p-9"))
        .await
        .unwrap();

    let record = &collection.mirror.list_all()[0];
    assert_eq!(record.payload.photo_ref, Some(RemoteId::new("p-9")));
    let remote_id = record.remote_id.clone().unwrap();
    assert_eq!(
        remote.get(&remote_id).unwrap().payload.photo_ref,
        Some(RemoteId::new("p-9"))
    );
}

#[tokio::test]
async fn push_creates_records_made_while_offline() {
    let (collection, remote) = online_notes(10).await;
    remote.set_offline(true);
    create_note(&collection, "", "queued".into(), None)
        .await
        .unwrap();
    assert!(remote.is_empty());

    remote.set_offline(false);
    assert_eq!(run_push(&collection).await.unwrap(), 1);
    assert_eq!(remote.len(), 1);
    assert!(collection.mirror.list_all()[0].is_synced());
}

#[tokio::test]
async fn run_export_writes_json_file() {
    let collection = offline_notes().await;
    collection
        .create(Note::new("Export", "content #tag"))
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");

    run_export(&collection, ExportFormat::Json, Some(path.as_path())).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed[0]["title"], "Export");
    assert_eq!(parsed[0]["content"], "content #tag");
}

#[tokio::test]
async fn run_export_into_directory_uses_generated_name() {
    let db = Database::open_in_memory().unwrap().into_shared();
    let photos: Collection<Photo, MemoryRemote<Photo>> =
        Collection::open(db, None, &ClientConfig::default())
            .await
            .unwrap();
    photos
        .create(Photo::new("m/1.jpg").with_title("Cat"))
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let path = run_export(&photos, ExportFormat::Markdown, Some(dir.path()))
        .unwrap()
        .unwrap();

    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("pixnote-photos-export-"));
    assert!(file_name.ends_with(".md"));
    assert!(std::fs::read_to_string(&path).unwrap().contains("Cat"));
}

#[test]
fn config_set_persists_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pixnote").join("config.json");

    run_config_set(&path, Some("https://api.example.com/".into()), Some(50), None).unwrap();
    run_config_set(&path, None, None, Some(3)).unwrap();

    let loaded = ClientConfig::load(&path).unwrap();
    assert_eq!(loaded.api_base_url.as_deref(), Some("https://api.example.com"));
    assert_eq!(loaded.page_size, 50);
    assert_eq!(loaded.request_timeout_secs, 3);
}

#[test]
fn config_set_rejects_invalid_values_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    assert!(run_config_set(&path, None, Some(0), None).is_err());
    assert!(run_config_set(&path, Some("api.example.com".into()), None, None).is_err());
    assert!(!path.exists());
}

#[test]
fn run_completions_writes_bash_script_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pixnote.bash");

    run_completions(CompletionShell::Bash, Some(path.as_path())).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("pixnote"));
    assert!(script.contains("search-remote"));
}

#[test]
fn run_completions_into_directory_uses_shell_file_name() {
    let dir = tempfile::tempdir().unwrap();

    let path = run_completions(CompletionShell::Zsh, Some(dir.path()))
        .unwrap()
        .unwrap();

    assert_eq!(path, dir.path().join("_pixnote"));
    assert!(std::fs::read_to_string(&path).unwrap().contains("#compdef pixnote"));
}
