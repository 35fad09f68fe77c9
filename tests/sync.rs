use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use yougile_sync::backend::{ApiError, Endpoint, RawRecord, RemoteSource};
use yougile_sync::entities::{task, user};
use yougile_sync::repositories::{BoardRepository, TaskRepository};
use yougile_sync::storage::Store;
use yougile_sync::sync::tags::{GroupBinding, TagBindings};
use yougile_sync::sync::{SyncEvent, SyncOptions, SyncService, SyncSummary};

/// Remote source answering from canned collections.
#[derive(Default)]
struct ScriptedSource {
    collections: HashMap<Endpoint, Vec<RawRecord>>,
    unauthorized: Option<Endpoint>,
}

impl ScriptedSource {
    fn with(mut self, endpoint: Endpoint, records: Value) -> Self {
        let records = records
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect();
        self.collections.insert(endpoint, records);
        self
    }
}

#[async_trait]
impl RemoteSource for ScriptedSource {
    async fn fetch_collection(&self, endpoint: Endpoint) -> Result<Vec<RawRecord>, ApiError> {
        if self.unauthorized == Some(endpoint) {
            return Err(ApiError::Unauthorized);
        }
        Ok(self.collections.get(&endpoint).cloned().unwrap_or_default())
    }
}

fn bindings() -> TagBindings {
    let mut boards = HashMap::new();
    boards.insert(
        "special".to_string(),
        GroupBinding {
            project_group: "g-proj-special".to_string(),
            direction_group: "g-dir-special".to_string(),
        },
    );
    TagBindings {
        default: GroupBinding {
            project_group: "g-proj".to_string(),
            direction_group: "g-dir".to_string(),
        },
        boards,
    }
}

fn database() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("sync.db").display());
    (dir, url)
}

fn options(database_url: &str) -> SyncOptions {
    SyncOptions {
        database_url: database_url.to_string(),
        schema: "public".to_string(),
        tag_bindings: bindings(),
        refresh_window_days: 0,
    }
}

/// Two boards (one special), tasks tagged per board, one assignee-only user.
fn workspace() -> ScriptedSource {
    ScriptedSource::default()
        .with(
            Endpoint::Boards,
            json!([{"id": "special", "title": "Special board"}, {"id": "plain", "title": "Plain board"}]),
        )
        .with(Endpoint::Users, json!([]))
        .with(Endpoint::Columns, json!([{"id": "col-1", "boardId": "plain"}]))
        .with(
            Endpoint::Tasks,
            json!([
                {
                    "id": "t-special",
                    "title": "Special work",
                    "boardId": "special",
                    "assigned": ["ghost-user-0001"],
                    "timestamp": 1_700_000_000_000_i64,
                    "timeTracking": {"work": 2.25},
                    "stickers": {"g-proj-special": "s-omega", "g-dir-special": "s-ops"}
                },
                {
                    "id": "t-plain",
                    "title": "Plain work",
                    "columnId": "col-1",
                    "stickers": {"g-proj": "s-alpha", "g-dir": "s-backend"}
                },
                {"id": "t-orphan", "title": "No board", "columnId": "col-missing"},
                {"id": "t-foreign", "title": "Unknown board", "boardId": "elsewhere"}
            ]),
        )
        .with(
            Endpoint::StringStickers,
            json!([
                {"id": "g-proj", "name": "Project", "states": [{"id": "s-alpha", "name": "Alpha"}]},
                {"id": "g-dir", "name": "Direction", "states": [{"id": "s-backend", "name": "Backend"}]},
                {"id": "g-proj-special", "name": "Special project", "states": [{"id": "s-omega", "name": "Omega"}]},
                {"id": "g-dir-special", "name": "Special direction", "states": [{"id": "s-ops", "name": "Ops"}]}
            ]),
        )
}

async fn open(url: &str) -> Store {
    Store::connect(url, "public").await.unwrap()
}

#[tokio::test]
async fn test_first_sync_writes_boards_users_and_tasks() {
    let (_dir, url) = database();
    let service = SyncService::new(Arc::new(workspace()), options(&url));

    let summary = service.run_once().await.unwrap();
    assert_eq!(
        summary,
        SyncSummary {
            boards_added: 2,
            users_added: 1,
            tasks_added: 2,
            tasks_skipped: 2,
        }
    );

    let store = open(&url).await;
    let db = store.conn();
    assert_eq!(BoardRepository::existing_ids(db).await.unwrap().len(), 2);

    let users = user::Entity::find().all(db).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "ghost-user-0001");
    assert_eq!(users[0].name, "Unknown User ghost-us");

    let special = TaskRepository::get_by_id(db, "t-special").await.unwrap().unwrap();
    assert_eq!(special.board_id, "special");
    assert_eq!(special.assignee_id.as_deref(), Some("ghost-user-0001"));
    assert_eq!(special.project_name.as_deref(), Some("Omega"));
    assert_eq!(special.direction.as_deref(), Some("Ops"));
    assert_eq!(special.actual_time, Some(2.3));
    assert_eq!(special.created_at.map(|d| d.to_string()).as_deref(), Some("2023-11-14"));

    let plain = TaskRepository::get_by_id(db, "t-plain").await.unwrap().unwrap();
    assert_eq!(plain.board_id, "plain");
    assert_eq!(plain.project_name.as_deref(), Some("Alpha"));
    assert_eq!(plain.direction.as_deref(), Some("Backend"));

    assert!(TaskRepository::get_by_id(db, "t-orphan").await.unwrap().is_none());
    assert!(TaskRepository::get_by_id(db, "t-foreign").await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_sync_skips_persisted_rows() {
    let (_dir, url) = database();
    let service = SyncService::new(Arc::new(workspace()), options(&url));
    service.run_once().await.unwrap();

    // A local edit survives because persisted ids are never rewritten
    let store = open(&url).await;
    task::ActiveModel {
        id: ActiveValue::Unchanged("t-plain".to_string()),
        title: ActiveValue::Set("Edited locally".to_string()),
        ..Default::default()
    }
    .update(store.conn())
    .await
    .unwrap();
    store.close().await.unwrap();

    let summary = service.run_once().await.unwrap();
    assert_eq!(summary.boards_added, 0);
    assert_eq!(summary.users_added, 0);
    assert_eq!(summary.tasks_added, 0);
    assert_eq!(summary.tasks_skipped, 2);

    let store = open(&url).await;
    let plain = TaskRepository::get_by_id(store.conn(), "t-plain").await.unwrap().unwrap();
    assert_eq!(plain.title, "Edited locally");
    assert_eq!(TaskRepository::count(store.conn()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_duplicate_records_are_written_once() {
    let (_dir, url) = database();
    let source = ScriptedSource::default()
        .with(Endpoint::Boards, json!([{"id": "b1", "name": "First"}, {"id": "b1", "name": "Again"}]))
        .with(Endpoint::Users, json!([{"id": "u1", "name": "ann"}]))
        .with(
            Endpoint::Tasks,
            json!([
                {"id": "t1", "title": "One", "boardId": "b1", "assigned": ["u1"]},
                {"id": "t1", "title": "Copy", "boardId": "b1"}
            ]),
        );
    let service = SyncService::new(Arc::new(source), options(&url));

    let summary = service.run_once().await.unwrap();
    assert_eq!(summary.boards_added, 1);
    assert_eq!(summary.users_added, 1);
    assert_eq!(summary.tasks_added, 1);

    let store = open(&url).await;
    let stored = TaskRepository::get_by_id(store.conn(), "t1").await.unwrap().unwrap();
    assert_eq!(stored.title, "One");
    assert_eq!(stored.assignee_id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn test_refresh_window_repulls_recent_tasks() {
    let (_dir, url) = database();
    let now_ms = chrono::Utc::now().timestamp_millis();
    let first = ScriptedSource::default()
        .with(Endpoint::Boards, json!([{"id": "b1", "name": "Board"}]))
        .with(
            Endpoint::Tasks,
            json!([
                {"id": "fresh", "title": "Draft", "boardId": "b1", "timestamp": now_ms},
                {"id": "old", "title": "Archived", "boardId": "b1", "timestamp": 1_600_000_000_000_i64}
            ]),
        );
    SyncService::new(Arc::new(first), options(&url)).run_once().await.unwrap();

    let second = ScriptedSource::default()
        .with(Endpoint::Boards, json!([{"id": "b1", "name": "Board"}]))
        .with(
            Endpoint::Tasks,
            json!([
                {"id": "fresh", "title": "Final", "boardId": "b1", "timestamp": now_ms},
                {"id": "old", "title": "Archived again", "boardId": "b1", "timestamp": 1_600_000_000_000_i64}
            ]),
        );
    let mut opts = options(&url);
    opts.refresh_window_days = 3;
    let summary = SyncService::new(Arc::new(second), opts).run_once().await.unwrap();
    assert_eq!(summary.tasks_added, 1);

    let store = open(&url).await;
    let fresh = TaskRepository::get_by_id(store.conn(), "fresh").await.unwrap().unwrap();
    assert_eq!(fresh.title, "Final");
    let old = TaskRepository::get_by_id(store.conn(), "old").await.unwrap().unwrap();
    assert_eq!(old.title, "Archived");
}

#[tokio::test]
async fn test_progress_events_end_with_summary() {
    let (_dir, url) = database();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let service = SyncService::new(Arc::new(workspace()), options(&url)).with_progress(tx);

    let summary = service.run_once().await.unwrap();
    drop(service);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(events.len() > 2);
    assert!(matches!(events.first(), Some(SyncEvent::Progress(_))));
    assert_eq!(events.last(), Some(&SyncEvent::Finished(summary)));
    assert_eq!(
        events.iter().filter(|e| !matches!(e, SyncEvent::Progress(_))).count(),
        1
    );
}

#[tokio::test]
async fn test_fetch_failure_aborts_before_writing() {
    let (_dir, url) = database();
    let mut source = workspace();
    source.unauthorized = Some(Endpoint::Tasks);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let service = SyncService::new(Arc::new(source), options(&url)).with_progress(tx);

    let err = service.run_once().await.unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("task-list"));
    assert!(message.contains("Unauthorized"));
    drop(service);

    let mut last = None;
    while let Some(event) = rx.recv().await {
        last = Some(event);
    }
    match last {
        Some(SyncEvent::Failed(text)) => assert!(text.contains("Unauthorized")),
        other => panic!("expected a failure event, got {other:?}"),
    }

    let store = open(&url).await;
    assert!(BoardRepository::existing_ids(store.conn()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_database_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("missing").join("nested").join("sync.db").display()
    );
    let service = SyncService::new(Arc::new(workspace()), options(&url));
    assert!(service.run_once().await.is_err());
}
