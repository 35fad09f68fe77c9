//! Synchronization service module for yougile-sync.
//!
//! This module provides the [`SyncService`] struct which runs one complete
//! synchronization pass from the remote API into the relational store:
//!
//! connect → ensure schema → load existing ids → fetch remote collections →
//! build the column index → filter new records → map rows → upsert boards,
//! users, tasks → close.
//!
//! Progress is reported as a stream of [`SyncEvent`]s over an optional
//! channel, and every milestone is logged as well.

pub mod mapping;
pub mod tags;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::backend::{field_str, Endpoint, RawRecord, RemoteSource};
use crate::config::{Config, Credentials};
use crate::constants::{
    LOG_CHECKING_EXISTING, LOG_CONNECTING, LOG_FETCHING_REMOTE, LOG_FETCHING_TAGS, LOG_STORING_BOARDS,
    LOG_STORING_TASKS, LOG_STORING_USERS, LOG_SYNC_FAILED,
};
use crate::entities::{board, task, user};
use crate::repositories::{BoardRepository, TaskRepository, UserRepository};
use crate::storage::Store;
use crate::utils::datetime;
use mapping::{Rejection, TaskMapper};
use tags::TagBindings;

/// Plain values a sync run needs besides the remote source.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub database_url: String,
    pub schema: String,
    pub tag_bindings: TagBindings,
    /// Tasks created within this many days are deleted and re-pulled (0 = off)
    pub refresh_window_days: u32,
}

impl SyncOptions {
    pub fn from_config(config: &Config, credentials: &Credentials) -> Self {
        Self {
            database_url: credentials.database_url.clone(),
            schema: config.database.schema.clone(),
            tag_bindings: config.tags.clone(),
            refresh_window_days: config.sync.refresh_window_days,
        }
    }
}

/// Counts of rows added by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub boards_added: usize,
    pub users_added: usize,
    pub tasks_added: usize,
    /// Task records rejected because no known board could be resolved
    pub tasks_skipped: usize,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added {} boards, {} users, {} tasks ({} tasks skipped)",
            self.boards_added, self.users_added, self.tasks_added, self.tasks_skipped
        )
    }
}

/// Messages emitted while a run progresses.
///
/// A run emits any number of `Progress` milestones followed by exactly one
/// `Finished` or `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Progress(String),
    Finished(SyncSummary),
    /// Terminal error with its full cause chain
    Failed(String),
}

/// Runs synchronization passes against one remote source and one database.
///
/// The service holds no run-level lock; callers must not start a second run
/// while one is still in flight.
#[derive(Clone)]
pub struct SyncService {
    source: Arc<dyn RemoteSource>,
    options: SyncOptions,
    progress: Option<UnboundedSender<SyncEvent>>,
}

/// Keep records whose id is neither persisted nor already kept.
fn retain_new<T>(rows: impl IntoIterator<Item = T>, existing: &HashSet<String>, key: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let id = key(row);
            !existing.contains(id) && seen.insert(id.to_string())
        })
        .collect()
}

impl SyncService {
    pub fn new(source: Arc<dyn RemoteSource>, options: SyncOptions) -> Self {
        Self {
            source,
            options,
            progress: None,
        }
    }

    /// Send progress events to the given channel.
    pub fn with_progress(mut self, sender: UnboundedSender<SyncEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(sender) = &self.progress {
            // A dropped receiver only means nobody is watching
            let _ = sender.send(event);
        }
    }

    fn progress(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.emit(SyncEvent::Progress(message));
    }

    /// Perform one complete synchronization pass.
    ///
    /// The database connection is opened for this run only and closed on
    /// every exit path. Rows upserted before a failure stay committed.
    ///
    /// # Errors
    /// Returns the first failing step's error, with context naming the step.
    pub async fn run_once(&self) -> Result<SyncSummary> {
        info!("🔄 Starting sync process...");

        let result = self.connect_and_sync().await;
        match &result {
            Ok(summary) => {
                info!("✅ Sync complete: {summary}");
                self.emit(SyncEvent::Finished(*summary));
            }
            Err(e) => {
                error!("{LOG_SYNC_FAILED}: {e:#}");
                self.emit(SyncEvent::Failed(format!("{e:#}")));
            }
        }
        result
    }

    /// Run forever, starting a new pass every `interval`.
    ///
    /// A failed pass is reported and the loop continues with the next one.
    pub async fn run_every(&self, interval: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.run_once().await.is_err() {
                warn!("⚠️  Next sync attempt in {} minutes", interval.as_secs() / 60);
            }
        }
    }

    async fn connect_and_sync(&self) -> Result<SyncSummary> {
        self.progress(LOG_CONNECTING);
        let store = Store::connect(&self.options.database_url, &self.options.schema).await?;

        let result = self.sync_with(&store).await;

        if let Err(e) = store.close().await {
            warn!("⚠️  {e:#}");
        }
        result
    }

    async fn fetch(&self, endpoint: Endpoint) -> Result<Vec<RawRecord>> {
        self.source
            .fetch_collection(endpoint)
            .await
            .with_context(|| format!("Failed to fetch /{endpoint}"))
    }

    async fn sync_with(&self, store: &Store) -> Result<SyncSummary> {
        store.ensure_schema().await.context("Failed to prepare database schema")?;
        let db = store.conn();

        if self.options.refresh_window_days > 0 {
            let since = datetime::days_ago(self.options.refresh_window_days);
            let removed = TaskRepository::delete_created_since(db, since)
                .await
                .context("Failed to clear the refresh window")?;
            self.progress(format!(
                "🧹 Removed {removed} tasks created since {} for re-sync",
                datetime::format_ymd(since)
            ));
        }

        self.progress(LOG_CHECKING_EXISTING);
        let existing_boards = BoardRepository::existing_ids(db)
            .await
            .context("Failed to load existing boards")?;
        let existing_users = UserRepository::existing_ids(db)
            .await
            .context("Failed to load existing users")?;
        let existing_tasks = TaskRepository::existing_ids(db)
            .await
            .context("Failed to load existing tasks")?;
        self.progress(format!(
            "📊 Database holds {} boards, {} users, {} tasks",
            existing_boards.len(),
            existing_users.len(),
            existing_tasks.len()
        ));

        self.progress(LOG_FETCHING_REMOTE);
        let raw_boards = self.fetch(Endpoint::Boards).await?;
        let raw_users = self.fetch(Endpoint::Users).await?;
        let raw_columns = self.fetch(Endpoint::Columns).await?;
        let raw_tasks = self.fetch(Endpoint::Tasks).await?;

        self.progress(LOG_FETCHING_TAGS);
        let tag_table = self
            .source
            .fetch_tag_states()
            .await
            .context("Failed to fetch tag groups")?;
        debug!("Resolved {} tag states", tag_table.len());

        let column_boards = mapping::build_column_index(&raw_columns);

        // Boards
        let fetched_boards: Vec<board::Model> = raw_boards.iter().filter_map(mapping::map_board).collect();
        let known_boards: HashSet<String> = existing_boards
            .iter()
            .cloned()
            .chain(fetched_boards.iter().map(|b| b.id.clone()))
            .collect();
        let new_boards = retain_new(fetched_boards, &existing_boards, |b| b.id.as_str());

        // Users, including placeholders for assignees the listing never returned
        let fetched_users: Vec<user::Model> = raw_users.iter().filter_map(mapping::map_user).collect();
        let mut known_users: HashSet<String> = existing_users
            .iter()
            .cloned()
            .chain(fetched_users.iter().map(|u| u.id.clone()))
            .collect();
        let mut new_users = retain_new(fetched_users, &existing_users, |u| u.id.as_str());
        for assignee in raw_tasks.iter().flat_map(mapping::assignee_ids) {
            if known_users.insert(assignee.clone()) {
                debug!("Synthesizing user for assignee {assignee}");
                new_users.push(mapping::synthesize_user(&assignee));
            }
        }

        // Tasks
        let mapper = TaskMapper::new(&tag_table, &self.options.tag_bindings, &column_boards);
        let mut tasks_skipped = 0;
        let mut mapped: Vec<task::Model> = Vec::new();
        for raw in &raw_tasks {
            if field_str(raw, "id").is_some_and(|id| existing_tasks.contains(&id)) {
                continue;
            }
            match mapper.map_task(raw) {
                Ok(task) if known_boards.contains(&task.board_id) => mapped.push(task),
                Ok(task) => {
                    debug!("Skipping task {}: board {} is unknown", task.id, task.board_id);
                    tasks_skipped += 1;
                }
                Err(Rejection::NoBoard) => tasks_skipped += 1,
                Err(Rejection::MissingId) => {
                    warn!("⚠️  Skipping task record without an id");
                    tasks_skipped += 1;
                }
            }
        }
        let new_tasks = retain_new(mapped, &existing_tasks, |t| t.id.as_str());
        if tasks_skipped > 0 {
            warn!("⚠️  {tasks_skipped} tasks have no resolvable board and were skipped");
        }

        let summary = SyncSummary {
            boards_added: new_boards.len(),
            users_added: new_users.len(),
            tasks_added: new_tasks.len(),
            tasks_skipped,
        };

        // Dependency order: boards and users before the tasks referencing them
        self.progress(format!("{LOG_STORING_BOARDS} ({})", summary.boards_added));
        BoardRepository::upsert_many(db, new_boards)
            .await
            .context("Failed to store boards")?;

        self.progress(format!("{LOG_STORING_USERS} ({})", summary.users_added));
        UserRepository::upsert_many(db, new_users)
            .await
            .context("Failed to store users")?;

        self.progress(format!("{LOG_STORING_TASKS} ({})", summary.tasks_added));
        TaskRepository::upsert_many(db, new_tasks)
            .await
            .context("Failed to store tasks")?;

        Ok(summary)
    }
}
