//! Task repository for database operations.

use std::collections::HashSet;

use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::{ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::task;

/// Repository for task-related database operations.
pub struct TaskRepository;

impl TaskRepository {
    /// Identifiers of all stored tasks.
    pub async fn existing_ids<C>(conn: &C) -> Result<HashSet<String>>
    where
        C: ConnectionTrait,
    {
        super::existing_ids::<task::Entity, C>(conn).await
    }

    /// Insert or overwrite tasks in a single transaction.
    pub async fn upsert_many(db: &DatabaseConnection, tasks: Vec<task::Model>) -> Result<u64> {
        let rows: Vec<task::ActiveModel> = tasks
            .into_iter()
            .map(|t| task::ActiveModel {
                id: ActiveValue::Set(t.id),
                title: ActiveValue::Set(t.title),
                board_id: ActiveValue::Set(t.board_id),
                assignee_id: ActiveValue::Set(t.assignee_id),
                created_at: ActiveValue::Set(t.created_at),
                actual_time: ActiveValue::Set(t.actual_time),
                sprint_name: ActiveValue::Set(t.sprint_name),
                project_name: ActiveValue::Set(t.project_name),
                direction: ActiveValue::Set(t.direction),
                state_category: ActiveValue::Set(t.state_category),
            })
            .collect();
        super::upsert_batch::<task::Entity, _>(db, rows).await
    }

    /// Delete tasks created on or after `since`.
    ///
    /// Tasks without a creation date are kept.
    pub async fn delete_created_since<C>(conn: &C, since: NaiveDate) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        let result = task::Entity::delete_many()
            .filter(task::Column::CreatedAt.gte(since))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Get a single task by identifier.
    pub async fn get_by_id<C>(conn: &C, id: &str) -> Result<Option<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find_by_id(id.to_string()).one(conn).await?)
    }

    /// Number of stored tasks.
    pub async fn count<C>(conn: &C) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        use sea_orm::PaginatorTrait;
        Ok(task::Entity::find().count(conn).await?)
    }
}
